pub mod dial;
pub mod settings;
pub mod validator;

pub use dial::*;
pub use settings::*;
pub use validator::*;
