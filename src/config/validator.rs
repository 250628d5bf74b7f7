//! Collection name validation. Names end up as table names, so only identifiers are allowed.

use crate::error::ConfigError;
use regex::Regex;
use std::sync::OnceLock;

fn collection_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("static regex"))
}

pub fn validate_collection_name(name: &str) -> Result<(), ConfigError> {
    if collection_name_re().is_match(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidCollection(name.to_string()))
    }
}
