//! Document identity contract.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// A record stored in a collection and addressed by a string id.
///
/// Implementors are plain serde types; the resource layer takes care of
/// creating fresh instances (`Deserialize`) and lists (`Vec<Self>`).
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
}

/// Reusable id part. Flatten it into a document type and delegate to it:
///
/// ```
/// use docrest::{Document, DocumentBase};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Note {
///     #[serde(flatten)]
///     base: DocumentBase,
///     text: String,
/// }
///
/// impl Document for Note {
///     fn id(&self) -> &str {
///         self.base.id()
///     }
///     fn set_id(&mut self, id: String) {
///         self.base.set_id(id)
///     }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentBase {
    #[serde(default)]
    pub id: String,
}

impl Document for DocumentBase {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// Fresh document id: UUID v4 in simple (32 hex chars) form.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
