//! Library settings shared by every resource.

pub const DEFAULT_REQUEST_CTX_KEY: &str = "request";
pub const DEFAULT_RESPONSE_CTX_KEY: &str = "response";
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LibrarySettings {
    /// Path every resource is mounted under, e.g. `/v1`.
    pub base_path: String,
    /// Request context key holding the parsed request document.
    pub request_key: String,
    /// Request context key holding the value to serialize as the response.
    pub response_key: String,
    /// Max accepted request body in bytes.
    pub body_limit: usize,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        LibrarySettings {
            base_path: "/".into(),
            request_key: DEFAULT_REQUEST_CTX_KEY.into(),
            response_key: DEFAULT_RESPONSE_CTX_KEY.into(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl LibrarySettings {
    pub fn new(base_path: impl Into<String>) -> Self {
        LibrarySettings {
            base_path: base_path.into(),
            ..Default::default()
        }
    }

    pub fn request_key(mut self, key: impl Into<String>) -> Self {
        self.request_key = key.into();
        self
    }

    pub fn response_key(mut self, key: impl Into<String>) -> Self {
        self.response_key = key.into();
        self
    }

    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    /// Empty keys fall back to the defaults; base path gets a leading slash and no trailing one.
    pub fn normalized(mut self) -> Self {
        if self.request_key.is_empty() {
            self.request_key = DEFAULT_REQUEST_CTX_KEY.into();
        }
        if self.response_key.is_empty() {
            self.response_key = DEFAULT_RESPONSE_CTX_KEY.into();
        }
        let trimmed = self.base_path.trim().trim_matches('/');
        self.base_path = if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        };
        self
    }

    /// Route for a collection under the base path: `/v1` + `books` => `/v1/books`.
    pub fn collection_path(&self, name: &str) -> String {
        let base = self.base_path.trim_end_matches('/');
        if base.is_empty() || base.starts_with('/') {
            format!("{}/{}", base, name)
        } else {
            format!("/{}/{}", base, name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_keys_fall_back_to_defaults() {
        let s = LibrarySettings::default().request_key("").response_key("").normalized();
        assert_eq!(s.request_key, "request");
        assert_eq!(s.response_key, "response");
    }

    #[test]
    fn custom_keys_are_kept() {
        let s = LibrarySettings::default().request_key("in").response_key("out").normalized();
        assert_eq!(s.request_key, "in");
        assert_eq!(s.response_key, "out");
    }

    #[test]
    fn collection_paths() {
        assert_eq!(LibrarySettings::default().normalized().collection_path("books"), "/books");
        assert_eq!(LibrarySettings::new("/v1").normalized().collection_path("books"), "/v1/books");
        assert_eq!(LibrarySettings::new("v1/").normalized().collection_path("books"), "/v1/books");
        assert_eq!(LibrarySettings::new("api/v2").collection_path("books"), "/api/v2/books");
    }
}
