use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Bearer credentials as issued by the gateway's auth endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// In-memory token holder shared by every request of one session.
///
/// Cloning shares the same tokens.
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    inner: Arc<Mutex<TokenPair>>,
}

impl TokenStore {
    pub fn new(tokens: TokenPair) -> Self {
        Self { inner: Arc::new(Mutex::new(tokens)) }
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.lock().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.inner.lock().refresh_token.clone()
    }

    pub fn replace(&self, access_token: String, refresh_token: String) {
        let mut tokens = self.inner.lock();
        tokens.access_token = Some(access_token);
        tokens.refresh_token = Some(refresh_token);
    }

    pub fn clear(&self) {
        *self.inner.lock() = TokenPair::default();
    }
}

/// Body of a successful `POST /api/v1/auth/refresh`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_tokens() {
        let store = TokenStore::default();
        let other = store.clone();

        store.replace("a1".into(), "r1".into());
        assert_eq!(other.access_token().as_deref(), Some("a1"));
        assert_eq!(other.refresh_token().as_deref(), Some("r1"));

        other.clear();
        assert_eq!(store.access_token(), None);
    }

    #[test]
    fn refresh_response_uses_camel_case() {
        let parsed: RefreshResponse =
            serde_json::from_str(r#"{"accessToken":"a","refreshToken":"r"}"#).unwrap();
        assert_eq!(parsed.access_token, "a");
        assert_eq!(parsed.refresh_token, "r");
    }
}
