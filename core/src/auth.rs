//! Request credentials.

use crate::http::HttpRequest;

/// How a client authenticates its requests.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Auth {
    #[default]
    None,
    /// Sent as `Authorization: Bearer <token>`.
    Bearer(String),
}

impl Auth {
    /// An empty token means unauthenticated.
    pub fn from_token(token: Option<&str>) -> Self {
        match token {
            Some(t) if !t.is_empty() => Auth::Bearer(t.to_string()),
            _ => Auth::None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Auth::None)
    }

    pub fn apply(&self, request: &mut HttpRequest) {
        match self {
            Auth::None => {}
            Auth::Bearer(token) => request.set_header("Authorization", format!("Bearer {token}")),
        }
    }
}

// Keeps tokens out of debug output and logs.
impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::None => f.write_str("None"),
            Auth::Bearer(_) => f.write_str("Bearer(<redacted>)"),
        }
    }
}
