use serde::{Deserialize, Serialize};

/// The authenticated user principal for the current session.
///
/// The `id` is the opaque identifier assigned by the external identity
/// provider; `email` and `avatar_url` are display attributes that may be
/// absent depending on the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

impl Identity {
    /// Creates an identity with only the opaque id set.
    pub fn bare(id: &str) -> Self {
        Self {
            id: id.to_string(),
            email: None,
            avatar_url: None,
        }
    }
}
