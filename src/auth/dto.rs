use serde::Deserialize;

/// Request body for signup and signin.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}
