use serde::{Deserialize, Serialize};

use crate::users::repo_types::User;

/// Public part of the user returned to the client.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicUser {
    pub id: i64,
    pub email: String,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
        }
    }
}

/// `GET /auth?email=`
#[derive(Debug, Deserialize)]
pub struct FindUsersQuery {
    pub email: String,
}

/// Request body for `PATCH /auth/:id`. Unknown fields are rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}
