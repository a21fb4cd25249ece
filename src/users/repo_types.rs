use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database. Responses go through `PublicUser`.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,                      // generated by storage
    pub email: String,                // not unique at the storage layer
    pub password: String,             // "salt.hash"
    pub created_at: OffsetDateTime,
}

/// Fields needed to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
}

/// Fields to change on an existing user. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password.is_none()
    }
}

impl User {
    /// Merge supplied fields onto this record.
    pub fn apply(&mut self, changes: UserChanges) {
        if let Some(email) = changes.email {
            self.email = email;
        }
        if let Some(password) = changes.password {
            self.password = password;
        }
    }
}
