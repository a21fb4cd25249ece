pub mod context;
pub mod store;

pub use context::{SessionContext, SessionCookie};
pub use store::{MemorySessionStore, PgSessionStore, SessionData, SessionStore};
