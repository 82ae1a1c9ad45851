//! Collaborators which persist or look up users.
//!
//! The implementations in this template are stand-ins which do not reach any backend. Wire
//! real backends in [`crate::resolver`]; their construction failing must abort startup.

use crate::domain::User;

pub mod persistent;
pub mod webapi;

/// The primary user store.
pub trait UserRepo: Send + Sync {
    fn save(&self, user: User) -> anyhow::Result<User>;
    fn fetch(&self, id: i64) -> anyhow::Result<User>;
}

/// A remote user directory.
pub trait UserWebApi: Send + Sync {
    fn save(&self, user: User) -> anyhow::Result<User>;
    fn fetch(&self, id: i64) -> anyhow::Result<User>;
}
