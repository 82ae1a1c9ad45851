use crate::domain::User;
use crate::repo::UserWebApi;

/// Stand-in for a remote user directory. Behaves like
/// [`NoopUserRepo`](crate::repo::persistent::NoopUserRepo).
#[derive(Debug, Default)]
pub struct NoopUserWebApi;

impl UserWebApi for NoopUserWebApi {
    fn save(&self, user: User) -> anyhow::Result<User> {
        Ok(user)
    }

    fn fetch(&self, id: i64) -> anyhow::Result<User> {
        Ok(User {
            id,
            ..User::default()
        })
    }
}
