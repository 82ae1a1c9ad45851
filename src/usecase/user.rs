use crate::api::dto::{CreateUserRequest, FetchUserRequest};
use crate::domain::User;
use crate::repo::{UserRepo, UserWebApi};
use std::sync::Arc;

pub trait UserUseCase: Send + Sync {
    fn create_user(&self, request: CreateUserRequest) -> anyhow::Result<User>;
    fn fetch_user(&self, request: &FetchUserRequest) -> anyhow::Result<User>;
}

/// Stores users in the repository and mirrors new ones to the remote directory.
///
/// Does not use the key/value store, so it behaves the same whether or not one is available.
pub struct UserService {
    repository: Arc<dyn UserRepo>,
    web_api: Arc<dyn UserWebApi>,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepo>, web_api: Arc<dyn UserWebApi>) -> Self {
        UserService {
            repository,
            web_api,
        }
    }
}

impl UserUseCase for UserService {
    fn create_user(&self, request: CreateUserRequest) -> anyhow::Result<User> {
        let user = self.repository.save(User::from(request))?;
        self.web_api.save(user.clone())?;

        Ok(user)
    }

    fn fetch_user(&self, request: &FetchUserRequest) -> anyhow::Result<User> {
        self.repository.fetch(request.id)
    }
}
