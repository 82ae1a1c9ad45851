//! Request and response payloads of the HTTP API.

use crate::domain::User;
use crate::web::validation::{
    Validate, require_non_empty, require_non_zero, validate_email, validate_range,
};
use serde::{Deserialize, Serialize};

pub const MIN_AGE: i64 = 0;
pub const MAX_AGE: i64 = 130;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CreateUserRequest {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub age: i64,
}

impl Validate for CreateUserRequest {
    fn validate(&self) -> anyhow::Result<()> {
        require_non_zero("id", self.id)?;
        require_non_empty("name", &self.name)?;
        require_non_empty("email", &self.email)?;
        validate_email("email", &self.email)?;
        validate_range("age", self.age, MIN_AGE, MAX_AGE)?;

        Ok(())
    }
}

impl From<CreateUserRequest> for User {
    fn from(request: CreateUserRequest) -> Self {
        User {
            id: request.id,
            name: request.name,
            email: request.email,
            age: request.age,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct FetchUserRequest {
    pub id: i64,
}

impl Validate for FetchUserRequest {
    fn validate(&self) -> anyhow::Result<()> {
        require_non_zero("id", self.id)?;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CheckLimitRequest {
    #[serde(rename = "userID")]
    pub user_id: i64,
}

impl Validate for CheckLimitRequest {
    fn validate(&self) -> anyhow::Result<()> {
        require_non_zero("userID", self.user_id)?;
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct CheckLimitResponse {
    #[serde(rename = "userID")]
    pub user_id: i64,
    #[serde(rename = "limitAvailable")]
    pub limit_available: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
}
