use crate::api::dto::{CreateUserRequest, FetchUserRequest};
use crate::api::{INVALID_REQUEST_BODY, invalid_request, succeeded, use_case_failed};
use crate::client_bail;
use crate::context::RequestContext;
use crate::logging::Logger;
use crate::usecase::user::UserUseCase;
use crate::web::validation::{Validate, bind_json};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::Response;

pub const INVALID_USER_ID: &str = "Invalid user id";

pub struct UserHandler {
    use_case: Arc<dyn UserUseCase>,
    logger: Logger,
}

impl UserHandler {
    pub fn new(use_case: Arc<dyn UserUseCase>, logger: Logger) -> Self {
        UserHandler { use_case, logger }
    }

    /// `POST /api/v1/user`. Answers 201 with the created user.
    pub fn create_user(&self, ctx: &RequestContext, body: &[u8]) -> Response {
        self.logger.info(ctx, "Creating user", []);

        let request: CreateUserRequest = match bind_json(body) {
            Ok(request) => request,
            Err(err) => return invalid_request(&self.logger, ctx, INVALID_REQUEST_BODY, &err),
        };

        let user_id = request.id;
        match self.use_case.create_user(request) {
            Ok(user) => succeeded(
                &self.logger,
                ctx,
                "User created successfully",
                user_id,
                StatusCode::CREATED,
                &user,
                [],
            ),
            Err(err) => use_case_failed(&self.logger, ctx, "Failed to create user", user_id, &err),
        }
    }

    /// `GET /api/v1/user/{id}`. Answers 200 with the user.
    pub fn fetch_user(&self, ctx: &RequestContext, id: &str) -> Response {
        self.logger.info(ctx, "Fetching user", []);

        let request = match parse_fetch_request(id) {
            Ok(request) => request,
            Err(err) => return invalid_request(&self.logger, ctx, INVALID_USER_ID, &err),
        };

        match self.use_case.fetch_user(&request) {
            Ok(user) => succeeded(
                &self.logger,
                ctx,
                "User fetched successfully",
                request.id,
                StatusCode::OK,
                &user,
                [],
            ),
            Err(err) => use_case_failed(&self.logger, ctx, "Failed to fetch user", request.id, &err),
        }
    }
}

fn parse_fetch_request(id: &str) -> anyhow::Result<FetchUserRequest> {
    let Ok(id) = id.parse::<i64>() else {
        client_bail!("'id' must be an integer");
    };

    let request = FetchUserRequest { id };
    request.validate()?;

    Ok(request)
}
