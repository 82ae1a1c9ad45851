//! Startup composition of the service.
//!
//! [`Resolver::resolve`] runs once before the server accepts requests:
//!
//! 1. connect the optional store; a failure is logged with remediation hints and the service
//!    continues without it,
//! 2. construct the repository and the remote user directory,
//! 3. assemble the use cases from what each of them needs,
//! 4. assemble the handlers into the [`ServerContext`].
//!
//! Only step 1 can fail and it never prevents the remaining steps.

use crate::api::limiter::LimiterHandler;
use crate::api::user::UserHandler;
use crate::config::Config;
use crate::context::RequestContext;
use crate::logging::{LogField, Logger};
use crate::provider::{ProviderFactory, RedisConnector, RedisProvider};
use crate::repo::persistent::NoopUserRepo;
use crate::repo::webapi::NoopUserWebApi;
use crate::repo::{UserRepo, UserWebApi};
use crate::usecase::limit::LimitService;
use crate::usecase::user::UserService;
use std::sync::Arc;

/// Optional external clients, shared with every use case which needs them.
#[derive(Clone, Debug, Default)]
pub struct ProviderBundle {
    pub store: Option<RedisProvider>,
}

/// The handlers serving the API. Always complete, even without a store.
#[derive(Clone)]
pub struct ServerContext {
    pub user_handler: Arc<UserHandler>,
    pub limiter_handler: Arc<LimiterHandler>,
}

pub struct Resolver<F = RedisConnector> {
    config: Config,
    logger: Logger,
    factory: F,
}

impl Resolver {
    pub fn new(config: &Config, logger: &Logger) -> Self {
        Self::with_factory(config, logger, RedisConnector)
    }
}

impl<F: ProviderFactory> Resolver<F> {
    pub fn with_factory(config: &Config, logger: &Logger, factory: F) -> Self {
        Resolver {
            config: config.clone(),
            logger: logger.clone(),
            factory,
        }
    }

    pub async fn resolve(self) -> ServerContext {
        let providers = self.resolve_providers().await;

        let user_repo: Arc<dyn UserRepo> = Arc::new(NoopUserRepo);
        let user_web_api: Arc<dyn UserWebApi> = Arc::new(NoopUserWebApi);

        let user_use_case = UserService::new(user_repo, user_web_api);
        let limit_use_case = LimitService::new(providers.store.clone());
        if !limit_use_case.has_store() {
            self.logger.warn(
                &RequestContext::background(),
                "Rate limiting runs without a store and reports default limits",
                [],
            );
        }

        ServerContext {
            user_handler: Arc::new(UserHandler::new(
                Arc::new(user_use_case),
                self.logger.clone(),
            )),
            limiter_handler: Arc::new(LimiterHandler::new(
                Arc::new(limit_use_case),
                self.logger.clone(),
            )),
        }
    }

    async fn resolve_providers(&self) -> ProviderBundle {
        let ctx = RequestContext::background();
        self.logger.info(
            &ctx,
            "Connecting to Redis",
            [LogField::string("host", self.config.store.address.clone())],
        );

        match self.factory.connect(&self.config.store).await {
            Ok(store) => {
                self.logger.info(
                    &ctx,
                    "Redis provider initialized successfully",
                    [LogField::string("url", store.url())],
                );
                ProviderBundle { store: Some(store) }
            }
            Err(err) => {
                self.logger.errorf(
                    &ctx,
                    format_args!("Failed to create redis provider: {:#}", err),
                );
                self.logger.error(
                    &ctx,
                    "Please check your Redis configuration and ensure Redis is running",
                    [],
                );
                self.logger.error(&ctx, "For local development, you can:", []);
                self.logger.error(
                    &ctx,
                    "1. Start Redis locally: docker run -d -p 6379:6379 redis:alpine",
                    [],
                );
                self.logger.error(
                    &ctx,
                    "2. Or set REDIS_HOST=localhost:6379 in your environment",
                    [],
                );
                self.logger.error(&ctx, "Continuing without Redis", []);

                ProviderBundle::default()
            }
        }
    }
}
