use service_template::config::Config;
use service_template::context::RequestContext;
use service_template::logging::{LogField, Logger, setup_tracing};
use service_template::resolver::Resolver;
use service_template::router::routes;
use service_template::web::server::run_webserver;

#[tokio::main]
async fn main() {
    let config = Config::from_env();
    setup_tracing(&config);

    let logger = match Logger::from_config(&config) {
        Ok(logger) => logger,
        Err(err) => {
            tracing::error!("{:#}", err);
            std::process::exit(1);
        }
    };

    let ctx = RequestContext::background();
    logger.info(
        &ctx,
        "Starting service",
        [
            LogField::string("version", config.app_version.clone()),
            LogField::string("environment", config.environment.clone()),
        ],
    );

    let server_context = Resolver::new(&config, &logger).resolve().await;
    logger.info(&ctx, "Setting up endpoints...", []);
    let routes = routes(&server_context, &config.app_name, &logger);

    if let Err(err) = run_webserver(routes, &config, &logger).await {
        logger.fatal(&ctx, "Server terminated unexpectedly", [LogField::error(&err)]);
    }
}
