use crate::config::Config;
use crate::context::RequestContext;
use crate::logging::Logger;
use crate::tools::system;
use crate::web::middleware::with_lifecycle;
use anyhow::Context;
use hyper::Server;
use hyper::server::conn::AddrStream;
use hyper::service::make_service_fn;
use std::convert::Infallible;
use std::time::Duration;
use warp::filters::BoxedFilter;
use warp::reply::Response;

/// Serves the given routes until the process receives a termination signal.
///
/// Every connection gets its own middleware stack which knows the peer address. The request
/// head must arrive within the read timeout and the response must be produced within the
/// write timeout.
pub async fn run_webserver(
    routes: BoxedFilter<(Response,)>,
    config: &Config,
    logger: &Logger,
) -> anyhow::Result<()> {
    let bind_address = config.bind_address();
    let socket_address = tokio::net::lookup_host(&bind_address)
        .await
        .with_context(|| format!("Failed to resolve bind address {}", bind_address))?
        .next()
        .with_context(|| format!("Bind address {} did not resolve", bind_address))?;

    let svc = warp::service(routes);
    let write_timeout = config.server.write_timeout;
    let connection_logger = logger.clone();

    let make_svc = make_service_fn(move |conn: &AddrStream| {
        let svc = with_lifecycle(
            svc.clone(),
            connection_logger.clone(),
            write_timeout,
            Some(conn.remote_addr()),
        );
        async move { Ok::<_, Infallible>(svc) }
    });

    let server = Server::try_bind(&socket_address)
        .with_context(|| format!("Failed to bind HTTP server to {}", socket_address))?
        .http1_header_read_timeout(config.server.read_timeout)
        .serve(make_svc);

    logger.infof(
        &RequestContext::background(),
        format_args!("Server listening on {}", server.local_addr()),
    );

    server
        .with_graceful_shutdown(system::await_termination())
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP Server has been stopped...");
    // Give spawned connection tasks a moment to flush their completion records.
    tokio::time::sleep(Duration::from_millis(500)).await;
    logger.info(&RequestContext::background(), "Server stopped", []);

    Ok(())
}
