pub mod api;
pub mod call;
pub mod config;
pub mod cors;
pub mod errors;
pub mod executor;
pub mod handler;
pub mod metrics_defs;
pub mod router;
pub mod service;
pub mod upstream;

#[cfg(test)]
mod testutils;

use errors::RpcRouterError;
use service::RpcRouterService;
use shared::admin_service::AdminService;
use shared::http::run_http_service;

pub async fn run(config: config::Config) -> Result<(), RpcRouterError> {
    config.validate()?;

    let router_service = RpcRouterService::new(&config)?;
    let admin_service = AdminService::<_, RpcRouterError>::new(|| true);

    let router_task = run_http_service(&config.listener.host, config.listener.port, router_service);
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        admin_service,
    );

    tokio::try_join!(router_task, admin_task)?;
    Ok(())
}
