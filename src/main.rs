mod calculator;
mod config;
mod error;
mod facade;
mod gateway;
mod internal_auth;
mod models;
mod posts;
mod server;
mod state;
mod upstream;
mod users;


use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::server::{ServerError, serve};

#[derive(Parser, Debug)]
#[command(name = "meshgate", about = "API gateway, backend services and query façade")]
struct Cli {
    #[command(subcommand)]
    service: Service,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Service {
    /// Public gateway (`GATEWAY_PORT`).
    Gateway,
    /// Service A, users (`USERS_PORT`).
    Users,
    /// Service B, posts (`POSTS_PORT`).
    Posts,
    /// Service C, calculator (`CALCULATOR_PORT`).
    Calculator,
    /// Query-aggregation façade (`FACADE_PORT`).
    Facade,
    /// Every service in one process.
    All,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli.service).await {
        tracing::error!(error = %e, "fatal");
        std::process::exit(1);
    }
}

async fn run(service: Service) -> Result<(), ServerError> {
    let config = Config::from_env()?;
    if config.internal_key_is_default && matches!(service, Service::Gateway | Service::Users | Service::Posts | Service::All)
    {
        tracing::warn!("INTERNAL_API_KEY not set; using the development key");
    }

    match service {
        Service::Gateway => run_gateway(&config).await,
        Service::Users => run_users(&config).await,
        Service::Posts => run_posts(&config).await,
        Service::Calculator => run_calculator(&config).await,
        Service::Facade => run_facade(&config).await,
        Service::All => {
            tokio::try_join!(
                run_users(&config),
                run_posts(&config),
                run_calculator(&config),
                run_gateway(&config),
                run_facade(&config),
            )?;
            Ok(())
        }
    }
}

async fn run_gateway(config: &Config) -> Result<(), ServerError> {
    let app = gateway::router(gateway::build_state(config)?);
    serve("gateway", config.addr(config.ports.gateway), app).await
}

async fn run_users(config: &Config) -> Result<(), ServerError> {
    let app = users::router(users::build_state(config).await?);
    serve("users", config.addr(config.ports.users), app).await
}

async fn run_posts(config: &Config) -> Result<(), ServerError> {
    let app = posts::router(posts::build_state(config)?);
    serve("posts", config.addr(config.ports.posts), app).await
}

async fn run_calculator(config: &Config) -> Result<(), ServerError> {
    serve("calculator", config.addr(config.ports.calculator), calculator::router()).await
}

async fn run_facade(config: &Config) -> Result<(), ServerError> {
    let app = facade::router(facade::build_state(config)?);
    serve("facade", config.addr(config.ports.facade), app).await
}
