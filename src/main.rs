use axum::Router;
use clap::Parser;
use config::{Config, ConfigBuilder};
use error::Error;
use identity::IdentityProvider;
use log::{debug, info};
use std::{sync::Arc, time::SystemTime};
use store::{MemoryStore, PgStore, Store};
use tower_http::cors::CorsLayer;

mod api;
mod config;
mod error;
mod identity;
mod objects;
mod schema;
mod store;
mod utils;

/// Backend for planning trips with friends
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = String::from("/etc/waypoint/config.toml"))]
    config: String,
    /// Keep all data in process memory instead of Postgres
    #[arg(long)]
    in_memory: bool,
}

pub struct AppState {
    pub store: Box<dyn Store>,
    pub cache_pool: redis::Client,
    pub identity: IdentityProvider,
    pub config: Config,
    pub start_time: SystemTime,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = ConfigBuilder::load(args.config).await?.build()?;

    let web = config.web.clone();

    let store: Box<dyn Store> = if args.in_memory {
        info!("using in-memory storage, nothing is persisted");
        Box::new(MemoryStore::default())
    } else {
        let Some(database) = &config.database else {
            return Err(Error::ConfigError(
                "no [database] section configured, use --in-memory to run without one".to_string(),
            ));
        };

        debug!("using postgres storage at {}:{}", database.host(), database.port());

        PgStore::run_migrations(database).await?;

        Box::new(PgStore::connect(database)?)
    };

    let cache_pool = redis::Client::open(config.cache.redis.as_str())?;

    let identity = IdentityProvider::new(config.identity.userinfo_url.clone())?;

    let app_state = Arc::new(AppState {
        store,
        cache_pool,
        identity,
        config,
        start_time: SystemTime::now(),
    });

    let cors = CorsLayer::permissive();

    let app = Router::new()
        .nest("/api", api::router(app_state.clone()))
        .with_state(app_state)
        .layer(cors);

    let listener = tokio::net::TcpListener::bind((web.ip.as_str(), web.port)).await?;

    info!("listening on {}:{}", web.ip, web.port);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
impl AppState {
    /// State over an in-memory store, the cache client is never connected unless used
    pub fn for_tests(store: MemoryStore) -> Arc<Self> {
        let config = ConfigBuilder::parse("")
            .and_then(ConfigBuilder::build)
            .expect("default config is valid");

        Arc::new(Self {
            store: Box::new(store),
            cache_pool: redis::Client::open(config.cache.redis.as_str())
                .expect("default redis url is valid"),
            identity: IdentityProvider::new(config.identity.userinfo_url.clone())
                .expect("http client builds"),
            config,
            start_time: SystemTime::now(),
        })
    }
}
