use placemark::config::{Config, StoreBackend};
use placemark::db::{MemoryStore, PgStore};
use placemark::engine::Engine;
use placemark::error::{config_error, Error};
use placemark::server::serve;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;

    let engine = match config.store {
        StoreBackend::Postgres => {
            let db_uri = config
                .database_url
                .as_deref()
                .ok_or_else(|| config_error("DATABASE_URL is not set"))?;

            Engine::new(PgStore::new(db_uri, config.max_connections).await?)
        }
        StoreBackend::Memory => {
            tracing::warn!("using the in-memory store, data is lost on exit");
            Engine::new(MemoryStore::new())
        }
    };

    serve(engine, config.listen_addr).await
}
