mod group_api;
mod membership_api;
mod place_api;
mod search_api;

use std::sync::Arc;

use crate::{api::API, db::Store};

pub struct Engine {
    store: Arc<dyn Store>,
}

impl Engine {
    #[tracing::instrument(name = "Engine::new", skip_all)]
    pub fn new<S: Store + 'static>(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }
}

impl API for Engine {}

#[cfg(test)]
fn test_engine() -> Engine {
    Engine::new(crate::db::MemoryStore::new())
}
