use std::{sync::Arc, time::Duration};

use weather_core::{FetchAndStore, ProcessStore, Throttle, WeatherProvider};

/// Shared application state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProcessStore>,
    pub fetcher: FetchAndStore,
    /// Overall limit on the bulk fetch route.
    pub route_timeout: Duration,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ProcessStore>,
        provider: Arc<dyn WeatherProvider>,
        throttle: Arc<dyn Throttle>,
        route_timeout: Duration,
    ) -> Self {
        Self {
            fetcher: FetchAndStore::new(store.clone(), provider, throttle),
            store,
            route_timeout,
        }
    }
}
