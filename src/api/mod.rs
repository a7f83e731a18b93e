pub mod health;
pub mod messages;
pub mod metrics;
pub mod openapi;
pub mod participants;
pub mod status;

use std::sync::Arc;

use axum::http::HeaderMap;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::Config;
use crate::store::{MessageLog, ParticipantDirectory};
use crate::sweeper::{LivenessSweeper, SweeperConfig};

/// Header carrying the name of the participant making the request
pub const USER_HEADER: &str = "user";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<dyn ParticipantDirectory>,
    pub log: Arc<dyn MessageLog>,
    pub config: Config,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Build the state over a store that backs both the directory and the log
    pub fn new<S>(store: S, config: Config) -> Self
    where
        S: ParticipantDirectory + MessageLog + 'static,
    {
        let store = Arc::new(store);
        Self {
            directory: store.clone(),
            log: store,
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Sweeper sharing this state's storage handles
    pub fn sweeper(&self) -> LivenessSweeper {
        LivenessSweeper::new(
            self.directory.clone(),
            self.log.clone(),
            SweeperConfig::from(&self.config),
        )
    }
}

/// Name found in the `user` header, if any
pub(crate) fn user_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
