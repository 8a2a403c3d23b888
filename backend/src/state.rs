use std::sync::Arc;

use crate::{metrics::HttpMetrics, store::TaskStore};

/// Shared by every handler; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TaskStore>,
    pub metrics: HttpMetrics,
}

impl AppState {
    pub fn new(store: Arc<dyn TaskStore>, metrics: HttpMetrics) -> Self {
        Self { store, metrics }
    }
}
