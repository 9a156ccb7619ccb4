use std::sync::Arc;

use crate::services::RefreshController;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<RefreshController>,
}

impl AppState {
    pub fn new(controller: RefreshController) -> Self {
        Self {
            controller: Arc::new(controller),
        }
    }
}
