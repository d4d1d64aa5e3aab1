use crate::service::ServiceContext;
use std::sync::Arc;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ServiceContext>,
}

impl AppState {
    pub fn new(service: Arc<ServiceContext>) -> Self {
        Self { service }
    }
}
