use std::sync::Arc;

use feelsy_core::FeelService;
use tokio::sync::Notify;

use crate::error::AppError;

pub struct State {
    pub service: Arc<FeelService>,
    /// Signalled after each accepted check-in so the streak worker runs early.
    pub worker_wake: Arc<Notify>,
}

impl State {
    pub fn new(service: Arc<FeelService>) -> Arc<Self> {
        Arc::new(Self {
            service,
            worker_wake: Arc::new(Notify::new()),
        })
    }

    /// Run a blocking core call off the async runtime.
    pub async fn run<T, F>(&self, f: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&FeelService) -> feelsy_core::Result<T> + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        let result = tokio::task::spawn_blocking(move || f(&service)).await?;
        Ok(result?)
    }
}
