use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::db::Db;
use crate::gate::ServiceGate;
use crate::notifier::Notifier;

// App state
pub struct AppState {
    pub db: Db,
    pub gate: ServiceGate,
    pub notifier: Arc<dyn Notifier>,
    pub config: Config,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(db: Db, notifier: Arc<dyn Notifier>, config: Config) -> Self {
        Self {
            db,
            gate: ServiceGate::new(),
            notifier,
            config,
            started_at: Instant::now(),
        }
    }

    /// Time since this process built its state
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
