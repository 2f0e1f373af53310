//! Configuration management for the AppHub service

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::models::application::is_valid_app_id;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Interface the HTTP server binds to
    pub host: String,

    /// Port the HTTP server listens on
    pub port: u16,

    /// sqlx connection string for the relational store
    pub database_url: String,

    /// Upper bound of pooled database connections
    pub db_max_connections: u32,

    /// `development` or `production`
    pub environment: String,

    /// Notifier base URL used in production
    pub prod_notifier_url: Option<String>,

    /// Notifier base URL used outside production
    pub test_notifier_url: Option<String>,

    /// Identifier this service reports itself under
    pub app_id: String,

    /// Display name this service reports itself under
    pub app_name: String,

    /// HTTP timeout for outbound notifier calls
    pub notifier_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: "sqlite://apphub.db?mode=rwc".to_string(),
            db_max_connections: 10,
            environment: "development".to_string(),
            prod_notifier_url: None,
            test_notifier_url: None,
            app_id: "SYSTEM".to_string(),
            app_name: "Default Application".to_string(),
            notifier_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(host) = lookup("HOST") {
            config.host = host;
        }

        if let Some(port) = lookup("PORT") {
            if let Ok(port) = port.parse() {
                config.port = port;
            }
        }

        if let Some(database_url) = lookup("DATABASE_URL") {
            config.database_url = database_url;
        }

        if let Some(max) = lookup("DB_MAX_CONNECTIONS") {
            if let Ok(max) = max.parse() {
                config.db_max_connections = max;
            }
        }

        if let Some(environment) = lookup("APP_ENV").or_else(|| lookup("NODE_ENV")) {
            config.environment = environment.to_lowercase();
        }

        config.prod_notifier_url = lookup("API_LOG").filter(|url| !url.is_empty());
        config.test_notifier_url = lookup("TEST_ENV").filter(|url| !url.is_empty());

        if let Some(app_id) = lookup("APPID") {
            config.app_id = app_id;
        }

        if let Some(app_name) = lookup("APPNAME") {
            config.app_name = app_name;
        }

        if let Some(timeout) = lookup("NOTIFIER_TIMEOUT_SECONDS") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.notifier_timeout = Duration::from_secs(seconds);
            }
        }

        config
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Base URL of the sibling service that receives lifecycle logs
    pub fn notifier_base_url(&self) -> Option<&str> {
        if self.is_production() {
            self.prod_notifier_url.as_deref()
        } else {
            self.test_notifier_url.as_deref()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.host.is_empty() {
            return Err("host cannot be empty".to_string());
        }

        if self.port == 0 {
            return Err("port must be greater than 0".to_string());
        }

        if self.database_url.is_empty() {
            return Err("database_url cannot be empty".to_string());
        }

        if self.db_max_connections == 0 {
            return Err("db_max_connections must be greater than 0".to_string());
        }

        if !is_valid_app_id(&self.app_id) {
            return Err(format!(
                "app_id must be 6 uppercase letters or digits, got {:?}",
                self.app_id
            ));
        }

        if self.environment != "development" && self.environment != "production" {
            return Err(format!(
                "environment must be development or production, got {}",
                self.environment
            ));
        }

        Ok(())
    }
}
