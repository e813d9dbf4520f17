use crate::cache::{DOGS_WINDOW, REFERENCE_WINDOW, ResponseCache};
use crate::dashboard::Dashboard;
use crate::error::GatewayResult;
use crate::filter::FilterEngine;
use crate::gateway::{DEFAULT_BASE_URL, RemoteGateway};
use crate::storage::FileStorage;
use std::path::PathBuf;
use std::time::Duration;

pub const STORAGE_FILE: &str = "storage.json";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub dogs_cache: Duration,
    pub reference_cache: Duration,
    pub retries: u32,
    pub retry_delay_ms: u64,
    pub timeout: Duration,
    pub state_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_BASE_URL.to_string(),
            dogs_cache: DOGS_WINDOW,
            reference_cache: REFERENCE_WINDOW,
            retries: 2,
            retry_delay_ms: 500,
            timeout: Duration::from_secs(10),
            state_dir: PathBuf::from(".shelter-dash"),
        }
    }
}

impl Config {
    pub fn storage_path(&self) -> PathBuf {
        self.state_dir.join(STORAGE_FILE)
    }

    pub fn gateway(&self) -> GatewayResult<RemoteGateway> {
        Ok(RemoteGateway::with_timeout(&self.api_url, self.timeout)?
            .with_delay(self.retry_delay_ms)
            .with_max_retries(self.retries)
            .with_cache(ResponseCache::with_windows(
                self.dogs_cache,
                self.reference_cache,
            )))
    }

    /// Session state with filters restored from the state directory.
    pub fn dashboard(&self) -> GatewayResult<Dashboard> {
        let filters = FilterEngine::load(Box::new(FileStorage::new(self.storage_path())));
        Ok(Dashboard::new(self.gateway()?, filters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_url, "http://localhost:8000/api");
        assert_eq!(config.dogs_cache, Duration::from_secs(1800));
        assert_eq!(config.reference_cache, Duration::from_secs(86400));
        assert_eq!(config.storage_path(), PathBuf::from(".shelter-dash/storage.json"));
    }

    #[test]
    fn test_gateway_carries_settings() {
        let config = Config {
            retries: 4,
            retry_delay_ms: 50,
            ..Config::default()
        };
        let gateway = config.gateway().unwrap();

        assert_eq!(gateway.max_retries, 4);
        assert_eq!(gateway.base_delay, Duration::from_millis(50));
    }

    #[test]
    fn test_dashboard_restores_saved_filters() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            state_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        std::fs::write(
            config.storage_path(),
            r#"{"dogFilters": "{\"breed\":\"Poodle\",\"rescueType\":\"Water\"}"}"#,
        )
        .unwrap();

        let dashboard = config.dashboard().unwrap();
        assert_eq!(dashboard.criteria().breed, "Poodle");
        assert_eq!(dashboard.criteria().rescue_type, "Water");
    }
}
