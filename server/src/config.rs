use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_TELEMETRY_BASE_URL: &str = "https://a.windbornesystems.com/treasure";
const DEFAULT_HAZARD_FEED_URL: &str = "https://eonet.gsfc.nasa.gov/api/v3/events?status=open";

/// Where the engine fetches its two feeds from.
#[derive(Clone, Debug, PartialEq)]
pub struct Sources {
    pub telemetry_base_url: String,
    pub hazard_feed_url: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_telemetry_base_url")]
    pub telemetry_base_url: String,
    #[serde(default = "default_hazard_feed_url")]
    pub hazard_feed_url: String,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_request_deadline_secs")]
    pub request_deadline_secs: u64,
}

fn default_telemetry_base_url() -> String {
    DEFAULT_TELEMETRY_BASE_URL.to_string()
}

fn default_hazard_feed_url() -> String {
    DEFAULT_HAZARD_FEED_URL.to_string()
}

fn default_cache_ttl_secs() -> u64 {
    60
}

fn default_request_deadline_secs() -> u64 {
    45
}

impl Config {
    /// Read `FLEET_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_iter(std::env::vars())
    }

    fn from_iter(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self> {
        envy::prefixed("FLEET_")
            .from_iter(vars)
            .context("Invalid FLEET_* configuration")
    }

    pub fn sources(&self) -> Sources {
        Sources {
            telemetry_base_url: self.telemetry_base_url.clone(),
            hazard_feed_url: self.hazard_feed_url.clone(),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_deadline(&self) -> Duration {
        Duration::from_secs(self.request_deadline_secs)
    }
}
