use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub openweather_api_key: Option<String>,
    pub openweather_base_url: String,
    pub openweather_geocode_direct_path: String,
    pub openweather_weather_path: String,
    pub redis_url: Option<String>,
    pub redis_timeout_ms: u64,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: u64,
    pub rate_limit_enabled: bool,
    pub rate_limit_max_requests: usize,
    pub rate_limit_window_secs: u64,
    pub server_host: String,
    pub server_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openweather_api_key: None,
            openweather_base_url: "https://api.openweathermap.org".to_string(),
            openweather_geocode_direct_path: "/geo/1.0/direct".to_string(),
            openweather_weather_path: "/data/2.5/weather".to_string(),
            redis_url: None,
            redis_timeout_ms: 2000,
            cache_ttl_secs: 600,
            cache_max_entries: 10_000,
            rate_limit_enabled: true,
            rate_limit_max_requests: 100,
            rate_limit_window_secs: 3600,
            server_host: "0.0.0.0".to_string(),
            server_port: 8080,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Config::default();

        Ok(Config {
            openweather_api_key: non_empty_var("OPENWEATHER_API_KEY"),
            openweather_base_url: env::var("OPENWEATHER_BASE_URL")
                .unwrap_or(defaults.openweather_base_url),
            openweather_geocode_direct_path: env::var("OPENWEATHER_GEOCODE_DIRECT_PATH")
                .unwrap_or(defaults.openweather_geocode_direct_path),
            openweather_weather_path: env::var("OPENWEATHER_WEATHER_PATH")
                .unwrap_or(defaults.openweather_weather_path),
            redis_url: non_empty_var("REDIS_URL"),
            redis_timeout_ms: parse_var("REDIS_TIMEOUT_MS", defaults.redis_timeout_ms)?,
            cache_ttl_secs: parse_var("CACHE_TTL_SECS", defaults.cache_ttl_secs)?,
            cache_max_entries: parse_var("CACHE_MAX_ENTRIES", defaults.cache_max_entries)?,
            rate_limit_enabled: parse_var("RATE_LIMIT_ENABLED", defaults.rate_limit_enabled)?,
            rate_limit_max_requests: parse_var(
                "RATE_LIMIT_MAX_REQUESTS",
                defaults.rate_limit_max_requests,
            )?,
            rate_limit_window_secs: parse_var(
                "RATE_LIMIT_WINDOW_SECS",
                defaults.rate_limit_window_secs,
            )?,
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_var("SERVER_PORT", defaults.server_port)?,
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn redis_timeout(&self) -> Duration {
        Duration::from_millis(self.redis_timeout_ms)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty_var(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has invalid value {:?}: {}", name, raw, e)),
        None => Ok(default),
    }
}
