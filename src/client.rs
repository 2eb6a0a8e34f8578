//! Client for the proxy's `/api/weather` endpoint.
//!
//! Keeps its own short-lived cache in front of the proxy using the same
//! key policy and TTL as the server side.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::cache::{CacheKey, WeatherCache};
use crate::routes::DEFAULT_UNITS;
use crate::weather::WeatherData;

const DEFAULT_TTL: Duration = Duration::from_secs(600);
const DEFAULT_MAX_ENTRIES: u64 = 100;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("JSON parsing failed: {0}")]
    JsonParsing(#[from] serde_json::Error),
    /// Failure reported by the proxy, ready for display.
    #[error("{0}")]
    Api(String),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

pub struct WeatherApiClient {
    client: Client,
    endpoint: String,
    cache: WeatherCache,
}

impl WeatherApiClient {
    /// `base_url` is the proxy origin, e.g. `http://localhost:8080`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_cache(
            base_url,
            WeatherCache::in_memory(DEFAULT_TTL, DEFAULT_MAX_ENTRIES),
        )
    }

    pub fn with_cache(base_url: &str, cache: WeatherCache) -> Result<Self, ClientError> {
        let client = Client::builder()
            .user_agent("WeatherProxyClient/1.0")
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/weather", base_url.trim_end_matches('/')),
            cache,
        })
    }

    pub async fn weather_by_city(&self, city: &str) -> Result<WeatherData, ClientError> {
        let key = CacheKey::city(city, DEFAULT_UNITS);
        let query = [("city", city), ("units", DEFAULT_UNITS)];
        self.fetch(&key, &query, Some(city)).await
    }

    pub async fn weather_by_coords(
        &self,
        lat: f64,
        lon: f64,
        units: &str,
    ) -> Result<WeatherData, ClientError> {
        let (lat, lon) = (lat.to_string(), lon.to_string());
        let key = CacheKey::coords(&lat, &lon, units);
        let query = [("lat", lat.as_str()), ("lon", lon.as_str()), ("units", units)];
        self.fetch(&key, &query, None).await
    }

    pub async fn clear_cache(&self) {
        if let Err(e) = self.cache.clear().await {
            tracing::warn!("Failed to clear client cache: {}", e);
        }
    }

    async fn fetch(
        &self,
        key: &CacheKey,
        query: &[(&str, &str)],
        city: Option<&str>,
    ) -> Result<WeatherData, ClientError> {
        match self.cache.get(key).await {
            Ok(Some(cached)) => {
                tracing::debug!("Client cache hit for {}", key);
                return Ok(serde_json::from_value(cached)?);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Client cache lookup failed for {}: {}", key, e),
        }

        let response = self.client.get(&self.endpoint).query(query).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body: Option<ErrorBody> = response.json().await.ok();
            return Err(ClientError::Api(error_message(status, body, city)));
        }

        let payload: Value = response.json().await?;
        let data: WeatherData = serde_json::from_value(payload.clone())?;

        if let Err(e) = self.cache.set(key, payload).await {
            tracing::warn!("Client cache store failed for {}: {}", key, e);
        }
        Ok(data)
    }
}

fn error_message(status: StatusCode, body: Option<ErrorBody>, city: Option<&str>) -> String {
    if let Some(message) = body.and_then(|b| b.error) {
        return message;
    }

    match city {
        Some(city) if status == StatusCode::NOT_FOUND => format!("City \"{}\" not found", city),
        _ => format!(
            "API error: {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        )
        .trim_end()
        .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_body() {
        let body = ErrorBody {
            error: Some("Rate limit exceeded. Try again later.".to_string()),
        };
        assert_eq!(
            error_message(StatusCode::TOO_MANY_REQUESTS, Some(body), None),
            "Rate limit exceeded. Try again later."
        );
    }

    #[test]
    fn test_error_message_fallbacks() {
        assert_eq!(
            error_message(StatusCode::NOT_FOUND, None, Some("Atlantis")),
            "City \"Atlantis\" not found"
        );
        assert_eq!(
            error_message(StatusCode::NOT_FOUND, None, None),
            "API error: 404 Not Found"
        );
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, Some(ErrorBody { error: None }), None),
            "API error: 502 Bad Gateway"
        );
    }

    #[test]
    fn test_endpoint_normalization() {
        let client = WeatherApiClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.endpoint, "http://localhost:8080/api/weather");
    }
}
