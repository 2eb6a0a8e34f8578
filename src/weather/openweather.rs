use super::types::GeocodeResponse;
use crate::config::Config;
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpenWeatherError {
    #[error("API key not configured on server")]
    MissingApiKey,
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("JSON parsing failed: {0}")]
    JsonParsing(#[from] serde_json::Error),
    #[error("Geocoding failed: {0}")]
    GeocodingFailed(u16),
    #[error("Weather API failed: {0}")]
    WeatherFailed(u16),
}

/// Coordinates to query the current-weather endpoint with.
///
/// Caller-supplied coordinates are forwarded as the text they arrived in;
/// geocoded ones are formatted from the upstream floats.
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinates {
    pub lat: String,
    pub lon: String,
}

impl From<&GeocodeResponse> for Coordinates {
    fn from(place: &GeocodeResponse) -> Self {
        Self {
            lat: place.lat.to_string(),
            lon: place.lon.to_string(),
        }
    }
}

pub struct OpenWeatherClient {
    client: Client,
    config: Config,
}

impl OpenWeatherClient {
    pub fn new(config: Config) -> Result<Self, OpenWeatherError> {
        let client = Client::builder()
            .user_agent("WeatherProxy/1.0")
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn is_configured(&self) -> bool {
        self.config.openweather_api_key.is_some()
    }

    /// Resolve a free-text city name. Returns at most one match.
    pub async fn geocode_direct(
        &self,
        query: &str,
    ) -> Result<Vec<GeocodeResponse>, OpenWeatherError> {
        let api_key = self.api_key()?;
        let url = format!(
            "{}{}",
            self.config.openweather_base_url, self.config.openweather_geocode_direct_path
        );

        let response = self
            .client
            .get(&url)
            .query(&[("q", query), ("limit", "1"), ("appid", api_key)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(OpenWeatherError::GeocodingFailed(
                response.status().as_u16(),
            ));
        }

        let geocode: Vec<GeocodeResponse> = serde_json::from_value(read_json(response).await?)?;
        Ok(geocode)
    }

    /// Fetch current conditions. The body is returned untouched.
    pub async fn get_current_weather(
        &self,
        coords: &Coordinates,
        units: &str,
    ) -> Result<Value, OpenWeatherError> {
        let api_key = self.api_key()?;
        let url = format!(
            "{}{}",
            self.config.openweather_base_url, self.config.openweather_weather_path
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", coords.lat.as_str()),
                ("lon", coords.lon.as_str()),
                ("units", units),
                ("appid", api_key),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Weather API returned {}: {}", status, error_text);
            return Err(OpenWeatherError::WeatherFailed(status.as_u16()));
        }

        read_json(response).await
    }

    fn api_key(&self) -> Result<&str, OpenWeatherError> {
        self.config
            .openweather_api_key
            .as_deref()
            .ok_or(OpenWeatherError::MissingApiKey)
    }
}

async fn read_json(response: Response) -> Result<Value, OpenWeatherError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
