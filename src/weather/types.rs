use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeResponse {
    pub name: String,
    pub local_names: Option<HashMap<String, String>>,
    pub lat: f64,
    pub lon: f64,
    pub country: Option<String>,
    pub state: Option<String>,
}

/// Typed view over the current-weather payload returned by the proxy.
///
/// The proxy itself treats payloads as opaque JSON; this struct is for
/// consumers that render them. Unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherData {
    #[serde(default)]
    pub clouds: Option<Clouds>,
    #[serde(default)]
    pub dt: i64,
    pub main: MainReadings,
    #[serde(default)]
    pub sys: Option<SunTimes>,
    #[serde(default)]
    pub weather: Vec<Condition>,
    #[serde(default)]
    pub wind: Option<Wind>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location_info: Option<LocationInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clouds {
    pub all: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainReadings {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SunTimes {
    pub sunrise: i64,
    pub sunset: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub main: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationInfo {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherMain {
    Clear,
    Clouds,
    Rain,
    Drizzle,
    Thunderstorm,
    Snow,
    Mist,
    Other,
}

impl From<&str> for WeatherMain {
    fn from(code: &str) -> Self {
        match code {
            "Clear" => WeatherMain::Clear,
            "Clouds" => WeatherMain::Clouds,
            "Rain" => WeatherMain::Rain,
            "Drizzle" => WeatherMain::Drizzle,
            "Thunderstorm" => WeatherMain::Thunderstorm,
            "Snow" => WeatherMain::Snow,
            "Mist" | "Fog" | "Haze" => WeatherMain::Mist,
            _ => WeatherMain::Other,
        }
    }
}

impl fmt::Display for WeatherMain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WeatherMain::Clear => "Clear",
            WeatherMain::Clouds => "Cloudy",
            WeatherMain::Rain => "Rain",
            WeatherMain::Drizzle => "Drizzle",
            WeatherMain::Thunderstorm => "Thunderstorm",
            WeatherMain::Snow => "Snow",
            WeatherMain::Mist => "Mist",
            WeatherMain::Other => "Unknown",
        };
        f.write_str(label)
    }
}

impl WeatherData {
    /// Geocoded name when present, otherwise the upstream station name.
    pub fn display_name(&self) -> &str {
        self.location_info
            .as_ref()
            .map(|info| info.name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.name)
    }

    pub fn condition(&self) -> WeatherMain {
        self.weather
            .first()
            .map(|c| WeatherMain::from(c.main.as_str()))
            .unwrap_or(WeatherMain::Other)
    }

    pub fn description(&self) -> Option<&str> {
        self.weather.first().map(|c| c.description.as_str())
    }

    pub fn wind_speed(&self) -> f64 {
        self.wind.as_ref().map(|w| w.speed).unwrap_or(0.0)
    }
}
