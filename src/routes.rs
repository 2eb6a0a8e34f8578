use axum::{
    extract::{rejection::QueryRejection, ConnectInfo, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::{
    cache::{CacheKey, RedisStore, WeatherCache},
    config::Config,
    error::{ApiError, COORDINATES_REQUIRED},
    rate_limit::{client_ip, RateLimiter},
    utils::{non_blank, parse_coordinates},
    weather::{Coordinates, OpenWeatherClient},
};

pub const DEFAULT_UNITS: &str = "metric";

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub weather_client: Arc<OpenWeatherClient>,
    pub cache: WeatherCache,
    pub rate_limiter: Option<Arc<RateLimiter>>,
}

impl AppState {
    /// Build state with the cache backend the configuration selects.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let cache = match &config.redis_url {
            Some(url) => {
                let store = RedisStore::new(url, config.cache_ttl(), config.redis_timeout())?;
                WeatherCache::new(Arc::new(store), config.cache_ttl())
            }
            None => WeatherCache::in_memory(config.cache_ttl(), config.cache_max_entries),
        };

        Self::with_cache(config, cache)
    }

    pub fn with_cache(config: Config, cache: WeatherCache) -> anyhow::Result<Self> {
        let weather_client = Arc::new(OpenWeatherClient::new(config.clone())?);
        let rate_limiter = config.rate_limit_enabled.then(|| {
            Arc::new(RateLimiter::new(
                config.rate_limit_max_requests,
                config.rate_limit_window(),
            ))
        });

        Ok(AppState {
            config: Arc::new(config),
            weather_client,
            cache,
            rate_limiter,
        })
    }
}

// Request/Response types
#[derive(Debug, Default, Deserialize)]
pub struct WeatherQuery {
    pub city: Option<String>,
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub units: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupTarget {
    City(String),
    Coords(Coordinates),
}

impl WeatherQuery {
    /// A city name wins over coordinates when both are supplied.
    pub fn target(&self) -> Result<LookupTarget, ApiError> {
        if let Some(city) = non_blank(&self.city) {
            return Ok(LookupTarget::City(city.to_string()));
        }

        match (non_blank(&self.lat), non_blank(&self.lon)) {
            (Some(lat), Some(lon)) => {
                parse_coordinates(lat, lon).map_err(ApiError::Validation)?;
                Ok(LookupTarget::Coords(Coordinates {
                    lat: lat.to_string(),
                    lon: lon.to_string(),
                }))
            }
            _ => Err(ApiError::Validation(COORDINATES_REQUIRED.to_string())),
        }
    }

    pub fn units(&self) -> &str {
        non_blank(&self.units).unwrap_or(DEFAULT_UNITS)
    }
}

impl LookupTarget {
    pub fn cache_key(&self, units: &str) -> CacheKey {
        match self {
            LookupTarget::City(city) => CacheKey::city(city, units),
            LookupTarget::Coords(coords) => CacheKey::coords(&coords.lat, &coords.lon, units),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
    pub cache_backend: String,
}

// Route handlers
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache_backend: state.cache.backend().to_string(),
    })
}

pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

pub async fn get_weather(
    State(state): State<AppState>,
    remote: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    query: Result<Query<WeatherQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    if let Some(limiter) = &state.rate_limiter {
        let client_id = client_ip(&headers, remote.map(|ConnectInfo(addr)| addr));
        if !limiter.check_and_record(&client_id) {
            tracing::warn!("Rate limit exceeded for {}", client_id);
            return Err(ApiError::RateLimited);
        }
    }

    let Query(params) = query.map_err(|rejection| {
        tracing::debug!("Rejected query string: {}", rejection.body_text());
        ApiError::Validation(rejection.body_text())
    })?;
    let target = params.target()?;
    let units = params.units();
    let cache_key = target.cache_key(units);

    match state.cache.get(&cache_key).await {
        Ok(Some(cached)) => {
            tracing::debug!("Cache hit for key: {}", cache_key);
            return Ok(Json(cached));
        }
        Ok(None) => {}
        Err(e) => tracing::warn!("Cache lookup failed for {}: {}", cache_key, e),
    }

    if !state.weather_client.is_configured() {
        tracing::error!("OPENWEATHER_API_KEY is not set; refusing weather lookup");
        return Err(ApiError::MissingApiKey);
    }

    let (coords, resolved_name) = match &target {
        LookupTarget::City(city) => {
            let places = state
                .weather_client
                .geocode_direct(city)
                .await
                .map_err(|e| {
                    tracing::error!("Geocoding {:?} failed: {}", city, e);
                    ApiError::from(e)
                })?;
            let place = places
                .first()
                .ok_or_else(|| ApiError::CityNotFound(city.clone()))?;
            (Coordinates::from(place), Some(place.name.clone()))
        }
        LookupTarget::Coords(coords) => (coords.clone(), None),
    };

    let mut payload = state
        .weather_client
        .get_current_weather(&coords, units)
        .await
        .map_err(|e| {
            tracing::error!("Weather fetch for {} failed: {}", cache_key, e);
            ApiError::from(e)
        })?;

    if let Some(name) = resolved_name {
        annotate_location(&mut payload, &name);
    }

    match state.cache.set(&cache_key, payload.clone()).await {
        Ok(()) => tracing::debug!("Cache set for key: {}", cache_key),
        Err(e) => tracing::warn!("Cache store failed for {}: {}", cache_key, e),
    }

    Ok(Json(payload))
}

/// Stamp the geocoded name both where flat and nested renderers look for it.
fn annotate_location(payload: &mut Value, name: &str) {
    if let Some(fields) = payload.as_object_mut() {
        fields.insert("name".to_string(), Value::String(name.to_string()));
        fields.insert("locationInfo".to_string(), json!({ "name": name }));
    }
}

// Create the router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/weather",
            // HEAD would otherwise fall through to the GET handler.
            get(get_weather)
                .head(method_not_allowed)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
}
