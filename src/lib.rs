pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod utils;
pub mod weather;

pub use cache::{CacheKey, WeatherCache};
pub use client::{ClientError, WeatherApiClient};
pub use config::Config;
pub use error::ApiError;
pub use rate_limit::RateLimiter;
pub use routes::{create_router, AppState};
