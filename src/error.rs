use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::weather::OpenWeatherError;

pub const COORDINATES_REQUIRED: &str = "Either city name or lat/lon coordinates are required";

/// Request-terminating failures of the weather endpoint.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("API key not configured on server")]
    MissingApiKey,
    #[error("{0}")]
    Validation(String),
    #[error("City \"{0}\" not found")]
    CityNotFound(String),
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Rate limit exceeded. Try again later.")]
    RateLimited,
    #[error("{0}")]
    Upstream(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingApiKey | ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::CityNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl From<OpenWeatherError> for ApiError {
    fn from(err: OpenWeatherError) -> Self {
        match err {
            OpenWeatherError::MissingApiKey => ApiError::MissingApiKey,
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorBody {
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}
