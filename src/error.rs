// Error types and their conversion into HTTP responses

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::directus::FetchError;

#[derive(Debug, Error)]
pub enum AppError {
    // Deployment defect: a required setting is missing
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("upstream request failed: {0}")]
    Upstream(#[from] FetchError),
    // Upstream failure already reduced to a message by the catalog controller
    #[error("upstream request failed: {0}")]
    Unavailable(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("template rendering failed: {0}")]
    Render(#[from] askama::Error),
    #[error(transparent)]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // Message safe to show to clients
    pub fn public_message(&self) -> String {
        match self {
            AppError::Configuration(message) => message.clone(),
            AppError::Upstream(_) | AppError::Unavailable(_) => {
                "Failed to fetch data from the catalog service".to_string()
            }
            AppError::NotFound(message) => message.clone(),
            AppError::Render(_) | AppError::InternalServerError(_) => {
                "Internal Server Error".to_string()
            }
        }
    }

    fn log(&self) {
        match self {
            AppError::NotFound(message) => tracing::info!("Not found: {}", message),
            AppError::Configuration(message) => tracing::error!("Configuration error: {}", message),
            other => tracing::error!("Request failed: {:?}", other),
        }
    }
}

// JSON API responses: `{ "error": "..." }`
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        let body = Json(json!({ "error": self.public_message() }));
        (self.status(), body).into_response()
    }
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate {
    status: u16,
    message: String,
}

/// Error returned from HTML page handlers; renders the error page instead of JSON.
#[derive(Debug)]
pub struct PageError(pub AppError);

impl<E> From<E> for PageError
where
    E: Into<AppError>,
{
    fn from(error: E) -> Self {
        PageError(error.into())
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let error = self.0;
        error.log();
        let status = error.status();
        let template = ErrorTemplate {
            status: status.as_u16(),
            message: error.public_message(),
        };
        match template.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!("Failed to render error template: {}", e);
                (status, error.public_message()).into_response()
            }
        }
    }
}

pub type PageResult<T> = Result<T, PageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_surface_their_message() {
        let error = AppError::Configuration("APP_DIRECTUS_URL is not set".to_string());
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.public_message(), "APP_DIRECTUS_URL is not set");
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let error = AppError::from(anyhow::anyhow!("secret connection string"));
        assert_eq!(error.public_message(), "Internal Server Error");
    }

    #[test]
    fn not_found_maps_to_404() {
        let error = AppError::NotFound("listing 42".to_string());
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
    }
}
