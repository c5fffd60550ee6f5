// Route definitions

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::AppState;

mod api;
mod catalog;
mod pages;

// The state is provided here; main only adds static file serving on top
pub fn create_router(app_state: AppState) -> Router {
    let api_router = Router::new()
        .route("/cars", get(api::list_cars))
        .route("/cars/autocomplete", get(api::autocomplete))
        .route("/cars/filter-options", get(api::filter_options))
        .route("/cars/models", get(api::models_for_brand))
        .with_state(app_state.clone());

    Router::new()
        .route("/", get(pages::landing_page))
        .route("/about", get(pages::about_page))
        .route("/cars", get(pages::catalog_page))
        .route("/cars/:infoid", get(pages::car_page))
        .route("/cars/brand", get(pages::brands_page))
        .route("/cars/brand/:brand_id", get(pages::brand_page))
        .route("/cars/model/:series_id", get(pages::model_page))
        .route("/cars/year/:year", get(pages::year_page))
        .nest("/api", api_router)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
