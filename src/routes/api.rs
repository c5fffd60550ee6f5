// JSON endpoints backing the catalog widgets

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};

use super::catalog::{self, CatalogQuery};
use crate::catalog::paging::PageStrip;
use crate::catalog::{Scope, SortSpec};
use crate::error::AppError;
use crate::reconcile::Listing;
use crate::AppState;

// --- Response Wrappers ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogResponse {
    listings: Vec<Listing>,
    total_matching: u64,
    total_count: u64,
    page: u32,
    page_size: u32,
    total_pages: u32,
    sort: SortSpec,
    // Absent when everything fits on one page
    pagination: Option<PageStrip>,
}

#[derive(Serialize)]
struct ModelOption {
    id: String,
    name: String,
}

#[derive(Serialize)]
struct ModelsResponse {
    models: Vec<ModelOption>,
}

// --- Request Structs ---

#[derive(Deserialize)]
pub struct AutocompleteQuery {
    #[serde(default)]
    query: String,
}

#[derive(Deserialize)]
pub struct ModelsQuery {
    #[serde(default, alias = "brand_id")]
    brand: Option<String>,
}

// --- API Handlers ---

pub async fn list_cars(
    State(app_state): State<AppState>,
    Query(params): Query<CatalogQuery>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!("[HANDLER] /api/cars - Request received: {:?}", params);
    let directus = app_state.directus()?;

    let controller = catalog::load_catalog(&directus, Scope::All, params.to_state(&Scope::All)).await;
    if let Some(message) = controller.error() {
        tracing::error!("[HANDLER] /api/cars - Catalog fetch failed: {}", message);
        return Err(AppError::Unavailable(message.to_string()));
    }

    let state = controller.state().clone();
    let pagination = controller.page_strip();
    let page = controller.into_page();
    tracing::info!(
        "[HANDLER] /api/cars - Returning {} of {} matching listings.",
        page.items.len(),
        page.total_matching
    );
    Ok(Json(CatalogResponse {
        listings: page.items,
        total_matching: page.total_matching,
        total_count: page.total_count,
        page: state.page,
        page_size: state.page_size,
        total_pages: state.total_pages(),
        sort: state.sort,
        pagination,
    }))
}

pub async fn autocomplete(
    State(app_state): State<AppState>,
    Query(params): Query<AutocompleteQuery>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!("[HANDLER] /api/cars/autocomplete - Query: {:?}", params.query);
    let directus = app_state.directus()?;
    let names = directus.autocomplete(&params.query).await?;
    tracing::debug!("[HANDLER] /api/cars/autocomplete - {} suggestions.", names.len());
    Ok(Json(names))
}

pub async fn filter_options(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    tracing::info!("[HANDLER] /api/cars/filter-options - Request received.");
    let directus = app_state.directus()?;
    let options = directus.facet_options().await?;
    tracing::info!(
        "[HANDLER] /api/cars/filter-options - {} brands, {} years, {} colors, {} engine volumes.",
        options.brands.len(),
        options.years.len(),
        options.colors.len(),
        options.engine_volumes.len()
    );
    Ok(Json(options))
}

pub async fn models_for_brand(
    State(app_state): State<AppState>,
    Query(params): Query<ModelsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let directus = app_state.directus()?;
    let brand = params.brand.as_deref().map(str::trim).unwrap_or_default();
    tracing::info!("[HANDLER] /api/cars/models - Request received for brand: {:?}", brand);
    if brand.is_empty() {
        return Ok(Json(ModelsResponse { models: Vec::new() }));
    }

    let models = directus
        .series_for_brand(brand)
        .await?
        .into_iter()
        .map(|series| ModelOption {
            id: series.id,
            name: series.seriesname,
        })
        .collect();
    Ok(Json(ModelsResponse { models }))
}
