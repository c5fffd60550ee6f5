// Server-rendered storefront pages

use askama::Template;
use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse},
};
use std::sync::Arc;

use super::catalog::{self, CatalogQuery, FacetChoices, PageLinks, SortLink};
use crate::catalog::{Scope, ViewStatus};
use crate::catalog::query;
use crate::directus::{DirectusClient, FilterOptions};
use crate::error::{AppError, PageResult};
use crate::models::Brand;
use crate::reconcile::{self, Listing};
use crate::AppState;

const FEATURED_COUNT: u32 = 8;

mod filters {
    use crate::reconcile::group_thousands;
    use std::fmt::Display;

    /// `1234567` → `1 234 567`
    pub fn thousands<T: Display>(value: T) -> ::askama::Result<String> {
        Ok(group_thousands(&value.to_string(), " "))
    }
}

fn render<T: Template>(template: &T, name: &str) -> PageResult<Html<String>> {
    match template.render() {
        Ok(html) => Ok(Html(html)),
        Err(e) => {
            tracing::error!("Failed to render {} template: {}", name, e);
            Err(AppError::Render(e).into())
        }
    }
}

#[derive(Template)]
#[template(path = "landing.html")]
struct LandingTemplate {
    featured: Vec<Listing>,
    brands: Vec<Brand>,
}

pub async fn landing_page(State(app_state): State<AppState>) -> PageResult<impl IntoResponse> {
    tracing::info!("[PAGE] / - Request received.");
    let directus = app_state.directus()?;

    let featured_query = query::featured_listings(FEATURED_COUNT);
    let (featured, brands) = tokio::join!(
        directus.resolved_listings(&featured_query),
        directus.fetch_brands(),
    );
    let brands = brands.unwrap_or_else(|e| {
        tracing::warn!("[PAGE] / - Brand list unavailable: {}", e);
        Vec::new()
    });

    let template = LandingTemplate {
        featured: reconcile::to_listings(featured, &directus.assets()),
        brands,
    };
    render(&template, "landing")
}

#[derive(Template)]
#[template(path = "about.html")]
struct AboutTemplate;

pub async fn about_page() -> PageResult<impl IntoResponse> {
    render(&AboutTemplate, "about")
}

#[derive(Template)]
#[template(path = "catalog.html")]
struct CatalogTemplate {
    heading: String,
    path: String,
    status: ViewStatus,
    error: Option<String>,
    listings: Vec<Listing>,
    total_matching: u64,
    total_count: u64,
    pages: Option<PageLinks>,
    sort_links: Vec<SortLink>,
    // Raw form values
    search: String,
    brand: String,
    mileage_from: String,
    mileage_to: String,
    price_from: String,
    price_to: String,
    choices: FacetChoices,
    show_brand_facets: bool,
    show_year_facet: bool,
    has_filters: bool,
    retry_href: String,
}

/// Heading and base path of a catalog surface.
struct SurfaceInfo {
    heading: String,
    path: String,
}

async fn catalog_surface(
    directus: Arc<DirectusClient>,
    scope: Scope,
    info: SurfaceInfo,
    params: CatalogQuery,
) -> PageResult<Html<String>> {
    let state = params.to_state(&scope);
    let brand = state.filters.brand.clone();
    let show_brand_facets = scope == Scope::All;

    let models = async {
        if !show_brand_facets || brand.is_empty() {
            return Vec::new();
        }
        directus.series_for_brand(&brand).await.unwrap_or_else(|e| {
            tracing::warn!("Series list for brand {} unavailable: {}", brand, e);
            Vec::new()
        })
    };
    let options = async {
        directus.facet_options().await.unwrap_or_else(|e| {
            tracing::warn!("Filter options unavailable: {}", e);
            FilterOptions::default()
        })
    };
    let (controller, models, options) = tokio::join!(
        catalog::load_catalog(&directus, scope.clone(), state),
        models,
        options,
    );

    let state = controller.state().clone();
    let pages = controller
        .page_strip()
        .map(|strip| PageLinks::new(&info.path, &state, &strip));
    let status = controller.status();
    let error = controller.error().map(str::to_string);
    let page = controller.into_page();

    tracing::info!(
        "{} - {} of {} listings match, page {}",
        info.path,
        page.total_matching,
        page.total_count,
        state.page
    );

    let filters = &state.filters;
    let template = CatalogTemplate {
        heading: info.heading,
        status,
        error,
        listings: page.items,
        total_matching: page.total_matching,
        total_count: page.total_count,
        pages,
        sort_links: catalog::sort_links(&info.path, &state),
        search: filters.search.clone(),
        brand: filters.brand.clone(),
        mileage_from: filters.mileage.from.clone(),
        mileage_to: filters.mileage.to.clone(),
        price_from: filters.price.from.clone(),
        price_to: filters.price.to.clone(),
        choices: FacetChoices::new(&options, &models, filters),
        show_brand_facets,
        show_year_facet: !matches!(scope, Scope::Year(_)),
        has_filters: !filters.is_empty(),
        retry_href: catalog::href(&info.path, &state),
        path: info.path,
    };
    render(&template, "catalog")
}

pub async fn catalog_page(
    State(app_state): State<AppState>,
    Query(params): Query<CatalogQuery>,
) -> PageResult<impl IntoResponse> {
    tracing::info!("[PAGE] /cars - Request received: {:?}", params);
    let directus = app_state.directus()?;
    let info = SurfaceInfo {
        heading: "All cars".to_string(),
        path: "/cars".to_string(),
    };
    catalog_surface(directus, Scope::All, info, params).await
}

#[derive(Template)]
#[template(path = "brands.html")]
struct BrandsTemplate {
    brands: Vec<Brand>,
}

pub async fn brands_page(State(app_state): State<AppState>) -> PageResult<impl IntoResponse> {
    tracing::info!("[PAGE] /cars/brand - Request received.");
    let directus = app_state.directus()?;
    let mut brands = directus.fetch_brands().await?;
    brands.sort_by_key(|b| b.name.to_lowercase());
    render(&BrandsTemplate { brands }, "brands")
}

pub async fn brand_page(
    State(app_state): State<AppState>,
    Path(brand_id): Path<String>,
    Query(params): Query<CatalogQuery>,
) -> PageResult<impl IntoResponse> {
    tracing::info!("[PAGE] /cars/brand/{} - Request received.", brand_id);
    let directus = app_state.directus()?;

    let brands = directus.fetch_brands().await.unwrap_or_default();
    let name = brands
        .into_iter()
        .find(|b| b.id == brand_id)
        .map(|b| b.name)
        .unwrap_or_else(|| reconcile::UNRESOLVED_PLACEHOLDER.to_string());
    let info = SurfaceInfo {
        heading: name,
        path: format!("/cars/brand/{}", brand_id),
    };
    catalog_surface(directus, Scope::Brand(brand_id), info, params).await
}

pub async fn model_page(
    State(app_state): State<AppState>,
    Path(series_id): Path<String>,
    Query(params): Query<CatalogQuery>,
) -> PageResult<impl IntoResponse> {
    tracing::info!("[PAGE] /cars/model/{} - Request received.", series_id);
    let directus = app_state.directus()?;

    let series = directus.fetch_series().await.unwrap_or_default();
    let name = series
        .into_iter()
        .find(|s| s.id == series_id)
        .map(|s| s.seriesname)
        .unwrap_or_else(|| reconcile::UNRESOLVED_PLACEHOLDER.to_string());
    let info = SurfaceInfo {
        heading: name,
        path: format!("/cars/model/{}", series_id),
    };
    catalog_surface(directus, Scope::Series(series_id), info, params).await
}

pub async fn year_page(
    State(app_state): State<AppState>,
    Path(year): Path<String>,
    Query(params): Query<CatalogQuery>,
) -> PageResult<impl IntoResponse> {
    tracing::info!("[PAGE] /cars/year/{} - Request received.", year);
    let directus = app_state.directus()?;
    let year: u32 = year
        .trim()
        .parse()
        .map_err(|_| AppError::NotFound(format!("No listings for year '{}'", year)))?;

    let info = SurfaceInfo {
        heading: format!("Cars from {}", year),
        path: format!("/cars/year/{}", year),
    };
    catalog_surface(directus, Scope::Year(year), info, params).await
}

#[derive(Template)]
#[template(path = "car.html")]
struct CarTemplate {
    car: Listing,
    similar: Vec<Listing>,
}

pub async fn car_page(
    State(app_state): State<AppState>,
    Path(infoid): Path<String>,
) -> PageResult<impl IntoResponse> {
    tracing::info!("[PAGE] /cars/{} - Request received.", infoid);
    let directus = app_state.directus()?;
    let not_found = || AppError::NotFound(format!("Listing {} does not exist", infoid));

    let id: u64 = infoid.trim().parse().map_err(|_| not_found())?;
    let car = directus.fetch_car_by_infoid(id).await?.ok_or_else(not_found)?;
    let assets = directus.assets();
    let car = reconcile::to_listing(car, &assets);

    let pool_query = query::similar_pool(car.brand.id.as_deref(), car.series.id.as_deref());
    let pool = if car.brand.id.is_some() || car.series.id.is_some() {
        reconcile::to_listings(directus.resolved_listings(&pool_query).await, &assets)
    } else {
        Vec::new()
    };
    let similar = reconcile::similar_listings(&car, &pool);
    tracing::info!(
        "[PAGE] /cars/{} - {} similar listings from a pool of {}",
        infoid,
        similar.len(),
        pool.len()
    );

    render(&CarTemplate { car, similar }, "car")
}
