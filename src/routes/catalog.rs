// Query-string handling and the fetch flow shared by the HTML and JSON catalog routes

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::catalog::paging::PageStrip;
use crate::catalog::{
    CatalogAction, CatalogController, CatalogState, FilterAction, FilterState, RangeInput, Scope,
    SortField, SortOrder, SortSpec,
};
use crate::directus::{DirectusClient, FilterOptions};
use crate::models::{Brand, Series};
use crate::reconcile::{self, Listing};

/// Catalog query parameters as they appear in page URLs and form submissions.
///
/// Everything is read as raw text so a malformed value drops that facet
/// instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CatalogQuery {
    pub search: Option<String>,
    #[serde(alias = "brand_id")]
    pub brand: Option<String>,
    #[serde(alias = "series_id")]
    pub series: Option<String>,
    // Brand the series dropdown was built for
    pub applied_brand: Option<String>,
    pub color: Option<String>,
    pub engine_volume: Option<String>,
    pub year: Option<String>,
    pub mileage_from: Option<String>,
    #[serde(alias = "mileage")]
    pub mileage_to: Option<String>,
    pub price_from: Option<String>,
    #[serde(alias = "price")]
    pub price_to: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: Option<String>,
}

fn text(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

impl CatalogQuery {
    /// Builds the catalog state for a surface. The facets go through the
    /// reducer, so a brand that differs from `appliedBrand` drops the series.
    pub fn to_state(&self, scope: &Scope) -> CatalogState {
        let brand = text(&self.brand);
        let applied_brand = match &self.applied_brand {
            Some(applied) => applied.trim().to_string(),
            None => brand.clone(),
        };
        let submitted = FilterState {
            brand: applied_brand,
            series: text(&self.series),
            ..FilterState::default()
        };

        let actions = [
            FilterAction::SetBrand(brand),
            FilterAction::SetSearch(text(&self.search)),
            FilterAction::SetColor(text(&self.color)),
            FilterAction::SetEngineVolume(text(&self.engine_volume)),
            FilterAction::SetYear(text(&self.year)),
            FilterAction::SetMileage(RangeInput::between(
                text(&self.mileage_from),
                text(&self.mileage_to),
            )),
            FilterAction::SetPrice(RangeInput::between(
                text(&self.price_from),
                text(&self.price_to),
            )),
        ];
        let filters = actions
            .into_iter()
            .fold(submitted, |filters, action| filters.apply(action));

        let field = self.sort.as_deref().and_then(|s| s.parse::<SortField>().ok());
        let order = self.order.as_deref().and_then(|o| o.parse::<SortOrder>().ok());
        let sort = match (field, order) {
            (None, None) => SortSpec::default(),
            (Some(field), order) => SortSpec {
                field,
                order: order.unwrap_or_default(),
            },
            (None, Some(order)) => SortSpec {
                order,
                ..SortSpec::default()
            },
        };

        let page = self
            .page
            .as_deref()
            .and_then(|p| p.trim().parse::<u32>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);

        CatalogState {
            filters,
            sort,
            page,
            ..CatalogState::new(scope.surface())
        }
    }
}

/// Query pairs that reproduce `state` in a URL. Empty facets and page 1 are
/// left out.
pub fn state_query(state: &CatalogState) -> Vec<(&'static str, String)> {
    let filters = &state.filters;
    let mut pairs = Vec::new();
    let mut push = |key: &'static str, value: &str| {
        let value = value.trim();
        if !value.is_empty() {
            pairs.push((key, value.to_string()));
        }
    };
    push("search", &filters.search);
    push("brand", &filters.brand);
    if filters.has_brand() {
        push("series", &filters.series);
        push("appliedBrand", &filters.brand);
    }
    push("color", &filters.color);
    push("engineVolume", &filters.engine_volume);
    push("year", &filters.year);
    push("mileageFrom", &filters.mileage.from);
    push("mileageTo", &filters.mileage.to);
    push("priceFrom", &filters.price.from);
    push("priceTo", &filters.price.to);
    if state.sort != SortSpec::default() {
        push("sort", state.sort.field.as_str());
        push("order", state.sort.order.as_str());
    }
    if state.page > 1 {
        push("page", &state.page.to_string());
    }
    pairs
}

/// `path?query` for a catalog state.
pub fn href(path: &str, state: &CatalogState) -> String {
    let pairs = state_query(state);
    if pairs.is_empty() {
        return path.to_string();
    }
    // Only used for its form encoder; the host never leaves this function
    match Url::parse("http://localhost/") {
        Ok(mut url) => {
            url.query_pairs_mut().extend_pairs(pairs.iter());
            match url.query() {
                Some(query) => format!("{}?{}", path, query),
                None => path.to_string(),
            }
        }
        Err(e) => {
            tracing::error!("Failed to build catalog link: {}", e);
            path.to_string()
        }
    }
}

/// Fetches one catalog page and fills in reference names.
///
/// A URL page past the last page gets one corrective request for page 1.
pub async fn load_catalog(
    directus: &DirectusClient,
    scope: Scope,
    state: CatalogState,
) -> CatalogController<Listing> {
    let mut controller = CatalogController::new(scope, state);
    let mut ticket = Some(controller.begin_fetch());
    let mut corrected = false;

    while let Some(current) = ticket.take() {
        tracing::debug!(
            "Catalog fetch #{}: {:?}",
            current.generation(),
            current.descriptor().filter
        );
        let outcome = directus
            .try_listing_page(current.descriptor())
            .await
            .map_err(|e| {
                tracing::warn!("Catalog fetch failed: {}", e);
                e.to_string()
            });
        controller.complete(current, outcome);

        let state = controller.state();
        if !corrected && controller.error().is_none() && state.page > state.total_pages() {
            corrected = true;
            ticket = controller.dispatch(CatalogAction::GoToPage(1));
        }
    }

    let assets = directus.assets();
    controller.map_items(|cars| reconcile::to_listings(cars, &assets))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    fn new(value: impl Into<String>, label: impl Into<String>, current: &str) -> Self {
        let value = value.into();
        SelectOption {
            selected: value == current,
            label: label.into(),
            value,
        }
    }
}

/// Dropdown contents of the filter form, with the current choices marked.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FacetChoices {
    pub brands: Vec<SelectOption>,
    pub models: Vec<SelectOption>,
    pub years: Vec<SelectOption>,
    pub colors: Vec<SelectOption>,
    pub engine_volumes: Vec<SelectOption>,
}

impl FacetChoices {
    pub fn new(options: &FilterOptions, models: &[Series], filters: &FilterState) -> Self {
        FacetChoices {
            brands: options
                .brands
                .iter()
                .map(|Brand { id, name }| SelectOption::new(id.as_str(), name.as_str(), &filters.brand))
                .collect(),
            models: models
                .iter()
                .map(|s| SelectOption::new(s.id.as_str(), s.seriesname.as_str(), &filters.series))
                .collect(),
            years: options
                .years
                .iter()
                .map(|y| SelectOption::new(y.to_string(), y.to_string(), filters.year.trim()))
                .collect(),
            colors: options
                .colors
                .iter()
                .map(|c| SelectOption::new(c.as_str(), c.as_str(), &filters.color))
                .collect(),
            engine_volumes: options
                .engine_volumes
                .iter()
                .map(|v| {
                    let value = v.to_string();
                    let selected = crate::catalog::filters::parse_facet_number(&filters.engine_volume)
                        .is_some_and(|current| current == *v);
                    SelectOption {
                        label: format!("{:.1} L", v),
                        value,
                        selected,
                    }
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortLink {
    pub label: &'static str,
    pub href: String,
    pub active: bool,
    // "asc" / "desc" when active
    pub order: &'static str,
}

pub fn sort_links(path: &str, state: &CatalogState) -> Vec<SortLink> {
    SortField::ALL
        .into_iter()
        .map(|field| {
            let active = state.sort.field == field;
            SortLink {
                label: field.label(),
                href: href(path, &state.reduce(CatalogAction::Sort(field))),
                active,
                order: if active { state.sort.order.as_str() } else { "" },
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageLink {
    pub number: u32,
    pub href: String,
    pub current: bool,
}

/// The page strip with a link per entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageLinks {
    pub previous: Option<String>,
    pub first: Option<PageLink>,
    pub leading_gap: bool,
    pub window: Vec<PageLink>,
    pub trailing_gap: bool,
    pub last: Option<PageLink>,
    pub next: Option<String>,
}

impl PageLinks {
    pub fn new(path: &str, state: &CatalogState, strip: &PageStrip) -> Self {
        let link = |number: u32| PageLink {
            number,
            href: href(path, &state.reduce(CatalogAction::GoToPage(number))),
            current: number == strip.current,
        };
        PageLinks {
            previous: strip
                .has_previous()
                .then(|| link(strip.current - 1).href),
            first: strip.first.map(link),
            leading_gap: strip.leading_gap,
            window: strip.window.iter().copied().map(link).collect(),
            trailing_gap: strip.trailing_gap,
            last: strip.last.map(link),
            next: strip.has_next().then(|| link(strip.current + 1).href),
        }
    }
}
