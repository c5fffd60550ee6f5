// Fetch executor for the Directus items API, fronted by a TTL cache

use futures::future::join_all;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{collections::HashSet, sync::Arc, time::Duration};
use thiserror::Error;

use crate::cache::{Clock, SystemClock, TtlCache};
use crate::catalog::ListingPage;
use crate::catalog::query::{self, RequestDescriptor};
use crate::models::{Brand, Car, ItemsResponse, Reference, Series};
use crate::reconcile::{self, AssetUrls, ReferenceBook};

/// Shortest autocomplete query that is sent upstream.
pub const AUTOCOMPLETE_MIN_CHARS: usize = 2;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream responded with {0}")]
    Status(StatusCode),
    #[error("malformed upstream payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Distinct facet values for the filter sidebar.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub brands: Vec<Brand>,
    // Newest first
    pub years: Vec<u32>,
    pub colors: Vec<String>,
    pub engine_volumes: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct SeriesLink {
    #[serde(default)]
    series_id: Option<Reference>,
}

pub struct DirectusClient {
    http: Arc<Client>,
    base_url: String,
    token: Option<String>,
    cache: TtlCache<Arc<Value>>,
}

impl DirectusClient {
    pub fn new(http: Arc<Client>, base_url: &str, token: Option<String>, ttl: Duration) -> Self {
        Self::with_clock(http, base_url, token, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(
        http: Arc<Client>,
        base_url: &str,
        token: Option<String>,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        DirectusClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            cache: TtlCache::with_clock(ttl, clock),
        }
    }

    pub fn assets(&self) -> AssetUrls {
        AssetUrls::new(&self.base_url)
    }

    // Raw JSON body for a descriptor; served from cache while fresh
    async fn fetch_json(&self, descriptor: &RequestDescriptor) -> Result<Arc<Value>, FetchError> {
        let key = descriptor.cache_key();
        if let Some(hit) = self.cache.get(&key).await {
            tracing::debug!("Cache hit for {}", descriptor.endpoint());
            return Ok(hit);
        }

        let url = format!("{}{}", self.base_url, descriptor.endpoint());
        tracing::debug!("GET {} {:?}", url, descriptor.query_pairs());
        let mut request = self.http.get(&url).query(&descriptor.query_pairs());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        let bytes = response.bytes().await?;
        let body: Arc<Value> = Arc::new(serde_json::from_slice(&bytes)?);

        self.cache.insert(key, body.clone()).await;
        tracing::debug!("Cached {} ({} entries)", descriptor.endpoint(), self.cache.len().await);
        Ok(body)
    }

    /// Fallible items call for callers that show an error state.
    pub async fn try_get_items<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<ItemsResponse<T>, FetchError> {
        let body = self.fetch_json(descriptor).await?;
        Ok(ItemsResponse::<T>::deserialize(body.as_ref())?)
    }

    /// Items call that never fails: any error is logged and yields an empty
    /// result with zero counts.
    pub async fn get_items<T: DeserializeOwned>(&self, descriptor: &RequestDescriptor) -> ItemsResponse<T> {
        match self.try_get_items(descriptor).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    "Upstream fetch of {} failed, using empty result: {}",
                    descriptor.endpoint(),
                    e
                );
                ItemsResponse::empty()
            }
        }
    }

    pub async fn get_listings(&self, descriptor: &RequestDescriptor) -> ItemsResponse<Car> {
        self.get_items(descriptor).await
    }

    /// One catalog page with brand and series names filled in.
    pub async fn try_listing_page(&self, descriptor: &RequestDescriptor) -> Result<ListingPage<Car>, FetchError> {
        let response: ItemsResponse<Car> = self.try_get_items(descriptor).await?;
        Ok(ListingPage {
            items: self.resolve_references(response.data).await,
            total_matching: response.meta.filter_count,
            total_count: response.meta.total_count,
        })
    }

    /// Resolved listings for sections that degrade silently (featured, similar).
    pub async fn resolved_listings(&self, descriptor: &RequestDescriptor) -> Vec<Car> {
        let response = self.get_listings(descriptor).await;
        self.resolve_references(response.data).await
    }

    pub async fn fetch_brands(&self) -> Result<Vec<Brand>, FetchError> {
        Ok(self.try_get_items(&query::all_brands()).await?.data)
    }

    pub async fn fetch_series(&self) -> Result<Vec<Series>, FetchError> {
        Ok(self.try_get_items(&query::all_series()).await?.data)
    }

    /// Bulk-loads only the reference kinds the batch is missing, concurrently.
    /// Cars whose references are all embedded cause no requests.
    pub async fn resolve_references(&self, cars: Vec<Car>) -> Vec<Car> {
        let (need_brands, need_series) = reconcile::missing_references(&cars);
        if !need_brands && !need_series {
            return cars;
        }

        let brands = async {
            if need_brands {
                self.get_items::<Brand>(&query::all_brands()).await.data
            } else {
                Vec::new()
            }
        };
        let series = async {
            if need_series {
                self.get_items::<Series>(&query::all_series()).await.data
            } else {
                Vec::new()
            }
        };
        let (brands, series) = tokio::join!(brands, series);
        tracing::debug!(
            "Resolving references against {} brands and {} series",
            brands.len(),
            series.len()
        );
        reconcile::resolve_references(cars, &ReferenceBook::new(&brands, &series))
    }

    /// Series that actually have cars of the given brand: first the series ids
    /// used by that brand's cars, then their names.
    pub async fn series_for_brand(&self, brand_id: &str) -> Result<Vec<Series>, FetchError> {
        let links: ItemsResponse<SeriesLink> = self
            .try_get_items(&query::series_used_by_brand(brand_id))
            .await?;

        let mut seen = HashSet::new();
        let ids: Vec<String> = links
            .data
            .into_iter()
            .filter_map(|link| link.series_id)
            .map(|reference| reference.id().to_string())
            .filter(|id| seen.insert(id.clone()))
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self.try_get_items(&query::series_by_ids(&ids)).await?.data)
    }

    pub async fn facet_options(&self) -> Result<FilterOptions, FetchError> {
        let years = query::facet_values("year");
        let colors = query::facet_values("color");
        let volumes = query::facet_values("engine_volume");
        let (brands, years, colors, volumes) = tokio::join!(
            self.fetch_brands(),
            self.try_get_items::<Value>(&years),
            self.try_get_items::<Value>(&colors),
            self.try_get_items::<Value>(&volumes),
        );

        let mut years: Vec<u32> = column(&years?.data, "year")
            .filter_map(|v| number_in(v).map(|n| n as u32).filter(|n| *n > 0))
            .collect();
        years.sort_unstable_by(|a, b| b.cmp(a));
        years.dedup();

        let mut colors: Vec<String> = column(&colors?.data, "color")
            .filter_map(Value::as_str)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        colors.sort();
        colors.dedup();

        let mut engine_volumes: Vec<f64> = column(&volumes?.data, "engine_volume")
            .filter_map(number_in)
            .filter(|v| *v > 0.0)
            .collect();
        engine_volumes.sort_by(f64::total_cmp);
        engine_volumes.dedup();

        Ok(FilterOptions {
            brands: brands?,
            years,
            colors,
            engine_volumes,
        })
    }

    /// Display names matching `query` across car names, brands and series.
    /// Short queries return nothing without touching the network.
    pub async fn autocomplete(&self, query: &str) -> Result<Vec<String>, FetchError> {
        let query = query.trim();
        if query.chars().count() < AUTOCOMPLETE_MIN_CHARS {
            return Ok(Vec::new());
        }

        let probes = query::autocomplete_probes(query);
        let responses = join_all(probes.iter().map(|probe| self.try_get_items::<Value>(probe))).await;

        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for (probe, response) in probes.iter().zip(responses) {
            // Second projected field carries the display name
            let field = probe.fields.last().map(String::as_str).unwrap_or("name");
            for name in column(&response?.data, field).filter_map(Value::as_str) {
                let name = name.trim();
                if !name.is_empty() && seen.insert(name.to_lowercase()) {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    pub async fn fetch_car_by_infoid(&self, infoid: u64) -> Result<Option<Car>, FetchError> {
        let response: ItemsResponse<Car> = self.try_get_items(&query::listing_by_infoid(infoid)).await?;
        let cars = self.resolve_references(response.data).await;
        Ok(cars.into_iter().next())
    }
}

fn column<'a>(rows: &'a [Value], field: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
    rows.iter().filter_map(move |row| row.get(field))
}

// Numeric facet values arrive as numbers or numeric strings
fn number_in(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}
