// Turns raw Cars records into the listing view-model the templates render

use scraper::Html;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::models::{Brand, Car, Reference, Series};

/// Shown wherever a brand or series could not be resolved.
pub const UNRESOLVED_PLACEHOLDER: &str = "—";
/// Served when a listing has no thumbnail.
pub const THUMBNAIL_PLACEHOLDER: &str = "/static/images/car-placeholder.svg";
pub const SIMILAR_LIMIT: usize = 4;
const EXCERPT_CHARS: usize = 160;

/// Display names of brands and series by id, loaded in bulk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceBook {
    brands: HashMap<String, String>,
    series: HashMap<String, String>,
}

impl ReferenceBook {
    pub fn new(brands: &[Brand], series: &[Series]) -> Self {
        ReferenceBook {
            brands: brands
                .iter()
                .map(|b| (b.id.clone(), b.name.clone()))
                .collect(),
            series: series
                .iter()
                .map(|s| (s.id.clone(), s.seriesname.clone()))
                .collect(),
        }
    }

    pub fn brand_name(&self, id: &str) -> Option<&str> {
        self.brands.get(id).map(String::as_str)
    }

    pub fn series_name(&self, id: &str) -> Option<&str> {
        self.series.get(id).map(String::as_str)
    }
}

/// Which bulk lookups a batch of cars needs: (brands, series).
pub fn missing_references(cars: &[Car]) -> (bool, bool) {
    let unresolved = |reference: &Option<Reference>| {
        reference.as_ref().is_some_and(|r| !r.is_resolved())
    };
    (
        cars.iter().any(|car| unresolved(&car.brand_id)),
        cars.iter().any(|car| unresolved(&car.series_id)),
    )
}

fn resolve_reference(reference: Option<Reference>, lookup: impl Fn(&str) -> Option<String>) -> Option<Reference> {
    match reference {
        Some(Reference::Unresolved { id }) => match lookup(&id) {
            Some(name) => Some(Reference::Resolved { id, name }),
            None => Some(Reference::Unresolved { id }),
        },
        other => other,
    }
}

/// Replaces bare brand/series ids with `Resolved` references. Already
/// resolved references are left untouched, and ids missing from the book stay
/// `Unresolved`.
pub fn resolve_references(cars: Vec<Car>, book: &ReferenceBook) -> Vec<Car> {
    cars.into_iter()
        .map(|mut car| {
            car.brand_id = resolve_reference(car.brand_id.take(), |id| {
                book.brand_name(id).map(str::to_string)
            });
            car.series_id = resolve_reference(car.series_id.take(), |id| {
                book.series_name(id).map(str::to_string)
            });
            car
        })
        .collect()
}

/// Builds asset URLs for the Directus `/assets` endpoint.
#[derive(Debug, Clone)]
pub struct AssetUrls {
    base_url: String,
}

impl AssetUrls {
    pub fn new(base_url: &str) -> Self {
        AssetUrls {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn file(&self, file_id: &str) -> String {
        format!("{}/assets/{}", self.base_url, file_id)
    }

    /// Absolute URLs pass through, bare file ids are turned into asset URLs
    /// and missing thumbnails fall back to the placeholder image.
    pub fn thumbnail(&self, thumbnail: Option<&str>) -> String {
        match thumbnail.map(str::trim) {
            None | Some("") => THUMBNAIL_PLACEHOLDER.to_string(),
            Some(t) if t.starts_with("http://") || t.starts_with("https://") => t.to_string(),
            Some(t) => self.file(t),
        }
    }
}

/// Resolved brand or series as shown to visitors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefView {
    pub id: Option<String>,
    pub name: String,
}

impl RefView {
    fn from_reference(reference: Option<&Reference>) -> Self {
        RefView {
            id: reference.map(|r| r.id().to_string()),
            name: reference
                .and_then(Reference::name)
                .unwrap_or(UNRESOLVED_PLACEHOLDER)
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub id: String,
    pub infoid: Option<u64>,
    pub name: String,
    pub brand: RefView,
    pub series: RefView,
    pub year: Option<u32>,
    pub mileage: Option<u64>,
    pub price: Option<u64>,
    pub delivery_price: Option<u64>,
    pub engine_volume: Option<f64>,
    pub condition: Option<String>,
    pub transmission: Option<String>,
    pub fuel_type: Option<String>,
    pub car_type: Option<String>,
    pub vin: Option<String>,
    pub color: Option<String>,
    pub acceleration: Option<String>,
    pub range: Option<f64>,
    pub battery_power: Option<f64>,
    pub thumbnail_url: String,
    pub image_urls: Vec<String>,
    pub description_html: Option<String>,
    pub excerpt: Option<String>,
}

impl Listing {
    /// Delivery price worth showing; zero means "not quoted".
    pub fn quoted_delivery(&self) -> Option<u64> {
        self.delivery_price.filter(|p| *p > 0)
    }

    pub fn detail_path(&self) -> String {
        match self.infoid {
            Some(infoid) => format!("/cars/{}", infoid),
            None => "/cars".to_string(),
        }
    }
}

/// Plain text of an HTML description, whitespace-collapsed and cut at a word
/// boundary.
pub fn excerpt(html: &str, max_chars: usize) -> Option<String> {
    let fragment = Html::parse_fragment(html);
    let text = fragment
        .root_element()
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        return None;
    }
    if text.chars().count() <= max_chars {
        return Some(text);
    }
    let cut: String = text.chars().take(max_chars).collect();
    let trimmed = match cut.rfind(' ') {
        Some(space) if space > 0 => &cut[..space],
        _ => cut.as_str(),
    };
    Some(format!("{}…", trimmed.trim_end()))
}

pub fn to_listing(car: Car, assets: &AssetUrls) -> Listing {
    let thumbnail_url = assets.thumbnail(car.thumbnail.as_deref());
    let image_urls = car
        .images
        .iter()
        .filter_map(|image| image.file_id())
        .map(|id| assets.file(id))
        .collect();
    let excerpt = car
        .description
        .as_deref()
        .and_then(|html| excerpt(html, EXCERPT_CHARS));
    Listing {
        brand: RefView::from_reference(car.brand_id.as_ref()),
        series: RefView::from_reference(car.series_id.as_ref()),
        name: car
            .carname
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| UNRESOLVED_PLACEHOLDER.to_string()),
        id: car.id,
        infoid: car.infoid,
        year: car.year,
        mileage: car.mileage,
        price: car.price,
        delivery_price: car.delivery_price,
        engine_volume: car.engine_volume,
        condition: car.condition,
        transmission: car.transmission,
        fuel_type: car.fuel_type,
        car_type: car.car_type,
        vin: car.vin,
        color: car.color,
        acceleration: car.acceleration,
        range: car.range,
        battery_power: car.battery_power,
        thumbnail_url,
        image_urls,
        description_html: car.description,
        excerpt,
    }
}

pub fn to_listings(cars: Vec<Car>, assets: &AssetUrls) -> Vec<Listing> {
    cars.into_iter().map(|car| to_listing(car, assets)).collect()
}

/// Up to [`SIMILAR_LIMIT`] pool listings sharing the current listing's brand
/// id or series id, in pool order, without the current listing and without
/// duplicates.
pub fn similar_listings(current: &Listing, pool: &[Listing]) -> Vec<Listing> {
    let brand = current.brand.id.as_deref();
    let series = current.series.id.as_deref();
    let mut seen = HashSet::new();
    pool.iter()
        .filter(|candidate| candidate.id != current.id)
        .filter(|candidate| {
            let same_brand = brand.is_some() && candidate.brand.id.as_deref() == brand;
            let same_series = series.is_some() && candidate.series.id.as_deref() == series;
            same_brand || same_series
        })
        .filter(|candidate| seen.insert(candidate.id.clone()))
        .take(SIMILAR_LIMIT)
        .cloned()
        .collect()
}

/// Groups the integer digits of a number in threes: `1234567` → `1 234 567`.
pub fn group_thousands(number: &str, separator: &str) -> String {
    let (sign, unsigned) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };
    let digits: Vec<char> = integer.chars().collect();
    let mut grouped = String::with_capacity(number.len() + digits.len() / 3 * separator.len());
    for (index, digit) in digits.iter().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push_str(separator);
        }
        grouped.push(*digit);
    }
    match fraction {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bare(id: &str) -> Option<Reference> {
        Some(Reference::Unresolved { id: id.into() })
    }

    fn resolved(id: &str, name: &str) -> Option<Reference> {
        Some(Reference::Resolved {
            id: id.into(),
            name: name.into(),
        })
    }

    fn book() -> ReferenceBook {
        ReferenceBook::new(
            &[Brand {
                id: "5".into(),
                name: "BYD".into(),
            }],
            &[Series {
                id: "12".into(),
                seriesname: "Han".into(),
                series_brand_id: Some("5".into()),
            }],
        )
    }

    fn listing(id: &str, brand: Option<&str>, series: Option<&str>) -> Listing {
        let car = Car {
            id: id.into(),
            brand_id: brand.map(|b| Reference::Resolved {
                id: b.into(),
                name: format!("Brand {}", b),
            }),
            series_id: series.map(|s| Reference::Resolved {
                id: s.into(),
                name: format!("Series {}", s),
            }),
            ..Car::default()
        };
        to_listing(car, &AssetUrls::new("https://cms.example"))
    }

    #[test]
    fn bare_ids_are_resolved_from_the_book() {
        let cars = vec![Car {
            id: "1".into(),
            brand_id: bare("5"),
            series_id: bare("12"),
            ..Car::default()
        }];
        assert_eq!(missing_references(&cars), (true, true));
        let cars = resolve_references(cars, &book());
        assert_eq!(cars[0].brand_id, resolved("5", "BYD"));
        assert_eq!(cars[0].series_id, resolved("12", "Han"));
        assert_eq!(missing_references(&cars), (false, false));
    }

    #[test]
    fn unknown_ids_render_as_placeholder() {
        let cars = resolve_references(
            vec![Car {
                id: "1".into(),
                brand_id: bare("99"),
                ..Car::default()
            }],
            &book(),
        );
        let listing = to_listing(cars[0].clone(), &AssetUrls::new("https://cms.example"));
        assert_eq!(listing.brand.name, UNRESOLVED_PLACEHOLDER);
        assert_eq!(listing.brand.id.as_deref(), Some("99"));
        assert_eq!(listing.series.name, UNRESOLVED_PLACEHOLDER);
    }

    #[test]
    fn resolution_is_idempotent() {
        let cars = vec![Car {
            id: "1".into(),
            brand_id: resolved("5", "BYD (import)"),
            series_id: bare("12"),
            ..Car::default()
        }];
        let once = resolve_references(cars, &book());
        let twice = resolve_references(once.clone(), &book());
        assert_eq!(once, twice);
        // Embedded names win over the book
        assert_eq!(twice[0].brand_id, resolved("5", "BYD (import)"));
    }

    #[test]
    fn thumbnails_fall_back_to_placeholder() {
        let assets = AssetUrls::new("https://cms.example/");
        assert_eq!(assets.thumbnail(None), THUMBNAIL_PLACEHOLDER);
        assert_eq!(assets.thumbnail(Some(" ")), THUMBNAIL_PLACEHOLDER);
        assert_eq!(assets.thumbnail(Some("abc")), "https://cms.example/assets/abc");
        assert_eq!(
            assets.thumbnail(Some("https://cdn.example/x.jpg")),
            "https://cdn.example/x.jpg"
        );
    }

    #[test]
    fn similar_listings_match_brand_or_series() {
        let current = listing("c", Some("B1"), Some("S1"));
        let pool = vec![
            listing("c", Some("B1"), Some("S1")),
            listing("1", Some("B1"), None),
            listing("2", Some("B2"), Some("S1")),
            listing("3", Some("B9"), Some("S9")),
            listing("4", Some("B1"), Some("S1")),
            listing("4", Some("B1"), Some("S1")),
            listing("5", Some("B3"), Some("S1")),
            listing("6", Some("B1"), Some("S7")),
        ];
        let ids: Vec<_> = similar_listings(&current, &pool)
            .into_iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, vec!["1", "2", "4", "5"]);
    }

    #[test]
    fn similar_pool_of_ten_is_truncated_to_four() {
        let current = listing("c", Some("B1"), Some("S1"));
        let pool = vec![
            listing("n1", Some("B7"), Some("S7")),
            listing("b1", Some("B1"), Some("S3")),
            listing("s1", Some("B2"), Some("S1")),
            listing("n2", Some("B8"), None),
            listing("b2", Some("B1"), None),
            listing("n3", None, None),
            listing("s2", Some("B4"), Some("S1")),
            listing("b3", Some("B1"), Some("S9")),
            listing("n4", Some("B9"), Some("S8")),
            listing("n5", Some("B5"), Some("S5")),
        ];
        let ids: Vec<_> = similar_listings(&current, &pool)
            .into_iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, vec!["b1", "s1", "b2", "s2"]);
    }

    #[test]
    fn similar_listings_can_be_empty() {
        let current = listing("c", Some("B1"), None);
        let pool = vec![listing("1", Some("B2"), None), listing("2", None, None)];
        assert!(similar_listings(&current, &pool).is_empty());
    }

    #[test]
    fn excerpt_strips_markup() {
        let html = "<p>Fresh <b>import</b></p>\n<ul><li>Warranty</li></ul>";
        assert_eq!(excerpt(html, 100).as_deref(), Some("Fresh import Warranty"));
        assert_eq!(excerpt("<p> </p>", 100), None);
        assert_eq!(
            excerpt("<p>one two three four</p>", 12).as_deref(),
            Some("one two…")
        );
    }

    #[test]
    fn thousands_are_grouped() {
        assert_eq!(group_thousands("1234567", " "), "1 234 567");
        assert_eq!(group_thousands("999", " "), "999");
        assert_eq!(group_thousands("12000.5", ","), "12,000.5");
        assert_eq!(group_thousands("-1000", " "), "-1 000");
    }

    #[test]
    fn zero_delivery_is_not_quoted() {
        let mut listing = listing("1", None, None);
        listing.delivery_price = Some(0);
        assert_eq!(listing.quoted_delivery(), None);
        listing.delivery_price = Some(1500);
        assert_eq!(listing.quoted_delivery(), Some(1500));
        assert_eq!(listing.name, UNRESOLVED_PLACEHOLDER);
    }
}
