// Wire-level records of the Directus collections (Cars, brands, series)

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Envelope returned by `GET /items/{collection}`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ItemsResponse<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub meta: Meta,
}

impl<T> ItemsResponse<T> {
    pub fn empty() -> Self {
        ItemsResponse {
            data: Vec::new(),
            meta: Meta::default(),
        }
    }
}

impl<T> Default for ItemsResponse<T> {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Meta {
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_count: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub filter_count: u64,
}

/// A brand or series reference on a car record.
///
/// Depending on the projection the CMS returns either the expanded object
/// (`{"id": 5, "name": "BYD"}` / `{"id": 12, "seriesname": "Han"}`) or the bare
/// foreign key (`5`). Both collapse into this type; bare keys stay `Unresolved`
/// until the reconciler looks them up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reference {
    Resolved { id: String, name: String },
    Unresolved { id: String },
}

impl Reference {
    pub fn id(&self) -> &str {
        match self {
            Reference::Resolved { id, .. } | Reference::Unresolved { id } => id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Reference::Resolved { name, .. } => Some(name),
            Reference::Unresolved { .. } => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Reference::Resolved { .. })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdValue {
    Number(i64),
    Text(String),
}

impl fmt::Display for IdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdValue::Number(n) => write!(f, "{}", n),
            IdValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireReference {
    Object {
        id: IdValue,
        #[serde(default, alias = "seriesname")]
        name: Option<String>,
    },
    Bare(IdValue),
}

impl<'de> Deserialize<'de> for Reference {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match WireReference::deserialize(deserializer)? {
            WireReference::Object {
                id,
                name: Some(name),
            } if !name.trim().is_empty() => Reference::Resolved {
                id: id.to_string(),
                name,
            },
            WireReference::Object { id, .. } | WireReference::Bare(id) => Reference::Unresolved {
                id: id.to_string(),
            },
        })
    }
}

/// One entry of the `images` many-to-many field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ImageRef {
    // Directus file id, usable in /assets/{id}
    File(String),
    // Junction row id; the projection did not expand the file
    Junction(i64),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireFile {
    Object { id: IdValue },
    Bare(IdValue),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireImage {
    Expanded { directus_files_id: Option<WireFile> },
    Bare(IdValue),
}

impl<'de> Deserialize<'de> for ImageRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match WireImage::deserialize(deserializer)? {
            WireImage::Expanded {
                directus_files_id: Some(WireFile::Object { id } | WireFile::Bare(id)),
            } => ImageRef::File(id.to_string()),
            WireImage::Expanded {
                directus_files_id: None,
            } => ImageRef::Junction(0),
            WireImage::Bare(IdValue::Number(n)) => ImageRef::Junction(n),
            WireImage::Bare(IdValue::Text(s)) => ImageRef::File(s),
        })
    }
}

impl ImageRef {
    pub fn file_id(&self) -> Option<&str> {
        match self {
            ImageRef::File(id) => Some(id),
            ImageRef::Junction(_) => None,
        }
    }
}

/// A listing as stored in the `Cars` collection. Every field except `id` is
/// optional because projections vary between pages.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Car {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub infoid: Option<u64>,
    #[serde(default)]
    pub carname: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub year: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub mileage: Option<u64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub price: Option<u64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub delivery_price: Option<u64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub engine_volume: Option<f64>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub transmission: Option<String>,
    #[serde(default)]
    pub fuel_type: Option<String>,
    #[serde(default)]
    pub car_type: Option<String>,
    #[serde(default)]
    pub vin: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub acceleration: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub range: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub battery_power: Option<f64>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub images: Vec<ImageRef>,
    #[serde(default)]
    pub brand_id: Option<Reference>,
    #[serde(default)]
    pub series_id: Option<Reference>,
    #[serde(default)]
    pub date_created: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Brand {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Series {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub seriesname: String,
    #[serde(default, deserialize_with = "optional_id_string")]
    pub series_brand_id: Option<String>,
}

// --- Lenient field decoders ---

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText<T> {
    Number(T),
    Text(String),
    Other(serde::de::IgnoredAny),
}

// Accepts JSON numbers and numeric strings (Directus returns decimals as strings);
// anything else becomes None instead of failing the whole record.
fn lenient_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
{
    Ok(match Option::<NumberOrText<T>>::deserialize(deserializer)? {
        Some(NumberOrText::Number(n)) => Some(n),
        Some(NumberOrText::Text(s)) => s.trim().parse().ok(),
        Some(NumberOrText::Other(_)) | None => None,
    })
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_number::<D, u64>(deserializer)?.unwrap_or(0))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(IdValue::deserialize(deserializer)?.to_string())
}

fn optional_id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<IdValue>::deserialize(deserializer)?.map(|id| id.to_string()))
}

fn nullable_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
