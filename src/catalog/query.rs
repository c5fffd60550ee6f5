// Compiles catalog state into Directus item requests

// Filter grammar: field names map to operator objects (`{"price": {"_lte": 30000}}`),
// dotted paths become nested objects, sibling keys are ANDed, and `_and` / `_or`
// take arrays of such objects.

use serde::Serialize;
use serde_json::{Map, Value, json};

use super::filters::{BoundInput, FilterState, RangeInput, parse_facet_integer, parse_facet_number};
use super::paging::{SortSpec, Surface, offset};
use super::state::CatalogState;

/// Fields searched by the free-text box. Every word must match at least one.
pub const SEARCH_FIELDS: [&str; 3] = ["carname", "brand_id.name", "series_id.seriesname"];

/// Columns needed to render a listing card.
pub const LISTING_FIELDS: [&str; 16] = [
    "id",
    "infoid",
    "carname",
    "year",
    "mileage",
    "price",
    "engine_volume",
    "color",
    "fuel_type",
    "transmission",
    "thumbnail",
    "brand_id.id",
    "brand_id.name",
    "series_id.id",
    "series_id.seriesname",
    "date_created",
];

/// Everything shown on the detail page.
pub const DETAIL_FIELDS: [&str; 6] = [
    "*",
    "brand_id.id",
    "brand_id.name",
    "series_id.id",
    "series_id.seriesname",
    "images.directus_files_id.id",
];

pub const REFERENCE_LIMIT: u32 = 1000;
pub const AUTOCOMPLETE_LIMIT: u32 = 5;
pub const SIMILAR_POOL_LIMIT: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Collection {
    Cars,
    Brands,
    Series,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Cars => "Cars",
            Collection::Brands => "brands",
            Collection::Series => "series",
        }
    }
}

/// Comparison applied to one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Eq(Value),
    IContains(String),
    Lte(Value),
    Gte(Value),
    Between(Value, Value),
    In(Vec<Value>),
}

impl Op {
    fn to_json(&self) -> Value {
        match self {
            Op::Eq(v) => json!({ "_eq": v }),
            Op::IContains(s) => json!({ "_icontains": s }),
            Op::Lte(v) => json!({ "_lte": v }),
            Op::Gte(v) => json!({ "_gte": v }),
            Op::Between(a, b) => json!({ "_between": [a, b] }),
            Op::In(values) => json!({ "_in": values }),
        }
    }
}

/// `a.b.c` + op → `{"a": {"b": {"c": op}}}`
fn field_clause(path: &str, op: &Op) -> Value {
    path.rsplit('.').fold(op.to_json(), |inner, segment| {
        let mut wrapper = Map::new();
        wrapper.insert(segment.to_string(), inner);
        Value::Object(wrapper)
    })
}

/// A filter object whose top-level keys are implicitly ANDed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    clauses: Map<String, Value>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Adds `field: op` as a sibling clause.
    pub fn field(mut self, path: &str, op: Op) -> Self {
        if let Value::Object(clause) = field_clause(path, &op) {
            for (key, value) in clause {
                self.clauses.insert(key, value);
            }
        }
        self
    }

    pub fn field_opt(self, path: &str, op: Option<Op>) -> Self {
        match op {
            Some(op) => self.field(path, op),
            None => self,
        }
    }

    /// `_and` of one `_or` per word: a record matches when every word hits at
    /// least one of `fields`.
    pub fn all_words(mut self, words: &[&str], fields: &[&str]) -> Self {
        if words.is_empty() || fields.is_empty() {
            return self;
        }
        let per_word: Vec<Value> = words
            .iter()
            .map(|word| {
                let alternatives: Vec<Value> = fields
                    .iter()
                    .map(|field| field_clause(field, &Op::IContains((*word).to_string())))
                    .collect();
                json!({ "_or": alternatives })
            })
            .collect();
        self.clauses.insert("_and".to_string(), Value::Array(per_word));
        self
    }

    /// `_or` over complete sub-predicates.
    pub fn any_of(mut self, alternatives: Vec<Predicate>) -> Self {
        let alternatives: Vec<Value> = alternatives
            .into_iter()
            .filter(|p| !p.is_empty())
            .map(Predicate::into_json)
            .collect();
        if !alternatives.is_empty() {
            self.clauses.insert("_or".to_string(), Value::Array(alternatives));
        }
        self
    }

    pub fn into_json(self) -> Value {
        Value::Object(self.clauses)
    }

    pub fn into_filter(self) -> Option<Value> {
        (!self.is_empty()).then(|| self.into_json())
    }
}

/// Splits free text into search words; blank input yields no words.
pub fn search_words(input: &str) -> Vec<&str> {
    input.split_whitespace().collect()
}

/// Range predicate for a from/to pair of integer inputs.
///
/// Both bounds valid and distinct → `_between [min, max]`; one bound → `_gte`
/// or `_lte`; equal bounds or any unparseable bound → no predicate.
pub fn range_op(range: &RangeInput) -> Option<Op> {
    match (BoundInput::parse(&range.from), BoundInput::parse(&range.to)) {
        (BoundInput::Invalid, _) | (_, BoundInput::Invalid) => None,
        (BoundInput::Valid(from), BoundInput::Valid(to)) if from == to => None,
        (BoundInput::Valid(from), BoundInput::Valid(to)) => {
            let (low, high) = if from < to { (from, to) } else { (to, from) };
            Some(Op::Between(json!(low), json!(high)))
        }
        (BoundInput::Valid(from), BoundInput::Absent) => Some(Op::Gte(json!(from))),
        (BoundInput::Absent, BoundInput::Valid(to)) => Some(Op::Lte(json!(to))),
        (BoundInput::Absent, BoundInput::Absent) => None,
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Facet predicates shared by every catalog surface.
pub fn filter_predicate(filters: &FilterState) -> Predicate {
    let words = search_words(&filters.search);
    Predicate::new()
        .all_words(&words, &SEARCH_FIELDS)
        .field_opt(
            "brand_id",
            non_blank(&filters.brand).map(|id| Op::Eq(json!(id))),
        )
        .field_opt(
            "series_id",
            filters.effective_series().map(|id| Op::Eq(json!(id))),
        )
        .field_opt("color", non_blank(&filters.color).map(|c| Op::Eq(json!(c))))
        .field_opt(
            "engine_volume",
            parse_facet_number(&filters.engine_volume).map(|v| Op::Eq(json!(v))),
        )
        .field_opt(
            "year",
            parse_facet_integer(&filters.year).map(|y| Op::Eq(json!(y))),
        )
        .field_opt("mileage", range_op(&filters.mileage))
        .field_opt("price", range_op(&filters.price))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pagination {
    Page(u32),
    Offset(u64),
}

/// Everything needed for one `GET /items/{collection}` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestDescriptor {
    pub collection: Collection,
    pub fields: Vec<String>,
    pub filter: Option<Value>,
    pub sort: Option<String>,
    pub limit: Option<u32>,
    pub pagination: Option<Pagination>,
    // Ask for total_count and filter_count
    pub with_counts: bool,
}

impl RequestDescriptor {
    pub fn new(collection: Collection) -> Self {
        RequestDescriptor {
            collection,
            fields: Vec::new(),
            filter: None,
            sort: None,
            limit: None,
            pagination: None,
            with_counts: false,
        }
    }

    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = predicate.into_filter();
        self
    }

    pub fn sort(mut self, expression: impl Into<String>) -> Self {
        self.sort = Some(expression.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn with_counts(mut self) -> Self {
        self.with_counts = true;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("/items/{}", self.collection.as_str())
    }

    /// Query-string pairs in the remote API's format.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if !self.fields.is_empty() {
            pairs.push(("fields".to_string(), self.fields.join(",")));
        }
        if let Some(filter) = &self.filter {
            pairs.push(("filter".to_string(), filter.to_string()));
        }
        if let Some(sort) = &self.sort {
            pairs.push(("sort".to_string(), sort.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        match self.pagination {
            Some(Pagination::Page(page)) => pairs.push(("page".to_string(), page.to_string())),
            Some(Pagination::Offset(offset)) => {
                pairs.push(("offset".to_string(), offset.to_string()))
            }
            None => {}
        }
        if self.with_counts {
            pairs.push(("meta".to_string(), "total_count,filter_count".to_string()));
        }
        pairs
    }

    /// Stable key over endpoint and descriptor. Object keys serialize in sorted
    /// order, so equal descriptors always produce equal keys.
    pub fn cache_key(&self) -> String {
        serde_json::to_string(&(self.endpoint(), self)).unwrap_or_else(|_| format!("{:?}", self))
    }
}

/// Fixed restriction of a surface, e.g. the brand in `/cars/brand/5`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    Brand(String),
    Series(String),
    Year(u32),
}

impl Scope {
    pub fn surface(&self) -> Surface {
        match self {
            Scope::All => Surface::Catalog,
            Scope::Brand(_) => Surface::Brand,
            Scope::Series(_) => Surface::Series,
            Scope::Year(_) => Surface::Year,
        }
    }

    fn apply(&self, predicate: Predicate) -> Predicate {
        match self {
            Scope::All => predicate,
            Scope::Brand(id) => predicate.field("brand_id", Op::Eq(json!(id))),
            Scope::Series(id) => predicate.field("series_id", Op::Eq(json!(id))),
            Scope::Year(year) => predicate.field("year", Op::Eq(json!(year))),
        }
    }
}

/// The listings request for one catalog page.
///
/// The main catalog paginates by page number, the scoped surfaces by offset.
pub fn compile_listings(state: &CatalogState, scope: &Scope) -> RequestDescriptor {
    let surface = scope.surface();
    let page_size = surface.page_size();
    let pagination = match surface {
        Surface::Catalog => Pagination::Page(state.page.max(1)),
        _ => Pagination::Offset(offset(state.page, page_size)),
    };
    RequestDescriptor::new(Collection::Cars)
        .fields(&LISTING_FIELDS)
        .filter(scope.apply(filter_predicate(&state.filters)))
        .sort(state.sort.expression())
        .limit(page_size)
        .paginate(pagination)
        .with_counts()
}

pub fn listing_by_infoid(infoid: u64) -> RequestDescriptor {
    RequestDescriptor::new(Collection::Cars)
        .fields(&DETAIL_FIELDS)
        .filter(Predicate::new().field("infoid", Op::Eq(json!(infoid))))
        .limit(1)
}

/// Candidates for the "similar listings" block: same brand or same series.
pub fn similar_pool(brand_id: Option<&str>, series_id: Option<&str>) -> RequestDescriptor {
    let mut alternatives = Vec::new();
    if let Some(id) = brand_id {
        alternatives.push(Predicate::new().field("brand_id", Op::Eq(json!(id))));
    }
    if let Some(id) = series_id {
        alternatives.push(Predicate::new().field("series_id", Op::Eq(json!(id))));
    }
    RequestDescriptor::new(Collection::Cars)
        .fields(&LISTING_FIELDS)
        .filter(Predicate::new().any_of(alternatives))
        .sort(SortSpec::default().expression())
        .limit(SIMILAR_POOL_LIMIT)
}

pub fn featured_listings(count: u32) -> RequestDescriptor {
    RequestDescriptor::new(Collection::Cars)
        .fields(&LISTING_FIELDS)
        .sort(SortSpec::default().expression())
        .limit(count)
}

pub fn all_brands() -> RequestDescriptor {
    RequestDescriptor::new(Collection::Brands)
        .fields(&["id", "name"])
        .sort("name")
        .limit(REFERENCE_LIMIT)
}

pub fn all_series() -> RequestDescriptor {
    RequestDescriptor::new(Collection::Series)
        .fields(&["id", "seriesname", "series_brand_id"])
        .sort("seriesname")
        .limit(REFERENCE_LIMIT)
}

pub fn series_by_ids(ids: &[String]) -> RequestDescriptor {
    let ids: Vec<Value> = ids.iter().map(|id| json!(id)).collect();
    RequestDescriptor::new(Collection::Series)
        .fields(&["id", "seriesname", "series_brand_id"])
        .filter(Predicate::new().field("id", Op::In(ids)))
        .sort("seriesname")
        .limit(REFERENCE_LIMIT)
}

/// Series references of every car of a brand; first step of the models lookup.
pub fn series_used_by_brand(brand_id: &str) -> RequestDescriptor {
    RequestDescriptor::new(Collection::Cars)
        .fields(&["series_id", "brand_id"])
        .filter(Predicate::new().field("brand_id", Op::Eq(json!(brand_id))))
        .limit(REFERENCE_LIMIT)
}

/// Single-column projection over all cars, deduplicated by the caller.
pub fn facet_values(field: &str) -> RequestDescriptor {
    RequestDescriptor::new(Collection::Cars)
        .fields(&["id", field])
        .limit(REFERENCE_LIMIT)
}

/// The three autocomplete probes: car names, brand names, series names.
pub fn autocomplete_probes(query: &str) -> [RequestDescriptor; 3] {
    let probe = |collection: Collection, field: &str| {
        RequestDescriptor::new(collection)
            .fields(&["id", field])
            .filter(Predicate::new().field(field, Op::IContains(query.to_string())))
            .limit(AUTOCOMPLETE_LIMIT)
    };
    [
        probe(Collection::Cars, "carname"),
        probe(Collection::Brands, "name"),
        probe(Collection::Series, "seriesname"),
    ]
}
