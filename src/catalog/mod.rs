// Catalog query layer: facet state, query compilation, paging and fetch lifecycle

pub mod controller;
pub mod filters;
pub mod paging;
pub mod query;
pub mod state;

pub use controller::{CatalogController, ListingPage, ViewStatus};
pub use filters::{FilterAction, FilterState, RangeInput};
pub use paging::{SortField, SortOrder, SortSpec};
pub use query::Scope;
pub use state::{CatalogAction, CatalogState};
