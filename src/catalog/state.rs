// Catalog state and the single reducer every change goes through

use super::filters::{FilterAction, FilterState};
use super::paging::{SortField, SortSpec, Surface, navigate, total_pages};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogState {
    pub filters: FilterState,
    pub sort: SortSpec,
    pub page: u32,
    pub page_size: u32,
    // filter_count of the most recent result
    pub total_matching: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogAction {
    Filter(FilterAction),
    Sort(SortField),
    GoToPage(u32),
    ResultsLoaded { total_matching: u64 },
}

impl CatalogState {
    pub fn new(surface: Surface) -> Self {
        CatalogState {
            filters: FilterState::default(),
            sort: SortSpec::default(),
            page: 1,
            page_size: surface.page_size(),
            total_matching: 0,
        }
    }

    pub fn total_pages(&self) -> u32 {
        total_pages(self.total_matching, self.page_size)
    }

    /// `(state, action) -> state`. Any facet or sort change lands on page 1;
    /// page navigation outside the known page range is ignored.
    pub fn reduce(&self, action: CatalogAction) -> CatalogState {
        let mut next = self.clone();
        match action {
            CatalogAction::Filter(filter_action) => {
                next.filters = self.filters.apply(filter_action);
                if next.filters != self.filters {
                    next.page = 1;
                }
            }
            CatalogAction::Sort(field) => {
                next.sort = self.sort.select(field);
                next.page = 1;
            }
            CatalogAction::GoToPage(requested) => {
                next.page = navigate(self.page, requested, self.total_pages());
            }
            CatalogAction::ResultsLoaded { total_matching } => {
                next.total_matching = total_matching;
            }
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::filters::RangeInput;
    use crate::catalog::paging::SortOrder;
    use pretty_assertions::assert_eq;

    fn catalog_on_page(page: u32, total_matching: u64) -> CatalogState {
        CatalogState {
            page,
            total_matching,
            ..CatalogState::new(Surface::Catalog)
        }
    }

    #[test]
    fn brand_change_resets_series_and_page() {
        let mut state = catalog_on_page(3, 100);
        state.filters.brand = "5".into();
        state.filters.series = "12".into();

        let next = state.reduce(CatalogAction::Filter(FilterAction::SetBrand("7".into())));
        assert_eq!(next.filters.brand, "7");
        assert_eq!(next.filters.series, "");
        assert_eq!(next.page, 1);
    }

    #[test]
    fn any_facet_change_resets_page() {
        let state = catalog_on_page(4, 100);
        let next = state.reduce(CatalogAction::Filter(FilterAction::SetPrice(
            RangeInput::at_most("30000"),
        )));
        assert_eq!(next.page, 1);
    }

    #[test]
    fn no_op_filter_keeps_page() {
        let state = catalog_on_page(4, 100);
        let next = state.reduce(CatalogAction::Filter(FilterAction::SetColor(String::new())));
        assert_eq!(next.page, 4);
    }

    #[test]
    fn sort_clicks_toggle_then_switch() {
        let state = CatalogState::new(Surface::Catalog).reduce(CatalogAction::Sort(SortField::Price));
        assert_eq!(state.sort.order, SortOrder::Asc);
        let state = state.reduce(CatalogAction::Sort(SortField::Price));
        assert_eq!(state.sort.order, SortOrder::Desc);
        let state = state.reduce(CatalogAction::Sort(SortField::Year));
        assert_eq!(state.sort.field, SortField::Year);
        assert_eq!(state.sort.order, SortOrder::Asc);
    }

    #[test]
    fn sort_change_returns_to_first_page() {
        let state = catalog_on_page(5, 160);
        let next = state.reduce(CatalogAction::Sort(SortField::Price));
        assert_eq!(next.page, 1);
        assert_eq!(next.reduce(CatalogAction::Sort(SortField::Price)).page, 1);
    }

    #[test]
    fn page_requests_outside_range_are_no_ops() {
        // 4 pages of 16
        let state = catalog_on_page(2, 64);
        assert_eq!(state.total_pages(), 4);
        assert_eq!(state.reduce(CatalogAction::GoToPage(0)).page, 2);
        assert_eq!(state.reduce(CatalogAction::GoToPage(9)).page, 2);
        assert_eq!(state.reduce(CatalogAction::GoToPage(4)).page, 4);
    }

    #[test]
    fn results_update_known_total() {
        let state = CatalogState::new(Surface::Year)
            .reduce(CatalogAction::ResultsLoaded { total_matching: 31 })
            .reduce(CatalogAction::GoToPage(3));
        assert_eq!(state.total_pages(), 3);
        assert_eq!(state.page, 3);
    }
}
