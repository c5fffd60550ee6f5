// Fetch lifecycle of one catalog view: loading flag, error, stale-response guard

use serde::Serialize;

use super::paging::{PageStrip, page_strip, shows_pagination};
use super::query::{RequestDescriptor, Scope, compile_listings};
use super::state::{CatalogAction, CatalogState};

/// One page of listings as returned by the executor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingPage<T> {
    pub items: Vec<T>,
    // Matches for the current filters
    pub total_matching: u64,
    // Size of the unfiltered collection
    pub total_count: u64,
}

impl<T> ListingPage<T> {
    pub fn empty() -> Self {
        ListingPage {
            items: Vec::new(),
            total_matching: 0,
            total_count: 0,
        }
    }
}

/// Issued by [`CatalogController::begin_fetch`]; hand it back with the outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTicket {
    generation: u64,
    descriptor: RequestDescriptor,
}

impl FetchTicket {
    pub fn descriptor(&self) -> &RequestDescriptor {
        &self.descriptor
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewStatus {
    Loading,
    Failed,
    Empty,
    Ready,
}

#[derive(Debug, Clone)]
pub struct CatalogController<T> {
    scope: Scope,
    state: CatalogState,
    generation: u64,
    loading: bool,
    error: Option<String>,
    page: ListingPage<T>,
}

impl<T> CatalogController<T> {
    pub fn new(scope: Scope, state: CatalogState) -> Self {
        CatalogController {
            scope,
            state,
            generation: 0,
            loading: false,
            error: None,
            page: ListingPage::empty(),
        }
    }

    pub fn state(&self) -> &CatalogState {
        &self.state
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn page(&self) -> &ListingPage<T> {
        &self.page
    }

    pub fn into_page(self) -> ListingPage<T> {
        self.page
    }

    pub fn status(&self) -> ViewStatus {
        if self.loading {
            ViewStatus::Loading
        } else if self.error.is_some() {
            ViewStatus::Failed
        } else if self.page.items.is_empty() {
            ViewStatus::Empty
        } else {
            ViewStatus::Ready
        }
    }

    pub fn page_strip(&self) -> Option<PageStrip> {
        let total = self.state.total_pages();
        shows_pagination(total).then(|| page_strip(self.state.page, total))
    }

    /// Applies a user action. Returns a ticket when the change requires a new
    /// request.
    pub fn dispatch(&mut self, action: CatalogAction) -> Option<FetchTicket> {
        let next = self.state.reduce(action);
        let refetch = next.filters != self.state.filters
            || next.sort != self.state.sort
            || next.page != self.state.page;
        self.state = next;
        refetch.then(|| self.begin_fetch())
    }

    /// Starts a request for the current state. Any ticket issued earlier
    /// becomes stale.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        self.loading = true;
        self.error = None;
        FetchTicket {
            generation: self.generation,
            descriptor: compile_listings(&self.state, &self.scope),
        }
    }

    /// Records the outcome of a request. Outcomes for superseded tickets are
    /// dropped and `false` is returned.
    pub fn complete(&mut self, ticket: FetchTicket, outcome: Result<ListingPage<T>, String>) -> bool {
        if ticket.generation != self.generation {
            tracing::debug!(
                stale = ticket.generation,
                current = self.generation,
                "Discarding stale catalog response"
            );
            return false;
        }
        self.loading = false;
        match outcome {
            Ok(page) => {
                self.state = self.state.reduce(CatalogAction::ResultsLoaded {
                    total_matching: page.total_matching,
                });
                self.page = page;
            }
            Err(message) => {
                self.error = Some(message);
                self.state = self
                    .state
                    .reduce(CatalogAction::ResultsLoaded { total_matching: 0 });
                self.page = ListingPage::empty();
            }
        }
        true
    }

    /// Replaces the items of the current page, e.g. after reference resolution.
    pub fn map_items<U>(self, f: impl FnOnce(Vec<T>) -> Vec<U>) -> CatalogController<U> {
        CatalogController {
            scope: self.scope,
            state: self.state,
            generation: self.generation,
            loading: self.loading,
            error: self.error,
            page: ListingPage {
                items: f(self.page.items),
                total_matching: self.page.total_matching,
                total_count: self.page.total_count,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::filters::FilterAction;
    use crate::catalog::paging::Surface;
    use pretty_assertions::assert_eq;

    fn controller() -> CatalogController<&'static str> {
        CatalogController::new(Scope::All, CatalogState::new(Surface::Catalog))
    }

    fn page(items: Vec<&'static str>, total_matching: u64) -> ListingPage<&'static str> {
        ListingPage {
            items,
            total_matching,
            total_count: 100,
        }
    }

    #[test]
    fn loading_flag_wraps_a_fetch() {
        let mut controller = controller();
        let ticket = controller.begin_fetch();
        assert_eq!(controller.status(), ViewStatus::Loading);
        assert!(controller.complete(ticket, Ok(page(vec!["a"], 1))));
        assert_ne!(controller.status(), ViewStatus::Loading);
        assert_eq!(controller.status(), ViewStatus::Ready);
    }

    #[test]
    fn stale_responses_are_discarded() {
        let mut controller = controller();
        let first = controller.begin_fetch();
        let second = controller
            .dispatch(CatalogAction::Filter(FilterAction::SetSearch("han".into())))
            .expect("filter change refetches");

        assert!(controller.complete(second, Ok(page(vec!["new"], 1))));
        assert!(!controller.complete(first, Ok(page(vec!["old"], 50))));
        assert_eq!(controller.page().items, vec!["new"]);
        assert_eq!(controller.state().total_matching, 1);
    }

    #[test]
    fn late_stale_response_does_not_clear_loading() {
        let mut controller = controller();
        let first = controller.begin_fetch();
        let _second = controller.begin_fetch();
        assert!(!controller.complete(first, Ok(page(vec!["old"], 1))));
        assert_eq!(controller.status(), ViewStatus::Loading);
    }

    #[test]
    fn errors_are_reported_then_cleared_on_retry() {
        let mut controller = controller();
        let ticket = controller.begin_fetch();
        controller.complete(ticket, Err("upstream returned 500".into()));
        assert_eq!(controller.status(), ViewStatus::Failed);
        assert_eq!(controller.error(), Some("upstream returned 500"));

        let retry = controller.begin_fetch();
        assert_eq!(controller.error(), None);
        controller.complete(retry, Ok(page(vec![], 0)));
        assert_eq!(controller.status(), ViewStatus::Empty);
    }

    #[test]
    fn unchanged_state_does_not_refetch() {
        let mut controller = controller();
        assert!(controller.dispatch(CatalogAction::GoToPage(7)).is_none());
        assert_eq!(controller.state().page, 1);
    }

    #[test]
    fn pagination_only_for_multiple_pages() {
        let mut controller = controller();
        let ticket = controller.begin_fetch();
        controller.complete(ticket, Ok(page(vec!["a"], 16)));
        assert!(controller.page_strip().is_none());

        let ticket = controller.begin_fetch();
        controller.complete(ticket, Ok(page(vec!["a"], 40)));
        let strip = controller.page_strip().expect("3 pages");
        assert_eq!(strip.window, vec![1, 2, 3]);
    }
}
