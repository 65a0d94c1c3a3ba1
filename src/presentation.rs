//! UI-facing view state: tab, filter and search results.

use serde::{Deserialize, Serialize};

use crate::models::{Mode, Track};
use crate::search::SearchFilter;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveTab {
    #[default]
    Home,
    History,
    Favorites,
    Settings,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationState {
    pub active_tab: ActiveTab,
    pub filter: SearchFilter,
    /// Mode used when the user queues something outside a search result.
    pub mode: Mode,
    pub query: String,
    pub results: Vec<Track>,
    pub searching: bool,
    #[serde(skip)]
    in_flight: usize,
}

impl PresentationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_tab(&mut self, tab: ActiveTab) {
        self.active_tab = tab;
    }

    pub fn set_filter(&mut self, filter: SearchFilter) {
        self.filter = filter;
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// Marks a search as started and returns the filter it should use.
    pub fn begin_search(&mut self, query: &str) -> SearchFilter {
        self.query = query.to_string();
        self.in_flight += 1;
        self.searching = true;
        self.filter
    }

    /// Searches are not cancelled; whichever completes last owns the
    /// results. A failed search leaves an empty list.
    pub fn apply_results(&mut self, results: Option<Vec<Track>>) {
        self.results = results.unwrap_or_default();
        self.in_flight = self.in_flight.saturating_sub(1);
        self.searching = self.in_flight > 0;
    }

    pub fn clear_results(&mut self) {
        self.query.clear();
        self.results.clear();
    }
}
