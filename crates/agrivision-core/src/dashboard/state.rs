//! Dashboard view state.

use serde::{Deserialize, Serialize};

use crate::prediction::PredictionRecord;

/// The dashboard's navigation tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardTab {
    #[default]
    Overview,
    Predictions,
    Analytics,
    Map,
    Calendar,
}

impl DashboardTab {
    /// All tabs in sidebar order.
    pub const ALL: [DashboardTab; 5] = [
        DashboardTab::Overview,
        DashboardTab::Predictions,
        DashboardTab::Analytics,
        DashboardTab::Map,
        DashboardTab::Calendar,
    ];

    /// Header title for the tab.
    pub fn title(&self) -> &'static str {
        match self {
            DashboardTab::Overview => "Dashboard Overview",
            DashboardTab::Predictions => "Crop Predictions",
            DashboardTab::Analytics => "Analytics",
            DashboardTab::Map => "Field Map",
            DashboardTab::Calendar => "Crop Calendar",
        }
    }

    /// Short label used in the tab bar.
    pub fn label(&self) -> &'static str {
        match self {
            DashboardTab::Overview => "Overview",
            DashboardTab::Predictions => "Predictions",
            DashboardTab::Analytics => "Analytics",
            DashboardTab::Map => "Field Map",
            DashboardTab::Calendar => "Calendar",
        }
    }

    /// The next tab in sidebar order, wrapping around.
    pub fn next(&self) -> DashboardTab {
        let idx = Self::ALL.iter().position(|t| t == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// The previous tab in sidebar order, wrapping around.
    pub fn previous(&self) -> DashboardTab {
        let idx = Self::ALL.iter().position(|t| t == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Per-page state of the dashboard.
///
/// Mutated only by the dashboard controller, in response to fetch
/// completions and change events. Derived values (average yield, crop
/// distribution, latest record) are recomputed from `records` on demand and
/// never stored here.
#[derive(Debug, Clone, Default)]
pub struct DashboardViewState {
    /// Fetched records, `created_at` descending, capped at the fetch limit
    pub records: Vec<PredictionRecord>,
    /// Whether a fetch is in flight for the visible view
    pub loading: bool,
    /// Currently selected navigation tab
    pub selected_tab: DashboardTab,
    /// Count of change events received since mount
    pub notifications: u64,
}

impl DashboardViewState {
    pub fn total_predictions(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_cycle_wraps_both_ways() {
        assert_eq!(DashboardTab::Overview.next(), DashboardTab::Predictions);
        assert_eq!(DashboardTab::Calendar.next(), DashboardTab::Overview);
        assert_eq!(DashboardTab::Overview.previous(), DashboardTab::Calendar);
    }

    #[test]
    fn default_state_is_empty_overview() {
        let state = DashboardViewState::default();
        assert!(state.records.is_empty());
        assert!(!state.loading);
        assert_eq!(state.selected_tab, DashboardTab::Overview);
        assert_eq!(state.notifications, 0);
    }
}
