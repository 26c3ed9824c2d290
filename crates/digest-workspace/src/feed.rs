//! Digest history feed
//!
//! Holds the full history in service order and derives two views from it on
//! every read:
//! - `filtered_items`: items whose `sent_at` starts with the date filter
//! - `visible_items`: the first `window` filtered items unless expanded

use crate::types::DigestItem;
use parking_lot::Mutex;

/// Collapsed window size when not configured otherwise
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

#[derive(Debug, Default)]
struct FeedState {
    items: Vec<DigestItem>,
    date_filter: Option<String>,
    expanded: bool,
}

/// Filtered, windowed view over the digest history
#[derive(Debug)]
pub struct DigestFeedController {
    window: usize,
    state: Mutex<FeedState>,
}

impl Default for DigestFeedController {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_WINDOW)
    }
}

impl DigestFeedController {
    /// Empty feed showing `window` items while collapsed
    #[must_use]
    pub fn new(window: usize) -> Self {
        Self {
            window,
            state: Mutex::new(FeedState::default()),
        }
    }

    /// Replace the whole history
    pub fn replace_items(&self, items: Vec<DigestItem>) {
        let count = items.len();
        self.state.lock().items = items;
        tracing::debug!(count, "digest history replaced");
    }

    /// Full history in service order
    #[must_use]
    pub fn items(&self) -> Vec<DigestItem> {
        self.state.lock().items.clone()
    }

    /// Active date filter
    #[must_use]
    pub fn date_filter(&self) -> Option<String> {
        self.state.lock().date_filter.clone()
    }

    /// Set or clear the date filter (`YYYY-MM-DD`)
    ///
    /// A blank value clears the filter. Always collapses the list.
    pub fn set_date_filter(&self, filter: Option<&str>) {
        let filter = filter
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string);

        let mut state = self.state.lock();
        tracing::debug!(filter = ?filter, "digest date filter changed");
        state.date_filter = filter;
        state.expanded = false;
    }

    /// Whether all filtered items are shown
    #[must_use]
    pub fn is_expanded(&self) -> bool {
        self.state.lock().expanded
    }

    /// Show all filtered items, or only the window
    pub fn set_expanded(&self, expanded: bool) {
        self.state.lock().expanded = expanded;
    }

    /// Flip expanded/collapsed, returning the new value
    pub fn toggle_expanded(&self) -> bool {
        let mut state = self.state.lock();
        state.expanded = !state.expanded;
        state.expanded
    }

    /// Collapsed window size
    #[inline]
    #[must_use]
    pub fn window(&self) -> usize {
        self.window
    }

    /// History narrowed by the date filter
    ///
    /// Without a filter every item is kept, including ones never sent. With a
    /// filter, items lacking `sent_at` are dropped.
    #[must_use]
    pub fn filtered_items(&self) -> Vec<DigestItem> {
        let state = self.state.lock();
        filter_items(&state.items, state.date_filter.as_deref())
            .cloned()
            .collect()
    }

    /// Filtered items limited to the window unless expanded
    #[must_use]
    pub fn visible_items(&self) -> Vec<DigestItem> {
        let state = self.state.lock();
        let limit = if state.expanded { usize::MAX } else { self.window };
        filter_items(&state.items, state.date_filter.as_deref())
            .take(limit)
            .cloned()
            .collect()
    }

    /// Filtered items hidden by the collapsed window
    #[must_use]
    pub fn hidden_count(&self) -> usize {
        let state = self.state.lock();
        if state.expanded {
            return 0;
        }
        filter_items(&state.items, state.date_filter.as_deref())
            .count()
            .saturating_sub(self.window)
    }

    pub(crate) fn reset(&self) {
        *self.state.lock() = FeedState::default();
    }
}

fn filter_items<'a>(
    items: &'a [DigestItem],
    date_filter: Option<&'a str>,
) -> impl Iterator<Item = &'a DigestItem> + 'a {
    items
        .iter()
        .filter(move |item| date_filter.map_or(true, |prefix| item.sent_on(prefix)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::item;
    use crate::types::DigestId;
    use pretty_assertions::assert_eq;

    fn sample_feed() -> DigestFeedController {
        let feed = DigestFeedController::default();
        feed.replace_items(vec![
            item(1, Some("2024-01-01T10:00:00Z")),
            item(2, None),
            item(3, Some("2024-01-02T08:00:00Z")),
        ]);
        feed
    }

    fn ids(items: &[DigestItem]) -> Vec<i64> {
        items.iter().map(|i| i.id.0).collect()
    }

    #[test]
    fn filter_matches_prefix_and_drops_unsent() {
        let feed = sample_feed();
        feed.set_date_filter(Some("2024-01-01"));
        assert_eq!(ids(&feed.filtered_items()), vec![1]);
    }

    #[test]
    fn no_filter_keeps_everything() {
        let feed = sample_feed();
        assert_eq!(ids(&feed.filtered_items()), vec![1, 2, 3]);

        feed.set_date_filter(Some("2024-01-02"));
        feed.set_date_filter(None);
        assert_eq!(ids(&feed.filtered_items()), vec![1, 2, 3]);
    }

    #[test]
    fn blank_filter_clears() {
        let feed = sample_feed();
        feed.set_date_filter(Some("  "));
        assert_eq!(feed.date_filter(), None);
        assert_eq!(feed.filtered_items().len(), 3);
    }

    #[test]
    fn window_limits_visible_items() {
        let feed = DigestFeedController::default();
        feed.replace_items(
            (1..=15)
                .map(|id| item(id, Some("2024-03-01T06:00:00Z")))
                .collect(),
        );

        assert_eq!(feed.visible_items().len(), 10);
        assert_eq!(feed.hidden_count(), 5);
        assert_eq!(feed.visible_items()[0].id, DigestId(1));

        feed.set_expanded(true);
        assert_eq!(feed.visible_items().len(), 15);
        assert_eq!(feed.hidden_count(), 0);
    }

    #[test]
    fn changing_filter_collapses() {
        let feed = sample_feed();

        feed.set_expanded(true);
        feed.set_date_filter(Some("2024-01-01"));
        assert!(!feed.is_expanded());

        assert!(feed.toggle_expanded());
        feed.set_date_filter(None);
        assert!(!feed.is_expanded());
    }

    #[test]
    fn replace_keeps_service_order() {
        let feed = sample_feed();
        feed.replace_items(vec![item(9, None), item(4, None)]);
        assert_eq!(ids(&feed.items()), vec![9, 4]);
    }

    #[test]
    fn custom_window() {
        let feed = DigestFeedController::new(2);
        feed.replace_items(vec![item(1, None), item(2, None), item(3, None)]);
        assert_eq!(ids(&feed.visible_items()), vec![1, 2]);
        assert_eq!(feed.window(), 2);
    }
}
