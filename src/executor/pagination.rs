//! Pagination state machine.
//!
//! ```text
//! Idle --submit--> QueryActive --count_resolved--> Ready --go_to/next/prev--> Ready
//!   ^                   |                            |
//!   +------ submit -----+------------ submit --------+   (any state -> QueryActive)
//! ```

use tracing::debug;

use crate::error::PaginationError;
use crate::query::RangeQuery;

/// Phase of the pagination state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No query submitted
    Idle,
    /// Query set, count not yet known
    QueryActive,
    /// Count known, pages computable
    Ready,
}

/// Identifies one query submission
///
/// A count answer carries the ticket of the submission it belongs to, so an
/// answer for a superseded query can be recognised and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryTicket(u64);

/// Result of a navigation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMove {
    /// The current page changed
    Moved,
    /// The requested page was already current (or clamped to it)
    Unchanged,
}

/// Navigation state for the active query
#[derive(Debug, Clone, PartialEq)]
pub struct PageState {
    pub query: RangeQuery,
    /// 0-based
    pub current_page: u64,
    pub page_size: u64,
    /// Cached count; None until resolved
    pub total_records: Option<u64>,
    /// `max(1, ceil(total_records / page_size))` once the count is known
    pub total_pages: Option<u64>,
}

/// Owns the page state and computes page transitions
#[derive(Debug, Clone)]
pub struct PaginationController {
    page_size: u64,
    state: Option<PageState>,
    generation: u64,
}

impl PaginationController {
    /// Create a controller with a fixed page size
    ///
    /// A zero page size is raised to 1.
    pub fn new(page_size: u64) -> Self {
        Self {
            page_size: page_size.max(1),
            state: None,
            generation: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        match &self.state {
            None => Phase::Idle,
            Some(state) if state.total_records.is_none() => Phase::QueryActive,
            Some(_) => Phase::Ready,
        }
    }

    /// Replace any active query, reset to page 0 and forget the cached count
    pub fn submit(&mut self, query: RangeQuery) -> QueryTicket {
        self.generation += 1;
        self.state = Some(PageState {
            query,
            current_page: 0,
            page_size: self.page_size,
            total_records: None,
            total_pages: None,
        });
        debug!("Submitted query #{}", self.generation);
        QueryTicket(self.generation)
    }

    /// Record the count for the submission identified by `ticket`
    ///
    /// Answers for superseded submissions are ignored and return `Ok(false)`.
    /// Resolving again for the current submission (a retried count) replaces
    /// the total and clamps the current page into the new range.
    ///
    /// # Returns
    /// * `Result<bool, PaginationError>` - True if the count was applied
    pub fn count_resolved(
        &mut self,
        ticket: QueryTicket,
        total_records: u64,
    ) -> Result<bool, PaginationError> {
        if ticket.0 != self.generation {
            debug!(
                "Ignoring count for superseded query #{} (current #{})",
                ticket.0, self.generation
            );
            return Ok(false);
        }

        let page_size = self.page_size;
        let state = self.state.as_mut().ok_or(PaginationError::NoPendingCount)?;

        let total_pages = total_records.div_ceil(page_size).max(1);
        state.total_records = Some(total_records);
        state.total_pages = Some(total_pages);
        state.current_page = state.current_page.min(total_pages - 1);

        debug!(
            "Count resolved: {} records, {} pages",
            total_records, total_pages
        );
        Ok(true)
    }

    /// Move to `page`, clamped to `[0, total_pages - 1]`
    pub fn go_to(&mut self, page: u64) -> Result<PageMove, PaginationError> {
        let state = self.ready_state_mut()?;
        let last = state.total_pages.unwrap_or(1) - 1;
        let target = page.min(last);

        if target == state.current_page {
            Ok(PageMove::Unchanged)
        } else {
            state.current_page = target;
            Ok(PageMove::Moved)
        }
    }

    /// Move one page forward; no-op on the last page
    pub fn next(&mut self) -> Result<PageMove, PaginationError> {
        let current = self.ready_state_mut()?.current_page;
        self.go_to(current.saturating_add(1))
    }

    /// Move one page back; no-op on the first page
    pub fn prev(&mut self) -> Result<PageMove, PaginationError> {
        let current = self.ready_state_mut()?.current_page;
        self.go_to(current.saturating_sub(1))
    }

    /// `(skip, limit)` of the current page, or None when there is nothing to fetch
    pub fn window(&self) -> Option<(u64, u64)> {
        let state = self.state.as_ref()?;
        match state.total_records {
            Some(total) if total > 0 => {
                Some((state.current_page * state.page_size, state.page_size))
            }
            _ => None,
        }
    }

    pub fn has_next(&self) -> bool {
        self.state.as_ref().is_some_and(|s| {
            s.total_pages
                .is_some_and(|pages| s.current_page + 1 < pages)
        })
    }

    pub fn has_prev(&self) -> bool {
        self.state
            .as_ref()
            .is_some_and(|s| s.total_pages.is_some() && s.current_page > 0)
    }

    pub fn state(&self) -> Option<&PageState> {
        self.state.as_ref()
    }

    pub fn query(&self) -> Option<&RangeQuery> {
        self.state.as_ref().map(|s| &s.query)
    }

    /// Ticket of the current submission
    pub fn ticket(&self) -> Option<QueryTicket> {
        self.state.as_ref().map(|_| QueryTicket(self.generation))
    }

    pub fn current_page(&self) -> u64 {
        self.state.as_ref().map_or(0, |s| s.current_page)
    }

    pub fn total_records(&self) -> Option<u64> {
        self.state.as_ref().and_then(|s| s.total_records)
    }

    pub fn total_pages(&self) -> Option<u64> {
        self.state.as_ref().and_then(|s| s.total_pages)
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    fn ready_state_mut(&mut self) -> Result<&mut PageState, PaginationError> {
        match self.state.as_mut() {
            Some(state) if state.total_pages.is_some() => Ok(state),
            _ => Err(PaginationError::NotReady),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Mode, QueryBuilder, StatusBand};
    use chrono::NaiveDate;

    fn query(hour: u32) -> RangeQuery {
        let day = NaiveDate::from_ymd_opt(2025, 8, 28).unwrap();
        QueryBuilder::new(StatusBand::new("Genset_Run_SS", 0, 2)).build(
            day.and_hms_opt(hour, 0, 0).unwrap(),
            day.and_hms_opt(hour + 1, 0, 0).unwrap(),
            Mode::Fetch,
        )
    }

    fn ready(total: u64) -> PaginationController {
        let mut controller = PaginationController::new(100);
        let ticket = controller.submit(query(8));
        assert!(controller.count_resolved(ticket, total).unwrap());
        controller
    }

    #[test]
    fn test_phases() {
        let mut controller = PaginationController::new(100);
        assert_eq!(controller.phase(), Phase::Idle);
        let ticket = controller.submit(query(8));
        assert_eq!(controller.phase(), Phase::QueryActive);
        controller.count_resolved(ticket, 10).unwrap();
        assert_eq!(controller.phase(), Phase::Ready);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let controller = ready(250);
        assert_eq!(controller.total_pages(), Some(3));
        assert_eq!(ready(200).total_pages(), Some(2));
        assert_eq!(ready(1).total_pages(), Some(1));
    }

    #[test]
    fn test_zero_records_single_empty_page() {
        let controller = ready(0);
        assert_eq!(controller.total_pages(), Some(1));
        assert_eq!(controller.current_page(), 0);
        assert_eq!(controller.window(), None);
    }

    #[test]
    fn test_navigation_clamps_and_noops_at_bounds() {
        let mut controller = ready(250);
        assert_eq!(controller.prev().unwrap(), PageMove::Unchanged);
        assert_eq!(controller.go_to(99).unwrap(), PageMove::Moved);
        assert_eq!(controller.current_page(), 2);
        assert_eq!(controller.window(), Some((200, 100)));
        assert!(!controller.has_next());
        assert_eq!(controller.next().unwrap(), PageMove::Unchanged);
        assert_eq!(controller.current_page(), 2);
        assert_eq!(controller.prev().unwrap(), PageMove::Moved);
        assert_eq!(controller.current_page(), 1);
        assert_eq!(controller.go_to(1).unwrap(), PageMove::Unchanged);
    }

    #[test]
    fn test_navigation_requires_count() {
        let mut controller = PaginationController::new(100);
        assert_eq!(controller.next(), Err(PaginationError::NotReady));
        controller.submit(query(8));
        assert_eq!(controller.go_to(1), Err(PaginationError::NotReady));
    }

    #[test]
    fn test_submit_resets_page_and_count() {
        let mut controller = ready(500);
        controller.go_to(3).unwrap();
        controller.submit(query(9));
        assert_eq!(controller.current_page(), 0);
        assert_eq!(controller.total_records(), None);
        assert_eq!(controller.phase(), Phase::QueryActive);
    }

    #[test]
    fn test_stale_count_ignored() {
        let mut controller = PaginationController::new(100);
        let old = controller.submit(query(8));
        let current = controller.submit(query(9));
        assert!(!controller.count_resolved(old, 1000).unwrap());
        assert_eq!(controller.phase(), Phase::QueryActive);
        assert!(controller.count_resolved(current, 5).unwrap());
        assert_eq!(controller.total_records(), Some(5));
    }

    #[test]
    fn test_recount_clamps_current_page() {
        let mut controller = ready(500);
        controller.go_to(4).unwrap();
        let ticket = controller.ticket().unwrap();
        controller.count_resolved(ticket, 150).unwrap();
        assert_eq!(controller.total_pages(), Some(2));
        assert_eq!(controller.current_page(), 1);
    }
}
