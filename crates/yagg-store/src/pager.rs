//! Monotonic, fixed-size paging over the commit graph.
//!
//! The pager owns the loaded prefix of the history. It hands out at most one
//! [`PageRequest`] at a time and stops once a page comes back short; there is
//! no separate total-count query. Each [`restart`](CommitPager::restart)
//! starts a new epoch, and responses carrying an older epoch are ignored. The
//! loaded commits stay visible until the restarted first page replaces them.

use std::sync::Arc;

use yagg_types::GraphCommit;

/// One outstanding page fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub skip: usize,
    pub limit: usize,
    epoch: u64,
    restart: bool,
}

#[derive(Clone, Debug)]
pub struct CommitPager {
    page_size: usize,
    commits: Arc<Vec<GraphCommit>>,
    has_more: bool,
    in_flight: bool,
    epoch: u64,
    restart_pending: bool,
}

impl CommitPager {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            commits: Arc::new(Vec::new()),
            has_more: true,
            in_flight: false,
            epoch: 0,
            restart_pending: false,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Loaded commits in fetch order.
    pub fn commits(&self) -> Arc<Vec<GraphCommit>> {
        Arc::clone(&self.commits)
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    /// Row of `hash` in the loaded window.
    pub fn position(&self, hash: &str) -> Option<usize> {
        self.commits.iter().position(|c| c.hash() == hash)
    }

    /// Claims the next page, or `None` while a page is in flight or after the
    /// history ended. After a restart the claim is for offset 0.
    pub fn begin_load(&mut self) -> Option<PageRequest> {
        if self.in_flight || !(self.has_more || self.restart_pending) {
            return None;
        }
        self.in_flight = true;
        Some(PageRequest {
            skip: if self.restart_pending { 0 } else { self.commits.len() },
            limit: self.page_size,
            epoch: self.epoch,
            restart: self.restart_pending,
        })
    }

    /// Appends a fetched page, or replaces the list with it after a restart.
    /// Returns `false` if the request was stale.
    pub fn complete(&mut self, request: PageRequest, page: Vec<GraphCommit>) -> bool {
        if request.epoch != self.epoch {
            return false;
        }
        self.in_flight = false;
        self.has_more = page.len() >= request.limit;
        if request.restart {
            self.restart_pending = false;
            self.commits = Arc::new(page);
        } else {
            Arc::make_mut(&mut self.commits).extend(page);
        }
        true
    }

    /// Releases a failed request. Returns `false` if the request was stale.
    pub fn fail(&mut self, request: PageRequest) -> bool {
        if request.epoch != self.epoch {
            return false;
        }
        self.in_flight = false;
        true
    }

    /// Starts again from offset 0. Outstanding requests become stale and the
    /// loaded commits are kept until a first page arrives.
    pub fn restart(&mut self) {
        self.epoch += 1;
        self.in_flight = false;
        self.restart_pending = true;
    }
}
