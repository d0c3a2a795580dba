//! Presentation boundary.
//!
//! Rendering is left to a [`Presenter`]. An empty store is its own
//! "waiting for data" view, independent of connectivity: a connected feed
//! may have no data yet, and a disconnected one keeps its last values.

use crate::feed::{ConnectivityState, GroupAggregator, GroupSnapshot};
use chrono::{DateTime, Utc};
use log::info;
use std::time::Duration;

/// What a presenter should show for the group store.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedView {
    WaitingForData,
    Groups(Vec<GroupSnapshot>),
}

impl FeedView {
    pub fn from_snapshot(snapshot: Vec<GroupSnapshot>) -> Self {
        if snapshot.is_empty() {
            FeedView::WaitingForData
        } else {
            FeedView::Groups(snapshot)
        }
    }

    pub fn capture(aggregator: &GroupAggregator) -> Self {
        Self::from_snapshot(aggregator.snapshot())
    }
}

/// Consumer of connectivity state and the ordered group snapshot.
pub trait Presenter {
    fn render(&mut self, connectivity: ConnectivityState, view: &FeedView);
}

/// Renders the feed as log lines. Groups older than `stale_after` are flagged.
pub struct LogPresenter {
    stale_after: Duration,
}

impl LogPresenter {
    pub fn new(stale_after: Duration) -> Self {
        Self { stale_after }
    }

    pub fn lines(
        &self,
        connectivity: ConnectivityState,
        view: &FeedView,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let status = match connectivity {
            ConnectivityState::Connected => "connected",
            ConnectivityState::Disconnected => "disconnected",
        };

        let mut lines = vec![format!("Feed {}", status)];
        match view {
            FeedView::WaitingForData => lines.push("  waiting for data".to_string()),
            FeedView::Groups(groups) => {
                for group in groups {
                    let age = group.age(now);
                    let stale = if age > self.stale_after { " (stale)" } else { "" };
                    lines.push(format!(
                        "  {}: {:.1}°C {:.1}% ({}s ago){}",
                        group.group_id,
                        group.temperature,
                        group.humidity,
                        age.as_secs(),
                        stale
                    ));
                }
            }
        }
        lines
    }
}

impl Presenter for LogPresenter {
    fn render(&mut self, connectivity: ConnectivityState, view: &FeedView) {
        for line in self.lines(connectivity, view, Utc::now()) {
            info!("{}", line);
        }
    }
}
