//! Edge records and temporal validity

use crate::node::NodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Stable identifier of an edge inside one [`GraphStore`](crate::GraphStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Timestamp used for facts that never expire.
pub fn never_expires() -> DateTime<Utc> {
    DateTime::<Utc>::MAX_UTC
}

/// The `(from, to)` interval during which a fact is applicable, independent
/// of its expiration timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl ValidityWindow {
    /// The window covering all of time.
    pub fn permanent() -> Self {
        Self {
            from: DateTime::<Utc>::MIN_UTC,
            to: DateTime::<Utc>::MAX_UTC,
        }
    }

    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// True when the two intervals overlap at any point.
    pub fn intersects(&self, other: &ValidityWindow) -> bool {
        !(self.from > other.to || other.from > self.to)
    }

    /// Shrink this window to the intersection with `other`.
    pub fn restrict(&mut self, other: &ValidityWindow) {
        if other.from > self.from {
            self.from = other.from;
        }
        if other.to < self.to {
            self.to = other.to;
        }
    }
}

impl Default for ValidityWindow {
    fn default() -> Self {
        Self::permanent()
    }
}

/// A labeled directed edge between two arena nodes.
///
/// Identity for deduplication is `(label, source, destination)`; merging a
/// duplicate adds another expiration timestamp instead of a second record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub label: String,
    pub source: NodeId,
    pub destination: NodeId,
    /// The label is a regex matched against concatenated path labels.
    pub regex_label: bool,
    /// Every timestamp at which this fact was (re-)asserted to expire.
    expirations: BTreeSet<DateTime<Utc>>,
    pub window: ValidityWindow,
}

impl Edge {
    pub fn new(
        label: impl Into<String>,
        source: NodeId,
        destination: NodeId,
        expire_at: DateTime<Utc>,
        window: ValidityWindow,
    ) -> Self {
        let mut expirations = BTreeSet::new();
        expirations.insert(expire_at);
        Self {
            label: label.into(),
            source,
            destination,
            regex_label: false,
            expirations,
            window,
        }
    }

    /// The earliest recorded expiration timestamp.
    pub fn first_expiration(&self) -> DateTime<Utc> {
        self.expirations
            .iter()
            .next()
            .copied()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// The latest recorded expiration timestamp; the edge is live until then.
    pub fn last_expiration(&self) -> DateTime<Utc> {
        self.expirations
            .iter()
            .next_back()
            .copied()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Record another expiration timestamp (duplicate-edge merge).
    pub fn add_expiration(&mut self, expire_at: DateTime<Utc>) {
        self.expirations.insert(expire_at);
    }

    /// Drop every expiration timestamp at or before `now`. An edge left with
    /// no timestamps is expired and due for archival.
    pub fn refresh_expirations(&mut self, now: DateTime<Utc>) {
        self.expirations.retain(|t| *t > now);
    }

    pub fn has_expirations(&self) -> bool {
        !self.expirations.is_empty()
    }

    pub fn expiration_count(&self) -> usize {
        self.expirations.len()
    }

    /// True when the latest expiration lies in the past.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.last_expiration() < now
    }

    pub fn same_triple(&self, label: &str, source: NodeId, destination: NodeId) -> bool {
        self.label == label && self.source == source && self.destination == destination
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_window_intersection() {
        let a = ValidityWindow::new(ts(0), ts(100));
        let b = ValidityWindow::new(ts(100), ts(200));
        let c = ValidityWindow::new(ts(101), ts(200));
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
        assert!(a.intersects(&ValidityWindow::permanent()));
    }

    #[test]
    fn test_expiration_bookkeeping() {
        let mut edge = Edge::new("e", NodeId(0), NodeId(1), ts(50), ValidityWindow::permanent());
        edge.add_expiration(ts(150));
        assert_eq!(edge.expiration_count(), 2);
        assert_eq!(edge.first_expiration(), ts(50));
        assert_eq!(edge.last_expiration(), ts(150));

        edge.refresh_expirations(ts(100));
        assert_eq!(edge.expiration_count(), 1);
        assert_eq!(edge.last_expiration(), ts(150));

        edge.refresh_expirations(ts(150));
        assert!(!edge.has_expirations());
    }

    #[test]
    fn test_expired_by_latest_timestamp() {
        let mut edge = Edge::new("e", NodeId(0), NodeId(1), ts(50), ValidityWindow::permanent());
        assert!(edge.is_expired(ts(51)));
        edge.add_expiration(ts(500));
        assert!(!edge.is_expired(ts(51)));
    }
}
