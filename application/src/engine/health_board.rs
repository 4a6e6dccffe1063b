//! Dependency health board: the single owner of per-group health scores.
//!
//! Written by the health monitor, read by the execution engine before every
//! call to a tool that declares dependencies.

use conductor_domain::{DependencyGroup, GroupId, ProbeOutcome};
use parking_lot::RwLock;
use std::collections::HashMap;

pub struct HealthBoard {
    ema_weight: f64,
    groups: RwLock<HashMap<GroupId, DependencyGroup>>,
}

impl HealthBoard {
    pub fn new(ema_weight: f64) -> Self {
        Self {
            ema_weight,
            groups: RwLock::new(HashMap::new()),
        }
    }

    /// Make a group visible on the board before its first probe.
    pub fn register(&self, group: &GroupId) {
        self.groups
            .write()
            .entry(group.clone())
            .or_insert_with(|| DependencyGroup::new(group.clone()));
    }

    /// Current score; groups never probed count as fully healthy.
    pub fn score(&self, group: &GroupId) -> f64 {
        self.groups.read().get(group).map_or(1.0, |g| g.score)
    }

    /// First group in `groups` whose score is below `threshold`.
    pub fn first_unavailable(&self, groups: &[GroupId], threshold: f64) -> Option<(GroupId, f64)> {
        if groups.is_empty() {
            return None;
        }
        let board = self.groups.read();
        groups.iter().find_map(|id| {
            let score = board.get(id).map_or(1.0, |g| g.score);
            (score < threshold).then(|| (id.clone(), score))
        })
    }

    /// Fold a probe outcome into the group's score and return the new score.
    pub fn record(&self, group: &GroupId, outcome: ProbeOutcome, probed_at_ms: u64) -> f64 {
        let mut groups = self.groups.write();
        groups
            .entry(group.clone())
            .or_insert_with(|| DependencyGroup::new(group.clone()))
            .record_probe(outcome, self.ema_weight, probed_at_ms)
    }

    /// All groups, sorted by id.
    pub fn snapshot(&self) -> Vec<DependencyGroup> {
        let mut groups: Vec<DependencyGroup> = self.groups.read().values().cloned().collect();
        groups.sort_by(|a, b| a.id.cmp(&b.id));
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_unknown_group_is_healthy() {
        let board = HealthBoard::new(0.3);
        assert_eq!(board.score(&GroupId::new("census")), 1.0);
        assert!(board.first_unavailable(&[GroupId::new("census")], 0.5).is_none());
    }

    #[test]
    fn test_first_unavailable_reports_score() {
        let board = HealthBoard::new(0.5);
        let census = GroupId::new("census");
        let listings = GroupId::new("listings");
        board.register(&listings);
        board.record(&census, ProbeOutcome::unhealthy(), 1);
        board.record(&census, ProbeOutcome::unhealthy(), 2);

        let (group, score) = board
            .first_unavailable(&[listings.clone(), census.clone()], 0.5)
            .unwrap();
        assert_eq!(group, census);
        assert!((score - 0.25).abs() < 1e-9);

        board.record(&census, ProbeOutcome::healthy(Duration::from_millis(3)), 3);
        assert!(board.first_unavailable(&[census], 0.5).is_none());
    }

    #[test]
    fn test_snapshot_sorted() {
        let board = HealthBoard::new(0.3);
        board.register(&GroupId::new("zillow"));
        board.register(&GroupId::new("census"));
        let ids: Vec<String> = board.snapshot().iter().map(|g| g.id.to_string()).collect();
        assert_eq!(ids, vec!["census", "zillow"]);
    }
}
