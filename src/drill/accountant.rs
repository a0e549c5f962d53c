//! Per-target hit accounting
//!
//! Records live in a small arena sorted by [`TargetId`], so iteration order is
//! stable and lookups are a binary search.

use super::state::{HitOutcome, TargetId, TargetRecord};
use crate::error::{DrillError, DrillResult};

/// Owns required/current hit counters for every registered target
#[derive(Debug, Clone, Default)]
pub struct HitAccountant {
    /// Sorted by target id
    records: Vec<TargetRecord>,
}

impl HitAccountant {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    fn index_of(&self, id: TargetId) -> DrillResult<usize> {
        self.records
            .binary_search_by_key(&id, |r| r.target_id)
            .map_err(|_| DrillError::UnknownTarget(id))
    }

    /// Register a target with zero hits
    pub fn register_target(&mut self, id: TargetId, required_hits: u32) -> DrillResult<()> {
        match self.records.binary_search_by_key(&id, |r| r.target_id) {
            Ok(_) => Err(DrillError::DuplicateTarget(id)),
            Err(pos) => {
                self.records.insert(pos, TargetRecord::new(id, required_hits));
                Ok(())
            }
        }
    }

    pub fn unregister_target(&mut self, id: TargetId) -> DrillResult<()> {
        let idx = self.index_of(id)?;
        self.records.remove(idx);
        Ok(())
    }

    /// Drop every record
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Apply one hit and classify it against the requirement
    pub fn record_hit(&mut self, id: TargetId) -> DrillResult<HitOutcome> {
        let idx = self.index_of(id)?;
        let record = &mut self.records[idx];
        record.current_hits = record
            .current_hits
            .checked_add(1)
            .ok_or_else(|| DrillError::invariant(format!("hit counter overflow on {id}")))?;

        Ok(match record.current_hits.cmp(&record.required_hits) {
            std::cmp::Ordering::Less => HitOutcome::Progress,
            std::cmp::Ordering::Equal => HitOutcome::TargetJustCompleted,
            std::cmp::Ordering::Greater => HitOutcome::Overshoot,
        })
    }

    /// True when at least one target is registered and all are satisfied
    pub fn is_round_complete(&self) -> bool {
        !self.records.is_empty() && self.records.iter().all(TargetRecord::is_satisfied)
    }

    /// Zero every hit counter; requirements are kept
    pub fn reset_all(&mut self) {
        for record in &mut self.records {
            record.current_hits = 0;
        }
    }

    pub fn set_required(&mut self, id: TargetId, value: u32) -> DrillResult<()> {
        let idx = self.index_of(id)?;
        self.records[idx].required_hits = value;
        Ok(())
    }

    pub fn current_hits(&self, id: TargetId) -> Option<u32> {
        self.index_of(id).ok().map(|i| self.records[i].current_hits)
    }

    pub fn required_hits(&self, id: TargetId) -> Option<u32> {
        self.index_of(id).ok().map(|i| self.records[i].required_hits)
    }

    /// Registered ids in ascending order
    pub fn target_ids(&self) -> Vec<TargetId> {
        self.records.iter().map(|r| r.target_id).collect()
    }

    pub fn records(&self) -> &[TargetRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn accountant_with(required: &[u32]) -> HitAccountant {
        let mut acc = HitAccountant::new();
        for (i, &req) in required.iter().enumerate() {
            acc.register_target(TargetId(i as u32 + 1), req).unwrap();
        }
        acc
    }

    #[test]
    fn test_register_duplicate() {
        let mut acc = HitAccountant::new();
        acc.register_target(TargetId(3), 2).unwrap();
        assert_eq!(
            acc.register_target(TargetId(3), 5),
            Err(DrillError::DuplicateTarget(TargetId(3)))
        );
        // First registration wins
        assert_eq!(acc.required_hits(TargetId(3)), Some(2));
        assert_eq!(acc.current_hits(TargetId(3)), Some(0));
    }

    #[test]
    fn test_records_sorted_by_id() {
        let mut acc = HitAccountant::new();
        for id in [5, 1, 3] {
            acc.register_target(TargetId(id), 1).unwrap();
        }
        assert_eq!(acc.target_ids(), vec![TargetId(1), TargetId(3), TargetId(5)]);
    }

    #[test]
    fn test_unknown_target() {
        let mut acc = accountant_with(&[2]);
        assert_eq!(
            acc.record_hit(TargetId(9)),
            Err(DrillError::UnknownTarget(TargetId(9)))
        );
        assert_eq!(
            acc.unregister_target(TargetId(9)),
            Err(DrillError::UnknownTarget(TargetId(9)))
        );
        assert_eq!(
            acc.set_required(TargetId(9), 4),
            Err(DrillError::UnknownTarget(TargetId(9)))
        );
        assert_eq!(acc.len(), 1);
    }

    #[test]
    fn test_hit_outcomes() {
        let mut acc = accountant_with(&[2]);
        let id = TargetId(1);
        assert_eq!(acc.record_hit(id), Ok(HitOutcome::Progress));
        assert_eq!(acc.record_hit(id), Ok(HitOutcome::TargetJustCompleted));
        assert_eq!(acc.record_hit(id), Ok(HitOutcome::Overshoot));
        assert_eq!(acc.record_hit(id), Ok(HitOutcome::Overshoot));
        assert_eq!(acc.current_hits(id), Some(4));
    }

    #[test]
    fn test_zero_requirement_overshoots_on_first_hit() {
        let mut acc = accountant_with(&[0]);
        assert!(acc.is_round_complete());
        assert_eq!(acc.record_hit(TargetId(1)), Ok(HitOutcome::Overshoot));
    }

    #[test]
    fn test_round_complete() {
        let mut acc = HitAccountant::new();
        assert!(!acc.is_round_complete(), "empty registry is never complete");

        acc.register_target(TargetId(1), 1).unwrap();
        acc.register_target(TargetId(2), 2).unwrap();
        acc.record_hit(TargetId(1)).unwrap();
        assert!(!acc.is_round_complete());
        acc.record_hit(TargetId(2)).unwrap();
        acc.record_hit(TargetId(2)).unwrap();
        assert!(acc.is_round_complete());

        // Past the requirement is not complete
        acc.record_hit(TargetId(2)).unwrap();
        assert!(!acc.is_round_complete());
    }

    #[test]
    fn test_reset_all_keeps_requirements() {
        let mut acc = accountant_with(&[3, 4]);
        acc.record_hit(TargetId(1)).unwrap();
        acc.record_hit(TargetId(2)).unwrap();
        acc.reset_all();
        assert!(acc.records().iter().all(|r| r.current_hits == 0));
        assert_eq!(acc.required_hits(TargetId(1)), Some(3));
        assert_eq!(acc.required_hits(TargetId(2)), Some(4));
    }

    #[test]
    fn test_unregister_mid_round() {
        let mut acc = accountant_with(&[1, 5]);
        acc.record_hit(TargetId(1)).unwrap();
        assert!(!acc.is_round_complete());
        acc.unregister_target(TargetId(2)).unwrap();
        assert!(acc.is_round_complete());
        acc.unregister_target(TargetId(1)).unwrap();
        assert!(acc.is_empty());
        assert!(!acc.is_round_complete());
    }

    proptest! {
        #[test]
        fn prop_exact_hits_complete_once(required in 1u32..40) {
            let mut acc = accountant_with(&[required]);
            let outcomes: Vec<_> = (0..required)
                .map(|_| acc.record_hit(TargetId(1)).unwrap())
                .collect();
            let completed = outcomes.iter().filter(|o| **o == HitOutcome::TargetJustCompleted).count();
            let overshoots = outcomes.iter().filter(|o| **o == HitOutcome::Overshoot).count();
            prop_assert_eq!(completed, 1);
            prop_assert_eq!(overshoots, 0);
            prop_assert_eq!(*outcomes.last().unwrap(), HitOutcome::TargetJustCompleted);
        }

        #[test]
        fn prop_one_extra_hit_overshoots(required in 0u32..40) {
            let mut acc = accountant_with(&[required]);
            for _ in 0..required {
                acc.record_hit(TargetId(1)).unwrap();
            }
            prop_assert_eq!(acc.record_hit(TargetId(1)).unwrap(), HitOutcome::Overshoot);
        }

        #[test]
        fn prop_complete_iff_all_equal(
            targets in proptest::collection::vec((0u32..6, 0u32..8), 1..7)
        ) {
            let mut acc = HitAccountant::new();
            for (i, &(required, hits)) in targets.iter().enumerate() {
                let id = TargetId(i as u32);
                acc.register_target(id, required).unwrap();
                for _ in 0..hits {
                    acc.record_hit(id).unwrap();
                }
            }
            let expected = targets.iter().all(|&(required, hits)| required == hits);
            prop_assert_eq!(acc.is_round_complete(), expected);

            acc.reset_all();
            prop_assert!(acc.records().iter().all(|r| r.current_hits == 0));
        }
    }
}
