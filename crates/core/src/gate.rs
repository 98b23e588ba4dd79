//! Round unlocking rules and the per-department catalog built on them.
//!
//! Availability derived here is an optimistic client-side view for responsiveness.
//! It is not an authorization boundary: the backend must re-validate a round's
//! availability when it receives a submission.

use crate::model::{DiagnosisProgress, NextRound, Round, RoundNumber, RoundRecord};

/// Mark each record available iff `round_number <= max_available_round`, and
/// completed iff it appears in `completed_rounds`. Output is ordered by round
/// number; duplicate records keep the first occurrence and records beyond
/// `total_rounds` are dropped.
#[must_use]
pub fn derive(progress: &DiagnosisProgress, records: &[RoundRecord]) -> Vec<Round> {
    let mut sorted: Vec<&RoundRecord> = records
        .iter()
        .filter(|r| r.round_number.value() <= progress.total_rounds())
        .collect();
    sorted.sort_by_key(|r| r.round_number);
    sorted.dedup_by_key(|r| r.round_number);

    sorted
        .into_iter()
        .map(|record| {
            let is_completed = progress.is_completed(record.round_number);
            Round {
                department: progress.department().clone(),
                round_number: record.round_number,
                focus_area: record.focus_area.clone(),
                total_questions: record.total_questions,
                time_limit_seconds: record.time_limit_seconds,
                is_completed,
                is_available: is_available(progress, record.round_number),
                score: if is_completed { record.score } else { None },
                completion_date: if is_completed {
                    record.completion_date
                } else {
                    None
                },
            }
        })
        .collect()
}

#[must_use]
pub fn is_available(progress: &DiagnosisProgress, round: RoundNumber) -> bool {
    round.value() <= progress.max_available_round()
}

/// The unlock pointer, never past the `total_rounds + 1` sentinel.
#[must_use]
pub fn next_available_round(progress: &DiagnosisProgress) -> NextRound {
    let pointer = progress.max_available_round().min(progress.sentinel());
    NextRound::from_pointer(pointer, progress.total_rounds())
}

/// Round that should hold focus when several are shown: the lowest-numbered
/// available round that is not yet completed. `None` once every round is done.
#[must_use]
pub fn default_focus(rounds: &[Round]) -> Option<RoundNumber> {
    rounds
        .iter()
        .filter(|r| r.is_open())
        .map(|r| r.round_number)
        .min()
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Ordered view of every round of one department for one learner.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundCatalog {
    progress: DiagnosisProgress,
    rounds: Vec<Round>,
}

impl RoundCatalog {
    #[must_use]
    pub fn build(progress: DiagnosisProgress, records: &[RoundRecord]) -> Self {
        let rounds = derive(&progress, records);
        Self { progress, rounds }
    }

    #[must_use]
    pub fn progress(&self) -> &DiagnosisProgress {
        &self.progress
    }

    #[must_use]
    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    #[must_use]
    pub fn round(&self, number: RoundNumber) -> Option<&Round> {
        self.rounds.iter().find(|r| r.round_number == number)
    }

    #[must_use]
    pub fn is_available(&self, number: RoundNumber) -> bool {
        is_available(&self.progress, number)
    }

    pub fn available_rounds(&self) -> impl Iterator<Item = &Round> {
        self.rounds.iter().filter(|r| r.is_available)
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.rounds.iter().filter(|r| r.is_completed).count()
    }

    #[must_use]
    pub fn default_focus(&self) -> Option<RoundNumber> {
        default_focus(&self.rounds)
    }

    #[must_use]
    pub fn next_available_round(&self) -> NextRound {
        next_available_round(&self.progress)
    }

    #[must_use]
    pub fn is_all_complete(&self) -> bool {
        matches!(self.next_available_round(), NextRound::AllComplete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Department;
    use crate::time::fixed_now;
    use std::collections::BTreeMap;

    fn r(n: u8) -> RoundNumber {
        RoundNumber::new(n).unwrap()
    }

    fn records(total: u8) -> Vec<RoundRecord> {
        (1..=total)
            .map(|n| RoundRecord {
                round_number: r(n),
                focus_area: format!("Area {n}"),
                total_questions: 5,
                time_limit_seconds: 600,
                score: Some(70),
                completion_date: Some(fixed_now()),
            })
            .collect()
    }

    fn progress(total: u8, completed: &[u8]) -> DiagnosisProgress {
        let scores: BTreeMap<RoundNumber, f64> =
            completed.iter().map(|n| (r(*n), 70.0)).collect();
        let count = u32::try_from(completed.len()).unwrap();
        DiagnosisProgress::from_completed(Department::new("Physics").unwrap(), total, &scores, count)
            .unwrap()
    }

    #[test]
    fn availability_matches_unlock_pointer_for_every_round() {
        for completed in 0..=10_u8 {
            let done: Vec<u8> = (1..=completed).collect();
            let p = progress(10, &done);
            for round in derive(&p, &records(10)) {
                assert_eq!(
                    round.is_available,
                    round.round_number.value() <= p.max_available_round(),
                    "round {} with {completed} completed",
                    round.round_number
                );
            }
        }
    }

    #[test]
    fn completed_flags_follow_progress_and_hide_stale_scores() {
        let p = progress(4, &[1, 2]);
        let rounds = derive(&p, &records(4));
        let flags: Vec<bool> = rounds.iter().map(|r| r.is_completed).collect();
        assert_eq!(flags, vec![true, true, false, false]);
        assert_eq!(rounds[0].score, Some(70));
        assert_eq!(rounds[2].score, None);
        assert_eq!(rounds[2].completion_date, None);
    }

    #[test]
    fn derive_orders_and_dedups_records() {
        let mut recs = records(3);
        recs.reverse();
        recs.push(recs[0].clone());
        let rounds = derive(&progress(3, &[]), &recs);
        let numbers: Vec<u8> = rounds.iter().map(|r| r.round_number.value()).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn next_available_reports_sentinel_as_all_complete() {
        assert_eq!(next_available_round(&progress(3, &[1])), NextRound::Round(r(2)));
        assert_eq!(
            next_available_round(&progress(3, &[1, 2, 3])),
            NextRound::AllComplete
        );
    }

    #[test]
    fn default_focus_is_lowest_open_round() {
        let catalog = RoundCatalog::build(progress(5, &[1, 2]), &records(5));
        assert_eq!(catalog.default_focus(), Some(r(3)));
        assert_eq!(catalog.next_available_round(), NextRound::Round(r(3)));
        assert_eq!(catalog.available_rounds().count(), 3);
        assert_eq!(catalog.completed_count(), 2);
    }

    #[test]
    fn default_focus_prefers_open_round_over_completed_ones() {
        let completed: BTreeMap<RoundNumber, f64> =
            BTreeMap::from([(r(1), 95.0), (r(3), 80.0)]);
        let p = DiagnosisProgress::from_completed(
            Department::new("Physics").unwrap(),
            4,
            &completed,
            2,
        )
        .unwrap();
        let catalog = RoundCatalog::build(p, &records(4));
        assert_eq!(catalog.default_focus(), Some(r(2)));
    }

    #[test]
    fn all_complete_has_no_focus() {
        let catalog = RoundCatalog::build(progress(2, &[1, 2]), &records(2));
        assert!(catalog.is_all_complete());
        assert_eq!(catalog.default_focus(), None);
        assert!(catalog.is_available(r(2)));
    }
}
