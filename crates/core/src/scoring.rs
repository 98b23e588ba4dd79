use std::collections::BTreeMap;

use crate::ledger::AnswerLedger;
use crate::model::{AnswerKey, PerformanceLevel};

//
// ─── REPORT ────────────────────────────────────────────────────────────────────
//

/// Accuracy within one domain tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainScore {
    pub domain: String,
    pub correct: u32,
    pub total: u32,
}

/// Outcome of scoring a ledger against an answer key.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreReport {
    pub correct_count: u32,
    pub total_questions: u32,
    /// Exact percentage, kept for aggregate statistics.
    pub percentage: f64,
    pub level: PerformanceLevel,
    pub domains: Vec<DomainScore>,
}

impl ScoreReport {
    /// Percentage rounded to the nearest integer for display and submission.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn display_score(&self) -> u32 {
        self.percentage.round().clamp(0.0, 100.0) as u32
    }

    #[must_use]
    pub fn incorrect_count(&self) -> u32 {
        self.total_questions - self.correct_count
    }
}

//
// ─── SCORING ───────────────────────────────────────────────────────────────────
//

/// Score `answers` against `key`.
///
/// Every id in the key counts toward the total; an unanswered id counts as
/// incorrect. Answers for ids outside the key are ignored. An empty key scores 0 %.
#[must_use]
pub fn score(answers: &AnswerLedger, key: &AnswerKey) -> ScoreReport {
    let mut correct_count = 0_u32;
    let mut total_questions = 0_u32;
    let mut domains: BTreeMap<&str, (u32, u32)> = BTreeMap::new();

    for (id, entry) in key.iter() {
        total_questions = total_questions.saturating_add(1);
        let hit = answers.choice_for(id) == Some(entry.correct);
        let bucket = domains.entry(entry.domain.as_str()).or_default();
        bucket.1 += 1;
        if hit {
            correct_count = correct_count.saturating_add(1);
            bucket.0 += 1;
        }
    }

    let percentage = percentage(correct_count, total_questions);

    ScoreReport {
        correct_count,
        total_questions,
        percentage,
        level: performance_level(percentage),
        domains: domains
            .into_iter()
            .map(|(domain, (correct, total))| DomainScore {
                domain: domain.to_owned(),
                correct,
                total,
            })
            .collect(),
    }
}

/// `correct / total * 100`, or `0.0` when there are no questions.
#[must_use]
pub fn percentage(correct: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    f64::from(correct) / f64::from(total) * 100.0
}

/// Map an exact percentage to its band. Bounds are lower-inclusive.
#[must_use]
pub fn performance_level(score: f64) -> PerformanceLevel {
    if score >= 90.0 {
        PerformanceLevel::Excellent
    } else if score >= 80.0 {
        PerformanceLevel::Advanced
    } else if score >= 65.0 {
        PerformanceLevel::Intermediate
    } else if score >= 50.0 {
        PerformanceLevel::Basic
    } else {
        PerformanceLevel::Insufficient
    }
}

/// Seconds used out of the budget when the session was submitted.
#[must_use]
pub fn elapsed_seconds(time_limit_seconds: u32, remaining_seconds_at_submit: u32) -> u32 {
    time_limit_seconds.saturating_sub(remaining_seconds_at_submit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Choice, Difficulty, Question, QuestionId};

    fn question(id: u64, correct: usize, domain: &str) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Q{id}"),
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            Choice::new(correct).unwrap(),
            Difficulty::Medium,
            domain,
        )
        .unwrap()
    }

    fn c(index: usize) -> Choice {
        Choice::new(index).unwrap()
    }

    fn round() -> Vec<Question> {
        vec![
            question(1, 0, "arrays"),
            question(2, 1, "arrays"),
            question(3, 2, "graphs"),
            question(4, 3, "graphs"),
            question(5, 0, "graphs"),
        ]
    }

    #[test]
    fn unanswered_questions_count_as_incorrect() {
        let questions = round();
        let key = AnswerKey::from_questions(&questions);
        let mut ledger = AnswerLedger::for_questions(&questions);
        ledger.record(QuestionId::new(1), c(0)).unwrap();
        ledger.record(QuestionId::new(2), c(3)).unwrap();

        let report = score(&ledger, &key);
        assert_eq!(report.correct_count, 1);
        assert_eq!(report.total_questions, 5);
        assert_eq!(report.incorrect_count(), 4);
        assert_eq!(report.display_score(), 20);
        assert_eq!(report.level, PerformanceLevel::Insufficient);
    }

    #[test]
    fn empty_ledger_scores_zero_without_error() {
        let questions = round();
        let report = score(
            &AnswerLedger::for_questions(&questions),
            &AnswerKey::from_questions(&questions),
        );
        assert_eq!(report.correct_count, 0);
        assert_eq!(report.display_score(), 0);
    }

    #[test]
    fn empty_key_scores_zero() {
        let report = score(&AnswerLedger::for_questions(&[]), &AnswerKey::default());
        assert_eq!(report.total_questions, 0);
        assert!(report.percentage.abs() < f64::EPSILON);
    }

    #[test]
    fn scoring_is_deterministic() {
        let questions = round();
        let key = AnswerKey::from_questions(&questions);
        let mut ledger = AnswerLedger::for_questions(&questions);
        ledger.record(QuestionId::new(3), c(2)).unwrap();
        ledger.record(QuestionId::new(5), c(1)).unwrap();

        let first = score(&ledger, &key);
        for _ in 0..10 {
            assert_eq!(score(&ledger, &key), first);
        }
    }

    #[test]
    fn domain_breakdown_groups_by_tag() {
        let questions = round();
        let key = AnswerKey::from_questions(&questions);
        let mut ledger = AnswerLedger::for_questions(&questions);
        ledger.record(QuestionId::new(1), c(0)).unwrap();
        ledger.record(QuestionId::new(3), c(2)).unwrap();
        ledger.record(QuestionId::new(4), c(3)).unwrap();

        let report = score(&ledger, &key);
        assert_eq!(
            report.domains,
            vec![
                DomainScore { domain: "arrays".into(), correct: 1, total: 2 },
                DomainScore { domain: "graphs".into(), correct: 2, total: 3 },
            ]
        );
    }

    #[test]
    fn level_boundaries_are_lower_inclusive() {
        assert_eq!(performance_level(90.0), PerformanceLevel::Excellent);
        assert_eq!(performance_level(89.999), PerformanceLevel::Advanced);
        assert_eq!(performance_level(80.0), PerformanceLevel::Advanced);
        assert_eq!(performance_level(79.99), PerformanceLevel::Intermediate);
        assert_eq!(performance_level(65.0), PerformanceLevel::Intermediate);
        assert_eq!(performance_level(64.9), PerformanceLevel::Basic);
        assert_eq!(performance_level(50.0), PerformanceLevel::Basic);
        assert_eq!(performance_level(49.99), PerformanceLevel::Insufficient);
        assert_eq!(performance_level(0.0), PerformanceLevel::Insufficient);
        assert_eq!(performance_level(100.0), PerformanceLevel::Excellent);
    }

    #[test]
    fn level_uses_exact_value_not_rounded_display() {
        // 8 of 9 is 88.89%, displayed as 89
        let pct = percentage(8, 9);
        assert_eq!(performance_level(pct), PerformanceLevel::Advanced);
        // 2 of 3 is 66.67%, displayed as 67
        assert_eq!(performance_level(percentage(2, 3)), PerformanceLevel::Intermediate);
    }

    #[test]
    fn elapsed_is_limit_minus_remaining() {
        assert_eq!(elapsed_seconds(600, 50), 550);
        assert_eq!(elapsed_seconds(600, 0), 600);
        assert_eq!(elapsed_seconds(10, 20), 0);
    }
}
