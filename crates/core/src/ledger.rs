//! In-memory record of the answers given during one session.

use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::model::{Answer, Choice, Confidence, Question, QuestionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LedgerError {
    #[error("question {0} is not part of the active round")]
    UnknownQuestion(QuestionId),

    #[error("choice {choice} is outside the {options} options of question {id}")]
    ChoiceOutOfRange {
        id: QuestionId,
        choice: Choice,
        options: usize,
    },
}

/// Answers recorded for the active round.
///
/// Keys are always a subset of the round's question ids; anything else is rejected
/// at the boundary. Whether a choice is *correct* is not this type's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerLedger {
    /// Question ids in round order with their option count.
    questions: Vec<(QuestionId, usize)>,
    answers: BTreeMap<QuestionId, Answer>,
}

/// Answered / total counts for the active round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completeness {
    pub answered: usize,
    pub total: usize,
}

impl Completeness {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.answered == self.total
    }
}

impl AnswerLedger {
    #[must_use]
    pub fn for_questions(questions: &[Question]) -> Self {
        Self {
            questions: questions
                .iter()
                .map(|q| (q.id(), q.option_count()))
                .collect(),
            answers: BTreeMap::new(),
        }
    }

    /// Upsert `choice` for `question_id`.
    ///
    /// Recording the same choice again keeps the existing entry untouched; a
    /// different choice replaces it.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` for an unknown question or an out-of-range choice.
    pub fn record(&mut self, question_id: QuestionId, choice: Choice) -> Result<bool, LedgerError> {
        self.check(question_id, choice)?;
        if self
            .answers
            .get(&question_id)
            .is_some_and(|a| a.selected_choice == choice)
        {
            return Ok(false);
        }
        self.answers
            .insert(question_id, Answer::new(question_id, choice));
        Ok(true)
    }

    /// Upsert a full answer including time spent and confidence.
    ///
    /// Returns whether the ledger changed.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` for an unknown question or an out-of-range choice.
    pub fn record_answer(&mut self, answer: Answer) -> Result<bool, LedgerError> {
        self.check(answer.question_id, answer.selected_choice)?;
        if self.answers.get(&answer.question_id) == Some(&answer) {
            return Ok(false);
        }
        self.answers.insert(answer.question_id, answer);
        Ok(true)
    }

    /// Attach a confidence level to an already recorded answer.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UnknownQuestion` if nothing is recorded for `question_id`.
    pub fn set_confidence(
        &mut self,
        question_id: QuestionId,
        confidence: Confidence,
    ) -> Result<(), LedgerError> {
        let answer = self
            .answers
            .get_mut(&question_id)
            .ok_or(LedgerError::UnknownQuestion(question_id))?;
        answer.confidence_level = Some(confidence);
        Ok(())
    }

    fn check(&self, question_id: QuestionId, choice: Choice) -> Result<(), LedgerError> {
        let (_, options) = self
            .questions
            .iter()
            .find(|(id, _)| *id == question_id)
            .ok_or(LedgerError::UnknownQuestion(question_id))?;
        if choice.index() >= *options {
            return Err(LedgerError::ChoiceOutOfRange {
                id: question_id,
                choice,
                options: *options,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn completeness(&self) -> Completeness {
        Completeness {
            answered: self.answers.len(),
            total: self.questions.len(),
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completeness().is_complete()
    }

    /// Round question ids with no recorded answer.
    #[must_use]
    pub fn unanswered(&self) -> BTreeSet<QuestionId> {
        self.questions
            .iter()
            .map(|(id, _)| *id)
            .filter(|id| !self.answers.contains_key(id))
            .collect()
    }

    #[must_use]
    pub fn get(&self, question_id: QuestionId) -> Option<&Answer> {
        self.answers.get(&question_id)
    }

    #[must_use]
    pub fn choice_for(&self, question_id: QuestionId) -> Option<Choice> {
        self.answers.get(&question_id).map(|a| a.selected_choice)
    }

    /// Recorded answers in round order.
    pub fn answers(&self) -> impl Iterator<Item = &Answer> {
        self.questions
            .iter()
            .filter_map(|(id, _)| self.answers.get(id))
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }
}
