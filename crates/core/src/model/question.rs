use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionId;

/// Upper bound on the option set of a single question.
pub const MAX_OPTIONS: usize = 8;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question {id} has empty content")]
    EmptyContent { id: QuestionId },

    #[error("question {id} must offer between 2 and {MAX_OPTIONS} options, got {count}")]
    InvalidOptionCount { id: QuestionId, count: usize },

    #[error("question {id} marks option {choice} as correct but only has {count} options")]
    CorrectChoiceOutOfRange {
        id: QuestionId,
        choice: Choice,
        count: usize,
    },

    #[error("choice index {0} exceeds the {MAX_OPTIONS}-option limit")]
    InvalidChoice(usize),

    #[error("invalid choice label: {0:?}")]
    InvalidChoiceLabel(String),

    #[error("confidence level must be between 1 and 5, got {0}")]
    InvalidConfidence(u8),
}

//
// ─── CHOICE ────────────────────────────────────────────────────────────────────
//

/// Zero-based index into a question's option set.
///
/// Rendered and parsed as a letter (`A`, `B`, ...).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Choice(u8);

impl Choice {
    /// # Errors
    ///
    /// Returns `QuestionError::InvalidChoice` when `index >= MAX_OPTIONS`.
    pub fn new(index: usize) -> Result<Self, QuestionError> {
        if index < MAX_OPTIONS {
            // MAX_OPTIONS fits in u8
            #[allow(clippy::cast_possible_truncation)]
            Ok(Self(index as u8))
        } else {
            Err(QuestionError::InvalidChoice(index))
        }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        usize::from(self.0)
    }

    #[must_use]
    pub fn label(&self) -> char {
        char::from(b'A' + self.0)
    }
}

impl TryFrom<u8> for Choice {
    type Error = QuestionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(usize::from(value))
    }
}

impl From<Choice> for u8 {
    fn from(value: Choice) -> Self {
        value.0
    }
}

impl fmt::Debug for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Choice({})", self.label())
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Choice {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => {
                let offset = c.to_ascii_uppercase() as usize - 'A' as usize;
                Choice::new(offset).map_err(|_| QuestionError::InvalidChoiceLabel(trimmed.into()))
            }
            _ => Err(QuestionError::InvalidChoiceLabel(trimmed.into())),
        }
    }
}

//
// ─── TAGS ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Self-reported confidence in an answer, 1 (guess) to 5 (certain).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Confidence(u8);

impl Confidence {
    /// # Errors
    ///
    /// Returns `QuestionError::InvalidConfidence` outside `1..=5`.
    pub fn new(level: u8) -> Result<Self, QuestionError> {
        if (1..=5).contains(&level) {
            Ok(Self(level))
        } else {
            Err(QuestionError::InvalidConfidence(level))
        }
    }

    #[must_use]
    pub fn level(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Confidence {
    type Error = QuestionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Confidence> for u8 {
    fn from(value: Confidence) -> Self {
        value.0
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A multiple-choice question as delivered with a round's test data.
///
/// The correct choice travels with the question; the session splits it off into an
/// [`AnswerKey`] so that only scoring ever looks at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuestionRepr")]
pub struct Question {
    id: QuestionId,
    content: String,
    options: Vec<String>,
    correct: Choice,
    difficulty: Difficulty,
    domain: String,
}

/// Wire shape of [`Question`]; deserialisation goes through [`Question::new`].
#[derive(Deserialize)]
struct QuestionRepr {
    id: QuestionId,
    content: String,
    options: Vec<String>,
    correct: Choice,
    difficulty: Difficulty,
    #[serde(default)]
    domain: String,
}

impl TryFrom<QuestionRepr> for Question {
    type Error = QuestionError;

    fn try_from(repr: QuestionRepr) -> Result<Self, Self::Error> {
        Self::new(
            repr.id,
            repr.content,
            repr.options,
            repr.correct,
            repr.difficulty,
            repr.domain,
        )
    }
}

impl Question {
    /// # Errors
    ///
    /// Returns `QuestionError` when content is blank, the option count is outside
    /// `2..=MAX_OPTIONS`, or the correct choice does not name an option.
    pub fn new(
        id: QuestionId,
        content: impl Into<String>,
        options: Vec<String>,
        correct: Choice,
        difficulty: Difficulty,
        domain: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(QuestionError::EmptyContent { id });
        }
        if options.len() < 2 || options.len() > MAX_OPTIONS {
            return Err(QuestionError::InvalidOptionCount {
                id,
                count: options.len(),
            });
        }
        if correct.index() >= options.len() {
            return Err(QuestionError::CorrectChoiceOutOfRange {
                id,
                choice: correct,
                count: options.len(),
            });
        }

        Ok(Self {
            id,
            content,
            options,
            correct,
            difficulty,
            domain: domain.into().trim().to_owned(),
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn correct(&self) -> Choice {
        self.correct
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

//
// ─── ANSWER KEY ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEntry {
    pub correct: Choice,
    pub domain: String,
}

/// Correct choice (and domain tag) for every question of a round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerKey {
    entries: BTreeMap<QuestionId, KeyEntry>,
}

impl AnswerKey {
    #[must_use]
    pub fn from_questions(questions: &[Question]) -> Self {
        let entries = questions
            .iter()
            .map(|q| {
                (
                    q.id(),
                    KeyEntry {
                        correct: q.correct(),
                        domain: q.domain().to_owned(),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    #[must_use]
    pub fn correct_choice(&self, id: QuestionId) -> Option<Choice> {
        self.entries.get(&id).map(|e| e.correct)
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuestionId, &KeyEntry)> {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
