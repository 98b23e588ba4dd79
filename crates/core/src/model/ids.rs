use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Highest round number a department can define.
pub const MAX_ROUNDS: u8 = 10;

/// Unique identifier for a Question
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuestionId(u64);

impl QuestionId {
    /// Creates a new `QuestionId`
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying u64 value
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Identifier of the learner a session belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LearnerId(u64);

impl LearnerId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Identifier of a single attempt at a round.
///
/// The backend treats it as the idempotency key for submissions.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh random session id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

/// Position of a round inside a department's sequence, always in `1..=MAX_ROUNDS`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RoundNumber(u8);

impl RoundNumber {
    pub const FIRST: RoundNumber = RoundNumber(1);

    /// Creates a round number.
    ///
    /// # Errors
    ///
    /// Returns `IdError::RoundOutOfRange` unless `1 <= value <= MAX_ROUNDS`.
    pub fn new(value: u8) -> Result<Self, IdError> {
        if (1..=MAX_ROUNDS).contains(&value) {
            Ok(Self(value))
        } else {
            Err(IdError::RoundOutOfRange { value })
        }
    }

    #[must_use]
    pub fn value(&self) -> u8 {
        self.0
    }

    /// The following round, or `None` past `MAX_ROUNDS`.
    #[must_use]
    pub fn next(&self) -> Option<Self> {
        Self::new(self.0 + 1).ok()
    }
}

impl TryFrom<u8> for RoundNumber {
    type Error = IdError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RoundNumber> for u8 {
    fn from(value: RoundNumber) -> Self {
        value.0
    }
}

/// Department name that owns a sequence of rounds.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Department(String);

impl Department {
    /// Creates a department from a display name, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `IdError::EmptyDepartment` when the trimmed name is empty.
    pub fn new(name: impl Into<String>) -> Result<Self, IdError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(IdError::EmptyDepartment);
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Department {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Department> for String {
    fn from(value: Department) -> Self {
        value.0
    }
}

// ─── Errors ────────────────────────────────────────────────────────────────────

/// Error type for building or parsing identifiers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IdError {
    #[error("round number must be between 1 and {MAX_ROUNDS}, got {value}")]
    RoundOutOfRange { value: u8 },

    #[error("department name cannot be empty")]
    EmptyDepartment,

    #[error("failed to parse {kind} from string")]
    Parse { kind: &'static str },
}

// ─── Debug / Display ───────────────────────────────────────────────────────────

impl fmt::Debug for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuestionId({})", self.0)
    }
}

impl fmt::Debug for LearnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LearnerId({})", self.0)
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Debug for RoundNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Round({})", self.0)
    }
}

impl fmt::Debug for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Department({:?})", self.0)
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LearnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RoundNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── FromStr ───────────────────────────────────────────────────────────────────

impl FromStr for QuestionId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(QuestionId::new)
            .map_err(|_| IdError::Parse { kind: "QuestionId" })
    }
}

impl FromStr for LearnerId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(LearnerId::new)
            .map_err(|_| IdError::Parse { kind: "LearnerId" })
    }
}

impl FromStr for SessionId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(SessionId::from_uuid)
            .map_err(|_| IdError::Parse { kind: "SessionId" })
    }
}

impl FromStr for RoundNumber {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s
            .parse::<u8>()
            .map_err(|_| IdError::Parse { kind: "RoundNumber" })?;
        RoundNumber::new(raw)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_number_rejects_zero_and_eleven() {
        assert_eq!(
            RoundNumber::new(0),
            Err(IdError::RoundOutOfRange { value: 0 })
        );
        assert!(RoundNumber::new(11).is_err());
        assert_eq!(RoundNumber::new(10).unwrap().value(), 10);
    }

    #[test]
    fn round_number_next_stops_at_max() {
        let nine = RoundNumber::new(9).unwrap();
        assert_eq!(nine.next(), Some(RoundNumber::new(10).unwrap()));
        assert_eq!(RoundNumber::new(10).unwrap().next(), None);
    }

    #[test]
    fn round_number_from_str_validates_range() {
        let parsed: RoundNumber = "3".parse().unwrap();
        assert_eq!(parsed.value(), 3);
        assert!("12".parse::<RoundNumber>().is_err());
        assert!("x".parse::<RoundNumber>().is_err());
    }

    #[test]
    fn department_trims_and_rejects_blank() {
        let dept = Department::new("  Computer Science ").unwrap();
        assert_eq!(dept.as_str(), "Computer Science");
        assert_eq!(Department::new("   "), Err(IdError::EmptyDepartment));
    }

    #[test]
    fn session_id_parses_its_display_form() {
        let id = SessionId::generate();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn round_number_deserialize_rejects_out_of_range() {
        let err = serde_json::from_str::<RoundNumber>("0");
        assert!(err.is_err());
        let ok: RoundNumber = serde_json::from_str("4").unwrap();
        assert_eq!(ok.value(), 4);
    }

    #[test]
    fn question_id_display() {
        assert_eq!(QuestionId::new(42).to_string(), "42");
    }
}
