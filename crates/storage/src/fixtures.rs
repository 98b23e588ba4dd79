//! JSON catalog fixtures used to seed the in-memory backend.
//!
//! ```json
//! { "departments": [ { "name": "Computer Science", "rounds": [ {
//!     "round_number": 1, "focus_area": "Foundations", "time_limit_seconds": 600,
//!     "questions": [ { "id": 1, "content": "2 + 2?", "options": ["3", "4"],
//!                      "correct": "B", "difficulty": "easy", "domain": "arithmetic" } ]
//! } ] } ] }
//! ```

use diagnosis_core::model::{
    Choice, Department, Difficulty, Question, QuestionId, RoundData, RoundNumber,
};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::memory::InMemoryRepository;
use crate::repository::StorageError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FixtureError {
    #[error("failed to read fixture: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid fixture JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid fixture content: {0}")]
    Domain(#[from] diagnosis_core::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFixture {
    pub departments: Vec<DepartmentFixture>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DepartmentFixture {
    pub name: String,
    pub rounds: Vec<RoundFixture>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoundFixture {
    pub round_number: u8,
    pub focus_area: String,
    pub time_limit_seconds: u32,
    pub questions: Vec<QuestionFixture>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuestionFixture {
    pub id: u64,
    pub content: String,
    pub options: Vec<String>,
    /// Option label, `"A"` for the first option.
    pub correct: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub domain: String,
}

impl QuestionFixture {
    fn into_question(self) -> Result<Question, diagnosis_core::Error> {
        let correct: Choice = self.correct.parse()?;
        Ok(Question::new(
            QuestionId::new(self.id),
            self.content,
            self.options,
            correct,
            self.difficulty,
            self.domain,
        )?)
    }
}

impl RoundFixture {
    fn into_round_data(self) -> Result<RoundData, diagnosis_core::Error> {
        let questions = self
            .questions
            .into_iter()
            .map(QuestionFixture::into_question)
            .collect::<Result<Vec<_>, _>>()?;
        let data = RoundData {
            round_number: RoundNumber::new(self.round_number)?,
            focus_area: self.focus_area,
            time_limit_seconds: self.time_limit_seconds,
            questions,
        };
        data.validate()?;
        Ok(data)
    }
}

impl CatalogFixture {
    /// # Errors
    ///
    /// Returns `FixtureError::Json` for malformed input.
    pub fn from_json(raw: &str) -> Result<Self, FixtureError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// # Errors
    ///
    /// Returns `FixtureError::Io` if the file cannot be read, or `FixtureError::Json`.
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Validate every department and round and load them into `repo`.
    ///
    /// Returns the number of rounds loaded.
    ///
    /// # Errors
    ///
    /// Returns `FixtureError::Domain` for invalid names, rounds or questions, and
    /// `FixtureError::Storage` when a department's round numbers have gaps.
    pub fn seed(self, repo: &InMemoryRepository) -> Result<usize, FixtureError> {
        let mut loaded = 0;
        for department in self.departments {
            let name = Department::new(department.name).map_err(diagnosis_core::Error::from)?;
            for round in department.rounds {
                repo.upsert_round(&name, round.into_round_data()?)?;
                loaded += 1;
            }
            let rounds = repo.round_count(&name)?;
            tracing::debug!(department = %name, rounds, "seeded department catalog");
        }
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RoundDataRepository;
    use diagnosis_core::model::{LearnerContext, LearnerId};

    const SAMPLE: &str = r#"{
        "departments": [{
            "name": "Computer Science",
            "rounds": [{
                "round_number": 1,
                "focus_area": "Foundations",
                "time_limit_seconds": 600,
                "questions": [
                    { "id": 1, "content": "2 + 2?", "options": ["3", "4"], "correct": "B",
                      "difficulty": "easy", "domain": "arithmetic" }
                ]
            }]
        }]
    }"#;

    #[tokio::test]
    async fn seeds_repository_from_json() {
        let repo = InMemoryRepository::new();
        let loaded = CatalogFixture::from_json(SAMPLE).unwrap().seed(&repo).unwrap();
        assert_eq!(loaded, 1);

        let dept = Department::new("Computer Science").unwrap();
        let data = repo
            .get_round_data(
                &LearnerContext::new(LearnerId::new(1)),
                &dept,
                RoundNumber::FIRST,
            )
            .await
            .unwrap();
        assert_eq!(data.questions[0].correct().index(), 1);
    }

    #[test]
    fn rejects_round_number_out_of_range() {
        let raw = SAMPLE.replace("\"round_number\": 1", "\"round_number\": 11");
        let err = CatalogFixture::from_json(&raw)
            .unwrap()
            .seed(&InMemoryRepository::new())
            .unwrap_err();
        assert!(matches!(err, FixtureError::Domain(_)));
    }

    #[test]
    fn rejects_correct_label_outside_options() {
        let raw = SAMPLE.replace("\"correct\": \"B\"", "\"correct\": \"C\"");
        let err = CatalogFixture::from_json(&raw)
            .unwrap()
            .seed(&InMemoryRepository::new())
            .unwrap_err();
        assert!(matches!(err, FixtureError::Domain(_)));
    }

    #[test]
    fn rejects_department_with_missing_round() {
        let mut value: serde_json::Value = serde_json::from_str(SAMPLE).unwrap();
        let mut third = value["departments"][0]["rounds"][0].clone();
        third["round_number"] = serde_json::json!(3);
        third["questions"][0]["id"] = serde_json::json!(2);
        value["departments"][0]["rounds"]
            .as_array_mut()
            .unwrap()
            .push(third);

        let err = CatalogFixture::from_json(&value.to_string())
            .unwrap()
            .seed(&InMemoryRepository::new())
            .unwrap_err();
        assert!(matches!(err, FixtureError::Storage(StorageError::InvalidData(_))));
    }
}
