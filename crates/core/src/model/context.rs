use serde::{Deserialize, Serialize};

use crate::model::ids::LearnerId;

/// Identity of the learner a service acts for.
///
/// Built once by the caller and handed to services at construction; nothing in the
/// engine looks up who the learner is on its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LearnerContext {
    learner_id: LearnerId,
}

impl LearnerContext {
    #[must_use]
    pub fn new(learner_id: LearnerId) -> Self {
        Self { learner_id }
    }

    #[must_use]
    pub fn learner_id(&self) -> LearnerId {
        self.learner_id
    }
}
