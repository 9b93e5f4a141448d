use serde::{Deserialize, Serialize};
use std::fmt;

/// Learner level accepted by the compose endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        }
    }

    pub fn from_str_case(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "beginner" => Some(Level::Beginner),
            "intermediate" => Some(Level::Intermediate),
            "advanced" => Some(Level::Advanced),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonMeta {
    pub topic: String,
    pub level: Level,
    pub locale: String,
    pub duration_min: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// S: hook the learner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spark {
    pub hook_story: String,
    pub intuition: String,
    pub visual_aid: String,
    pub table: LessonTable,
    pub real_world_examples: Vec<String>,
}

/// O: what the learner should be able to do afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objectives {
    pub goals: Vec<String>,
    pub prerequisites: Vec<String>,
    pub key_terms: Vec<String>,
    pub checklist: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkedExample {
    pub problem: String,
    pub steps: Vec<String>,
    pub answer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Misconception {
    pub myth: String,
    pub fix: String,
}

/// N: the core explanation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nucleus {
    pub core_explanation: String,
    pub formulas: Vec<String>,
    pub step_by_step: Vec<String>,
    pub worked_example: WorkedExample,
    pub misconceptions: Vec<Misconception>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeItem {
    pub q: String,
    pub expected: String,
    pub hint: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeSet {
    pub title: String,
    pub items: Vec<PracticeItem>,
}

/// G: practice and retrieval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub practice_sets: Vec<PracticeSet>,
    pub summary: String,
    pub spaced_retrieval: Vec<String>,
    pub extensions: Vec<String>,
}

/// A lesson that passed coercion and the minimum-content checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedLesson {
    pub meta: LessonMeta,
    #[serde(rename = "S")]
    pub spark: Spark,
    #[serde(rename = "O")]
    pub objectives: Objectives,
    #[serde(rename = "N")]
    pub nucleus: Nucleus,
    #[serde(rename = "G")]
    pub generation: Generation,
}

/// Post-practice wrap-up produced by the summarize operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wrapup {
    pub recap: String,
    pub corrections: Vec<String>,
    #[serde(rename = "nextSteps")]
    pub next_steps: Vec<String>,
    #[serde(rename = "ttsPlainText")]
    pub tts_plain_text: String,
}
