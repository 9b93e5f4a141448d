//! The SONG lesson document: typed model, strict output schema, normalizer.

mod model;
mod normalize;
mod schema;

pub use model::{
    Generation, Level, LessonMeta, LessonTable, Misconception, NormalizedLesson, Nucleus,
    Objectives, PracticeItem, PracticeSet, Spark, WorkedExample, Wrapup,
};
pub use normalize::{normalize_lesson, normalize_wrapup, Shortfall};
pub use schema::{lesson_schema, LESSON_SCHEMA_NAME};
