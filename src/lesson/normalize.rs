//! Map an arbitrary parsed value onto [`NormalizedLesson`].
//!
//! Coercion never fails: strings default to `""`, string lists drop anything
//! that is not a non-empty string, and missing sections become empty
//! defaults. Only after coercion are the minimum-content checks applied.

use serde_json::{Map, Value};
use thiserror::Error;

use super::model::{
    Generation, LessonMeta, LessonTable, Misconception, NormalizedLesson, Nucleus, Objectives,
    PracticeItem, PracticeSet, Spark, WorkedExample, Wrapup,
};

type Obj = Map<String, Value>;

pub const MIN_REAL_WORLD_EXAMPLES: usize = 2;
pub const MIN_STEP_BY_STEP: usize = 2;
pub const MIN_WORKED_STEPS: usize = 2;
pub const MIN_MISCONCEPTIONS: usize = 1;
pub const MIN_PRACTICE_SETS: usize = 1;
pub const MIN_SPACED_RETRIEVAL: usize = 1;

/// Upper bound for a model-supplied lesson duration, in minutes.
const MAX_DURATION_MIN: f64 = 240.0;

/// Keys some models use to wrap the whole lesson in one more object.
const ENVELOPE_KEYS: &[&str] = &["lesson", "song_plan", "songPlan", "data", "result"];
const SECTION_KEYS: &[&str] = &["S", "O", "N", "G"];

/// Which minimum-content rule a document broke.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Shortfall {
    #[error("lesson must be a JSON object")]
    NotAnObject,
    #[error("S.hook_story is empty")]
    HookStory,
    #[error("S.intuition is empty")]
    Intuition,
    #[error("S.real_world_examples needs at least {min} entries, found {found}")]
    RealWorldExamples { found: usize, min: usize },
    #[error("N.core_explanation is empty")]
    CoreExplanation,
    #[error("N.step_by_step needs at least {min} entries, found {found}")]
    StepByStep { found: usize, min: usize },
    #[error("N.worked_example.problem is empty")]
    WorkedProblem,
    #[error("N.worked_example.steps needs at least {min} entries, found {found}")]
    WorkedSteps { found: usize, min: usize },
    #[error("N.misconceptions needs at least {min} entry with both myth and fix, found {found}")]
    Misconceptions { found: usize, min: usize },
    #[error("G.practice_sets needs at least {min} set with a title and items, found {found}")]
    PracticeSets { found: usize, min: usize },
    #[error("G.summary is empty")]
    Summary,
    #[error("G.spaced_retrieval needs at least {min} entry, found {found}")]
    SpacedRetrieval { found: usize, min: usize },
    #[error("wrapup section is missing")]
    MissingWrapup,
    #[error("wrapup.recap is empty")]
    Recap,
}

// ─── coercion primitives ────────────────────────────────────────────────────

fn field<'a>(obj: Option<&'a Obj>, key: &str) -> Option<&'a Value> {
    obj.and_then(|o| o.get(key))
}

pub(crate) fn section<'a>(obj: Option<&'a Obj>, key: &str) -> Option<&'a Obj> {
    field(obj, key).and_then(Value::as_object)
}

/// String if it is one, else empty; trimmed.
pub(crate) fn text(obj: Option<&Obj>, key: &str) -> String {
    field(obj, key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn strings_of(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Array of non-empty trimmed strings, else empty.
pub(crate) fn text_list(obj: Option<&Obj>, key: &str) -> Vec<String> {
    strings_of(field(obj, key))
}

fn objects<'a>(obj: Option<&'a Obj>, key: &str) -> impl Iterator<Item = &'a Obj> {
    field(obj, key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

// ─── sections ───────────────────────────────────────────────────────────────

fn unwrap_envelope(root: &Obj) -> &Obj {
    if SECTION_KEYS.iter().any(|k| root.contains_key(*k)) {
        return root;
    }
    ENVELOPE_KEYS
        .iter()
        .filter_map(|k| root.get(*k).and_then(Value::as_object))
        .find(|inner| SECTION_KEYS.iter().any(|k| inner.contains_key(*k)))
        .unwrap_or(root)
}

fn coerce_meta(meta: Option<&Obj>, seed: &LessonMeta) -> LessonMeta {
    let duration_min = field(meta, "duration_min")
        .and_then(Value::as_f64)
        .filter(|d| d.is_finite() && *d >= 1.0 && *d <= MAX_DURATION_MIN)
        .map(|d| d.round() as u32)
        .unwrap_or(seed.duration_min);

    LessonMeta {
        topic: seed.topic.trim().to_string(),
        level: seed.level,
        locale: seed.locale.trim().to_string(),
        duration_min,
    }
}

fn coerce_table(table: Option<&Obj>) -> LessonTable {
    let rows = field(table, "rows")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .map(|row| strings_of(Some(row)))
                .filter(|cells| !cells.is_empty())
                .collect()
        })
        .unwrap_or_default();

    LessonTable {
        columns: text_list(table, "columns"),
        rows,
    }
}

fn coerce_spark(s: Option<&Obj>) -> Spark {
    Spark {
        hook_story: text(s, "hook_story"),
        intuition: text(s, "intuition"),
        visual_aid: text(s, "visual_aid"),
        table: coerce_table(section(s, "table")),
        real_world_examples: text_list(s, "real_world_examples"),
    }
}

fn coerce_objectives(o: Option<&Obj>) -> Objectives {
    Objectives {
        goals: text_list(o, "goals"),
        prerequisites: text_list(o, "prerequisites"),
        key_terms: text_list(o, "key_terms"),
        checklist: text_list(o, "checklist"),
    }
}

fn coerce_nucleus(n: Option<&Obj>) -> Nucleus {
    let worked = section(n, "worked_example");
    let misconceptions = objects(n, "misconceptions")
        .map(|m| Misconception {
            myth: text(Some(m), "myth"),
            fix: text(Some(m), "fix"),
        })
        .filter(|m| !m.myth.is_empty() && !m.fix.is_empty())
        .collect();

    Nucleus {
        core_explanation: text(n, "core_explanation"),
        formulas: text_list(n, "formulas"),
        step_by_step: text_list(n, "step_by_step"),
        worked_example: WorkedExample {
            problem: text(worked, "problem"),
            steps: text_list(worked, "steps"),
            answer: text(worked, "answer"),
        },
        misconceptions,
    }
}

fn coerce_practice_set(set: &Obj) -> Option<PracticeSet> {
    let title = text(Some(set), "title");
    let items: Vec<PracticeItem> = objects(Some(set), "items")
        .map(|item| PracticeItem {
            q: text(Some(item), "q"),
            expected: text(Some(item), "expected"),
            hint: text(Some(item), "hint"),
        })
        .filter(|item| !item.q.is_empty() && !item.expected.is_empty())
        .collect();

    if title.is_empty() || items.is_empty() {
        return None;
    }
    Some(PracticeSet { title, items })
}

fn coerce_generation(g: Option<&Obj>) -> Generation {
    Generation {
        practice_sets: objects(g, "practice_sets")
            .filter_map(coerce_practice_set)
            .collect(),
        summary: text(g, "summary"),
        spaced_retrieval: text_list(g, "spaced_retrieval"),
        extensions: text_list(g, "extensions"),
    }
}

fn at_least(found: usize, min: usize) -> bool {
    found >= min
}

fn check_minimums(lesson: &NormalizedLesson) -> Result<(), Shortfall> {
    let s = &lesson.spark;
    let n = &lesson.nucleus;
    let g = &lesson.generation;

    if s.hook_story.is_empty() {
        return Err(Shortfall::HookStory);
    }
    if s.intuition.is_empty() {
        return Err(Shortfall::Intuition);
    }
    if !at_least(s.real_world_examples.len(), MIN_REAL_WORLD_EXAMPLES) {
        return Err(Shortfall::RealWorldExamples {
            found: s.real_world_examples.len(),
            min: MIN_REAL_WORLD_EXAMPLES,
        });
    }
    if n.core_explanation.is_empty() {
        return Err(Shortfall::CoreExplanation);
    }
    if !at_least(n.step_by_step.len(), MIN_STEP_BY_STEP) {
        return Err(Shortfall::StepByStep {
            found: n.step_by_step.len(),
            min: MIN_STEP_BY_STEP,
        });
    }
    if n.worked_example.problem.is_empty() {
        return Err(Shortfall::WorkedProblem);
    }
    if !at_least(n.worked_example.steps.len(), MIN_WORKED_STEPS) {
        return Err(Shortfall::WorkedSteps {
            found: n.worked_example.steps.len(),
            min: MIN_WORKED_STEPS,
        });
    }
    if !at_least(n.misconceptions.len(), MIN_MISCONCEPTIONS) {
        return Err(Shortfall::Misconceptions {
            found: n.misconceptions.len(),
            min: MIN_MISCONCEPTIONS,
        });
    }
    // Sets without items were already dropped during coercion.
    if !at_least(g.practice_sets.len(), MIN_PRACTICE_SETS) {
        return Err(Shortfall::PracticeSets {
            found: g.practice_sets.len(),
            min: MIN_PRACTICE_SETS,
        });
    }
    if g.summary.is_empty() {
        return Err(Shortfall::Summary);
    }
    if !at_least(g.spaced_retrieval.len(), MIN_SPACED_RETRIEVAL) {
        return Err(Shortfall::SpacedRetrieval {
            found: g.spaced_retrieval.len(),
            min: MIN_SPACED_RETRIEVAL,
        });
    }
    Ok(())
}

/// Coerce `value` into a lesson, then enforce the minimum-content rules.
///
/// `seed` supplies the request-derived `topic`, `level` and `locale`; its
/// `duration_min` is the fallback when the model gives no usable number.
pub fn normalize_lesson(value: &Value, seed: &LessonMeta) -> Result<NormalizedLesson, Shortfall> {
    let root = value.as_object().ok_or(Shortfall::NotAnObject)?;
    let root = unwrap_envelope(root);
    let root = Some(root);

    let lesson = NormalizedLesson {
        meta: coerce_meta(section(root, "meta"), seed),
        spark: coerce_spark(section(root, "S")),
        objectives: coerce_objectives(section(root, "O")),
        nucleus: coerce_nucleus(section(root, "N")),
        generation: coerce_generation(section(root, "G")),
    };

    check_minimums(&lesson)?;
    Ok(lesson)
}

/// Coerce a summarize reply (`{"wrapup": {...}}` or the bare wrap-up object).
pub fn normalize_wrapup(value: &Value) -> Result<Wrapup, Shortfall> {
    let root = value.as_object().ok_or(Shortfall::MissingWrapup)?;
    let wrapup = match root.get("wrapup") {
        Some(inner) => inner.as_object().ok_or(Shortfall::MissingWrapup)?,
        None if root.contains_key("recap") => root,
        None => return Err(Shortfall::MissingWrapup),
    };
    let w = Some(wrapup);

    let out = Wrapup {
        recap: text(w, "recap"),
        corrections: text_list(w, "corrections"),
        next_steps: text_list(w, "nextSteps"),
        tts_plain_text: text(w, "ttsPlainText"),
    };
    if out.recap.is_empty() {
        return Err(Shortfall::Recap);
    }
    Ok(out)
}
