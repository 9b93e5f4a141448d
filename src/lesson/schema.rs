use serde_json::{json, Value};

/// Schema name sent alongside `json_schema` structured output requests.
pub const LESSON_SCHEMA_NAME: &str = "song_lesson";

fn string_list() -> Value {
    json!({ "type": "array", "items": { "type": "string" } })
}

/// Strict object: every property listed is required, nothing else allowed.
fn strict_object(properties: Value) -> Value {
    let required: Vec<Value> = properties
        .as_object()
        .map(|props| props.keys().cloned().map(Value::String).collect())
        .unwrap_or_default();
    json!({
        "type": "object",
        "additionalProperties": false,
        "properties": properties,
        "required": required,
    })
}

/// JSON Schema for a full SONG lesson, in the shape structured-output
/// endpoints accept with `strict: true`.
///
/// Minimum counts are not expressed here (strict mode rejects most
/// `minItems`); they are enforced by the normalizer instead.
pub fn lesson_schema() -> Value {
    let meta = strict_object(json!({
        "topic": { "type": "string" },
        "level": { "type": "string", "enum": ["beginner", "intermediate", "advanced"] },
        "locale": { "type": "string" },
        "duration_min": { "type": "integer" },
    }));

    let spark = strict_object(json!({
        "hook_story": { "type": "string" },
        "intuition": { "type": "string" },
        "visual_aid": { "type": "string" },
        "table": strict_object(json!({
            "columns": string_list(),
            "rows": { "type": "array", "items": string_list() },
        })),
        "real_world_examples": string_list(),
    }));

    let objectives = strict_object(json!({
        "goals": string_list(),
        "prerequisites": string_list(),
        "key_terms": string_list(),
        "checklist": string_list(),
    }));

    let nucleus = strict_object(json!({
        "core_explanation": { "type": "string" },
        "formulas": string_list(),
        "step_by_step": string_list(),
        "worked_example": strict_object(json!({
            "problem": { "type": "string" },
            "steps": string_list(),
            "answer": { "type": "string" },
        })),
        "misconceptions": {
            "type": "array",
            "items": strict_object(json!({
                "myth": { "type": "string" },
                "fix": { "type": "string" },
            })),
        },
    }));

    let generation = strict_object(json!({
        "practice_sets": {
            "type": "array",
            "items": strict_object(json!({
                "title": { "type": "string" },
                "items": {
                    "type": "array",
                    "items": strict_object(json!({
                        "q": { "type": "string" },
                        "expected": { "type": "string" },
                        "hint": { "type": "string" },
                    })),
                },
            })),
        },
        "summary": { "type": "string" },
        "spaced_retrieval": string_list(),
        "extensions": string_list(),
    }));

    strict_object(json!({
        "meta": meta,
        "S": spark,
        "O": objectives,
        "N": nucleus,
        "G": generation,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_strict(node: &Value, path: &str) {
        if node.get("type") == Some(&json!("object")) {
            assert_eq!(node["additionalProperties"], json!(false), "{}", path);
            let props = node["properties"].as_object().unwrap();
            let required = node["required"].as_array().unwrap();
            assert_eq!(props.len(), required.len(), "{}", path);
            for (key, child) in props {
                assert_strict(child, &format!("{}.{}", path, key));
            }
        }
        if let Some(items) = node.get("items") {
            assert_strict(items, &format!("{}[]", path));
        }
    }

    #[test]
    fn test_every_object_is_strict() {
        assert_strict(&lesson_schema(), "$");
    }

    #[test]
    fn test_top_level_sections() {
        let schema = lesson_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        for key in ["meta", "S", "O", "N", "G"] {
            assert!(required.contains(&key), "missing {}", key);
        }
    }

    #[test]
    fn test_fixture_matches_schema_keys() {
        let fixture: Value =
            serde_json::from_str(include_str!("../../tests/fixtures/valid_lesson.json")).unwrap();
        let schema = lesson_schema();
        for section in ["S", "N", "G"] {
            let props = schema["properties"][section]["properties"].as_object().unwrap();
            for key in fixture[section].as_object().unwrap().keys() {
                assert!(props.contains_key(key), "{}.{} not in schema", section, key);
            }
        }
    }
}
