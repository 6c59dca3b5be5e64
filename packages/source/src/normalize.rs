//! Maps raw tracker issues into [`NormalizedRecord`]s.
//!
//! Pure and deterministic. Absent or null nested objects (an unassigned
//! issue, a project without a priority scheme) map to `None` or empty
//! values instead of failing.

use issue_scraper_source_models::{DerivedTasks, NormalizedRecord, RecordContent, RecordMetadata};
use serde_json::Value;

/// Normalizes one raw issue together with its comment bodies.
#[must_use]
pub fn normalize_issue(issue: &Value, comments: Vec<String>) -> NormalizedRecord {
    let fields = issue.get("fields").unwrap_or(&Value::Null);

    let key = scalar_string(issue.get("key"));
    let description = fields
        .get("description")
        .and_then(Value::as_str)
        .filter(|d| !d.is_empty())
        .map(str::to_owned);

    let labels = fields
        .get("labels")
        .and_then(Value::as_array)
        .map(|labels| {
            labels
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();

    let derived_tasks = DerivedTasks::for_issue(key.as_deref(), description.as_deref());

    NormalizedRecord {
        metadata: RecordMetadata {
            id: scalar_string(issue.get("id")),
            key,
            title: scalar_string(fields.get("summary")),
            project: nested_string(fields, "project", "key"),
            status: nested_string(fields, "status", "name"),
            priority: nested_string(fields, "priority", "name"),
            reporter: nested_string(fields, "reporter", "displayName"),
            assignee: nested_string(fields, "assignee", "displayName"),
            labels,
            created: scalar_string(fields.get("created")),
            updated: scalar_string(fields.get("updated")),
        },
        content: RecordContent {
            description: description.unwrap_or_default(),
            comments,
        },
        derived_tasks,
    }
}

/// Reads `fields[object][field]` as a string.
fn nested_string(fields: &Value, object: &str, field: &str) -> Option<String> {
    scalar_string(fields.get(object)?.get(field))
}

/// Reads a string or number as a string. Ids arrive as either.
fn scalar_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
