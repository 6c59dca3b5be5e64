#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The canonical normalized issue record format.
//!
//! Every issue pulled from the tracker is mapped into a [`NormalizedRecord`]
//! and appended to the dataset as one JSON object per line. Records are
//! immutable once written.

use serde::{Deserialize, Serialize};

/// Prompt attached to every record asking for a summary of the discussion.
pub const SUMMARIZATION_PROMPT: &str = "Summarize the issue and its discussion.";

/// Prompt attached to every record asking for an issue-type label.
pub const CLASSIFICATION_PROMPT: &str = "Classify the issue as bug, improvement, or feature.";

/// Answer used for the Q&A task when the issue has no description.
pub const MISSING_DESCRIPTION_ANSWER: &str = "No description available.";

/// An issue normalized to the canonical output schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Identity, people, labels and timestamps.
    pub metadata: RecordMetadata,
    /// Description and discussion.
    pub content: RecordContent,
    /// Fixed-shape prompts derived from the metadata and content.
    pub derived_tasks: DerivedTasks,
}

/// Identity and bookkeeping fields of an issue.
///
/// Every field is optional because the tracker omits nested objects for
/// unset values (e.g. an unassigned issue has no `assignee`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Tracker-internal numeric identifier.
    pub id: Option<String>,
    /// Human-facing issue key (e.g. `"KAFKA-1234"`).
    pub key: Option<String>,
    /// Issue summary line.
    pub title: Option<String>,
    /// Key of the owning project.
    pub project: Option<String>,
    /// Workflow status name (e.g. `"Resolved"`).
    pub status: Option<String>,
    /// Priority name (e.g. `"Major"`).
    pub priority: Option<String>,
    /// Display name of the reporter.
    pub reporter: Option<String>,
    /// Display name of the assignee.
    pub assignee: Option<String>,
    /// Labels attached to the issue.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Creation timestamp as reported by the tracker (ISO 8601).
    pub created: Option<String>,
    /// Last-update timestamp as reported by the tracker (ISO 8601).
    pub updated: Option<String>,
}

/// Free-text content of an issue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordContent {
    /// Issue description, empty when the tracker has none.
    #[serde(default)]
    pub description: String,
    /// Comment bodies in discussion order.
    #[serde(default)]
    pub comments: Vec<String>,
}

/// Training prompts derived from an issue without any remote calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedTasks {
    /// Summarization instruction.
    pub summarization: String,
    /// Classification instruction.
    pub classification: String,
    /// Question/answer pair about the issue.
    pub qna: QnaTask,
}

/// A single question with its reference answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QnaTask {
    /// The question text.
    pub question: String,
    /// The reference answer.
    pub answer: String,
}

impl DerivedTasks {
    /// Builds the fixed task set for an issue key and its description.
    #[must_use]
    pub fn for_issue(key: Option<&str>, description: Option<&str>) -> Self {
        Self {
            summarization: SUMMARIZATION_PROMPT.to_owned(),
            classification: CLASSIFICATION_PROMPT.to_owned(),
            qna: QnaTask {
                question: format!(
                    "What is the main problem discussed in issue {}?",
                    key.unwrap_or_default()
                ),
                answer: description
                    .filter(|d| !d.is_empty())
                    .unwrap_or(MISSING_DESCRIPTION_ANSWER)
                    .to_owned(),
            },
        }
    }
}
