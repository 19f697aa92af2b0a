//! Core data models used throughout AiTa.
//!
//! These types represent the requests, answers, and audit rows that flow
//! through the answer gate and the HTTP surface.

use serde::{Deserialize, Serialize};

/// Teacher whose documents and audit log are used when a request names none.
pub const DEFAULT_TEACHER_ID: &str = "engineering";

fn default_teacher_id() -> String {
    DEFAULT_TEACHER_ID.to_string()
}

/// Who is asking. Only the literal `"sub"` selects the substitute path;
/// any other value is handled as a student question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum Mode {
    #[default]
    Student,
    Sub,
}

impl From<String> for Mode {
    fn from(value: String) -> Self {
        Mode::from(value.as_str())
    }
}

impl From<&str> for Mode {
    fn from(value: &str) -> Self {
        match value {
            "sub" => Mode::Sub,
            _ => Mode::Student,
        }
    }
}

/// Body of `POST /ask`.
#[derive(Debug, Clone, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default = "default_teacher_id")]
    pub teacher_id: String,
    #[serde(default)]
    pub mode: Mode,
}

impl AskRequest {
    pub fn student(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            teacher_id: default_teacher_id(),
            mode: Mode::Student,
        }
    }
}

/// Body returned by `POST /ask`.
#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    pub answer: String,
}

/// Why a question was answered with the fallback text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeflectReason {
    BlockedByPolicy,
    NoContext,
    GenerationError,
    ModelUncertain,
}

impl DeflectReason {
    /// Reason code written to the audit log.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeflectReason::BlockedByPolicy => "blocked_by_policy",
            DeflectReason::NoContext => "no_context",
            DeflectReason::GenerationError => "generation_error",
            DeflectReason::ModelUncertain => "model_uncertain",
        }
    }
}

impl std::fmt::Display for DeflectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running one question through the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOutcome {
    pub answer: String,
    /// `Some` when the answer is the fallback text.
    pub deflection: Option<DeflectReason>,
}

impl GateOutcome {
    pub fn answered(answer: String) -> Self {
        Self {
            answer,
            deflection: None,
        }
    }

    pub fn deflected(fallback: &str, reason: DeflectReason) -> Self {
        Self {
            answer: fallback.to_string(),
            deflection: Some(reason),
        }
    }
}

/// One document exposed by the corpus loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusDocument {
    pub id: String,
    pub text: String,
}

/// Contents of a teacher's audit log, header row split from the data rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}
