//! The confirmation boundary.
//!
//! Stage 6 hands every pending record to a [`Confirmer`] one at a time, in
//! fleet order, after all concurrent work of earlier stages has joined.

#[cfg(any(test, feature = "test-support"))]
use std::collections::HashMap;

use crate::classify::{Action, Status};

/// What the operator is asked about one pending record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmRequest {
    pub name: String,
    pub status: Status,
    pub action: Action,
    /// Porcelain working-tree summary; empty for a clean tree.
    pub summary: String,
}

impl ConfirmRequest {
    /// Whether a response must carry a commit message.
    pub fn needs_message(&self) -> bool {
        self.action.commits()
    }
}

/// The operator's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmResponse {
    pub proceed: bool,
    pub message: String,
}

impl ConfirmResponse {
    pub fn accept(message: impl Into<String>) -> Self {
        Self {
            proceed: true,
            message: message.into(),
        }
    }

    pub fn decline() -> Self {
        Self {
            proceed: false,
            message: String::new(),
        }
    }
}

/// Synchronous request/response responder.
pub trait Confirmer {
    fn confirm(&mut self, request: &ConfirmRequest) -> ConfirmResponse;
}

/// Commit message used when none is given.
pub fn default_message(name: &str) -> String {
    format!("gitfleet: sync {name}")
}

/// Accepts everything (`--yes`).
#[derive(Debug, Clone, Default)]
pub struct AutoConfirm {
    message: Option<String>,
}

impl AutoConfirm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `message` for every commit instead of the per-repository default.
    pub fn with_message(message: Option<String>) -> Self {
        Self { message }
    }
}

impl Confirmer for AutoConfirm {
    fn confirm(&mut self, request: &ConfirmRequest) -> ConfirmResponse {
        let message = self
            .message
            .clone()
            .unwrap_or_else(|| default_message(&request.name));
        ConfirmResponse::accept(message)
    }
}

/// Declines everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclineAll;

impl Confirmer for DeclineAll {
    fn confirm(&mut self, _request: &ConfirmRequest) -> ConfirmResponse {
        ConfirmResponse::decline()
    }
}

/// Canned per-name answers for tests. Unlisted names are declined. Every
/// request seen is kept for inspection.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Default)]
pub struct ScriptedConfirmer {
    answers: HashMap<String, ConfirmResponse>,
    seen: Vec<ConfirmRequest>,
}

#[cfg(any(test, feature = "test-support"))]
impl ScriptedConfirmer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, name: &str, response: ConfirmResponse) -> Self {
        self.answers.insert(name.to_string(), response);
        self
    }

    pub fn requests(&self) -> &[ConfirmRequest] {
        &self.seen
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Confirmer for ScriptedConfirmer {
    fn confirm(&mut self, request: &ConfirmRequest) -> ConfirmResponse {
        self.seen.push(request.clone());
        self.answers
            .get(&request.name)
            .cloned()
            .unwrap_or_else(ConfirmResponse::decline)
    }
}
