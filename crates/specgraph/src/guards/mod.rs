//! Workflow guard evaluation.
//!
//! A [`Guard`] is a named pure function over a [`GuardContext`]. Guards are
//! grouped into sets per operation ([`GuardSet`]) and folded by [`Runner`]
//! into an [`Outcome`]. Every guard in a set is evaluated; there is no
//! short-circuit, so callers always see the full list of findings.
//!
//! # Severity
//!
//! | Severity | Effect when failed |
//! |---|---|
//! | `Suggestion` | advisory only |
//! | `Warning` | advisory only |
//! | `SoftBlock` | blocks unless the context carries `force` |
//! | `HardBlock` | always blocks |
//!
//! Guards never perform I/O. The context is populated beforehand (see
//! [`crate::populate`]) and is read-only during evaluation.
//!
//! # Example
//!
//! ```
//! use specgraph::guards::{GuardContext, GuardSet, Runner};
//!
//! let context = GuardContext {
//!     change_name: "Not Kebab".to_string(),
//!     has_constitution: true,
//!     has_patterns: true,
//!     ..GuardContext::default()
//! };
//!
//! let outcome = Runner::run(&context, GuardSet::NewChange.guards());
//! assert!(outcome.blocked);
//! assert_eq!(outcome.hard_blocks()[0].guard_name, "kebab_case_name");
//! ```

mod checks;

pub use checks::{
    ARTIFACT_COMPLETENESS, COMPONENT_DISCOVERY, CONSTITUTION_REQUIRED, CONTEXT_DISCOVERY,
    DESIGN_BEFORE_TASKS, KEBAB_CASE_NAME, PATTERNS_SEEDED, PROPOSAL_BEFORE_SPEC,
    SINGLETON_ARTIFACT, SPEC_BEFORE_DESIGN, TASK_COMPLETION, is_kebab_case,
};

use crate::domain::{ArtifactKind, ObjectId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write as _;
use tracing::debug;

/// How serious a failed guard is.
///
/// Variants are ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Nice to have
    Suggestion,
    /// Worth a look
    Warning,
    /// Blocks unless forced
    SoftBlock,
    /// Always blocks
    HardBlock,
}

impl Severity {
    /// The serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Suggestion => "SUGGESTION",
            Severity::Warning => "WARNING",
            Severity::SoftBlock => "SOFT_BLOCK",
            Severity::HardBlock => "HARD_BLOCK",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Finding of a single guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardResult {
    /// Name of the guard that produced this result
    pub guard_name: String,
    /// Whether the check passed
    pub passed: bool,
    /// Severity the guard assigns to a failure
    pub severity: Severity,
    /// What the check found
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// How to resolve a failure
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remedy: String,
}

impl GuardResult {
    /// A passing result.
    pub fn pass(guard_name: &str, severity: Severity) -> Self {
        Self {
            guard_name: guard_name.to_string(),
            passed: true,
            severity,
            message: String::new(),
            remedy: String::new(),
        }
    }

    /// A failing result.
    pub fn fail(
        guard_name: &str,
        severity: Severity,
        message: impl Into<String>,
        remedy: impl Into<String>,
    ) -> Self {
        Self {
            guard_name: guard_name.to_string(),
            passed: false,
            severity,
            message: message.into(),
            remedy: remedy.into(),
        }
    }
}

/// Request-scoped facts the guards evaluate.
///
/// Built fresh for each operation and never shared between requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardContext {
    /// Change the operation targets, if any
    pub change_id: Option<ObjectId>,
    /// Name of the change (proposed or existing)
    pub change_name: String,
    /// Kind of artifact about to be added
    pub artifact_kind: Option<ArtifactKind>,
    /// Override soft blocks
    pub force: bool,

    /// A constitution exists in the project
    pub has_constitution: bool,
    /// At least one pattern exists in the project
    pub has_patterns: bool,
    /// Number of patterns in the project
    pub pattern_count: usize,
    /// Number of context entities in the project
    pub context_count: usize,
    /// Number of UI components in the project
    pub component_count: usize,

    /// The change has a proposal
    pub has_proposal: bool,
    /// Every proposal of the change is ready
    pub proposal_ready: bool,
    /// The change has at least one spec
    pub has_spec: bool,
    /// Number of specs
    pub spec_count: usize,
    /// Every spec, requirement and scenario under the change is ready
    pub all_specs_ready: bool,
    /// The change has a design
    pub has_design: bool,
    /// Every design of the change is ready
    pub design_ready: bool,
    /// The change has at least one task
    pub has_tasks: bool,
    /// Number of tasks
    pub task_count: usize,
    /// Tasks with status `completed`
    pub completed_tasks: usize,
    /// Tasks with status `pending`
    pub pending_tasks: usize,
}

impl GuardContext {
    /// Context for an operation on an existing change.
    pub fn for_change(change_id: ObjectId) -> Self {
        Self {
            change_id: Some(change_id),
            ..Self::default()
        }
    }

    /// Set the artifact kind (builder style).
    #[must_use]
    pub fn with_artifact(mut self, kind: ArtifactKind) -> Self {
        self.artifact_kind = Some(kind);
        self
    }

    /// Set the force flag (builder style).
    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Tasks that are not completed.
    pub fn incomplete_tasks(&self) -> usize {
        self.task_count.saturating_sub(self.completed_tasks)
    }
}

/// A named policy check.
#[derive(Clone, Copy)]
pub struct Guard {
    /// Stable guard name, reported in results
    pub name: &'static str,
    check: fn(&GuardContext) -> GuardResult,
}

impl Guard {
    /// Wrap a check function.
    pub const fn new(name: &'static str, check: fn(&GuardContext) -> GuardResult) -> Self {
        Self { name, check }
    }

    /// Evaluate the guard.
    pub fn check(&self, context: &GuardContext) -> GuardResult {
        (self.check)(context)
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard").field("name", &self.name).finish()
    }
}

/// The guards that run before each kind of operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardSet {
    /// Before a change is created
    NewChange,
    /// Before an artifact is added to a change
    Artifact,
    /// Before a change is archived
    Archive,
}

impl GuardSet {
    /// The guards in this set, in evaluation order.
    pub fn guards(self) -> &'static [Guard] {
        match self {
            GuardSet::NewChange => &checks::NEW_CHANGE_GUARDS,
            GuardSet::Artifact => &checks::ARTIFACT_GUARDS,
            GuardSet::Archive => &checks::ARCHIVE_GUARDS,
        }
    }
}

/// Combined result of a guard run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// True if the operation must not proceed
    pub blocked: bool,
    /// Every guard's result, in evaluation order
    pub results: Vec<GuardResult>,
}

impl Outcome {
    fn failed_with(&self, severity: Severity) -> Vec<&GuardResult> {
        self.results
            .iter()
            .filter(|r| !r.passed && r.severity == severity)
            .collect()
    }

    /// Failed hard blocks.
    pub fn hard_blocks(&self) -> Vec<&GuardResult> {
        self.failed_with(Severity::HardBlock)
    }

    /// Failed soft blocks.
    pub fn soft_blocks(&self) -> Vec<&GuardResult> {
        self.failed_with(Severity::SoftBlock)
    }

    /// Failed warnings.
    pub fn warnings(&self) -> Vec<&GuardResult> {
        self.failed_with(Severity::Warning)
    }

    /// Failed suggestions.
    pub fn suggestions(&self) -> Vec<&GuardResult> {
        self.failed_with(Severity::Suggestion)
    }

    /// Most severe failure, if any guard failed.
    pub fn worst_failure(&self) -> Option<Severity> {
        self.results
            .iter()
            .filter(|r| !r.passed)
            .map(|r| r.severity)
            .max()
    }

    /// Human-readable explanation of why the operation was blocked.
    ///
    /// Empty when the outcome is not blocked.
    pub fn block_message(&self) -> String {
        if !self.blocked {
            return String::new();
        }

        let hard = self.hard_blocks();
        let soft = self.soft_blocks();

        let mut message = String::from("Operation blocked by guards:\n");
        for result in hard.iter().chain(soft.iter()) {
            let _ = write!(
                message,
                "\n[{}] {}: {}",
                result.severity, result.guard_name, result.message
            );
            if !result.remedy.is_empty() {
                let _ = write!(message, "\n  Remedy: {}", result.remedy);
            }
        }

        if !soft.is_empty() {
            message.push_str("\n\nSoft blocks can be overridden with force.");
        }

        message
    }

    /// Warnings and suggestions as a bulleted list. Empty when there are none.
    pub fn advisory_message(&self) -> String {
        let mut message = String::new();

        let sections = [("Warnings", self.warnings()), ("Suggestions", self.suggestions())];
        for (title, results) in sections {
            if results.is_empty() {
                continue;
            }
            let _ = writeln!(message, "{title}:");
            for result in results {
                let _ = write!(message, "  - {}: {}", result.guard_name, result.message);
                if !result.remedy.is_empty() {
                    let _ = write!(message, " ({})", result.remedy);
                }
                message.push('\n');
            }
        }

        message
    }
}

/// Evaluates guard lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct Runner;

impl Runner {
    /// Evaluate every guard against `context` and fold the results.
    ///
    /// The outcome is blocked iff some failed result is a hard block, or
    /// some failed result is a soft block and `context.force` is false.
    pub fn run(context: &GuardContext, guards: &[Guard]) -> Outcome {
        let mut outcome = Outcome {
            blocked: false,
            results: Vec::with_capacity(guards.len()),
        };

        for guard in guards {
            let result = guard.check(context);

            if !result.passed {
                debug!(
                    guard = guard.name,
                    severity = %result.severity,
                    force = context.force,
                    "Guard failed"
                );
                match result.severity {
                    Severity::HardBlock => outcome.blocked = true,
                    Severity::SoftBlock if !context.force => outcome.blocked = true,
                    _ => {}
                }
            }

            outcome.results.push(result);
        }

        outcome
    }
}
