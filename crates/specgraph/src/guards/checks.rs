//! Built-in guards and the sets they belong to.

use super::{Guard, GuardContext, GuardResult, Severity};
use crate::domain::ArtifactKind;
use regex::Regex;
use std::sync::LazyLock;

static KEBAB_CASE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9]*(-[a-z0-9]+)*$").ok());

/// True if `name` is lowercase kebab-case starting with a letter.
pub fn is_kebab_case(name: &str) -> bool {
    KEBAB_CASE.as_ref().is_some_and(|re| re.is_match(name))
}

// ========== Pre-change guards ==========

/// A project constitution must exist before any change is created.
pub const CONSTITUTION_REQUIRED: Guard = Guard::new("constitution_required", constitution_required);

fn constitution_required(ctx: &GuardContext) -> GuardResult {
    const NAME: &str = "constitution_required";
    if ctx.has_constitution {
        return GuardResult::pass(NAME, Severity::HardBlock);
    }
    GuardResult::fail(
        NAME,
        Severity::HardBlock,
        "The project has no Constitution. Changes can only be created once the project's \
         principles and guardrails are recorded.",
        "Create a Constitution for the project first.",
    )
}

/// Patterns should be seeded before changes start.
pub const PATTERNS_SEEDED: Guard = Guard::new("patterns_seeded", patterns_seeded);

fn patterns_seeded(ctx: &GuardContext) -> GuardResult {
    const NAME: &str = "patterns_seeded";
    if ctx.has_patterns {
        return GuardResult::pass(NAME, Severity::SoftBlock);
    }
    GuardResult::fail(
        NAME,
        Severity::SoftBlock,
        "The project has no Patterns. Seeding recurring implementation decisions early keeps \
         changes consistent.",
        "Seed the project's patterns, or force the operation to skip this check.",
    )
}

/// Recommends mapping contexts (screens, pages, surfaces).
pub const CONTEXT_DISCOVERY: Guard = Guard::new("context_discovery", context_discovery);

fn context_discovery(ctx: &GuardContext) -> GuardResult {
    const NAME: &str = "context_discovery";
    if ctx.context_count > 0 {
        return GuardResult::pass(NAME, Severity::Suggestion);
    }
    GuardResult::fail(
        NAME,
        Severity::Suggestion,
        "No Context entities exist. Mapping interaction surfaces up front helps impact analysis.",
        "Add context artifacts, or ignore this if the project has no UI.",
    )
}

/// Recommends registering reusable UI components.
pub const COMPONENT_DISCOVERY: Guard = Guard::new("component_discovery", component_discovery);

fn component_discovery(ctx: &GuardContext) -> GuardResult {
    const NAME: &str = "component_discovery";
    if ctx.component_count > 0 {
        return GuardResult::pass(NAME, Severity::Suggestion);
    }
    GuardResult::fail(
        NAME,
        Severity::Suggestion,
        "No UIComponent entities exist. Registered components make change impact easier to track.",
        "Add ui_component artifacts, or ignore this if it does not apply.",
    )
}

/// Change names must be kebab-case. An empty name is left to other validation.
pub const KEBAB_CASE_NAME: Guard = Guard::new("kebab_case_name", kebab_case_name);

fn kebab_case_name(ctx: &GuardContext) -> GuardResult {
    const NAME: &str = "kebab_case_name";
    if ctx.change_name.is_empty() || is_kebab_case(&ctx.change_name) {
        return GuardResult::pass(NAME, Severity::HardBlock);
    }
    GuardResult::fail(
        NAME,
        Severity::HardBlock,
        format!(
            "Change name must be kebab-case (lowercase letters, digits and hyphens, starting \
             with a letter). Got: {}",
            ctx.change_name
        ),
        "Use a name such as 'add-user-permissions'.",
    )
}

// ========== Artifact ordering guards ==========

/// Spec-level artifacts need a ready proposal.
pub const PROPOSAL_BEFORE_SPEC: Guard = Guard::new("proposal_before_spec", proposal_before_spec);

fn proposal_before_spec(ctx: &GuardContext) -> GuardResult {
    const NAME: &str = "proposal_before_spec";
    if !ctx.artifact_kind.is_some_and(ArtifactKind::is_spec_level) {
        return GuardResult::pass(NAME, Severity::HardBlock);
    }
    if !ctx.has_proposal {
        return GuardResult::fail(
            NAME,
            Severity::HardBlock,
            "The change needs a Proposal before Specs can be added.",
            "Add a proposal to the change first.",
        );
    }
    if !ctx.proposal_ready {
        return GuardResult::fail(
            NAME,
            Severity::HardBlock,
            "The Proposal must be ready before Specs can be added.",
            "Review the proposal and mark it ready.",
        );
    }
    GuardResult::pass(NAME, Severity::HardBlock)
}

/// A design needs a ready proposal and a fully ready spec tree.
pub const SPEC_BEFORE_DESIGN: Guard = Guard::new("spec_before_design", spec_before_design);

fn spec_before_design(ctx: &GuardContext) -> GuardResult {
    const NAME: &str = "spec_before_design";
    if ctx.artifact_kind != Some(ArtifactKind::Design) {
        return GuardResult::pass(NAME, Severity::HardBlock);
    }
    let failure = if !ctx.has_proposal {
        Some((
            "The change needs a Proposal before a Design can be added.",
            "Add a proposal to the change first.",
        ))
    } else if !ctx.proposal_ready {
        Some((
            "The Proposal must be ready before a Design can be added.",
            "Review the proposal and mark it ready.",
        ))
    } else if !ctx.has_spec {
        Some((
            "The change needs at least one Spec before a Design can be added.",
            "Add specs to the change first.",
        ))
    } else if !ctx.all_specs_ready {
        Some((
            "Every Spec, Requirement and Scenario must be ready before a Design can be added.",
            "Mark scenarios, then requirements, then specs ready.",
        ))
    } else {
        None
    };

    match failure {
        Some((message, remedy)) => GuardResult::fail(NAME, Severity::HardBlock, message, remedy),
        None => GuardResult::pass(NAME, Severity::HardBlock),
    }
}

/// Tasks need a ready design.
pub const DESIGN_BEFORE_TASKS: Guard = Guard::new("design_before_tasks", design_before_tasks);

fn design_before_tasks(ctx: &GuardContext) -> GuardResult {
    const NAME: &str = "design_before_tasks";
    if ctx.artifact_kind != Some(ArtifactKind::Task) {
        return GuardResult::pass(NAME, Severity::HardBlock);
    }
    if !ctx.has_design {
        return GuardResult::fail(
            NAME,
            Severity::HardBlock,
            "The change needs a Design before Tasks can be added.",
            "Add a design to the change first.",
        );
    }
    if !ctx.design_ready {
        return GuardResult::fail(
            NAME,
            Severity::HardBlock,
            "The Design must be ready before Tasks can be added.",
            "Review the design and mark it ready.",
        );
    }
    GuardResult::pass(NAME, Severity::HardBlock)
}

/// A change holds at most one proposal and one design.
pub const SINGLETON_ARTIFACT: Guard = Guard::new("singleton_artifact", singleton_artifact);

fn singleton_artifact(ctx: &GuardContext) -> GuardResult {
    const NAME: &str = "singleton_artifact";
    match ctx.artifact_kind {
        Some(ArtifactKind::Proposal) if ctx.has_proposal => GuardResult::fail(
            NAME,
            Severity::HardBlock,
            "The change already has a Proposal. A change has exactly one.",
            "Update the existing proposal instead.",
        ),
        Some(ArtifactKind::Design) if ctx.has_design => GuardResult::fail(
            NAME,
            Severity::HardBlock,
            "The change already has a Design. A change has exactly one.",
            "Update the existing design instead.",
        ),
        _ => GuardResult::pass(NAME, Severity::HardBlock),
    }
}

// ========== Archive guards ==========

/// Archiving expects every core artifact to exist.
pub const ARTIFACT_COMPLETENESS: Guard = Guard::new("artifact_completeness", artifact_completeness);

fn artifact_completeness(ctx: &GuardContext) -> GuardResult {
    const NAME: &str = "artifact_completeness";
    let missing: Vec<&str> = [
        (ctx.has_proposal, "proposal"),
        (ctx.has_spec, "specs"),
        (ctx.has_design, "design"),
        (ctx.has_tasks, "tasks"),
    ]
    .into_iter()
    .filter(|(present, _)| !present)
    .map(|(_, name)| name)
    .collect();

    if missing.is_empty() {
        return GuardResult::pass(NAME, Severity::SoftBlock);
    }
    GuardResult::fail(
        NAME,
        Severity::SoftBlock,
        format!(
            "The change is missing {}. Archiving it now loses the record of what was planned.",
            join_with_and(&missing)
        ),
        "Add the missing artifacts, or force the archive.",
    )
}

/// Archiving expects every task to be completed.
pub const TASK_COMPLETION: Guard = Guard::new("task_completion", task_completion);

fn task_completion(ctx: &GuardContext) -> GuardResult {
    const NAME: &str = "task_completion";
    let incomplete = ctx.incomplete_tasks();
    if ctx.task_count == 0 || incomplete == 0 {
        return GuardResult::pass(NAME, Severity::SoftBlock);
    }
    GuardResult::fail(
        NAME,
        Severity::SoftBlock,
        format!(
            "{incomplete} of {} tasks are not completed.",
            ctx.task_count
        ),
        "Complete the remaining tasks, or force the archive.",
    )
}

// ========== Sets ==========

pub(super) static NEW_CHANGE_GUARDS: [Guard; 5] = [
    KEBAB_CASE_NAME,
    CONSTITUTION_REQUIRED,
    PATTERNS_SEEDED,
    CONTEXT_DISCOVERY,
    COMPONENT_DISCOVERY,
];

pub(super) static ARTIFACT_GUARDS: [Guard; 4] = [
    SINGLETON_ARTIFACT,
    PROPOSAL_BEFORE_SPEC,
    SPEC_BEFORE_DESIGN,
    DESIGN_BEFORE_TASKS,
];

pub(super) static ARCHIVE_GUARDS: [Guard; 2] = [ARTIFACT_COMPLETENESS, TASK_COMPLETION];

/// "a", "a and b", "a, b, and c"
fn join_with_and(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [only] => (*only).to_string(),
        [first, second] => format!("{first} and {second}"),
        [init @ .., last] => format!("{}, and {last}", init.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guards::{GuardSet, Runner};
    use rstest::rstest;

    fn ready_for_design() -> GuardContext {
        GuardContext {
            has_proposal: true,
            proposal_ready: true,
            has_spec: true,
            spec_count: 2,
            all_specs_ready: true,
            ..GuardContext::default()
        }
    }

    #[rstest]
    #[case::simple("add-login", true)]
    #[case::digits("v2-api", true)]
    #[case::single_word("refactor", true)]
    #[case::uppercase("Add-Login", false)]
    #[case::underscore("add_login", false)]
    #[case::leading_digit("2fa-support", false)]
    #[case::trailing_hyphen("add-", false)]
    #[case::double_hyphen("add--login", false)]
    #[case::space("add login", false)]
    fn test_is_kebab_case(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_kebab_case(name), expected);
    }

    #[test]
    fn test_kebab_case_name_passes_empty_name() {
        assert!(KEBAB_CASE_NAME.check(&GuardContext::default()).passed);
    }

    #[test]
    fn test_kebab_case_failure_names_offender() {
        let ctx = GuardContext {
            change_name: "Bad Name".to_string(),
            ..GuardContext::default()
        };
        let result = KEBAB_CASE_NAME.check(&ctx);
        assert!(!result.passed);
        assert!(result.message.ends_with("Got: Bad Name"));
    }

    #[rstest]
    #[case::spec(ArtifactKind::Spec)]
    #[case::requirement(ArtifactKind::Requirement)]
    #[case::scenario(ArtifactKind::Scenario)]
    #[case::scenario_step(ArtifactKind::ScenarioStep)]
    fn test_proposal_before_spec_applies_to_spec_levels(#[case] kind: ArtifactKind) {
        let missing = GuardContext::default().with_artifact(kind);
        assert!(!PROPOSAL_BEFORE_SPEC.check(&missing).passed);

        let draft = GuardContext {
            has_proposal: true,
            ..GuardContext::default()
        }
        .with_artifact(kind);
        let result = PROPOSAL_BEFORE_SPEC.check(&draft);
        assert!(!result.passed);
        assert!(result.message.contains("ready"));

        let ready = GuardContext {
            has_proposal: true,
            proposal_ready: true,
            ..GuardContext::default()
        }
        .with_artifact(kind);
        assert!(PROPOSAL_BEFORE_SPEC.check(&ready).passed);
    }

    #[rstest]
    #[case::proposal(ArtifactKind::Proposal)]
    #[case::design(ArtifactKind::Design)]
    #[case::task(ArtifactKind::Task)]
    #[case::context(ArtifactKind::Context)]
    fn test_proposal_before_spec_ignores_other_kinds(#[case] kind: ArtifactKind) {
        let ctx = GuardContext::default().with_artifact(kind);
        assert!(PROPOSAL_BEFORE_SPEC.check(&ctx).passed);
    }

    #[test]
    fn test_spec_before_design_walks_the_chain() {
        let ok = ready_for_design().with_artifact(ArtifactKind::Design);
        assert!(SPEC_BEFORE_DESIGN.check(&ok).passed);

        let unready_specs = GuardContext {
            all_specs_ready: false,
            ..ok.clone()
        };
        let result = SPEC_BEFORE_DESIGN.check(&unready_specs);
        assert!(!result.passed);
        assert!(result.message.contains("Scenario"));

        let no_spec = GuardContext {
            has_spec: false,
            ..ok.clone()
        };
        assert!(SPEC_BEFORE_DESIGN.check(&no_spec).message.contains("at least one Spec"));

        let no_proposal = GuardContext {
            has_proposal: false,
            ..ok
        };
        assert!(SPEC_BEFORE_DESIGN.check(&no_proposal).message.contains("Proposal"));
    }

    #[test]
    fn test_design_before_tasks() {
        let no_design = GuardContext::default().with_artifact(ArtifactKind::Task);
        assert!(!DESIGN_BEFORE_TASKS.check(&no_design).passed);

        let draft = GuardContext {
            has_design: true,
            ..no_design.clone()
        };
        assert!(!DESIGN_BEFORE_TASKS.check(&draft).passed);

        let ready = GuardContext {
            design_ready: true,
            ..draft
        };
        assert!(DESIGN_BEFORE_TASKS.check(&ready).passed);
    }

    #[test]
    fn test_singleton_artifact() {
        let ctx = GuardContext {
            has_proposal: true,
            has_design: true,
            ..GuardContext::default()
        };

        let passes = |ctx: &GuardContext, kind| {
            SINGLETON_ARTIFACT
                .check(&ctx.clone().with_artifact(kind))
                .passed
        };
        assert!(!passes(&ctx, ArtifactKind::Proposal));
        assert!(!passes(&ctx, ArtifactKind::Design));
        assert!(passes(&ctx, ArtifactKind::Spec));
        assert!(passes(&GuardContext::default(), ArtifactKind::Proposal));
    }

    #[test]
    fn test_artifact_completeness_lists_missing() {
        let ctx = GuardContext {
            has_spec: true,
            ..GuardContext::default()
        };
        let result = ARTIFACT_COMPLETENESS.check(&ctx);
        assert!(!result.passed);
        assert_eq!(result.severity, Severity::SoftBlock);
        assert!(result.message.contains("proposal, design, and tasks"));
    }

    #[rstest]
    #[case::no_tasks(0, 0, true)]
    #[case::all_done(3, 3, true)]
    #[case::some_left(3, 1, false)]
    fn test_task_completion(#[case] total: usize, #[case] completed: usize, #[case] passed: bool) {
        let ctx = GuardContext {
            task_count: total,
            completed_tasks: completed,
            ..GuardContext::default()
        };
        let result = TASK_COMPLETION.check(&ctx);
        assert_eq!(result.passed, passed);
        if !passed {
            assert!(result.message.starts_with("2 of 3 tasks"));
        }
    }

    #[rstest]
    #[case::none(&[], "")]
    #[case::one(&["design"], "design")]
    #[case::two(&["design", "tasks"], "design and tasks")]
    #[case::three(&["proposal", "specs", "tasks"], "proposal, specs, and tasks")]
    fn test_join_with_and(#[case] items: &[&str], #[case] expected: &str) {
        assert_eq!(join_with_and(items), expected);
    }

    #[test]
    fn test_new_change_set_on_bare_project() {
        let ctx = GuardContext {
            change_name: "add-login".to_string(),
            ..GuardContext::default()
        };
        let outcome = Runner::run(&ctx, GuardSet::NewChange.guards());

        assert!(outcome.blocked);
        assert_eq!(outcome.hard_blocks().len(), 1);
        assert_eq!(outcome.soft_blocks().len(), 1);
        assert_eq!(outcome.suggestions().len(), 2);
    }

    #[test]
    fn test_archive_set_forced_through() {
        let ctx = GuardContext {
            task_count: 2,
            completed_tasks: 1,
            has_tasks: true,
            ..GuardContext::default()
        }
        .with_force(true);
        let outcome = Runner::run(&ctx, GuardSet::Archive.guards());

        assert!(!outcome.blocked);
        assert_eq!(outcome.soft_blocks().len(), 2);
    }
}
