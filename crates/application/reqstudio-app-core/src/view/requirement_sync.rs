//! Reconciles the requirement a view displays with the test-case generation
//! domain's current selection.
//!
//! This is the one place where view configuration writes another domain's
//! state. It never fails: anything that cannot be matched leaves the
//! selection as it was.

use reqstudio_core::RequirementItem;
use tracing::debug;

use crate::mediator::TestCaseGenerationMediator;
use crate::navigation::NavigationContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementHint<'a> {
    None,
    Item(&'a str),
    Title(&'a str),
}

impl<'a> RequirementHint<'a> {
    pub fn from_context(context: Option<&'a NavigationContext>) -> Self {
        match context {
            Some(NavigationContext::Requirement { item }) => RequirementHint::Item(item),
            Some(NavigationContext::DisplayedTitle(title)) => RequirementHint::Title(title),
            None => RequirementHint::None,
        }
    }

    pub fn from_title(title: Option<&'a str>) -> Self {
        title.map_or(RequirementHint::None, RequirementHint::Title)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The hint resolved to this requirement, which is now current.
    Matched(RequirementItem),
    /// No hint and no valid selection: the first requirement was selected.
    DefaultedToFirst(RequirementItem),
    /// Nothing changed (hint unmatched, or existing selection kept).
    Unchanged,
    /// The workspace has no requirements.
    NoRequirements,
}

pub fn synchronize_requirement_context(
    generation: &TestCaseGenerationMediator,
    hint: RequirementHint<'_>,
) -> SyncOutcome {
    let requirements = generation.requirements();

    let matched = match hint {
        RequirementHint::Item(item) => requirements.get(item).map(|r| r.item),
        RequirementHint::Title(title) => requirements.match_title(title),
        RequirementHint::None => {
            let current = generation
                .current_requirement()
                .filter(|item| requirements.contains(item));
            if current.is_some() {
                return SyncOutcome::Unchanged;
            }
            return match requirements.first_item() {
                Some(first) if select(generation, &first) => SyncOutcome::DefaultedToFirst(first),
                Some(_) => SyncOutcome::Unchanged,
                None => SyncOutcome::NoRequirements,
            };
        }
    };

    match matched {
        Some(item) if select(generation, &item) => SyncOutcome::Matched(item),
        Some(_) => SyncOutcome::Unchanged,
        None => {
            debug!(?hint, "no requirement matches displayed context; selection unchanged");
            SyncOutcome::Unchanged
        }
    }
}

fn select(generation: &TestCaseGenerationMediator, item: &str) -> bool {
    match generation.select_requirement(item) {
        Ok(_) => true,
        Err(e) => {
            debug!(item, "requirement selection skipped: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use reqstudio_core::{Requirement, Workspace};

    use super::*;
    use crate::mediator::{BroadcastBus, WorkspaceMediator};

    fn setup(requirements: &[(&str, &str)]) -> (WorkspaceMediator, Rc<TestCaseGenerationMediator>) {
        let bus = Rc::new(BroadcastBus::new());
        let workspace = WorkspaceMediator::new(bus.clone());
        let mut ws = Workspace::new("P");
        for (item, name) in requirements {
            ws.requirements.push(Requirement::new(*item, *name));
        }
        workspace.open_workspace(ws);
        let generation = TestCaseGenerationMediator::new(bus, workspace.requirements_view());
        (workspace, generation)
    }

    const ALPHA_BETA: &[(&str, &str)] = &[("R-1", "Alpha"), ("R-2", "Beta")];

    #[test]
    fn displayed_title_selects_matching_requirement() {
        let (_ws, generation) = setup(ALPHA_BETA);
        let outcome = synchronize_requirement_context(&generation, RequirementHint::Title("R-1 - Alpha"));
        assert_eq!(outcome, SyncOutcome::Matched("R-1".into()));
        assert_eq!(generation.current_requirement().as_deref(), Some("R-1"));
    }

    #[test]
    fn unmatched_title_leaves_selection_unchanged() {
        let (_ws, generation) = setup(ALPHA_BETA);
        generation.select_requirement("R-2").unwrap();

        let outcome = synchronize_requirement_context(&generation, RequirementHint::Title("R-7 - Omega"));

        assert_eq!(outcome, SyncOutcome::Unchanged);
        assert_eq!(generation.current_requirement().as_deref(), Some("R-2"));
    }

    #[test]
    fn unmatched_title_without_selection_selects_nothing() {
        let (_ws, generation) = setup(ALPHA_BETA);
        let outcome = synchronize_requirement_context(&generation, RequirementHint::Title("nope"));
        assert_eq!(outcome, SyncOutcome::Unchanged);
        assert_eq!(generation.current_requirement(), None);
    }

    #[test]
    fn no_hint_and_no_selection_defaults_to_first() {
        let (_ws, generation) = setup(ALPHA_BETA);
        let outcome = synchronize_requirement_context(&generation, RequirementHint::None);
        assert_eq!(outcome, SyncOutcome::DefaultedToFirst("R-1".into()));
        assert_eq!(generation.current_requirement().as_deref(), Some("R-1"));
    }

    #[test]
    fn no_hint_keeps_existing_selection() {
        let (_ws, generation) = setup(ALPHA_BETA);
        generation.select_requirement("R-2").unwrap();
        assert_eq!(
            synchronize_requirement_context(&generation, RequirementHint::None),
            SyncOutcome::Unchanged
        );
        assert_eq!(generation.current_requirement().as_deref(), Some("R-2"));
    }

    #[test]
    fn empty_workspace_reports_no_requirements() {
        let (_ws, generation) = setup(&[]);
        assert_eq!(
            synchronize_requirement_context(&generation, RequirementHint::None),
            SyncOutcome::NoRequirements
        );
    }

    #[test]
    fn structured_item_hint_matches_by_identifier() {
        let (_ws, generation) = setup(ALPHA_BETA);
        assert_eq!(
            synchronize_requirement_context(&generation, RequirementHint::Item("R-2")),
            SyncOutcome::Matched("R-2".into())
        );
    }
}
