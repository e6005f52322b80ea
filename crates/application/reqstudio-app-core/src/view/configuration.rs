//! Section → view configuration mapping.
//!
//! Header and content view-models are created lazily and cached so that
//! returning to a section finds it as it was left. Sections whose content is a
//! one-shot flow (import, new project) get a fresh content instance on each
//! visit; repeated requests for the section already shown reuse the instance,
//! which keeps navigation idempotent.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use super::requirement_sync::{synchronize_requirement_context, RequirementHint};
use super::viewmodel::{AreaRole, ContentRef};
use crate::mediator::TestCaseGenerationMediator;
use crate::navigation::{NavigationContext, Section};

/// Complete description of what a navigation request displays. Consumers
/// render from this alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewConfiguration {
    pub section: Section,
    pub header: ContentRef,
    pub content: ContentRef,
    pub notification: Option<ContentRef>,
    pub context: Option<NavigationContext>,
}

/// What the view area coordinator needs from configuration assembly.
pub trait ConfigurationProvider {
    fn configuration_for(
        &self,
        section: Section,
        context: Option<&NavigationContext>,
    ) -> anyhow::Result<ViewConfiguration>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentLifetime {
    Cached,
    PerVisit,
}

fn content_lifetime(section: Section) -> ContentLifetime {
    match section {
        Section::Import | Section::NewProject => ContentLifetime::PerVisit,
        Section::Default
        | Section::Project
        | Section::Requirements
        | Section::TestCaseCreator
        | Section::TestFlow => ContentLifetime::Cached,
    }
}

pub struct ViewConfigurationFactory {
    generation: Rc<TestCaseGenerationMediator>,
    cache: RefCell<HashMap<(Section, AreaRole), ContentRef>>,
    last_section: Cell<Option<Section>>,
}

impl ViewConfigurationFactory {
    pub fn new(generation: Rc<TestCaseGenerationMediator>) -> Self {
        Self {
            generation,
            cache: RefCell::new(HashMap::new()),
            last_section: Cell::new(None),
        }
    }

    /// Boundary entry point for free-form names. Never fails: unrecognized
    /// names produce the default configuration.
    pub fn get_configuration_for_section(
        &self,
        name: &str,
        context: Option<&NavigationContext>,
    ) -> ViewConfiguration {
        self.configuration(Section::parse(name), context)
    }

    pub fn configuration(
        &self,
        section: Section,
        context: Option<&NavigationContext>,
    ) -> ViewConfiguration {
        let config = match section {
            Section::Requirements => self.requirements(context),
            Section::TestCaseCreator => self.test_case_creator(context),
            Section::Default
            | Section::Project
            | Section::TestFlow
            | Section::Import
            | Section::NewProject => self.assemble(section, context),
        };
        self.last_section.set(Some(section));
        config
    }

    /// Drops every cached view-model. Used when the project closes so a new
    /// project never shows the previous one's editor state.
    pub fn invalidate_caches(&self) {
        let dropped = {
            let mut cache = self.cache.borrow_mut();
            let n = cache.len();
            cache.clear();
            n
        };
        self.last_section.set(None);
        debug!(dropped, "view-model caches invalidated");
    }

    pub fn cached_view_count(&self) -> usize {
        self.cache.borrow().len()
    }

    fn requirements(&self, context: Option<&NavigationContext>) -> ViewConfiguration {
        let config = self.assemble(Section::Requirements, context);

        let shown = config.content.displayed_title();
        let hint = match context {
            Some(_) => RequirementHint::from_context(context),
            None => RequirementHint::from_title(shown.as_deref()),
        };
        synchronize_requirement_context(&self.generation, hint);
        self.show_current_requirement(&config.content);
        config
    }

    fn test_case_creator(&self, context: Option<&NavigationContext>) -> ViewConfiguration {
        let config = self.assemble(Section::TestCaseCreator, context);
        synchronize_requirement_context(&self.generation, RequirementHint::from_context(context));
        self.show_current_requirement(&config.header);
        config
    }

    fn show_current_requirement(&self, view: &ContentRef) {
        let title = self
            .generation
            .current_requirement()
            .and_then(|item| self.generation.requirements().get(&item))
            .map(|r| r.display_title());
        view.update(|state| state.displayed_title = title);
    }

    fn assemble(&self, section: Section, context: Option<&NavigationContext>) -> ViewConfiguration {
        ViewConfiguration {
            section,
            header: self.cached(section, AreaRole::Header),
            content: self.content(section),
            notification: Some(self.cached(Section::Default, AreaRole::Notification)),
            context: context.cloned(),
        }
    }

    fn content(&self, section: Section) -> ContentRef {
        let revisit = self.last_section.get() == Some(section);
        match content_lifetime(section) {
            ContentLifetime::PerVisit if !revisit => {
                let fresh = ContentRef::new(section, AreaRole::Content);
                self.cache
                    .borrow_mut()
                    .insert((section, AreaRole::Content), fresh.clone());
                fresh
            }
            _ => self.cached(section, AreaRole::Content),
        }
    }

    fn cached(&self, section: Section, role: AreaRole) -> ContentRef {
        self.cache
            .borrow_mut()
            .entry((section, role))
            .or_insert_with(|| ContentRef::new(section, role))
            .clone()
    }
}

impl ConfigurationProvider for ViewConfigurationFactory {
    fn configuration_for(
        &self,
        section: Section,
        context: Option<&NavigationContext>,
    ) -> anyhow::Result<ViewConfiguration> {
        Ok(self.configuration(section, context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mediator::{BroadcastBus, WorkspaceMediator};
    use reqstudio_core::{Requirement, Workspace};

    fn factory() -> (WorkspaceMediator, Rc<TestCaseGenerationMediator>, ViewConfigurationFactory) {
        let bus = Rc::new(BroadcastBus::new());
        let workspace = WorkspaceMediator::new(bus.clone());
        let mut ws = Workspace::new("P");
        ws.requirements.push(Requirement::new("R-1", "Alpha"));
        ws.requirements.push(Requirement::new("R-2", "Beta"));
        workspace.open_workspace(ws);
        let generation = TestCaseGenerationMediator::new(bus, workspace.requirements_view());
        let factory = ViewConfigurationFactory::new(generation.clone());
        (workspace, generation, factory)
    }

    #[test]
    fn unknown_names_produce_default_configuration() {
        let (_ws, _gen, factory) = factory();
        for name in ["", "reports", "PROJECTX", "null", "   "] {
            let config = factory.get_configuration_for_section(name, None);
            assert_eq!(config.section, Section::Default, "{name:?}");
            assert_eq!(config.content.section(), Section::Default);
        }
    }

    #[test]
    fn cached_sections_keep_state_across_visits() {
        let (_ws, _gen, factory) = factory();
        let first = factory.configuration(Section::Project, None);
        first.content.update(|s| s.scroll_offset = 120.0);

        factory.configuration(Section::Import, None);
        let again = factory.configuration(Section::Project, None);

        assert_eq!(first.content, again.content);
        assert_eq!(again.content.state().scroll_offset, 120.0);
    }

    #[test]
    fn per_visit_sections_rebuild_only_when_entered() {
        let (_ws, _gen, factory) = factory();
        let a = factory.configuration(Section::Import, None);
        let b = factory.configuration(Section::Import, None);
        factory.configuration(Section::Project, None);
        let c = factory.configuration(Section::Import, None);

        assert_eq!(a.content, b.content);
        assert_ne!(a.content, c.content);
        assert_eq!(a.header, c.header);
    }

    #[test]
    fn requirements_section_syncs_selection_and_view() {
        let (_ws, generation, factory) = factory();
        let config = factory.configuration(
            Section::Requirements,
            Some(&NavigationContext::DisplayedTitle("R-2 - Beta".into())),
        );

        assert_eq!(generation.current_requirement().as_deref(), Some("R-2"));
        assert_eq!(config.content.displayed_title().as_deref(), Some("R-2 - Beta"));

        // Without context the view's own title drives the match.
        generation.select_requirement("R-1").unwrap();
        factory.configuration(Section::Requirements, None);
        assert_eq!(generation.current_requirement().as_deref(), Some("R-2"));
    }

    #[test]
    fn invalidation_forgets_instances() {
        let (_ws, _gen, factory) = factory();
        let before = factory.configuration(Section::Project, None);
        factory.invalidate_caches();
        assert_eq!(factory.cached_view_count(), 0);
        let after = factory.configuration(Section::Project, None);
        assert_ne!(before.content, after.content);
    }
}
