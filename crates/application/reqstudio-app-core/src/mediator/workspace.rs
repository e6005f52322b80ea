//! Workspace management domain: sole owner of the loaded [`Workspace`] and of
//! the dirty flag.
//!
//! `IsDirty` is true exactly when a mutation happened since the last
//! successful load or save. Every mutation bumps a revision counter; a save
//! only clears the flag when the revision it wrote is still current.

use std::cell::RefCell;
use std::rc::Rc;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use reqstudio_core::{
    find_by_item, match_displayed_title, merge_imported, AnalysisResult, MergeReport,
    Requirement, RequirementItem, TestCase, Workspace,
};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    BroadcastBus, BroadcastScope, DirtyStateChanged, ProjectClosed, ProjectOpened,
    RequirementRemoved, SessionId, StateProperty, StateValue, WorkflowStateChanged,
};
use crate::channel::{ChannelEvent, Delivery, EventChannel, Scope};

#[derive(Debug)]
pub struct WorkspaceScope;

impl Scope for WorkspaceScope {
    const NAME: &'static str = "workspace-management";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionChange {
    Reset {
        count: usize,
    },
    Added {
        item: RequirementItem,
    },
    Removed {
        item: RequirementItem,
    },
    Merged {
        added: Vec<RequirementItem>,
        updated: Vec<RequirementItem>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementsCollectionChanged {
    pub change: CollectionChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateAspect {
    Text,
    Analysis,
    TestCases,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementUpdated {
    pub item: RequirementItem,
    pub aspect: UpdateAspect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceSaved {
    pub path: Utf8PathBuf,
    pub revision: u64,
}

impl ChannelEvent for RequirementsCollectionChanged {
    type Scope = WorkspaceScope;
}

impl ChannelEvent for RequirementUpdated {
    type Scope = WorkspaceScope;
}

impl ChannelEvent for WorkspaceSaved {
    type Scope = WorkspaceScope;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkspaceError {
    #[error("no project is open")]
    NoProject,
    #[error("requirement '{0}' does not exist")]
    UnknownRequirement(RequirementItem),
    #[error("requirement '{0}' already exists")]
    DuplicateRequirement(RequirementItem),
    #[error("requirement identifier cannot be empty")]
    EmptyIdentifier,
    #[error("requirement '{0}' has no suggested rewrite")]
    NoSuggestedRewrite(RequirementItem),
}

/// Text fields a user may edit. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct RequirementEdit {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug)]
struct Loaded {
    session: SessionId,
    document: Workspace,
}

#[derive(Debug, Default)]
struct WorkspaceState {
    loaded: Option<Loaded>,
    is_dirty: bool,
    revision: u64,
    /// Newest revision a completed write has put on disk.
    confirmed_revision: Option<u64>,
}

/// Read-only handle onto the loaded requirement collection, granted to other
/// domains. Mutations go back through [`WorkspaceMediator`].
#[derive(Clone)]
pub struct RequirementsView {
    state: Rc<RefCell<WorkspaceState>>,
}

impl RequirementsView {
    /// Runs `f` against the current collection (empty when no project is
    /// open). `f` must not call back into the workspace mediator.
    pub fn with<R>(&self, f: impl FnOnce(&[Requirement]) -> R) -> R {
        let state = self.state.borrow();
        match &state.loaded {
            Some(l) => f(&l.document.requirements),
            None => f(&[]),
        }
    }

    pub fn len(&self) -> usize {
        self.with(<[Requirement]>::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, item: &str) -> bool {
        self.with(|reqs| find_by_item(reqs, item).is_some())
    }

    pub fn items(&self) -> Vec<RequirementItem> {
        self.with(|reqs| reqs.iter().map(|r| r.item.clone()).collect())
    }

    pub fn first_item(&self) -> Option<RequirementItem> {
        self.with(|reqs| reqs.first().map(|r| r.item.clone()))
    }

    pub fn get(&self, item: &str) -> Option<Requirement> {
        self.with(|reqs| find_by_item(reqs, item).map(|ix| reqs[ix].clone()))
    }

    pub fn match_title(&self, title: &str) -> Option<RequirementItem> {
        self.with(|reqs| match_displayed_title(reqs, title).map(|ix| reqs[ix].item.clone()))
    }
}

pub struct WorkspaceMediator {
    state: Rc<RefCell<WorkspaceState>>,
    events: EventChannel<WorkspaceScope>,
    broadcast: Rc<BroadcastBus>,
}

impl WorkspaceMediator {
    pub fn new(broadcast: Rc<BroadcastBus>) -> Self {
        Self {
            state: Rc::new(RefCell::new(WorkspaceState::default())),
            events: EventChannel::new(),
            broadcast,
        }
    }

    pub fn events(&self) -> &EventChannel<WorkspaceScope> {
        &self.events
    }

    pub fn requirements_view(&self) -> RequirementsView {
        RequirementsView {
            state: self.state.clone(),
        }
    }

    // --- Observable state ---

    pub fn is_dirty(&self) -> bool {
        self.state.borrow().is_dirty
    }

    pub fn revision(&self) -> u64 {
        self.state.borrow().revision
    }

    pub fn session(&self) -> Option<SessionId> {
        self.state.borrow().loaded.as_ref().map(|l| l.session)
    }

    pub fn has_project(&self) -> bool {
        self.state.borrow().loaded.is_some()
    }

    pub fn project_name(&self) -> Option<String> {
        self.with_workspace(|ws| ws.project_name.clone())
    }

    pub fn file_path(&self) -> Option<Utf8PathBuf> {
        self.with_workspace(|ws| ws.file_path.clone()).flatten()
    }

    pub fn with_workspace<R>(&self, f: impl FnOnce(&Workspace) -> R) -> Option<R> {
        self.state.borrow().loaded.as_ref().map(|l| f(&l.document))
    }

    /// Owned copy of the document, e.g. for handing to a background save.
    pub fn snapshot(&self) -> Option<Workspace> {
        self.with_workspace(Workspace::clone)
    }

    // --- Mediator contract ---

    /// Returns whether the value changed. Publishes `WorkflowStateChanged`
    /// and broadcasts `DirtyStateChanged` only on change.
    pub fn set_is_dirty(&self, value: bool) -> bool {
        {
            let mut state = self.state.borrow_mut();
            if state.is_dirty == value {
                return false;
            }
            state.is_dirty = value;
        }
        self.events.publish(&WorkflowStateChanged::<WorkspaceScope>::new(
            StateProperty::IsDirty,
            StateValue::Flag(value),
        ));
        self.broadcast
            .publish(&DirtyStateChanged { is_dirty: value });
        true
    }

    pub fn publish_event<E>(&self, event: &E) -> Delivery
    where
        E: ChannelEvent<Scope = WorkspaceScope>,
    {
        self.events.publish(event)
    }

    pub fn broadcast_to_all_domains<N>(&self, notification: &N) -> Delivery
    where
        N: ChannelEvent<Scope = BroadcastScope>,
    {
        self.broadcast.publish(notification)
    }

    // --- Lifecycle ---

    /// Replaces the loaded workspace. Any previous workspace is closed first
    /// (broadcasting `ProjectClosed`); the new one starts clean.
    pub fn open_workspace(&self, workspace: Workspace) -> SessionId {
        self.close_workspace();

        let session = Uuid::new_v4();
        let project_name = workspace.project_name.clone();
        let count = workspace.requirements.len();
        let was_dirty = {
            let mut state = self.state.borrow_mut();
            let was_dirty = state.is_dirty;
            state.loaded = Some(Loaded {
                session,
                document: workspace,
            });
            state.is_dirty = false;
            state.revision = 0;
            state.confirmed_revision = None;
            was_dirty
        };

        if was_dirty {
            self.publish_dirty(false);
        }
        self.events.publish(&RequirementsCollectionChanged {
            change: CollectionChange::Reset { count },
        });
        self.broadcast.publish(&ProjectOpened {
            session,
            project_name,
            requirement_count: count,
        });
        debug!(%session, count, "workspace opened");
        session
    }

    /// Discards the loaded workspace. Returns the closed session, if any.
    pub fn close_workspace(&self) -> Option<SessionId> {
        let (session, was_dirty) = {
            let mut state = self.state.borrow_mut();
            let loaded = state.loaded.take()?;
            let was_dirty = state.is_dirty;
            state.is_dirty = false;
            state.revision = 0;
            state.confirmed_revision = None;
            (loaded.session, was_dirty)
        };

        if was_dirty {
            self.publish_dirty(false);
        }
        self.events.publish(&RequirementsCollectionChanged {
            change: CollectionChange::Reset { count: 0 },
        });
        self.broadcast.publish(&ProjectClosed { session });
        debug!(%session, "workspace closed");
        Some(session)
    }

    /// Records a completed write of `written_revision` to `path`. The dirty
    /// flag is cleared last, and only if nothing changed while the write was
    /// in flight. A write older than one already confirmed has put stale
    /// content on disk, so it marks the workspace dirty again. Returns whether
    /// the workspace is now clean.
    pub fn mark_saved(
        &self,
        path: &Utf8Path,
        saved_at: DateTime<Utc>,
        written_revision: u64,
    ) -> bool {
        let (up_to_date, stale) = {
            let mut state = self.state.borrow_mut();
            let current = state.revision;
            let stale = state
                .confirmed_revision
                .is_some_and(|confirmed| written_revision < confirmed);
            let Some(loaded) = state.loaded.as_mut() else {
                return false;
            };
            loaded.document.file_path = Some(path.to_path_buf());
            loaded.document.saved_at = Some(saved_at);
            if !stale {
                state.confirmed_revision = Some(written_revision);
            }
            (!stale && current == written_revision, stale)
        };

        self.events.publish(&WorkspaceSaved {
            path: path.to_path_buf(),
            revision: written_revision,
        });

        if stale {
            warn!(
                written_revision,
                "older revision overwrote a newer save; marking dirty"
            );
            self.set_is_dirty(true);
        } else if up_to_date {
            self.set_is_dirty(false);
        } else {
            debug!(
                written_revision,
                "workspace changed during save; keeping dirty flag"
            );
        }
        up_to_date
    }

    // --- Requirement mutations ---

    pub fn add_requirement(&self, mut requirement: Requirement) -> Result<(), WorkspaceError> {
        requirement.item = requirement.item.trim().to_string();
        let item = requirement.item.clone();
        if item.is_empty() {
            return Err(WorkspaceError::EmptyIdentifier);
        }
        self.mutate(|ws| {
            if ws.contains(&item) {
                return Err(WorkspaceError::DuplicateRequirement(item.clone()));
            }
            ws.requirements.push(requirement);
            Ok(())
        })?;
        self.events.publish(&RequirementsCollectionChanged {
            change: CollectionChange::Added { item },
        });
        Ok(())
    }

    /// Returns `Ok(false)` when the edit matches the current text.
    pub fn edit_requirement(&self, item: &str, edit: RequirementEdit) -> Result<bool, WorkspaceError> {
        let unchanged = self
            .with_workspace(|ws| {
                ws.requirement(item).map(|r| {
                    edit.name.as_ref().is_none_or(|n| *n == r.name)
                        && edit.description.as_ref().is_none_or(|d| *d == r.description)
                })
            })
            .ok_or(WorkspaceError::NoProject)?
            .ok_or_else(|| WorkspaceError::UnknownRequirement(item.to_string()))?;
        if unchanged {
            return Ok(false);
        }

        self.mutate(|ws| {
            let r = Self::find_mut(ws, item)?;
            if let Some(name) = edit.name {
                r.name = name;
            }
            if let Some(description) = edit.description {
                r.description = description;
            }
            Ok(())
        })?;
        self.publish_updated(item, UpdateAspect::Text);
        Ok(true)
    }

    /// Explicit removal. Broadcasts `RequirementRemoved` so other domains can
    /// drop references to it.
    pub fn remove_requirement(&self, item: &str) -> Result<Requirement, WorkspaceError> {
        let removed = self.mutate(|ws| {
            let ix = find_by_item(&ws.requirements, item)
                .ok_or_else(|| WorkspaceError::UnknownRequirement(item.to_string()))?;
            Ok(ws.requirements.remove(ix))
        })?;
        self.events.publish(&RequirementsCollectionChanged {
            change: CollectionChange::Removed {
                item: removed.item.clone(),
            },
        });
        self.broadcast.publish(&RequirementRemoved {
            item: removed.item.clone(),
        });
        Ok(removed)
    }

    /// Merges imported requirements by identifier. An import that neither adds
    /// nor updates anything leaves the workspace clean.
    pub fn merge_imported(&self, imported: Vec<Requirement>) -> Result<MergeReport, WorkspaceError> {
        if !self.has_project() {
            return Err(WorkspaceError::NoProject);
        }
        let mut staged = self.with_workspace(|ws| ws.requirements.clone()).unwrap_or_default();
        let report = merge_imported(&mut staged, imported);
        if report.is_empty() {
            return Ok(report);
        }

        self.mutate(|ws| {
            ws.requirements = staged;
            Ok(())
        })?;
        self.events.publish(&RequirementsCollectionChanged {
            change: CollectionChange::Merged {
                added: report.added.clone(),
                updated: report.updated.clone(),
            },
        });
        Ok(report)
    }

    pub fn apply_analysis(&self, item: &str, analysis: AnalysisResult) -> Result<(), WorkspaceError> {
        self.mutate(|ws| {
            Self::find_mut(ws, item)?.analysis = Some(analysis);
            Ok(())
        })?;
        self.publish_updated(item, UpdateAspect::Analysis);
        Ok(())
    }

    /// Replaces the description with the analysis' suggested rewrite.
    pub fn apply_suggested_rewrite(&self, item: &str) -> Result<(), WorkspaceError> {
        let rewrite = self
            .with_workspace(|ws| {
                ws.requirement(item)
                    .map(|r| r.analysis.as_ref().and_then(|a| a.suggested_rewrite.clone()))
            })
            .ok_or(WorkspaceError::NoProject)?
            .ok_or_else(|| WorkspaceError::UnknownRequirement(item.to_string()))?
            .ok_or_else(|| WorkspaceError::NoSuggestedRewrite(item.to_string()))?;

        self.edit_requirement(
            item,
            RequirementEdit {
                name: None,
                description: Some(rewrite),
            },
        )?;
        Ok(())
    }

    /// Replaces the generated test cases of one requirement.
    pub fn attach_test_cases(&self, item: &str, cases: Vec<TestCase>) -> Result<(), WorkspaceError> {
        self.mutate(|ws| {
            Self::find_mut(ws, item)?.test_cases = cases;
            Ok(())
        })?;
        self.publish_updated(item, UpdateAspect::TestCases);
        Ok(())
    }

    // --- Internals ---

    /// Applies `f` to the loaded document. On success the revision is bumped
    /// and the workspace marked dirty; on error nothing changes.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Workspace) -> Result<T, WorkspaceError>,
    ) -> Result<T, WorkspaceError> {
        let out = {
            let mut state = self.state.borrow_mut();
            let loaded = state.loaded.as_mut().ok_or(WorkspaceError::NoProject)?;
            let out = f(&mut loaded.document)?;
            state.revision += 1;
            out
        };
        self.set_is_dirty(true);
        Ok(out)
    }

    fn find_mut<'a>(ws: &'a mut Workspace, item: &str) -> Result<&'a mut Requirement, WorkspaceError> {
        ws.requirement_mut(item)
            .ok_or_else(|| WorkspaceError::UnknownRequirement(item.to_string()))
    }

    fn publish_updated(&self, item: &str, aspect: UpdateAspect) {
        self.events.publish(&RequirementUpdated {
            item: item.to_string(),
            aspect,
        });
    }

    fn publish_dirty(&self, value: bool) {
        self.events.publish(&WorkflowStateChanged::<WorkspaceScope>::new(
            StateProperty::IsDirty,
            StateValue::Flag(value),
        ));
        self.broadcast.publish(&DirtyStateChanged { is_dirty: value });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mediator() -> WorkspaceMediator {
        WorkspaceMediator::new(Rc::new(BroadcastBus::new()))
    }

    fn project() -> Workspace {
        let mut ws = Workspace::new("Pump");
        ws.requirements.push(Requirement::new("R-1", "Alpha"));
        ws.requirements.push(Requirement::new("R-2", "Beta"));
        ws
    }

    fn count_dirty_events(m: &WorkspaceMediator) -> Rc<RefCell<Vec<bool>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        m.events()
            .subscribe(move |e: &WorkflowStateChanged<WorkspaceScope>| {
                if let (StateProperty::IsDirty, StateValue::Flag(v)) = (e.property, &e.new_value) {
                    s.borrow_mut().push(*v);
                }
                Ok(())
            });
        seen
    }

    #[test]
    fn set_is_dirty_publishes_once_per_change() {
        let m = mediator();
        let seen = count_dirty_events(&m);

        assert!(m.set_is_dirty(true));
        assert!(!m.set_is_dirty(true));

        assert_eq!(*seen.borrow(), [true]);
        assert!(m.is_dirty());
    }

    #[test]
    fn mutation_marks_dirty_and_bumps_revision() {
        let m = mediator();
        m.open_workspace(project());
        assert!(!m.is_dirty());

        m.edit_requirement(
            "R-1",
            RequirementEdit {
                description: Some("text".into()),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(m.is_dirty());
        assert_eq!(m.revision(), 1);
    }

    #[test]
    fn failed_mutation_changes_nothing() {
        let m = mediator();
        m.open_workspace(project());

        let err = m.add_requirement(Requirement::new("R-1", "dup")).unwrap_err();

        assert_eq!(err, WorkspaceError::DuplicateRequirement("R-1".into()));
        assert!(!m.is_dirty());
        assert_eq!(m.revision(), 0);
    }

    #[test]
    fn noop_edit_stays_clean() {
        let m = mediator();
        m.open_workspace(project());

        let changed = m
            .edit_requirement(
                "R-2",
                RequirementEdit {
                    name: Some("Beta".into()),
                    description: None,
                },
            )
            .unwrap();

        assert!(!changed);
        assert!(!m.is_dirty());
    }

    #[test]
    fn replacing_workspace_closes_then_opens_clean() {
        let bus = Rc::new(BroadcastBus::new());
        let m = WorkspaceMediator::new(bus.clone());
        let log = Rc::new(RefCell::new(Vec::new()));
        {
            let log = log.clone();
            bus.subscribe(move |_: &ProjectClosed| {
                log.borrow_mut().push("closed");
                Ok(())
            });
        }
        {
            let log = log.clone();
            let view = m.requirements_view();
            bus.subscribe(move |e: &ProjectOpened| {
                // The new document is already visible when subscribers run.
                assert_eq!(view.len(), e.requirement_count);
                log.borrow_mut().push("opened");
                Ok(())
            });
        }

        m.open_workspace(project());
        m.set_is_dirty(true);
        let second = m.open_workspace(Workspace::new("Other"));

        assert_eq!(*log.borrow(), ["opened", "closed", "opened"]);
        assert!(!m.is_dirty());
        assert_eq!(m.session(), Some(second));
        assert_eq!(m.project_name().as_deref(), Some("Other"));
    }

    #[test]
    fn save_during_mutation_keeps_dirty() {
        let m = mediator();
        m.open_workspace(project());
        m.remove_requirement("R-2").unwrap();
        let written = m.revision();
        m.add_requirement(Requirement::new("R-3", "Gamma")).unwrap();

        let clean = m.mark_saved(Utf8Path::new("/tmp/p.json"), Utc::now(), written);

        assert!(!clean);
        assert!(m.is_dirty());
        assert_eq!(m.file_path().as_deref(), Some(Utf8Path::new("/tmp/p.json")));
    }

    #[test]
    fn older_write_confirmed_late_marks_dirty_again() {
        let m = mediator();
        m.open_workspace(project());
        m.remove_requirement("R-2").unwrap();
        let older = m.revision();
        m.add_requirement(Requirement::new("R-3", "Gamma")).unwrap();
        let newer = m.revision();
        let seen = count_dirty_events(&m);

        assert!(m.mark_saved(Utf8Path::new("/tmp/p.json"), Utc::now(), newer));
        assert!(!m.mark_saved(Utf8Path::new("/tmp/p.json"), Utc::now(), older));

        assert!(m.is_dirty());
        assert_eq!(*seen.borrow(), [false, true]);
    }

    #[test]
    fn rewrite_requires_suggestion() {
        let m = mediator();
        m.open_workspace(project());
        assert_eq!(
            m.apply_suggested_rewrite("R-1"),
            Err(WorkspaceError::NoSuggestedRewrite("R-1".into()))
        );

        m.apply_analysis(
            "R-1",
            AnalysisResult {
                quality_score: 4,
                issues: vec![],
                suggested_rewrite: Some("The pump shall stop within 2 s.".into()),
                analyzed_at: Utc::now(),
            },
        )
        .unwrap();
        m.apply_suggested_rewrite("R-1").unwrap();

        let description = m
            .requirements_view()
            .get("R-1")
            .map(|r| r.description)
            .unwrap();
        assert_eq!(description, "The pump shall stop within 2 s.");
    }
}
