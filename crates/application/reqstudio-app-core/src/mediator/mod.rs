//! Domain mediators.
//!
//! Each mediator is the single owner of one domain's mutable state and of that
//! domain's event channel. State changes and the matching event publish happen
//! inside the same call. Domains inform each other only through the
//! [`BroadcastBus`], whose notification types form their own scope and cannot
//! be confused with any domain-local event.

use std::fmt;
use std::marker::PhantomData;

use reqstudio_core::RequirementItem;
use uuid::Uuid;

use crate::channel::{ChannelEvent, EventChannel, Scope};

pub mod generation;
pub mod workspace;

pub use generation::{GenerationScope, RequirementSelected, TestCaseGenerationMediator};
pub use workspace::{
    CollectionChange, RequirementEdit, RequirementUpdated, RequirementsCollectionChanged,
    RequirementsView, UpdateAspect, WorkspaceError, WorkspaceMediator, WorkspaceSaved,
    WorkspaceScope,
};

/// Identifies one loaded workspace, from open to close. Background work is
/// tagged with the session it started in.
pub type SessionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateProperty {
    IsDirty,
    CurrentRequirement,
    IsBusy,
}

impl StateProperty {
    pub fn as_str(self) -> &'static str {
        match self {
            StateProperty::IsDirty => "IsDirty",
            StateProperty::CurrentRequirement => "CurrentRequirement",
            StateProperty::IsBusy => "IsBusy",
        }
    }
}

impl fmt::Display for StateProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateValue {
    Flag(bool),
    Item(Option<RequirementItem>),
}

/// Published by a mediator whenever one of its observable properties changes.
/// Generic over the scope so each domain gets its own event type.
pub struct WorkflowStateChanged<S> {
    pub property: StateProperty,
    pub new_value: StateValue,
    _scope: PhantomData<fn() -> S>,
}

impl<S> WorkflowStateChanged<S> {
    pub fn new(property: StateProperty, new_value: StateValue) -> Self {
        Self {
            property,
            new_value,
            _scope: PhantomData,
        }
    }
}

impl<S> fmt::Debug for WorkflowStateChanged<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowStateChanged")
            .field("property", &self.property)
            .field("new_value", &self.new_value)
            .finish()
    }
}

impl<S: Scope> ChannelEvent for WorkflowStateChanged<S> {
    type Scope = S;
}

// --- Broadcast notifications ---

#[derive(Debug)]
pub struct BroadcastScope;

impl Scope for BroadcastScope {
    const NAME: &'static str = "broadcast";
}

pub type BroadcastBus = EventChannel<BroadcastScope>;

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectOpened {
    pub session: SessionId,
    pub project_name: String,
    pub requirement_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectClosed {
    pub session: SessionId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequirementRemoved {
    pub item: RequirementItem,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirtyStateChanged {
    pub is_dirty: bool,
}

impl ChannelEvent for ProjectOpened {
    type Scope = BroadcastScope;
}

impl ChannelEvent for ProjectClosed {
    type Scope = BroadcastScope;
}

impl ChannelEvent for RequirementRemoved {
    type Scope = BroadcastScope;
}

impl ChannelEvent for DirtyStateChanged {
    type Scope = BroadcastScope;
}
