//! Test-case generation domain: owns the current requirement selection and
//! the busy flag while analysis or generation work is in flight.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use reqstudio_core::RequirementItem;
use tracing::debug;

use super::workspace::{RequirementsView, WorkspaceError};
use super::{
    BroadcastBus, BroadcastScope, ProjectClosed, RequirementRemoved, StateProperty, StateValue,
    WorkflowStateChanged,
};
use crate::channel::{ChannelEvent, Delivery, EventChannel, Scope, SubscriptionId};

#[derive(Debug)]
pub struct GenerationScope;

impl Scope for GenerationScope {
    const NAME: &'static str = "test-case-generation";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementSelected {
    pub item: RequirementItem,
    pub title: String,
}

impl ChannelEvent for RequirementSelected {
    type Scope = GenerationScope;
}

#[derive(Debug, Default)]
struct GenerationState {
    current_requirement: Option<RequirementItem>,
    is_busy: bool,
}

pub struct TestCaseGenerationMediator {
    state: RefCell<GenerationState>,
    events: EventChannel<GenerationScope>,
    broadcast: Rc<BroadcastBus>,
    requirements: RequirementsView,
    subscriptions: Vec<SubscriptionId>,
}

impl TestCaseGenerationMediator {
    /// Subscribes to the broadcast notifications this domain reacts to:
    /// a closed project or a removed requirement drops the selection.
    pub fn new(broadcast: Rc<BroadcastBus>, requirements: RequirementsView) -> Rc<Self> {
        Rc::new_cyclic(|weak: &Weak<Self>| {
            let on_closed = {
                let weak = weak.clone();
                broadcast.subscribe(move |_: &ProjectClosed| {
                    if let Some(this) = weak.upgrade() {
                        this.clear_selection();
                    }
                    Ok(())
                })
            };
            let on_removed = {
                let weak = weak.clone();
                broadcast.subscribe(move |e: &RequirementRemoved| {
                    if let Some(this) = weak.upgrade() {
                        if this.current_requirement().as_deref() == Some(e.item.as_str()) {
                            this.clear_selection();
                        }
                    }
                    Ok(())
                })
            };

            Self {
                state: RefCell::new(GenerationState::default()),
                events: EventChannel::new(),
                broadcast: broadcast.clone(),
                requirements,
                subscriptions: vec![on_closed, on_removed],
            }
        })
    }

    pub fn events(&self) -> &EventChannel<GenerationScope> {
        &self.events
    }

    pub fn requirements(&self) -> &RequirementsView {
        &self.requirements
    }

    pub fn current_requirement(&self) -> Option<RequirementItem> {
        self.state.borrow().current_requirement.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.state.borrow().is_busy
    }

    /// Makes `item` the current requirement. Publishes `RequirementSelected`
    /// only when the selection actually changes.
    pub fn select_requirement(&self, item: &str) -> Result<bool, WorkspaceError> {
        let requirement = self
            .requirements
            .get(item)
            .ok_or_else(|| WorkspaceError::UnknownRequirement(item.to_string()))?;

        {
            let mut state = self.state.borrow_mut();
            if state.current_requirement.as_deref() == Some(requirement.item.as_str()) {
                return Ok(false);
            }
            state.current_requirement = Some(requirement.item.clone());
        }

        debug!(item = %requirement.item, "requirement selected");
        self.events.publish(&WorkflowStateChanged::<GenerationScope>::new(
            StateProperty::CurrentRequirement,
            StateValue::Item(Some(requirement.item.clone())),
        ));
        self.events.publish(&RequirementSelected {
            title: requirement.display_title(),
            item: requirement.item,
        });
        Ok(true)
    }

    pub fn clear_selection(&self) -> bool {
        if self.state.borrow_mut().current_requirement.take().is_none() {
            return false;
        }
        self.events.publish(&WorkflowStateChanged::<GenerationScope>::new(
            StateProperty::CurrentRequirement,
            StateValue::Item(None),
        ));
        true
    }

    pub fn set_is_busy(&self, value: bool) -> bool {
        {
            let mut state = self.state.borrow_mut();
            if state.is_busy == value {
                return false;
            }
            state.is_busy = value;
        }
        self.events.publish(&WorkflowStateChanged::<GenerationScope>::new(
            StateProperty::IsBusy,
            StateValue::Flag(value),
        ));
        true
    }

    pub fn publish_event<E>(&self, event: &E) -> Delivery
    where
        E: ChannelEvent<Scope = GenerationScope>,
    {
        self.events.publish(event)
    }

    pub fn broadcast_to_all_domains<N>(&self, notification: &N) -> Delivery
    where
        N: ChannelEvent<Scope = BroadcastScope>,
    {
        self.broadcast.publish(notification)
    }
}

impl Drop for TestCaseGenerationMediator {
    fn drop(&mut self) {
        for id in self.subscriptions.drain(..) {
            self.broadcast.unsubscribe(id);
        }
    }
}
