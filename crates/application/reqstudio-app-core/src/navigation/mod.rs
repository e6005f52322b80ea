//! Cross-domain navigation channel.
//!
//! The navigation mediator carries navigation intents and holds the active
//! content slots. It never decides what a section shows and never looks inside
//! the content references it stores.

use std::cell::RefCell;

use reqstudio_core::RequirementItem;

use crate::channel::{ChannelEvent, Delivery, EventChannel, Scope};
use crate::view::ContentRef;

pub mod section;

pub use section::Section;

#[derive(Debug)]
pub struct NavigationScope;

impl Scope for NavigationScope {
    const NAME: &'static str = "navigation";
}

/// Optional payload of a section change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationContext {
    /// Structured reference to a requirement.
    Requirement { item: RequirementItem },
    /// A title as shown by a view (`"<item> - <name>"`); resolved by matching.
    DisplayedTitle(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionChangeRequested {
    pub section: Section,
    pub context: Option<NavigationContext>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepChangeRequested {
    pub step_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentSlot {
    Header,
    Main,
    Notification,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChanged {
    pub slot: ContentSlot,
    pub content: Option<ContentRef>,
}

/// Published when the navigation state returns to its initial state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationCleared;

impl ChannelEvent for SectionChangeRequested {
    type Scope = NavigationScope;
}

impl ChannelEvent for StepChangeRequested {
    type Scope = NavigationScope;
}

impl ChannelEvent for ContentChanged {
    type Scope = NavigationScope;
}

impl ChannelEvent for NavigationCleared {
    type Scope = NavigationScope;
}

/// Every navigation message is exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
    SectionChangeRequested(SectionChangeRequested),
    StepChangeRequested(StepChangeRequested),
    ContentChanged(ContentChanged),
}

impl From<SectionChangeRequested> for NavigationEvent {
    fn from(e: SectionChangeRequested) -> Self {
        NavigationEvent::SectionChangeRequested(e)
    }
}

impl From<StepChangeRequested> for NavigationEvent {
    fn from(e: StepChangeRequested) -> Self {
        NavigationEvent::StepChangeRequested(e)
    }
}

impl From<ContentChanged> for NavigationEvent {
    fn from(e: ContentChanged) -> Self {
        NavigationEvent::ContentChanged(e)
    }
}

#[derive(Debug, Default)]
struct NavigationState {
    section: Section,
    header: Option<ContentRef>,
    main: Option<ContentRef>,
    notification: Option<ContentRef>,
    step: Option<u32>,
}

impl NavigationState {
    fn is_initial(&self) -> bool {
        self.section == Section::Default
            && self.header.is_none()
            && self.main.is_none()
            && self.notification.is_none()
            && self.step.is_none()
    }

    fn slot_mut(&mut self, slot: ContentSlot) -> &mut Option<ContentRef> {
        match slot {
            ContentSlot::Header => &mut self.header,
            ContentSlot::Main => &mut self.main,
            ContentSlot::Notification => &mut self.notification,
        }
    }
}

#[derive(Debug, Default)]
pub struct NavigationMediator {
    channel: EventChannel<NavigationScope>,
    state: RefCell<NavigationState>,
}

impl NavigationMediator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(&self) -> &EventChannel<NavigationScope> {
        &self.channel
    }

    pub fn navigate_to_section(
        &self,
        section: Section,
        context: Option<NavigationContext>,
    ) -> Delivery {
        self.dispatch(SectionChangeRequested { section, context }.into())
    }

    /// Boundary entry point for free-form names; unknown names navigate to
    /// [`Section::Default`].
    pub fn navigate_to(&self, name: &str, context: Option<NavigationContext>) -> Section {
        let section = Section::parse(name);
        self.navigate_to_section(section, context);
        section
    }

    pub fn request_step(&self, step_id: u32) -> Delivery {
        self.dispatch(StepChangeRequested { step_id }.into())
    }

    pub fn set_active_header(&self, header: ContentRef) -> Delivery {
        self.set_content(ContentSlot::Header, header)
    }

    pub fn set_main_content(&self, content: ContentRef) -> Delivery {
        self.set_content(ContentSlot::Main, content)
    }

    pub fn set_notification_content(&self, content: ContentRef) -> Delivery {
        self.set_content(ContentSlot::Notification, content)
    }

    fn set_content(&self, slot: ContentSlot, content: ContentRef) -> Delivery {
        self.dispatch(
            ContentChanged {
                slot,
                content: Some(content),
            }
            .into(),
        )
    }

    /// Applies the state transition carried by `event`, then publishes it.
    /// The section only ever changes here, in response to a
    /// `SectionChangeRequested`.
    pub fn dispatch(&self, event: NavigationEvent) -> Delivery {
        match event {
            NavigationEvent::SectionChangeRequested(e) => {
                self.state.borrow_mut().section = e.section;
                self.channel.publish(&e)
            }
            NavigationEvent::StepChangeRequested(e) => {
                self.state.borrow_mut().step = Some(e.step_id);
                self.channel.publish(&e)
            }
            NavigationEvent::ContentChanged(e) => {
                {
                    let mut state = self.state.borrow_mut();
                    let slot = state.slot_mut(e.slot);
                    if *slot == e.content {
                        return Delivery::default();
                    }
                    slot.clone_from(&e.content);
                }
                self.channel.publish(&e)
            }
        }
    }

    /// Returns to the initial state. Idempotent: a second call finds nothing
    /// to clear and publishes nothing.
    pub fn clear_navigation_state(&self) -> bool {
        {
            let mut state = self.state.borrow_mut();
            if state.is_initial() {
                return false;
            }
            *state = NavigationState::default();
        }
        self.channel.publish(&NavigationCleared);
        true
    }

    pub fn current_section(&self) -> Section {
        self.state.borrow().section
    }

    pub fn active_header(&self) -> Option<ContentRef> {
        self.state.borrow().header.clone()
    }

    pub fn main_content(&self) -> Option<ContentRef> {
        self.state.borrow().main.clone()
    }

    pub fn notification_content(&self) -> Option<ContentRef> {
        self.state.borrow().notification.clone()
    }

    pub fn active_step(&self) -> Option<u32> {
        self.state.borrow().step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::AreaRole;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn starts_in_default_section() {
        let nav = NavigationMediator::new();
        assert_eq!(nav.current_section(), Section::Default);
        assert!(nav.main_content().is_none());
    }

    #[test]
    fn section_changes_only_through_requests() {
        let nav = NavigationMediator::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        nav.channel().subscribe(move |e: &SectionChangeRequested| {
            s.borrow_mut().push(e.section);
            Ok(())
        });

        assert_eq!(nav.navigate_to("Test Case Creator", None), Section::TestCaseCreator);
        nav.dispatch(
            SectionChangeRequested {
                section: Section::Import,
                context: None,
            }
            .into(),
        );

        assert_eq!(*seen.borrow(), [Section::TestCaseCreator, Section::Import]);
        assert_eq!(nav.current_section(), Section::Import);
    }

    #[test]
    fn identical_content_is_not_republished() {
        let nav = NavigationMediator::new();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        nav.channel().subscribe(move |_: &ContentChanged| {
            c.set(c.get() + 1);
            Ok(())
        });

        let header = ContentRef::new(Section::Project, AreaRole::Header);
        nav.set_active_header(header.clone());
        nav.set_active_header(header.clone());
        nav.set_active_header(ContentRef::new(Section::Project, AreaRole::Header));

        assert_eq!(count.get(), 2);
    }

    #[test]
    fn clear_is_idempotent() {
        let nav = NavigationMediator::new();
        let cleared = Rc::new(Cell::new(0));
        let c = cleared.clone();
        nav.channel().subscribe(move |_: &NavigationCleared| {
            c.set(c.get() + 1);
            Ok(())
        });

        nav.navigate_to_section(Section::Requirements, None);
        nav.set_main_content(ContentRef::new(Section::Requirements, AreaRole::Content));
        nav.request_step(2);

        assert!(nav.clear_navigation_state());
        assert!(!nav.clear_navigation_state());

        assert_eq!(cleared.get(), 1);
        assert_eq!(nav.current_section(), Section::Default);
        assert!(nav.main_content().is_none());
        assert_eq!(nav.active_step(), None);
    }
}
