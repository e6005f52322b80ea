//! Keeps the visible areas (side menu, header, content, notification and
//! navigation strip) consistent with the navigation state.
//!
//! The side menu only ever *requests* navigation; its highlighted entry is
//! updated by the coordinator after the request has been handled, so a click
//! produces exactly one navigation request and no feedback loop.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{debug, warn};

use super::configuration::{ConfigurationProvider, ViewConfiguration};
use super::viewmodel::ContentRef;
use crate::channel::{ChannelEvent, Delivery, EventChannel, Scope, SubscriptionId};
use crate::navigation::{
    NavigationCleared, NavigationContext, NavigationMediator, Section, SectionChangeRequested,
    StepChangeRequested,
};

#[derive(Debug)]
pub struct ViewScope;

impl Scope for ViewScope {
    const NAME: &'static str = "view-areas";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyViewConfiguration {
    pub configuration: ViewConfiguration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedSectionChanged {
    pub section: Section,
}

impl ChannelEvent for ApplyViewConfiguration {
    type Scope = ViewScope;
}

impl ChannelEvent for SelectedSectionChanged {
    type Scope = ViewScope;
}

pub struct SideMenuVm {
    navigation: Rc<NavigationMediator>,
    events: Rc<EventChannel<ViewScope>>,
    selected: Cell<Section>,
}

impl SideMenuVm {
    fn new(navigation: Rc<NavigationMediator>, events: Rc<EventChannel<ViewScope>>) -> Self {
        Self {
            navigation,
            events,
            selected: Cell::new(Section::Default),
        }
    }

    pub fn entries(&self) -> &'static [Section] {
        &Section::MENU
    }

    pub fn selected_section(&self) -> Section {
        self.selected.get()
    }

    /// User picked an entry. Only requests navigation; the highlight follows
    /// once the coordinator has processed the request.
    pub fn select(&self, section: Section) -> Delivery {
        self.navigation.navigate_to_section(section, None)
    }

    fn show_selected(&self, section: Section) -> bool {
        if self.selected.replace(section) == section {
            return false;
        }
        self.events.publish(&SelectedSectionChanged { section });
        true
    }
}

/// Mirrors one slot of the applied configuration.
macro_rules! area_vm {
    ($name:ident, $field:ident, $extract:expr) => {
        pub struct $name {
            $field: RefCell<Option<ContentRef>>,
            subscription: SubscriptionId,
            events: Rc<EventChannel<ViewScope>>,
        }

        impl $name {
            fn new(events: Rc<EventChannel<ViewScope>>) -> Rc<Self> {
                Rc::new_cyclic(|weak: &Weak<Self>| {
                    let weak = weak.clone();
                    let subscription = events.subscribe(move |e: &ApplyViewConfiguration| {
                        if let Some(this) = weak.upgrade() {
                            let extract: fn(&ViewConfiguration) -> Option<ContentRef> = $extract;
                            *this.$field.borrow_mut() = extract(&e.configuration);
                        }
                        Ok(())
                    });
                    Self {
                        $field: RefCell::new(None),
                        subscription,
                        events: events.clone(),
                    }
                })
            }

            pub fn $field(&self) -> Option<ContentRef> {
                self.$field.borrow().clone()
            }
        }

        impl Drop for $name {
            fn drop(&mut self) {
                self.events.unsubscribe(self.subscription);
            }
        }
    };
}

area_vm!(HeaderAreaVm, header, |c| Some(c.header.clone()));
area_vm!(ContentAreaVm, content, |c| Some(c.content.clone()));
area_vm!(NotificationAreaVm, notification, |c| c.notification.clone());

/// Tracks the section and workflow step shown in the navigation strip.
pub struct NavigationAreaVm {
    section: Cell<Section>,
    step: Cell<Option<u32>>,
    navigation: Rc<NavigationMediator>,
    subscriptions: Vec<SubscriptionId>,
}

impl NavigationAreaVm {
    fn new(navigation: Rc<NavigationMediator>) -> Rc<Self> {
        Rc::new_cyclic(|weak: &Weak<Self>| {
            let channel = navigation.channel();
            let on_section = {
                let weak = weak.clone();
                channel.subscribe(move |e: &SectionChangeRequested| {
                    if let Some(this) = weak.upgrade() {
                        this.section.set(e.section);
                        this.step.set(None);
                    }
                    Ok(())
                })
            };
            let on_step = {
                let weak = weak.clone();
                channel.subscribe(move |e: &StepChangeRequested| {
                    if let Some(this) = weak.upgrade() {
                        this.step.set(Some(e.step_id));
                    }
                    Ok(())
                })
            };
            let on_cleared = {
                let weak = weak.clone();
                channel.subscribe(move |_: &NavigationCleared| {
                    if let Some(this) = weak.upgrade() {
                        this.section.set(Section::Default);
                        this.step.set(None);
                    }
                    Ok(())
                })
            };
            Self {
                section: Cell::new(Section::Default),
                step: Cell::new(None),
                navigation: navigation.clone(),
                subscriptions: vec![on_section, on_step, on_cleared],
            }
        })
    }

    pub fn section(&self) -> Section {
        self.section.get()
    }

    pub fn step(&self) -> Option<u32> {
        self.step.get()
    }

    pub fn request_step(&self, step_id: u32) -> Delivery {
        self.navigation.request_step(step_id)
    }
}

impl Drop for NavigationAreaVm {
    fn drop(&mut self) {
        for id in self.subscriptions.drain(..) {
            self.navigation.channel().unsubscribe(id);
        }
    }
}

pub struct ViewAreaCoordinator {
    navigation: Rc<NavigationMediator>,
    provider: Rc<dyn ConfigurationProvider>,
    events: Rc<EventChannel<ViewScope>>,
    side_menu: SideMenuVm,
    header: Rc<HeaderAreaVm>,
    content: Rc<ContentAreaVm>,
    notification: Rc<NotificationAreaVm>,
    navigation_area: Rc<NavigationAreaVm>,
    current: RefCell<Option<ViewConfiguration>>,
    subscriptions: Vec<SubscriptionId>,
}

impl ViewAreaCoordinator {
    pub fn new(
        navigation: Rc<NavigationMediator>,
        provider: Rc<dyn ConfigurationProvider>,
    ) -> Rc<Self> {
        let events = Rc::new(EventChannel::new());
        let coordinator = Rc::new_cyclic(|weak: &Weak<Self>| {
            let channel = navigation.channel();
            let on_request = {
                let weak = weak.clone();
                channel.subscribe(move |e: &SectionChangeRequested| {
                    if let Some(this) = weak.upgrade() {
                        this.on_section_change_requested(e.section, e.context.as_ref());
                    }
                    Ok(())
                })
            };
            let on_cleared = {
                let weak = weak.clone();
                channel.subscribe(move |_: &NavigationCleared| {
                    if let Some(this) = weak.upgrade() {
                        this.reset();
                    }
                    Ok(())
                })
            };

            Self {
                side_menu: SideMenuVm::new(navigation.clone(), events.clone()),
                header: HeaderAreaVm::new(events.clone()),
                content: ContentAreaVm::new(events.clone()),
                notification: NotificationAreaVm::new(events.clone()),
                navigation_area: NavigationAreaVm::new(navigation.clone()),
                navigation: navigation.clone(),
                provider,
                events,
                current: RefCell::new(None),
                subscriptions: vec![on_request, on_cleared],
            }
        });
        coordinator.reset();
        coordinator
    }

    pub fn events(&self) -> &EventChannel<ViewScope> {
        &self.events
    }

    pub fn side_menu(&self) -> &SideMenuVm {
        &self.side_menu
    }

    pub fn header_area(&self) -> &HeaderAreaVm {
        &self.header
    }

    pub fn content_area(&self) -> &ContentAreaVm {
        &self.content
    }

    pub fn notification_area(&self) -> &NotificationAreaVm {
        &self.notification
    }

    pub fn navigation_area(&self) -> &NavigationAreaVm {
        &self.navigation_area
    }

    pub fn current_configuration(&self) -> Option<ViewConfiguration> {
        self.current.borrow().clone()
    }

    fn on_section_change_requested(&self, section: Section, context: Option<&NavigationContext>) {
        match self.provider.configuration_for(section, context) {
            Ok(configuration) => {
                self.apply(&configuration);
                self.navigation.set_active_header(configuration.header.clone());
                self.navigation.set_main_content(configuration.content.clone());
                if let Some(notification) = &configuration.notification {
                    self.navigation.set_notification_content(notification.clone());
                }
            }
            Err(e) => {
                warn!(section = %section, "view configuration failed; keeping current view: {e:#}");
            }
        }
        self.side_menu.show_selected(section);
    }

    /// Shows the default configuration without writing navigation slots, so the
    /// navigation state stays in its initial (cleared) form.
    fn reset(&self) {
        match self.provider.configuration_for(Section::Default, None) {
            Ok(configuration) => self.apply(&configuration),
            Err(e) => warn!("default view configuration unavailable: {e:#}"),
        }
        self.side_menu.show_selected(Section::Default);
    }

    fn apply(&self, configuration: &ViewConfiguration) {
        debug!(section = %configuration.section, "applying view configuration");
        *self.current.borrow_mut() = Some(configuration.clone());
        self.events.publish(&ApplyViewConfiguration {
            configuration: configuration.clone(),
        });
    }
}

impl Drop for ViewAreaCoordinator {
    fn drop(&mut self) {
        for id in self.subscriptions.drain(..) {
            self.navigation.channel().unsubscribe(id);
        }
    }
}
