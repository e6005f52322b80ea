//! Coordination core of the requirements studio: typed event channels, domain
//! mediators, navigation, view configuration and the application kernel that
//! ties them to background collaborators.

mod async_runtime;
pub mod channel;
pub mod domain;
pub mod kernel;
pub mod mediator;
pub mod navigation;
pub mod notifications;
pub mod ports;
pub mod view;

pub use channel::{ChannelEvent, Delivery, EventChannel, Scope, SubscriptionId};
pub use domain::AppSettings;
pub use kernel::{AppKernel, Completion, ImportOutcome, KernelBuilder, KernelError, WiringError};
pub use mediator::{
    BroadcastBus, BroadcastScope, DirtyStateChanged, ProjectClosed, ProjectOpened,
    RequirementRemoved, SessionId, StateProperty, StateValue, TestCaseGenerationMediator,
    WorkflowStateChanged, WorkspaceMediator,
};
pub use navigation::{NavigationContext, NavigationEvent, NavigationMediator, Section};
pub use notifications::{Notification, NotificationCenter, Severity};
pub use ports::*;
pub use view::{ViewAreaCoordinator, ViewConfiguration, ViewConfigurationFactory};
