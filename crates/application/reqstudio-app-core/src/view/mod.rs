pub mod configuration;
pub mod coordinator;
pub mod requirement_sync;
pub mod viewmodel;

pub use configuration::{ConfigurationProvider, ViewConfiguration, ViewConfigurationFactory};
pub use coordinator::{
    ApplyViewConfiguration, ContentAreaVm, HeaderAreaVm, NavigationAreaVm, NotificationAreaVm,
    SelectedSectionChanged, SideMenuVm, ViewAreaCoordinator, ViewScope,
};
pub use requirement_sync::{synchronize_requirement_context, RequirementHint, SyncOutcome};
pub use viewmodel::{AreaRole, ContentRef, SectionView, ViewState};
