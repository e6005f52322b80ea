use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use uuid::Uuid;

use crate::navigation::Section;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AreaRole {
    Header,
    Content,
    Notification,
}

/// Per-instance UI state that must survive navigating away and back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub scroll_offset: f32,
    /// Unsaved text in an editor field.
    pub draft: Option<String>,
    /// Requirement title the view is currently showing.
    pub displayed_title: Option<String>,
    pub active_step: Option<u32>,
}

#[derive(Debug)]
pub struct SectionView {
    id: Uuid,
    section: Section,
    role: AreaRole,
    state: RefCell<ViewState>,
}

impl SectionView {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn section(&self) -> Section {
        self.section
    }

    pub fn role(&self) -> AreaRole {
        self.role
    }

    pub fn state(&self) -> ViewState {
        self.state.borrow().clone()
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut ViewState) -> R) -> R {
        f(&mut self.state.borrow_mut())
    }

    pub fn displayed_title(&self) -> Option<String> {
        self.state.borrow().displayed_title.clone()
    }
}

/// Shared handle to a view-model instance. Equality is identity: two refs are
/// equal only if they point at the same instance.
#[derive(Clone)]
pub struct ContentRef(Rc<SectionView>);

impl ContentRef {
    pub fn new(section: Section, role: AreaRole) -> Self {
        Self(Rc::new(SectionView {
            id: Uuid::new_v4(),
            section,
            role,
            state: RefCell::new(ViewState::default()),
        }))
    }
}

impl Deref for ContentRef {
    type Target = SectionView;

    fn deref(&self) -> &SectionView {
        &self.0
    }
}

impl PartialEq for ContentRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ContentRef {}

impl fmt::Debug for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ContentRef({}/{:?}/{})",
            self.0.section.as_str(),
            self.0.role,
            self.0.id.simple()
        )
    }
}
