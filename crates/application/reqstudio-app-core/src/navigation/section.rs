use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Top-level navigation destinations. External names (menu keys, persisted
/// "last section" strings) are resolved into this enum once, by
/// [`Section::parse`]; everything past that boundary dispatches on variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Section {
    #[default]
    Default,
    Project,
    Requirements,
    TestCaseCreator,
    TestFlow,
    Import,
    NewProject,
}

impl Section {
    pub const ALL: [Section; 7] = [
        Section::Default,
        Section::Project,
        Section::Requirements,
        Section::TestCaseCreator,
        Section::TestFlow,
        Section::Import,
        Section::NewProject,
    ];

    /// Sections offered in the side menu, in display order.
    pub const MENU: [Section; 5] = [
        Section::Project,
        Section::Requirements,
        Section::TestCaseCreator,
        Section::TestFlow,
        Section::Import,
    ];

    /// Canonical key, stable across releases (persisted in settings).
    pub fn as_str(self) -> &'static str {
        match self {
            Section::Default => "default",
            Section::Project => "project",
            Section::Requirements => "requirements",
            Section::TestCaseCreator => "testcase",
            Section::TestFlow => "testflow",
            Section::Import => "import",
            Section::NewProject => "newproject",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Section::Default => "Home",
            Section::Project => "Project",
            Section::Requirements => "Requirements",
            Section::TestCaseCreator => "Test Case Creator",
            Section::TestFlow => "Test Flow",
            Section::Import => "Import",
            Section::NewProject => "New Project",
        }
    }

    /// Accepted spellings after normalization (lowercase, no spaces, dashes or
    /// underscores).
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Section::Default => &["default", "initial", "home"],
            Section::Project => &["project", "projects"],
            Section::Requirements => &["requirements", "requirement"],
            Section::TestCaseCreator => &[
                "testcase",
                "testcases",
                "testcasecreator",
                "testcasegenerator",
            ],
            Section::TestFlow => &["testflow", "testflows", "testflowcreator"],
            Section::Import => &["import", "imports"],
            Section::NewProject => &["newproject"],
        }
    }

    /// Strict lookup: `None` for names no section claims.
    pub fn recognize(name: &str) -> Option<Section> {
        let key = normalize(name);
        Section::ALL
            .into_iter()
            .find(|s| s.aliases().contains(&key.as_str()))
    }

    /// Total lookup: unknown names resolve to [`Section::Default`].
    pub fn parse(name: &str) -> Section {
        Section::recognize(name).unwrap_or_default()
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Section {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Section::parse(s))
    }
}
