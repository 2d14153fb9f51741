//! Tutorial identifiers - the closed set of pages whose progress is tracked.

use serde::{Deserialize, Serialize};

/// Error returned when a string does not name a recognized tutorial.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tutorial: {0}")]
pub struct UnknownTutorial(pub String);

/// Identifier of one tutorial page.
///
/// The set is fixed; identifiers arriving as strings must go through
/// [`str::parse`] so that unknown names are rejected before they reach
/// the progress store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TutorialId {
    /// `assignment-overview`
    AssignmentOverview,
    /// `npm-basics`
    NpmBasics,
    /// `package-json-guide`
    PackageJsonGuide,
    /// `vscode-setup`
    VscodeSetup,
    /// `npm-scripts-tutorial`
    NpmScriptsTutorial,
    /// `development-servers`
    DevelopmentServers,
    /// `troubleshooting`
    Troubleshooting,
    /// `evidence-guide`
    EvidenceGuide,
}

impl TutorialId {
    /// Every tutorial, in the order they are presented.
    pub const ALL: [TutorialId; 8] = [
        TutorialId::AssignmentOverview,
        TutorialId::NpmBasics,
        TutorialId::PackageJsonGuide,
        TutorialId::VscodeSetup,
        TutorialId::NpmScriptsTutorial,
        TutorialId::DevelopmentServers,
        TutorialId::Troubleshooting,
        TutorialId::EvidenceGuide,
    ];

    /// Number of recognized tutorials.
    pub const COUNT: usize = Self::ALL.len();

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TutorialId::AssignmentOverview => "assignment-overview",
            TutorialId::NpmBasics => "npm-basics",
            TutorialId::PackageJsonGuide => "package-json-guide",
            TutorialId::VscodeSetup => "vscode-setup",
            TutorialId::NpmScriptsTutorial => "npm-scripts-tutorial",
            TutorialId::DevelopmentServers => "development-servers",
            TutorialId::Troubleshooting => "troubleshooting",
            TutorialId::EvidenceGuide => "evidence-guide",
        }
    }

    /// Human readable title.
    pub fn title(&self) -> &'static str {
        match self {
            TutorialId::AssignmentOverview => "Assignment Overview",
            TutorialId::NpmBasics => "npm Basics",
            TutorialId::PackageJsonGuide => "package.json Guide",
            TutorialId::VscodeSetup => "VS Code Setup",
            TutorialId::NpmScriptsTutorial => "npm Scripts",
            TutorialId::DevelopmentServers => "Development Servers",
            TutorialId::Troubleshooting => "Troubleshooting",
            TutorialId::EvidenceGuide => "Evidence Guide",
        }
    }

    /// Resolve the tutorial served at a page path such as
    /// `/docs/npm-basics.html`.
    ///
    /// Returns `None` for the hub page (`index`) and for anything that is
    /// not a tutorial.
    pub fn from_page_path(path: &str) -> Option<Self> {
        let file = path.rsplit('/').next().unwrap_or(path);
        let name = file.strip_suffix(".html").unwrap_or(file);
        if name.is_empty() || name == "index" {
            return None;
        }
        name.parse().ok()
    }
}

impl std::fmt::Display for TutorialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for TutorialId {
    type Err = UnknownTutorial;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| UnknownTutorial(s.to_string()))
    }
}
