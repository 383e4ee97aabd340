use serde::{Deserialize, Serialize};

/// A single package line from the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEntry {
    pub package: String,
    pub version: Option<String>,
}

impl DependencyEntry {
    pub fn new(package: impl Into<String>, version: Option<String>) -> Self {
        Self {
            package: package.into(),
            version,
        }
    }
}

/// Which bucket of the report a package landed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyCategory {
    FoundExternally,
    TooOld,
    BuiltLocally,
    NotFound,
}

impl DependencyCategory {
    pub const ALL: [DependencyCategory; 4] = [
        DependencyCategory::FoundExternally,
        DependencyCategory::TooOld,
        DependencyCategory::BuiltLocally,
        DependencyCategory::NotFound,
    ];

    /// Key used for this category in the JSON output
    pub fn key(&self) -> &'static str {
        match self {
            DependencyCategory::FoundExternally => "dependencies_found_externally",
            DependencyCategory::TooOld => "dependencies_too_old",
            DependencyCategory::BuiltLocally => "dependencies_built_locally",
            DependencyCategory::NotFound => "dependencies_not_found",
        }
    }
}

impl std::fmt::Display for DependencyCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DependencyCategory::FoundExternally => write!(f, "found externally"),
            DependencyCategory::TooOld => write!(f, "too old"),
            DependencyCategory::BuiltLocally => write!(f, "built locally"),
            DependencyCategory::NotFound => write!(f, "not found"),
        }
    }
}

/// Parsed dependency report for one job log
///
/// Built through [`ReportBuilder`]; read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyReport {
    #[serde(rename = "dependencies_found_externally", default)]
    found_externally: Vec<DependencyEntry>,
    #[serde(rename = "dependencies_too_old", default)]
    too_old: Vec<DependencyEntry>,
    #[serde(rename = "dependencies_built_locally", default)]
    built_locally: Vec<DependencyEntry>,
    #[serde(rename = "dependencies_not_found", default)]
    not_found: Vec<DependencyEntry>,
}

impl DependencyReport {
    pub fn entries(&self, category: DependencyCategory) -> &[DependencyEntry] {
        match category {
            DependencyCategory::FoundExternally => &self.found_externally,
            DependencyCategory::TooOld => &self.too_old,
            DependencyCategory::BuiltLocally => &self.built_locally,
            DependencyCategory::NotFound => &self.not_found,
        }
    }

    pub fn found_externally(&self) -> &[DependencyEntry] {
        &self.found_externally
    }

    pub fn too_old(&self) -> &[DependencyEntry] {
        &self.too_old
    }

    pub fn built_locally(&self) -> &[DependencyEntry] {
        &self.built_locally
    }

    pub fn not_found(&self) -> &[DependencyEntry] {
        &self.not_found
    }

    pub fn total_count(&self) -> usize {
        DependencyCategory::ALL
            .iter()
            .map(|c| self.entries(*c).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_count() == 0
    }

    fn entries_mut(&mut self, category: DependencyCategory) -> &mut Vec<DependencyEntry> {
        match category {
            DependencyCategory::FoundExternally => &mut self.found_externally,
            DependencyCategory::TooOld => &mut self.too_old,
            DependencyCategory::BuiltLocally => &mut self.built_locally,
            DependencyCategory::NotFound => &mut self.not_found,
        }
    }
}

/// Accumulates entries while a log is being scanned
#[derive(Debug, Default)]
pub struct ReportBuilder {
    report: DependencyReport,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. A package already present in the same category is
    /// overwritten in place, so the last mention wins but keeps the first slot.
    pub fn push(&mut self, category: DependencyCategory, entry: DependencyEntry) {
        let list = self.report.entries_mut(category);
        match list.iter_mut().find(|e| e.package == entry.package) {
            Some(existing) => *existing = entry,
            None => list.push(entry),
        }
    }

    pub fn build(self) -> DependencyReport {
        self.report
    }
}
