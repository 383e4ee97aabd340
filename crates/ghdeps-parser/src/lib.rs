// Dependency report extraction
// Finds the CMake "Dependency report" block in a CI job log and sorts its lines

pub mod models;
pub mod parsers;

pub use models::{DependencyCategory, DependencyEntry, DependencyReport, ReportBuilder};
pub use parsers::{clean_line, extract_section, parse, parse_section};
