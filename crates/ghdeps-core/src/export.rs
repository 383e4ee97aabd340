use crate::{models::ReportDocument, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the report document
pub struct Exporter;

impl Exporter {
    /// Pretty JSON with two-space indentation
    pub fn to_json(doc: &ReportDocument) -> Result<String> {
        Ok(serde_json::to_string_pretty(doc)?)
    }

    /// Write the document to `path`, or stdout when no path is given
    pub fn write(doc: &ReportDocument, path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => Self::export_to_file(doc, path),
            None => {
                let stdout = std::io::stdout();
                Self::write_to(doc, &mut stdout.lock())
            }
        }
    }

    pub fn export_to_file<P: AsRef<Path>>(doc: &ReportDocument, path: P) -> Result<()> {
        let mut file = File::create(path)?;
        Self::write_to(doc, &mut file)
    }

    pub fn write_to<W: Write>(doc: &ReportDocument, out: &mut W) -> Result<()> {
        let json = Self::to_json(doc)?;
        out.write_all(json.as_bytes())?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }
}
