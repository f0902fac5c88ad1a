//! Report rendering
//!
//! Composes the fixed-layout report of a finished job:
//! - page 1: `Parameter | Value` table of the flattened parameters, styled
//!   header row, generation timestamp in the top-right corner
//! - page 2: the result plot, only when an image is available
//!
//! A report without page 2 is complete. The output path is always
//! overwritten.

mod pdf;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use simjob_core::SimJobError;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub use pdf::ROWS_PER_PAGE;

/// Laid-out report, ready to be written
#[derive(Debug, Clone)]
pub struct ReportDocument {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    /// `(parameter, value)` rows of the table
    pub rows: Vec<(String, String)>,
    /// Image shown on the result page
    pub image: Option<PathBuf>,
}

impl ReportDocument {
    /// Pages taken by the parameter table
    pub fn table_pages(&self) -> usize {
        self.rows.len().div_ceil(ROWS_PER_PAGE).max(1)
    }

    pub fn page_count(&self) -> usize {
        self.table_pages() + usize::from(self.image.is_some())
    }
}

/// Renders reports with a fixed title
#[derive(Debug, Clone)]
pub struct ReportRenderer {
    title: String,
}

impl Default for ReportRenderer {
    fn default() -> Self {
        Self::new("Simulation Report")
    }
}

/// Renders a report with the default title
pub fn render(
    params: &Map<String, Value>,
    image_path: Option<&Path>,
    out_path: &Path,
) -> Result<ReportDocument, SimJobError> {
    ReportRenderer::default().render(params, image_path, out_path)
}

impl ReportRenderer {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    /// Lays out the report without writing it
    pub fn layout(&self, params: &Map<String, Value>, image_path: Option<&Path>) -> ReportDocument {
        let image = match image_path {
            Some(path) if path.is_file() => Some(path.to_path_buf()),
            Some(path) => {
                warn!("Report image {:?} not found, omitting result page", path);
                None
            }
            None => {
                warn!("No report image available, omitting result page");
                None
            }
        };

        ReportDocument {
            title: self.title.clone(),
            generated_at: Utc::now(),
            rows: flatten_params(params),
            image,
        }
    }

    /// Lays out and writes the report to `out_path`
    pub fn render(
        &self,
        params: &Map<String, Value>,
        image_path: Option<&Path>,
        out_path: &Path,
    ) -> Result<ReportDocument, SimJobError> {
        let mut document = self.layout(params, image_path);

        let image = match &document.image {
            Some(path) => match pdf::load_image(path) {
                Ok(image) => Some(image),
                Err(e) => {
                    warn!("Report image {:?} unreadable, omitting result page: {}", path, e);
                    None
                }
            },
            None => None,
        };
        if image.is_none() {
            document.image = None;
        }

        if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SimJobError::file(parent, e))?;
        }
        pdf::write_pdf(&document, image.as_ref(), out_path)?;

        info!(
            "Report written to {:?} ({} page(s))",
            out_path,
            document.page_count()
        );
        Ok(document)
    }
}

/// Flattens parameters into table rows
///
/// Nested groups become `"{group}_{subkey}"` rows, recursively. Keys keep
/// the map's order.
pub fn flatten_params(params: &Map<String, Value>) -> Vec<(String, String)> {
    let mut rows = Vec::new();
    for (key, value) in params {
        flatten_into(key, value, &mut rows);
    }
    rows
}

fn flatten_into(prefix: &str, value: &Value, rows: &mut Vec<(String, String)>) {
    match value {
        Value::Object(group) => {
            for (key, nested) in group {
                flatten_into(&format!("{prefix}_{key}"), nested, rows);
            }
        }
        other => rows.push((prefix.to_string(), format_value(other))),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
