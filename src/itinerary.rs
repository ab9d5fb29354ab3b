//! Pipeline result and its text output

use crate::Result;
use crate::pipeline::StageOutput;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Itinerary {
    pub request: String,
    pub stages: Vec<StageOutput>,
}

impl Itinerary {
    #[must_use]
    pub fn new(request: impl Into<String>, stages: Vec<StageOutput>) -> Self {
        Self {
            request: request.into(),
            stages,
        }
    }

    /// Output of the last stage; empty when nothing ran
    #[must_use]
    pub fn final_text(&self) -> &str {
        self.stages.last().map_or("", |s| s.text.as_str())
    }

    /// The customer-facing document
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut text = self.final_text().trim_end().to_string();
        text.push('\n');
        text
    }

    /// Write the Markdown document, creating parent directories as needed
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_markdown())?;
        info!("Itinerary written to {}", path.display());
        Ok(())
    }
}
