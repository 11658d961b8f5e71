//! Generated files and the idempotent write.
use std::path::PathBuf;

use tracing::{debug, info};

/// Fixed banner at the top of every generated file.
pub const HEADER: [&str; 3] = [
    "// This file is generated automatically! Please do not change it manually",
    "// ALL CHANGES WILL BE LOST",
    "",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputFile {
    pub path: PathBuf,
    /// import block, then declarations; empty sections are dropped
    pub sections: Vec<String>,
}

impl OutputFile {
    pub fn new(path: impl Into<PathBuf>, sections: Vec<String>) -> Self {
        Self { path: path.into(), sections }
    }

    pub fn code(&self) -> String {
        self.sections
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Header plus code, ending in a newline.
    pub fn render(&self) -> String {
        let mut text = HEADER.join("\n");
        text.push('\n');
        text.push_str(&self.code());
        text.push('\n');
        text
    }

    /// Writes only if the content below the header changed, so regeneration
    /// with identical input leaves files (and their mtimes) alone.
    pub fn update(&self) -> std::io::Result<WriteOutcome> {
        let text = self.render();
        if let Ok(existing) = std::fs::read_to_string(&self.path) {
            if body(&existing) == body(&text) {
                debug!(path = %self.path.display(), "unchanged");
                return Ok(WriteOutcome::Unchanged);
            }
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, text)?;
        info!(path = %self.path.display(), "written");
        Ok(WriteOutcome::Written)
    }
}

fn body(text: &str) -> Vec<&str> {
    text.lines().skip(HEADER.len()).collect()
}
