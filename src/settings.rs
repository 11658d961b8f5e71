//! Output settings, read from a JSON file passed with `--config`.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// root directory generated files are written under
    pub output_path: PathBuf,
    /// prefix of every cross-unit import path
    pub import_root: String,
    /// prepended to each unit's file name (may contain `/`)
    pub default_folder: String,
    /// `false`: render but never touch the filesystem
    pub write_output: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("generated"),
            import_root: "@/".to_string(),
            default_folder: String::new(),
            write_output: true,
        }
    }
}

impl Settings {
    pub fn load(file: &Path) -> anyhow::Result<Self> {
        crate::path_de::from_file_with_path(file)
    }

    /// `import_root + prefix + name`
    pub fn import_path(&self, prefix: &str, name: &str) -> String {
        format!("{}{prefix}{name}", self.import_root)
    }

    /// Registry key of a unit; also its path under `output_path` minus extension.
    pub fn unit_key(&self, prefix: &str, name: &str) -> String {
        format!("{}{prefix}{name}", self.default_folder)
    }
}
