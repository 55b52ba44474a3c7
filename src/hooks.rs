use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use log::info;

/// Timer events that can run an executable from the hooks directory
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hook {
    TimeoutEnd,
    IntervalTick,
    CountdownEnd,
}

impl Hook {
    /// Name of the executable this hook runs
    pub fn file_name(&self) -> &'static str {
        match *self {
            Self::TimeoutEnd => "timeout-end",
            Self::IntervalTick => "interval-tick",
            Self::CountdownEnd => "countdown-end",
        }
    }

    /// Full path of the executable this hook runs
    pub fn path(&self, hooks_directory: &Path) -> PathBuf {
        hooks_directory.join(self.file_name())
    }

    /// Run the hook if its executable exists
    pub fn run(&self, hooks_directory: &Path) -> Result<()> {
        let hook_path = self.path(hooks_directory);

        if hook_path.exists() {
            info!(
                "Executing hook at {}",
                hook_path.display().to_string().cyan()
            );

            std::process::Command::new(&hook_path)
                .output()
                .with_context(|| format!("Failed to execute hook {}", hook_path.display()))?;
        }

        Ok(())
    }
}
