//! Grading configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use gradeforge_core::reconcile::LogCorrect;

/// Top-level gradeforge configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeforgeConfig {
    /// Directory receiving one feedback file per submission.
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,
    /// Wall-clock limit for grading one submission.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Submissions graded at once.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Which correct results feedback mentions; unset keeps the tester's
    /// own choice.
    #[serde(default)]
    pub log_correct: Option<LogCorrect>,
    /// Write feedback to standard output instead of report files.
    #[serde(default)]
    pub stdout_reports: bool,
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("./feedback")
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_parallelism() -> usize {
    1
}

impl Default for GradeforgeConfig {
    fn default() -> Self {
        Self {
            report_dir: default_report_dir(),
            timeout_secs: default_timeout_secs(),
            parallelism: default_parallelism(),
            log_correct: None,
            stdout_reports: false,
        }
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `gradeforge.toml` in the current directory
/// 2. `~/.config/gradeforge/config.toml`
///
/// Environment variable override: `GRADEFORGE_REPORT_DIR`.
pub fn load_config() -> Result<GradeforgeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<GradeforgeConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("gradeforge.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!(config = %path.display(), "loading configuration");
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<GradeforgeConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => GradeforgeConfig::default(),
    };

    if let Ok(dir) = std::env::var("GRADEFORGE_REPORT_DIR") {
        if !dir.is_empty() {
            config.report_dir = PathBuf::from(dir);
        }
    }

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("gradeforge"))
}
