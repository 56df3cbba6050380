use std::path::{Path, PathBuf};

use anyhow::Context;
use hwsurvey_scraping_utils::fs_json_util::read_toml;
use log::info;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::schedule::Cadence;

pub const MAIN_SURVEY_URL: &str = "https://store.steampowered.com/hwsurvey";
pub const VIDEOCARD_SURVEY_URL: &str = "https://store.steampowered.com/hwsurvey/videocard/";
pub const DEFAULT_TASK_NAME: &str = "SteamHardwareSurveyAutomatedScript";
/// Created next to the executable unless `export_dir` is set.
pub const EXPORT_SUBDIR: &str = "Exports";

/// Settings read from an optional TOML file.  Every key may be omitted.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub main_url: Url,
    pub videocard_url: Url,
    pub export_dir: Option<PathBuf>,
    pub cadence: Cadence,
    pub task_name: String,
    /// Prefix export file names with the survey month, e.g. `MainSurvey_April_2024.csv`.
    pub dated_file_names: bool,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            main_url: Url::parse(MAIN_SURVEY_URL).expect("MAIN_SURVEY_URL is a valid URL"),
            videocard_url: Url::parse(VIDEOCARD_SURVEY_URL)
                .expect("VIDEOCARD_SURVEY_URL is a valid URL"),
            export_dir: None,
            cadence: Cadence::default(),
            task_name: DEFAULT_TASK_NAME.to_owned(),
            dated_file_names: false,
            timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                info!("Loading configuration from {path:?}");
                read_toml(path)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn resolve_export_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.export_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_export_dir(),
        }
    }
}

pub fn default_export_dir() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to locate the running executable")?;
    let dir = exe
        .parent()
        .with_context(|| format!("{exe:?} has no parent directory"))?;
    Ok(dir.join(EXPORT_SUBDIR))
}
