use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::bail;
use itertools::Itertools;
use log::{error, info, warn};
use scraper::Html;
use url::Url;

use crate::{
    api::{fetch_page, reqwest_client},
    config::Config,
    export::write_table,
    parser::{main_stats, videocard},
};

/// One of the two survey pages, each producing its own export.
#[derive(
    Clone, Copy, PartialEq, Eq, Debug, strum::Display, strum::EnumIter, clap::ValueEnum,
)]
#[strum(serialize_all = "lowercase")]
pub enum Survey {
    Main,
    Videocard,
}

impl Survey {
    pub fn file_stem(self) -> &'static str {
        match self {
            Survey::Main => "MainSurvey",
            Survey::Videocard => "VideocardSurvey",
        }
    }

    /// `MainSurvey.csv`, or `MainSurvey_April_2024.csv` when the period is known.
    pub fn file_name(self, period: Option<&str>) -> String {
        match period {
            Some(period) => format!("{}_{period}.csv", self.file_stem()),
            None => format!("{}.csv", self.file_stem()),
        }
    }

    pub fn url(self, config: &Config) -> &Url {
        match self {
            Survey::Main => &config.main_url,
            Survey::Videocard => &config.videocard_url,
        }
    }

    /// Extracts this survey's table from `html` and writes it to `path`.
    pub fn export(self, html: &Html, path: &Path) -> anyhow::Result<()> {
        match self {
            Survey::Main => write_table(&main_stats::parse(html)?, path),
            Survey::Videocard => write_table(&videocard::parse(html)?, path),
        }
    }
}

pub struct Runner {
    client: reqwest::Client,
    config: Config,
    export_dir: PathBuf,
}

impl Runner {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let client = reqwest_client(Duration::from_secs(config.timeout_secs))?;
        let export_dir = config.resolve_export_dir()?;
        Ok(Self {
            client,
            config,
            export_dir,
        })
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// Runs every survey in turn.  A failing survey is logged and does not
    /// stop the others; the result is an error if any of them failed.
    pub async fn run(&self, surveys: &[Survey]) -> anyhow::Result<()> {
        let mut period = None;
        let mut failed = vec![];
        for &survey in surveys {
            info!("Beginning {survey} survey scrape");
            match self.run_survey(survey, &mut period).await {
                Ok(path) => info!("Finished {survey} survey export to {path:?}"),
                Err(e) => {
                    error!("The {survey} survey failed: {e:#}");
                    failed.push(survey);
                }
            }
        }
        if !failed.is_empty() {
            bail!("Failed surveys: {}", failed.iter().join(", "));
        }
        Ok(())
    }

    async fn run_survey(
        &self,
        survey: Survey,
        period: &mut Option<String>,
    ) -> anyhow::Result<PathBuf> {
        let page = fetch_page(&self.client, survey.url(&self.config)).await?;
        let html = Html::parse_document(&page);
        if survey == Survey::Main && self.config.dated_file_names {
            match main_stats::parse_survey_period(&html) {
                Ok(found) => *period = Some(found),
                Err(e) => warn!("Survey period not found, using undated file names: {e:#}"),
            }
        }
        let path = self.export_dir.join(survey.file_name(period.as_deref()));
        survey.export(&html, &path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use scraper::Html;
    use strum::IntoEnumIterator;

    use super::Survey;

    #[test]
    fn file_names() {
        assert_eq!(Survey::Main.file_name(None), "MainSurvey.csv");
        assert_eq!(
            Survey::Videocard.file_name(Some("April_2024")),
            "VideocardSurvey_April_2024.csv"
        );
        assert_eq!(
            Survey::iter().map(|x| x.to_string()).collect::<Vec<_>>(),
            ["main", "videocard"]
        );
    }

    #[test]
    fn one_broken_page_does_not_affect_the_other() {
        let dir = std::env::temp_dir().join(format!("hwsurvey-runner-{}", std::process::id()));
        let videocard = Html::parse_document(
            r#"<div id="sub_stats">
                <div class="substats_col_left col_header">All</div>
                <div class="substats_row">
                    <div class="substats_col_left">GTX 1060</div>
                    <div class="substats_col_month">2.00%</div>
                    <div class="substats_col_month_last_chg">-0.10%</div>
                </div>
            </div>"#,
        );
        let broken = Html::parse_document("<p>Service unavailable</p>");

        let main_path = dir.join(Survey::Main.file_name(None));
        let videocard_path = dir.join(Survey::Videocard.file_name(None));
        assert!(Survey::Main.export(&broken, &main_path).is_err());
        assert!(!main_path.exists(), "no partial file is written");
        Survey::Videocard.export(&videocard, &videocard_path).unwrap();
        assert_eq!(
            fs_err::read_to_string(&videocard_path).unwrap(),
            "Subcategory;Entry;Month-4;Month-3;Month-2;Month-1;Month;MonthChange_%\n\
             All;GTX 1060;;;;;0.02;-0.001\n"
        );
        fs_err::remove_dir_all(&dir).unwrap();
    }
}
