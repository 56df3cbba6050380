//! Registers this program with the host's job scheduler (cron or Windows Task Scheduler).

use std::{
    io::Write,
    path::PathBuf,
    process::{Command, ExitStatus, Output, Stdio},
};

use anyhow::Context;
use itertools::Itertools;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// How often the scheduled job runs.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    Debug,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Cadence {
    Hourly,
    Daily,
    #[default]
    Monthly,
}

impl Cadence {
    pub fn cron_schedule(self) -> &'static str {
        match self {
            Cadence::Hourly => "@hourly",
            Cadence::Daily => "0 0 * * *",
            Cadence::Monthly => "0 0 1 * *",
        }
    }

    pub fn schtasks_args(self) -> &'static [&'static str] {
        match self {
            Cadence::Hourly => &["/sc", "hourly"],
            Cadence::Daily => &["/sc", "daily", "/st", "00:00"],
            Cadence::Monthly => &["/sc", "monthly", "/mo", "1", "/d", "1", "/st", "00:00"],
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, strum::Display)]
pub enum HostOs {
    Linux,
    #[strum(serialize = "macOS")]
    MacOs,
    Windows,
    #[strum(serialize = "an unsupported operating system")]
    Unsupported,
}

impl HostOs {
    pub fn detect() -> Self {
        Self::from_name(std::env::consts::OS)
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "linux" => HostOs::Linux,
            "macos" => HostOs::MacOs,
            "windows" => HostOs::Windows,
            _ => HostOs::Unsupported,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("Scheduling is not supported on {0}")]
    Unsupported(HostOs),
    #[error("`{program}` exited with {status}: {stderr}")]
    CommandFailed {
        program: &'static str,
        status: ExitStatus,
        stderr: String,
    },
}

/// The command the scheduler should run, and how often.
#[derive(Clone, Debug, TypedBuilder)]
pub struct JobSpec {
    program: PathBuf,
    #[builder(default)]
    args: Vec<String>,
    #[builder(setter(into))]
    task_name: String,
    cadence: Cadence,
}

impl JobSpec {
    pub fn program_text(&self) -> String {
        self.program.display().to_string()
    }

    /// The program and its arguments as one shell-style line.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program_text())
            .chain(self.args.iter().cloned())
            .map(|x| quote(&x))
            .join(" ")
    }
}

fn quote(word: &str) -> String {
    if word.is_empty() || word.contains(char::is_whitespace) {
        format!("\"{}\"", word.replace('"', "\\\""))
    } else {
        word.to_owned()
    }
}

pub trait JobScheduler {
    fn exists(&self, job: &JobSpec) -> anyhow::Result<bool>;
    fn install(&self, job: &JobSpec) -> anyhow::Result<()>;
}

/// The current user's crontab, on Linux and macOS.
pub struct Crontab;

impl Crontab {
    pub fn entry(job: &JobSpec) -> String {
        format!("{} {}", job.cadence.cron_schedule(), job.command_line())
    }

    /// Current crontab contents; a user without a crontab has an empty one.
    fn current(&self) -> anyhow::Result<String> {
        let output = Command::new("crontab")
            .arg("-l")
            .output()
            .context("Failed to run `crontab -l`")?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Ok(String::new())
        }
    }
}

impl JobScheduler for Crontab {
    fn exists(&self, job: &JobSpec) -> anyhow::Result<bool> {
        Ok(self.current()?.contains(&job.program_text()))
    }

    fn install(&self, job: &JobSpec) -> anyhow::Result<()> {
        let mut table = self.current()?;
        if !table.is_empty() && !table.ends_with('\n') {
            table.push('\n');
        }
        table.push_str(&Self::entry(job));
        table.push('\n');

        let mut child = Command::new("crontab")
            .arg("-")
            .stdin(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to run `crontab -`")?;
        child
            .stdin
            .take()
            .context("stdin of `crontab -` is not captured")?
            .write_all(table.as_bytes())?;
        check("crontab", child.wait_with_output()?)?;
        info!("Cron job created: {}", Self::entry(job));
        Ok(())
    }
}

/// Windows Task Scheduler, driven through `schtasks`.
pub struct TaskScheduler;

impl TaskScheduler {
    pub fn create_args(job: &JobSpec) -> Vec<String> {
        let command = job.command_line();
        ["/create", "/tn", job.task_name.as_str(), "/tr", command.as_str()]
            .into_iter()
            .chain(job.cadence.schtasks_args().iter().copied())
            .chain(["/f"])
            .map(ToOwned::to_owned)
            .collect()
    }
}

impl JobScheduler for TaskScheduler {
    fn exists(&self, job: &JobSpec) -> anyhow::Result<bool> {
        let output = Command::new("schtasks")
            .args(["/query", "/tn", &job.task_name])
            .output()
            .context("Failed to run `schtasks /query`")?;
        Ok(output.status.success())
    }

    fn install(&self, job: &JobSpec) -> anyhow::Result<()> {
        let output = Command::new("schtasks")
            .args(Self::create_args(job))
            .output()
            .context("Failed to run `schtasks /create`")?;
        check("schtasks", output)?;
        info!("Scheduled task {:?} created", job.task_name);
        Ok(())
    }
}

fn check(program: &'static str, output: Output) -> Result<(), ScheduleError> {
    if output.status.success() {
        Ok(())
    } else {
        Err(ScheduleError::CommandFailed {
            program,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        })
    }
}

pub fn scheduler_for(os: HostOs) -> Result<Box<dyn JobScheduler>, ScheduleError> {
    match os {
        HostOs::Linux | HostOs::MacOs => Ok(Box::new(Crontab)),
        HostOs::Windows => Ok(Box::new(TaskScheduler)),
        HostOs::Unsupported => Err(ScheduleError::Unsupported(os)),
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    AlreadyScheduled,
    Installed,
}

/// Installs `job` unless the scheduler already knows it.
pub fn ensure_scheduled(scheduler: &dyn JobScheduler, job: &JobSpec) -> anyhow::Result<Outcome> {
    if scheduler.exists(job)? {
        info!("{} is already scheduled", job.program_text());
        return Ok(Outcome::AlreadyScheduled);
    }
    info!("Scheduling {} to run {}", job.command_line(), job.cadence);
    scheduler.install(job)?;
    Ok(Outcome::Installed)
}

/// Detects the host and registers `job` there.  Unsupported hosts only get a warning.
pub fn ensure_scheduled_on_host(job: &JobSpec) -> anyhow::Result<Option<Outcome>> {
    let os = HostOs::detect();
    match scheduler_for(os) {
        Ok(scheduler) => ensure_scheduled(&*scheduler, job).map(Some),
        Err(e) => {
            warn!("{e}");
            Ok(None)
        }
    }
}
