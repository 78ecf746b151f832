// Run log: appends research run events to ~/.obsidian-suite/logs/research_YYYY-MM-DD.jsonl

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use crate::research::Stage;

/// An event in a research run
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    RunStart {
        query: String,
        planning_model: String,
        content_model: String,
    },
    PlanReady {
        notes: usize,
        levels: usize,
    },
    NoteWritten {
        title: String,
        path: String,
    },
    /// A node (or the plan itself) that produced no file
    NodeFailed {
        title: String,
        stage: Stage,
        reason: String,
    },
    RunDone {
        written: usize,
        failed: usize,
        duration_s: u64,
    },
}

#[derive(Debug, Serialize)]
struct LogEntry<'a> {
    ts: String,
    run_id: &'a str,
    #[serde(flatten)]
    event: &'a RunEvent,
}

/// Writes run events to a daily JSONL file
#[derive(Debug, Clone)]
pub struct RunLog {
    dir: PathBuf,
    run_id: String,
}

impl RunLog {
    /// Logger under ~/.obsidian-suite/logs
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
        let dir = home.join(".obsidian-suite").join("logs");
        std::fs::create_dir_all(&dir).context("Failed to create ~/.obsidian-suite/logs")?;
        Ok(Self::with_dir(dir))
    }

    /// Logger writing to an arbitrary directory
    pub fn with_dir(dir: PathBuf) -> Self {
        Self {
            dir,
            run_id: Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn today_path(&self) -> PathBuf {
        let date = Local::now().format("%Y-%m-%d").to_string();
        self.dir.join(format!("research_{}.jsonl", date))
    }

    pub fn log(&self, event: RunEvent) -> Result<()> {
        let path = self.today_path();
        let entry = LogEntry {
            ts: Utc::now().to_rfc3339(),
            run_id: &self.run_id,
            event: &event,
        };
        let json = serde_json::to_string(&entry).context("Failed to serialize run event")?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open run log: {}", path.display()))?;
        writeln!(file, "{}", json).context("Failed to write run event")?;
        Ok(())
    }

    /// Log, downgrading a failure to a warning. The run log never stops a run.
    pub fn record(&self, event: RunEvent) {
        if let Err(e) = self.log(event) {
            tracing::warn!("Run log write failed: {:#}", e);
        }
    }
}
