use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Success,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Success => "success",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

/// Ordered message log that evicts its oldest entry past `capacity`.
#[derive(Debug, Clone)]
pub struct RunLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl RunLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends and mirrors the message to the `log` facade.
    pub fn push(&mut self, level: LogLevel, message: impl Into<String>) -> LogEntry {
        let message = message.into();
        match level {
            LogLevel::Info | LogLevel::Success => log::info!("{}", message),
            LogLevel::Warning => log::warn!("{}", message),
            LogLevel::Error => log::error!("{}", message),
        }

        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            message,
        };
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry.clone());
        entry
    }

    /// The last `limit` entries, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    #[default]
    Idle,
    Running,
}

/// Per-phase counters of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounts {
    pub sources_total: usize,
    pub sources_fetched: usize,
    pub links_extracted: usize,
    pub links_parsed: usize,
    pub links_rejected: usize,
    pub nodes_filtered: usize,
    pub nodes_final: usize,
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    pub id: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub counts: RunCounts,
    pub status: Option<RunStatus>,
    pub error: Option<String>,
    /// Region label -> node count of the final node set.
    pub regions: BTreeMap<String, usize>,
    /// Messages logged during this run.
    pub log: Vec<LogEntry>,
}

impl RunRecord {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            started_at: Utc::now(),
            finished_at: None,
            counts: RunCounts::default(),
            status: None,
            error: None,
            regions: BTreeMap::new(),
            log: Vec::new(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_some()
    }

    pub(crate) fn finish(&mut self, status: RunStatus, error: Option<String>) {
        self.status = Some(status);
        self.error = error;
        self.finished_at = Some(Utc::now());
    }
}

/// Answer to a status query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub is_running: bool,
    pub state: PipelineState,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_status: Option<RunStatus>,
}
