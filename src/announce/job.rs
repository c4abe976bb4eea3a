use crate::announce::kind::AnnouncementKind;
use crate::announce::language::Language;
use crate::train::Train;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an announcement job, unique within one sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One rendered text of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementText {
    pub language: Language,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Completed,
    Stopped,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Completed => "completed",
            JobStatus::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// A queued unit of a train-status message read aloud in one or more languages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnouncementJob {
    pub id: JobId,
    /// Snapshot of the train at the time the announcement was triggered.
    pub train: Train,
    pub kind: AnnouncementKind,
    pub texts: Vec<AnnouncementText>,
    pub status: JobStatus,
    /// Number of full language cycles to play; never below 1.
    pub repeat_count: u32,
    /// Cycles started so far.
    pub current_repeat: u32,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Texts are labels for recorded clips and must never be synthesized.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub recorded_only: bool,
}

impl AnnouncementJob {
    /// Create a queued job. A `repeat_count` of 0 is raised to 1.
    pub fn new(
        id: JobId,
        train: Train,
        kind: AnnouncementKind,
        texts: Vec<AnnouncementText>,
        repeat_count: u32,
    ) -> Self {
        Self {
            id,
            train,
            kind,
            texts,
            status: JobStatus::Queued,
            repeat_count: repeat_count.max(1),
            current_repeat: 0,
            created_at: Utc::now(),
            finished_at: None,
            recorded_only: false,
        }
    }

    /// Mark the job as playing recorded clips only.
    pub fn recorded_only(mut self) -> Self {
        self.recorded_only = true;
        self
    }

    pub fn has_texts(&self) -> bool {
        !self.texts.is_empty()
    }

    pub fn cycles_remaining(&self) -> bool {
        self.current_repeat < self.repeat_count
    }

    pub(crate) fn finish(mut self, status: JobStatus) -> Self {
        self.status = status;
        self.finished_at = Some(Utc::now());
        self
    }

    /// Short description for logs and terminal output.
    pub fn summary(&self) -> String {
        format!(
            "{} {} {} ({})",
            self.id,
            self.kind.label(),
            self.train.train_no,
            self.train.name
        )
    }
}
