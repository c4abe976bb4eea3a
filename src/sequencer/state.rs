//! Queue and player state machine as a pure reducer.
//!
//! The reducer never touches audio. It decides which job is current and which
//! cycle is playing; the driver observes the cycle ticket and does the
//! actual speaking.

use crate::announce::{AnnouncementJob, AnnouncementKind, AnnouncementText, JobId, JobStatus, Language};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Identifier of one playback cycle.
pub type Ticket = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Playing {
        job_id: JobId,
        /// 1-based cycle number of the current job.
        repeat: u32,
        ticket: Ticket,
    },
}

impl Phase {
    pub fn is_idle(&self) -> bool {
        matches!(self, Phase::Idle)
    }

    pub fn ticket(&self) -> Option<Ticket> {
        match self {
            Phase::Idle => None,
            Phase::Playing { ticket, .. } => Some(*ticket),
        }
    }
}

/// Everything the driver needs to play one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Cycle {
    pub ticket: Ticket,
    pub job_id: JobId,
    pub kind: AnnouncementKind,
    pub texts: Vec<AnnouncementText>,
    pub repeat: u32,
    pub repeat_count: u32,
    /// Items without a stored clip fail instead of falling back to speech.
    pub recorded_only: bool,
}

#[derive(Debug, Clone)]
pub enum SequencerAction {
    Enqueue(AnnouncementJob),
    /// The driver played every item of the cycle identified by `ticket`.
    CycleFinished { ticket: Ticket },
    Skip,
    Stop,
    Clear,
    Resume,
}

/// Notifications published for every transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SequencerEvent {
    Enqueued {
        job_id: JobId,
        summary: String,
        queue_len: usize,
    },
    CycleStarted {
        job_id: JobId,
        repeat: u32,
        repeat_count: u32,
    },
    ItemStarted {
        job_id: JobId,
        language: Language,
        text: String,
        recorded: bool,
    },
    ItemFailed {
        job_id: JobId,
        language: Language,
        message: String,
    },
    CycleFinished {
        job_id: JobId,
        repeat: u32,
    },
    JobFinished {
        job_id: JobId,
        summary: String,
        status: JobStatus,
    },
    QueueCleared {
        dropped: usize,
    },
    Idle,
}

#[derive(Debug, Clone)]
pub struct SequencerState {
    /// Pending jobs; while playing, the front is the current job.
    queue: VecDeque<AnnouncementJob>,
    /// Finished jobs, newest first.
    history: VecDeque<AnnouncementJob>,
    phase: Phase,
    next_ticket: Ticket,
    history_capacity: usize,
}

impl SequencerState {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            history: VecDeque::new(),
            phase: Phase::Idle,
            next_ticket: 1,
            history_capacity,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current(&self) -> Option<&AnnouncementJob> {
        match self.phase {
            Phase::Idle => None,
            Phase::Playing { .. } => self.queue.front(),
        }
    }

    /// Jobs waiting behind the current one (or all jobs while idle).
    pub fn pending(&self) -> impl Iterator<Item = &AnnouncementJob> {
        let skip = usize::from(!self.phase.is_idle());
        self.queue.iter().skip(skip)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn history(&self) -> impl Iterator<Item = &AnnouncementJob> {
        self.history.iter()
    }

    /// The cycle the driver should be playing now.
    pub fn cycle(&self) -> Option<Cycle> {
        let Phase::Playing {
            job_id,
            repeat,
            ticket,
        } = self.phase
        else {
            return None;
        };
        let job = self.queue.front()?;
        Some(Cycle {
            ticket,
            job_id,
            kind: job.kind,
            texts: job.texts.clone(),
            repeat,
            repeat_count: job.repeat_count,
            recorded_only: job.recorded_only,
        })
    }

    /// Apply `action`, returning the events it produced.
    pub fn reduce(&mut self, action: SequencerAction) -> Vec<SequencerEvent> {
        let mut events = Vec::new();
        match action {
            SequencerAction::Enqueue(job) => self.enqueue(job, &mut events),
            SequencerAction::CycleFinished { ticket } => {
                if self.phase.ticket() == Some(ticket) {
                    self.finish_cycle(&mut events);
                } else {
                    tracing::debug!(ticket, current = ?self.phase.ticket(), "ignoring stale cycle report");
                }
            }
            SequencerAction::Skip => {
                if !self.phase.is_idle() {
                    self.finish_cycle(&mut events);
                }
            }
            SequencerAction::Stop => self.stop_current(&mut events),
            SequencerAction::Clear => {
                self.stop_current(&mut events);
                let dropped = self.queue.len();
                self.queue.clear();
                events.push(SequencerEvent::QueueCleared { dropped });
            }
            SequencerAction::Resume => {
                if self.phase.is_idle() {
                    self.start_cycle(&mut events);
                }
            }
        }
        events
    }

    fn enqueue(&mut self, job: AnnouncementJob, events: &mut Vec<SequencerEvent>) {
        if !job.has_texts() {
            tracing::debug!(job = %job.summary(), "not queueing a job without texts");
            return;
        }
        events.push(SequencerEvent::Enqueued {
            job_id: job.id,
            summary: job.summary(),
            queue_len: self.queue.len() + 1,
        });
        self.queue.push_back(job);
        if self.phase.is_idle() {
            self.start_cycle(events);
        }
    }

    /// Start the next cycle of the head job, or go idle if the queue is empty.
    fn start_cycle(&mut self, events: &mut Vec<SequencerEvent>) {
        let Some(job) = self.queue.front_mut() else {
            if !self.phase.is_idle() {
                self.phase = Phase::Idle;
                events.push(SequencerEvent::Idle);
            }
            return;
        };

        job.current_repeat += 1;
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.phase = Phase::Playing {
            job_id: job.id,
            repeat: job.current_repeat,
            ticket,
        };
        events.push(SequencerEvent::CycleStarted {
            job_id: job.id,
            repeat: job.current_repeat,
            repeat_count: job.repeat_count,
        });
    }

    fn finish_cycle(&mut self, events: &mut Vec<SequencerEvent>) {
        let Some(job) = self.queue.front() else {
            self.phase = Phase::Idle;
            return;
        };
        events.push(SequencerEvent::CycleFinished {
            job_id: job.id,
            repeat: job.current_repeat,
        });

        if !job.cycles_remaining()
            && let Some(done) = self.queue.pop_front()
        {
            self.record(done.finish(JobStatus::Completed), events);
        }
        self.start_cycle(events);
    }

    fn stop_current(&mut self, events: &mut Vec<SequencerEvent>) {
        if self.phase.is_idle() {
            return;
        }
        if let Some(job) = self.queue.pop_front() {
            self.record(job.finish(JobStatus::Stopped), events);
        }
        self.phase = Phase::Idle;
        events.push(SequencerEvent::Idle);
    }

    fn record(&mut self, job: AnnouncementJob, events: &mut Vec<SequencerEvent>) {
        events.push(SequencerEvent::JobFinished {
            job_id: job.id,
            summary: job.summary(),
            status: job.status,
        });
        self.history.push_front(job);
        self.history.truncate(self.history_capacity);
    }
}
