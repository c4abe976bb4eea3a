use crate::announce::{AnnouncementJob, Language};
use crate::defaults;
use crate::sequencer::state::{Cycle, Phase, SequencerAction, SequencerEvent, SequencerState};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, watch};

/// Runtime-adjustable playback settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencerSettings {
    pub languages: Vec<Language>,
    pub repeat_count: u32,
    /// 0-100
    pub volume: u8,
    pub inter_item_pause_ms: u64,
    pub settle_pause_ms: u64,
}

impl SequencerSettings {
    pub fn inter_item_pause(&self) -> Duration {
        Duration::from_millis(self.inter_item_pause_ms)
    }

    pub fn settle_pause(&self) -> Duration {
        Duration::from_millis(self.settle_pause_ms)
    }
}

impl Default for SequencerSettings {
    fn default() -> Self {
        Self {
            languages: Language::ALL.to_vec(),
            repeat_count: defaults::REPEAT_COUNT,
            volume: defaults::VOLUME,
            inter_item_pause_ms: defaults::INTER_ITEM_PAUSE_MS,
            settle_pause_ms: defaults::SETTLE_PAUSE_MS,
        }
    }
}

/// Point-in-time copy of the sequencer for status queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencerSnapshot {
    pub phase: Phase,
    pub current: Option<AnnouncementJob>,
    /// Jobs waiting behind the current one.
    pub pending: Vec<AnnouncementJob>,
    /// Finished jobs, newest first.
    pub history: Vec<AnnouncementJob>,
    pub settings: SequencerSettings,
}

/// Owner of the sequencer state.
///
/// Transitions run under a mutex; their events go to broadcast subscribers
/// and the playing cycle is published on a watch channel for the driver.
pub struct SequencerStore {
    state: Mutex<SequencerState>,
    settings: Mutex<SequencerSettings>,
    events: broadcast::Sender<SequencerEvent>,
    cycle: watch::Sender<Option<Cycle>>,
}

impl SequencerStore {
    pub fn new(settings: SequencerSettings, history_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(defaults::EVENT_BUFFER);
        let (cycle, _) = watch::channel(None);
        Self {
            state: Mutex::new(SequencerState::new(history_capacity)),
            settings: Mutex::new(settings),
            events,
            cycle,
        }
    }

    fn state(&self) -> MutexGuard<'_, SequencerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn settings_guard(&self) -> MutexGuard<'_, SequencerSettings> {
        self.settings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply `action` and publish its effects.
    ///
    /// The state guard is held until the cycle and events are published, so
    /// concurrent dispatches publish in the order they were reduced.
    pub fn dispatch(&self, action: SequencerAction) -> Vec<SequencerEvent> {
        let mut state = self.state();
        let events = state.reduce(action);
        let cycle = state.cycle();

        let ticket = cycle.as_ref().map(|c| c.ticket);
        self.cycle.send_if_modified(|current| {
            if current.as_ref().map(|c| c.ticket) == ticket {
                false
            } else {
                *current = cycle;
                true
            }
        });

        for event in &events {
            self.emit(event.clone());
        }
        drop(state);
        events
    }

    /// Publish an event that does not change state.
    pub fn emit(&self, event: SequencerEvent) {
        tracing::trace!(?event, "sequencer event");
        // No subscribers is fine.
        self.events.send(event).ok();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SequencerEvent> {
        self.events.subscribe()
    }

    pub(crate) fn watch_cycles(&self) -> watch::Receiver<Option<Cycle>> {
        self.cycle.subscribe()
    }

    pub fn phase(&self) -> Phase {
        self.state().phase()
    }

    pub fn snapshot(&self) -> SequencerSnapshot {
        let settings = self.settings();
        let state = self.state();
        SequencerSnapshot {
            phase: state.phase(),
            current: state.current().cloned(),
            pending: state.pending().cloned().collect(),
            history: state.history().cloned().collect(),
            settings,
        }
    }

    pub fn settings(&self) -> SequencerSettings {
        self.settings_guard().clone()
    }

    pub fn update_settings(&self, update: impl FnOnce(&mut SequencerSettings)) -> SequencerSettings {
        let mut settings = self.settings_guard();
        update(&mut settings);
        settings.clone()
    }
}
