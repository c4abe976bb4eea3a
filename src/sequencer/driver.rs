//! Playback task that turns cycle tickets into speech and clip playback.

use crate::error::StationvoxError;
use crate::playback::{AudioPlayer, CancelToken, SpeechEngine, Utterance};
use crate::recordings::{RecordingKey, RecordingLibrary};
use crate::sequencer::state::{Cycle, SequencerAction, SequencerEvent};
use crate::sequencer::store::SequencerStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Engines and data the driver plays from.
pub(crate) struct Driver {
    pub store: Arc<SequencerStore>,
    pub speech: Arc<dyn SpeechEngine>,
    pub player: Arc<dyn AudioPlayer>,
    pub recordings: RecordingLibrary,
}

enum CycleEnd {
    Finished,
    Superseded,
    Shutdown,
}

impl Driver {
    /// Play cycles as the store publishes them until `shutdown` fires.
    pub async fn run(self, shutdown: CancelToken) {
        let mut cycles = self.store.watch_cycles();

        loop {
            let cycle = cycles.borrow_and_update().clone();
            let Some(cycle) = cycle else {
                tokio::select! {
                    changed = cycles.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = shutdown.cancelled() => break,
                }
                continue;
            };

            match self.drive(&cycle, &mut cycles, &shutdown).await {
                CycleEnd::Finished => {
                    self.store.dispatch(SequencerAction::CycleFinished {
                        ticket: cycle.ticket,
                    });
                }
                CycleEnd::Superseded => {
                    tracing::debug!(ticket = cycle.ticket, "cycle interrupted");
                }
                CycleEnd::Shutdown => break,
            }
        }
        tracing::debug!("sequencer driver stopped");
    }

    /// Play `cycle`, aborting it as soon as the published ticket moves on.
    async fn drive(
        &self,
        cycle: &Cycle,
        cycles: &mut watch::Receiver<Option<Cycle>>,
        shutdown: &CancelToken,
    ) -> CycleEnd {
        let token = CancelToken::new();
        let play = self.play_cycle(cycle, &token);
        tokio::pin!(play);

        let end = loop {
            tokio::select! {
                _ = &mut play => return CycleEnd::Finished,
                changed = cycles.changed() => {
                    if changed.is_err() {
                        break CycleEnd::Shutdown;
                    }
                    let current = cycles.borrow().as_ref().map(|c| c.ticket);
                    if current != Some(cycle.ticket) {
                        break CycleEnd::Superseded;
                    }
                }
                _ = shutdown.cancelled() => break CycleEnd::Shutdown,
            }
        };

        token.cancel();
        play.await;
        end
    }

    async fn play_cycle(&self, cycle: &Cycle, token: &CancelToken) {
        tracing::info!(
            job = %cycle.job_id,
            repeat = cycle.repeat,
            of = cycle.repeat_count,
            "playing cycle"
        );

        for item in &cycle.texts {
            if token.is_cancelled() {
                return;
            }
            let settings = self.store.settings();
            let key = RecordingKey::new(cycle.kind, item.language);

            let result = match self.recordings.get(&key) {
                Some(recorded) => {
                    self.store.emit(SequencerEvent::ItemStarted {
                        job_id: cycle.job_id,
                        language: item.language,
                        text: item.text.clone(),
                        recorded: true,
                    });
                    self.player.play(&recorded.clip, settings.volume, token).await
                }
                None if cycle.recorded_only => Err(StationvoxError::RecordingNotFound {
                    key: key.to_string(),
                }),
                None => {
                    self.store.emit(SequencerEvent::ItemStarted {
                        job_id: cycle.job_id,
                        language: item.language,
                        text: item.text.clone(),
                        recorded: false,
                    });
                    let utterance = Utterance {
                        text: item.text.clone(),
                        language: item.language,
                        volume: settings.volume,
                    };
                    self.speech.speak(&utterance, token).await
                }
            };

            if let Err(e) = result {
                tracing::warn!(job = %cycle.job_id, language = %item.language, "playback failed: {}", e);
                self.store.emit(SequencerEvent::ItemFailed {
                    job_id: cycle.job_id,
                    language: item.language,
                    message: e.to_string(),
                });
            }

            if !pause(settings.inter_item_pause(), token).await {
                return;
            }
        }

        let settle = self.store.settings().settle_pause();
        pause(settle, token).await;
    }
}

/// Sleep for `duration`; false if cancelled first.
async fn pause(duration: Duration, token: &CancelToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = token.cancelled() => false,
    }
}
