//! Announcement sequencer: a FIFO of jobs played one at a time.
//!
//! [`Sequencer`] is the handle the daemon and tests use. It renders
//! announcements, assigns job ids and forwards control actions to the
//! [`SequencerStore`]; a background driver task plays whatever cycle the
//! store publishes.

mod driver;
pub mod state;
pub mod store;

pub use state::{Phase, SequencerAction, SequencerEvent};
pub use store::{SequencerSettings, SequencerSnapshot, SequencerStore};

use crate::announce::{
    AnnouncementJob, AnnouncementKind, AnnouncementText, JobId, Language, TemplateExtras,
    TemplateTable,
};
use crate::defaults;
use crate::error::{Result, StationvoxError};
use crate::playback::{AudioPlayer, CancelToken, SpeechEngine};
use crate::recordings::{RecordingKey, RecordingLibrary};
use crate::train::Train;
use driver::Driver;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// A request to announce one train.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnounceRequest {
    pub train: Train,
    pub kind: AnnouncementKind,
    pub extras: TemplateExtras,
    /// Overrides the selected languages for this job only.
    pub languages: Option<Vec<Language>>,
    /// Overrides the repeat count for this job only.
    pub repeat_count: Option<u32>,
}

impl AnnounceRequest {
    pub fn new(train: Train, kind: AnnouncementKind) -> Self {
        Self {
            train,
            kind,
            extras: TemplateExtras::default(),
            languages: None,
            repeat_count: None,
        }
    }

    /// Announce a newly listed train with the kind it gets in auto mode.
    pub fn auto(train: Train) -> Self {
        let kind = train.auto_kind();
        Self::new(train, kind)
    }

    pub fn with_extras(mut self, extras: TemplateExtras) -> Self {
        self.extras = extras;
        self
    }

    pub fn with_languages(mut self, languages: Vec<Language>) -> Self {
        self.languages = Some(languages);
        self
    }

    pub fn with_repeat_count(mut self, repeat_count: u32) -> Self {
        self.repeat_count = Some(repeat_count);
        self
    }
}

/// Everything a sequencer starts from except the engines.
#[derive(Debug, Clone)]
pub struct SequencerOptions {
    pub settings: SequencerSettings,
    pub templates: TemplateTable,
    pub recordings: RecordingLibrary,
    pub history_capacity: usize,
}

impl Default for SequencerOptions {
    fn default() -> Self {
        Self {
            settings: SequencerSettings::default(),
            templates: TemplateTable::builtin(),
            recordings: RecordingLibrary::new(),
            history_capacity: defaults::HISTORY_CAPACITY,
        }
    }
}

pub struct Sequencer {
    store: Arc<SequencerStore>,
    templates: TemplateTable,
    recordings: RecordingLibrary,
    next_id: AtomicU64,
    shutdown: CancelToken,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl Sequencer {
    /// Create a sequencer and start its driver task on the current runtime.
    pub fn spawn(
        options: SequencerOptions,
        speech: Arc<dyn SpeechEngine>,
        player: Arc<dyn AudioPlayer>,
    ) -> Self {
        let store = Arc::new(SequencerStore::new(
            options.settings,
            options.history_capacity,
        ));
        let shutdown = CancelToken::new();
        let driver = Driver {
            store: Arc::clone(&store),
            speech,
            player,
            recordings: options.recordings.clone(),
        };
        let handle = tokio::spawn(driver.run(shutdown.clone()));

        Self {
            store,
            templates: options.templates,
            recordings: options.recordings,
            next_id: AtomicU64::new(1),
            shutdown,
            driver: Mutex::new(Some(handle)),
        }
    }

    /// Render and queue an announcement.
    ///
    /// Returns `None` when nothing was queued: the kind has no templates or
    /// no language produced a text.
    pub fn announce(&self, request: AnnounceRequest) -> Option<JobId> {
        let settings = self.store.settings();
        let languages = request.languages.unwrap_or(settings.languages);
        let Some(texts) =
            self.templates
                .render(&request.train, request.kind, &languages, &request.extras)
        else {
            tracing::warn!(kind = %request.kind, "no templates for announcement kind");
            return None;
        };
        let repeat_count = request.repeat_count.unwrap_or(settings.repeat_count);
        self.enqueue(request.train, request.kind, texts, repeat_count)
    }

    /// Queue already rendered texts. A job without texts is not queued.
    pub fn enqueue(
        &self,
        train: Train,
        kind: AnnouncementKind,
        texts: Vec<AnnouncementText>,
        repeat_count: u32,
    ) -> Option<JobId> {
        if texts.is_empty() {
            tracing::debug!(train = %train.train_no, %kind, "nothing to announce");
            return None;
        }
        let id = self.next_job_id();
        let job = AnnouncementJob::new(id, train, kind, texts, repeat_count);
        tracing::info!(job = %job.summary(), repeat_count = job.repeat_count, "queued announcement");
        self.store.dispatch(SequencerAction::Enqueue(job));
        Some(id)
    }

    /// Queue a one-item job that plays the recorded clip under `key`.
    pub fn play_recording(&self, key: RecordingKey) -> Result<JobId> {
        if !self.recordings.contains(&key) {
            return Err(StationvoxError::RecordingNotFound {
                key: key.to_string(),
            });
        }
        let texts = vec![AnnouncementText {
            language: key.language,
            text: defaults::RECORDED_PLAYBACK_TEXT.to_string(),
        }];
        let id = self.next_job_id();
        let job = AnnouncementJob::new(id, Train::manual(), key.kind, texts, 1).recorded_only();
        tracing::info!(job = %job.summary(), %key, "queued recorded announcement");
        self.store.dispatch(SequencerAction::Enqueue(job));
        Ok(id)
    }

    fn next_job_id(&self) -> JobId {
        JobId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn stop(&self) -> Vec<SequencerEvent> {
        tracing::info!("stop requested");
        self.store.dispatch(SequencerAction::Stop)
    }

    pub fn skip(&self) -> Vec<SequencerEvent> {
        tracing::info!("skip requested");
        self.store.dispatch(SequencerAction::Skip)
    }

    pub fn clear(&self) -> Vec<SequencerEvent> {
        tracing::info!("clear requested");
        self.store.dispatch(SequencerAction::Clear)
    }

    pub fn resume(&self) -> Vec<SequencerEvent> {
        self.store.dispatch(SequencerAction::Resume)
    }

    /// Select the languages future announcements are rendered in, in order.
    /// Duplicates are dropped.
    pub fn set_languages(&self, languages: Vec<Language>) -> SequencerSettings {
        let mut unique = Vec::with_capacity(languages.len());
        for language in languages {
            if !unique.contains(&language) {
                unique.push(language);
            }
        }
        self.store.update_settings(|s| s.languages = unique)
    }

    pub fn set_repeat_count(&self, repeat_count: u32) -> Result<SequencerSettings> {
        if repeat_count == 0 {
            return Err(StationvoxError::ConfigInvalidValue {
                key: "repeat_count".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(self.store.update_settings(|s| s.repeat_count = repeat_count))
    }

    pub fn set_volume(&self, volume: u8) -> Result<SequencerSettings> {
        if volume > defaults::MAX_VOLUME {
            return Err(StationvoxError::ConfigInvalidValue {
                key: "volume".to_string(),
                message: format!("{} is above {}", volume, defaults::MAX_VOLUME),
            });
        }
        Ok(self.store.update_settings(|s| s.volume = volume))
    }

    pub fn settings(&self) -> SequencerSettings {
        self.store.settings()
    }

    pub fn snapshot(&self) -> SequencerSnapshot {
        self.store.snapshot()
    }

    pub fn phase(&self) -> Phase {
        self.store.phase()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SequencerEvent> {
        self.store.subscribe()
    }

    pub fn recordings(&self) -> &RecordingLibrary {
        &self.recordings
    }

    pub fn templates(&self) -> &TemplateTable {
        &self.templates
    }

    /// Stop the driver task, cutting off any playback in progress.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handle = self
            .driver
            .lock()
            .map(|mut driver| driver.take())
            .unwrap_or(None);
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            tracing::warn!("sequencer driver task failed: {}", e);
        }
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::announce::JobStatus;
    use crate::audio::AudioClip;
    use crate::playback::{MockAudioPlayer, MockSpeechEngine};
    use crate::train::find_seed_train;
    use std::time::Duration;

    const SPEAK: Duration = Duration::from_millis(100);

    struct Harness {
        sequencer: Sequencer,
        speech: MockSpeechEngine,
        player: MockAudioPlayer,
    }

    fn harness_with(speech: MockSpeechEngine, options: SequencerOptions) -> Harness {
        let player = MockAudioPlayer::new().with_duration(SPEAK);
        let sequencer = Sequencer::spawn(
            options,
            Arc::new(speech.clone()),
            Arc::new(player.clone()),
        );
        Harness {
            sequencer,
            speech,
            player,
        }
    }

    fn harness() -> Harness {
        harness_with(
            MockSpeechEngine::new().with_duration(SPEAK),
            SequencerOptions::default(),
        )
    }

    fn rajdhani() -> Train {
        find_seed_train("12345").unwrap()
    }

    /// Let the driver run until nothing is scheduled sooner than `duration`.
    async fn advance(duration: Duration) {
        tokio::time::sleep(duration).await;
        tokio::task::yield_now().await;
    }

    async fn wait_idle(sequencer: &Sequencer) {
        for _ in 0..1000 {
            if sequencer.phase().is_idle() {
                return;
            }
            advance(Duration::from_millis(50)).await;
        }
        panic!("sequencer never went idle");
    }

    #[tokio::test(start_paused = true)]
    async fn announce_plays_every_language_in_order() {
        let h = harness();
        let id = h
            .sequencer
            .announce(AnnounceRequest::new(rajdhani(), AnnouncementKind::Arrival))
            .unwrap();

        wait_idle(&h.sequencer).await;

        let spoken = h.speech.spoken();
        assert_eq!(spoken.len(), 3);
        assert_eq!(
            spoken[0],
            "Train number 12345, Rajdhani Express, from New Delhi to Mumbai Central, \
             is arriving on platform number 1 at 14:30"
        );
        let languages: Vec<_> = h.speech.utterances().iter().map(|u| u.language).collect();
        assert_eq!(languages, Language::ALL.to_vec());

        let snapshot = h.sequencer.snapshot();
        assert_eq!(snapshot.history[0].id, id);
        assert_eq!(snapshot.history[0].status, JobStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_waits_item_and_settle_pauses() {
        let h = harness();
        let start = tokio::time::Instant::now();
        h.sequencer.announce(
            AnnounceRequest::new(rajdhani(), AnnouncementKind::Arrival)
                .with_languages(vec![Language::English]),
        );

        let mut events = h.sequencer.subscribe();
        loop {
            if let Ok(SequencerEvent::JobFinished { .. }) = events.recv().await {
                break;
            }
        }
        // speak 100 ms + item pause 500 ms + settle 1000 ms
        assert!(start.elapsed() >= Duration::from_millis(1600));
        assert!(start.elapsed() < Duration::from_millis(1700));
    }

    #[tokio::test(start_paused = true)]
    async fn repeat_count_three_speaks_each_text_three_times() {
        let h = harness();
        h.sequencer.announce(
            AnnounceRequest::new(rajdhani(), AnnouncementKind::Arrival)
                .with_languages(vec![Language::English, Language::Hindi])
                .with_repeat_count(3),
        );

        wait_idle(&h.sequencer).await;

        assert_eq!(h.speech.spoken().len(), 6);
        let done = &h.sequencer.snapshot().history[0];
        assert_eq!(done.current_repeat, 3);
        assert_eq!(done.status, JobStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_language_selection_queues_nothing() {
        let h = harness();
        h.sequencer.set_languages(vec![]);
        let id = h
            .sequencer
            .announce(AnnounceRequest::new(rajdhani(), AnnouncementKind::Arrival));

        assert!(id.is_none());
        assert!(h.sequencer.phase().is_idle());
        assert!(h.sequencer.snapshot().history.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cuts_playback_and_records_stopped() {
        let h = harness_with(
            MockSpeechEngine::new().never_completes(),
            SequencerOptions::default(),
        );
        h.sequencer
            .announce(AnnounceRequest::new(rajdhani(), AnnouncementKind::Arrival));
        let second = h
            .sequencer
            .announce(AnnounceRequest::new(rajdhani(), AnnouncementKind::Late))
            .unwrap();
        advance(Duration::from_secs(10)).await;
        assert_eq!(h.speech.spoken().len(), 1);

        h.sequencer.stop();
        advance(Duration::from_secs(10)).await;

        let snapshot = h.sequencer.snapshot();
        assert!(snapshot.phase.is_idle());
        assert_eq!(snapshot.history[0].status, JobStatus::Stopped);
        assert_eq!(snapshot.pending[0].id, second);
        // Nothing else was spoken after the stop.
        assert_eq!(h.speech.spoken().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn skip_on_stuck_engine_moves_to_next_cycle() {
        let h = harness_with(
            MockSpeechEngine::new().never_completes(),
            SequencerOptions::default(),
        );
        h.sequencer.announce(
            AnnounceRequest::new(rajdhani(), AnnouncementKind::Arrival)
                .with_languages(vec![Language::English])
                .with_repeat_count(2),
        );
        advance(Duration::from_secs(1)).await;

        h.sequencer.skip();
        advance(Duration::from_secs(1)).await;
        assert!(matches!(h.sequencer.phase(), Phase::Playing { repeat: 2, .. }));
        assert_eq!(h.speech.spoken().len(), 2);

        h.sequencer.skip();
        advance(Duration::from_secs(1)).await;
        assert!(h.sequencer.phase().is_idle());
        assert_eq!(
            h.sequencer.snapshot().history[0].status,
            JobStatus::Completed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn clear_empties_queue() {
        let h = harness();
        for kind in [
            AnnouncementKind::Arrival,
            AnnouncementKind::Late,
            AnnouncementKind::Departure,
        ] {
            h.sequencer.announce(AnnounceRequest::new(rajdhani(), kind));
        }

        h.sequencer.clear();
        advance(Duration::from_secs(5)).await;

        let snapshot = h.sequencer.snapshot();
        assert!(snapshot.pending.is_empty());
        assert_eq!(snapshot.history.len(), 1);
        assert_eq!(snapshot.history[0].status, JobStatus::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn recorded_clip_wins_over_speech() {
        let recordings = RecordingLibrary::new();
        let clip = AudioClip::mono(vec![3; 1600], 16000);
        recordings.insert(
            RecordingKey::new(AnnouncementKind::Arrival, Language::Hindi),
            clip.clone(),
        );
        let h = harness_with(
            MockSpeechEngine::new().with_duration(SPEAK),
            SequencerOptions {
                recordings,
                ..SequencerOptions::default()
            },
        );

        h.sequencer
            .announce(AnnounceRequest::new(rajdhani(), AnnouncementKind::Arrival));
        wait_idle(&h.sequencer).await;

        let languages: Vec<_> = h.speech.utterances().iter().map(|u| u.language).collect();
        assert_eq!(languages, vec![Language::English, Language::Kannada]);
        assert_eq!(h.player.played(), vec![clip]);
    }

    #[tokio::test(start_paused = true)]
    async fn play_recording_requires_existing_clip() {
        let h = harness();
        let key = RecordingKey::new(AnnouncementKind::Other, Language::English);
        assert!(matches!(
            h.sequencer.play_recording(key),
            Err(StationvoxError::RecordingNotFound { .. })
        ));

        h.sequencer
            .recordings()
            .insert(key, AudioClip::mono(vec![1; 160], 16000));
        h.sequencer.play_recording(key).unwrap();
        wait_idle(&h.sequencer).await;

        assert_eq!(h.player.played().len(), 1);
        assert!(h.speech.spoken().is_empty());
        let done = &h.sequencer.snapshot().history[0];
        assert_eq!(done.train.train_no, "Manual");
        assert_eq!(done.texts[0].text, defaults::RECORDED_PLAYBACK_TEXT);
    }

    #[tokio::test(start_paused = true)]
    async fn deleted_recording_fails_instead_of_speaking_label() {
        let h = harness();
        let key = RecordingKey::new(AnnouncementKind::Other, Language::Hindi);
        h.sequencer
            .recordings()
            .insert(key, AudioClip::mono(vec![1; 160], 16000));
        let mut events = h.sequencer.subscribe();

        h.sequencer
            .announce(AnnounceRequest::new(rajdhani(), AnnouncementKind::Arrival));
        let id = h.sequencer.play_recording(key).unwrap();
        h.sequencer.recordings().remove(&key).unwrap();
        wait_idle(&h.sequencer).await;

        assert_eq!(h.speech.spoken().len(), 3);
        assert!(
            !h.speech
                .spoken()
                .iter()
                .any(|text| text == defaults::RECORDED_PLAYBACK_TEXT)
        );
        assert!(h.player.played().is_empty());

        let mut failed = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let SequencerEvent::ItemFailed { job_id, message, .. } = event {
                failed.push((job_id, message));
            }
        }
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, id);
        assert!(failed[0].1.contains("other_hindi"));
        assert_eq!(
            h.sequencer.snapshot().history[0].status,
            JobStatus::Completed
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_controls_drain_every_job_once() {
        let speech = MockSpeechEngine::new().with_duration(Duration::from_millis(2));
        let player = MockAudioPlayer::new().with_duration(Duration::from_millis(2));
        let options = SequencerOptions {
            settings: SequencerSettings {
                inter_item_pause_ms: 1,
                settle_pause_ms: 1,
                ..SequencerSettings::default()
            },
            ..SequencerOptions::default()
        };
        let sequencer = Arc::new(Sequencer::spawn(
            options,
            Arc::new(speech),
            Arc::new(player),
        ));

        let mut queued = Vec::new();
        for kind in [
            AnnouncementKind::Arrival,
            AnnouncementKind::Late,
            AnnouncementKind::Departure,
            AnnouncementKind::Arrived,
        ] {
            for _ in 0..5 {
                queued.push(sequencer.announce(AnnounceRequest::new(rajdhani(), kind)).unwrap());
            }
        }

        let controllers: Vec<_> = (0..4)
            .map(|worker| {
                let sequencer = Arc::clone(&sequencer);
                tokio::spawn(async move {
                    for round in 0..10 {
                        if (worker + round) % 5 == 0 {
                            sequencer.stop();
                            sequencer.resume();
                        } else {
                            sequencer.skip();
                        }
                        tokio::time::sleep(Duration::from_millis(3)).await;
                    }
                })
            })
            .collect();
        for controller in controllers {
            controller.await.unwrap();
        }

        for _ in 0..200 {
            sequencer.resume();
            let snapshot = sequencer.snapshot();
            if snapshot.phase.is_idle() && snapshot.pending.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }

        let snapshot = sequencer.snapshot();
        assert!(snapshot.phase.is_idle());
        assert!(snapshot.pending.is_empty());

        let mut finished: Vec<JobId> = snapshot.history.iter().map(|job| job.id).collect();
        finished.sort();
        queued.sort();
        assert_eq!(finished, queued);

        let published = sequencer
            .store
            .watch_cycles()
            .borrow()
            .as_ref()
            .map(|cycle| cycle.ticket);
        assert_eq!(published, sequencer.phase().ticket());
        sequencer.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn speech_failure_moves_on_to_next_item() {
        let h = harness_with(
            MockSpeechEngine::new().with_failure(),
            SequencerOptions::default(),
        );
        let mut events = h.sequencer.subscribe();
        h.sequencer
            .announce(AnnounceRequest::new(rajdhani(), AnnouncementKind::Arrival));
        wait_idle(&h.sequencer).await;

        assert_eq!(h.speech.spoken().len(), 3);
        let mut failures = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, SequencerEvent::ItemFailed { .. }) {
                failures += 1;
            }
        }
        assert_eq!(failures, 3);
        assert_eq!(
            h.sequencer.snapshot().history[0].status,
            JobStatus::Completed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn resume_plays_jobs_retained_after_stop() {
        let h = harness();
        h.sequencer
            .announce(AnnounceRequest::new(rajdhani(), AnnouncementKind::Arrival));
        h.sequencer
            .announce(AnnounceRequest::new(rajdhani(), AnnouncementKind::Late));
        h.sequencer.stop();
        advance(Duration::from_secs(1)).await;
        assert!(h.sequencer.phase().is_idle());

        h.sequencer.resume();
        wait_idle(&h.sequencer).await;

        let history = h.sequencer.snapshot().history;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].kind, AnnouncementKind::Late);
        assert_eq!(history[0].status, JobStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn settings_validation() {
        let h = harness();
        assert!(h.sequencer.set_volume(101).is_err());
        assert_eq!(h.sequencer.set_volume(100).unwrap().volume, 100);
        assert!(h.sequencer.set_repeat_count(0).is_err());
        assert_eq!(h.sequencer.set_repeat_count(2).unwrap().repeat_count, 2);

        let settings = h.sequencer.set_languages(vec![
            Language::Kannada,
            Language::English,
            Language::Kannada,
        ]);
        assert_eq!(settings.languages, vec![Language::Kannada, Language::English]);
    }

    #[tokio::test(start_paused = true)]
    async fn job_ids_are_monotonic() {
        let h = harness();
        let a = h
            .sequencer
            .announce(AnnounceRequest::new(rajdhani(), AnnouncementKind::Arrival))
            .unwrap();
        let b = h
            .sequencer
            .announce(AnnounceRequest::auto(rajdhani()))
            .unwrap();
        assert!(b > a);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_driver() {
        let h = harness_with(
            MockSpeechEngine::new().never_completes(),
            SequencerOptions::default(),
        );
        h.sequencer
            .announce(AnnounceRequest::new(rajdhani(), AnnouncementKind::Arrival));
        advance(Duration::from_millis(10)).await;

        tokio::time::timeout(Duration::from_secs(1), h.sequencer.shutdown())
            .await
            .unwrap();
    }
}
