//! Shared rendering for terminal output.
//! Used by `stationvox follow` and the one-shot client commands.

use crate::announce::{AnnouncementJob, JobStatus};
use crate::ipc::protocol::RecordingStatus;
use crate::recordings::RecordingInfo;
use crate::sequencer::{Phase, SequencerEvent, SequencerSettings, SequencerSnapshot};
use crate::train::{Train, TrainStatus};
use owo_colors::OwoColorize;
use std::fmt::Write;

/// One line describing a sequencer event.
pub fn format_event(event: &SequencerEvent) -> String {
    match event {
        SequencerEvent::Enqueued {
            summary, queue_len, ..
        } => format!(
            "{} {} {}",
            "queued".cyan(),
            summary,
            format!("({} in queue)", queue_len).dimmed()
        ),
        SequencerEvent::CycleStarted {
            job_id,
            repeat,
            repeat_count,
        } => format!(
            "{} {} cycle {}/{}",
            "playing".green(),
            job_id,
            repeat,
            repeat_count
        ),
        SequencerEvent::ItemStarted {
            language,
            text,
            recorded,
            ..
        } => {
            let source = if *recorded { "recorded" } else { "speech" };
            format!(
                "  {} {} {}",
                format!("[{}]", language).bold(),
                text,
                format!("({})", source).dimmed()
            )
        }
        SequencerEvent::ItemFailed {
            language, message, ..
        } => format!(
            "  {} {}",
            format!("[{}]", language).bold(),
            format!("failed: {}", message).red()
        ),
        SequencerEvent::CycleFinished { job_id, repeat } => {
            format!("{} cycle {} done", job_id, repeat)
                .dimmed()
                .to_string()
        }
        SequencerEvent::JobFinished {
            summary, status, ..
        } => format!("{} {}", format_status_label(*status), summary),
        SequencerEvent::QueueCleared { dropped } => {
            format!("{} {} queued job(s) dropped", "cleared".yellow(), dropped)
        }
        SequencerEvent::Idle => "idle".dimmed().to_string(),
    }
}

/// Print a sequencer event on stdout.
pub fn render_event(event: &SequencerEvent) {
    println!("{}", format_event(event));
}

fn format_status_label(status: JobStatus) -> String {
    match status {
        JobStatus::Queued => status.to_string().cyan().to_string(),
        JobStatus::Completed => status.to_string().green().to_string(),
        JobStatus::Stopped => status.to_string().yellow().to_string(),
    }
}

/// One line per job: id, kind, train, status and cycle progress.
pub fn format_job(job: &AnnouncementJob) -> String {
    let mut line = format!(
        "{} {} {} {}",
        job.id,
        format_status_label(job.status),
        job.kind.label(),
        format!("{} {}", job.train.train_no, job.train.name).bold()
    );
    if job.repeat_count > 1 || job.current_repeat > 0 {
        write!(line, " [{}/{}]", job.current_repeat, job.repeat_count).ok();
    }
    if let Some(finished) = job.finished_at {
        write!(
            line,
            " {}",
            finished.format("%H:%M:%S").to_string().dimmed()
        ).ok();
    }
    line
}

pub fn format_phase(phase: &Phase) -> String {
    match phase {
        Phase::Idle => "idle".dimmed().to_string(),
        Phase::Playing { job_id, repeat, .. } => {
            format!("{} {} (cycle {})", "playing".green(), job_id, repeat)
        }
    }
}

pub fn format_settings(settings: &SequencerSettings) -> String {
    let languages: Vec<&str> = settings.languages.iter().map(|l| l.as_str()).collect();
    let languages = if languages.is_empty() {
        "(none)".to_string()
    } else {
        languages.join(", ")
    };
    format!(
        "  {}  {}\n  {}     {}\n  {}     {}%",
        "Languages:".dimmed(),
        languages,
        "Repeat:".dimmed(),
        settings.repeat_count,
        "Volume:".dimmed(),
        settings.volume
    )
}

/// Multi-line daemon status.
pub fn format_status(snapshot: &SequencerSnapshot, recording: Option<&RecordingStatus>) -> String {
    let mut out = String::new();
    writeln!(out, "  {}     {}", "State:".dimmed(), format_phase(&snapshot.phase)).ok();
    if let Some(job) = &snapshot.current {
        writeln!(out, "  {}   {}", "Current:".dimmed(), format_job(job)).ok();
    }
    writeln!(out, "  {}   {}", "Pending:".dimmed(), snapshot.pending.len()).ok();
    writeln!(out, "  {}   {}", "History:".dimmed(), snapshot.history.len()).ok();
    if let Some(recording) = recording {
        writeln!(
            out,
            "  {} {} ({:.1}s)",
            "Recording:".dimmed(),
            recording.key.red(),
            recording.elapsed_ms as f64 / 1000.0
        ).ok();
    }
    out.push_str(&format_settings(&snapshot.settings));
    out
}

pub fn format_recording(info: &RecordingInfo) -> String {
    format!(
        "{} {:.1}s {} Hz {}",
        info.key.bold(),
        info.duration_ms as f64 / 1000.0,
        info.sample_rate,
        info.recorded_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    )
}

pub fn format_train(train: &Train) -> String {
    let status = match train.status {
        TrainStatus::OnTime => train.status.to_string().green().to_string(),
        TrainStatus::Late => match train.delay {
            Some(minutes) => format!("Late {} min", minutes).yellow().to_string(),
            None => train.status.to_string().yellow().to_string(),
        },
        TrainStatus::Arrived => train.status.to_string().cyan().to_string(),
        TrainStatus::Cancelled => train.status.to_string().red().to_string(),
    };
    format!(
        "{} {} {} → {} PF {} {} {}",
        train.train_no.bold(),
        train.name,
        train.source,
        train.destination,
        train.platform,
        train.eta,
        status
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::announce::{AnnouncementKind, AnnouncementText, JobId, Language};
    use crate::recordings::RecordingKey;
    use crate::train::find_seed_train;

    fn job() -> AnnouncementJob {
        AnnouncementJob::new(
            JobId(3),
            find_seed_train("12345").unwrap(),
            AnnouncementKind::Arrival,
            vec![AnnouncementText {
                language: Language::English,
                text: "arriving".to_string(),
            }],
            2,
        )
    }

    #[test]
    fn test_format_enqueued_event() {
        let line = format_event(&SequencerEvent::Enqueued {
            job_id: JobId(3),
            summary: "#3 Arrival 12345 (Rajdhani Express)".to_string(),
            queue_len: 2,
        });
        assert!(line.contains("queued"));
        assert!(line.contains("Rajdhani Express"));
        assert!(line.contains("(2 in queue)"));
    }

    #[test]
    fn test_format_item_started_marks_source() {
        let recorded = format_event(&SequencerEvent::ItemStarted {
            job_id: JobId(1),
            language: Language::Hindi,
            text: "ध्यान दें".to_string(),
            recorded: true,
        });
        assert!(recorded.contains("[hindi]"));
        assert!(recorded.contains("ध्यान दें"));
        assert!(recorded.contains("(recorded)"));

        let spoken = format_event(&SequencerEvent::ItemStarted {
            job_id: JobId(1),
            language: Language::English,
            text: "Attention".to_string(),
            recorded: false,
        });
        assert!(spoken.contains("(speech)"));
    }

    #[test]
    fn test_format_item_failed() {
        let line = format_event(&SequencerEvent::ItemFailed {
            job_id: JobId(1),
            language: Language::Kannada,
            message: "espeak-ng missing".to_string(),
        });
        assert!(line.contains("failed: espeak-ng missing"));
    }

    #[test]
    fn test_format_cycle_events() {
        let started = format_event(&SequencerEvent::CycleStarted {
            job_id: JobId(5),
            repeat: 2,
            repeat_count: 3,
        });
        assert!(started.contains("#5 cycle 2/3"));

        let finished = format_event(&SequencerEvent::CycleFinished {
            job_id: JobId(5),
            repeat: 2,
        });
        assert!(finished.contains("#5 cycle 2 done"));
    }

    #[test]
    fn test_format_job_finished_and_cleared() {
        let line = format_event(&SequencerEvent::JobFinished {
            job_id: JobId(5),
            summary: "#5 Late/Delay 22626 (Shatabdi Express)".to_string(),
            status: JobStatus::Stopped,
        });
        assert!(line.contains("stopped"));
        assert!(line.contains("Shatabdi Express"));

        let line = format_event(&SequencerEvent::QueueCleared { dropped: 4 });
        assert!(line.contains("4 queued job(s) dropped"));
        assert!(format_event(&SequencerEvent::Idle).contains("idle"));
    }

    #[test]
    fn test_format_job_shows_progress() {
        let line = format_job(&job());
        assert!(line.contains("#3"));
        assert!(line.contains("queued"));
        assert!(line.contains("12345 Rajdhani Express"));
        assert!(line.contains("[0/2]"));
    }

    #[test]
    fn test_format_job_single_cycle_without_progress() {
        let mut job = job();
        job.repeat_count = 1;
        assert!(!format_job(&job).contains('['));
    }

    #[test]
    fn test_format_phase() {
        assert!(format_phase(&Phase::Idle).contains("idle"));
        let playing = format_phase(&Phase::Playing {
            job_id: JobId(2),
            repeat: 1,
            ticket: 9,
        });
        assert!(playing.contains("#2 (cycle 1)"));
    }

    #[test]
    fn test_format_status_includes_recording_and_settings() {
        let snapshot = SequencerSnapshot {
            phase: Phase::Idle,
            current: None,
            pending: vec![job()],
            history: vec![],
            settings: SequencerSettings::default(),
        };
        let recording = RecordingStatus {
            key: RecordingKey::new(AnnouncementKind::Late, Language::English),
            elapsed_ms: 2500,
        };

        let out = format_status(&snapshot, Some(&recording));
        assert!(out.contains("late_english"));
        assert!(out.contains("(2.5s)"));
        assert!(out.contains("english, hindi, kannada"));
        assert!(out.contains("80%"));
    }

    #[test]
    fn test_format_settings_without_languages() {
        let settings = SequencerSettings {
            languages: vec![],
            ..SequencerSettings::default()
        };
        assert!(format_settings(&settings).contains("(none)"));
    }

    #[test]
    fn test_format_train_shows_delay() {
        let line = format_train(&find_seed_train("22626").unwrap());
        assert!(line.contains("22626"));
        assert!(line.contains("Chennai → Mysore"));
        assert!(line.contains("Late 15 min"));
    }
}
