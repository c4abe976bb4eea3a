//! Train records announced by the sequencer.

use crate::announce::kind::AnnouncementKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Running status of a train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrainStatus {
    #[default]
    OnTime,
    Late,
    Arrived,
    Cancelled,
}

impl fmt::Display for TrainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrainStatus::OnTime => "On Time",
            TrainStatus::Late => "Late",
            TrainStatus::Arrived => "Arrived",
            TrainStatus::Cancelled => "Cancelled",
        };
        f.write_str(s)
    }
}

/// Whether the train is arriving at or departing from this station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainDirection {
    #[default]
    Arrival,
    Departure,
}

/// A train as shown on the station board.
///
/// `eta` is the scheduled time as displayed (e.g. `14:30`); it is substituted
/// into templates verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Train {
    pub train_no: String,
    pub name: String,
    pub source: String,
    pub destination: String,
    pub platform: String,
    pub eta: String,
    pub status: TrainStatus,
    pub direction: TrainDirection,
    pub delay: Option<u32>,
}

impl Train {
    pub fn new(train_no: &str, name: &str) -> Self {
        Self {
            train_no: train_no.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn route(mut self, source: &str, destination: &str) -> Self {
        self.source = source.to_string();
        self.destination = destination.to_string();
        self
    }

    pub fn platform(mut self, platform: &str) -> Self {
        self.platform = platform.to_string();
        self
    }

    pub fn eta(mut self, eta: &str) -> Self {
        self.eta = eta.to_string();
        self
    }

    pub fn status(mut self, status: TrainStatus) -> Self {
        self.status = status;
        self
    }

    pub fn direction(mut self, direction: TrainDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn delay(mut self, minutes: u32) -> Self {
        self.delay = Some(minutes);
        self
    }

    /// Announcement made automatically when the train is added to the board.
    pub fn auto_kind(&self) -> AnnouncementKind {
        match self.direction {
            TrainDirection::Arrival => AnnouncementKind::Arrival,
            TrainDirection::Departure => AnnouncementKind::Departure,
        }
    }

    /// Placeholder train for jobs that only play a recorded clip.
    pub fn manual() -> Self {
        Self::new("Manual", "Recorded Announcement")
    }
}

/// Trains present on the board at startup.
pub fn seed_trains() -> Vec<Train> {
    vec![
        Train::new("12345", "Rajdhani Express")
            .route("New Delhi", "Mumbai Central")
            .platform("1")
            .eta("14:30"),
        Train::new("22626", "Shatabdi Express")
            .route("Chennai", "Mysore")
            .platform("2")
            .eta("15:45")
            .status(TrainStatus::Late)
            .delay(15),
        Train::new("16229", "Vasco Express")
            .route("Mysore", "Vasco")
            .platform("3")
            .eta("16:20")
            .direction(TrainDirection::Departure),
        Train::new("12008", "Shatabdi Express")
            .route("Mysore", "Bangalore")
            .platform("4")
            .eta("17:00")
            .status(TrainStatus::Arrived)
            .direction(TrainDirection::Departure),
        Train::new("56220", "Passenger")
            .route("Bangalore", "Mysore")
            .platform("5")
            .eta("18:15"),
    ]
}

/// Look up a seed train by number.
pub fn find_seed_train(train_no: &str) -> Option<Train> {
    seed_trains().into_iter().find(|t| t.train_no == train_no)
}
