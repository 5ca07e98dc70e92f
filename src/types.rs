// src/types.rs

//! Small enums shared across the scheduler: lifecycle state, client mode,
//! stop reasons and the vocabulary of legal transitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Client-controlled intent for a task.
///
/// Mode only ever tightens: `Idle -> Active -> Cancel`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    /// Do not progress past admission-ready.
    #[default]
    Idle,
    /// Progress to completion.
    Active,
    /// Terminal intent; cannot be left once set.
    Cancel,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Idle => "IDLE",
            Mode::Active => "ACTIVE",
            Mode::Cancel => "CANCEL",
        };
        f.write_str(s)
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "idle" => Ok(Mode::Idle),
            "active" => Ok(Mode::Active),
            "cancel" => Ok(Mode::Cancel),
            other => Err(format!(
                "invalid mode: {other} (expected \"idle\", \"active\" or \"cancel\")"
            )),
        }
    }
}

/// Lifecycle position of a task, in rank order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
    New,
    Waiting,
    Enqueued,
    Starting,
    Up,
    Stopping,
    Stopped,
    Successful,
    Failed,
    StartFailed,
    StopFailed,
}

impl State {
    pub const ALL: [State; 11] = [
        State::New,
        State::Waiting,
        State::Enqueued,
        State::Starting,
        State::Up,
        State::Stopping,
        State::Stopped,
        State::Successful,
        State::Failed,
        State::StartFailed,
        State::StopFailed,
    ];

    /// Terminal states. Nothing moves a task out of them.
    pub fn is_final(self) -> bool {
        matches!(
            self,
            State::Stopped
                | State::Successful
                | State::Failed
                | State::StartFailed
                | State::StopFailed
        )
    }

    /// Not yet started and not finished. Dependencies may still be added.
    pub fn is_idle(self) -> bool {
        matches!(self, State::New | State::Waiting | State::Enqueued)
    }

    /// Holding an admission slot.
    pub fn is_running(self) -> bool {
        matches!(self, State::Starting | State::Up | State::Stopping)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            State::New => "NEW",
            State::Waiting => "WAITING",
            State::Enqueued => "ENQUEUED",
            State::Starting => "STARTING",
            State::Up => "UP",
            State::Stopping => "STOPPING",
            State::Stopped => "STOPPED",
            State::Successful => "SUCCESSFUL",
            State::Failed => "FAILED",
            State::StartFailed => "START_FAILED",
            State::StopFailed => "STOP_FAILED",
        };
        f.write_str(s)
    }
}

/// Reason a task is being driven toward a stopped or failed outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopFlag {
    #[default]
    None,
    Cancelled,
    DependencyFailed,
    Unsuccessful,
}

/// Every legal move of the task state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Transition {
    NewToWaiting,
    NewToEnqueued,
    NewToStopped,
    WaitingToEnqueued,
    WaitingToStopped,
    EnqueuedToStarting,
    EnqueuedToStopped,
    StartingToUp,
    StartingToStopping,
    StartingToStartFailed,
    UpToSuccessful,
    UpToFailed,
    UpToStopping,
    StoppingToStopped,
    StoppingToStopFailed,
}

impl Transition {
    pub fn before(self) -> State {
        self.endpoints().0
    }

    pub fn after(self) -> State {
        self.endpoints().1
    }

    fn endpoints(self) -> (State, State) {
        use State::*;
        match self {
            Transition::NewToWaiting => (New, Waiting),
            Transition::NewToEnqueued => (New, Enqueued),
            Transition::NewToStopped => (New, Stopped),
            Transition::WaitingToEnqueued => (Waiting, Enqueued),
            Transition::WaitingToStopped => (Waiting, Stopped),
            Transition::EnqueuedToStarting => (Enqueued, Starting),
            Transition::EnqueuedToStopped => (Enqueued, Stopped),
            Transition::StartingToUp => (Starting, Up),
            Transition::StartingToStopping => (Starting, Stopping),
            Transition::StartingToStartFailed => (Starting, StartFailed),
            Transition::UpToSuccessful => (Up, Successful),
            Transition::UpToFailed => (Up, Failed),
            Transition::UpToStopping => (Up, Stopping),
            Transition::StoppingToStopped => (Stopping, Stopped),
            Transition::StoppingToStopFailed => (Stopping, StopFailed),
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.before(), self.after())
    }
}

/// HTTP method of a remote request descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        };
        f.write_str(s)
    }
}

/// Coarse state groups used when listing tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateFilter {
    /// NEW, WAITING, ENQUEUED
    pub waiting: bool,
    /// STARTING, UP, STOPPING
    pub running: bool,
    /// every final state
    pub finished: bool,
}

impl StateFilter {
    pub fn all() -> Self {
        Self {
            waiting: true,
            running: true,
            finished: true,
        }
    }

    pub fn states(&self) -> Vec<State> {
        State::ALL
            .into_iter()
            .filter(|s| {
                (self.waiting && s.is_idle())
                    || (self.running && s.is_running())
                    || (self.finished && s.is_final())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_groups_partition_all_states() {
        for s in State::ALL {
            let groups = [s.is_idle(), s.is_running(), s.is_final()];
            assert_eq!(groups.iter().filter(|g| **g).count(), 1, "{s}");
        }
    }

    #[test]
    fn filter_selects_groups() {
        let f = StateFilter {
            waiting: false,
            running: true,
            finished: false,
        };
        assert_eq!(f.states(), vec![State::Starting, State::Up, State::Stopping]);
        assert!(StateFilter::default().states().is_empty());
        assert_eq!(StateFilter::all().states().len(), State::ALL.len());
    }

    #[test]
    fn transition_display_uses_state_names() {
        assert_eq!(Transition::UpToSuccessful.to_string(), "UP->SUCCESSFUL");
        assert_eq!(
            Transition::StartingToStartFailed.to_string(),
            "STARTING->START_FAILED"
        );
    }

    #[test]
    fn defaults_match_a_fresh_submission() {
        assert_eq!(Mode::default(), Mode::Idle);
        assert_eq!(StopFlag::default(), StopFlag::None);
        assert_eq!(Method::default(), Method::Post);
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Active".parse::<Mode>(), Ok(Mode::Active));
        assert!("paused".parse::<Mode>().is_err());
    }
}
