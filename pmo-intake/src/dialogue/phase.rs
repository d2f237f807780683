use serde::{Deserialize, Serialize};

/// Stage of the intake conversation for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No message handled yet, or the session was just reset.
    Intro,
    /// Gathering fields; every message runs extraction.
    Collecting,
    /// The record was submitted. The next message starts a new cycle.
    Complete,
    /// Any stored phase label this build does not recognize.
    #[serde(other)]
    Unknown,
}

/// What happened to a session during a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A user message arrived.
    Message,
    /// Extraction left no required field missing.
    RecordComplete,
}

/// Work the engine performs when a transition fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Welcome,
    Collect,
    Submit,
    /// Clear the session, then welcome.
    Restart,
    /// Apologize and start over without discarding collected fields.
    Recover,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Phase,
    pub event: Event,
    pub to: Phase,
    pub action: Action,
}

const fn row(from: Phase, event: Event, to: Phase, action: Action) -> Transition {
    Transition {
        from,
        event,
        to,
        action,
    }
}

pub const TRANSITIONS: [Transition; 5] = [
    row(Phase::Intro, Event::Message, Phase::Collecting, Action::Welcome),
    row(Phase::Collecting, Event::Message, Phase::Collecting, Action::Collect),
    row(Phase::Collecting, Event::RecordComplete, Phase::Complete, Action::Submit),
    row(Phase::Complete, Event::Message, Phase::Collecting, Action::Restart),
    row(Phase::Unknown, Event::Message, Phase::Intro, Action::Recover),
];

const RECOVERY: Transition = TRANSITIONS[4];

/// Looks up the transition for `event` in `from`.
///
/// Pairs without a row (for example `RecordComplete` outside of collection)
/// resolve to the recovery transition, so no combination is fatal.
pub fn transition(from: Phase, event: Event) -> Transition {
    TRANSITIONS
        .iter()
        .find(|t| t.from == from && t.event == event)
        .copied()
        .unwrap_or(Transition { from, ..RECOVERY })
}
