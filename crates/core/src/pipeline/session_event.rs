use crate::alert::domain::alert_snapshot::AlertSnapshot;

/// Messages from the session lanes to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Published once per evaluated frame.
    State(AlertSnapshot),
    /// The frame source ran out of frames on its own.
    SourceEnded,
    /// The session stopped and the warning is silent.
    Stopped,
    /// A lane hit an error it could not recover from.
    Error(String),
}
