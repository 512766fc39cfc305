//! Events published while a migration runs.
//!
//! The orchestrator owns an [`EventSink`]; whoever wants progress holds the
//! receiving end of the channel. A dropped receiver only silences events.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Scanning,
    Planning,
    Writing,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MigrationEvent {
    Progress {
        phase: Phase,
        total: usize,
        completed: usize,
        current_file: Option<PathBuf>,
        status: String,
    },
    Log {
        level: LogLevel,
        message: String,
    },
    Diff {
        file: PathBuf,
        diff: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<UnboundedSender<MigrationEvent>>,
}

impl EventSink {
    pub fn channel() -> (EventSink, UnboundedReceiver<MigrationEvent>) {
        let (tx, rx) = unbounded_channel();
        (EventSink { tx: Some(tx) }, rx)
    }

    /// A sink that drops everything.
    pub fn disabled() -> Self {
        EventSink::default()
    }

    pub fn emit(&self, event: MigrationEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn progress(
        &self,
        phase: Phase,
        total: usize,
        completed: usize,
        current_file: Option<&Path>,
        status: impl Into<String>,
    ) {
        self.emit(MigrationEvent::Progress {
            phase,
            total,
            completed,
            current_file: current_file.map(Path::to_path_buf),
            status: status.into(),
        });
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.emit(MigrationEvent::Log {
            level,
            message: message.into(),
        });
    }

    pub fn diff(&self, file: &Path, diff: impl Into<String>) {
        self.emit(MigrationEvent::Diff {
            file: file.to_path_buf(),
            diff: diff.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_a_type_tag() {
        let ev = MigrationEvent::Progress {
            phase: Phase::Writing,
            total: 3,
            completed: 1,
            current_file: Some(PathBuf::from("src/App.jsx")),
            status: "written".into(),
        };
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["type"], "progress");
        assert_eq!(v["phase"], "writing");
        assert_eq!(v["current_file"], "src/App.jsx");
    }

    #[test]
    fn closed_channel_is_ignored() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        sink.log(LogLevel::Info, "nobody listens");
        EventSink::disabled().log(LogLevel::Warn, "nor here");
    }

    #[test]
    fn events_arrive_in_order() {
        let (sink, mut rx) = EventSink::channel();
        sink.log(LogLevel::Info, "a");
        sink.diff(Path::new("a.jsx"), "-x\n+y\n");
        assert!(matches!(rx.try_recv(), Ok(MigrationEvent::Log { .. })));
        assert!(matches!(rx.try_recv(), Ok(MigrationEvent::Diff { .. })));
    }
}
