//! Optional activity trace.
//!
//! The original implementation appended printf-style lines to a log file on
//! every protocol event. That side channel is kept, restructured as a
//! sink trait the engine pushes typed records to: state transitions,
//! proposed and received scalars, post-assignment table snapshots, and
//! scramble completions. With no sink configured the engine performs no
//! trace work at all. The engine only ever writes to the sink; nothing is
//! read back, and sink failures never affect protocol behavior.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Which half of a `(key, value)` pair a peer proposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// A slot index.
    Key,
    /// A symbol value.
    Value,
}

/// One protocol event, as pushed to a [`TraceSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    /// The engine discarded all negotiated state and restarted.
    Reset,
    /// This peer staged `scalar` as its next outgoing proposal.
    Proposed {
        /// Table snapshot at the time of the proposal.
        table: String,
        /// The staged scalar.
        scalar: u8,
        /// Whether the scalar is a key or a value.
        role: Role,
    },
    /// A scalar (or a terminate signal) arrived from the counterpart.
    Incoming {
        /// The received scalar; `None` is the counterpart's connect or
        /// terminate signal.
        scalar: Option<u8>,
    },
    /// A `(key, value)` pair was assigned into the table.
    Assigned {
        /// Table snapshot after the assignment.
        table: String,
        /// Assigned slot index.
        key: u8,
        /// Assigned value.
        value: u8,
        /// Cells filled so far.
        filled: u16,
        /// Adapted key-proposal probability after this assignment.
        prob_to_gen_key: f64,
    },
    /// An assignment hit an already-filled slot or already-used value.
    Collision,
    /// The peer exhausted its table and reached the connected state.
    Connected {
        /// Final table snapshot.
        table: String,
    },
    /// A scramble pass completed.
    Scrambled {
        /// Table version after the scramble.
        version: u64,
    },
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceEvent::Reset => write!(f, "Resetting!"),
            TraceEvent::Proposed {
                table,
                scalar,
                role: Role::Key,
            } => write!(f, "{} -> {{{} _}}", table, scalar),
            TraceEvent::Proposed {
                table,
                scalar,
                role: Role::Value,
            } => write!(f, "{} -> {{_ {}}}", table, scalar),
            TraceEvent::Incoming { scalar: Some(s) } => write!(f, "Incoming {{{}}}", s),
            TraceEvent::Incoming { scalar: None } => write!(f, "Incoming {{_}}"),
            TraceEvent::Assigned {
                table,
                key,
                value,
                filled,
                prob_to_gen_key,
            } => write!(
                f,
                "{} + {{{} {}}} filled: {}, key probability: {:.6}",
                table, key, value, filled, prob_to_gen_key
            ),
            TraceEvent::Collision => write!(f, "Collision!"),
            TraceEvent::Connected { table } => write!(f, "{} Connected!", table),
            TraceEvent::Scrambled { version } => write!(f, "Scrambled, version {}", version),
        }
    }
}

/// Destination for [`TraceEvent`] records.
///
/// Implementations must treat the stream as append-only diagnostics; the
/// engine never reads anything back.
pub trait TraceSink {
    /// Records one event. Failures should be swallowed, not propagated.
    fn record(&mut self, event: &TraceEvent);
}

/// Appends one line per event to a file, opening and closing the file on
/// every record, like the original logger. I/O errors are silently
/// ignored: the trace is a best-effort side channel.
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    /// Creates a sink appending to `path`. The file is created on first
    /// record if it does not exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSink { path: path.into() }
    }
}

impl TraceSink for FileSink {
    fn record(&mut self, event: &TraceEvent) {
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(file, "{}", event);
        }
    }
}
