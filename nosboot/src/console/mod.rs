//! Device console: pattern-driven expect/send over the serial socket.
//!
//! ```text
//! ConsoleSession ── send(line)            → "line\r"
//!                └─ expect(patterns, t)   → (matched index?, raw bytes)
//! ```
//!
//! The session never interprets what it reads beyond pattern search; the
//! bootstrap state machine decides what a match or a timeout means.

mod pattern;
mod session;
mod telnet;

pub use pattern::Pattern;
pub use session::{ConsoleSession, ExpectOutcome, MAX_BUFFERED_BYTES};
pub use telnet::TelnetFilter;
