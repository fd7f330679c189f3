//! Core value model and textual codec for the Parrot project.
//!
//! A [`Value`] is the unit of everything Parrot records and replays: call
//! arguments, attribute snapshots and replay-artifact literals are all
//! expressed in this model. [`Value::encode`] and [`Value::decode`] are
//! inverse operations over it.

mod parse;
mod value;

pub use parse::{decode, parse_args, parse_prefix};
pub use value::{Value, ValueError};

/// Opens a verbatim multi-line string block in a replay artifact.
pub const OPEN_SENTINEL: &str = ">\"\">";

/// Closes a verbatim multi-line string block in a replay artifact.
pub const CLOSE_SENTINEL: &str = "<\"\"<";

/// Delimits the documentation block of a replay artifact.
pub const DOC_MARKER: &str = "\"\"\"";
