//! The interactive session: an explicit state machine over topics, questions
//! and follow-ups, plus the driver that performs its I/O.

mod controller;
mod state;

pub use controller::{QuestionSource, SessionController, SessionOutcome, SessionSettings};
pub use state::{Ending, Phase, SessionState};
