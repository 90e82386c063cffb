//! Identification widget core
//!
//! - `state`: lifecycle variants rendered by the presentation layer
//! - `machine`: synchronous state machine with the in-flight guard
//! - `session`: async driver pairing the machine with the dispatcher

pub mod machine;
pub mod session;
pub mod state;

pub use machine::{IdentificationWidget, Submission, SubmissionTicket};
pub use session::WidgetSession;
pub use state::IdentifyState;
