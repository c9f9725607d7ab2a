//! Chart session management module
//!
//! Session lifecycle, typed command parsing and event plumbing between the
//! feed, the REST fetches and the chart controller.

pub mod action_channel;
pub mod command_router;
pub mod session_manager;

pub use action_channel::{ActionChannel, SessionEvent};
pub use command_router::{CommandRouter, InteractiveCommand};
pub use session_manager::{OutputMode, SessionManager, SessionState, SessionStats};
