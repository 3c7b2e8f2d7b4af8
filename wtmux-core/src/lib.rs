//! wtmux-core: the session multiplexer
//!
//! Keeps one persistent PTY session per logical work area and lets
//! viewers attach, detach, and reattach without restarting the
//! underlying process. Recently visible screen contents are resumed
//! from checkpoints instead of replaying raw output history.
//!
//! The entry point is [`SessionManager`]: construct one at application
//! startup (it is an explicit context object, not a hidden global) and
//! route every transport operation through it. Attaching hands the
//! manager an `mpsc::Sender<SessionEvent>`; the caller keeps the
//! receiving end as its push channel.

pub mod config;
pub mod listeners;
pub mod pty;
pub mod screen;
pub mod session;

pub use config::CoreConfig;
pub use listeners::ListenerTable;
pub use screen::ScreenBuffer;
pub use session::{Session, SessionManager, SessionState};

// The protocol types callers need alongside the manager
pub use wtmux_protocol::{AttachOutcome, Checkpoint, SessionEvent, SessionKey, SessionStatus};
pub use wtmux_utils::{Result, WtmuxError};
