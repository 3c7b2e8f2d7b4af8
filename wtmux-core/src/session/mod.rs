//! Session registry and lifecycle

mod manager;
#[allow(clippy::module_inception)]
mod session;

pub use manager::SessionManager;
pub use session::{Session, SessionState};

pub(crate) use manager::SessionDirectory;
