pub mod hooks;
pub mod registry;
pub mod scan;
pub mod session;
pub mod settings;
pub mod uninstall;

pub use session::{Session, SharedSession};
