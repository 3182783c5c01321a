pub mod app;
pub mod events;
pub mod settings;
pub mod uninstall;

pub use app::*;
pub use events::*;
pub use settings::*;
pub use uninstall::*;
