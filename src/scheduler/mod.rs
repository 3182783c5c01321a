pub mod fs_watcher;

pub use fs_watcher::{arm_if_enabled, default_trash_dir, Sentinel, SentinelCallback};
