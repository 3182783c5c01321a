pub mod bundle_reader;

pub use bundle_reader::{identity_for, read_identity};
