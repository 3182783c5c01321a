pub mod commands;
pub mod db;
pub mod detection;
pub mod discovery;
pub mod models;
pub mod platform;
pub mod scheduler;
pub mod utils;
