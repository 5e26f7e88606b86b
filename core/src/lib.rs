pub mod action;
pub mod config;
pub mod interactive;
pub mod locale;
pub mod style;
pub mod testing;
pub mod update;

pub use crate::config::Config;
