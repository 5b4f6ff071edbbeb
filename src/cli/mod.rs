//! CLI support module

pub mod logging;

pub use logging::init_logging;
