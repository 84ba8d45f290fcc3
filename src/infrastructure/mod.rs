// Infrastructure module - Serial ports, configuration files and logging
pub mod config;
pub mod logging;
pub mod serial;
