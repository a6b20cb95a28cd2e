pub mod commands;
pub mod config;
pub mod display;
pub mod logging;
pub mod service;
pub mod session;
