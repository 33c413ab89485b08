pub mod config;
pub mod engine;
pub mod error;
pub mod init;
pub mod logger;
pub mod monitor;
pub mod mute;
pub mod observer;
pub mod runner;
