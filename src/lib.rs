// Public API for integration tests and potential library usage

pub mod app;
pub mod config;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod room;
pub mod state;
pub mod types;
pub mod words;
pub mod ws;
