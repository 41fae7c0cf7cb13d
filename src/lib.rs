// Library surface shared by the binary and the integration tests.
pub mod app;
pub mod app_dirs;
pub mod audio;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod generator;
pub mod logging;
pub mod passages;
pub mod quiz;
pub mod runtime;
pub mod scorer;
pub mod session;
pub mod text;
pub mod ui;

pub use error::{Error, Result};
