pub mod app;
pub mod config;
pub mod connector;
pub mod error;
pub mod export;
pub mod logging;
pub mod operation;
pub mod registry;
pub mod session;
pub mod ui;
pub mod util;
pub mod workspace;

pub use error::{Error, Result};
