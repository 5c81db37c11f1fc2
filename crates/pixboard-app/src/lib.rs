//! Pixboard Application
//!
//! Headless shell: renders, inspects and shares canvases from the command
//! line.

mod app;
pub mod cli;

pub use app::{App, AppConfig, AppError};
pub use cli::{Cli, Commands};
