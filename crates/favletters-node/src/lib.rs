//! FavLetters Node - one running tab
//!
//! Wires the membership engine to real collaborators and keeps it alive.
//!
//! # Architecture
//!
//! - **Node**: the engine on a single-owner tokio task with periodic ticks
//! - **Storage**: JSON key/value file shared by all tabs in a data directory
//! - **Config**: environment variables with defaults
//! - **Terminal**: text rendering of the view and the glyph icon
//!
//! # Example
//!
//! ```no_run
//! use favletters_node::{start, NodeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tab = start(NodeConfig::from_env()).await?;
//!     tab.set_text("HELLO")?;
//!     println!("{}", tab.view().status_line());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod node;
pub mod storage;
pub mod terminal;

pub use config::NodeConfig;
pub use error::{Error, Result};
pub use node::{spawn, start, NodeHandle};
pub use storage::FileStore;
pub use terminal::{render_view, Input, TextIconRenderer};
