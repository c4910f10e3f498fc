//! Fetch engine integration
//!
//! The worker never talks to a fetch engine directly. It drives a
//! [`ProgressSource`]: something that performs a (slow) fetch for an identifier
//! and, independently, answers "how far along are you?" on demand.
//!
//! - [`CommandSource`]: runs an external fetcher program and reads progress
//!   lines from its stdout
//! - any other implementation can be injected through
//!   [`FetchService::with_source`](crate::FetchService::with_source)
//!
//! ## Usage
//!
//! ```no_run
//! use fetch_queue::source::{CommandSource, ProgressSource};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = CommandSource::new(PathBuf::from("/usr/local/bin/fetcher"));
//!
//!     source.fetch_collection("alice").await?;
//!     let progress = source.snapshot()?;
//!     println!("{}/{} {}", progress.current, progress.total, progress.status);
//!
//!     Ok(())
//! }
//! ```

mod command;
mod parser;
mod traits;

pub use command::CommandSource;
pub use parser::parse_progress_line;
pub use traits::ProgressSource;
