//! `charmap_core` is the engine behind the [charmap](https://crates.io/crates/charmap_cli)
//! command. It replaces delimiter-wrapped placeholders such as `<::KEY::>`
//! in every matching file under a directory, in place, using a fixed pool of
//! worker threads.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Target directory
//!   → Walk (lazy depth-first traversal, FileFilter on every regular file)
//!   → bounded queue (2 slots per worker, blocks the walker when full)
//!   → FileProcessor × N workers (read, PlaceholderScanner, rewrite if changed)
//!   → RunReport (every per-file failure, the walk failure, counters)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: `charmap.toml` loading and the validated [`RunConfig`].
//! - [`filter`]: include/exclude regular expressions.
//! - [`replacer`]: the [`TokenReplacer`] trait and the single-pass
//!   [`PlaceholderScanner`].
//! - [`processor`]: per-file read, replace and conditional rewrite.
//! - [`walker`]: the lazy directory walk.
//! - [`scheduler`]: the worker pool and error aggregation.
//! - [`values`]: the [`KeyValueMap`] and its sources.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use charmap_core::Delimiters;
//! use charmap_core::FileFilter;
//! use charmap_core::KeyValueMap;
//! use charmap_core::RunConfig;
//! use charmap_core::Scheduler;
//!
//! let values: KeyValueMap = [("PUBLIC_DOMAIN", "example.com")].into_iter().collect();
//! let config = RunConfig::new("deploy", 4)
//! 	.unwrap()
//! 	.delimiters(Delimiters::default())
//! 	.filter(FileFilter::with_defaults().unwrap())
//! 	.values(values);
//!
//! let report = Scheduler::new(config).run();
//! if let Err(error) = report.into_result() {
//! 	eprintln!("{error}");
//! }
//! ```

pub use config::*;
pub use error::*;
pub use filter::*;
pub use processor::*;
pub use replacer::*;
pub use scheduler::*;
pub use values::*;
pub use walker::*;

pub mod config;
#[allow(unused_assignments)]
mod error;
pub mod filter;
pub mod processor;
pub mod replacer;
pub mod scheduler;
pub mod values;
pub mod walker;

#[cfg(test)]
mod __fixtures;
