//! Crash-safe JSON document storage.
//!
//! Every document is written with the temp-file-then-rename pattern, so a
//! reader never observes a half-written file. Reading is resilient: a document
//! that exists but cannot be decoded is replaced by its default value and a
//! [`Warning`] describing what went wrong, instead of an error.
//!
//! ```no_run
//! use codemap_json::{read_json_resilient, write_json_atomic, Loaded};
//! use std::collections::BTreeMap;
//!
//! # fn example() -> codemap_json::Result<()> {
//! let mut counts = BTreeMap::new();
//! counts.insert("files".to_string(), 3_u64);
//! write_json_atomic("counts.json", &counts)?;
//!
//! match read_json_resilient::<BTreeMap<String, u64>, _>("counts.json")? {
//!     Some(Loaded::Parsed(value)) => assert_eq!(value["files"], 3),
//!     Some(Loaded::Defaulted { warning, .. }) => eprintln!("{warning}"),
//!     None => eprintln!("no document yet"),
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod atomic;
pub mod error;
pub mod reader;
pub mod warning;

pub use atomic::{remove_if_exists, write_json_atomic};
pub use error::{Error, Result};
pub use reader::{Loaded, read_json_resilient};
pub use warning::Warning;
