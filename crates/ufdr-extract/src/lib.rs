//! UFDR Extraction Library
//!
//! Everything between "a finalized archive object in the store" and
//! "normalized records ready for the loaders":
//!
//! - `stager` downloads the archive to scratch space and pulls out the
//!   evidence tree and any embedded chat databases;
//! - `xml` streams the evidence tree and parses the six domains;
//! - `chatdb` reads embedded SQLite chat databases in either schema
//!   layout;
//! - `dedupe` collapses duplicate records onto their natural keys.

pub mod chatdb;
pub mod dedupe;
pub mod stager;
pub mod time;
pub mod xml;

pub use stager::{StagedArchive, Stager};
