//! Domain types and pure logic for the visualization pipeline.
//!
//! Nothing in this crate performs I/O: job records and their status
//! machine, chat turns, and the fenced-block extractors used to pull plans
//! and source code out of language-model responses.

pub mod chat;
pub mod error;
pub mod extract;
pub mod job;
pub mod types;
