//! Data models: configuration, job output documents, and result records.

pub mod config;
pub mod output;
pub mod record;
