//! CLI command implementations

pub mod common;
pub mod completions;
pub mod inbound;
pub mod init;
pub mod label;
pub mod orders;
pub mod returns;
pub mod status;
pub mod upload;
