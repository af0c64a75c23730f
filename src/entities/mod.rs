//! Domain value types
//!
//! - [`Process`] - the fixed production lines a return comes back from
//! - [`LabelCategory`] / [`LabelRecord`] - label reference table entries

pub mod label;
pub mod process;

pub use label::{LabelCategory, LabelRecord};
pub use process::Process;
