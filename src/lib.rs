//! submat: submaterial ledger toolkit
//!
//! Reads the plant's packaging-material ledger workbook and answers the
//! questions the floor asks of it: what came in, which sales orders a part
//! feeds, how much returned stock to expect, and how many sheets are left on
//! a label roll.

pub mod cli;
pub mod core;
pub mod entities;
pub mod report;
