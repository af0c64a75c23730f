//! Core module - ledger access, rollups and the workflows built on them

pub mod aggregates;
pub mod columns;
pub mod common_material;
pub mod config;
pub mod dates;
pub mod inbound;
pub mod labels;
pub mod ledger;
pub mod order_search;
pub mod project;
pub mod reconcile;
pub mod returns;
pub mod store;

pub use config::Config;
pub use ledger::{Ledger, LedgerError};
pub use project::{Project, ProjectError};
pub use store::{BlobStore, FsStore, Store, StoreError};
