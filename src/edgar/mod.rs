//! SEC EDGAR access
//!
//! This module provides the network side of secfetch: an HTTP client that
//! identifies itself the way EDGAR requires, the quarterly master index,
//! filing folder listings and the catalog of accepted form types.

pub mod client;
pub mod forms;
pub mod master_index;
pub mod source;
pub mod types;

pub use client::SecClient;
pub use source::FilingSource;
pub use types::*;

pub use forms::{load_accepted_form_types, validate_forms};
pub use master_index::{download_master_index, load_master_index, parse_master_index};
