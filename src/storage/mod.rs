//! Local storage: filesystem layout and the download manifest

pub mod layout;
pub mod manifest;

pub use manifest::{Manifest, ManifestEntry};
