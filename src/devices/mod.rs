//! Input device discovery
//!
//! Raw device records come from the platform; this module classifies them
//! into the catalog the session context carries.

pub mod catalog;

pub use catalog::{Device, DeviceCatalog, DeviceKind};
