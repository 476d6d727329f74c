//! Device bootstrap for Tether.
//!
//! Wires the keystore, provisioner, and session manager into the
//! store-first flow: consult the keystore, provision on a miss,
//! persist the new identity, then connect. Library only; embedders
//! own the front end.

pub mod bootstrap;
pub mod config;

pub use bootstrap::{BootstrapError, connect_device, ensure_identity};
pub use config::DeviceConfig;
