//! A terminal client that lets a completion service answer queries with
//! the tools of a local tool provider.
//!
//! The crate includes a CLI tool for using in the terminal. The
//! configuration layer is exposed as a library so other front ends can
//! reuse it.

#![deny(missing_docs)]

pub mod config;

pub use config::{Cli, Config, ConfigError};

/// Re-exports of [`toolbridge_core`] crate.
pub mod core {
    pub use toolbridge_core::*;
}
