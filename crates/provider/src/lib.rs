//! A tool provider speaking the toolbridge protocol over stdio.
//!
//! Tools implement the [`tool::Tool`] trait and are collected in a
//! [`tool::Toolbox`], which a [`Server`] exposes to clients.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod server;
pub mod tool;
pub mod tools;

pub use server::Server;
