//! An abstraction layer for completion services.
//!
//! This crate establishes the protocol the orchestrator uses to ask a
//! completion service for the next turn of a conversation, so that the
//! backend can be swapped (a real HTTP endpoint, a scripted fake in
//! tests) without touching the orchestration loop.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
