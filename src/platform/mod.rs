//! Platform adapters.
//!
//! The renderer only talks to the [`Platform`](crate::renderer::Platform)
//! trait. [`MemoryPlatform`] is the adapter shipped with the crate; it backs
//! the tests and demos.

pub mod memory;

pub use memory::{HostOp, MemoryPlatform};
