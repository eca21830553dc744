//! Engine client surface for yagg.
//!
//! The engine is the external collaborator that owns the repository: it
//! opens it, reads history and diffs, and performs every mutation. This crate
//! defines the typed request/response surface the client core talks to and
//! nothing else. There is no caching and no retrying here; each call is one
//! round trip.
//!
//! # Modules
//!
//! - [`error`] -- [`EngineError`] as reported by the backend
//! - [`traits`] -- the [`Engine`] trait, one method per repository operation
//! - [`memory`] -- [`InMemoryEngine`], a scriptable engine for tests and demos

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{EngineError, EngineResult};
pub use memory::{EngineCall, InMemoryEngine, MemoryRepo};
pub use traits::Engine;
