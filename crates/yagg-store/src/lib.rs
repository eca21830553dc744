//! Client-side repository state store for yagg.
//!
//! [`RepoStore`] is the single writer of everything the UI knows about the
//! open repository. It calls the [`Engine`](yagg_engine::Engine) for every
//! read and mutation, replaces its collections with what comes back, reloads
//! only the views a mutation can have changed, and reports every failure
//! exactly once through the [`Notifier`](yagg_surface::Notifier).
//!
//! # Modules
//!
//! - [`store`] -- [`RepoStore`]: open, refresh and the view loaders
//! - [`mutate`] -- staging, commit, checkout, ref and revert operations
//! - [`pager`] -- [`CommitPager`], fixed-size paging over the history
//! - [`protocol`] -- [`HunkAddress`] and hunk/line selection validation
//! - [`state`] -- [`StoreSnapshot`] and the views it contains
//! - [`config`] -- [`StoreConfig`], loadable from TOML
//! - [`error`] -- [`StoreError`] and message cleanup

pub mod config;
pub mod error;
pub mod mutate;
pub mod outcome;
pub mod pager;
pub mod protocol;
pub mod state;
pub mod store;

#[cfg(test)]
mod testing;

pub use config::StoreConfig;
pub use error::{
    clean_engine_message, ConfigError, Operation, StoreError, StoreResult, ValidationError,
};
pub use outcome::Outcome;
pub use pager::{CommitPager, PageRequest};
pub use protocol::{HunkAddress, LineSelection};
pub use state::{CommitView, DetailView, DiffView, LoadingFlags, StashView, StoreSnapshot};
pub use store::RepoStore;
