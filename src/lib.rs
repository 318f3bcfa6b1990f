//! Profile store and backup dispatcher behind the `odoobup` command.
//!
//! Profiles are kept in an embedded store under `~/.odoobup`; the dispatcher
//! downloads one database archive per profile over HTTP.

pub mod core;
pub mod utils;

pub use crate::core::{
    BackupDispatcher, BackupError, BackupReport, BackupSummary, Profile, ProfileData,
    ProfileStore, Protocol, StoreError, ValidationError,
};
