//! Repodex - GitHub repository and pull request finder
//!
//! Repodex syncs the repositories and open pull requests of a configured set
//! of GitHub identities into a local snapshot cache, then lets you browse,
//! filter, and open them from an interactive terminal finder without touching
//! the network again.
//!
//! ## Core Features
//!
//! - **Multi-identity sync**: Users and organizations, including GitHub Enterprise hosts
//! - **Snapshot cache**: One JSON file, replaced atomically on every sync
//! - **Interactive Finder**: Live filtering over repositories and pull requests
//! - **Configuration Management**: YAML-based configuration with XDG compliance
//!
//! ## Modules
//!
//! - [`config`]: Configuration management and parsing
//! - [`github`]: GitHub API pagination and decoding
//! - [`sync`]: Orchestration of a full re-fetch into a snapshot
//! - [`cache`]: Snapshot persistence
//! - [`tui`]: The interactive Finder

pub mod cache;
pub mod config;
pub mod github;
pub mod opener;
pub mod sync;
pub mod tui;

pub use cache::{CacheError, Snapshot, SnapshotStore};
pub use config::{Config, Identity};
pub use github::{FetchError, GitHubClient, PullRequest, RemoteSource, Repository};
pub use sync::SyncEngine;
