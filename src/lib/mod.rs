//! Vercel environment-variable synchronization library.
//!
//! This library pushes named configuration values from the process
//! environment into a Vercel project's env store. It runs one reconciliation
//! pass: list what the project already has, parse the desired state for each
//! tracked key, and create, update, or skip accordingly — including
//! branch-scoped variables for preview deployments.
//!
//! # Features
//!
//! - **Single list call**: existing state is fetched once and indexed
//! - **Ordered, sequential processing**: keys are handled in the order given
//! - **Branch-aware previews**: one variable per git branch, never merged
//! - **Optional tracing**: detailed logging when the `tracing` feature is
//!   enabled (on by default)
//!
//! # Example
//!
//! ```rust,no_run
//! use vercel_env_sync::sync::{SyncOptions, VercelSync};
//!
//! let options = SyncOptions {
//!   token: std::env::var("VERCEL_TOKEN").unwrap(),
//!   project: "my-project".to_string(),
//!   team_id: None,
//!   keys: "API_KEY,DATABASE_URL".to_string(),
//! };
//!
//! VercelSync::sync_with_options(options).unwrap();
//! ```

pub mod client;
pub mod index;
pub mod parse;
pub mod sync;
