//! One-shot reconciliation of desired against existing env variables.
//!
//! This module drives the whole pass:
//! 1. One list call populates the [`ExistingIndex`].
//! 2. Tracked keys are processed strictly in their given order.
//! 3. Per key, the desired state is parsed and compared against the index,
//!    then exactly one of: create, update, or skip.
//!
//! Branch-scoped preview variables are matched by git branch; a new branch
//! gets its own variable and never merges with same-key entries for other
//! branches.
//!
//! # Failure policy
//!
//! Parse failures, the list call, and create calls are fatal and abort the
//! run. A failed update is logged and the remaining keys still run.
//!
//! # Examples
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

#[cfg(feature = "tracing")]
use tracing::{info, warn};

use crate::client::{
  ClientError, CreateVariableRequest, RemoteVariable, UpdateVariableRequest, VercelClient,
};
use crate::index::{ExistingIndex, Slot};
use crate::parse::{DesiredVariable, EnvSource, ParseError, ProcessEnv, Target, parse_variable};

const KEY_SEPARATOR: char = ',';

/// Errors that can abort a sync run.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
  /// The comma-separated key list contained no keys
  #[error("Missing required input: no env variable keys were provided")]
  NoKeys,
  /// A tracked variable's desired state failed validation
  #[error("Desired state error: {0}")]
  Parse(#[from] ParseError),
  /// The list call or a create call failed
  #[error("Remote call error: {0}")]
  Client(#[from] ClientError),
}

/// Configuration for a one-shot run against the production API.
pub struct SyncOptions {
  /// Vercel API token.
  pub token: String,
  /// Project name or id owning the variables.
  pub project: String,
  /// Team id, for team-owned projects.
  pub team_id: Option<String>,
  /// Comma-separated names of the tracked variables, in processing order.
  pub keys: String,
}

/// Reconciles tracked environment variables against one Vercel project.
#[derive(Debug)]
pub struct VercelSync<E = ProcessEnv> {
  client: VercelClient,
  project: String,
  keys: Vec<String>,
  env: E,
  existing: ExistingIndex,
}

impl VercelSync<ProcessEnv> {
  /// Runs one full pass using the provided options, reading desired state
  /// from the process environment.
  pub fn sync_with_options(options: SyncOptions) -> Result<(), SyncError> {
    #[cfg(feature = "tracing")]
    info!("Starting env sync for project {}", options.project);

    let client = VercelClient::new(options.token, options.team_id);
    let mut sync = Self::new(client, options.project, &options.keys, ProcessEnv)?;

    sync.populate_existing_variables()?;
    sync.process_env_variables()
  }
}

impl<E: EnvSource> VercelSync<E> {
  /// Creates a reconciler over an explicit client and configuration source.
  ///
  /// `keys` is split on commas; empty tokens are dropped. Fails with
  /// [`SyncError::NoKeys`] if nothing remains.
  pub fn new(
    client: VercelClient,
    project: impl Into<String>,
    keys: &str,
    env: E,
  ) -> Result<Self, SyncError> {
    let keys: Vec<String> = keys
      .split(KEY_SEPARATOR)
      .filter(|key| !key.is_empty())
      .map(String::from)
      .collect();

    if keys.is_empty() {
      return Err(SyncError::NoKeys);
    }

    Ok(Self {
      client,
      project: project.into(),
      keys,
      env,
      existing: ExistingIndex::default(),
    })
  }

  /// Fetches the remote listing and builds the lookup index.
  ///
  /// Called once per run, before any create/update decision.
  pub fn populate_existing_variables(&mut self) -> Result<(), SyncError> {
    let response = self.client.list_variables(&self.project)?;

    #[cfg(feature = "tracing")]
    info!("Found {} existing env variables", response.envs.len());

    self.existing = ExistingIndex::build(response.envs);
    Ok(())
  }

  /// Processes every tracked key, strictly in the order given.
  pub fn process_env_variables(&self) -> Result<(), SyncError> {
    for key in &self.keys {
      self.process_env_variable(key)?;
    }
    Ok(())
  }

  fn process_env_variable(&self, key: &str) -> Result<(), SyncError> {
    let desired = parse_variable(&self.env, key)?;

    // Collect, in desired-target order, the slots that already exist.
    let hits: Vec<(Target, &Slot)> = desired
      .targets
      .iter()
      .filter_map(|target| self.existing.get(*target, key).map(|slot| (*target, slot)))
      .collect();

    if hits.is_empty() {
      #[cfg(feature = "tracing")]
      info!("No existing variable found for {}, creating", key);
      return self.create_variable(&desired);
    }

    let preview_slot = hits
      .iter()
      .find(|(target, _)| *target == Target::Preview)
      .map(|(_, slot)| *slot);

    if let (Some(branch), Some(slot)) = (desired.git_branch.as_deref(), preview_slot) {
      let same_branch = match slot {
        Slot::Branched(variables) => variables
          .iter()
          .find(|variable| variable.git_branch.as_deref() == Some(branch)),
        Slot::Single(_) => None,
      };

      return match same_branch {
        Some(existing) => {
          #[cfg(feature = "tracing")]
          info!(
            "Existing variable found for {} and git branch {}, comparing values",
            key, branch
          );
          self.update_if_changed(existing, &desired);
          Ok(())
        }
        // A new branch gets its own variable.
        None => self.create_variable(&desired),
      };
    }

    let Some(existing) = hits[0].1.first() else {
      return Ok(());
    };

    #[cfg(feature = "tracing")]
    info!("Existing variable found for {}, comparing values", key);
    self.update_if_changed(existing, &desired);
    Ok(())
  }

  fn create_variable(&self, desired: &DesiredVariable) -> Result<(), SyncError> {
    let request = CreateVariableRequest {
      key: &desired.key,
      value: &desired.value,
      target: &desired.targets,
      kind: desired.kind,
      git_branch: desired.git_branch.as_deref(),
    };

    self.client.create_variable(&self.project, &request)?;

    #[cfg(feature = "tracing")]
    info!(
      "Variable {} with targets {} created successfully",
      desired.key,
      desired
        .targets
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
    );

    Ok(())
  }

  /// Updates `existing` in place if the desired state differs, otherwise
  /// does nothing.
  ///
  /// Target comparison is by count, not membership: a same-sized but
  /// different target set reads as unchanged.
  fn update_if_changed(&self, existing: &RemoteVariable, desired: &DesiredVariable) {
    let changed = existing.value != desired.value
      || existing.target.len() != desired.targets.len()
      || existing.kind != desired.kind;

    if !changed {
      #[cfg(feature = "tracing")]
      info!("No change found for {}, skipping", existing.key);
      return;
    }

    #[cfg(feature = "tracing")]
    info!(
      "Value, target, or type for {} has changed, updating",
      existing.key
    );

    let request = UpdateVariableRequest {
      value: &desired.value,
      target: &desired.targets,
      kind: desired.kind,
      git_branch: desired.git_branch.as_deref(),
    };

    // A failed update only affects this key; the rest of the pass goes on.
    match self
      .client
      .update_variable(&self.project, &existing.id, &request)
    {
      Ok(_body) => {
        #[cfg(feature = "tracing")]
        info!("{} updated successfully", existing.key);
      }
      Err(_err) => {
        #[cfg(feature = "tracing")]
        warn!("Failed to update {}: {}", existing.key, _err);
      }
    }
  }

  /// The index built by [`populate_existing_variables`].
  ///
  /// [`populate_existing_variables`]: Self::populate_existing_variables
  pub fn existing(&self) -> &ExistingIndex {
    &self.existing
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn client() -> VercelClient {
    VercelClient::with_base_url("http://127.0.0.1:0", "test-token", None)
  }

  #[test]
  fn test_keys_are_split_in_order() {
    let sync = VercelSync::new(
      client(),
      "test-project",
      "ENV_1,ENV_2,ENV_3",
      HashMap::<String, String>::new(),
    )
    .unwrap();

    assert_eq!(sync.keys, vec!["ENV_1", "ENV_2", "ENV_3"]);
  }

  #[test]
  fn test_empty_key_tokens_are_dropped() {
    let sync = VercelSync::new(client(), "test-project", "ENV_1,,ENV_2,", HashMap::<String, String>::new()).unwrap();

    assert_eq!(sync.keys, vec!["ENV_1", "ENV_2"]);
  }

  #[test]
  fn test_no_keys_is_an_error() {
    assert!(matches!(
      VercelSync::new(client(), "test-project", "", HashMap::<String, String>::new()).unwrap_err(),
      SyncError::NoKeys
    ));

    assert!(matches!(
      VercelSync::new(client(), "test-project", ",,", HashMap::<String, String>::new()).unwrap_err(),
      SyncError::NoKeys
    ));
  }
}
