//! Desired-state parsing for tracked environment variables.
//!
//! Each tracked variable `K` is described by up to four entries in a flat
//! string-keyed configuration source:
//!
//! - `K` — the value to push
//! - `TARGET_K` — comma-separated deployment targets
//! - `TYPE_K` — `encrypted` or `plain`
//! - `GIT_BRANCH_K` — optional branch name, only valid when `TARGET_K` is
//!   exactly `preview`
//!
//! The source is injected through [`EnvSource`] so parsing is deterministic
//! in tests; [`ProcessEnv`] reads the real process environment.
//!
//! # Examples
//!
//! ```rust
//! use std::collections::HashMap;
//! use vercel_env_sync::parse::{parse_variable, Target};
//!
//! let env = HashMap::from([
//!   ("API_KEY".to_string(), "secret123".to_string()),
//!   ("TARGET_API_KEY".to_string(), "production,preview".to_string()),
//!   ("TYPE_API_KEY".to_string(), "encrypted".to_string()),
//! ]);
//!
//! let desired = parse_variable(&env, "API_KEY").unwrap();
//! assert_eq!(desired.targets, vec![Target::Production, Target::Preview]);
//! ```

use std::collections::HashMap;
use std::fmt;

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

use serde::{Deserialize, Serialize};

const TARGET_PREFIX: &str = "TARGET_";
const TYPE_PREFIX: &str = "TYPE_";
const GIT_BRANCH_PREFIX: &str = "GIT_BRANCH_";
const TARGET_SEPARATOR: char = ',';

/// A Vercel deployment target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
  Production,
  Preview,
  Development,
}

impl Target {
  /// Every target the platform supports, in wire order.
  pub const ALL: [Target; 3] = [Target::Production, Target::Preview, Target::Development];

  /// Parses a single target token. Unknown tokens yield `None`.
  pub fn parse(token: &str) -> Option<Self> {
    match token {
      "production" => Some(Target::Production),
      "preview" => Some(Target::Preview),
      "development" => Some(Target::Development),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Target::Production => "production",
      Target::Preview => "preview",
      Target::Development => "development",
    }
  }
}

impl fmt::Display for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// How Vercel stores the variable's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
  Encrypted,
  Plain,
}

impl VariableType {
  /// Parses a type token. Unknown tokens yield `None`.
  pub fn parse(token: &str) -> Option<Self> {
    match token {
      "encrypted" => Some(VariableType::Encrypted),
      "plain" => Some(VariableType::Plain),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      VariableType::Encrypted => "encrypted",
      VariableType::Plain => "plain",
    }
  }
}

impl fmt::Display for VariableType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// The desired remote state for one tracked variable, derived fresh per run.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredVariable {
  pub key: String,
  pub value: String,
  /// Non-empty after parsing; unrecognized target tokens are dropped.
  pub targets: Vec<Target>,
  pub kind: VariableType,
  /// Set only when the raw target string was exactly `preview`.
  pub git_branch: Option<String>,
}

/// A flat string-keyed configuration source.
///
/// An empty string reads as absent, matching how the entries behave when the
/// surrounding CI step leaves them unset.
pub trait EnvSource {
  fn get(&self, key: &str) -> Option<String>;
}

/// Reads from the real process environment.
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
  fn get(&self, key: &str) -> Option<String> {
    std::env::var(key).ok()
  }
}

impl EnvSource for HashMap<String, String> {
  fn get(&self, key: &str) -> Option<String> {
    self.get(key).cloned()
  }
}

/// Errors raised while parsing one tracked variable's desired state.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
  /// The variable itself is absent or empty
  #[error("Variable {0} is missing env variable: {0}")]
  MissingValue(String),
  /// `TARGET_K` is absent
  #[error("Variable {0} is missing env variable: TARGET_{0}")]
  MissingTarget(String),
  /// `TYPE_K` is absent
  #[error("Variable {0} is missing env variable: TYPE_{0}")]
  MissingType(String),
  /// `GIT_BRANCH_K` is set but the raw target string is not exactly `preview`
  #[error("You cannot use a git branch for anything other than the preview target environment")]
  InvalidGitBranchUsage(String),
  /// `TYPE_K` is not a recognized type
  #[error("No valid type found for {key}, type given: {given}, valid types: encrypted,plain")]
  InvalidType { key: String, given: String },
  /// Every target token was unrecognized
  #[error(
    "No valid targets found for {key}, targets given: {given}, valid targets: production,preview,development"
  )]
  NoValidTargets { key: String, given: String },
}

/// Reads and validates one tracked variable from `env`.
///
/// The git-branch restriction is checked against the raw target string before
/// splitting, so `production,preview` rejects a branch even though it
/// includes the preview target. Unrecognized target tokens are silently
/// dropped; only a fully unrecognized list is an error.
pub fn parse_variable(env: &impl EnvSource, key: &str) -> Result<DesiredVariable, ParseError> {
  #[cfg(feature = "tracing")]
  trace!("Parsing desired state for {}", key);

  let value = non_empty(env.get(key)).ok_or_else(|| ParseError::MissingValue(key.to_string()))?;

  let target_string = non_empty(env.get(&format!("{TARGET_PREFIX}{key}")))
    .ok_or_else(|| ParseError::MissingTarget(key.to_string()))?;

  let type_string = non_empty(env.get(&format!("{TYPE_PREFIX}{key}")))
    .ok_or_else(|| ParseError::MissingType(key.to_string()))?;

  let git_branch = non_empty(env.get(&format!("{GIT_BRANCH_PREFIX}{key}")));

  if git_branch.is_some() && target_string != Target::Preview.as_str() {
    return Err(ParseError::InvalidGitBranchUsage(key.to_string()));
  }

  let kind = VariableType::parse(&type_string).ok_or_else(|| ParseError::InvalidType {
    key: key.to_string(),
    given: type_string.clone(),
  })?;

  let targets: Vec<Target> = target_string
    .split(TARGET_SEPARATOR)
    .filter_map(Target::parse)
    .collect();

  if targets.is_empty() {
    return Err(ParseError::NoValidTargets {
      key: key.to_string(),
      given: target_string,
    });
  }

  #[cfg(feature = "tracing")]
  debug!(
    "Parsed {} with targets {:?}, type {}, git branch {:?}",
    key, targets, kind, git_branch
  );

  Ok(DesiredVariable {
    key: key.to_string(),
    value,
    targets,
    kind,
    git_branch,
  })
}

fn non_empty(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.is_empty())
}
