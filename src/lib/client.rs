//! Vercel REST API client.
//!
//! Thin wrapper over the three project-env endpoints the sync pass needs:
//! list, create, and update. Every request carries the bearer token and, for
//! team-owned projects, a `teamId` query parameter.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::parse::{Target, VariableType};

/// Production API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.vercel.com/v8";

const USER_AGENT: &str = concat!("vercel-env-sync/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One environment variable as the platform stores it.
///
/// The list endpoint returns more fields than these (creation timestamps,
/// author ids); they are ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteVariable {
  /// Remote-assigned opaque identifier, used to address updates.
  pub id: String,
  pub key: String,
  pub value: String,
  pub target: Vec<Target>,
  #[serde(rename = "type")]
  pub kind: VariableType,
  #[serde(rename = "gitBranch", default)]
  pub git_branch: Option<String>,
}

/// Body of the list response.
#[derive(Debug, Deserialize)]
pub struct ListEnvsResponse {
  pub envs: Vec<RemoteVariable>,
}

/// Body of a create request.
#[derive(Debug, Serialize)]
pub struct CreateVariableRequest<'a> {
  pub key: &'a str,
  pub value: &'a str,
  pub target: &'a [Target],
  #[serde(rename = "type")]
  pub kind: VariableType,
  #[serde(rename = "gitBranch", skip_serializing_if = "Option::is_none")]
  pub git_branch: Option<&'a str>,
}

/// Body of an update request.
#[derive(Debug, Serialize)]
pub struct UpdateVariableRequest<'a> {
  pub value: &'a str,
  pub target: &'a [Target],
  #[serde(rename = "type")]
  pub kind: VariableType,
  #[serde(rename = "gitBranch", skip_serializing_if = "Option::is_none")]
  pub git_branch: Option<&'a str>,
}

/// Errors raised at the API boundary.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
  /// The request never produced a usable response
  #[error("Request to Vercel failed: {0}")]
  Transport(#[from] reqwest::Error),
  /// The API answered with a non-success status
  #[error("Vercel API returned HTTP {status} for {context}")]
  Api { status: StatusCode, context: String },
}

/// Blocking client for a single Vercel project's environment variables.
#[derive(Debug)]
pub struct VercelClient {
  client: Client,
  base_url: String,
  token: String,
  team_id: Option<String>,
}

impl VercelClient {
  /// Creates a client against the production API.
  pub fn new(token: impl Into<String>, team_id: Option<String>) -> Self {
    Self::with_base_url(DEFAULT_BASE_URL, token, team_id)
  }

  /// Creates a client against a custom endpoint, e.g. a mock server in tests.
  pub fn with_base_url(
    base_url: impl Into<String>,
    token: impl Into<String>,
    team_id: Option<String>,
  ) -> Self {
    Self {
      client: Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .expect("Failed to build HTTP client"),
      base_url: base_url.into(),
      token: token.into(),
      team_id,
    }
  }

  /// Lists every environment variable of `project` in one call.
  pub fn list_variables(&self, project: &str) -> Result<ListEnvsResponse, ClientError> {
    let url = format!("{}/projects/{}/env", self.base_url, project);
    let response = self.authorized(self.client.get(&url)).send()?;

    if !response.status().is_success() {
      return Err(ClientError::Api {
        status: response.status(),
        context: format!("listing env variables of {}", project),
      });
    }

    Ok(response.json()?)
  }

  /// Creates one environment variable.
  ///
  /// The response body is returned as loose JSON; callers only consult it
  /// for logging, and an empty body still counts as success.
  pub fn create_variable(
    &self,
    project: &str,
    request: &CreateVariableRequest<'_>,
  ) -> Result<Value, ClientError> {
    let url = format!("{}/projects/{}/env", self.base_url, project);
    let response = self.authorized(self.client.post(&url)).json(request).send()?;

    if !response.status().is_success() {
      return Err(ClientError::Api {
        status: response.status(),
        context: format!("creating {} in {}", request.key, project),
      });
    }

    Ok(response.json().unwrap_or(Value::Null))
  }

  /// Updates the variable addressed by its remote identifier.
  pub fn update_variable(
    &self,
    project: &str,
    variable_id: &str,
    request: &UpdateVariableRequest<'_>,
  ) -> Result<Value, ClientError> {
    let url = format!("{}/projects/{}/env/{}", self.base_url, project, variable_id);
    let response = self.authorized(self.client.patch(&url)).json(request).send()?;

    if !response.status().is_success() {
      return Err(ClientError::Api {
        status: response.status(),
        context: format!("updating variable {} in {}", variable_id, project),
      });
    }

    Ok(response.json().unwrap_or(Value::Null))
  }

  fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
    let request = request.bearer_auth(&self.token);
    match &self.team_id {
      Some(team_id) => request.query(&[("teamId", team_id.as_str())]),
      None => request,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_remote_variable_ignores_extra_fields() {
    let json = r#"{
      "type": "encrypted",
      "value": "ENV_1_VALUE",
      "target": ["production", "preview", "development"],
      "configurationId": null,
      "id": "XhHeMKBSPqa42soL",
      "key": "ENV_1",
      "createdAt": 1622428636135,
      "updatedAt": 1622428636135,
      "createdBy": "1234",
      "updatedBy": null
    }"#;

    let parsed: RemoteVariable = serde_json::from_str(json).unwrap();
    assert_eq!(parsed.id, "XhHeMKBSPqa42soL");
    assert_eq!(parsed.key, "ENV_1");
    assert_eq!(parsed.kind, VariableType::Encrypted);
    assert_eq!(parsed.target.len(), 3);
    assert!(parsed.git_branch.is_none());
  }

  #[test]
  fn test_remote_variable_reads_git_branch() {
    let json = r#"{
      "type": "encrypted",
      "value": "mysql://1234",
      "target": ["preview"],
      "gitBranch": "feature/some-branch",
      "id": "oJDi2X30EdeLu6wl",
      "key": "DATABASE_URL"
    }"#;

    let parsed: RemoteVariable = serde_json::from_str(json).unwrap();
    assert_eq!(parsed.git_branch.as_deref(), Some("feature/some-branch"));
    assert_eq!(parsed.target, vec![Target::Preview]);
  }

  #[test]
  fn test_create_request_omits_unset_git_branch() {
    let request = CreateVariableRequest {
      key: "API_KEY",
      value: "secret",
      target: &[Target::Production],
      kind: VariableType::Plain,
      git_branch: None,
    };

    let json = serde_json::to_value(&request).unwrap();
    assert!(json.get("gitBranch").is_none());
    assert_eq!(json["type"], "plain");
    assert_eq!(json["target"], serde_json::json!(["production"]));
  }

  #[test]
  fn test_update_request_carries_git_branch() {
    let request = UpdateVariableRequest {
      value: "mysql://5678",
      target: &[Target::Preview],
      kind: VariableType::Encrypted,
      git_branch: Some("feature/some-branch"),
    };

    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(json["gitBranch"], "feature/some-branch");
    assert!(json.get("key").is_none());
  }
}
