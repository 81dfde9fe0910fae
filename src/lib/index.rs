//! Lookup index over the remote listing.
//!
//! Built once per run from the single list call and read-only afterwards.
//! Variables are indexed per target, then per key. The preview target is the
//! one place a key can legitimately map to several variables — one per git
//! branch — so its slots hold a list while every other target holds a single
//! variable.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::client::RemoteVariable;
use crate::parse::Target;

/// What a (target, key) pair maps to.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
  /// Non-preview targets: at most one variable per key, last write wins.
  Single(RemoteVariable),
  /// Preview target: every branch-scoped variant sharing the key, in
  /// listing order.
  Branched(Vec<RemoteVariable>),
}

impl Slot {
  /// The first variable in the slot. `Branched` slots are never empty by
  /// construction, so this only yields `None` for a hand-built empty list.
  pub fn first(&self) -> Option<&RemoteVariable> {
    match self {
      Slot::Single(variable) => Some(variable),
      Slot::Branched(variables) => variables.first(),
    }
  }
}

/// Per-target, per-key index of the remote state.
#[derive(Debug, Default)]
pub struct ExistingIndex {
  by_target: HashMap<Target, HashMap<String, Slot>>,
}

impl ExistingIndex {
  /// Indexes the remote listing. A variable attached to several targets is
  /// inserted under each of them.
  pub fn build(envs: Vec<RemoteVariable>) -> Self {
    #[cfg(feature = "tracing")]
    debug!("Indexing {} existing env variables", envs.len());

    let mut index = Self::default();
    for variable in envs {
      for target in variable.target.clone() {
        index.insert(target, variable.clone());
      }
    }
    index
  }

  /// Looks up the slot for `key` under `target`.
  pub fn get(&self, target: Target, key: &str) -> Option<&Slot> {
    self.by_target.get(&target)?.get(key)
  }

  fn insert(&mut self, target: Target, variable: RemoteVariable) {
    let slots = self.by_target.entry(target).or_default();

    if target == Target::Preview {
      match slots.entry(variable.key.clone()) {
        Entry::Occupied(mut entry) => {
          if let Slot::Branched(variables) = entry.get_mut() {
            variables.push(variable);
          }
        }
        Entry::Vacant(entry) => {
          entry.insert(Slot::Branched(vec![variable]));
        }
      }
    } else {
      slots.insert(variable.key.clone(), Slot::Single(variable));
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parse::VariableType;

  fn remote(
    id: &str,
    key: &str,
    value: &str,
    targets: &[Target],
    git_branch: Option<&str>,
  ) -> RemoteVariable {
    RemoteVariable {
      id: id.to_string(),
      key: key.to_string(),
      value: value.to_string(),
      target: targets.to_vec(),
      kind: VariableType::Encrypted,
      git_branch: git_branch.map(String::from),
    }
  }

  #[test]
  fn test_multi_target_variable_is_indexed_under_each_target() {
    let index = ExistingIndex::build(vec![remote(
      "XhHeMKBSPqa42soL",
      "ENV_1",
      "ENV_1_VALUE",
      &Target::ALL,
      None,
    )]);

    for target in Target::ALL {
      match index.get(target, "ENV_1") {
        Some(Slot::Single(variable)) => assert_eq!(variable.id, "XhHeMKBSPqa42soL"),
        Some(Slot::Branched(variables)) => {
          assert_eq!(target, Target::Preview);
          assert_eq!(variables.len(), 1);
        }
        None => panic!("Expected a slot under {}", target),
      }
    }
  }

  #[test]
  fn test_preview_slot_collects_every_branch_variant() {
    let index = ExistingIndex::build(vec![
      remote(
        "eXfcJVWXeJmLXyQ0",
        "DATABASE_URL",
        "mysql://1234",
        &[Target::Preview],
        Some("dan/checkly"),
      ),
      remote(
        "9U39h7zxK9Amm0tu",
        "DATABASE_URL",
        "mysql://5678",
        &[Target::Preview],
        Some("brant/rem-380-handle-dynamic-brand-color"),
      ),
    ]);

    match index.get(Target::Preview, "DATABASE_URL") {
      Some(Slot::Branched(variables)) => {
        assert_eq!(variables.len(), 2);
        // Listing order is preserved.
        assert_eq!(variables[0].id, "eXfcJVWXeJmLXyQ0");
        assert_eq!(variables[1].id, "9U39h7zxK9Amm0tu");
      }
      other => panic!("Expected a branched slot, got {:?}", other),
    }
  }

  #[test]
  fn test_non_preview_duplicate_key_last_write_wins() {
    let index = ExistingIndex::build(vec![
      remote("first", "ENV_2", "old", &[Target::Production], None),
      remote("second", "ENV_2", "new", &[Target::Production], None),
    ]);

    match index.get(Target::Production, "ENV_2") {
      Some(Slot::Single(variable)) => assert_eq!(variable.id, "second"),
      other => panic!("Expected a single slot, got {:?}", other),
    }
  }

  #[test]
  fn test_missing_key_yields_none() {
    let index = ExistingIndex::build(vec![]);
    assert!(index.get(Target::Production, "ENV_1").is_none());
  }
}
