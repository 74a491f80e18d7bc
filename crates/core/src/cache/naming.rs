//! Partition roles and versioned partition names.
//!
//! A partition name is `{prefix}-{role}-{version}`. Changing the version is
//! the only way to invalidate previously cached content: the next activation
//! deletes every partition of this prefix that is not one of the four
//! current names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The job a partition does for the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// App shell bootstrap files, pre-cached at install.
    Core,
    /// Static binary and style resources, served cache-first.
    Assets,
    /// Dynamic service responses, served network-first.
    Api,
    /// Navigations and the catch-all, served network-first.
    Pages,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Core, Role::Assets, Role::Api, Role::Pages];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Core => "core",
            Role::Assets => "assets",
            Role::Api => "api",
            Role::Pages => "pages",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Naming scheme for one activation generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionNames {
    prefix: String,
    version: String,
}

impl PartitionNames {
    pub fn new(prefix: impl Into<String>, version: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), version: version.into() }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Current partition name for a role.
    pub fn name(&self, role: Role) -> String {
        format!("{}-{}-{}", self.prefix, role, self.version)
    }

    /// All four current partition names, in role order.
    pub fn current(&self) -> Vec<String> {
        Role::ALL.iter().map(|role| self.name(*role)).collect()
    }

    /// Whether a partition name belongs to this application at all.
    pub fn is_owned(&self, name: &str) -> bool {
        name.strip_prefix(&self.prefix)
            .is_some_and(|rest| rest.starts_with('-'))
    }

    /// Whether a partition belongs to this application but not to the
    /// current generation. Partitions of other prefixes are never stale.
    pub fn is_stale(&self, name: &str) -> bool {
        self.is_owned(name) && !Role::ALL.iter().any(|role| self.name(*role) == name)
    }

    /// Role of a current-generation partition name.
    pub fn role_of(&self, name: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|role| self.name(*role) == name)
    }
}
