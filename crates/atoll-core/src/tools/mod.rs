//! Tool provisioning — resolves namespaced `Provider.Action` identifiers
//! into callable tool handles bound to one end-user identity.
//!
//! The production catalog (an external tool platform) lives behind the
//! [`ToolCatalog`] trait; [`StaticToolCatalog`] is the in-memory
//! implementation used by the CLI and the tests. Resolution is
//! all-or-nothing: one unknown identifier fails the whole set, so a
//! missing tool can never silently shrink an agent's capability.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

/// A resolved, callable tool handle scoped to one user.
///
/// The handle is a descriptor consumed by the execution engine; actually
/// invoking the tool is the engine's concern, not this crate's.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallableTool {
    /// Namespaced identifier, e.g. "Gmail.SendEmail".
    pub identifier: String,
    /// Provider part of the identifier.
    pub provider: String,
    /// Action part of the identifier.
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema of the tool parameters, when the catalog has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
    /// End-user identity the underlying credential is scoped to.
    pub user_id: String,
}

impl CallableTool {
    /// Split `Provider.Action` into its two parts.
    pub fn split_identifier(identifier: &str) -> Option<(&str, &str)> {
        identifier.split_once('.')
    }
}

/// The external tool catalog, seen through the only two operations this
/// core needs. Safe to call concurrently for different agents of the
/// same run; resolved handles are never shared across agents.
#[async_trait]
pub trait ToolCatalog: Send + Sync {
    /// Resolve identifiers into handles scoped to `user_id`. `context`
    /// carries per-agent values (the factory injects `user_id` into it).
    async fn resolve(
        &self,
        identifiers: &[String],
        user_id: &str,
        context: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Vec<CallableTool>, WorkflowError>;

    /// All identifiers this catalog can resolve, namespaced
    /// `Provider.Action`.
    async fn identifiers(&self) -> Vec<String>;
}

/// One catalog entry of a [`StaticToolCatalog`].
#[derive(Debug, Clone)]
pub struct ToolEntry {
    pub identifier: String,
    pub description: Option<String>,
    pub parameters: Option<serde_json::Value>,
}

/// In-memory catalog with an optional per-user allow-list.
#[derive(Debug, Default)]
pub struct StaticToolCatalog {
    entries: HashMap<String, ToolEntry>,
    /// When set, only these users may resolve tools.
    authorized_users: Option<HashSet<String>>,
}

impl StaticToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from `(identifier, description)` pairs.
    pub fn with_tools<I, S>(tools: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let mut catalog = Self::new();
        for (identifier, description) in tools {
            catalog.insert(ToolEntry {
                identifier: identifier.into(),
                description: Some(description.into()),
                parameters: None,
            });
        }
        catalog
    }

    pub fn insert(&mut self, entry: ToolEntry) {
        self.entries.insert(entry.identifier.clone(), entry);
    }

    /// Restrict resolution to the given users.
    pub fn with_authorized_users<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorized_users = Some(users.into_iter().map(Into::into).collect());
        self
    }
}

#[async_trait]
impl ToolCatalog for StaticToolCatalog {
    async fn resolve(
        &self,
        identifiers: &[String],
        user_id: &str,
        _context: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Vec<CallableTool>, WorkflowError> {
        if let Some(authorized) = &self.authorized_users {
            if !authorized.contains(user_id) {
                return Err(WorkflowError::ToolResolution(format!(
                    "user '{}' is not authorized for tool resolution",
                    user_id
                )));
            }
        }

        let mut tools = Vec::with_capacity(identifiers.len());
        for identifier in identifiers {
            let (provider, action) =
                CallableTool::split_identifier(identifier).ok_or_else(|| {
                    WorkflowError::ToolResolution(format!(
                        "tool identifier '{}' is not namespaced as Provider.Action",
                        identifier
                    ))
                })?;

            let entry = self.entries.get(identifier).ok_or_else(|| {
                WorkflowError::ToolResolution(format!(
                    "tool identifier '{}' is not in the catalog",
                    identifier
                ))
            })?;

            tools.push(CallableTool {
                identifier: identifier.clone(),
                provider: provider.to_string(),
                action: action.to_string(),
                description: entry.description.clone(),
                parameters: entry.parameters.clone(),
                user_id: user_id.to_string(),
            });
        }

        tracing::debug!(
            "[ToolCatalog] Resolved {} tool(s) for user '{}'",
            tools.len(),
            user_id
        );
        Ok(tools)
    }

    async fn identifiers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }
}
