//! Model catalog: alias resolution and model listing.
//!
//! Two strategies, chosen once at construction. `Managed` talks to the
//! server's models route and resolves aliases against what is actually
//! served; `Static` falls back to the built-in tables. Resolution failures
//! are absorbed: an unknown alias passes through unchanged.

use crate::model::{
    base_capabilities, default_output_tokens, is_fast_alias, resolve_alias, static_models,
    GenerationDefaults, ModelInfo,
};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;
use tracing::{debug, warn};

const DETECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Catalog strategy selected at provider construction.
#[derive(Clone)]
pub enum ModelCatalog {
    /// The management endpoint answered; aliases resolve against the served
    /// model identifiers captured at construction.
    Managed {
        client: Client<OpenAIConfig>,
        served: Vec<String>,
    },
    /// No management endpoint; static tables only.
    Static,
}

impl ModelCatalog {
    /// Probe the models route once and pick a strategy.
    pub async fn detect(client: &Client<OpenAIConfig>) -> Self {
        match tokio::time::timeout(DETECT_TIMEOUT, client.models().list()).await {
            Ok(Ok(list)) => {
                let served: Vec<String> = list.data.into_iter().map(|m| m.id).collect();
                debug!(count = served.len(), "management endpoint reachable");
                ModelCatalog::Managed {
                    client: client.clone(),
                    served,
                }
            }
            Ok(Err(e)) => {
                warn!(error = %e, "management endpoint unavailable, using static catalog");
                ModelCatalog::Static
            }
            Err(_) => {
                warn!("management endpoint probe timed out, using static catalog");
                ModelCatalog::Static
            }
        }
    }

    pub fn is_managed(&self) -> bool {
        matches!(self, ModelCatalog::Managed { .. })
    }

    /// Resolve an alias to the identifier the server expects.
    ///
    /// Managed: match against served identifiers (exact or hardware-variant
    /// prefix). Either way the static table is the fallback, and an alias
    /// with no mapping passes through unchanged.
    pub fn resolve_model(&self, alias: &str) -> String {
        if let ModelCatalog::Managed { served, .. } = self {
            if let Some(id) = Self::match_served(served, alias) {
                debug!(alias = %alias, model = %id, "alias resolved against served models");
                return id;
            }
        }

        resolve_alias(alias)
            .map(str::to_string)
            .unwrap_or_else(|| alias.to_string())
    }

    /// List available models. Never errors.
    ///
    /// Managed: re-query the server and keep the well-known aliases it
    /// actually serves, skipping the rest silently; a failed query yields an
    /// empty list. Static: the built-in table.
    pub async fn list_models(&self) -> Vec<ModelInfo> {
        let served = match self {
            ModelCatalog::Managed { client, .. } => {
                match tokio::time::timeout(DETECT_TIMEOUT, client.models().list()).await {
                    Ok(Ok(list)) => list.data.into_iter().map(|m| m.id).collect::<Vec<_>>(),
                    Ok(Err(e)) => {
                        warn!(error = %e, "model discovery failed");
                        return Vec::new();
                    }
                    Err(_) => {
                        warn!("model discovery timed out");
                        return Vec::new();
                    }
                }
            }
            ModelCatalog::Static => {
                warn!("management endpoint not available, using static model list");
                return static_models();
            }
        };

        crate::model::WELL_KNOWN_ALIASES
            .iter()
            .filter(|alias| Self::match_served(&served, alias).is_some())
            .map(|alias| describe_alias(alias))
            .collect()
    }

    fn match_served(served: &[String], alias: &str) -> Option<String> {
        let prefix = format!("{alias}-");
        served
            .iter()
            .find(|id| id.as_str() == alias || id.starts_with(&prefix))
            .cloned()
    }
}

/// Descriptor for a dynamically discovered alias.
///
/// The alias itself is reported as the id so the server keeps picking the
/// hardware variant.
fn describe_alias(alias: &str) -> ModelInfo {
    let mut capabilities = base_capabilities();
    if is_fast_alias(alias) {
        capabilities.push("fast".to_string());
    }

    ModelInfo {
        id: alias.to_string(),
        display_name: alias.to_string(),
        context_window: 32768,
        max_output_tokens: default_output_tokens(alias),
        capabilities,
        defaults: GenerationDefaults {
            max_tokens: 1024,
            temperature: 0.7,
        },
    }
}
