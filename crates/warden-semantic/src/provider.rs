//! # Provider Detection
//!
//! Finds a chat-completions endpoint to classify against. Detection is
//! ordered: a local Ollama daemon, then a local LM Studio server, then
//! (only if an API key is configured) the hosted OpenAI-compatible
//! endpoint. Each local probe gets a 2 second budget so a cold start
//! never stalls the scan path for long.
//!
//! When Ollama answers and the configured model is still the default
//! placeholder, the installed model list is consulted and the best
//! local model is picked by a fixed preference order.
//!
//! Detection runs once per engine instance; the caller caches the
//! outcome behind a single-flight cell.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Placeholder model name; triggers local model auto-selection.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Default Ollama base URL.
pub const OLLAMA_ENDPOINT: &str = "http://127.0.0.1:11434";

/// Default LM Studio base URL.
pub const LMSTUDIO_ENDPOINT: &str = "http://127.0.0.1:1234";

/// Hosted OpenAI base URL.
pub const OPENAI_ENDPOINT: &str = "https://api.openai.com";

/// Budget for each local probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Preferred local model substrings, best first.
const MODEL_PREFERENCE: [&str; 5] = ["qwen2.5", "qwen", "mistral", "llama3", "llama"];

/// Which backend to classify against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Probe for a backend at first use.
    #[default]
    Auto,
    /// Local Ollama daemon.
    Ollama,
    /// Local LM Studio server.
    LmStudio,
    /// Hosted OpenAI-compatible API.
    OpenAi,
}

impl ProviderKind {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Auto => "auto",
            ProviderKind::Ollama => "ollama",
            ProviderKind::LmStudio => "lmstudio",
            ProviderKind::OpenAi => "openai",
        }
    }

    /// Default base URL for an explicit (non-auto) provider.
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            ProviderKind::Auto | ProviderKind::Ollama => OLLAMA_ENDPOINT,
            ProviderKind::LmStudio => LMSTUDIO_ENDPOINT,
            ProviderKind::OpenAi => OPENAI_ENDPOINT,
        }
    }
}

/// Base URLs probed in auto mode. Separated from the constants so tests
/// can point detection at a mock server.
#[derive(Debug, Clone)]
pub struct ProbeTargets {
    /// Ollama base URL.
    pub ollama: String,
    /// LM Studio base URL.
    pub lmstudio: String,
}

impl Default for ProbeTargets {
    fn default() -> Self {
        Self {
            ollama: OLLAMA_ENDPOINT.to_string(),
            lmstudio: LMSTUDIO_ENDPOINT.to_string(),
        }
    }
}

/// Outcome of provider detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProvider {
    /// Which backend answered.
    pub kind: ProviderKind,
    /// Base URL to send chat requests to.
    pub endpoint: String,
    /// Model name to request.
    pub model: String,
}

/// Probe for a usable backend, in preference order.
///
/// Returns `None` when no local daemon answers and no API key is
/// available for the hosted fallback.
pub async fn detect(
    client: &Client,
    targets: &ProbeTargets,
    api_key: Option<&str>,
    model: &str,
) -> Option<ResolvedProvider> {
    if probe(client, &format!("{}/api/tags", targets.ollama)).await {
        let model = if model == DEFAULT_MODEL {
            pick_ollama_model(client, &targets.ollama)
                .await
                .unwrap_or_else(|| model.to_string())
        } else {
            model.to_string()
        };
        debug!(endpoint = %targets.ollama, %model, "detected ollama");
        return Some(ResolvedProvider {
            kind: ProviderKind::Ollama,
            endpoint: targets.ollama.clone(),
            model,
        });
    }

    if probe(client, &format!("{}/v1/models", targets.lmstudio)).await {
        debug!(endpoint = %targets.lmstudio, "detected lmstudio");
        return Some(ResolvedProvider {
            kind: ProviderKind::LmStudio,
            endpoint: targets.lmstudio.clone(),
            model: model.to_string(),
        });
    }

    if api_key.is_some() {
        debug!("no local backend; falling back to hosted endpoint");
        return Some(ResolvedProvider {
            kind: ProviderKind::OpenAi,
            endpoint: OPENAI_ENDPOINT.to_string(),
            model: model.to_string(),
        });
    }

    None
}

async fn probe(client: &Client, url: &str) -> bool {
    client
        .get(url)
        .timeout(PROBE_TIMEOUT)
        .send()
        .await
        .map(|resp| resp.status().is_success())
        .unwrap_or(false)
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

/// Ask Ollama for its installed models and pick the best one.
async fn pick_ollama_model(client: &Client, endpoint: &str) -> Option<String> {
    let resp = client
        .get(format!("{endpoint}/api/tags"))
        .timeout(PROBE_TIMEOUT)
        .send()
        .await
        .ok()?;
    let tags: TagsResponse = resp.json().await.ok()?;
    let names: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();

    for preferred in MODEL_PREFERENCE {
        if let Some(name) = names
            .iter()
            .find(|name| name.to_ascii_lowercase().contains(preferred))
        {
            return Some(name.clone());
        }
    }
    names.first().cloned()
}
