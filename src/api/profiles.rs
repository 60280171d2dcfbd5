//! Compatibility profile CRUD against `/api/profiles`.
//!
//! Profiles are plain JSON documents stored by the server; this client only
//! moves them back and forth.

use crate::config::EngineConfig;
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Deserialize)]
pub struct ProfileDocument {
    pub profile_name: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct CreateProfile<'a> {
    name: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdateProfile<'a> {
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ServerReply {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9\-_.]").expect("valid profile name pattern"))
}

fn dot_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.+").expect("valid dot pattern"))
}

/// Map a user-supplied name onto the server's file-safe alphabet.
/// Returns `None` when nothing usable is left.
pub fn sanitize_profile_name(name: &str) -> Option<String> {
    let replaced = unsafe_chars().replace_all(name.trim(), "_");
    let collapsed = dot_runs().replace_all(&replaced, ".").into_owned();

    if collapsed.is_empty() || collapsed.starts_with('.') || collapsed.ends_with('.') {
        return None;
    }
    Some(collapsed)
}

pub struct ProfileClient {
    client: reqwest::Client,
    api_url: String,
}

impl ProfileClient {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url(),
        }
    }

    fn profile_url(&self, name: &str) -> String {
        format!("{}/profiles/{}", self.api_url, urlencoding::encode(name))
    }

    /// Sorted profile names
    pub async fn list(&self) -> Result<Vec<String>> {
        let url = format!("{}/profiles", self.api_url);
        tracing::debug!("Listing profiles: {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("Failed to list profiles: HTTP {}", response.status());
        }
        let names = response
            .json::<Vec<String>>()
            .await
            .context("Invalid profile list response")?;
        Ok(names)
    }

    pub async fn get(&self, name: &str) -> Result<ProfileDocument> {
        let response = self.client.get(self.profile_url(name)).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let reply = response.json::<ServerReply>().await.ok();
            anyhow::bail!(
                "Failed to fetch profile '{}': {}",
                name,
                reply.and_then(|r| r.error).unwrap_or_else(|| status.to_string())
            );
        }
        response
            .json::<ProfileDocument>()
            .await
            .with_context(|| format!("Invalid profile document for '{}'", name))
    }

    /// Add a new profile; returns the sanitised name it was stored under
    pub async fn create(&self, name: &str, content: &str) -> Result<String> {
        let safe_name = sanitize_profile_name(name)
            .with_context(|| format!("Invalid profile name: '{}'", name))?;
        validate_content(content)?;

        let url = format!("{}/profiles", self.api_url);
        let response = self
            .client
            .post(&url)
            .json(&CreateProfile {
                name: &safe_name,
                content,
            })
            .send()
            .await?;
        let msg = read_reply(response).await?;
        tracing::info!("Profile created: {} ({})", safe_name, msg);
        Ok(safe_name)
    }

    pub async fn update(&self, name: &str, content: &str) -> Result<String> {
        validate_content(content)?;

        let response = self
            .client
            .put(self.profile_url(name))
            .json(&UpdateProfile { content })
            .send()
            .await?;
        let msg = read_reply(response).await?;
        tracing::info!("Profile updated: {} ({})", name, msg);
        Ok(msg)
    }

    pub async fn delete(&self, name: &str) -> Result<String> {
        let response = self.client.delete(self.profile_url(name)).send().await?;
        let msg = read_reply(response).await?;
        tracing::info!("Profile deleted: {} ({})", name, msg);
        Ok(msg)
    }

    /// Copy `source` under a new name
    pub async fn clone_profile(&self, source: &str, new_name: &str) -> Result<String> {
        let safe_name = sanitize_profile_name(new_name)
            .with_context(|| format!("Invalid profile name: '{}'", new_name))?;
        if safe_name == source {
            anyhow::bail!("Clone name must differ from '{}'", source);
        }
        let document = self.get(source).await?;
        self.create(&safe_name, &document.content).await
    }
}

fn validate_content(content: &str) -> Result<()> {
    serde_json::from_str::<serde_json::Value>(content).context("Invalid JSON profile content")?;
    Ok(())
}

async fn read_reply(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let reply = response.json::<ServerReply>().await.ok();
    if !status.is_success() {
        anyhow::bail!(
            "{}",
            reply
                .and_then(|r| r.error)
                .unwrap_or_else(|| format!("HTTP error {}", status.as_u16()))
        );
    }
    Ok(reply.and_then(|r| r.message).unwrap_or_default())
}
