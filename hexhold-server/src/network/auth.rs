//! Upstream identity and stats clients.
//!
//! Thin `reqwest` wrappers around the external account service: one call
//! resolves a refresh token (from the websocket handshake cookie) into the
//! user's role, Discord identity and unlocked skins; the other reports
//! end-of-run stats and returns freshly unlocked skins.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::game::player::Permission;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("refresh token rejected ({status})")]
    Rejected { status: u16 },
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DiscordDetails {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SkinDetails {
    #[serde(default)]
    pub unlocked: Vec<i64>,
}

/// Identity payload returned for a valid refresh token.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct UserIdentity {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub discord: DiscordDetails,
    #[serde(default)]
    pub skins: SkinDetails,
}

pub fn role_to_permission(role: &str) -> Permission {
    match role {
        "admin" => Permission::Admin,
        "moderator" => Permission::Moderator,
        _ => Permission::None,
    }
}

#[derive(Serialize)]
struct IdentityRequest<'a> {
    #[serde(rename = "refreshToken")]
    refresh_token: &'a str,
}

/// Resolves refresh tokens into identities.
#[derive(Clone)]
pub struct IdentityClient {
    http: reqwest::Client,
    endpoint: String,
}

impl IdentityClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(UPSTREAM_TIMEOUT).build()?,
            endpoint: endpoint.into(),
        })
    }

    pub async fn resolve(&self, refresh_token: &str) -> Result<UserIdentity, AuthError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&IdentityRequest { refresh_token })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AuthError::Rejected {
                status: response.status().as_u16(),
            });
        }
        Ok(response.json::<UserIdentity>().await?)
    }
}

#[derive(Serialize)]
struct StatsData {
    score: u32,
    xp: u32,
    kills: u32,
    playtime: u64,
}

#[derive(Serialize)]
struct StatsRequest<'a> {
    #[serde(rename = "userId")]
    user_id: &'a str,
    data: StatsData,
}

#[derive(Deserialize)]
struct StatsResponse {
    #[serde(rename = "newlyUnlockedSkins", default)]
    newly_unlocked_skins: Vec<i64>,
}

/// Posts end-of-run stats for Discord-linked accounts.
#[derive(Clone)]
pub struct StatsClient {
    http: reqwest::Client,
    endpoint: String,
}

impl StatsClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(UPSTREAM_TIMEOUT).build()?,
            endpoint: endpoint.into(),
        })
    }

    /// Report a finished run; returns skins the run unlocked. Failures are
    /// logged and swallowed, stats are best-effort.
    pub async fn report(
        &self,
        user_id: &str,
        score: u32,
        kills: u32,
        playtime_secs: u64,
    ) -> Option<Vec<i64>> {
        if user_id.is_empty() {
            return None;
        }
        let request = StatsRequest {
            user_id,
            data: StatsData {
                score,
                xp: score / 1000,
                kills,
                playtime: playtime_secs,
            },
        };
        let response = match self.http.post(&self.endpoint).json(&request).send().await {
            Ok(response) => response,
            Err(error) => {
                warn!(%error, "stats report failed");
                return None;
            }
        };
        if !response.status().is_success() {
            warn!(status = %response.status(), "stats endpoint rejected report");
            return None;
        }
        match response.json::<StatsResponse>().await {
            Ok(body) => Some(body.newly_unlocked_skins),
            Err(error) => {
                warn!(%error, "stats response unparseable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_mapping() {
        assert_eq!(role_to_permission("admin"), Permission::Admin);
        assert_eq!(role_to_permission("moderator"), Permission::Moderator);
        assert_eq!(role_to_permission("player"), Permission::None);
        assert_eq!(role_to_permission(""), Permission::None);
    }

    #[test]
    fn identity_payload_shape() {
        let identity: UserIdentity = serde_json::from_str(
            r#"{
                "role": "moderator",
                "discord": {"id": "123", "username": "tester"},
                "skins": {"unlocked": [1, 5]}
            }"#,
        )
        .unwrap();
        assert_eq!(identity.role, "moderator");
        assert_eq!(identity.discord.id, "123");
        assert_eq!(identity.skins.unlocked, vec![1, 5]);
    }

    #[test]
    fn identity_defaults_for_sparse_payload() {
        let identity: UserIdentity = serde_json::from_str("{}").unwrap();
        assert!(identity.role.is_empty());
        assert!(identity.discord.id.is_empty());
        assert!(identity.skins.unlocked.is_empty());
    }
}
