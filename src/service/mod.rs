//! Typed ingress over the gateway
//!
//! [`GameService`] is what an outer API layer calls. Each operation submits a
//! request, waits for it with the configured deadline, and decodes the raw
//! reply into a response DTO.

pub mod runtime;

pub use runtime::GameStoreRuntime;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{sort_by_title, Game, PRIMARY_SOURCE_LABEL, SECONDARY_SOURCE_LABEL};
use crate::config::Config;
use crate::correlation::Reply;
use crate::error::{BridgeError, Result};
use crate::gateway::{is_reserved_title, GatewayHandle, GatewayRequest, Source};

/// Result of a title search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
    Found(SearchResponse),
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub game: Game,
    pub source: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameListResponse {
    pub games: Vec<Game>,
    pub source: String,
    pub message: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedGameListResponse {
    /// Both lists merged and sorted by title, ignoring case
    pub all_games: Vec<Game>,
    pub primary_games: Vec<Game>,
    pub secondary_games: Vec<Game>,
    pub message: String,
    pub total_count: usize,
    pub primary_count: usize,
    pub secondary_count: usize,
}

/// Names a backend in response messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    /// Backend label, e.g. `SQLite Database`
    pub label: String,
    /// Agent serving it
    pub agent: String,
}

impl SourceInfo {
    pub fn new(label: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            agent: agent.into(),
        }
    }

    fn describe(&self) -> String {
        format!("{} (via {} agent)", self.label, self.agent)
    }
}

/// Deadlines and labels used by [`GameService`].
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub search_timeout: Duration,
    pub list_timeout: Duration,
    pub combined_timeout: Duration,
    pub primary: SourceInfo,
    pub secondary: SourceInfo,
}

impl ServiceSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            search_timeout: config.gateway.search_timeout(),
            list_timeout: config.gateway.list_timeout(),
            combined_timeout: config.gateway.combined_timeout(),
            primary: SourceInfo::new(PRIMARY_SOURCE_LABEL, config.agents.primary.as_str()),
            secondary: SourceInfo::new(SECONDARY_SOURCE_LABEL, config.agents.secondary.as_str()),
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Request/response facade over a [`GatewayHandle`].
#[derive(Debug, Clone)]
pub struct GameService {
    gateway: GatewayHandle,
    settings: ServiceSettings,
}

impl GameService {
    pub fn new(gateway: GatewayHandle, settings: ServiceSettings) -> Self {
        Self { gateway, settings }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Looks a title up in the primary backend, falling back to the secondary.
    ///
    /// Titles that spell a listing sentinel are never sent and read as
    /// [`SearchOutcome::NotFound`].
    ///
    /// # Errors
    /// - `BridgeError::Timeout` if no answer arrives within the search deadline
    /// - `BridgeError::MalformedReply` if the answer is not a record
    pub async fn search(&self, title: &str) -> Result<SearchOutcome> {
        if is_reserved_title(title) {
            debug!(component = "service", title, "Reserved title, nothing to search");
            return Ok(SearchOutcome::NotFound);
        }
        let mut handle = self.gateway.submit(GatewayRequest::search(title))?;
        let reply = handle.wait(self.settings.search_timeout).await?;
        let id = handle.id();

        if reply.is_not_found() {
            debug!(component = "service", id, title, "Search found nothing");
            return Ok(SearchOutcome::NotFound);
        }
        let payload = single_payload(id, &reply)?;
        let game: Game = decode(id, payload)?;
        let source = game.source.clone().unwrap_or_else(|| "Unknown".to_string());
        Ok(SearchOutcome::Found(SearchResponse {
            message: format!("Game found in {}", source),
            source,
            game,
        }))
    }

    /// Lists one backend. [`Source::Both`] returns the merged list.
    ///
    /// A backend answering `NOT_FOUND` yields an empty list.
    pub async fn list(&self, source: Source) -> Result<GameListResponse> {
        let info = match source {
            Source::Primary => &self.settings.primary,
            Source::Secondary => &self.settings.secondary,
            Source::Both => {
                let combined = self.list_both().await?;
                return Ok(GameListResponse {
                    count: combined.total_count,
                    games: combined.all_games,
                    source: format!(
                        "{} and {}",
                        self.settings.primary.describe(),
                        self.settings.secondary.describe()
                    ),
                    message: combined.message,
                });
            }
        };

        let mut handle = self.gateway.submit(GatewayRequest::list(source))?;
        let reply = handle.wait(self.settings.list_timeout).await?;
        let id = handle.id();
        let games = decode_list(id, single_payload(id, &reply)?)?;
        Ok(GameListResponse {
            message: format!("{} games found in {}", games.len(), info.label),
            source: info.describe(),
            count: games.len(),
            games,
        })
    }

    /// Lists both backends concurrently and merges the results.
    ///
    /// Resolves only when both answers are in; there are no partial results.
    pub async fn list_both(&self) -> Result<CombinedGameListResponse> {
        let mut handle = self.gateway.submit(GatewayRequest::list(Source::Both))?;
        let reply = handle.wait(self.settings.combined_timeout).await?;
        let id = handle.id();

        let Reply::Combined { primary, secondary } = reply else {
            return Err(BridgeError::MalformedReply {
                id: id.to_string(),
                reason: "expected a combined reply".to_string(),
            });
        };
        let primary_games = decode_list(id, &primary)?;
        let secondary_games = decode_list(id, &secondary)?;

        let mut all_games = Vec::with_capacity(primary_games.len() + secondary_games.len());
        all_games.extend(primary_games.iter().cloned());
        all_games.extend(secondary_games.iter().cloned());
        sort_by_title(&mut all_games);

        let message = format!(
            "Total: {} games ({} from {}, {} from {})",
            all_games.len(),
            primary_games.len(),
            self.settings.primary.describe(),
            secondary_games.len(),
            self.settings.secondary.describe()
        );
        Ok(CombinedGameListResponse {
            total_count: all_games.len(),
            primary_count: primary_games.len(),
            secondary_count: secondary_games.len(),
            all_games,
            primary_games,
            secondary_games,
            message,
        })
    }
}

fn single_payload<'a>(id: &str, reply: &'a Reply) -> Result<&'a str> {
    reply.payload().ok_or_else(|| BridgeError::MalformedReply {
        id: id.to_string(),
        reason: "expected a single payload".to_string(),
    })
}

fn decode<T: serde::de::DeserializeOwned>(id: &str, payload: &str) -> Result<T> {
    serde_json::from_str(payload).map_err(|e| BridgeError::MalformedReply {
        id: id.to_string(),
        reason: e.to_string(),
    })
}

fn decode_list(id: &str, payload: &str) -> Result<Vec<Game>> {
    if payload == crate::bus::NOT_FOUND {
        return Ok(Vec::new());
    }
    decode(id, payload)
}
