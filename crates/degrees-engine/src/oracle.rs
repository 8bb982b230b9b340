use crate::client::{OracleClient, Reply};
use crate::error::{Result, SearchError};
use crate::persistence::Operation;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// Account identifier; one graph vertex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Match identifier; one co-occurrence group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityKey(pub String);

impl fmt::Display for ActivityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The four lookups the search needs from upstream.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Display name to account id. Fails with `NotFound` for unknown names.
    async fn resolve_id(&self, name: &str) -> Result<NodeId>;

    /// Account id to display name, for presentation only.
    async fn resolve_name(&self, id: &NodeId) -> Result<String>;

    /// Recent matches, most recent first.
    async fn list_activity(&self, id: &NodeId) -> Result<Vec<ActivityKey>>;

    async fn list_participants(&self, key: &ActivityKey) -> Result<Vec<NodeId>>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummonerDto {
    account_id: String,
    name: Option<String>,
}

#[derive(Deserialize)]
struct MatchListDto {
    #[serde(default)]
    matches: Vec<MatchRefDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchRefDto {
    game_id: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchDto {
    #[serde(default)]
    participant_identities: Vec<ParticipantIdentityDto>,
}

#[derive(Deserialize)]
struct ParticipantIdentityDto {
    /// Absent for bots and anonymised players.
    player: Option<PlayerDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerDto {
    account_id: String,
}

/// [`Oracle`] over the Riot summoner-v4 and match-v4 endpoints.
pub struct RiotOracle {
    client: OracleClient,
}

impl RiotOracle {
    pub fn new(client: OracleClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &OracleClient {
        &self.client
    }

    /// Fetch and decode; `None` when the lookup degraded or the payload does
    /// not have the expected shape.
    async fn fetch_as<T: DeserializeOwned>(&self, op: Operation, key: &str) -> Result<Option<T>> {
        let reply = self.client.fetch(op, key).await?;
        let value = match reply {
            Reply::Data(value) => value,
            Reply::Degraded(_) => return Ok(None),
        };
        match serde_json::from_value(value) {
            Ok(decoded) => Ok(Some(decoded)),
            Err(err) => {
                warn!(%op, key, error = %err, "unexpected payload shape, treating as empty");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl Oracle for RiotOracle {
    async fn resolve_id(&self, name: &str) -> Result<NodeId> {
        self.fetch_as::<SummonerDto>(Operation::Summoner, name)
            .await?
            .map(|summoner| NodeId(summoner.account_id))
            .ok_or_else(|| SearchError::NotFound(name.to_string()))
    }

    async fn resolve_name(&self, id: &NodeId) -> Result<String> {
        let name = self
            .fetch_as::<SummonerDto>(Operation::Account, id.as_str())
            .await?
            .and_then(|summoner| summoner.name);
        Ok(name.unwrap_or_else(|| id.to_string()))
    }

    async fn list_activity(&self, id: &NodeId) -> Result<Vec<ActivityKey>> {
        let list = self
            .fetch_as::<MatchListDto>(Operation::MatchList, id.as_str())
            .await?;
        Ok(list
            .map(|list| {
                list.matches
                    .into_iter()
                    .map(|m| match m.game_id {
                        Value::String(s) => ActivityKey(s),
                        other => ActivityKey(other.to_string()),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_participants(&self, key: &ActivityKey) -> Result<Vec<NodeId>> {
        let game = self.fetch_as::<MatchDto>(Operation::Match, &key.0).await?;
        Ok(game
            .map(|game| {
                game.participant_identities
                    .into_iter()
                    .filter_map(|p| p.player.map(|player| NodeId(player.account_id)))
                    .collect()
            })
            .unwrap_or_default())
    }
}
