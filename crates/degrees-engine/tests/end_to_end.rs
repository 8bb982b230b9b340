use async_trait::async_trait;
use degrees_core::client::{ClientConfig, OracleClient, Transport};
use degrees_core::oracle::{NodeId, RiotOracle};
use degrees_core::persistence::{FileCache, Operation, ResponseCache};
use degrees_core::report::Report;
use degrees_core::search::{find_by_name, SearchConfig};
use degrees_core::{OracleError, SearchError};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Canned API responses keyed by (operation, key). Unknown keys answer 404.
#[derive(Default)]
struct World {
    responses: HashMap<(Operation, String), Value>,
    live_calls: AtomicUsize,
    unauthorized_after: Option<usize>,
    log: Mutex<Vec<(Operation, String)>>,
}

impl World {
    fn player(mut self, name: &str, account: &str, games: &[u64]) -> Self {
        let summoner = json!({"accountId": account, "name": name});
        self.responses
            .insert((Operation::Summoner, name.to_string()), summoner.clone());
        self.responses
            .insert((Operation::Account, account.to_string()), summoner);
        let matches: Vec<Value> = games.iter().map(|g| json!({"gameId": g})).collect();
        self.responses.insert(
            (Operation::MatchList, account.to_string()),
            json!({"matches": matches}),
        );
        self
    }

    fn game(mut self, id: u64, accounts: &[&str]) -> Self {
        let identities: Vec<Value> = accounts
            .iter()
            .map(|a| json!({"player": {"accountId": a}}))
            .collect();
        self.responses.insert(
            (Operation::Match, id.to_string()),
            json!({"participantIdentities": identities}),
        );
        self
    }

    fn calls(&self) -> usize {
        self.live_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for World {
    async fn get(&self, op: Operation, key: &str) -> Result<Value, OracleError> {
        let n = self.live_calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push((op, key.to_string()));
        if self.unauthorized_after.is_some_and(|limit| n >= limit) {
            return Err(OracleError::Unauthorized);
        }
        self.responses
            .get(&(op, key.to_string()))
            .cloned()
            .ok_or_else(|| OracleError::Unavailable("404 Not Found".into()))
    }
}

fn shared_match_world() -> World {
    World::default()
        .player("alice", "ID1", &[100])
        .player("bob", "ID2", &[200])
        .player("carol", "ID3", &[100, 200])
        .game(100, &["ID1", "ID3"])
        .game(200, &["ID2", "ID3"])
}

fn oracle(world: Arc<World>, cache: Arc<dyn ResponseCache>) -> Arc<RiotOracle> {
    let config = ClientConfig {
        request_delay: Duration::ZERO,
        rate_limit_cooldown: Duration::ZERO,
        ..ClientConfig::default()
    };
    Arc::new(RiotOracle::new(OracleClient::new(world, cache, config)))
}

#[tokio::test]
async fn players_sharing_a_teammate_are_two_apart() {
    let dir = tempfile::tempdir().unwrap();
    let world = Arc::new(shared_match_world());
    let cache: Arc<dyn ResponseCache> = Arc::new(FileCache::open(dir.path()).unwrap());
    let oracle = oracle(world.clone(), cache);

    let outcome = find_by_name(
        oracle.clone(),
        SearchConfig::default(),
        "alice",
        "bob",
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(
        outcome.path.nodes(),
        &[NodeId::from("ID1"), "ID3".into(), "ID2".into()]
    );
    assert_eq!(outcome.rounds, 1);

    let report = Report::build(oracle.as_ref(), "alice", "bob", &outcome)
        .await
        .unwrap();
    let names: Vec<&str> = report.path.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["alice", "carol", "bob"]);
    assert_eq!(report.degrees, 2);
}

#[tokio::test]
async fn warm_cache_needs_no_live_calls() {
    let dir = tempfile::tempdir().unwrap();

    let cold_world = Arc::new(shared_match_world());
    let cold = {
        let cache: Arc<dyn ResponseCache> = Arc::new(FileCache::open(dir.path()).unwrap());
        find_by_name(
            oracle(cold_world.clone(), cache),
            SearchConfig::default(),
            "alice",
            "bob",
            CancellationToken::new(),
        )
        .await
        .unwrap()
    };
    assert!(cold_world.calls() > 0);

    // Fresh process: reopen the stores from disk.
    let warm_world = Arc::new(shared_match_world());
    let cache: Arc<dyn ResponseCache> = Arc::new(FileCache::open(dir.path()).unwrap());
    let oracle = oracle(warm_world.clone(), cache);
    let warm = find_by_name(
        oracle.clone(),
        SearchConfig::default(),
        "alice",
        "bob",
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(warm_world.calls(), 0);
    assert_eq!(warm.path, cold.path);
    assert_eq!(oracle.client().stats().live_calls, 0);
}

#[tokio::test]
async fn each_player_is_looked_up_once() {
    let world = Arc::new(
        World::default()
            .player("alice", "ID1", &[1, 2])
            .player("bob", "ID2", &[3])
            .player("x", "IDX", &[1, 2, 4])
            .player("y", "IDY", &[2, 4])
            .player("z", "IDZ", &[4, 3])
            .game(1, &["ID1", "IDX"])
            .game(2, &["ID1", "IDX", "IDY"])
            .game(4, &["IDX", "IDY", "IDZ"])
            .game(3, &["IDZ", "ID2"]),
    );
    let cache: Arc<dyn ResponseCache> = Arc::new(degrees_core::persistence::MemoryCache::new());
    let outcome = find_by_name(
        oracle(world.clone(), cache),
        SearchConfig::default(),
        "alice",
        "bob",
        CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(outcome.path.degrees(), 3);

    let log = world.log.lock().unwrap();
    let mut match_lists: Vec<&str> = log
        .iter()
        .filter(|(op, _)| *op == Operation::MatchList)
        .map(|(_, key)| key.as_str())
        .collect();
    let total = match_lists.len();
    match_lists.sort_unstable();
    match_lists.dedup();
    assert_eq!(match_lists.len(), total);
}

#[tokio::test]
async fn unknown_player_is_reported() {
    let world = Arc::new(shared_match_world());
    let cache: Arc<dyn ResponseCache> = Arc::new(degrees_core::persistence::MemoryCache::new());
    let err = find_by_name(
        oracle(world, cache),
        SearchConfig::default(),
        "alice",
        "nobody",
        CancellationToken::new(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SearchError::NotFound(ref name) if name == "nobody"));
    assert!(!err.is_fatal());
}

#[tokio::test]
async fn disconnected_players_exhaust() {
    let world = Arc::new(
        World::default()
            .player("alice", "ID1", &[1])
            .player("bob", "ID2", &[2])
            .game(1, &["ID1", "IDX"])
            .game(2, &["ID2", "IDY"]),
    );
    let cache: Arc<dyn ResponseCache> = Arc::new(degrees_core::persistence::MemoryCache::new());
    let err = find_by_name(
        oracle(world, cache),
        SearchConfig::default(),
        "alice",
        "bob",
        CancellationToken::new(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SearchError::NoPath { .. }));
}

#[tokio::test]
async fn rejected_key_stops_the_search() {
    // Both summoner lookups succeed, then the key is revoked.
    let world = Arc::new(World {
        unauthorized_after: Some(2),
        ..shared_match_world()
    });
    let cache: Arc<dyn ResponseCache> = Arc::new(degrees_core::persistence::MemoryCache::new());
    let err = find_by_name(
        oracle(world.clone(), cache),
        SearchConfig::default(),
        "alice",
        "bob",
        CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, SearchError::Unauthorized));
    assert!(err.is_fatal());
    assert_eq!(world.calls(), 3);
}
