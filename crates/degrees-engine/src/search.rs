//! Round-based frontier expansion.
//!
//! A [`Search`] owns the graph and the visited set for one query. Each call to
//! [`Search::step`] runs one round: `depth` waves of expanding every node that
//! is in the graph but not yet visited, followed by a connectivity test
//! between the two endpoints. The caller may drop the search, or cancel its
//! token, between rounds.

use crate::error::{Result, SearchError};
use crate::expansion::{Expander, Expansion, RecentActivity};
use crate::oracle::{NodeId, Oracle};
use crate::topology::{GraphTopology, Path};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const DEFAULT_BREADTH_LIMIT: usize = 10;
const DEFAULT_DEPTH: u32 = 1;

#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Recent groups taken per expanded node.
    pub breadth_limit: usize,
    /// Expansion waves per round before connectivity must be tested.
    pub depth: u32,
    /// Frontier nodes expanded concurrently within a wave.
    pub concurrency: usize,
    /// Give up as exhausted after this many rounds.
    pub max_rounds: Option<u32>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            breadth_limit: DEFAULT_BREADTH_LIMIT,
            depth: DEFAULT_DEPTH,
            concurrency: 1,
            max_rounds: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchState {
    Seeding,
    Expanding { round: u32 },
    Connected(Path),
    Exhausted,
}

impl SearchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SearchState::Connected(_) | SearchState::Exhausted)
    }
}

/// A finished, successful search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub source: NodeId,
    pub target: NodeId,
    pub path: Path,
    pub rounds: u32,
    pub expanded: usize,
    pub graph: GraphTopology,
}

pub struct Search {
    expander: Arc<dyn Expander>,
    config: SearchConfig,
    source: NodeId,
    target: NodeId,
    graph: GraphTopology,
    visited: HashSet<NodeId>,
    state: SearchState,
    round: u32,
    cancel: CancellationToken,
}

impl Search {
    pub fn new(
        expander: Arc<dyn Expander>,
        config: SearchConfig,
        source: NodeId,
        target: NodeId,
    ) -> Self {
        Self {
            expander,
            config,
            source,
            target,
            graph: GraphTopology::new(),
            visited: HashSet::new(),
            state: SearchState::Seeding,
            round: 0,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn graph(&self) -> &GraphTopology {
        &self.graph
    }

    pub fn visited(&self) -> &HashSet<NodeId> {
        &self.visited
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// Advance by one transition. Terminal states are returned unchanged.
    pub async fn step(&mut self) -> Result<&SearchState> {
        match self.state {
            SearchState::Seeding => self.seed(),
            SearchState::Expanding { .. } => self.expand_round().await?,
            SearchState::Connected(_) | SearchState::Exhausted => {}
        }
        Ok(&self.state)
    }

    /// Step until the search terminates.
    pub async fn run(mut self) -> Result<SearchOutcome> {
        while !self.step().await?.is_terminal() {}

        let Search {
            source,
            target,
            graph,
            visited,
            state,
            round,
            ..
        } = self;
        let SearchState::Connected(path) = state else {
            return Err(SearchError::NoPath {
                source_id: source.to_string(),
                target_id: target.to_string(),
            });
        };
        Ok(SearchOutcome {
            source,
            target,
            path,
            rounds: round,
            expanded: visited.len(),
            graph,
        })
    }

    fn seed(&mut self) {
        self.graph.add_node(&self.source);
        self.graph.add_node(&self.target);
        info!(source = %self.source, target = %self.target, "seeded search");
        self.state = self.connectivity_state();
    }

    async fn expand_round(&mut self) -> Result<()> {
        if self.cancel.is_cancelled() {
            info!(round = self.round, "search cancelled");
            return Err(SearchError::Cancelled(self.round));
        }

        if self.graph.unvisited_nodes(&self.visited).is_empty() {
            info!(
                round = self.round,
                nodes = self.graph.num_nodes(),
                "frontier empty, search exhausted"
            );
            self.state = SearchState::Exhausted;
            return Ok(());
        }

        self.round += 1;
        for wave in 0..self.config.depth.max(1) {
            let frontier = self.graph.unvisited_nodes(&self.visited);
            if frontier.is_empty() {
                break;
            }
            info!(round = self.round, wave, frontier = frontier.len(), "expanding frontier");
            self.expand_wave(frontier).await?;
        }

        info!(
            round = self.round,
            nodes = self.graph.num_nodes(),
            edges = self.graph.num_edges(),
            expanded = self.visited.len(),
            "round complete"
        );

        self.state = self.connectivity_state();
        if let (SearchState::Expanding { .. }, Some(max)) = (&self.state, self.config.max_rounds) {
            if self.round >= max {
                info!(round = self.round, "round limit reached, search exhausted");
                self.state = SearchState::Exhausted;
            }
        }
        Ok(())
    }

    /// Expand every node of `frontier` and insert the resulting cliques.
    /// Returns only after all expansions of the wave have finished.
    async fn expand_wave(&mut self, frontier: Vec<NodeId>) -> Result<()> {
        // Claim every node before any expansion starts; `insert` is the
        // test-and-set that keeps expansion at most once per node.
        let claimed: Vec<NodeId> = frontier
            .into_iter()
            .filter(|node| self.visited.insert(node.clone()))
            .collect();

        let expander = Arc::clone(&self.expander);
        let breadth_limit = self.config.breadth_limit;
        let mut expansions = stream::iter(claimed)
            .map(|node| {
                let expander = Arc::clone(&expander);
                async move {
                    let expansion = expander.expand(&node, breadth_limit).await?;
                    Ok::<(NodeId, Expansion), SearchError>((node, expansion))
                }
            })
            .buffered(self.config.concurrency.max(1));

        while let Some(result) = expansions.next().await {
            let (node, expansion) = result?;
            let mut added = 0;
            for group in &expansion.groups {
                added += self.graph.add_clique(group);
            }
            debug!(
                node = %node,
                groups = expansion.groups.len(),
                edges_added = added,
                "merged expansion"
            );
        }
        Ok(())
    }

    fn connectivity_state(&self) -> SearchState {
        match self.graph.shortest_path(&self.source, &self.target) {
            Ok(path) => {
                info!(round = self.round, degrees = path.degrees(), "endpoints connected");
                SearchState::Connected(path)
            }
            Err(_) => SearchState::Expanding { round: self.round },
        }
    }
}

/// Resolve both display names and search between them, expanding each
/// account through its recent matches.
pub async fn find_by_name(
    oracle: Arc<dyn Oracle>,
    config: SearchConfig,
    source_name: &str,
    target_name: &str,
    cancel: CancellationToken,
) -> Result<SearchOutcome> {
    let source = oracle.resolve_id(source_name).await?;
    let target = oracle.resolve_id(target_name).await?;
    info!(%source_name, %source, %target_name, %target, "resolved endpoints");

    let expander = Arc::new(RecentActivity::new(oracle));
    Search::new(expander, config, source, target)
        .with_cancellation(cancel)
        .run()
        .await
}
