use crate::error::Result;
use crate::oracle::{NodeId, Oracle};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Co-occurrence groups discovered for one node.
///
/// Members of a group are mutually adjacent; the caller turns each group into
/// a clique. The expanded node may appear in its own groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    pub groups: Vec<Vec<NodeId>>,
}

impl Expansion {
    pub fn members(&self) -> impl Iterator<Item = &NodeId> + '_ {
        self.groups.iter().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(Vec::is_empty)
    }
}

/// Decides which neighbors a node contributes to the graph.
///
/// Implementations only report groups; they never touch the graph.
#[async_trait]
pub trait Expander: Send + Sync {
    async fn expand(&self, node: &NodeId, breadth_limit: usize) -> Result<Expansion>;
}

/// Players from the `breadth_limit` most recent matches of an account.
pub struct RecentActivity {
    oracle: Arc<dyn Oracle>,
}

impl RecentActivity {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }
}

#[async_trait]
impl Expander for RecentActivity {
    async fn expand(&self, node: &NodeId, breadth_limit: usize) -> Result<Expansion> {
        let keys = self.oracle.list_activity(node).await?;

        let mut groups = Vec::new();
        for key in keys.into_iter().take(breadth_limit) {
            let members = self.oracle.list_participants(&key).await?;
            if !members.is_empty() {
                groups.push(members);
            }
        }

        debug!(node = %node, groups = groups.len(), "expanded");
        Ok(Expansion { groups })
    }
}
