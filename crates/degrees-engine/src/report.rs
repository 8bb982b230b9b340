use crate::client::StatsSnapshot;
use crate::error::Result;
use crate::oracle::{NodeId, Oracle};
use crate::search::SearchOutcome;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathStep {
    pub account_id: NodeId,
    pub name: String,
}

/// What a renderer needs: the discovered graph's size and the edges to
/// highlight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
    pub path_edges: Vec<(NodeId, NodeId)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub source: String,
    pub target: String,
    pub degrees: usize,
    pub path: Vec<PathStep>,
    pub rounds: u32,
    pub expanded: usize,
    pub graph: GraphSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookups: Option<StatsSnapshot>,
}

impl Report {
    /// Resolve every path member to its display name.
    pub async fn build(
        oracle: &dyn Oracle,
        source: &str,
        target: &str,
        outcome: &SearchOutcome,
    ) -> Result<Self> {
        let mut path = Vec::with_capacity(outcome.path.len());
        for id in outcome.path.nodes() {
            path.push(PathStep {
                account_id: id.clone(),
                name: oracle.resolve_name(id).await?,
            });
        }

        Ok(Self {
            source: source.to_string(),
            target: target.to_string(),
            degrees: outcome.path.degrees(),
            path,
            rounds: outcome.rounds,
            expanded: outcome.expanded,
            graph: GraphSummary {
                nodes: outcome.graph.num_nodes(),
                edges: outcome.graph.num_edges(),
                path_edges: outcome
                    .path
                    .edges()
                    .map(|(a, b)| (a.clone(), b.clone()))
                    .collect(),
            },
            lookups: None,
        })
    }

    pub fn with_lookups(mut self, stats: StatsSnapshot) -> Self {
        self.lookups = Some(stats);
        self
    }
}

/// Terminal consumer of a finished search.
pub trait Presenter {
    fn present(&self, report: &Report, out: &mut dyn Write) -> io::Result<()>;
}

pub struct TextPresenter;

impl Presenter for TextPresenter {
    fn present(&self, report: &Report, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "{} and {} have {} degrees of separation",
            report.source, report.target, report.degrees
        )?;
        for step in &report.path {
            writeln!(out, "{}", step.name)?;
        }
        Ok(())
    }
}

pub struct JsonPresenter;

impl Presenter for JsonPresenter {
    fn present(&self, report: &Report, out: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *out, report)?;
        writeln!(out)
    }
}
