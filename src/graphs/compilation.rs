//! Graph compilation logic and validation.
//!
//! This module contains the logic for compiling a GraphBuilder into an
//! executable App, including validation and error handling.

use crate::app::App;
use miette::Diagnostic;
use thiserror::Error;

/// Structural errors caught at compile time, before an [`App`] is ever run.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphCompileError {
    /// No edge (conditional or unconditional) originates anywhere in the
    /// graph, so there is no way to reach a node from `NodeKind::Start`.
    #[error("graph has no entry point: no edges were registered")]
    #[diagnostic(
        code(rfpgraph::graphs::missing_entry),
        help("Add at least one edge, e.g. add_edge(NodeKind::Start, ...).")
    )]
    MissingEntry,
}

/// Compilation logic for GraphBuilder.
impl super::builder::GraphBuilder {
    /// Compiles the graph into an executable application.
    ///
    /// Validates the graph configuration and converts it into an [`App`] that
    /// can execute workflows. This method performs several validation checks:
    ///
    /// - Future: cycle detection, reachability analysis
    /// - Future: validation that at least one edge originates from Start
    ///
    /// # Returns
    ///
    /// - `Ok(App)`: Successfully compiled application ready for execution
    ///
    /// # Errors
    ///
    /// Returns [`GraphCompileError::MissingEntry`] when the graph has no
    /// edges at all (conditional or unconditional), since there would be no
    /// way to leave `NodeKind::Start`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rfpgraph::graphs::GraphBuilder;
    /// use rfpgraph::types::NodeKind;
    ///
    /// # struct MyNode;
    /// # #[async_trait::async_trait]
    /// # impl rfpgraph::node::Node for MyNode {
    /// #     async fn run(&self, _: rfpgraph::state::StateSnapshot, _: rfpgraph::node::NodeContext) -> Result<rfpgraph::node::NodePartial, rfpgraph::node::NodeError> {
    /// #         Ok(rfpgraph::node::NodePartial::default())
    /// #     }
    /// # }
    ///
    /// let app = GraphBuilder::new()
    ///     .add_node(NodeKind::Custom("process".into()), MyNode)
    ///     .add_edge(NodeKind::Start, NodeKind::Custom("process".into()))
    ///     .add_edge(NodeKind::Custom("process".into()), NodeKind::End)
    ///     .compile()
    ///     .unwrap();
    ///
    /// // App is ready for execution
    /// ```
    pub fn compile(self) -> Result<App, GraphCompileError> {
        if self.edges_ref().is_empty() && self.conditional_edges_ref().is_empty() {
            return Err(GraphCompileError::MissingEntry);
        }
        let (nodes, edges, conditional_edges, runtime_config, reducer_registry) =
            self.into_parts();
        Ok(App::from_parts(
            nodes,
            edges,
            conditional_edges,
            runtime_config,
            reducer_registry,
        ))
    }
}
