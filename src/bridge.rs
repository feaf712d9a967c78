
use crate::data_types::sequence_graph::{GraphError, NodeId, NodeSide, SequenceGraph};
use crate::graph_variant::{GraphVariant, LocatorError};
use crate::phase_relation::PhaseRelation;

use log::{debug, trace};
use rustc_hash::FxHashSet as HashSet;

#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum BridgeError {
    #[error("node side {side} was already severed by an earlier bridge")]
    AlreadyBridged { side: NodeSide },
    #[error("cannot bridge {position1} -> {position2} with an unresolved phase relation")]
    UnresolvedPhase { position1: i64, position2: i64 },
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Locator(#[from] LocatorError)
}

/// Rewires the graph between pairs of variants so that only observed haplotype combinations remain connected.
/// Tracks every node side it has severed so a pair can never be rewired twice.
#[derive(Debug, Default)]
pub struct BridgeBuilder {
    /// sides whose edges have already been cut and replaced
    severed: HashSet<NodeSide>,
    /// number of reference nodes duplicated
    nodes_created: usize,
    /// number of edges removed from the graph
    edges_destroyed: usize,
    /// number of edges added to the graph
    edges_created: usize
}

impl BridgeBuilder {
    pub fn new() -> BridgeBuilder {
        Default::default()
    }

    pub fn nodes_created(&self) -> usize {
        self.nodes_created
    }

    pub fn edges_destroyed(&self) -> usize {
        self.edges_destroyed
    }

    pub fn edges_created(&self) -> usize {
        self.edges_created
    }

    /// Rewires the graph between one ALT allele of `gv1` and one ALT allele of `gv2`.
    /// All edges leaving the end of the v1 allele and entering the start of the v2 allele are removed.
    /// The reference between the variants is duplicated (if there is any) so the ALT branch gets its own copy,
    /// and new forward edges are installed for each combination the relation says was observed:
    /// * `And`, `FromRef`, `ToRef` - ALT1 to ALT2
    /// * `FromRef`, `Xor` - REF1 to ALT2
    /// * `ToRef`, `Xor` - ALT1 to REF2
    /// # Arguments
    /// * `graph` - the graph both variants were bound against, modified in place
    /// * `gv1` - the upstream variant
    /// * `allele1` - the ALT allele of `gv1`
    /// * `gv2` - the downstream variant
    /// * `allele2` - the ALT allele of `gv2`
    /// * `phase` - the relation between the two alleles
    /// # Errors
    /// * `UnresolvedPhase` - if `phase` is `Other`
    /// * `AlreadyBridged` - if either allele side was cut by a previous rewrite
    /// * `Graph` / `Locator` - internal consistency failures while walking or editing the graph
    pub fn rewrite(
        &mut self, graph: &mut SequenceGraph,
        gv1: &GraphVariant, allele1: usize,
        gv2: &GraphVariant, allele2: usize,
        phase: PhaseRelation
    ) -> Result<(), BridgeError> {
        if phase == PhaseRelation::Other {
            return Err(BridgeError::UnresolvedPhase { position1: gv1.position(), position2: gv2.position() });
        }

        let node1: NodeId = last_node(gv1.graph_allele(allele1));
        let ref1: NodeId = last_node(gv1.graph_allele(0));
        let node2: NodeId = gv2.graph_allele(allele2)[0];
        let ref2: NodeId = gv2.graph_allele(0)[0];
        debug!("Bridging {} allele {} (node {}) to {} allele {} (node {}) as {}", gv1.position(), allele1, node1, gv2.position(), allele2, node2, phase);

        let out_side = NodeSide::end(node1);
        let in_side = NodeSide::start(node2);
        for side in [out_side, in_side] {
            if self.severed.contains(&side) {
                return Err(BridgeError::AlreadyBridged { side });
            }
        }
        let ref_path: Vec<NodeId> = gv1.reference_path_between(graph, gv2)?;

        // edges are copied out before removal, each destroy invalidates the adjacency
        for side in [out_side, in_side] {
            for other in graph.edges_on_side(side) {
                trace!("Destroying edge {} -> {}", side, other);
                graph.destroy_edge(side, other)?;
                self.edges_destroyed += 1;
            }
            self.severed.insert(side);
        }

        let (prev, ref_prev): (NodeId, NodeId) = if ref_path.is_empty() {
            (node1, ref1)
        } else {
            // node1 -> copy of the intervening reference
            let mut prev: NodeId = node1;
            for &ref_node in ref_path.iter() {
                let sequence: Vec<u8> = match graph.node(ref_node) {
                    Some(n) => n.sequence().to_vec(),
                    None => return Err(GraphError::NodeNotFound { node_id: ref_node }.into())
                };
                let dup: NodeId = graph.create_node(sequence);
                self.nodes_created += 1;
                self.connect(graph, prev, dup);
                prev = dup;
            }
            (prev, last_node(&ref_path))
        };

        if matches!(phase, PhaseRelation::And | PhaseRelation::FromRef | PhaseRelation::ToRef) {
            self.connect(graph, prev, node2);
        }
        if matches!(phase, PhaseRelation::FromRef | PhaseRelation::Xor) {
            self.connect(graph, ref_prev, node2);
        }
        if matches!(phase, PhaseRelation::ToRef | PhaseRelation::Xor) {
            self.connect(graph, prev, ref2);
        }
        Ok(())
    }

    fn connect(&mut self, graph: &mut SequenceGraph, from_id: NodeId, to_id: NodeId) {
        trace!("Creating edge {} -> {}", from_id, to_id);
        if graph.create_forward_edge(from_id, to_id) {
            self.edges_created += 1;
        }
    }
}

/// Bound alleles always have at least one node
fn last_node(nodes: &[NodeId]) -> NodeId {
    nodes[nodes.len() - 1]
}
