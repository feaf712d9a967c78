
use crate::data_types::sequence_graph::{NodeId, PathStep, ReferencePath, SequenceGraph};
use crate::data_types::variant_record::{VariantCategory, VariantRecord};

use log::trace;
use std::fmt;

#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum LocatorError {
    #[error("unable to find path for {sequence_name:?} in the graph")]
    PathNotFound { sequence_name: String },
    #[error("variant at position {sequence_name}:{position} not found in graph")]
    VariantNotInGraph { sequence_name: String, position: i64 },
    #[error("path {path_name:?} step {step_index} (node {node_id}): only forward steps with a single trivial edit are supported in the reference path")]
    MalformedMapping { path_name: String, step_index: usize, node_id: NodeId },
    #[error("graph path beginning at node {node_id} has sequence {graph_sequence:?} which does not match the VCF reference {vcf_reference:?} at {sequence_name}:{position}")]
    AlleleMismatch { sequence_name: String, position: i64, node_id: NodeId, graph_sequence: String, vcf_reference: String },
    #[error("unable to find graph node for allele {allele_index} of {sequence_name}:{position}")]
    AlleleNotFound { sequence_name: String, position: i64, allele_index: usize },
    #[error("allele {allele_index} of {sequence_name}:{position} matches multiple graph nodes: {candidates:?}")]
    AmbiguousAllele { sequence_name: String, position: i64, allele_index: usize, candidates: Vec<NodeId> },
    #[error("reference path from node {from_node} does not reach node {to_node}")]
    DisconnectedReference { from_node: NodeId, to_node: NodeId }
}

/// Position along an embedded reference path.
/// Cursors only move forward, so each bind should start from the cursor of the previously bound variant.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathCursor {
    /// the path this cursor walks
    path_name: String,
    /// index of the current step in the path
    step_index: usize,
    /// total sequence length of all steps before `step_index`
    covered_length: usize
}

impl PathCursor {
    /// Creates a cursor at the very beginning of a path
    pub fn new(path_name: &str) -> PathCursor {
        PathCursor {
            path_name: path_name.to_string(),
            step_index: 0,
            covered_length: 0
        }
    }

    pub fn path_name(&self) -> &str {
        &self.path_name
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn covered_length(&self) -> usize {
        self.covered_length
    }
}

/// A VCF variant bound to its location in the sequence graph.
/// Allele 0 maps to the run of reference nodes that spell REF, every other allele maps to exactly one sibling node.
#[derive(Clone, Debug)]
pub struct GraphVariant {
    /// the source record, including genotypes
    record: VariantRecord,
    /// the record position translated into 0-based path coordinates
    reference_position: i64,
    /// the path step containing the first REF base
    cursor: PathCursor,
    /// graph nodes for each allele, index 0 is REF
    allele_nodes: Vec<Vec<NodeId>>,
    /// coarse variant category, only used for reporting
    category: VariantCategory
}

impl GraphVariant {
    /// Locates a variant record in the graph.
    /// # Arguments
    /// * `graph` - the graph to search, which must contain a path named after the record's chromosome
    /// * `record` - the variant to bind
    /// * `cursor` - cursor from the previously bound variant; traversal restarts at the path start if this is None or on another path
    /// * `offset` - VCF coordinate of the first base of the path
    /// # Errors
    /// * `PathNotFound` - no path for the record's chromosome
    /// * `MalformedMapping` - a traversed step is reversed or has a non-trivial edit
    /// * `VariantNotInGraph` - the position is behind the cursor or beyond the end of the path
    /// * `AlleleMismatch` - the reference nodes do not spell REF
    /// * `AlleleNotFound` / `AmbiguousAllele` - an ALT does not map to exactly one sibling node
    pub fn bind(graph: &SequenceGraph, record: VariantRecord, cursor: Option<PathCursor>, offset: i64) -> Result<GraphVariant, LocatorError> {
        let path: &ReferencePath = match graph.path(record.sequence_name()) {
            Some(p) => p,
            None => return Err(LocatorError::PathNotFound { sequence_name: record.sequence_name().to_string() })
        };

        let mut cursor: PathCursor = match cursor {
            Some(c) if c.path_name == path.name() => c,
            _ => PathCursor::new(path.name())
        };

        // scan forward along the path until the variant position falls within a step
        let reference_position: i64 = record.position() - offset;
        let not_found = || LocatorError::VariantNotInGraph {
            sequence_name: record.sequence_name().to_string(),
            position: record.position()
        };
        if reference_position < cursor.covered_length as i64 {
            return Err(not_found());
        }
        let target: usize = reference_position as usize;
        let steps: &[PathStep] = path.steps();
        let mut found: bool = false;
        while cursor.step_index < steps.len() {
            let step_len: usize = checked_step_length(graph, path, cursor.step_index)?;
            if cursor.covered_length + step_len > target {
                found = true;
                break;
            }
            cursor.covered_length += step_len;
            cursor.step_index += 1;
        }
        if !found {
            return Err(not_found());
        }

        // the reference allele should be spelled exactly by a run of path steps starting here
        let vcf_reference: &[u8] = record.reference_allele();
        let mut graph_sequence: Vec<u8> = vec![];
        let mut ref_nodes: Vec<NodeId> = vec![];
        let mut step_index: usize = cursor.step_index;
        while graph_sequence.len() < vcf_reference.len() && step_index < steps.len() {
            checked_step_length(graph, path, step_index)?;
            let node_id: NodeId = steps[step_index].node_id();
            graph_sequence.extend_from_slice(step_sequence(graph, &steps[step_index]));
            ref_nodes.push(node_id);
            step_index += 1;
        }
        if !istreq(&graph_sequence, vcf_reference, 0, 0, None) {
            return Err(LocatorError::AlleleMismatch {
                sequence_name: record.sequence_name().to_string(),
                position: record.position(),
                node_id: steps[cursor.step_index].node_id(),
                graph_sequence: String::from_utf8_lossy(&graph_sequence).to_string(),
                vcf_reference: String::from_utf8_lossy(vcf_reference).to_string()
            });
        }

        // the alternate alleles are among the full siblings of the reference traversal
        let first_ref: NodeId = ref_nodes[0];
        let last_ref: NodeId = ref_nodes[ref_nodes.len() - 1];
        let siblings: Vec<NodeId> = graph.full_siblings(first_ref, last_ref);
        trace!("{}: reference nodes {:?}, siblings {:?}", record, ref_nodes, siblings);

        let mut allele_nodes: Vec<Vec<NodeId>> = Vec::with_capacity(record.num_alleles());
        allele_nodes.push(ref_nodes);
        for (allele_index, allele) in record.alleles().iter().enumerate().skip(1) {
            let candidates: Vec<NodeId> = siblings.iter()
                .filter(|&&s| graph.node(s).map(|n| istreq(allele, n.sequence(), 0, 0, None)).unwrap_or(false))
                .cloned()
                .collect();
            match candidates.len() {
                0 => return Err(LocatorError::AlleleNotFound {
                    sequence_name: record.sequence_name().to_string(),
                    position: record.position(),
                    allele_index
                }),
                1 => allele_nodes.push(candidates),
                _ => return Err(LocatorError::AmbiguousAllele {
                    sequence_name: record.sequence_name().to_string(),
                    position: record.position(),
                    allele_index,
                    candidates
                })
            };
        }

        let category = record.category();
        Ok(GraphVariant {
            record,
            reference_position,
            cursor,
            allele_nodes,
            category
        })
    }

    pub fn record(&self) -> &VariantRecord {
        &self.record
    }

    pub fn position(&self) -> i64 {
        self.record.position()
    }

    pub fn reference_position(&self) -> i64 {
        self.reference_position
    }

    /// The last VCF position covered by the REF allele
    pub fn reference_end(&self) -> i64 {
        self.record.end_position()
    }

    pub fn cursor(&self) -> &PathCursor {
        &self.cursor
    }

    pub fn category(&self) -> VariantCategory {
        self.category
    }

    pub fn num_alleles(&self) -> usize {
        self.allele_nodes.len()
    }

    /// The graph nodes for a given allele, in path order
    /// # Panics
    /// * if `allele_index` is not a valid allele for this variant
    pub fn graph_allele(&self, allele_index: usize) -> &[NodeId] {
        &self.allele_nodes[allele_index]
    }

    /// Returns true if the REF allele of this variant extends onto the position of `other`
    pub fn overlaps(&self, other: &GraphVariant) -> bool {
        self.record.position() + self.record.ref_len() as i64 > other.record.position()
    }

    /// Collects the reference nodes strictly between the end of this variant's REF and the start of `other`'s REF.
    /// # Arguments
    /// * `graph` - the graph both variants were bound against
    /// * `other` - a variant bound downstream of this one on the same path
    /// # Errors
    /// * `DisconnectedReference` - `other` is not downstream on the same path; callers only use this on consecutive variants, so this is an internal error
    pub fn reference_path_between(&self, graph: &SequenceGraph, other: &GraphVariant) -> Result<Vec<NodeId>, LocatorError> {
        let from_node: NodeId = self.allele_nodes[0][self.allele_nodes[0].len() - 1];
        let to_node: NodeId = other.allele_nodes[0][0];
        let disconnected = LocatorError::DisconnectedReference { from_node, to_node };

        let path: &ReferencePath = match graph.path(&self.cursor.path_name) {
            Some(p) if other.cursor.path_name == self.cursor.path_name => p,
            _ => return Err(disconnected)
        };

        // walk one past our REF end, then keep everything until we hit the other REF start
        let steps: &[PathStep] = path.steps();
        let start: usize = self.cursor.step_index + self.allele_nodes[0].len();
        let end: usize = other.cursor.step_index;
        if end < start || end >= steps.len() || steps[end].node_id() != to_node {
            return Err(disconnected);
        }
        Ok(steps[start..end].iter().map(|s| s.node_id()).collect())
    }
}

impl fmt::Display for GraphVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GV:[{}:{}", self.record.sequence_name(), self.record.position())?;
        for (i, (allele, nodes)) in self.record.alleles().iter().zip(self.allele_nodes.iter()).enumerate() {
            write!(f, " ({}) vcf={} | vg=", i, String::from_utf8_lossy(allele))?;
            for n in nodes.iter() {
                write!(f, "{n},")?;
            }
            write!(f, ";")?;
        }
        write!(f, "]")
    }
}

/// Computes the total sequence length of a reference path, checking that every step is usable.
/// # Arguments
/// * `graph` - the graph containing the path
/// * `sequence_name` - the path name, usually a chromosome
/// # Errors
/// * `PathNotFound` - if the path is missing
/// * `MalformedMapping` - if any step is reversed or has a non-trivial edit
pub fn reference_path_length(graph: &SequenceGraph, sequence_name: &str) -> Result<usize, LocatorError> {
    let path: &ReferencePath = match graph.path(sequence_name) {
        Some(p) => p,
        None => return Err(LocatorError::PathNotFound { sequence_name: sequence_name.to_string() })
    };
    let mut total: usize = 0;
    for step_index in 0..path.len() {
        total += checked_step_length(graph, path, step_index)?;
    }
    Ok(total)
}

/// Case-insensitive comparison of `s1[o1..o1+len]` with `s2[o2..o2+len]`.
/// If `len` is None, the longer of the two remaining lengths is used, so both must be the same length to match.
/// Returns false if either slice is too short for the window or the window is empty.
pub fn istreq(s1: &[u8], s2: &[u8], o1: usize, o2: usize, len: Option<usize>) -> bool {
    let len: usize = len.unwrap_or_else(|| s1.len().saturating_sub(o1).max(s2.len().saturating_sub(o2)));
    if len == 0 || o1 + len > s1.len() || o2 + len > s2.len() {
        return false;
    }
    s1[o1..o1+len].eq_ignore_ascii_case(&s2[o2..o2+len])
}

/// Returns the length of a path step after verifying it is forward with a trivial edit
fn checked_step_length(graph: &SequenceGraph, path: &ReferencePath, step_index: usize) -> Result<usize, LocatorError> {
    let step: &PathStep = &path.steps()[step_index];
    if !step.is_simple_match() {
        return Err(LocatorError::MalformedMapping {
            path_name: path.name().to_string(),
            step_index,
            node_id: step.node_id()
        });
    }
    Ok(step_sequence(graph, step).len())
}

/// The node sequence visited by a step; steps are validated against the node set when the path is added
fn step_sequence<'a>(graph: &'a SequenceGraph, step: &PathStep) -> &'a [u8] {
    graph.node(step.node_id())
        .map(|n| n.sequence())
        .expect("path steps always reference nodes in the graph")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::sequence_graph::Edit;
    use crate::test_util::{record, second_snp_position, two_snp_graph};

    #[test]
    fn test_istreq() {
        assert!(istreq(b"ACGT", b"acgt", 0, 0, None));
        assert!(!istreq(b"ACGT", b"ACG", 0, 0, None));
        assert!(istreq(b"ACGT", b"ACG", 0, 0, Some(3)));
        assert!(istreq(b"ACGT", b"CG", 1, 0, Some(2)));
        assert!(istreq(b"xxACGT", b"yACG", 2, 1, Some(3)));
        // window longer than either operand
        assert!(!istreq(b"ACGT", b"CG", 1, 0, Some(3)));
        assert!(!istreq(b"", b"", 0, 0, None));
    }

    #[test]
    fn test_bind_snp() {
        let graph = two_snp_graph(4);
        let gv = GraphVariant::bind(&graph, record(11, &["A", "T"], &[]), None, 1).unwrap();
        assert_eq!(gv.reference_position(), 10);
        assert_eq!(gv.graph_allele(0), &[2]);
        assert_eq!(gv.graph_allele(1), &[3]);
        assert_eq!(gv.num_alleles(), 2);
        assert_eq!(gv.category(), VariantCategory::Snp);
        assert_eq!(gv.cursor().step_index(), 1);
        assert_eq!(gv.cursor().covered_length(), 10);
        assert_eq!(format!("{gv}"), "GV:[chr1:11 (0) vcf=A | vg=2,; (1) vcf=T | vg=3,;]");

        // lower case is fine
        let gv2 = GraphVariant::bind(&graph, record(second_snp_position(4), &["g", "c"], &[]), Some(gv.cursor().clone()), 1).unwrap();
        assert_eq!(gv2.graph_allele(0), &[5]);
        assert_eq!(gv2.graph_allele(1), &[6]);
        assert_eq!(gv2.cursor().step_index(), 3);
        assert_eq!(gv.reference_path_between(&graph, &gv2).unwrap(), vec![4]);
        assert!(!gv.overlaps(&gv2));
    }

    #[test]
    fn test_bind_adjacent() {
        let graph = two_snp_graph(0);
        let gv1 = GraphVariant::bind(&graph, record(11, &["A", "T"], &[]), None, 1).unwrap();
        let gv2 = GraphVariant::bind(&graph, record(12, &["G", "C"], &[]), Some(gv1.cursor().clone()), 1).unwrap();
        assert_eq!(gv2.graph_allele(1), &[6]);
        assert!(gv1.reference_path_between(&graph, &gv2).unwrap().is_empty());
        // backwards is never valid
        assert_eq!(
            gv2.reference_path_between(&graph, &gv1),
            Err(LocatorError::DisconnectedReference { from_node: 5, to_node: 2 })
        );
    }

    #[test]
    fn test_bind_deletion() {
        // 1=CC -> 2=A -> 3=G -> 4=T, with 5=A skipping over 2 and 3
        let mut graph = SequenceGraph::new();
        for (id, seq) in [(1, "CC"), (2, "A"), (3, "G"), (4, "T"), (5, "A")] {
            graph.add_node(id, seq.as_bytes().to_vec()).unwrap();
        }
        for (n1, n2) in [(1, 2), (2, 3), (3, 4), (1, 5), (5, 4)] {
            graph.create_forward_edge(n1, n2);
        }
        graph.add_path(ReferencePath::new("chr1".to_string(), vec![
            PathStep::forward_match(1, 2),
            PathStep::forward_match(2, 1),
            PathStep::forward_match(3, 1),
            PathStep::forward_match(4, 1)
        ])).unwrap();

        let gv = GraphVariant::bind(&graph, record(3, &["AG", "A"], &[]), None, 1).unwrap();
        assert_eq!(gv.graph_allele(0), &[2, 3]);
        assert_eq!(gv.graph_allele(1), &[5]);
        assert_eq!(gv.category(), VariantCategory::Deletion);
        assert_eq!(reference_path_length(&graph, "chr1").unwrap(), 5);
    }

    #[test]
    fn test_allele_mismatch() {
        let graph = two_snp_graph(4);
        let result = GraphVariant::bind(&graph, record(11, &["C", "T"], &[]), None, 1);
        assert_eq!(result.err().unwrap(), LocatorError::AlleleMismatch {
            sequence_name: "chr1".to_string(),
            position: 11,
            node_id: 2,
            graph_sequence: "A".to_string(),
            vcf_reference: "C".to_string()
        });

        // REF that runs further along the path must still match exactly
        let result = GraphVariant::bind(&graph, record(11, &["AGG", "T"], &[]), None, 1);
        assert!(matches!(result, Err(LocatorError::AlleleMismatch { .. })));

        // variant starting in the middle of a node cannot line up with the node sequence
        let result = GraphVariant::bind(&graph, record(5, &["A", "T"], &[]), None, 1);
        assert!(matches!(result, Err(LocatorError::AlleleMismatch { node_id: 1, .. })));
    }

    #[test]
    fn test_allele_not_found() {
        let graph = two_snp_graph(4);
        let result = GraphVariant::bind(&graph, record(11, &["A", "G"], &[]), None, 1);
        assert_eq!(result.err().unwrap(), LocatorError::AlleleNotFound {
            sequence_name: "chr1".to_string(), position: 11, allele_index: 1
        });
    }

    #[test]
    fn test_not_in_graph() {
        let graph = two_snp_graph(4);
        let wrong_chrom = VariantRecord::new("chr2".to_string(), 11, vec![b"A".to_vec(), b"T".to_vec()]);
        assert_eq!(
            GraphVariant::bind(&graph, wrong_chrom, None, 1).err().unwrap(),
            LocatorError::PathNotFound { sequence_name: "chr2".to_string() }
        );

        // path is 10 + 1 + 4 + 1 + 5 = 21 bases
        assert_eq!(reference_path_length(&graph, "chr1").unwrap(), 21);
        assert_eq!(
            GraphVariant::bind(&graph, record(22, &["A", "T"], &[]), None, 1).err().unwrap(),
            LocatorError::VariantNotInGraph { sequence_name: "chr1".to_string(), position: 22 }
        );

        // cursors do not move backwards
        let gv2 = GraphVariant::bind(&graph, record(second_snp_position(4), &["G", "C"], &[]), None, 1).unwrap();
        assert_eq!(
            GraphVariant::bind(&graph, record(11, &["A", "T"], &[]), Some(gv2.cursor().clone()), 1).err().unwrap(),
            LocatorError::VariantNotInGraph { sequence_name: "chr1".to_string(), position: 11 }
        );
    }

    #[test]
    fn test_malformed_mapping() {
        let mut reverse_graph = SequenceGraph::new();
        reverse_graph.add_node(1, b"ACGT".to_vec()).unwrap();
        reverse_graph.add_node(2, b"A".to_vec()).unwrap();
        reverse_graph.add_path(ReferencePath::new("chr1".to_string(), vec![
            PathStep::new(1, true, vec![]),
            PathStep::forward_match(2, 1)
        ])).unwrap();
        let expected = LocatorError::MalformedMapping { path_name: "chr1".to_string(), step_index: 0, node_id: 1 };
        assert_eq!(GraphVariant::bind(&reverse_graph, record(5, &["A", "T"], &[]), None, 1).err().unwrap(), expected);
        assert_eq!(reference_path_length(&reverse_graph, "chr1").err().unwrap(), expected);

        let mut edit_graph = SequenceGraph::new();
        edit_graph.add_node(1, b"ACGT".to_vec()).unwrap();
        edit_graph.add_node(2, b"A".to_vec()).unwrap();
        edit_graph.add_path(ReferencePath::new("chr1".to_string(), vec![
            PathStep::forward_match(1, 4),
            PathStep::new(2, false, vec![Edit { from_length: 1, to_length: 2 }])
        ])).unwrap();
        assert_eq!(
            GraphVariant::bind(&edit_graph, record(5, &["A", "T"], &[]), None, 1).err().unwrap(),
            LocatorError::MalformedMapping { path_name: "chr1".to_string(), step_index: 1, node_id: 2 }
        );

        // an implicit match with no edits is fine
        let mut implicit_graph = SequenceGraph::new();
        implicit_graph.add_node(1, b"ACGT".to_vec()).unwrap();
        implicit_graph.add_path(ReferencePath::new("chr1".to_string(), vec![PathStep::new(1, false, vec![])])).unwrap();
        assert_eq!(reference_path_length(&implicit_graph, "chr1").unwrap(), 4);
    }
}
