
use flate2::bufread::MultiGzDecoder;
use gfa::gfa::{GFA, Link, Segment};
use gfa::parser::GFAParser;
use log::{debug, info, trace};
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use simple_error::bail;
use std::fmt;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Stable node identifier, these are never re-used or re-numbered after creation
pub type NodeId = u64;

/// Overlap recorded for any edge that was not loaded with a different one
pub const DEFAULT_OVERLAP: &[u8] = b"0M";

/// One side of a node; edges always connect two sides.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct NodeSide {
    /// the node this side belongs to
    node_id: NodeId,
    /// if true, this is the end (right) side of the node; otherwise it is the start (left) side
    is_end: bool
}

impl NodeSide {
    pub fn start(node_id: NodeId) -> NodeSide {
        NodeSide { node_id, is_end: false }
    }

    pub fn end(node_id: NodeId) -> NodeSide {
        NodeSide { node_id, is_end: true }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn is_end(&self) -> bool {
        self.is_end
    }

    pub fn is_start(&self) -> bool {
        !self.is_end
    }
}

impl fmt::Display for NodeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node_id, if self.is_end { "end" } else { "start" })
    }
}

#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum GraphError {
    #[error("node {node_id} does not exist in the graph")]
    NodeNotFound { node_id: NodeId },
    #[error("node {node_id} already exists in the graph")]
    DuplicateNode { node_id: NodeId },
    #[error("no edge exists between {side1} and {side2}")]
    EdgeNotFound { side1: NodeSide, side2: NodeSide },
    #[error("path {name:?} already exists in the graph")]
    DuplicatePath { name: String },
    #[error("path {name:?} references missing node {node_id}")]
    PathNodeNotFound { name: String, node_id: NodeId }
}

/// A node in the sequence graph, just a container for the sequence
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Node {
    /// the stable ID of this node
    id: NodeId,
    /// the sequence this node spells in the forward orientation
    sequence: Vec<u8>
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

/// An edit transforming graph sequence into path sequence for one step
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Edit {
    /// length of graph sequence consumed
    pub from_length: usize,
    /// length of path sequence produced
    pub to_length: usize
}

impl Edit {
    /// Returns true if this edit does not change the sequence length
    pub fn is_length_preserving(&self) -> bool {
        self.from_length == self.to_length
    }
}

/// A single step of an embedded path.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathStep {
    /// the node visited
    node_id: NodeId,
    /// if true, the node is visited in reverse-complement orientation
    is_reverse: bool,
    /// edits from the node sequence to the path sequence; empty means an implicit full-length match
    edits: Vec<Edit>
}

impl PathStep {
    /// Creates a new step with arbitrary edits
    pub fn new(node_id: NodeId, is_reverse: bool, edits: Vec<Edit>) -> PathStep {
        PathStep {
            node_id,
            is_reverse,
            edits
        }
    }

    /// Creates a forward step with a single full-length match edit
    pub fn forward_match(node_id: NodeId, length: usize) -> PathStep {
        PathStep {
            node_id,
            is_reverse: false,
            edits: vec![Edit { from_length: length, to_length: length }]
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn is_reverse(&self) -> bool {
        self.is_reverse
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    /// Returns true if this step is forward and at most a single length-preserving edit
    pub fn is_simple_match(&self) -> bool {
        !self.is_reverse && self.edits.len() <= 1 && self.edits.iter().all(|e| e.is_length_preserving())
    }
}

/// A named path through the graph, e.g. the reference for one chromosome
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReferencePath {
    name: String,
    steps: Vec<PathStep>
}

impl ReferencePath {
    pub fn new(name: String, steps: Vec<PathStep>) -> ReferencePath {
        ReferencePath {
            name,
            steps
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Arena-style sequence graph where everything is referenced by ID.
/// Edges are stored as side adjacency in both directions, so a lookup from either side finds the edge.
#[derive(Debug, Default)]
pub struct SequenceGraph {
    /// all nodes, keyed by ID
    nodes: HashMap<NodeId, Node>,
    /// the largest ID ever used, new nodes are assigned `max_id + 1`
    max_id: NodeId,
    /// for each side, the list of sides it is connected to
    adjacency: HashMap<NodeSide, Vec<NodeSide>>,
    /// total number of distinct edges
    num_edges: usize,
    /// link overlaps from the input that differ from `DEFAULT_OVERLAP`, keyed by `edge_key`
    overlaps: HashMap<(NodeSide, NodeSide), Vec<u8>>,
    /// paths in the order they were added
    paths: Vec<ReferencePath>,
    /// path name to index in `paths`
    path_lookup: HashMap<String, usize>
}

impl SequenceGraph {
    /// Creates a new empty graph
    pub fn new() -> SequenceGraph {
        Default::default()
    }

    /// Loads a sequence graph from a GFA file
    /// # Arguments
    /// * `gfa_fn` - the GFA filename, gzip is allowed
    /// # Errors
    /// * if the file cannot be opened or read
    /// * if any record in the file is malformed, see `from_gfa_reader`
    pub fn from_gfa(gfa_fn: &Path) -> Result<SequenceGraph, Box<dyn std::error::Error>> {
        info!("Loading {:?}...", gfa_fn);
        let gfa_file: std::fs::File = std::fs::File::open(gfa_fn)?;
        let file_reader = BufReader::new(gfa_file);
        let graph = if gfa_fn.extension().unwrap_or_default() == "gz" {
            debug!("Detected gzip extension, loading graph with MultiGzDecoder...");
            let gz_decoder = MultiGzDecoder::new(file_reader);
            Self::from_gfa_reader(BufReader::new(gz_decoder))?
        } else {
            debug!("Loading graph as plain-text file...");
            Self::from_gfa_reader(file_reader)?
        };
        info!("Finished loading {} nodes, {} edges, and {} paths.", graph.node_count(), graph.edge_count(), graph.paths.len());
        Ok(graph)
    }

    /// Parses GFA 1.0 content into a graph.
    /// Segments must have integer names, these become the node IDs.
    /// Links and paths may appear before the segments they reference.
    /// GFA paths do not carry edits, so every step becomes a single full-length match.
    /// The only malformed mapping a GFA input can produce is a reverse step.
    /// # Arguments
    /// * `reader` - anything buffered that provides the GFA lines
    /// # Errors
    /// * if the GFA parser rejects a record, e.g. a segment name that is not an unsigned integer
    /// * if a segment is duplicated
    /// * if a link or path references an unknown segment
    pub fn from_gfa_reader<R: BufRead>(reader: R) -> Result<SequenceGraph, Box<dyn std::error::Error>> {
        let mut lines: Vec<Vec<u8>> = vec![];
        for line_result in reader.split(b'\n') {
            let mut line: Vec<u8> = line_result?;
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            match line.first() {
                Some(b'H') | Some(b'S') | Some(b'L') | Some(b'P') => lines.push(line),
                // comments, containments, and walks carry nothing we need
                Some(&c) => trace!("Ignoring record type {:?}", c as char),
                None => {}
            };
        }

        let parser: GFAParser<usize, ()> = GFAParser::new();
        let gfa: GFA<usize, ()> = parser.parse_lines(lines.iter())?;
        Self::from_gfa_records(&gfa)
    }

    /// Builds the graph from parsed GFA records: segments first, then links, then paths.
    /// # Errors
    /// * if a segment is duplicated
    /// * if a link or path references an unknown segment
    pub fn from_gfa_records(gfa: &GFA<usize, ()>) -> Result<SequenceGraph, Box<dyn std::error::Error>> {
        let mut graph = SequenceGraph::new();
        for segment in gfa.segments.iter() {
            graph.add_gfa_segment(segment)?;
        }
        for link in gfa.links.iter() {
            graph.add_gfa_link(link)?;
        }
        for path in gfa.paths.iter() {
            graph.add_gfa_path(path)?;
        }
        Ok(graph)
    }

    fn add_gfa_segment(&mut self, segment: &Segment<usize, ()>) -> Result<(), GraphError> {
        let sequence: Vec<u8> = if segment.sequence.as_slice() == b"*" { vec![] } else { segment.sequence.to_vec() };
        self.add_node(segment.name as NodeId, sequence)
    }

    fn add_gfa_link(&mut self, link: &Link<usize, ()>) -> Result<(), Box<dyn std::error::Error>> {
        // forward "from" leaves through the end side, forward "to" enters through the start side
        let from_id = link.from_segment as NodeId;
        let to_id = link.to_segment as NodeId;
        let from_side = if link.from_orient.is_reverse() { NodeSide::start(from_id) } else { NodeSide::end(from_id) };
        let to_side = if link.to_orient.is_reverse() { NodeSide::end(to_id) } else { NodeSide::start(to_id) };
        for side in [from_side, to_side] {
            if !self.nodes.contains_key(&side.node_id()) {
                bail!("Link {} -> {} references unknown segment {}", from_side, to_side, side.node_id());
            }
        }
        self.create_edge(from_side, to_side);
        if link.overlap.as_slice() != DEFAULT_OVERLAP {
            self.overlaps.insert(edge_key(from_side, to_side), link.overlap.to_vec());
        }
        Ok(())
    }

    fn add_gfa_path(&mut self, path: &gfa::gfa::Path<usize, ()>) -> Result<(), Box<dyn std::error::Error>> {
        let name: String = String::from_utf8(path.path_name.to_vec())?;
        let mut steps: Vec<PathStep> = vec![];
        for (segment_name, orient) in path.iter() {
            let node_id = segment_name as NodeId;
            let length: usize = match self.node(node_id) {
                Some(n) => n.len(),
                None => bail!("Path {:?} references unknown segment {}", name, node_id)
            };
            steps.push(PathStep::new(node_id, orient.is_reverse(), vec![Edit { from_length: length, to_length: length }]));
        }
        self.add_path(ReferencePath::new(name, steps))?;
        Ok(())
    }

    /// Adds a node with a specific ID, used while loading.
    /// # Errors
    /// * if the ID is already in use
    pub fn add_node(&mut self, node_id: NodeId, sequence: Vec<u8>) -> Result<(), GraphError> {
        if self.nodes.contains_key(&node_id) {
            return Err(GraphError::DuplicateNode { node_id });
        }
        self.nodes.insert(node_id, Node { id: node_id, sequence });
        self.max_id = self.max_id.max(node_id);
        Ok(())
    }

    /// Creates a new node with a fresh ID and returns that ID
    /// # Arguments
    /// * `sequence` - the sequence for the new node
    pub fn create_node(&mut self, sequence: Vec<u8>) -> NodeId {
        let node_id: NodeId = self.max_id + 1;
        self.nodes.insert(node_id, Node { id: node_id, sequence });
        self.max_id = node_id;
        node_id
    }

    /// Adds an embedded path.
    /// # Errors
    /// * if a path with the same name exists
    /// * if any step visits a node that is not in the graph
    pub fn add_path(&mut self, path: ReferencePath) -> Result<(), GraphError> {
        if self.path_lookup.contains_key(path.name()) {
            return Err(GraphError::DuplicatePath { name: path.name().to_string() });
        }
        if let Some(step) = path.steps().iter().find(|s| !self.nodes.contains_key(&s.node_id())) {
            return Err(GraphError::PathNodeNotFound { name: path.name().to_string(), node_id: step.node_id() });
        }
        self.path_lookup.insert(path.name().to_string(), self.paths.len());
        self.paths.push(path);
        Ok(())
    }

    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    pub fn path(&self, name: &str) -> Option<&ReferencePath> {
        self.path_lookup.get(name).map(|&i| &self.paths[i])
    }

    pub fn paths(&self) -> &[ReferencePath] {
        &self.paths
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.num_edges
    }

    /// All node IDs in ascending order
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns true if an edge connects the two sides
    pub fn has_edge(&self, side1: NodeSide, side2: NodeSide) -> bool {
        self.adjacency.get(&side1)
            .map(|v| v.contains(&side2))
            .unwrap_or(false)
    }

    /// Creates an edge between two sides, returns false if it already existed.
    /// # Panics
    /// * if either node is not in the graph
    pub fn create_edge(&mut self, side1: NodeSide, side2: NodeSide) -> bool {
        assert!(self.nodes.contains_key(&side1.node_id()), "create_edge on missing node {}", side1.node_id());
        assert!(self.nodes.contains_key(&side2.node_id()), "create_edge on missing node {}", side2.node_id());
        if self.has_edge(side1, side2) {
            return false;
        }
        self.adjacency.entry(side1).or_default().push(side2);
        if side1 != side2 {
            self.adjacency.entry(side2).or_default().push(side1);
        }
        self.num_edges += 1;
        true
    }

    /// Creates the usual forward edge leaving the end of `from_id` and entering the start of `to_id`
    pub fn create_forward_edge(&mut self, from_id: NodeId, to_id: NodeId) -> bool {
        self.create_edge(NodeSide::end(from_id), NodeSide::start(to_id))
    }

    /// Removes the edge between two sides.
    /// # Errors
    /// * if no such edge exists
    pub fn destroy_edge(&mut self, side1: NodeSide, side2: NodeSide) -> Result<(), GraphError> {
        if !self.has_edge(side1, side2) {
            return Err(GraphError::EdgeNotFound { side1, side2 });
        }
        remove_side(&mut self.adjacency, side1, side2);
        if side1 != side2 {
            remove_side(&mut self.adjacency, side2, side1);
        }
        self.overlaps.remove(&edge_key(side1, side2));
        self.num_edges -= 1;
        Ok(())
    }

    /// Returns an owned copy of every side connected to `side`, safe to hold across mutation
    pub fn edges_on_side(&self, side: NodeSide) -> Vec<NodeSide> {
        self.adjacency.get(&side).cloned().unwrap_or_default()
    }

    pub fn edges_on_start(&self, node_id: NodeId) -> Vec<NodeSide> {
        self.edges_on_side(NodeSide::start(node_id))
    }

    pub fn edges_on_end(&self, node_id: NodeId) -> Vec<NodeSide> {
        self.edges_on_side(NodeSide::end(node_id))
    }

    /// Every edge exactly once as a sorted (side1, side2) pair with side1 <= side2
    pub fn edges(&self) -> Vec<(NodeSide, NodeSide)> {
        let mut edges: Vec<(NodeSide, NodeSide)> = self.adjacency.iter()
            .flat_map(|(&s1, others)| others.iter().filter(move |&&s2| s1 <= s2).map(move |&s2| (s1, s2)))
            .collect();
        edges.sort_unstable();
        edges
    }

    /// The GFA overlap of an edge, `DEFAULT_OVERLAP` unless the input said otherwise
    pub fn edge_overlap(&self, side1: NodeSide, side2: NodeSide) -> &[u8] {
        self.overlaps.get(&edge_key(side1, side2))
            .map(|o| o.as_slice())
            .unwrap_or(DEFAULT_OVERLAP)
    }

    /// Finds the full siblings of a bubble traversal from `first_id` to `last_id`.
    /// A sibling is any other node whose start side has exactly the same neighbors as the start of `first_id`
    /// and whose end side has exactly the same neighbors as the end of `last_id`.
    /// The result is sorted by ID.
    /// # Arguments
    /// * `first_id` - the first node of the traversal, defines the upstream neighborhood
    /// * `last_id` - the last node of the traversal (same as `first_id` for single-node traversals)
    pub fn full_siblings(&self, first_id: NodeId, last_id: NodeId) -> Vec<NodeId> {
        let in_sides: HashSet<NodeSide> = self.edges_on_start(first_id).into_iter().collect();
        let out_sides: HashSet<NodeSide> = self.edges_on_end(last_id).into_iter().collect();

        // anything attached to our neighborhood on the correct side is a candidate
        let mut candidates: HashSet<NodeId> = Default::default();
        for &side in in_sides.iter() {
            candidates.extend(self.edges_on_side(side).iter().filter(|s| s.is_start()).map(|s| s.node_id()));
        }
        for &side in out_sides.iter() {
            candidates.extend(self.edges_on_side(side).iter().filter(|s| s.is_end()).map(|s| s.node_id()));
        }
        candidates.remove(&first_id);
        candidates.remove(&last_id);

        let mut siblings: Vec<NodeId> = candidates.into_iter()
            .filter(|&c| {
                let c_in: HashSet<NodeSide> = self.edges_on_start(c).into_iter().collect();
                let c_out: HashSet<NodeSide> = self.edges_on_end(c).into_iter().collect();
                c_in == in_sides && c_out == out_sides
            })
            .collect();
        siblings.sort_unstable();
        siblings
    }
}

/// Orders a side pair so both directions of an edge share one key
fn edge_key(side1: NodeSide, side2: NodeSide) -> (NodeSide, NodeSide) {
    if side1 <= side2 { (side1, side2) } else { (side2, side1) }
}

/// Removes a single entry from the adjacency list of `side`, dropping the list when it empties
fn remove_side(adjacency: &mut HashMap<NodeSide, Vec<NodeSide>>, side: NodeSide, other: NodeSide) {
    if let Some(v) = adjacency.get_mut(&side) {
        v.retain(|&s| s != other);
        if v.is_empty() {
            adjacency.remove(&side);
        }
    }
}
