
use crate::data_types::sequence_graph::{NodeSide, SequenceGraph};

use gfa::gfa::{GFA, Link, Path, Segment};
use gfa::gfa::orientation::Orientation;
use log::{debug, info};
use std::io::Write;

/// Writes the graph as GFA 1.0: a header, all segments sorted by ID, all links, then all paths.
/// Each link is written in whichever direction gives the most forward orientations.
/// # Arguments
/// * `graph` - the graph to write
/// * `writer` - the destination, wrap it in a `BufWriter` for anything large
/// # Errors
/// * if any write fails
pub fn write_gfa<W: Write>(graph: &SequenceGraph, writer: &mut W) -> std::io::Result<()> {
    info!("Writing {} nodes, {} edges, and {} paths...", graph.node_count(), graph.edge_count(), graph.paths().len());
    let gfa: GFA<usize, ()> = to_gfa_records(graph);
    write!(writer, "{}", gfa)?;
    writer.flush()?;
    debug!("Finished writing GFA.");
    Ok(())
}

/// Converts the graph into GFA records
pub fn to_gfa_records(graph: &SequenceGraph) -> GFA<usize, ()> {
    let mut gfa: GFA<usize, ()> = GFA::default();
    gfa.header.version = Some(b"1.0".to_vec().into());

    for node_id in graph.node_ids() {
        if let Some(node) = graph.node(node_id) {
            let sequence: Vec<u8> = if node.is_empty() { b"*".to_vec() } else { node.sequence().to_vec() };
            gfa.segments.push(Segment {
                name: node_id as usize,
                sequence: sequence.into(),
                optional: ()
            });
        }
    }

    for (side1, side2) in graph.edges() {
        let (from_side, to_side) = link_direction(side1, side2);
        gfa.links.push(Link {
            from_segment: from_side.node_id() as usize,
            from_orient: if from_side.is_end() { Orientation::Forward } else { Orientation::Backward },
            to_segment: to_side.node_id() as usize,
            to_orient: if to_side.is_start() { Orientation::Forward } else { Orientation::Backward },
            overlap: graph.edge_overlap(side1, side2).to_vec().into(),
            optional: ()
        });
    }

    for path in graph.paths() {
        let steps: Vec<String> = path.steps().iter()
            .map(|s| format!("{}{}", s.node_id(), if s.is_reverse() { '-' } else { '+' }))
            .collect();
        gfa.paths.push(Path::new(
            path.name().as_bytes().to_vec().into(),
            steps.join(",").into_bytes().into(),
            vec![None],
            ()
        ));
    }
    gfa
}

/// Orders a side pair as (leaving, entering) so the link has the most forward orientations
fn link_direction(side1: NodeSide, side2: NodeSide) -> (NodeSide, NodeSide) {
    // leaving through an end is forward, entering through a start is forward
    let count_forward = |leaving: NodeSide, entering: NodeSide| -> usize {
        leaving.is_end() as usize + entering.is_start() as usize
    };
    if count_forward(side2, side1) > count_forward(side1, side2) {
        (side2, side1)
    } else {
        (side1, side2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::sequence_graph::{PathStep, ReferencePath};
    use crate::data_types::variant_record::VariantRecord;
    use crate::scanner::WindowScanner;
    use crate::test_util::{record, second_snp_position, two_snp_graph};
    use std::io::Cursor;

    fn gfa_lines(graph: &SequenceGraph) -> Vec<String> {
        let mut buffer: Vec<u8> = vec![];
        write_gfa(graph, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
            .lines()
            .map(|l| l.trim_end().to_string())
            .collect()
    }

    fn reload(graph: &SequenceGraph) -> SequenceGraph {
        let mut buffer: Vec<u8> = vec![];
        write_gfa(graph, &mut buffer).unwrap();
        SequenceGraph::from_gfa_reader(Cursor::new(buffer)).unwrap()
    }

    fn assert_same_graph(reloaded: &SequenceGraph, graph: &SequenceGraph) {
        assert_eq!(reloaded.node_ids(), graph.node_ids());
        for node_id in graph.node_ids() {
            assert_eq!(reloaded.node(node_id).unwrap().sequence(), graph.node(node_id).unwrap().sequence());
        }
        assert_eq!(reloaded.edges(), graph.edges());
        assert_eq!(reloaded.paths(), graph.paths());
    }

    #[test]
    fn test_write_small() {
        let mut graph = SequenceGraph::new();
        graph.add_node(1, b"ACGT".to_vec()).unwrap();
        graph.add_node(2, b"T".to_vec()).unwrap();
        graph.add_node(3, vec![]).unwrap();
        graph.create_edge(NodeSide::start(2), NodeSide::end(1));
        graph.create_edge(NodeSide::end(2), NodeSide::end(3));
        graph.add_path(ReferencePath::new("chr1".to_string(), vec![
            PathStep::forward_match(1, 4),
            PathStep::forward_match(2, 1)
        ])).unwrap();

        let lines = gfa_lines(&graph);
        assert!(lines[0].starts_with('H'));
        let records: Vec<&str> = lines.iter().skip(1).map(|l| l.as_str()).collect();
        assert_eq!(records[..5], [
            "S\t1\tACGT",
            "S\t2\tT",
            "S\t3\t*",
            "L\t1\t+\t2\t+\t0M",
            "L\t2\t+\t3\t-\t0M"
        ]);
        assert!(records[5].starts_with("P\tchr1\t1+,2+\t"));
        assert_same_graph(&reload(&graph), &graph);
    }

    #[test]
    fn test_overlap_preserved() {
        let gfa = "S\t1\tACG\nS\t2\tCGT\nL\t1\t+\t2\t+\t2M\n";
        let graph = SequenceGraph::from_gfa_reader(gfa.as_bytes()).unwrap();
        assert!(gfa_lines(&graph).contains(&"L\t1\t+\t2\t+\t2M".to_string()));
        let reloaded = reload(&graph);
        assert_eq!(reloaded.edge_overlap(NodeSide::end(1), NodeSide::start(2)), b"2M");
    }

    #[test]
    fn test_round_trip() {
        let mut graph = two_snp_graph(4);
        let new_node = graph.create_node(b"GATC".to_vec());
        graph.create_forward_edge(3, new_node);

        let reloaded = reload(&graph);
        assert_same_graph(&reloaded, &graph);
        assert_eq!(reloaded.edge_count(), 9);
    }

    #[test]
    fn test_round_trip_after_bridge() {
        let mut graph = reload(&two_snp_graph(4));
        let original_nodes = graph.node_count();
        let original_edges = graph.edge_count();
        assert_eq!((original_nodes, original_edges), (7, 8));

        // XOR cohort, every haplotype carries exactly one of the two ALTs
        let gt1: Vec<&str> = ["0|1", "1|0"].iter().cycle().take(10).cloned().collect();
        let gt2: Vec<&str> = ["1|0", "0|1"].iter().cycle().take(10).cloned().collect();
        let records = vec![
            record(11, &["A", "T"], &gt1),
            record(second_snp_position(4), &["G", "C"], &gt2)
        ];
        let mut scanner = WindowScanner::new(Default::default());
        scanner.run(&mut graph, records.into_iter().map(Ok::<VariantRecord, Box<dyn std::error::Error>>)).unwrap();
        let summary = scanner.summary();
        assert_eq!(summary.xor_bridges, 1);

        let reloaded = reload(&graph);
        assert_same_graph(&reloaded, &graph);
        assert_eq!(reloaded.node_count(), original_nodes + summary.nodes_created);
        assert_eq!(reloaded.edge_count(), original_edges - summary.edges_destroyed + summary.edges_created);
        assert_eq!((reloaded.node_count(), reloaded.edge_count()), (8, 9));
    }
}
