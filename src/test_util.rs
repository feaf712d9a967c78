
use crate::data_types::sequence_graph::{PathStep, ReferencePath, SequenceGraph};
use crate::data_types::variant_record::VariantRecord;

/// Length of the reference prefix before the first SNP in `two_snp_graph`
pub const PREFIX_LEN: usize = 10;

/// Builds the graph `vg construct -f` would make for two SNPs:
/// `1 -> {2=A, 3=T} -> 4 -> {5=G, 6=C} -> 7`, with a `chr1` path through 1, 2, 4, 5, 7.
/// Node 1 is `PREFIX_LEN` bases, node 4 is `gap` bases (0 omits it and joins the bubbles directly), node 7 is 5 bases.
/// With offset 1, the first SNP is at VCF position 11 and the second at `12 + gap`.
pub fn two_snp_graph(gap: usize) -> SequenceGraph {
    let mut graph = SequenceGraph::new();
    let prefix: Vec<u8> = b"ACGTACGTAC".to_vec();
    assert_eq!(prefix.len(), PREFIX_LEN);
    graph.add_node(1, prefix).unwrap();
    graph.add_node(2, b"A".to_vec()).unwrap();
    graph.add_node(3, b"T".to_vec()).unwrap();
    graph.add_node(5, b"G".to_vec()).unwrap();
    graph.add_node(6, b"C".to_vec()).unwrap();
    graph.add_node(7, b"TTGCA".to_vec()).unwrap();
    graph.create_forward_edge(1, 2);
    graph.create_forward_edge(1, 3);
    if gap > 0 {
        let between: Vec<u8> = b"GATC".iter().cycle().take(gap).cloned().collect();
        graph.add_node(4, between).unwrap();
        for n in [2, 3] {
            graph.create_forward_edge(n, 4);
        }
        for n in [5, 6] {
            graph.create_forward_edge(4, n);
        }
    } else {
        for n1 in [2, 3] {
            for n2 in [5, 6] {
                graph.create_forward_edge(n1, n2);
            }
        }
    }
    graph.create_forward_edge(5, 7);
    graph.create_forward_edge(6, 7);

    let mut steps = vec![
        PathStep::forward_match(1, PREFIX_LEN),
        PathStep::forward_match(2, 1)
    ];
    if gap > 0 {
        steps.push(PathStep::forward_match(4, gap));
    }
    steps.push(PathStep::forward_match(5, 1));
    steps.push(PathStep::forward_match(7, 5));
    graph.add_path(ReferencePath::new("chr1".to_string(), steps)).unwrap();
    graph
}

/// VCF position of the second SNP in `two_snp_graph` for offset 1
pub fn second_snp_position(gap: usize) -> i64 {
    (PREFIX_LEN + 2 + gap) as i64
}

/// Builds a record on `chr1` with samples named `S0`, `S1`, ... in genotype order
pub fn record(position: i64, alleles: &[&str], genotypes: &[&str]) -> VariantRecord {
    let mut var = VariantRecord::new(
        "chr1".to_string(), position,
        alleles.iter().map(|a| a.as_bytes().to_vec()).collect()
    );
    for (i, gt) in genotypes.iter().enumerate() {
        var.add_sample(format!("S{i}"), gt.to_string());
    }
    var
}
