
/// Arena-backed sequence graph with embedded reference paths, plus GFA loading
pub mod sequence_graph;
/// Contains the VariantRecord type, genotype parsing, and variant categories
pub mod variant_record;
