
/// Rewires the graph between two located variants according to their phase relation
pub mod bridge;
/// CLI functionality and checks
pub mod cli;
/// Contains the graph and variant data types shared by every stage
pub mod data_types;
/// Binds VCF records to their reference and alternate nodes in the graph
pub mod graph_variant;
/// Counts how alleles of two variants travel together across sample haplotypes
pub mod linkage;
/// Classifies allele pairs from a linkage matrix
pub mod phase_relation;
/// The driver that walks the variant stream and pairs up neighbors within a window
pub mod scanner;
/// Streams VCF/BCF records into our own variant representation
pub mod variant_source;
/// Contains all the various output writer functionality
pub mod writers;

/// Shared graph and record builders for unit tests
#[cfg(test)]
pub mod test_util;
