
/// Contains the writer for per-pair bridge decisions
pub mod bridge_stats;
/// Contains the GFA writer for the rewired graph
pub mod gfa_writer;
