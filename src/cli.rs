
use clap::Parser;
use chrono::Datelike;
use lazy_static::lazy_static;
use log::{error, info};
use std::path::{Path, PathBuf};

use crate::scanner::ScanSettings;

lazy_static! {
    /// Stores the full version string we plan to use.
    /// # Examples
    /// * `0.3.0-6bb9635-dirty` - while on a dirty branch
    /// * `0.3.0-6bb9635` - with a fresh commit
    pub static ref FULL_VERSION: String = format!("{}-{}", env!("CARGO_PKG_VERSION"), option_env!("VERGEN_GIT_DESCRIBE").unwrap_or("unknown"));
}

#[derive(Clone, Parser)]
#[clap(author,
    version = &**FULL_VERSION,
    about,
    after_help = format!("Copyright (C) 2015-{}     snpbridge authors
The input graph must have been constructed from the input VCF.
The rewired graph is written to stdout as GFA.", chrono::Utc::now().year()))]
pub struct Settings {
    /// Input sequence graph in GFA format (gzip allowed), with one path per chromosome
    #[clap(value_name = "GRAPH")]
    #[clap(help_heading = Some("Input/Output"))]
    pub graph_filename: PathBuf,

    /// Input phased variant file in VCF/BCF format, the same one used to construct the graph
    #[clap(value_name = "VCF")]
    #[clap(help_heading = Some("Input/Output"))]
    pub vcf_filename: PathBuf,

    /// Output bridge decisions for every variant pair (optional, csv/tsv)
    #[clap(long = "stats-file")]
    #[clap(value_name = "FILE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub stats_filename: Option<PathBuf>,

    /// Maximum distance between adjacent variants to be bridged
    #[clap(short = 'w')]
    #[clap(long = "window-size")]
    #[clap(value_name = "N")]
    #[clap(default_value = "100")]
    #[clap(help_heading = Some("Bridging"))]
    pub window_size: i64,

    /// VCF coordinate of the first position in each graph path
    #[clap(short = 'o')]
    #[clap(long = "offset")]
    #[clap(value_name = "N")]
    #[clap(default_value = "1")]
    #[clap(help_heading = Some("Bridging"))]
    pub offset: i64,

    /// Enable verbose output
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8
}

impl Settings {
    /// Wrapper function to build the scanner configuration from our CLI settings
    pub fn scan_settings(&self) -> ScanSettings {
        ScanSettings {
            window_size: self.window_size,
            offset: self.offset,
            keep_decisions: self.stats_filename.is_some()
        }
    }
}

/// Checks if a file exists and will otherwise exit
/// # Arguments
/// * `filename` - the file path to check for
/// * `label` - the label to use for error messages
fn check_required_filename(filename: &Path, label: &str) {
    if !filename.exists() {
        error!("{} does not exist: \"{}\"", label, filename.display());
        std::process::exit(exitcode::NOINPUT);
    } else {
        info!("{}: \"{}\"", label, filename.display());
    }
}

pub fn get_raw_settings() -> Settings {
    Settings::parse()
}

/// Do some additional checks here, we may increase these as we go.
/// # Arguments
/// * `settings` - the raw settings, nothing has been checked other than what clap does for us.
pub fn check_settings(settings: Settings) -> Settings {
    // check for any of our required files
    check_required_filename(&settings.graph_filename, "Graph file");
    check_required_filename(&settings.vcf_filename, "Variant file");

    if settings.window_size < 0 {
        error!("--window-size must be >= 0, got {}", settings.window_size);
        std::process::exit(exitcode::USAGE);
    }

    // dump stuff to the logger
    if let Some(stats_fn) = settings.stats_filename.as_ref() {
        info!("Stats file: \"{}\"", stats_fn.display());
    }
    info!("Bridging:");
    info!("\tWindow size: {} bp", settings.window_size);
    info!("\tPath offset: {}", settings.offset);

    //send the settings back
    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let settings = Settings::try_parse_from(["snpbridge", "graph.gfa", "calls.vcf.gz"]).unwrap();
        assert_eq!(settings.graph_filename, PathBuf::from("graph.gfa"));
        assert_eq!(settings.vcf_filename, PathBuf::from("calls.vcf.gz"));
        assert_eq!(settings.window_size, 100);
        assert_eq!(settings.offset, 1);
        assert_eq!(settings.verbosity, 0);
        assert!(settings.stats_filename.is_none());
        assert!(!settings.scan_settings().keep_decisions);
    }

    #[test]
    fn test_parse_options() {
        let settings = Settings::try_parse_from([
            "snpbridge", "-w", "250", "--offset", "1001", "-vv", "--stats-file", "pairs.csv", "graph.gfa", "calls.vcf"
        ]).unwrap();
        let scan_settings = settings.scan_settings();
        assert_eq!(scan_settings.window_size, 250);
        assert_eq!(scan_settings.offset, 1001);
        assert!(scan_settings.keep_decisions);
        assert_eq!(settings.verbosity, 2);
        assert_eq!(settings.stats_filename, Some(PathBuf::from("pairs.csv")));

        assert!(Settings::try_parse_from(["snpbridge", "graph.gfa"]).is_err());
    }
}
