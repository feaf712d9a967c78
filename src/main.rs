
use snpbridge::cli::{Settings, check_settings, get_raw_settings};
use snpbridge::data_types::sequence_graph::SequenceGraph;
use snpbridge::scanner::{ScanError, WindowScanner};
use snpbridge::variant_source::VcfVariantSource;
use snpbridge::writers::bridge_stats::write_bridge_stats;
use snpbridge::writers::gfa_writer::write_gfa;

use log::{LevelFilter, error, info};
use std::io::BufWriter;
use std::time::Instant;

fn main() {
    // get the settings
    let settings: Settings = get_raw_settings();
    let filter_level: LevelFilter = match settings.verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };

    // immediately setup logging first, stdout is reserved for the graph
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();

    // okay, now we can check all the other settings
    let cli_settings: Settings = check_settings(settings);
    let start_time: Instant = Instant::now();

    let mut graph: SequenceGraph = match SequenceGraph::from_gfa(&cli_settings.graph_filename) {
        Ok(g) => g,
        Err(e) => {
            error!("Error while loading graph: {}", e);
            std::process::exit(exitcode::IOERR);
        }
    };

    let variant_source: VcfVariantSource = match VcfVariantSource::from_path(&cli_settings.vcf_filename) {
        Ok(vs) => vs,
        Err(e) => {
            error!("Error while opening VCF: {}", e);
            std::process::exit(exitcode::IOERR);
        }
    };

    // stream every variant pair through the rewriter
    info!("Bridging variants...");
    let mut scanner: WindowScanner = WindowScanner::new(cli_settings.scan_settings());
    match scanner.run(&mut graph, variant_source) {
        Ok(()) => {},
        Err(ScanError::Input(e)) => {
            error!("Error while parsing VCF file: {}", e);
            std::process::exit(exitcode::IOERR);
        },
        Err(e) => {
            error!("Error while bridging variants:");
            error!("  {}", e);
            std::process::exit(exitcode::SOFTWARE);
        }
    };
    scanner.summary().log();

    if let Some(ref filename) = cli_settings.stats_filename {
        // this will save every pair decision to a csv/tsv file
        info!("Saving bridge statistics to {:?}...", filename);
        match write_bridge_stats(filename, scanner.decisions()) {
            Ok(()) => {},
            Err(e) => {
                error!("Error while writing stats file: {}", e);
                std::process::exit(exitcode::IOERR);
            }
        };
    }

    let stdout = std::io::stdout();
    let mut gfa_writer = BufWriter::new(stdout.lock());
    match write_gfa(&graph, &mut gfa_writer) {
        Ok(()) => {},
        Err(e) => {
            error!("Error while writing graph: {}", e);
            std::process::exit(exitcode::IOERR);
        }
    };

    info!("Finished bridging after {} seconds.", start_time.elapsed().as_secs_f64());
}
