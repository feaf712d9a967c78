
use crate::bridge::{BridgeBuilder, BridgeError};
use crate::data_types::sequence_graph::SequenceGraph;
use crate::data_types::variant_record::VariantRecord;
use crate::graph_variant::{reference_path_length, GraphVariant, LocatorError};
use crate::linkage::{LinkageError, LinkageMatrix};
use crate::phase_relation::{first_resolved, PhaseRelation};

use log::{debug, info, trace, warn};

#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error("error while reading variants: {0}")]
    Input(Box<dyn std::error::Error>),
    #[error(transparent)]
    Locator(#[from] LocatorError),
    #[error(transparent)]
    Linkage(#[from] LinkageError),
    #[error(transparent)]
    Bridge(#[from] BridgeError)
}

/// User controls for the scan
#[derive(Clone, Copy, Debug)]
pub struct ScanSettings {
    /// maximum distance from the end of one REF allele to the start of the next for a pair to be bridged
    pub window_size: i64,
    /// VCF coordinate of the first base of each graph path
    pub offset: i64,
    /// if false, pair decisions are counted in the summary but not retained
    pub keep_decisions: bool
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            window_size: 100,
            offset: 1,
            keep_decisions: true
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, strum_macros::Display)]
pub enum ScanState {
    /// looking for the first usable variant of a chromosome
    SeekingFirst,
    /// a current variant is bound and candidates are being paired with it
    Scanning,
    /// the stream is exhausted, no further changes are made
    Done
}

/// Counters for everything the scanner did
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ScanSummary {
    pub records_read: usize,
    /// records before the offset of their chromosome
    pub before_offset: usize,
    pub variants_bound: usize,
    pub overlap_skipped: usize,
    /// records past the end of the graph path
    pub beyond_graph: usize,
    /// consecutive pairs too far apart to bridge
    pub beyond_window: usize,
    /// consecutive pairs whose linkage was classified
    pub pairs_examined: usize,
    /// examined pairs where every allele pair was `Other`
    pub unresolved: usize,
    pub and_bridges: usize,
    pub xor_bridges: usize,
    pub from_ref_bridges: usize,
    pub to_ref_bridges: usize,
    pub nodes_created: usize,
    pub edges_destroyed: usize,
    pub edges_created: usize
}

impl ScanSummary {
    /// Total number of rewrites performed
    pub fn bridges(&self) -> usize {
        self.and_bridges + self.xor_bridges + self.from_ref_bridges + self.to_ref_bridges
    }

    pub fn log(&self) {
        info!("Records read: {}", self.records_read);
        info!("Variants bound to graph: {}", self.variants_bound);
        info!("Skipped records: {} before offset, {} overlapping, {} beyond graph", self.before_offset, self.overlap_skipped, self.beyond_graph);
        info!("Pairs beyond window: {}", self.beyond_window);
        info!("Pairs examined: {} ({} unresolved)", self.pairs_examined, self.unresolved);
        info!("Bridges: {} AND, {} XOR, {} FROM_REF, {} TO_REF", self.and_bridges, self.xor_bridges, self.from_ref_bridges, self.to_ref_bridges);
        info!("Graph changes: {} nodes created, {} edges destroyed, {} edges created", self.nodes_created, self.edges_destroyed, self.edges_created);
    }
}

/// The outcome for one consecutive pair of bound variants
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PairDecision {
    pub sequence_name: String,
    pub position1: i64,
    pub position2: i64,
    /// distance from the last REF base of the first variant to the second variant
    pub distance: i64,
    /// the ALT pair that was bridged, if any
    pub alleles: Option<(usize, usize)>,
    /// None if the pair was outside the window and never classified
    pub relation: Option<PhaseRelation>
}

/// The bound variant that candidates are paired against, along with its chromosome's bookkeeping
struct Pairing {
    current: GraphVariant,
    /// the last VCF position covered by the current variant or any overlapping record skipped after it
    covered_through: i64,
    /// first VCF position past the end of the graph path
    path_end: i64,
    /// set once a record runs off the end of the graph path
    beyond_graph: bool
}

/// Streams variants in order, pairing each with the previous one and rewiring the graph when phasing allows
pub struct WindowScanner {
    settings: ScanSettings,
    state: ScanState,
    linkage: LinkageMatrix,
    builder: BridgeBuilder,
    summary: ScanSummary,
    decisions: Vec<PairDecision>
}

impl WindowScanner {
    pub fn new(settings: ScanSettings) -> WindowScanner {
        WindowScanner {
            settings,
            state: ScanState::SeekingFirst,
            linkage: LinkageMatrix::new(),
            builder: BridgeBuilder::new(),
            summary: Default::default(),
            decisions: vec![]
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn summary(&self) -> &ScanSummary {
        &self.summary
    }

    /// Every pair decision in scan order, empty unless `keep_decisions` is set
    pub fn decisions(&self) -> &[PairDecision] {
        &self.decisions
    }

    /// Runs the scan over a stream of variants sorted by position within each chromosome.
    /// Each chromosome starts its own pairing; records behind the offset, overlapping the previous variant,
    /// or beyond the end of the graph path are skipped.
    /// # Arguments
    /// * `graph` - the graph to rewire in place
    /// * `records` - the variant stream
    /// # Errors
    /// * `Input` if the stream produces an error
    /// * `Locator` if a variant cannot be bound to the graph
    /// * `Linkage` if genotypes are inconsistent
    /// * `Bridge` if a rewrite hits an internal inconsistency
    pub fn run<I>(&mut self, graph: &mut SequenceGraph, records: I) -> Result<(), ScanError>
    where
        I: IntoIterator<Item = Result<VariantRecord, Box<dyn std::error::Error>>>
    {
        if self.state == ScanState::Done {
            return Ok(());
        }

        let mut pairing: Option<Pairing> = None;
        for result in records.into_iter() {
            let record: VariantRecord = result.map_err(ScanError::Input)?;
            self.summary.records_read += 1;

            if let Some(p) = pairing.as_ref() {
                if p.current.record().sequence_name() != record.sequence_name() {
                    debug!("Switching from {} to {}", p.current.record().sequence_name(), record.sequence_name());
                    pairing = None;
                    self.state = ScanState::SeekingFirst;
                }
            }

            match pairing.as_mut() {
                None => {
                    if record.position() < self.settings.offset {
                        trace!("Skipping {} before offset {}", record, self.settings.offset);
                        self.summary.before_offset += 1;
                        continue;
                    }
                    pairing = Some(self.start_pairing(graph, record)?);
                    self.state = ScanState::Scanning;
                },
                Some(p) => {
                    self.advance(graph, p, record)?;
                }
            };
        }

        if self.summary.variants_bound == 0 {
            warn!("No variants found in VCF");
        }
        self.summary.nodes_created = self.builder.nodes_created();
        self.summary.edges_destroyed = self.builder.edges_destroyed();
        self.summary.edges_created = self.builder.edges_created();
        self.state = ScanState::Done;
        Ok(())
    }

    /// Binds the first variant of a chromosome
    fn start_pairing(&mut self, graph: &SequenceGraph, record: VariantRecord) -> Result<Pairing, ScanError> {
        let path_length: usize = reference_path_length(graph, record.sequence_name())?;
        let current = GraphVariant::bind(graph, record, None, self.settings.offset)?;
        debug!("First variant: {}", current);
        self.summary.variants_bound += 1;
        Ok(Pairing {
            covered_through: current.reference_end(),
            path_end: self.settings.offset + path_length as i64,
            beyond_graph: false,
            current
        })
    }

    /// Handles one candidate record against the current variant
    fn advance(&mut self, graph: &mut SequenceGraph, pairing: &mut Pairing, record: VariantRecord) -> Result<(), ScanError> {
        if pairing.beyond_graph {
            trace!("Skipping {} beyond end of graph", record);
            self.summary.beyond_graph += 1;
            return Ok(());
        }

        if record.position() <= pairing.covered_through {
            warn!("Skipping variant at {} because it overlaps previous variant at position {}", record, pairing.current.position());
            pairing.covered_through = pairing.covered_through.max(record.end_position());
            self.summary.overlap_skipped += 1;
            return Ok(());
        }

        if record.position() >= pairing.path_end {
            warn!("Variant at {} is beyond the end of the graph path, skipping the rest of {}", record, record.sequence_name());
            pairing.beyond_graph = true;
            self.summary.beyond_graph += 1;
            return Ok(());
        }

        let next = GraphVariant::bind(graph, record, Some(pairing.current.cursor().clone()), self.settings.offset)?;
        self.summary.variants_bound += 1;
        let current: &GraphVariant = &pairing.current;
        let distance: i64 = next.position() - current.reference_end();
        let mut decision = PairDecision {
            sequence_name: next.record().sequence_name().to_string(),
            position1: current.position(),
            position2: next.position(),
            distance,
            alleles: None,
            relation: None
        };

        if distance > self.settings.window_size {
            debug!("Pair {} -> {} is {} apart, beyond window", current.position(), next.position(), distance);
            self.summary.beyond_window += 1;
        } else {
            trace!("v1 {}", current);
            trace!("v2 {}", next);
            self.linkage.build(current.record(), next.record())?;
            self.summary.pairs_examined += 1;
            match first_resolved(&self.linkage, current.num_alleles(), next.num_alleles()) {
                Some((allele1, allele2, relation)) => {
                    self.builder.rewrite(graph, current, allele1, &next, allele2, relation)?;
                    match relation {
                        PhaseRelation::And => self.summary.and_bridges += 1,
                        PhaseRelation::Xor => self.summary.xor_bridges += 1,
                        PhaseRelation::FromRef => self.summary.from_ref_bridges += 1,
                        PhaseRelation::ToRef => self.summary.to_ref_bridges += 1,
                        PhaseRelation::Other => {}
                    };
                    decision.alleles = Some((allele1, allele2));
                    decision.relation = Some(relation);
                },
                None => {
                    debug!("Pair {} -> {} is unresolved", current.position(), next.position());
                    self.summary.unresolved += 1;
                    decision.relation = Some(PhaseRelation::Other);
                }
            };
        }
        if self.settings.keep_decisions {
            self.decisions.push(decision);
        }

        pairing.covered_through = next.reference_end();
        pairing.current = next;
        Ok(())
    }
}
