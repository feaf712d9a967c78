
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::scanner::PairDecision;

/// Contains all the data written to each row of the bridge stats file
#[derive(Serialize)]
struct BridgeRow {
    /// the chromosome of the pair
    chrom: String,
    /// VCF position of the first variant
    pos1: i64,
    /// VCF position of the second variant
    pos2: i64,
    /// distance from the end of the first REF allele to the second variant
    distance: i64,
    /// the bridged ALT allele of the first variant, if any
    allele1: Option<usize>,
    /// the bridged ALT allele of the second variant, if any
    allele2: Option<usize>,
    /// the phase relation, or BEYOND_WINDOW when the pair was never classified
    relation: String
}

impl From<&PairDecision> for BridgeRow {
    fn from(decision: &PairDecision) -> Self {
        BridgeRow {
            chrom: decision.sequence_name.clone(),
            pos1: decision.position1,
            pos2: decision.position2,
            distance: decision.distance,
            allele1: decision.alleles.map(|(a1, _)| a1),
            allele2: decision.alleles.map(|(_, a2)| a2),
            relation: match decision.relation {
                Some(r) => r.to_string(),
                None => "BEYOND_WINDOW".to_string()
            }
        }
    }
}

/// Writes one row per consecutive variant pair to a CSV/TSV file
/// # Arguments
/// * `filename` - the filename for the output, comma-delimited if it ends with .csv and tab-delimited otherwise
/// * `decisions` - the pair decisions in scan order
pub fn write_bridge_stats(filename: &Path, decisions: &[PairDecision]) -> csv::Result<()> {
    // modify the delimiter to "," if it ends with .csv
    let is_csv: bool = filename.extension().unwrap_or_default() == "csv";
    let delimiter: u8 = if is_csv { b',' } else { b'\t' };
    let csv_writer: csv::Writer<File> = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(filename)?;
    write_rows(csv_writer, decisions)
}

fn write_rows<W: Write>(mut csv_writer: csv::Writer<W>, decisions: &[PairDecision]) -> csv::Result<()> {
    for decision in decisions.iter() {
        csv_writer.serialize(BridgeRow::from(decision))?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase_relation::PhaseRelation;

    #[test]
    fn test_write_rows() {
        let decisions = vec![
            PairDecision {
                sequence_name: "chr1".to_string(),
                position1: 11, position2: 19, distance: 8,
                alleles: Some((1, 1)),
                relation: Some(PhaseRelation::And)
            },
            PairDecision {
                sequence_name: "chr1".to_string(),
                position1: 19, position2: 900, distance: 881,
                alleles: None,
                relation: None
            }
        ];

        let mut buffer: Vec<u8> = vec![];
        {
            let csv_writer = csv::WriterBuilder::new().delimiter(b'\t').from_writer(&mut buffer);
            write_rows(csv_writer, &decisions).unwrap();
        }
        let expected = "chrom\tpos1\tpos2\tdistance\tallele1\tallele2\trelation\n\
            chr1\t11\t19\t8\t1\t1\tGT_AND\n\
            chr1\t19\t900\t881\t\t\tBEYOND_WINDOW\n";
        assert_eq!(String::from_utf8(buffer).unwrap(), expected);
    }
}
