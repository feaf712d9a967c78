
use crate::data_types::variant_record::{parse_genotype, GenotypeError, GenotypeToken, VariantRecord};

use log::warn;

#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum LinkageError {
    #[error("sample {sample_name} has ploidy {ploidy1} at {position1} but ploidy {ploidy2} at {position2}")]
    PloidyMismatch { sample_name: String, position1: i64, ploidy1: usize, position2: i64, ploidy2: usize },
    #[error("sample {sample_name} has allele {allele} at {position}, but only {num_alleles} alleles are defined")]
    AlleleIndexOutOfRange { sample_name: String, position: i64, allele: usize, num_alleles: usize },
    #[error("sample {sample_name}: {source}")]
    InvalidGenotype { sample_name: String, source: GenotypeError }
}

/// Counts of chromosome copies carrying each (allele of v1, allele of v2) combination.
/// The backing storage is reused between pairs; it grows to the largest dimensions seen and is zero-filled on every build.
#[derive(Clone, Debug, Default)]
pub struct LinkageMatrix {
    /// counts, indexed `[allele1][allele2]`; may be larger than the current dimensions
    counts: Vec<Vec<u64>>,
    /// alleles in the first variant of the current pair
    num_rows: usize,
    /// alleles in the second variant of the current pair
    num_cols: usize
}

impl LinkageMatrix {
    pub fn new() -> LinkageMatrix {
        Default::default()
    }

    /// Rebuilds the matrix from the genotypes of two variants.
    /// Each sample of `v1` contributes its chromosome copies:
    /// * a copy with concrete alleles on both sides adds 1 to that single cell
    /// * a copy with one wildcard adds 1 to every cell pairing the concrete allele with any allele of the other variant
    /// * a copy with two wildcards adds 1 to every cell
    /// A sample that is missing from `v2` is fully ambiguous and adds 1 to every cell once.
    /// # Arguments
    /// * `v1` - the upstream variant, defines the rows
    /// * `v2` - the downstream variant, defines the columns
    /// # Errors
    /// * `PloidyMismatch` - if a sample has a different number of copies in each variant
    /// * `AlleleIndexOutOfRange` - if a genotype names an allele the variant does not have
    /// * `InvalidGenotype` - if a genotype string cannot be parsed
    pub fn build(&mut self, v1: &VariantRecord, v2: &VariantRecord) -> Result<(), LinkageError> {
        self.reset(v1.num_alleles(), v2.num_alleles());

        for sample_name in v1.sample_names().iter() {
            let gt1: &str = match v1.genotype(sample_name) {
                Some(gt) => gt,
                None => continue
            };
            let gt2: &str = match v2.genotype(sample_name) {
                Some(gt) => gt,
                None => {
                    warn!("Sample {} is present at {} but missing at {}, counting as fully ambiguous", sample_name, v1, v2);
                    self.add_everywhere();
                    continue;
                }
            };

            let tokens1: Vec<GenotypeToken> = parse_checked(sample_name, v1, gt1)?;
            let tokens2: Vec<GenotypeToken> = parse_checked(sample_name, v2, gt2)?;
            if tokens1.len() != tokens2.len() {
                return Err(LinkageError::PloidyMismatch {
                    sample_name: sample_name.clone(),
                    position1: v1.position(),
                    ploidy1: tokens1.len(),
                    position2: v2.position(),
                    ploidy2: tokens2.len()
                });
            }

            for (&t1, &t2) in tokens1.iter().zip(tokens2.iter()) {
                match (t1, t2) {
                    (GenotypeToken::Wildcard, GenotypeToken::Wildcard) => self.add_everywhere(),
                    (GenotypeToken::Allele(a1), GenotypeToken::Wildcard) => {
                        for a2 in 0..self.num_cols {
                            self.counts[a1][a2] += 1;
                        }
                    },
                    (GenotypeToken::Wildcard, GenotypeToken::Allele(a2)) => {
                        for a1 in 0..self.num_rows {
                            self.counts[a1][a2] += 1;
                        }
                    },
                    (GenotypeToken::Allele(a1), GenotypeToken::Allele(a2)) => {
                        self.counts[a1][a2] += 1;
                    }
                };
            }
        }
        Ok(())
    }

    /// Number of alleles in the first variant
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of alleles in the second variant
    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    /// Returns the count for an allele pair.
    /// # Panics
    /// * if either index is outside the current dimensions
    pub fn get(&self, allele1: usize, allele2: usize) -> u64 {
        assert!(allele1 < self.num_rows && allele2 < self.num_cols);
        self.counts[allele1][allele2]
    }

    /// Sum of all cells in the current dimensions
    pub fn total(&self) -> u64 {
        self.counts.iter().take(self.num_rows)
            .map(|row| row.iter().take(self.num_cols).sum::<u64>())
            .sum()
    }

    /// Sets new dimensions, growing the storage if needed, and zeroes the active region
    fn reset(&mut self, num_rows: usize, num_cols: usize) {
        if self.counts.len() < num_rows {
            self.counts.resize(num_rows, vec![]);
        }
        for row in self.counts.iter_mut().take(num_rows) {
            if row.len() < num_cols {
                row.resize(num_cols, 0);
            }
            row.iter_mut().take(num_cols).for_each(|c| *c = 0);
        }
        self.num_rows = num_rows;
        self.num_cols = num_cols;
    }

    fn add_everywhere(&mut self) {
        for row in self.counts.iter_mut().take(self.num_rows) {
            row.iter_mut().take(self.num_cols).for_each(|c| *c += 1);
        }
    }
}

/// Parses a genotype and checks every allele index against the record
fn parse_checked(sample_name: &str, record: &VariantRecord, genotype: &str) -> Result<Vec<GenotypeToken>, LinkageError> {
    let tokens = parse_genotype(genotype).map_err(|source| LinkageError::InvalidGenotype {
        sample_name: sample_name.to_string(),
        source
    })?;
    for token in tokens.iter() {
        if let GenotypeToken::Allele(allele) = *token {
            if allele >= record.num_alleles() {
                return Err(LinkageError::AlleleIndexOutOfRange {
                    sample_name: sample_name.to_string(),
                    position: record.position(),
                    allele,
                    num_alleles: record.num_alleles()
                });
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::record;

    fn build(gt1: &[&str], gt2: &[&str]) -> LinkageMatrix {
        let v1 = record(11, &["A", "T"], gt1);
        let v2 = record(111, &["G", "C"], gt2);
        let mut matrix = LinkageMatrix::new();
        matrix.build(&v1, &v2).unwrap();
        matrix
    }

    fn cells(matrix: &LinkageMatrix) -> Vec<Vec<u64>> {
        (0..matrix.num_rows()).map(|a1| (0..matrix.num_cols()).map(|a2| matrix.get(a1, a2)).collect()).collect()
    }

    #[test]
    fn test_concrete_alleles() {
        let matrix = build(&["0|1", "1|0", "1|1"], &["0|1", "1|0", "1|1"]);
        assert_eq!(cells(&matrix), vec![vec![2, 0], vec![0, 4]]);
        assert_eq!(matrix.total(), 6);

        let matrix = build(&["0|1"], &["1|0"]);
        assert_eq!(cells(&matrix), vec![vec![0, 1], vec![1, 0]]);
    }

    #[test]
    fn test_wildcards() {
        // one wildcard: fixed allele crossed with every allele of the other side
        let matrix = build(&[".|1"], &["0|1"]);
        assert_eq!(cells(&matrix), vec![vec![1, 0], vec![1, 1]]);
        assert_eq!(matrix.total(), 2 + 1);

        let matrix = build(&["1"], &["."]);
        assert_eq!(cells(&matrix), vec![vec![0, 0], vec![1, 1]]);

        // both wildcards: every cell
        let matrix = build(&[".|."], &[".|1"]);
        assert_eq!(matrix.total(), 4 + 2);
        assert_eq!(cells(&matrix), vec![vec![1, 2], vec![1, 2]]);

        // unphased calls carry no linkage
        let matrix = build(&["0/1"], &["0|1"]);
        assert_eq!(matrix.total(), 2 + 2);
    }

    #[test]
    fn test_missing_sample() {
        let v1 = record(11, &["A", "T"], &["0|1", "1|1"]);
        let v2 = record(111, &["G", "C"], &["0|1"]);
        let mut matrix = LinkageMatrix::new();
        matrix.build(&v1, &v2).unwrap();
        // S0 adds two single cells, S1 is missing and adds one to everything
        assert_eq!(cells(&matrix), vec![vec![2, 1], vec![1, 2]]);

        // samples only in v2 are ignored
        let mut matrix = LinkageMatrix::new();
        matrix.build(&v2, &v1).unwrap();
        assert_eq!(matrix.total(), 2);
    }

    #[test]
    fn test_reuse() {
        let mut matrix = LinkageMatrix::new();
        let v1 = record(11, &["A", "T", "C"], &["1|2", "2|2"]);
        let v2 = record(12, &["G", "C", "A"], &["1|2", "2|2"]);
        matrix.build(&v1, &v2).unwrap();
        assert_eq!(matrix.get(2, 2), 3);
        assert_eq!(matrix.total(), 4);

        // shrinking dimensions must not leak earlier counts
        let v3 = record(13, &["A", "T"], &["0|0"]);
        let v4 = record(14, &["G", "C"], &["0|0"]);
        matrix.build(&v3, &v4).unwrap();
        assert_eq!((matrix.num_rows(), matrix.num_cols()), (2, 2));
        assert_eq!(cells(&matrix), vec![vec![2, 0], vec![0, 0]]);

        matrix.build(&v3, &v1).unwrap();
        assert_eq!((matrix.num_rows(), matrix.num_cols()), (2, 3));
        assert_eq!(cells(&matrix), vec![vec![0, 1, 1], vec![0, 0, 0]]);
    }

    #[test]
    fn test_errors() {
        let mut matrix = LinkageMatrix::new();
        let v1 = record(11, &["A", "T"], &["0|1"]);
        let v2 = record(111, &["G", "C"], &["0|1|1"]);
        assert_eq!(matrix.build(&v1, &v2), Err(LinkageError::PloidyMismatch {
            sample_name: "S0".to_string(),
            position1: 11, ploidy1: 2,
            position2: 111, ploidy2: 3
        }));

        let v3 = record(111, &["G", "C"], &["0|2"]);
        assert_eq!(matrix.build(&v1, &v3), Err(LinkageError::AlleleIndexOutOfRange {
            sample_name: "S0".to_string(),
            position: 111, allele: 2, num_alleles: 2
        }));

        let v4 = record(111, &["G", "C"], &["0|X"]);
        assert_eq!(matrix.build(&v1, &v4), Err(LinkageError::InvalidGenotype {
            sample_name: "S0".to_string(),
            source: GenotypeError::InvalidAllele { genotype: "0|X".to_string(), token: "X".to_string() }
        }));
    }
}
