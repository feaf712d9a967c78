
use rustc_hash::FxHashMap as HashMap;
use std::fmt;

/// Coarse category of a variant, determined by comparing ALT lengths to the REF length
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, strum_macros::Display)]
pub enum VariantCategory {
    /// every ALT is the same length as REF
    Snp=0,
    /// at least one ALT is longer than REF, none are shorter
    Insertion,
    /// at least one ALT is shorter than REF, none are longer
    Deletion,
    /// ALTs are both longer and shorter than REF
    Indel,
    /// no ALT alleles at all
    RefOnly
}

/// One copy of a parsed genotype
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GenotypeToken {
    /// a `.`, the allele on this copy could be anything
    Wildcard,
    /// a concrete allele index, 0 is REF
    Allele(usize)
}

#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum GenotypeError {
    #[error("genotype {genotype:?} is empty")]
    Empty { genotype: String },
    #[error("genotype {genotype:?} contains invalid allele {token:?}")]
    InvalidAllele { genotype: String, token: String }
}

/// Splits a genotype string like `0|1` into one token per copy.
/// Phased copies are separated by `|`; if any `/` separator is present the genotype is unphased
/// and every copy becomes a wildcard since it tells us nothing about which alleles travel together.
/// # Arguments
/// * `genotype` - the GT string, e.g. `0|1`, `.|2`, `1/1`, or `1`
/// # Errors
/// * if the string is empty
/// * if a copy is neither `.` nor an unsigned integer
pub fn parse_genotype(genotype: &str) -> Result<Vec<GenotypeToken>, GenotypeError> {
    if genotype.is_empty() {
        return Err(GenotypeError::Empty { genotype: genotype.to_string() });
    }

    let is_unphased: bool = genotype.contains('/');
    let mut tokens: Vec<GenotypeToken> = vec![];
    for field in genotype.split(|c: char| c == '|' || c == '/') {
        let token = if field == "." {
            GenotypeToken::Wildcard
        } else {
            match field.parse::<usize>() {
                Ok(allele) => GenotypeToken::Allele(allele),
                Err(_) => return Err(GenotypeError::InvalidAllele { genotype: genotype.to_string(), token: field.to_string() })
            }
        };
        tokens.push(if is_unphased { GenotypeToken::Wildcard } else { token });
    }
    Ok(tokens)
}

/// A single variant call with per-sample genotypes.
/// This is deliberately independent of any VCF library so the core can be driven from memory.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct VariantRecord {
    /// the chromosome / contig, must match a path name in the graph
    sequence_name: String,
    /// 1-based position in VCF coordinates
    position: i64,
    /// all alleles, index 0 is REF
    alleles: Vec<Vec<u8>>,
    /// sample names in file order
    sample_names: Vec<String>,
    /// sample name to GT string; samples without a GT value are absent
    genotypes: HashMap<String, String>
}

impl VariantRecord {
    /// Creates a new record with no samples
    /// # Arguments
    /// * `sequence_name` - the chromosome name
    /// * `position` - the 1-based VCF position
    /// * `alleles` - REF followed by all ALT alleles
    pub fn new(sequence_name: String, position: i64, alleles: Vec<Vec<u8>>) -> VariantRecord {
        VariantRecord {
            sequence_name,
            position,
            alleles,
            sample_names: vec![],
            genotypes: Default::default()
        }
    }

    /// Adds a sample and its genotype string, replacing any earlier genotype for that sample
    pub fn add_sample(&mut self, sample_name: String, genotype: String) {
        if !self.genotypes.contains_key(&sample_name) {
            self.sample_names.push(sample_name.clone());
        }
        self.genotypes.insert(sample_name, genotype);
    }

    /// Builder-style version of `add_sample`
    pub fn with_sample(mut self, sample_name: &str, genotype: &str) -> VariantRecord {
        self.add_sample(sample_name.to_string(), genotype.to_string());
        self
    }

    pub fn sequence_name(&self) -> &str {
        &self.sequence_name
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn alleles(&self) -> &[Vec<u8>] {
        &self.alleles
    }

    pub fn num_alleles(&self) -> usize {
        self.alleles.len()
    }

    pub fn reference_allele(&self) -> &[u8] {
        self.alleles.first().map(|a| a.as_slice()).unwrap_or_default()
    }

    pub fn ref_len(&self) -> usize {
        self.reference_allele().len()
    }

    /// The last VCF position covered by the REF allele
    pub fn end_position(&self) -> i64 {
        self.position + self.ref_len() as i64 - 1
    }

    pub fn sample_names(&self) -> &[String] {
        &self.sample_names
    }

    pub fn genotype(&self, sample_name: &str) -> Option<&str> {
        self.genotypes.get(sample_name).map(|g| g.as_str())
    }

    /// Categorizes this variant based on ALT lengths relative to REF.
    pub fn category(&self) -> VariantCategory {
        let ref_len: usize = self.ref_len();
        let mut is_snp = false;
        let mut is_ins = false;
        let mut is_del = false;
        for allele in self.alleles.iter().skip(1) {
            match allele.len().cmp(&ref_len) {
                std::cmp::Ordering::Equal => is_snp = true,
                std::cmp::Ordering::Greater => is_ins = true,
                std::cmp::Ordering::Less => is_del = true
            };
        }

        if is_ins && is_del {
            VariantCategory::Indel
        } else if is_ins {
            VariantCategory::Insertion
        } else if is_del {
            VariantCategory::Deletion
        } else if is_snp {
            VariantCategory::Snp
        } else {
            VariantCategory::RefOnly
        }
    }
}

impl fmt::Display for VariantRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alleles: Vec<String> = self.alleles.iter()
            .map(|a| String::from_utf8_lossy(a).to_string())
            .collect();
        write!(f, "{}:{} {}", self.sequence_name, self.position, alleles.join(","))
    }
}
