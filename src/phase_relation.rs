
use crate::linkage::LinkageMatrix;

use log::{trace, warn};

/// How an ALT allele of one variant travels with an ALT allele of the next variant
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, strum_macros::Display)]
pub enum PhaseRelation {
    /// the two ALTs always occur together and never with the other variant's REF
    #[strum(serialize = "GT_AND")]
    And,
    /// the two ALTs never occur together, each only pairs with the other variant's REF
    #[strum(serialize = "GT_XOR")]
    Xor,
    /// ALT2 pairs with ALT1 and with REF1, but ALT1 never pairs with REF2
    #[strum(serialize = "GT_FROM_REF")]
    FromRef,
    /// ALT1 pairs with ALT2 and with REF2, but REF1 never pairs with ALT2
    #[strum(serialize = "GT_TO_REF")]
    ToRef,
    /// not cleanly resolvable, the graph is left alone
    #[strum(serialize = "GT_OTHER")]
    Other
}

/// Classifies one (ALT of v1, ALT of v2) pair from a linkage matrix.
/// Evidence of either ALT pairing with a third allele makes the pair `Other`.
/// # Arguments
/// * `matrix` - linkage counts for the variant pair
/// * `num_alleles1` - alleles in v1, including REF
/// * `num_alleles2` - alleles in v2, including REF
/// * `allele1` - the ALT allele of v1, must be >= 1
/// * `allele2` - the ALT allele of v2, must be >= 1
/// # Panics
/// * if either allele is REF or out of range
pub fn classify(matrix: &LinkageMatrix, num_alleles1: usize, num_alleles2: usize, allele1: usize, allele2: usize) -> PhaseRelation {
    assert!(allele1 >= 1 && allele1 < num_alleles1);
    assert!(allele2 >= 1 && allele2 < num_alleles2);

    let to_alt: bool = matrix.get(allele1, allele2) > 0;
    let to_ref: bool = matrix.get(allele1, 0) > 0;
    let from_ref: bool = matrix.get(0, allele2) > 0;
    let to_other_alt: bool = (1..num_alleles2).any(|k| k != allele2 && matrix.get(allele1, k) > 0);
    let from_other_alt: bool = (1..num_alleles1).any(|k| k != allele1 && matrix.get(k, allele2) > 0);
    trace!("classify({allele1}, {allele2}): to_alt={to_alt} to_ref={to_ref} from_ref={from_ref} to_other_alt={to_other_alt} from_other_alt={from_other_alt}");

    if to_other_alt || from_other_alt {
        return PhaseRelation::Other;
    }

    if to_alt {
        match (to_ref, from_ref) {
            (false, false) => PhaseRelation::And,
            (false, true) => PhaseRelation::FromRef,
            (true, false) => PhaseRelation::ToRef,
            (true, true) => {
                warn!("Alleles {allele1} and {allele2} pair with each other and with both references, leaving unresolved");
                PhaseRelation::Other
            }
        }
    } else {
        if !to_ref || !from_ref {
            warn!("Alleles {allele1} and {allele2} were never observed together and at least one has no observations, treating as exclusive");
        }
        PhaseRelation::Xor
    }
}

/// Scans every ALT/ALT pair, `allele1` ascending and then `allele2` ascending, and returns the first that is not `Other`.
/// Relations are assumed to be exclusive across allele pairs, so only one pair is ever rewired per variant pair.
pub fn first_resolved(matrix: &LinkageMatrix, num_alleles1: usize, num_alleles2: usize) -> Option<(usize, usize, PhaseRelation)> {
    for allele1 in 1..num_alleles1 {
        for allele2 in 1..num_alleles2 {
            let relation = classify(matrix, num_alleles1, num_alleles2, allele1, allele2);
            if relation != PhaseRelation::Other {
                return Some((allele1, allele2, relation));
            }
        }
    }
    None
}
