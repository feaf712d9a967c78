
use crate::data_types::variant_record::VariantRecord;

use log::info;
use rust_htslib::bcf;
use rust_htslib::bcf::Read;
use rust_htslib::bcf::record::GenotypeAllele;
use simple_error::bail;
use std::path::Path;

/// Streams records from a VCF/BCF file in file order, no index is required.
pub struct VcfVariantSource {
    reader: bcf::Reader,
    /// sample names from the header, in column order
    sample_names: Vec<String>
}

impl VcfVariantSource {
    /// Opens a VCF/BCF file for streaming
    /// # Arguments
    /// * `vcf_fn` - the file to open, may be plain text, bgzipped, or BCF
    /// # Errors
    /// * if the file cannot be opened by htslib
    /// * if a sample name is not valid UTF-8
    pub fn from_path(vcf_fn: &Path) -> Result<VcfVariantSource, Box<dyn std::error::Error>> {
        info!("Opening {:?}...", vcf_fn);
        let reader: bcf::Reader = bcf::Reader::from_path(vcf_fn)?;
        let mut sample_names: Vec<String> = vec![];
        for &sample in reader.header().samples().iter() {
            sample_names.push(std::str::from_utf8(sample)?.to_string());
        }
        info!("Found {} samples in {:?}", sample_names.len(), vcf_fn);
        Ok(VcfVariantSource {
            reader,
            sample_names
        })
    }

    pub fn sample_names(&self) -> &[String] {
        &self.sample_names
    }

    /// Copies an htslib record into our own representation
    fn convert(&self, record: &bcf::Record) -> Result<VariantRecord, Box<dyn std::error::Error>> {
        let position: i64 = record.pos() + 1;
        let rid: u32 = match record.rid() {
            Some(r) => r,
            None => bail!("VCF record at position {} has no chromosome", position)
        };
        let sequence_name: String = std::str::from_utf8(self.reader.header().rid2name(rid)?)?.to_string();
        let alleles: Vec<Vec<u8>> = record.alleles().iter().map(|a| a.to_vec()).collect();
        let mut variant = VariantRecord::new(sequence_name, position, alleles);

        if !self.sample_names.is_empty() {
            let genotypes = record.genotypes()?;
            for (sample_index, sample_name) in self.sample_names.iter().enumerate() {
                let genotype = genotypes.get(sample_index);
                if genotype.is_empty() {
                    // nothing was called for this sample
                    continue;
                }
                variant.add_sample(sample_name.clone(), format_genotype(&genotype));
            }
        }
        Ok(variant)
    }
}

impl Iterator for VcfVariantSource {
    type Item = Result<VariantRecord, Box<dyn std::error::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut record: bcf::Record = self.reader.empty_record();
        match self.reader.read(&mut record) {
            None => None,
            Some(Err(e)) => Some(Err(Box::new(e))),
            Some(Ok(())) => Some(self.convert(&record))
        }
    }
}

/// Writes a GT field the way it appears in the VCF, e.g. `0|1`, `./1`, or `2`.
/// In htslib the phase flag lives on the allele after each separator.
fn format_genotype(alleles: &[GenotypeAllele]) -> String {
    let mut genotype: String = String::new();
    for (i, allele) in alleles.iter().enumerate() {
        if i > 0 {
            let separator: char = match allele {
                GenotypeAllele::Phased(_) | GenotypeAllele::PhasedMissing => '|',
                GenotypeAllele::Unphased(_) | GenotypeAllele::UnphasedMissing => '/'
            };
            genotype.push(separator);
        }
        match allele {
            GenotypeAllele::Phased(index) | GenotypeAllele::Unphased(index) => genotype.push_str(&index.to_string()),
            GenotypeAllele::PhasedMissing | GenotypeAllele::UnphasedMissing => genotype.push('.')
        };
    }
    genotype
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_genotype() {
        use GenotypeAllele::*;
        assert_eq!(format_genotype(&[Unphased(0), Phased(1)]), "0|1");
        assert_eq!(format_genotype(&[Unphased(0), Unphased(1)]), "0/1");
        assert_eq!(format_genotype(&[UnphasedMissing, Phased(2)]), ".|2");
        assert_eq!(format_genotype(&[Unphased(1)]), "1");
        assert_eq!(format_genotype(&[UnphasedMissing]), ".");
    }

    #[test]
    fn test_read_vcf() {
        let source = VcfVariantSource::from_path(&PathBuf::from("./test_data/two_snps_mixed.vcf")).unwrap();
        assert_eq!(source.sample_names(), &["HG001", "HG002", "HG003", "HG004"]);
        let records: Vec<VariantRecord> = source.map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 3);

        let v1 = &records[0];
        assert_eq!(v1.sequence_name(), "chr1");
        assert_eq!(v1.position(), 11);
        assert_eq!(v1.alleles(), &[b"A".to_vec(), b"T".to_vec()]);
        assert_eq!(v1.genotype("HG001"), Some("0|1"));
        assert_eq!(v1.genotype("HG002"), Some("1|1"));
        assert_eq!(v1.genotype("HG003"), Some("0/1"));
        assert_eq!(v1.genotype("HG004"), Some("."));

        let v2 = &records[1];
        assert_eq!(v2.position(), 12);
        assert_eq!(v2.ref_len(), 4);
        assert_eq!(v2.genotype("HG003"), Some("1"));

        assert_eq!(records[2].genotype("HG004"), Some(".|1"));
    }

    #[test]
    fn test_bridge_files() {
        use crate::data_types::sequence_graph::{NodeSide, SequenceGraph};
        use crate::scanner::WindowScanner;

        // (vcf, ALT1 -> ALT2, REF1 -> ALT2)
        let expected = [
            ("./test_data/two_snps_and.vcf", true, false),
            ("./test_data/two_snps_xor.vcf", false, true)
        ];
        for &(vcf_fn, alt_alt, ref_alt) in expected.iter() {
            let mut graph = SequenceGraph::from_gfa(&PathBuf::from("./test_data/two_snps.gfa")).unwrap();
            let source = VcfVariantSource::from_path(&PathBuf::from(vcf_fn)).unwrap();
            let mut scanner = WindowScanner::new(Default::default());
            scanner.run(&mut graph, source).unwrap();
            assert_eq!(scanner.summary().bridges(), 1);

            // node 8 is the copy of GATTACA that now sits behind the ALT of the first SNP
            assert_eq!(graph.node(8).unwrap().sequence(), b"GATTACA");
            assert!(graph.has_edge(NodeSide::end(3), NodeSide::start(8)));
            assert!(!graph.has_edge(NodeSide::end(3), NodeSide::start(4)));
            assert_eq!(graph.has_edge(NodeSide::end(8), NodeSide::start(6)), alt_alt);
            assert_eq!(graph.has_edge(NodeSide::end(4), NodeSide::start(6)), ref_alt);
        }
    }
}
