use serde::Serialize;

use crate::data_types::genotype::{DiploidGenotype, SiteAllele};

#[derive(thiserror::Error, Debug)]
pub enum LikelihoodError {
    #[error("sample name is empty")]
    EmptySample,
    #[error("allele{index} is empty (length = 0)")]
    EmptyAllele { index: usize },
    #[error("{sample}: log10 value for {genotype:?} is NaN")]
    NanValue { sample: String, genotype: DiploidGenotype },
    #[error("{sample}: log10 value for {genotype:?} must be <= 0.0, found {value}")]
    PositiveValue { sample: String, genotype: DiploidGenotype, value: f64 }
}

/// Per-sample genotype likelihoods at a single biallelic site.
/// All values are log10-scaled and stored in AA/AB/BB order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BiallelicGenotypeLikelihoods {
    /// The sample identifier, unique within a site
    sample: String,
    /// Sequence of the A (reference-like) allele
    allele_a: Vec<u8>,
    /// Sequence of the B (alternate) allele
    allele_b: Vec<u8>,
    /// Raw log10 likelihoods, P(data | genotype)
    log10_likelihoods: [f64; 3],
    /// Likelihoods with a genotype prior applied; identical to the likelihoods unless provided
    log10_posteriors: [f64; 3]
}

impl BiallelicGenotypeLikelihoods {
    /// Creates a new record without any genotype prior, so the posteriors mirror the likelihoods.
    /// # Arguments
    /// * `sample` - the sample identifier
    /// * `allele_a` - the A allele sequence
    /// * `allele_b` - the B allele sequence
    /// * `log10_likelihoods` - log10 likelihoods in AA/AB/BB order
    /// # Errors
    /// * if the sample or either allele is empty
    /// * if any value is NaN or positive
    pub fn new(sample: String, allele_a: Vec<u8>, allele_b: Vec<u8>, log10_likelihoods: [f64; 3]) -> Result<Self, LikelihoodError> {
        Self::with_posteriors(sample, allele_a, allele_b, log10_likelihoods, log10_likelihoods)
    }

    /// Creates a new record where the genotype-prior-adjusted values are known.
    /// The posteriors are what the allele frequency search consumes.
    /// # Errors
    /// * if the sample or either allele is empty
    /// * if any value is NaN or positive
    pub fn with_posteriors(
        sample: String, allele_a: Vec<u8>, allele_b: Vec<u8>,
        log10_likelihoods: [f64; 3], log10_posteriors: [f64; 3]
    ) -> Result<Self, LikelihoodError> {
        if sample.is_empty() {
            return Err(LikelihoodError::EmptySample);
        }
        if allele_a.is_empty() {
            return Err(LikelihoodError::EmptyAllele { index: 0 });
        }
        if allele_b.is_empty() {
            return Err(LikelihoodError::EmptyAllele { index: 1 });
        }

        for values in [&log10_likelihoods, &log10_posteriors] {
            for (genotype, &value) in DiploidGenotype::ALL.iter().zip(values.iter()) {
                if value.is_nan() {
                    return Err(LikelihoodError::NanValue { sample, genotype: *genotype });
                }
                if value > 0.0 {
                    return Err(LikelihoodError::PositiveValue { sample, genotype: *genotype, value });
                }
            }
        }

        Ok(Self {
            sample,
            allele_a,
            allele_b,
            log10_likelihoods,
            log10_posteriors
        })
    }

    /// Returns the sequence for the given allele
    pub fn allele(&self, allele: SiteAllele) -> &[u8] {
        match allele {
            SiteAllele::A => &self.allele_a,
            SiteAllele::B => &self.allele_b,
        }
    }

    /// Converts a genotype into the concrete pair of allele sequences it represents
    pub fn genotype_alleles(&self, genotype: DiploidGenotype) -> (Vec<u8>, Vec<u8>) {
        let (a1, a2) = genotype.decompose_alleles();
        (self.allele(a1).to_vec(), self.allele(a2).to_vec())
    }

    // getters
    pub fn sample(&self) -> &str {
        &self.sample
    }

    pub fn allele_a(&self) -> &[u8] {
        &self.allele_a
    }

    pub fn allele_b(&self) -> &[u8] {
        &self.allele_b
    }

    pub fn log10_likelihoods(&self) -> &[f64; 3] {
        &self.log10_likelihoods
    }

    pub fn log10_posteriors(&self) -> &[f64; 3] {
        &self.log10_posteriors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_record() {
        let gl = BiallelicGenotypeLikelihoods::new(
            "sample_1".to_string(), b"A".to_vec(), b"C".to_vec(), [-0.1, -2.0, -5.0]
        ).unwrap();
        assert_eq!(gl.sample(), "sample_1");
        assert_eq!(gl.log10_posteriors(), gl.log10_likelihoods());
        assert_eq!(gl.log10_likelihoods()[1], -2.0);
        assert_eq!(gl.genotype_alleles(DiploidGenotype::HomozygousA), (b"A".to_vec(), b"A".to_vec()));
        assert_eq!(gl.genotype_alleles(DiploidGenotype::Heterozygous), (b"A".to_vec(), b"C".to_vec()));
        assert_eq!(gl.genotype_alleles(DiploidGenotype::HomozygousB), (b"C".to_vec(), b"C".to_vec()));
    }

    #[test]
    fn test_indel_alleles() {
        let gl = BiallelicGenotypeLikelihoods::new(
            "s".to_string(), b"AGT".to_vec(), b"A".to_vec(), [-3.0, -0.5, -4.0]
        ).unwrap();
        assert_eq!(gl.allele(SiteAllele::A), b"AGT");
        assert_eq!(gl.allele(SiteAllele::B), b"A");
    }

    #[test]
    fn test_invalid_records() {
        assert!(matches!(
            BiallelicGenotypeLikelihoods::new(String::new(), b"A".to_vec(), b"C".to_vec(), [0.0; 3]),
            Err(LikelihoodError::EmptySample)
        ));
        assert!(matches!(
            BiallelicGenotypeLikelihoods::new("s".to_string(), b"A".to_vec(), vec![], [0.0; 3]),
            Err(LikelihoodError::EmptyAllele { index: 1 })
        ));
        assert!(matches!(
            BiallelicGenotypeLikelihoods::new("s".to_string(), b"A".to_vec(), b"C".to_vec(), [0.0, f64::NAN, -1.0]),
            Err(LikelihoodError::NanValue { genotype: DiploidGenotype::Heterozygous, .. })
        ));
        assert!(matches!(
            BiallelicGenotypeLikelihoods::new("s".to_string(), b"A".to_vec(), b"C".to_vec(), [0.0, -1.0, 0.5]),
            Err(LikelihoodError::PositiveValue { genotype: DiploidGenotype::HomozygousB, .. })
        ));
    }

    #[test]
    fn test_with_posteriors() {
        let gl = BiallelicGenotypeLikelihoods::with_posteriors(
            "s".to_string(), b"A".to_vec(), b"C".to_vec(), [-1.0, -0.5, -3.0], [-0.2, -0.9, -4.0]
        ).unwrap();
        assert_eq!(gl.log10_likelihoods(), &[-1.0, -0.5, -3.0]);
        assert_eq!(gl.log10_posteriors(), &[-0.2, -0.9, -4.0]);

        // the posteriors get the same validation
        assert!(matches!(
            BiallelicGenotypeLikelihoods::with_posteriors(
                "s".to_string(), b"A".to_vec(), b"C".to_vec(), [-1.0, -0.5, -3.0], [-0.2, 0.1, -4.0]
            ),
            Err(LikelihoodError::PositiveValue { genotype: DiploidGenotype::Heterozygous, .. })
        ));
    }

    #[test]
    fn test_negative_infinity_allowed() {
        let gl = BiallelicGenotypeLikelihoods::new(
            "s".to_string(), b"A".to_vec(), b"C".to_vec(), [0.0, f64::NEG_INFINITY, f64::NEG_INFINITY]
        ).unwrap();
        assert_eq!(gl.log10_likelihoods()[2], f64::NEG_INFINITY);
    }
}
