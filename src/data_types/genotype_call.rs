use serde::Serialize;

use crate::data_types::genotype::DiploidGenotype;

/// A genotype call for one sample at a chosen allele frequency
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GenotypeCall {
    /// The sample identifier
    sample: String,
    /// Genotype assigned at the chosen allele frequency
    genotype: DiploidGenotype,
    /// The concrete allele sequences for the genotype
    alleles: (Vec<u8>, Vec<u8>),
    /// Non-negative log10-scaled confidence in the genotype
    confidence: f64,
    /// The raw log10 likelihoods this call came from, AA/AB/BB
    log10_likelihoods: [f64; 3]
}

impl GenotypeCall {
    /// Constructor
    pub fn new(sample: String, genotype: DiploidGenotype, alleles: (Vec<u8>, Vec<u8>), confidence: f64, log10_likelihoods: [f64; 3]) -> Self {
        Self {
            sample,
            genotype,
            alleles,
            confidence,
            log10_likelihoods
        }
    }

    /// Phred-scaled genotype quality, i.e. 10 * confidence
    pub fn genotype_quality(&self) -> f64 {
        10.0 * self.confidence
    }

    /// Renders the alleles as "A/C" style text
    pub fn allele_string(&self) -> String {
        format!(
            "{}/{}",
            String::from_utf8_lossy(&self.alleles.0),
            String::from_utf8_lossy(&self.alleles.1)
        )
    }

    // getters
    pub fn sample(&self) -> &str {
        &self.sample
    }

    pub fn genotype(&self) -> DiploidGenotype {
        self.genotype
    }

    pub fn alleles(&self) -> &(Vec<u8>, Vec<u8>) {
        &self.alleles
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn log10_likelihoods(&self) -> &[f64; 3] {
        &self.log10_likelihoods
    }
}
