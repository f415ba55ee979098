/// Biallelic allele and diploid genotype enumerations
pub mod genotype;
/// A called genotype with its confidence
pub mod genotype_call;
/// Per-sample log10 genotype likelihoods and posteriors
pub mod genotype_likelihoods;
