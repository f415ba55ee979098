/*!
# Site Caller
Drives an allele frequency calculator for one site at a time.
This is where the allele frequency is actually chosen (the maximum posterior), and the chosen value is turned into genotype calls.

## Example usage
```rust
use gridaf::data_types::genotype::DiploidGenotype;
use gridaf::data_types::genotype_likelihoods::BiallelicGenotypeLikelihoods;
use gridaf::priors::PriorModel;
use gridaf::site_caller::{SiteCaller, SiteCallerConfigBuilder};

let config = SiteCallerConfigBuilder::default()
    .prior_model(PriorModel::Flat)
    .build().unwrap();
let mut caller = SiteCaller::new(config, 2).unwrap();

let gls = vec![
    BiallelicGenotypeLikelihoods::new("a".to_string(), b"A".to_vec(), b"G".to_vec(), [-0.1, -3.0, -6.0]).unwrap(),
    BiallelicGenotypeLikelihoods::new("b".to_string(), b"A".to_vec(), b"G".to_vec(), [-5.0, -1.0, -0.2]).unwrap(),
];
let result = caller.call_site("site_1", &gls).unwrap();
assert_eq!(result.allele_frequency().alt_alleles(), 2);
assert_eq!(result.calls()["b"].genotype(), DiploidGenotype::HomozygousB);
```
*/

use anyhow::{ensure, Context};
use bio::stats::PHREDProb;
use derive_builder::Builder;
use indexmap::IndexMap;
use log::debug;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::af_model::{build_calculator, AfCalcError, AfCalculationModel, AlleleFrequencyCalculator, VALUE_NOT_CALCULATED};
use crate::data_types::genotype_call::GenotypeCall;
use crate::data_types::genotype_likelihoods::BiallelicGenotypeLikelihoods;
use crate::priors::{build_priors, PriorModel};
use crate::util::math::{log10_sum_exp, log10_to_log_prob, max_element_index};

/// Default expected heterozygosity for the neutral prior
pub const DEFAULT_HETEROZYGOSITY: f64 = 0.001;

/// Controls how each site is calculated
#[derive(Builder, Clone, Copy, Debug, Serialize)]
#[builder(default)]
pub struct SiteCallerConfig {
    /// the allele frequency strategy
    model: AfCalculationModel,
    /// the allele frequency prior
    prior_model: PriorModel,
    /// expected heterozygosity, only used by the neutral prior
    heterozygosity: f64
}

impl Default for SiteCallerConfig {
    fn default() -> Self {
        Self {
            model: AfCalculationModel::GridSearch,
            prior_model: PriorModel::InfiniteSitesNeutral,
            heterozygosity: DEFAULT_HETEROZYGOSITY
        }
    }
}

impl SiteCallerConfig {
    // mostly getters
    pub fn model(&self) -> AfCalculationModel {
        self.model
    }

    pub fn prior_model(&self) -> PriorModel {
        self.prior_model
    }

    pub fn heterozygosity(&self) -> f64 {
        self.heterozygosity
    }
}

/// The allele frequency selected for a site, with the normalized evidence for a variant
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CalculatedAlleleFrequency {
    /// Normalized log10 P(AF = 0 | data)
    log10_p_ref: f64,
    /// Normalized log10 P(AF > 0 | data)
    log10_p_non_ref: f64,
    /// The alternate allele count with the maximum posterior
    alt_alleles: usize
}

impl CalculatedAlleleFrequency {
    /// Picks the maximum posterior and normalizes over every evaluated frequency.
    /// Returns None if nothing was evaluated.
    /// # Arguments
    /// * `log10_posteriors` - output of an allele frequency calculator
    pub fn from_posteriors(log10_posteriors: &[f64]) -> Option<Self> {
        let calculated: Vec<f64> = log10_posteriors.iter()
            .map(|&p| if p == VALUE_NOT_CALCULATED { f64::NEG_INFINITY } else { p })
            .collect();
        let alt_alleles = max_element_index(&calculated)?;
        if calculated[alt_alleles] == f64::NEG_INFINITY {
            return None;
        }

        let log10_total = log10_sum_exp(&calculated);
        let log10_p_ref = calculated[0] - log10_total;
        let log10_p_non_ref = log10_sum_exp(&calculated[1..]) - log10_total;
        Some(Self {
            log10_p_ref,
            log10_p_non_ref,
            alt_alleles
        })
    }

    /// Phred-scaled confidence that the site is variant, -10 * log10 P(AF = 0 | data)
    pub fn phred_quality(&self) -> f64 {
        *PHREDProb::from(log10_to_log_prob(self.log10_p_ref))
    }

    // getters
    pub fn log10_p_ref(&self) -> f64 {
        self.log10_p_ref
    }

    pub fn log10_p_non_ref(&self) -> f64 {
        self.log10_p_non_ref
    }

    pub fn alt_alleles(&self) -> usize {
        self.alt_alleles
    }
}

/// Everything we learned about a single site
#[derive(Clone, Debug, Serialize)]
pub struct SiteResult {
    /// Identifier of the site from the input
    site_id: String,
    /// Number of samples at the site
    num_samples: usize,
    /// log10 posterior per allele frequency, not-calculated entries included
    log10_posteriors: Vec<f64>,
    /// The chosen allele frequency
    allele_frequency: CalculatedAlleleFrequency,
    /// Highest allele frequency that was evaluated
    max_evaluated_af: usize,
    /// Per-sample calls at the chosen allele frequency, in input order
    calls: IndexMap<String, GenotypeCall>
}

impl SiteResult {
    /// Returns true if the calculation stopped before AF = 2N
    pub fn exited_early(&self) -> bool {
        self.max_evaluated_af < 2 * self.num_samples
    }

    // getters
    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn log10_posteriors(&self) -> &[f64] {
        &self.log10_posteriors
    }

    pub fn allele_frequency(&self) -> &CalculatedAlleleFrequency {
        &self.allele_frequency
    }

    pub fn max_evaluated_af(&self) -> usize {
        self.max_evaluated_af
    }

    pub fn calls(&self) -> &IndexMap<String, GenotypeCall> {
        &self.calls
    }
}

/// Owns one calculator; intended to live on a single worker thread and be re-used for many sites
pub struct SiteCaller {
    /// The settings for this caller
    config: SiteCallerConfig,
    /// The underlying strategy
    calculator: Box<dyn AlleleFrequencyCalculator + Send>,
    /// Cached prior vectors, keyed by cohort size
    prior_cache: FxHashMap<usize, Vec<f64>>
}

impl SiteCaller {
    /// Constructor
    /// # Arguments
    /// * `config` - the caller settings
    /// * `max_samples` - the largest cohort that will be provided
    /// # Errors
    /// * if the configured model is not available
    pub fn new(config: SiteCallerConfig, max_samples: usize) -> Result<Self, AfCalcError> {
        let calculator = build_calculator(config.model(), max_samples)?;
        Ok(Self {
            config,
            calculator,
            prior_cache: Default::default()
        })
    }

    /// Runs the full calculation for a site and calls genotypes at the maximum posterior allele frequency.
    /// # Arguments
    /// * `site_id` - label for the site, used in messages and output
    /// * `gls` - one record per sample
    /// # Errors
    /// * if the priors cannot be built
    /// * if the calculator reports a contract or invariant violation
    pub fn call_site(&mut self, site_id: &str, gls: &[BiallelicGenotypeLikelihoods]) -> anyhow::Result<SiteResult> {
        let num_samples = gls.len();
        if !self.prior_cache.contains_key(&num_samples) {
            let priors = build_priors(self.config.prior_model(), num_samples, self.config.heterozygosity())
                .with_context(|| format!("Error while building priors for {site_id}:"))?;
            self.prior_cache.insert(num_samples, priors);
        }
        let log10_priors = &self.prior_cache[&num_samples];

        let mut log10_posteriors = vec![VALUE_NOT_CALCULATED; 2 * num_samples + 1];
        self.calculator.compute_posteriors(gls, log10_priors, &mut log10_posteriors)
            .with_context(|| format!("Error while computing posteriors for {site_id}:"))?;

        let allele_frequency = CalculatedAlleleFrequency::from_posteriors(&log10_posteriors)
            .with_context(|| format!("No allele frequency was evaluated for {site_id}"))?;
        let max_evaluated_af = log10_posteriors.iter()
            .rposition(|&p| p != VALUE_NOT_CALCULATED)
            .unwrap_or(0);
        debug!("{site_id}: AF={} of {} (evaluated up to {max_evaluated_af}), log10 P(non-ref)={}",
            allele_frequency.alt_alleles(), 2 * num_samples, allele_frequency.log10_p_non_ref());

        let calls = self.calculator.call_genotypes(gls, allele_frequency.alt_alleles())
            .with_context(|| format!("Error while calling genotypes for {site_id}:"))?;
        let called_alt_alleles: usize = calls.values()
            .map(|c| c.genotype().alt_count())
            .sum();
        ensure!(
            called_alt_alleles == allele_frequency.alt_alleles(),
            "Genotype calls for {site_id} carry {called_alt_alleles} alternate alleles, expected {}",
            allele_frequency.alt_alleles()
        );

        Ok(SiteResult {
            site_id: site_id.to_string(),
            num_samples,
            log10_posteriors,
            allele_frequency,
            max_evaluated_af,
            calls
        })
    }

    pub fn config(&self) -> &SiteCallerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx_eq::assert_approx_eq;

    use crate::data_types::genotype::DiploidGenotype;

    fn build_gl(sample: &str, likelihoods: [f64; 3]) -> BiallelicGenotypeLikelihoods {
        BiallelicGenotypeLikelihoods::new(sample.to_string(), b"A".to_vec(), b"G".to_vec(), likelihoods).unwrap()
    }

    fn flat_caller(max_samples: usize) -> SiteCaller {
        let config = SiteCallerConfigBuilder::default()
            .prior_model(PriorModel::Flat)
            .build().unwrap();
        SiteCaller::new(config, max_samples).unwrap()
    }

    #[test]
    fn test_calculated_af() {
        let af = CalculatedAlleleFrequency::from_posteriors(&[-1.0, -2.0, -5.0]).unwrap();
        assert_eq!(af.alt_alleles(), 0);
        let total: f64 = 0.1 + 0.01 + 0.00001;
        assert_approx_eq!(af.log10_p_ref(), (0.1 / total).log10());
        assert_approx_eq!(af.log10_p_non_ref(), (0.01001 / total).log10());
        assert_approx_eq!(af.phred_quality(), -10.0 * (0.1 / total).log10());

        // sentinels are ignored, ties keep the lowest frequency
        let af = CalculatedAlleleFrequency::from_posteriors(&[-3.0, -1.0, -1.0, VALUE_NOT_CALCULATED]).unwrap();
        assert_eq!(af.alt_alleles(), 1);

        assert!(CalculatedAlleleFrequency::from_posteriors(&[]).is_none());
        assert!(CalculatedAlleleFrequency::from_posteriors(&[VALUE_NOT_CALCULATED]).is_none());
    }

    #[test]
    fn test_call_site_flat() {
        let mut caller = flat_caller(2);
        let gls = vec![
            build_gl("a", [-0.1, -3.0, -6.0]),
            build_gl("b", [-5.0, -1.0, -0.2]),
        ];
        let result = caller.call_site("chr1:100", &gls).unwrap();
        assert_eq!(result.site_id(), "chr1:100");
        assert_eq!(result.num_samples(), 2);
        assert_eq!(result.log10_posteriors().len(), 5);
        assert_eq!(result.allele_frequency().alt_alleles(), 2);
        assert_eq!(result.calls()["a"].genotype(), DiploidGenotype::HomozygousA);
        assert_eq!(result.calls()["b"].genotype(), DiploidGenotype::HomozygousB);
        assert_approx_eq!(result.calls()["b"].confidence(), 0.8);
        assert!(!result.exited_early());
    }

    #[test]
    fn test_call_site_neutral_prior() {
        let config = SiteCallerConfigBuilder::default()
            .heterozygosity(0.01)
            .build().unwrap();
        assert_eq!(config.prior_model(), PriorModel::InfiniteSitesNeutral);
        let mut caller = SiteCaller::new(config, 3).unwrap();

        // weak evidence for a het in one sample is overridden by the prior
        let gls = vec![
            build_gl("a", [-0.5, -0.3, -3.0]),
            build_gl("b", [0.0, -3.0, -6.0]),
            build_gl("c", [0.0, -3.0, -6.0]),
        ];
        let result = caller.call_site("site", &gls).unwrap();
        assert_eq!(result.allele_frequency().alt_alleles(), 0);
        let call = &result.calls()["a"];
        assert_eq!(call.genotype(), DiploidGenotype::HomozygousA);
        assert!(call.confidence() >= 0.0);

        // second site with a different size uses a different prior
        let result = caller.call_site("site2", &gls[..1]).unwrap();
        assert_eq!(result.log10_posteriors().len(), 3);
    }

    #[test]
    fn test_call_site_early_exit() {
        let mut caller = flat_caller(3);
        let gls = vec![
            build_gl("a", [0.0, -5.0, -10.0]),
            build_gl("b", [0.0, -5.0, -10.0]),
            build_gl("c", [0.0, -5.0, -10.0]),
        ];
        let result = caller.call_site("site", &gls).unwrap();
        assert_eq!(result.max_evaluated_af(), 2);
        assert!(result.exited_early());
        assert_eq!(result.allele_frequency().alt_alleles(), 0);
        assert_eq!(result.calls().len(), 3);
    }

    #[test]
    fn test_unsupported_model() {
        let config = SiteCallerConfigBuilder::default()
            .model(AfCalculationModel::Exact)
            .build().unwrap();
        assert!(SiteCaller::new(config, 1).is_err());
    }

    #[test]
    fn test_too_many_samples() {
        let mut caller = flat_caller(1);
        let gls = vec![
            build_gl("a", [-0.1, -3.0, -6.0]),
            build_gl("b", [-5.0, -1.0, -0.2]),
        ];
        assert!(caller.call_site("site", &gls).is_err());
    }
}
