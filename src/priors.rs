/*!
# Allele frequency priors
Builds the log10 prior vector over AF = 0..=2N that the estimators combine with the data likelihood.
*/

use bio::stats::{LogProb, Prob};
use serde::Serialize;
use strum_macros::EnumString;

use crate::util::math::log_prob_to_log10;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PriorError {
    #[error("heterozygosity must be in (0, 1), found {heterozygosity}")]
    InvalidHeterozygosity { heterozygosity: f64 },
    #[error("heterozygosity {heterozygosity} is too large for {num_samples} samples, non-reference prior mass is {total}")]
    NonReferenceMassTooLarge { heterozygosity: f64, num_samples: usize, total: f64 }
}

/// The shape of the allele frequency prior
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum_macros::Display, EnumString, Serialize, clap::ValueEnum)]
pub enum PriorModel {
    /// Every allele frequency gets log10 prior 0.0
    #[strum(ascii_case_insensitive, serialize = "flat")]
    #[clap(name = "flat")]
    Flat,
    /// Infinite sites neutral model, prior(AF=i) = heterozygosity / i
    #[default]
    #[strum(ascii_case_insensitive, serialize = "neutral")]
    #[clap(name = "neutral")]
    InfiniteSitesNeutral
}

/// A flat prior, which leaves the posterior equal to the likelihood
/// # Arguments
/// * `num_samples` - cohort size N
pub fn flat_priors(num_samples: usize) -> Vec<f64> {
    vec![0.0; 2 * num_samples + 1]
}

/// The classical population genetic prior: for i in 1..=2N, log10(heterozygosity / i), and AF=0 takes the remaining mass.
/// # Arguments
/// * `num_samples` - cohort size N
/// * `heterozygosity` - expected per-site heterozygosity, e.g. 0.001 for humans
/// # Errors
/// * if heterozygosity is outside (0, 1)
/// * if the non-reference mass reaches 1.0, leaving nothing for AF=0
pub fn infinite_sites_priors(num_samples: usize, heterozygosity: f64) -> Result<Vec<f64>, PriorError> {
    // also catches NaN
    if !(heterozygosity > 0.0 && heterozygosity < 1.0) {
        return Err(PriorError::InvalidHeterozygosity { heterozygosity });
    }

    let max_af = 2 * num_samples;
    let log_het = LogProb::from(Prob(heterozygosity));
    let non_ref: Vec<LogProb> = (1..=max_af)
        .map(|i| LogProb(*log_het - (i as f64).ln()))
        .collect();

    let non_ref_mass = LogProb::ln_sum_exp(&non_ref);
    if *non_ref_mass >= 0.0 {
        return Err(PriorError::NonReferenceMassTooLarge { heterozygosity, num_samples, total: (*non_ref_mass).exp() });
    }

    let mut priors = Vec::with_capacity(max_af + 1);
    priors.push(log_prob_to_log10(non_ref_mass.ln_one_minus_exp()));
    priors.extend(non_ref.into_iter().map(log_prob_to_log10));
    Ok(priors)
}

/// Builds the prior vector for a model
/// # Arguments
/// * `model` - which prior to use
/// * `num_samples` - cohort size N
/// * `heterozygosity` - only used by the neutral model
/// # Errors
/// * see `infinite_sites_priors(...)`
pub fn build_priors(model: PriorModel, num_samples: usize, heterozygosity: f64) -> Result<Vec<f64>, PriorError> {
    match model {
        PriorModel::Flat => Ok(flat_priors(num_samples)),
        PriorModel::InfiniteSitesNeutral => infinite_sites_priors(num_samples, heterozygosity)
    }
}
