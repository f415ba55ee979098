/*!
# Allele Frequency Calculation Model
The shared contract for every strategy that turns per-sample genotype likelihoods into a posterior over the cohort alternate allele count.
A strategy fills a log10 posterior vector for AF = 0..=2N, and afterwards translates a caller-chosen AF into per-sample genotype calls.
Choosing the AF is up to the caller.
*/

use indexmap::IndexMap;
use serde::Serialize;
use strum_macros::EnumString;

use crate::af_matrix::AfMatrixError;
use crate::data_types::genotype_call::GenotypeCall;
use crate::data_types::genotype_likelihoods::BiallelicGenotypeLikelihoods;
use crate::grid_search::GridSearchEstimator;

/// Marks posterior entries that were never evaluated, compares below any real log10 value
pub const VALUE_NOT_CALCULATED: f64 = -f64::MAX;

#[derive(thiserror::Error, Debug)]
pub enum AfCalcError {
    #[error("the {model} allele frequency model is not supported")]
    UnsupportedModel { model: AfCalculationModel },
    #[error("{num_samples} samples exceeds the calculator capacity of {capacity}")]
    TooManySamples { num_samples: usize, capacity: usize },
    #[error("{label} vector has length {found}, expected at least {expected}")]
    VectorLength { label: &'static str, found: usize, expected: usize },
    #[error("no genotype likelihoods were provided for sample \"{sample}\"")]
    MissingLikelihoods { sample: String },
    #[error("allele frequency {frequency} was not evaluated, maximum evaluated was {max_visited:?}")]
    FrequencyNotVisited { frequency: usize, max_visited: Option<usize> },
    #[error("matrix error: {0}")]
    Matrix(#[from] AfMatrixError)
}

/// The available allele frequency estimation strategies
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum_macros::Display, EnumString, Serialize, clap::ValueEnum)]
pub enum AfCalculationModel {
    /// Exhaustive enumeration of genotype assignments
    #[strum(ascii_case_insensitive, serialize = "exact")]
    #[clap(name = "exact")]
    Exact,
    /// Greedy incremental search over genotype assignments
    #[default]
    #[strum(ascii_case_insensitive, serialize = "grid_search")]
    #[clap(name = "grid_search")]
    GridSearch
}

/// Capability surface shared by every estimation strategy
pub trait AlleleFrequencyCalculator {
    /// Fills `log10_posteriors[af]` with log10 P(data | af) + `log10_priors[af]` for af in 0..=2N.
    /// Entries a strategy chooses not to evaluate are left at `VALUE_NOT_CALCULATED`.
    /// # Arguments
    /// * `gls` - one record per sample, sample identifiers must be unique
    /// * `log10_priors` - prior per allele frequency, at least 2N+1 long; it is not re-normalized
    /// * `log10_posteriors` - pre-allocated output, at least 2N+1 long
    /// # Errors
    /// * if the inputs violate the contract (lengths, capacity, duplicates)
    /// * if an internal invariant of the strategy breaks
    fn compute_posteriors(&mut self, gls: &[BiallelicGenotypeLikelihoods], log10_priors: &[f64], log10_posteriors: &mut [f64]) -> Result<(), AfCalcError>;

    /// Translates a chosen allele frequency from the last `compute_posteriors(...)` into per-sample calls.
    /// # Arguments
    /// * `gls` - the same records provided to `compute_posteriors(...)`
    /// * `chosen_af` - an allele frequency that was actually evaluated
    /// # Errors
    /// * if `chosen_af` was never evaluated
    /// * if a loaded sample is missing from `gls`
    fn call_genotypes(&self, gls: &[BiallelicGenotypeLikelihoods], chosen_af: usize) -> Result<IndexMap<String, GenotypeCall>, AfCalcError>;
}

/// Builds the calculator for a given model.
/// # Arguments
/// * `model` - the selected strategy
/// * `max_samples` - the largest cohort the calculator will see
/// # Errors
/// * if the model is not implemented
pub fn build_calculator(model: AfCalculationModel, max_samples: usize) -> Result<Box<dyn AlleleFrequencyCalculator + Send>, AfCalcError> {
    match model {
        AfCalculationModel::Exact => Err(AfCalcError::UnsupportedModel { model }),
        AfCalculationModel::GridSearch => Ok(Box::new(GridSearchEstimator::new(max_samples)))
    }
}

/// A single observation (e.g. a base) in a pileup; usability is decided by whoever produced it
pub trait PileupObservation {
    /// Returns true if this observation should count towards depth
    fn is_usable(&self) -> bool;
}

/// Counts the usable observations in a pileup
/// # Arguments
/// * `pileup` - the observations at a site for one sample
pub fn filtered_depth<'a, T, I>(pileup: I) -> usize
where
    T: PileupObservation + 'a,
    I: IntoIterator<Item = &'a T>
{
    pileup.into_iter()
        .filter(|p| p.is_usable())
        .count()
}
