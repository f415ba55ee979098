/*!
# Grid Search Estimator
Allele frequency estimation that walks AF = 0..=2N through an `AlleleFrequencyMatrix`.
At each step the matrix greedily adds one alternate allele, and the resulting total log10 likelihood is combined with the prior.
Once the posterior falls far enough below the best value seen, the remaining frequencies are skipped.

## Example usage
```rust
use gridaf::af_model::{AlleleFrequencyCalculator, VALUE_NOT_CALCULATED};
use gridaf::data_types::genotype::DiploidGenotype;
use gridaf::data_types::genotype_likelihoods::BiallelicGenotypeLikelihoods;
use gridaf::grid_search::GridSearchEstimator;

let gls = vec![
    BiallelicGenotypeLikelihoods::new("s1".to_string(), b"A".to_vec(), b"G".to_vec(), [-1.0, -2.0, -5.0]).unwrap()
];
let priors = vec![0.0; 3];
let mut posteriors = vec![VALUE_NOT_CALCULATED; 3];

let mut estimator = GridSearchEstimator::new(1);
estimator.compute_posteriors(&gls, &priors, &mut posteriors).unwrap();
assert_eq!(posteriors, vec![-1.0, -2.0, -5.0]);

let calls = estimator.call_genotypes(&gls, 2).unwrap();
assert_eq!(calls["s1"].genotype(), DiploidGenotype::HomozygousB);
assert_eq!(calls["s1"].alleles(), &(b"G".to_vec(), b"G".to_vec()));
```
*/

use indexmap::IndexMap;
use log::{debug, trace};
use rustc_hash::FxHashMap;

use crate::af_matrix::AlleleFrequencyMatrix;
use crate::af_model::{AfCalcError, AlleleFrequencyCalculator, VALUE_NOT_CALCULATED};
use crate::data_types::genotype_call::GenotypeCall;
use crate::data_types::genotype_likelihoods::BiallelicGenotypeLikelihoods;

/// How far below the best posterior seen (log10 units) we can fall before we stop calculating
pub const LOG10_OPTIMIZATION_EPSILON: f64 = 8.0;

/// Greedy grid search over the cohort allele frequency.
/// Holds per-site state, so every worker needs its own instance.
#[derive(Clone, Debug)]
pub struct GridSearchEstimator {
    /// Reused for every site
    af_matrix: AlleleFrequencyMatrix,
    /// Highest allele frequency evaluated by the last calculation
    max_visited_frequency: Option<usize>
}

impl GridSearchEstimator {
    /// Constructor
    /// # Arguments
    /// * `max_samples` - the largest cohort this estimator will see
    pub fn new(max_samples: usize) -> Self {
        Self {
            af_matrix: AlleleFrequencyMatrix::new(max_samples),
            max_visited_frequency: None
        }
    }

    /// Returns true if the last calculation stopped before reaching AF = 2N
    pub fn exited_early(&self) -> bool {
        match self.max_visited_frequency {
            Some(af) => af < self.af_matrix.max_frequency(),
            None => false
        }
    }

    fn initialize_af_matrix(&mut self, gls: &[BiallelicGenotypeLikelihoods]) -> Result<(), AfCalcError> {
        for gl in gls.iter() {
            self.af_matrix.load_likelihoods(gl)?;
        }
        Ok(())
    }

    // getters
    pub fn max_visited_frequency(&self) -> Option<usize> {
        self.max_visited_frequency
    }

    pub fn af_matrix(&self) -> &AlleleFrequencyMatrix {
        &self.af_matrix
    }
}

impl AlleleFrequencyCalculator for GridSearchEstimator {
    fn compute_posteriors(&mut self, gls: &[BiallelicGenotypeLikelihoods], log10_priors: &[f64], log10_posteriors: &mut [f64]) -> Result<(), AfCalcError> {
        // forget the previous site first, so a failed call cannot be followed by stale genotype calls
        self.max_visited_frequency = None;
        self.af_matrix.clear();

        let capacity = self.af_matrix.capacity();
        if gls.len() > capacity {
            return Err(AfCalcError::TooManySamples { num_samples: gls.len(), capacity });
        }
        let expected = 2 * gls.len() + 1;
        if log10_priors.len() < expected {
            return Err(AfCalcError::VectorLength { label: "prior", found: log10_priors.len(), expected });
        }
        if log10_posteriors.len() < expected {
            return Err(AfCalcError::VectorLength { label: "posterior", found: log10_posteriors.len(), expected });
        }

        // anything we do not reach stays marked as not calculated
        log10_posteriors.iter_mut().for_each(|p| *p = VALUE_NOT_CALCULATED);
        self.initialize_af_matrix(gls)?;

        // first, calculate for AF=0 (no change to matrix)
        log10_posteriors[0] = self.af_matrix.total_log_likelihood() + log10_priors[0];
        self.max_visited_frequency = Some(0);
        let mut max_likelihood_seen = log10_posteriors[0];

        let max_frequency = self.af_matrix.max_frequency();
        for af in 1..=max_frequency {
            // add one more alternate allele and get the new likelihood
            self.af_matrix.advance_frequency()?;
            log10_posteriors[af] = self.af_matrix.total_log_likelihood() + log10_priors[af];
            self.max_visited_frequency = Some(af);
            trace!("AF={af}: log10 posterior = {}", log10_posteriors[af]);

            // if we are far enough past the maximum, later values will not matter for the confidence
            if max_likelihood_seen - log10_posteriors[af] > LOG10_OPTIMIZATION_EPSILON {
                debug!("Early exit at AF={af} of {max_frequency}, best seen = {max_likelihood_seen}");
                return Ok(());
            }

            if log10_posteriors[af] > max_likelihood_seen {
                max_likelihood_seen = log10_posteriors[af];
            }
        }

        Ok(())
    }

    fn call_genotypes(&self, gls: &[BiallelicGenotypeLikelihoods], chosen_af: usize) -> Result<IndexMap<String, GenotypeCall>, AfCalcError> {
        match self.max_visited_frequency {
            Some(max_visited) if chosen_af <= max_visited => {},
            max_visited => return Err(AfCalcError::FrequencyNotVisited { frequency: chosen_af, max_visited })
        };

        let gl_lookup: FxHashMap<&str, &BiallelicGenotypeLikelihoods> = gls.iter()
            .map(|gl| (gl.sample(), gl))
            .collect();

        let mut calls: IndexMap<String, GenotypeCall> = IndexMap::with_capacity(self.af_matrix.len());
        for sample in self.af_matrix.samples() {
            let gl = gl_lookup.get(sample)
                .ok_or_else(|| AfCalcError::MissingLikelihoods { sample: sample.to_string() })?;

            let assignment = self.af_matrix.genotype_at(chosen_af, sample)?;
            let genotype = assignment.genotype();
            let call = GenotypeCall::new(
                sample.to_string(),
                genotype,
                gl.genotype_alleles(genotype),
                assignment.confidence(),
                *gl.log10_likelihoods()
            );
            calls.insert(sample.to_string(), call);
        }

        Ok(calls)
    }
}
