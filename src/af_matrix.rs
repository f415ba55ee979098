/*!
# Allele Frequency Matrix
Tracks the per-sample genotype assignment while walking the alternate allele count of a cohort upwards one allele at a time.
Each sample has a row of three log10 values (AA, AB, BB) and a cursor pointing at its current genotype.
Every step moves exactly one sample forward by one genotype, picking the move with the largest likelihood gain.
This is a greedy approximation of the best assignment for each allele frequency, not the exact optimum.

## Example usage
```rust
use gridaf::af_matrix::AlleleFrequencyMatrix;
use gridaf::data_types::genotype::DiploidGenotype;

let mut matrix = AlleleFrequencyMatrix::new(2);
matrix.load("a", -0.1, -3.0, -6.0).unwrap();
matrix.load("b", -5.0, -1.0, -0.2).unwrap();

// AF=0, everyone is A/A
let af0 = matrix.total_log_likelihood();
assert!((af0 - -5.1).abs() < 1e-9);

// AF=1, "b" gains the most from moving to A/B
matrix.advance_frequency().unwrap();
let _ = matrix.total_log_likelihood();
assert_eq!(matrix.genotype_at(1, "b").unwrap().genotype(), DiploidGenotype::Heterozygous);
assert_eq!(matrix.genotype_at(1, "a").unwrap().genotype(), DiploidGenotype::HomozygousA);
```
*/

use indexmap::IndexMap;
use log::trace;
use serde::Serialize;

use crate::data_types::genotype::DiploidGenotype;
use crate::data_types::genotype_likelihoods::BiallelicGenotypeLikelihoods;
use crate::util::math::{max_element_index, normalize_from_log10};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum AfMatrixError {
    #[error("matrix capacity of {capacity} samples exceeded")]
    CapacityExceeded { capacity: usize },
    #[error("sample \"{sample}\" was loaded more than once")]
    DuplicateSample { sample: String },
    #[error("matrix must be cleared before loading a new site")]
    NotCleared,
    #[error("frequency incremented past the maximum of {max_frequency}")]
    FrequencyOverflow { max_frequency: usize },
    #[error("no sample can accept another alternate allele at frequency {frequency}")]
    NoEligibleSample { frequency: usize },
    #[error("genotypes were never recorded for frequency {frequency}")]
    FrequencyNotRecorded { frequency: usize },
    #[error("sample \"{sample}\" is not loaded in the matrix")]
    UnknownSample { sample: String }
}

/// Lifecycle of the matrix for one site
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatrixState {
    /// Freshly constructed or cleared, no samples yet
    #[default]
    Empty,
    /// Samples are being loaded
    Loading,
    /// The frequency walk has started; loading is locked until the next clear
    Searching
}

/// The genotype a sample held at a given frequency, along with the confidence in that genotype
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SampleAssignment {
    /// Assigned genotype
    genotype: DiploidGenotype,
    /// Non-negative log10-scaled confidence
    confidence: f64
}

impl SampleAssignment {
    // getters
    pub fn genotype(&self) -> DiploidGenotype {
        self.genotype
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

/// Greedy genotype assignment matrix, reusable across sites via `clear()`
#[derive(Clone, Debug)]
pub struct AlleleFrequencyMatrix {
    /// Maximum number of samples this matrix can hold
    capacity: usize,
    /// One log10 triple per sample in load order
    rows: Vec<[f64; 3]>,
    /// Currently active genotype per sample; only ever moves forward
    cursors: Vec<DiploidGenotype>,
    /// Sample identifier to row index, in load order
    samples: IndexMap<String, usize>,
    /// Current number of alternate alleles assigned
    frequency: usize,
    /// Per-frequency snapshot of the assignments; index is the frequency, inner index is the row
    assignments: Vec<Option<Vec<SampleAssignment>>>,
    /// Tracks whether we are allowed to load
    state: MatrixState
}

impl AlleleFrequencyMatrix {
    /// Constructor
    /// # Arguments
    /// * `capacity` - the maximum number of samples that will ever be loaded at once
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            rows: Vec::with_capacity(capacity),
            cursors: Vec::with_capacity(capacity),
            samples: IndexMap::with_capacity(capacity),
            frequency: 0,
            assignments: vec![None; 2 * capacity + 1],
            state: MatrixState::Empty
        }
    }

    /// Resets all the site-specific state while keeping the allocations around
    pub fn clear(&mut self) {
        self.frequency = 0;
        self.rows.clear();
        self.cursors.clear();
        self.samples.clear();
        self.assignments.iter_mut().for_each(|a| *a = None);
        self.state = MatrixState::Empty;
    }

    /// Appends a sample row. Load order defines the row index and iteration order afterwards.
    /// # Arguments
    /// * `sample` - the sample identifier
    /// * `aa` - log10 value for the A/A genotype
    /// * `ab` - log10 value for the A/B genotype
    /// * `bb` - log10 value for the B/B genotype
    /// # Errors
    /// * if the frequency walk already started without a `clear()`
    /// * if the matrix is full
    /// * if the sample was already loaded
    pub fn load(&mut self, sample: &str, aa: f64, ab: f64, bb: f64) -> Result<(), AfMatrixError> {
        if self.state == MatrixState::Searching {
            return Err(AfMatrixError::NotCleared);
        }
        if self.rows.len() >= self.capacity {
            return Err(AfMatrixError::CapacityExceeded { capacity: self.capacity });
        }
        if self.samples.contains_key(sample) {
            return Err(AfMatrixError::DuplicateSample { sample: sample.to_string() });
        }

        self.samples.insert(sample.to_string(), self.rows.len());
        self.rows.push([aa, ab, bb]);
        self.cursors.push(DiploidGenotype::HomozygousA);
        self.state = MatrixState::Loading;
        Ok(())
    }

    /// Loads the genotype-prior-adjusted values from a likelihood record.
    /// # Errors
    /// * see `load(...)`
    pub fn load_likelihoods(&mut self, gl: &BiallelicGenotypeLikelihoods) -> Result<(), AfMatrixError> {
        let [aa, ab, bb] = *gl.log10_posteriors();
        self.load(gl.sample(), aa, ab, bb)
    }

    /// Adds one alternate allele to the cohort by moving the single sample with the largest gain to its next genotype.
    /// Samples at A/A are scored on AB - AA, samples at A/B on BB - AB, and B/B samples cannot move.
    /// Ties go to the first sample in load order.
    /// # Errors
    /// * if the frequency would pass 2 * (number of samples)
    /// * if every sample is already B/B
    pub fn advance_frequency(&mut self) -> Result<(), AfMatrixError> {
        self.state = MatrixState::Searching;
        let max_frequency = self.max_frequency();
        if self.frequency >= max_frequency {
            return Err(AfMatrixError::FrequencyOverflow { max_frequency });
        }
        self.frequency += 1;

        // no secondary tie-breaking on the B/B value; collisions that matter there are rare
        let mut greedy: Option<(usize, f64)> = None;
        for (i, (row, cursor)) in self.rows.iter().zip(self.cursors.iter()).enumerate() {
            let Some(next) = cursor.next() else {
                // already B/B, it cannot take another alternate allele
                continue;
            };
            let gain = row[next.index()] - row[cursor.index()];
            // -inf minus -inf, treat it as the worst possible move
            let gain = if gain.is_nan() { f64::NEG_INFINITY } else { gain };
            match greedy {
                Some((_, best_gain)) if gain <= best_gain => {},
                _ => greedy = Some((i, gain))
            }
        }

        let Some((greedy_index, gain)) = greedy else {
            return Err(AfMatrixError::NoEligibleSample { frequency: self.frequency });
        };

        let cursor = &mut self.cursors[greedy_index];
        let next = cursor.next().ok_or(AfMatrixError::NoEligibleSample { frequency: self.frequency })?;
        trace!("AF={}: row {greedy_index} {:?} -> {:?} (gain {gain})", self.frequency, cursor, next);
        *cursor = next;
        Ok(())
    }

    /// Sums the log10 value of every sample at its current genotype.
    /// Also snapshots the current genotypes and confidences for this frequency, which is the only way `genotype_at(...)` can see them later.
    pub fn total_log_likelihood(&mut self) -> f64 {
        self.state = MatrixState::Searching;
        let total: f64 = self.rows.iter()
            .zip(self.cursors.iter())
            .map(|(row, cursor)| row[cursor.index()])
            .sum();

        self.record_genotypes();
        total
    }

    /// Looks up the assignment recorded for a sample at a previously visited frequency.
    /// # Arguments
    /// * `frequency` - the alternate allele count of interest
    /// * `sample` - the sample identifier
    /// # Errors
    /// * if the frequency was never recorded (e.g. it is past an early exit)
    /// * if the sample is not loaded
    pub fn genotype_at(&self, frequency: usize, sample: &str) -> Result<SampleAssignment, AfMatrixError> {
        let recorded = self.assignments.get(frequency)
            .and_then(|a| a.as_ref())
            .ok_or(AfMatrixError::FrequencyNotRecorded { frequency })?;
        let &row_index = self.samples.get(sample)
            .ok_or_else(|| AfMatrixError::UnknownSample { sample: sample.to_string() })?;
        Ok(recorded[row_index])
    }

    /// Returns true if the given frequency has a recorded snapshot
    pub fn is_recorded(&self, frequency: usize) -> bool {
        matches!(self.assignments.get(frequency), Some(Some(_)))
    }

    fn record_genotypes(&mut self) {
        let snapshot: Vec<SampleAssignment> = self.rows.iter()
            .zip(self.cursors.iter())
            .map(|(row, &genotype)| SampleAssignment {
                genotype,
                confidence: genotype_confidence(row, genotype)
            })
            .collect();
        self.assignments[self.frequency] = Some(snapshot);
    }

    /// Sample identifiers in load order
    pub fn samples(&self) -> impl Iterator<Item = &str> {
        self.samples.keys().map(|s| s.as_str())
    }

    /// The highest frequency reachable with the loaded samples
    pub fn max_frequency(&self) -> usize {
        2 * self.rows.len()
    }

    /// Current genotype of each row, in load order
    pub fn cursors(&self) -> &[DiploidGenotype] {
        &self.cursors
    }

    // getters
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn frequency(&self) -> usize {
        self.frequency
    }

    pub fn state(&self) -> MatrixState {
        self.state
    }
}

/// Confidence that a sample carries the assigned genotype, always non-negative.
/// If the assignment agrees with the sample's own best genotype, this is the margin over the runner-up.
/// Otherwise the cohort overrode the sample, and this is -log10(1 - p) where p is the normalized probability of the assignment.
/// # Arguments
/// * `row` - log10 values in AA/AB/BB order
/// * `assigned` - the genotype currently assigned
pub fn genotype_confidence(row: &[f64; 3], assigned: DiploidGenotype) -> f64 {
    let assigned_index = assigned.index();
    let best_index = max_element_index(row).unwrap_or(assigned_index);

    let score = if assigned_index == best_index {
        let runner_up = row.iter()
            .enumerate()
            .filter(|&(i, _)| i != assigned_index)
            .map(|(_, &v)| v)
            .fold(f64::NEG_INFINITY, f64::max);
        row[assigned_index] - runner_up
    } else {
        let normalized = normalize_from_log10(row);
        -(1.0 - normalized[assigned_index]).log10()
    };

    score.abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx_eq::assert_approx_eq;

    fn two_sample_matrix() -> AlleleFrequencyMatrix {
        let mut matrix = AlleleFrequencyMatrix::new(2);
        matrix.load("a", -0.1, -3.0, -6.0).unwrap();
        matrix.load("b", -5.0, -1.0, -0.2).unwrap();
        matrix
    }

    #[test]
    fn test_single_sample_walk() {
        let mut matrix = AlleleFrequencyMatrix::new(1);
        matrix.load("s", -1.0, -2.0, -5.0).unwrap();
        assert_eq!(matrix.total_log_likelihood(), -1.0);
        matrix.advance_frequency().unwrap();
        assert_eq!(matrix.total_log_likelihood(), -2.0);
        matrix.advance_frequency().unwrap();
        assert_eq!(matrix.total_log_likelihood(), -5.0);

        let af0 = matrix.genotype_at(0, "s").unwrap();
        assert_eq!(af0.genotype(), DiploidGenotype::HomozygousA);
        assert_approx_eq!(af0.confidence(), 1.0);
        assert_eq!(matrix.genotype_at(1, "s").unwrap().genotype(), DiploidGenotype::Heterozygous);
        assert_eq!(matrix.genotype_at(2, "s").unwrap().genotype(), DiploidGenotype::HomozygousB);

        // nothing left to move
        assert_eq!(matrix.advance_frequency(), Err(AfMatrixError::FrequencyOverflow { max_frequency: 2 }));
    }

    #[test]
    fn test_greedy_choice() {
        let mut matrix = two_sample_matrix();
        assert_approx_eq!(matrix.total_log_likelihood(), -5.1);

        // a gains -2.9, b gains 4.0
        matrix.advance_frequency().unwrap();
        assert_approx_eq!(matrix.total_log_likelihood(), -1.1);
        assert_eq!(matrix.genotype_at(1, "a").unwrap().genotype(), DiploidGenotype::HomozygousA);
        assert_eq!(matrix.genotype_at(1, "b").unwrap().genotype(), DiploidGenotype::Heterozygous);

        // b gains 0.8 moving to BB, a still -2.9
        matrix.advance_frequency().unwrap();
        assert_approx_eq!(matrix.total_log_likelihood(), -0.3);
        assert_eq!(matrix.cursors(), &[DiploidGenotype::HomozygousA, DiploidGenotype::HomozygousB]);

        // only a can move now
        matrix.advance_frequency().unwrap();
        matrix.advance_frequency().unwrap();
        assert_eq!(matrix.cursors(), &[DiploidGenotype::HomozygousB, DiploidGenotype::HomozygousB]);
        assert_eq!(matrix.frequency(), 4);
        assert!(matrix.advance_frequency().is_err());
    }

    #[test]
    fn test_tie_goes_to_first_sample() {
        let mut matrix = AlleleFrequencyMatrix::new(3);
        matrix.load("x", -2.0, -1.0, -9.0).unwrap();
        matrix.load("y", -3.0, -2.0, -0.1).unwrap();
        matrix.load("z", -2.0, -1.0, -0.5).unwrap();
        matrix.advance_frequency().unwrap();
        assert_eq!(matrix.cursors()[0], DiploidGenotype::Heterozygous);
        assert_eq!(matrix.cursors()[1], DiploidGenotype::HomozygousA);
        assert_eq!(matrix.cursors()[2], DiploidGenotype::HomozygousA);
    }

    #[test]
    fn test_negative_infinity_gains_still_eligible() {
        let mut matrix = AlleleFrequencyMatrix::new(1);
        matrix.load("s", 0.0, f64::NEG_INFINITY, f64::NEG_INFINITY).unwrap();
        matrix.advance_frequency().unwrap();
        assert_eq!(matrix.cursors()[0], DiploidGenotype::Heterozygous);
    }

    #[test]
    fn test_load_errors() {
        let mut matrix = AlleleFrequencyMatrix::new(1);
        matrix.load("a", -1.0, -1.0, -1.0).unwrap();
        assert_eq!(
            matrix.load("b", -1.0, -1.0, -1.0),
            Err(AfMatrixError::CapacityExceeded { capacity: 1 })
        );

        let mut matrix = AlleleFrequencyMatrix::new(2);
        matrix.load("a", -1.0, -1.0, -1.0).unwrap();
        assert_eq!(
            matrix.load("a", -1.0, -1.0, -1.0),
            Err(AfMatrixError::DuplicateSample { sample: "a".to_string() })
        );

        // once searching, a clear is required
        let _ = matrix.total_log_likelihood();
        assert_eq!(matrix.state(), MatrixState::Searching);
        assert_eq!(matrix.load("b", -1.0, -1.0, -1.0), Err(AfMatrixError::NotCleared));
        matrix.clear();
        assert_eq!(matrix.state(), MatrixState::Empty);
        matrix.load("b", -1.0, -1.0, -1.0).unwrap();
        assert_eq!(matrix.state(), MatrixState::Loading);
    }

    #[test]
    fn test_empty_matrix() {
        let mut matrix = AlleleFrequencyMatrix::new(0);
        assert!(matrix.is_empty());
        assert_eq!(matrix.total_log_likelihood(), 0.0);
        assert_eq!(matrix.advance_frequency(), Err(AfMatrixError::FrequencyOverflow { max_frequency: 0 }));
    }

    #[test]
    fn test_lookup_errors() {
        let mut matrix = two_sample_matrix();
        let _ = matrix.total_log_likelihood();
        assert!(matrix.is_recorded(0));
        assert!(!matrix.is_recorded(1));
        assert_eq!(matrix.genotype_at(1, "a"), Err(AfMatrixError::FrequencyNotRecorded { frequency: 1 }));
        assert_eq!(matrix.genotype_at(100, "a"), Err(AfMatrixError::FrequencyNotRecorded { frequency: 100 }));
        assert_eq!(matrix.genotype_at(0, "c"), Err(AfMatrixError::UnknownSample { sample: "c".to_string() }));
    }

    #[test]
    fn test_clear_resets() {
        let mut matrix = two_sample_matrix();
        let _ = matrix.total_log_likelihood();
        matrix.advance_frequency().unwrap();
        let _ = matrix.total_log_likelihood();
        matrix.clear();
        assert!(matrix.is_empty());
        assert_eq!(matrix.frequency(), 0);
        assert!(!matrix.is_recorded(0));
        assert!(!matrix.is_recorded(1));
        assert_eq!(matrix.samples().count(), 0);

        // reload in a different order
        matrix.load("b", -5.0, -1.0, -0.2).unwrap();
        matrix.load("a", -0.1, -3.0, -6.0).unwrap();
        assert_eq!(matrix.samples().collect::<Vec<&str>>(), vec!["b", "a"]);
        assert_eq!(matrix.cursors(), &[DiploidGenotype::HomozygousA; 2]);
    }

    #[test]
    fn test_confidence_matching_best() {
        // margin over the runner-up
        assert_approx_eq!(genotype_confidence(&[-1.0, -2.0, -5.0], DiploidGenotype::HomozygousA), 1.0);
        assert_approx_eq!(genotype_confidence(&[-5.0, -1.0, -0.2], DiploidGenotype::HomozygousB), 0.8);
        assert_approx_eq!(genotype_confidence(&[-4.0, -0.5, -3.0], DiploidGenotype::Heterozygous), 2.5);
    }

    #[test]
    fn test_confidence_overridden() {
        // assigned A/B while the sample prefers A/A
        let row = [-1.0, -2.0, -5.0];
        let total: f64 = 0.1 + 0.01 + 0.00001;
        let p = 0.01 / total;
        let expected = -(1.0_f64 - p).log10();
        assert_approx_eq!(genotype_confidence(&row, DiploidGenotype::Heterozygous), expected);
    }

    #[test]
    fn test_confidence_non_negative() {
        let rows = [
            [-1.0, -1.0, -1.0],
            [0.0, -0.3, -20.0],
            [-300.0, -0.01, -0.02],
            [0.0, f64::NEG_INFINITY, f64::NEG_INFINITY],
        ];
        for row in rows.iter() {
            for gt in DiploidGenotype::ALL {
                let confidence = genotype_confidence(row, gt);
                assert!(confidence >= 0.0, "{row:?} {gt:?} => {confidence}");
            }
        }
    }
}
