/// Greedy genotype assignment matrix that walks the allele frequency grid
pub mod af_matrix;
/// Shared allele frequency calculator contract and model selection
pub mod af_model;
/// Command line interface functionality
pub mod cli;
/// Contains various shared data types
pub mod data_types;
/// Grid search posterior estimation over allele frequencies
pub mod grid_search;
/// Tooling for parsing input files into meaningful structs / data
pub mod parsing;
/// Allele frequency priors
pub mod priors;
/// Per-site driver that combines priors, the calculator, and genotype calls
pub mod site_caller;
/// Various utility functions that tend to be very generic
pub mod util;
/// All output writers
pub mod writers;
