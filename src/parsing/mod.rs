/*!
# Parsing module
Contains the logic for parsing input files into per-site genotype likelihoods.
*/
/// Parser for the delimited genotype likelihood tables
pub mod likelihood_table;
