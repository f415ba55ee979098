/*!
# CLI module
Command line interface functionality that is specific to gridaf.
*/

/// The main CLI module that contains the top-level CLI parser and help text
pub mod core;
/// The genotype CLI subcommand
pub mod genotype;
