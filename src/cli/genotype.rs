use anyhow::ensure;
use clap::Args;
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use crate::af_model::AfCalculationModel;
use crate::cli::core::{check_required_filename, AFTER_HELP, FULL_VERSION};
use crate::priors::PriorModel;
use crate::site_caller::DEFAULT_HETEROZYGOSITY;

#[derive(Args, Clone, Default, Serialize)]
#[clap(author, about,
    after_help = &**AFTER_HELP
)]
pub struct GenotypeSettings {
    #[clap(default_value = "")]
    #[clap(hide = true)]
    gridaf_version: String,

    /// Input genotype likelihood table (TSV/CSV, optionally gzipped)
    #[clap(required = true)]
    #[clap(short = 'i')]
    #[clap(long = "input")]
    #[clap(value_name = "TSV")]
    #[clap(help_heading = Some("Input/Output"))]
    pub input_filename: PathBuf,

    /// Output per-sample genotype calls (TSV/CSV, optionally gzipped)
    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output-calls")]
    #[clap(value_name = "TSV")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_calls_filename: PathBuf,

    /// Output per-site summary file (TSV/CSV, optionally gzipped)
    #[clap(long = "output-sites")]
    #[clap(value_name = "TSV")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_sites_filename: Option<PathBuf>,

    /// Optional output debug folder
    #[clap(long = "output-debug")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub debug_folder: Option<PathBuf>,

    /// Allele frequency calculation model
    #[clap(long = "model")]
    #[clap(value_name = "MODEL")]
    #[clap(help_heading = Some("Calculation parameters"))]
    #[clap(default_value = "grid_search")]
    pub model: AfCalculationModel,

    /// Allele frequency prior
    #[clap(long = "prior")]
    #[clap(value_name = "PRIOR")]
    #[clap(help_heading = Some("Calculation parameters"))]
    #[clap(default_value = "neutral")]
    pub prior: PriorModel,

    /// Expected heterozygosity for the neutral prior
    #[clap(long = "heterozygosity")]
    #[clap(value_name = "FLOAT")]
    #[clap(help_heading = Some("Calculation parameters"))]
    #[clap(default_value_t = DEFAULT_HETEROZYGOSITY)]
    pub heterozygosity: f64,

    /// Number of threads to use, each thread solves whole sites
    #[clap(long = "threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    pub threads: usize,

    /// Enable verbose output.
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8,

    // Debug options that are generally hidden and just for quick testing
    /// Skips a number of sites (debug only); non-0 values may create partial values in output
    #[clap(hide = true)]
    #[clap(long = "skip")]
    #[clap(default_value = "0")]
    pub skip_sites: usize,

    /// Takes a number of sites (debug only); non-0 values may create partial values in output
    #[clap(hide = true)]
    #[clap(long = "take")]
    #[clap(default_value = "0")]
    pub take_sites: usize,
}

pub fn check_genotype_settings(mut settings: GenotypeSettings) -> anyhow::Result<GenotypeSettings> {
    // hard code the version in
    settings.gridaf_version = FULL_VERSION.clone();
    info!("gridaf version: {:?}", &settings.gridaf_version);
    info!("Sub-command: genotype");
    info!("Inputs:");

    check_required_filename(&settings.input_filename, "Likelihood table")?;
    info!("\tLikelihoods: {:?}", &settings.input_filename);

    // outputs
    info!("Outputs:");
    info!("\tCalls: {:?}", &settings.output_calls_filename);
    info!("\tSites: {:?}", &settings.output_sites_filename);
    if let Some(debug_folder) = settings.debug_folder.as_ref() {
        info!("\tDebug folder: {debug_folder:?}");
    }

    info!("Calculation parameters:");
    ensure!(settings.model != AfCalculationModel::Exact, "--model {} is not supported yet", settings.model);
    info!("\tModel: {}", settings.model);
    info!("\tPrior: {}", settings.prior);
    if settings.prior == PriorModel::InfiniteSitesNeutral {
        ensure!(
            settings.heterozygosity > 0.0 && settings.heterozygosity < 1.0,
            "--heterozygosity must be in (0, 1)"
        );
        info!("\tHeterozygosity: {}", settings.heterozygosity);
    }

    // 0 is just a sentinel for everything
    if settings.take_sites == 0 {
        settings.take_sites = usize::MAX;
    }
    if settings.threads == 0 {
        settings.threads = 1;
    }
    info!("Processing threads: {}", settings.threads);

    Ok(settings)
}
