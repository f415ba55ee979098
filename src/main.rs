use indicatif::ParallelProgressIterator;
use log::{LevelFilter, debug, error, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::time::Instant;

use gridaf::cli::core::{Commands, FULL_VERSION, get_cli};
use gridaf::cli::genotype::{GenotypeSettings, check_genotype_settings};
use gridaf::parsing::likelihood_table::{LikelihoodSite, load_likelihood_table};
use gridaf::site_caller::{SiteCaller, SiteCallerConfigBuilder, SiteResult};
use gridaf::util::json_io::save_json;
use gridaf::util::progress_bar::get_progress_style;
use gridaf::writers::call_writer::CallWriter;
use gridaf::writers::site_summary::SiteSummaryWriter;

/// Top-level counts for a run, saved into the debug folder
#[derive(Serialize)]
struct RunSummary {
    gridaf_version: String,
    total_sites: usize,
    solved_sites: usize,
    error_sites: usize,
    variant_sites: usize,
    early_exit_sites: usize,
    elapsed_seconds: f64
}

fn run_genotype(settings: GenotypeSettings) {
    // start the timer
    let start_time = Instant::now();

    // set up logging before we check the other settings
    let filter_level: LevelFilter = match settings.verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();

    let settings = match check_genotype_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    // set up the number of threads for rayon
    match rayon::ThreadPoolBuilder::new().num_threads(settings.threads).build_global() {
        Ok(()) => {},
        Err(e) => {
            error!("Error while building thread pool: {e}");
            std::process::exit(exitcode::OSERR);
        }
    };

    // create a debug folder if specified
    if let Some(debug_folder) = settings.debug_folder.as_ref() {
        info!("Creating debug folder at {debug_folder:?}...");
        match std::fs::create_dir_all(debug_folder) {
            Ok(()) => {},
            Err(e) => {
                error!("Error while creating debug folder: {e}");
                std::process::exit(exitcode::IOERR);
            }
        }

        // save the CLI options
        let cli_json = debug_folder.join("cli_settings.json");
        info!("Saving CLI options to {cli_json:?}...");
        if let Err(e) = save_json(&settings, &cli_json) {
            error!("Error while saving CLI options: {e}");
            std::process::exit(exitcode::IOERR);
        }
    }

    // load all the likelihoods up front; this is currently single-threaded
    info!("Loading genotype likelihoods...");
    let all_sites: Vec<LikelihoodSite> = match load_likelihood_table(&settings.input_filename) {
        Ok(sites) => sites,
        Err(e) => {
            error!("Error while loading genotype likelihoods: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    };

    // check if we're in debug mode
    let skip_count = settings.skip_sites;
    let take_count = settings.take_sites;
    if skip_count != 0 || take_count != usize::MAX {
        warn!("Debug run detected, output may be truncated.");
        warn!("Sites to skip: {skip_count}");
        warn!("Sites to process: {take_count}");
    }
    let all_sites: Vec<LikelihoodSite> = all_sites.into_iter()
        .skip(skip_count)
        .take(take_count)
        .collect();
    let max_samples = all_sites.iter().map(|s| s.num_samples()).max().unwrap_or(0);
    info!("Loaded {} sites with up to {max_samples} samples.", all_sites.len());

    // build our configuration
    let caller_config = match SiteCallerConfigBuilder::default()
        .model(settings.model)
        .prior_model(settings.prior)
        .heterozygosity(settings.heterozygosity)
        .build() {
        Ok(cc) => cc,
        Err(e) => {
            error!("Error while building caller config: {e:?}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };

    // make sure the model is usable before spinning up workers
    if let Err(e) = SiteCaller::new(caller_config, max_samples) {
        error!("Error while building allele frequency calculator: {e}");
        std::process::exit(exitcode::SOFTWARE);
    }

    // each worker gets its own caller, they are not shareable
    let style = get_progress_style();
    info!("Calling sites...");
    let all_results: Vec<(LikelihoodSite, Option<SiteResult>)> = all_sites.into_par_iter()
        .map_init(
            || SiteCaller::new(caller_config, max_samples),
            |caller, site| {
                let result = match caller.as_mut() {
                    Ok(c) => match c.call_site(site.site_id(), site.genotype_likelihoods()) {
                        Ok(r) => Some(r),
                        Err(e) => {
                            error!("Error while solving site {}: {e:#}", site.site_id());
                            None
                        }
                    },
                    Err(e) => {
                        error!("Error while building allele frequency calculator: {e}");
                        None
                    }
                };
                debug!("Result = {result:?}");
                (site, result)
            }
        )
        .progress_with_style(style)
        .collect();
    info!("Site calling complete, saving all outputs...");

    let mut call_writer = match CallWriter::new(&settings.output_calls_filename) {
        Ok(w) => w,
        Err(e) => {
            error!("Error while creating call writer: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    };
    let mut site_writer = settings.output_sites_filename.as_deref().map(|sites_fn| {
        match SiteSummaryWriter::new(sites_fn) {
            Ok(w) => w,
            Err(e) => {
                error!("Error while creating site summary writer: {e:#}");
                std::process::exit(exitcode::IOERR);
            }
        }
    });

    // iterate over each output and save the relevant info
    let total_sites = all_results.len();
    let mut solved_sites = 0;
    let mut error_sites = 0;
    let mut variant_sites = 0;
    let mut early_exit_sites = 0;
    for (site, opt_result) in all_results.iter() {
        let Some(result) = opt_result else {
            error_sites += 1;
            continue;
        };

        if let Err(e) = call_writer.write_site_calls(site, result) {
            error!("Error while writing genotype calls: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
        if let Some(writer) = site_writer.as_mut() {
            if let Err(e) = writer.write_site(result) {
                error!("Error while writing site summary: {e:#}");
                std::process::exit(exitcode::IOERR);
            }
        }

        solved_sites += 1;
        if result.allele_frequency().alt_alleles() > 0 {
            variant_sites += 1;
        }
        if result.exited_early() {
            early_exit_sites += 1;
        }
    }
    info!("Solved:error sites: {solved_sites} : {error_sites}");
    info!("Sites with AF > 0: {variant_sites}");
    info!("Sites with early exit: {early_exit_sites}");

    if let Err(e) = call_writer.finish() {
        error!("{e:#}");
        std::process::exit(exitcode::IOERR);
    }
    if let Some(writer) = site_writer {
        if let Err(e) = writer.finish() {
            error!("{e:#}");
            std::process::exit(exitcode::IOERR);
        }
    }

    if let Some(debug_folder) = settings.debug_folder.as_ref() {
        let summary = RunSummary {
            gridaf_version: FULL_VERSION.clone(),
            total_sites,
            solved_sites,
            error_sites,
            variant_sites,
            early_exit_sites,
            elapsed_seconds: start_time.elapsed().as_secs_f64()
        };
        let summary_json = debug_folder.join("run_summary.json");
        info!("Saving run summary to {summary_json:?}...");
        if let Err(e) = save_json(&summary, &summary_json) {
            error!("Error while saving run summary: {e:#}");
            std::process::exit(exitcode::IOERR);
        }

        // full per-site detail, including the posterior vectors
        let site_json = debug_folder.join("site_results.json.gz");
        let solved: Vec<&SiteResult> = all_results.iter()
            .filter_map(|(_site, r)| r.as_ref())
            .collect();
        info!("Saving site results to {site_json:?}...");
        if let Err(e) = save_json(&solved, &site_json) {
            error!("Error while saving site results: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    }

    info!("Genotyping completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

fn main() {
    let cli = get_cli();
    match cli.command {
        Commands::Genotype(settings) => {
            run_genotype(*settings);
        }
    }

    info!("Process finished successfully.");
}
