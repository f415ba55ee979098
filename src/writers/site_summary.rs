use anyhow::Context;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::site_caller::SiteResult;
use crate::writers::open_delimited_writer;

/// Writes one line per site with the allele frequency outcome
pub struct SiteSummaryWriter {
    /// Handle on the writer
    csv_writer: csv::Writer<Box<dyn Write>>,
    /// Number of sites written so far
    sites_written: usize,
    /// Number of written sites with AF > 0
    variant_sites: usize
}

/// Contains all the data written to each row of our site file
#[derive(Serialize)]
struct SiteSummaryRow<'a> {
    /// Site label from the input
    site_id: &'a str,
    /// Number of samples at the site
    num_samples: usize,
    /// Chosen alternate allele count
    alt_alleles: usize,
    /// Maximum possible alternate allele count, 2N
    max_alt_alleles: usize,
    /// Normalized log10 P(AF > 0)
    log10_p_non_ref: f64,
    /// Phred-scaled variant quality
    qual: f64,
    /// Highest allele frequency that was evaluated
    max_evaluated_af: usize,
    /// True if the search stopped before 2N
    early_exit: bool
}

impl SiteSummaryWriter {
    /// Creates a new site writer
    /// # Arguments
    /// * `filename` - path to the filename that will get opened, .csv/.tsv with optional .gz
    /// # Errors
    /// * if the file cannot be created
    pub fn new(filename: &Path) -> anyhow::Result<Self> {
        let csv_writer = open_delimited_writer(filename)?;
        Ok(Self {
            csv_writer,
            sites_written: 0,
            variant_sites: 0
        })
    }

    /// Adds the summary row for a site
    pub fn write_site(&mut self, result: &SiteResult) -> csv::Result<()> {
        let af = result.allele_frequency();
        let row = SiteSummaryRow {
            site_id: result.site_id(),
            num_samples: result.num_samples(),
            alt_alleles: af.alt_alleles(),
            max_alt_alleles: 2 * result.num_samples(),
            log10_p_non_ref: af.log10_p_non_ref(),
            qual: af.phred_quality(),
            max_evaluated_af: result.max_evaluated_af(),
            early_exit: result.exited_early()
        };
        self.csv_writer.serialize(&row)?;

        self.sites_written += 1;
        if af.alt_alleles() > 0 {
            self.variant_sites += 1;
        }
        Ok(())
    }

    /// Flushes everything out to disk
    pub fn finish(mut self) -> anyhow::Result<()> {
        self.csv_writer.flush()
            .context("Error while flushing site summary:")?;
        Ok(())
    }

    // getters
    pub fn sites_written(&self) -> usize {
        self.sites_written
    }

    pub fn variant_sites(&self) -> usize {
        self.variant_sites
    }
}
