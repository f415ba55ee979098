use anyhow::Context;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::parsing::likelihood_table::LikelihoodSite;
use crate::site_caller::SiteResult;
use crate::writers::open_delimited_writer;

/// This is a wrapper for writing out per-sample genotype calls to a file
pub struct CallWriter {
    /// Handle on the writer
    csv_writer: csv::Writer<Box<dyn Write>>,
}

/// Contains all the data written to each row of our call file
#[derive(Serialize)]
struct CallRow<'a> {
    /// Site label from the input
    site_id: &'a str,
    /// Sample identifier
    sample: &'a str,
    /// Unphased GT string, e.g. 0/1
    genotype: &'static str,
    /// Alleles as sequences, e.g. A/G
    alleles: String,
    /// Log10-scaled confidence in the genotype
    confidence: f64,
    /// Phred-scaled genotype quality
    genotype_quality: f64,
    /// The allele frequency these genotypes are consistent with
    site_af: usize,
    /// Read depth, if provided
    depth: Option<usize>,
    /// The log10 likelihoods as "AA,AB,BB"
    log10_likelihoods: String
}

impl CallWriter {
    /// Creates a new call writer
    /// # Arguments
    /// * `filename` - path to the filename that will get opened, .csv/.tsv with optional .gz
    /// # Errors
    /// * if the file cannot be created
    pub fn new(filename: &Path) -> anyhow::Result<Self> {
        let csv_writer = open_delimited_writer(filename)?;
        Ok(Self {
            csv_writer
        })
    }

    /// Writes one row per sample for a solved site
    /// # Arguments
    /// * `site` - the input site, used for depth lookups
    /// * `result` - the calls for this site
    pub fn write_site_calls(&mut self, site: &LikelihoodSite, result: &SiteResult) -> csv::Result<()> {
        let site_af = result.allele_frequency().alt_alleles();
        for (sample, call) in result.calls().iter() {
            let row = CallRow {
                site_id: result.site_id(),
                sample,
                genotype: call.genotype().gt_string(),
                alleles: call.allele_string(),
                confidence: call.confidence(),
                genotype_quality: call.genotype_quality(),
                site_af,
                depth: site.depth(sample),
                log10_likelihoods: call.log10_likelihoods().iter()
                    .map(|l| format!("{l:.4}"))
                    .collect::<Vec<String>>()
                    .join(",")
            };
            self.csv_writer.serialize(&row)?;
        }
        Ok(())
    }

    /// Flushes everything out to disk
    pub fn finish(mut self) -> anyhow::Result<()> {
        self.csv_writer.flush()
            .context("Error while flushing genotype calls:")?;
        Ok(())
    }
}
