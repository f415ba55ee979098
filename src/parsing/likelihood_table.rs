use anyhow::{bail, ensure, Context};
use indexmap::IndexMap;
use itertools::Itertools;
use log::debug;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use std::fs::File;
use std::path::Path;

use crate::data_types::genotype_likelihoods::BiallelicGenotypeLikelihoods;

/// One row of the input table; one sample at one site
#[derive(Debug, Deserialize)]
struct LikelihoodRow {
    /// Site label, rows for a site must be consecutive
    site_id: String,
    /// Sample identifier
    sample: String,
    /// A allele sequence
    allele_a: String,
    /// B allele sequence
    allele_b: String,
    /// log10 likelihood of A/A
    gl_aa: f64,
    /// log10 likelihood of A/B
    gl_ab: f64,
    /// log10 likelihood of B/B
    gl_bb: f64,
    /// Optional genotype-prior-adjusted log10 value of A/A; all three or none
    #[serde(default)]
    gp_aa: Option<f64>,
    /// Optional genotype-prior-adjusted log10 value of A/B
    #[serde(default)]
    gp_ab: Option<f64>,
    /// Optional genotype-prior-adjusted log10 value of B/B
    #[serde(default)]
    gp_bb: Option<f64>,
    /// Optional usable read depth for the sample
    #[serde(default)]
    depth: Option<usize>
}

/// All the likelihoods provided for a single biallelic site
#[derive(Clone, Debug)]
pub struct LikelihoodSite {
    /// Label from the input
    site_id: String,
    /// One record per sample, in input order
    genotype_likelihoods: Vec<BiallelicGenotypeLikelihoods>,
    /// Depth per sample if provided, keyed by sample in input order
    depths: IndexMap<String, Option<usize>>
}

impl LikelihoodSite {
    /// Constructor
    /// # Arguments
    /// * `site_id` - label for the site
    /// * `genotype_likelihoods` - one record per sample
    /// * `depths` - depth per record, parallel to `genotype_likelihoods`
    /// # Errors
    /// * if the depths and likelihoods have different lengths
    /// * if a sample shows up more than once
    pub fn new(site_id: String, genotype_likelihoods: Vec<BiallelicGenotypeLikelihoods>, depths: Vec<Option<usize>>) -> anyhow::Result<Self> {
        ensure!(
            genotype_likelihoods.len() == depths.len(),
            "Site {site_id:?} has {} likelihood records but {} depths",
            genotype_likelihoods.len(), depths.len()
        );

        let mut depth_lookup: IndexMap<String, Option<usize>> = IndexMap::with_capacity(depths.len());
        for (gl, depth) in genotype_likelihoods.iter().zip(depths) {
            if depth_lookup.insert(gl.sample().to_string(), depth).is_some() {
                bail!("Sample {:?} appears more than once at site {site_id:?}", gl.sample());
            }
        }

        Ok(Self {
            site_id,
            genotype_likelihoods,
            depths: depth_lookup
        })
    }

    /// Number of samples at this site
    pub fn num_samples(&self) -> usize {
        self.genotype_likelihoods.len()
    }

    /// Depth for a given sample, None if unknown or not provided
    pub fn depth(&self, sample: &str) -> Option<usize> {
        self.depths.get(sample).copied().flatten()
    }

    // getters
    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn genotype_likelihoods(&self) -> &[BiallelicGenotypeLikelihoods] {
        &self.genotype_likelihoods
    }
}

/// Loads a full likelihood table into memory, grouped by site.
/// The file is tab-delimited unless the name ends in .csv (or .csv.gz), and gzip is detected by a .gz extension.
/// Expected header: `site_id, sample, allele_a, allele_b, gl_aa, gl_ab, gl_bb`.
/// Optional columns are `depth` and the genotype-prior-adjusted `gp_aa, gp_ab, gp_bb`, which the allele frequency search uses in place of the likelihoods.
/// # Arguments
/// * `filename` - the table to load
/// # Errors
/// * if the file cannot be opened or a row fails to parse
/// * if a row has invalid likelihoods, or only some of the gp columns
/// * if a sample is repeated within a site
/// * if rows for a site are not consecutive
pub fn load_likelihood_table(filename: &Path) -> anyhow::Result<Vec<LikelihoodSite>> {
    let is_gzip = filename.extension().unwrap_or_default() == "gz";
    let inner_name = if is_gzip { filename.file_stem().map(Path::new) } else { Some(filename) };
    let is_csv = inner_name
        .and_then(|p| p.extension())
        .unwrap_or_default() == "csv";
    let delimiter: u8 = if is_csv { b',' } else { b'\t' };

    let file = File::open(filename)
        .with_context(|| format!("Error while opening {filename:?}:"))?;
    let reader: Box<dyn std::io::Read> = if is_gzip {
        Box::new(flate2::read::MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut rows: Vec<LikelihoodRow> = vec![];
    for (i, result) in csv_reader.deserialize().enumerate() {
        let row: LikelihoodRow = result
            .with_context(|| format!("Error while parsing row {} of {filename:?}:", i + 1))?;
        rows.push(row);
    }
    debug!("Loaded {} likelihood rows from {filename:?}", rows.len());

    let mut sites: Vec<LikelihoodSite> = vec![];
    let mut observed: FxHashSet<String> = Default::default();
    for (site_id, group) in &rows.into_iter().chunk_by(|r| r.site_id.clone()) {
        if !observed.insert(site_id.clone()) {
            bail!("Rows for site {site_id:?} are not consecutive in {filename:?}");
        }

        let mut gls = vec![];
        let mut depths = vec![];
        for row in group {
            let likelihoods = [row.gl_aa, row.gl_ab, row.gl_bb];
            let posteriors = match (row.gp_aa, row.gp_ab, row.gp_bb) {
                (Some(aa), Some(ab), Some(bb)) => [aa, ab, bb],
                (None, None, None) => likelihoods,
                _ => bail!("Sample {:?} at site {site_id:?} has a partial set of gp values", row.sample)
            };
            let gl = BiallelicGenotypeLikelihoods::with_posteriors(
                row.sample, row.allele_a.into_bytes(), row.allele_b.into_bytes(),
                likelihoods, posteriors
            ).with_context(|| format!("Error while loading likelihoods for site {site_id:?}:"))?;
            gls.push(gl);
            depths.push(row.depth);
        }
        sites.push(LikelihoodSite::new(site_id, gls, depths)?);
    }

    Ok(sites)
}
