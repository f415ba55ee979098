/*!
# Writers module
Contains the logic for writing the delimited output files of the genotype command.
*/
/// Per-sample genotype calls
pub mod call_writer;
/// One line per site with the allele frequency outcome
pub mod site_summary;

use anyhow::Context;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Opens a delimited writer, using "," if the name ends in .csv (or .csv.gz) and tab otherwise.
/// A .gz extension will gzip the output.
/// # Arguments
/// * `filename` - the output path
/// # Errors
/// * if the file cannot be created
pub fn open_delimited_writer(filename: &Path) -> anyhow::Result<csv::Writer<Box<dyn Write>>> {
    let is_gzip = filename.extension().unwrap_or_default() == "gz";
    let inner_name = if is_gzip { filename.file_stem().map(Path::new) } else { Some(filename) };
    let is_csv = inner_name
        .and_then(|p| p.extension())
        .unwrap_or_default() == "csv";
    let delimiter: u8 = if is_csv { b',' } else { b'\t' };

    let file = File::create(filename)
        .with_context(|| format!("Error while creating {filename:?}:"))?;
    let handle: Box<dyn Write> = if is_gzip {
        Box::new(
            flate2::write::GzEncoder::new(file, flate2::Compression::default())
        )
    } else {
        Box::new(file)
    };

    let csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(handle);
    Ok(csv_writer)
}
