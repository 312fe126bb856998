//! Feed acquisition
//!
//! Opens a local capture file for replay. Paths ending in `.gz` are
//! decompressed on the fly, so multi-gigabyte captures never need a
//! staging copy on disk.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::Context;
use flate2::read::GzDecoder;

/// Open `path` as a byte stream, picking gzip decompression by file
/// extension. Reads are buffered either way; the frame reader issues
/// many small reads.
pub fn open_feed(path: &Path) -> Result<Box<dyn Read>, anyhow::Error> {
    let file = File::open(path)
        .with_context(|| format!("unable to open feed file {}", path.display()))?;

    let gzipped = path.extension().map(|ext| ext == "gz").unwrap_or(false);
    let reader: Box<dyn Read> = if gzipped {
        Box::new(BufReader::new(GzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(reader)
}
