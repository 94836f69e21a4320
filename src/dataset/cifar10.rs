//! CIFAR-10 download and binary record parsing
//!
//! The binary distribution stores each split as fixed-size records:
//! one label byte followed by 1024 red, 1024 green and 1024 blue bytes
//! (row-major 32x32 planes). That layout is already CHW, so records are kept
//! as-is and only converted to floats by the batcher.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::utils::error::{CifarError, Result};
use crate::NUM_CLASSES;

/// Source archive for the binary distribution
pub const CIFAR10_URL: &str = "https://www.cs.toronto.edu/~kriz/cifar-10-binary.tar.gz";

/// Archive file name inside the data directory
pub const ARCHIVE_NAME: &str = "cifar-10-binary.tar.gz";

/// Directory the archive unpacks into
pub const BATCHES_DIR: &str = "cifar-10-batches-bin";

/// Training batch files
pub const TRAIN_FILES: [&str; 5] = [
    "data_batch_1.bin",
    "data_batch_2.bin",
    "data_batch_3.bin",
    "data_batch_4.bin",
    "data_batch_5.bin",
];

/// Test batch file
pub const TEST_FILE: &str = "test_batch.bin";

const TEST_FILES: [&str; 1] = [TEST_FILE];

/// Bytes per image (3 x 32 x 32)
pub const IMAGE_BYTES: usize = 3 * 32 * 32;

/// Bytes per record (label + image)
pub const RECORD_BYTES: usize = 1 + IMAGE_BYTES;

/// Which half of the benchmark to load
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    /// Record files belonging to this split, in load order
    pub fn files(&self) -> &'static [&'static str] {
        match self {
            Split::Train => &TRAIN_FILES,
            Split::Test => &TEST_FILES,
        }
    }
}

impl std::fmt::Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Split::Train => write!(f, "train"),
            Split::Test => write!(f, "test"),
        }
    }
}

/// A single labeled image
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cifar10Item {
    /// Pixel planes in CHW order, `IMAGE_BYTES` long
    pub image: Vec<u8>,
    /// Class label (0-9)
    pub label: usize,
}

impl Cifar10Item {
    pub fn new(image: Vec<u8>, label: usize) -> Self {
        Self { image, label }
    }

    /// Encode back into the on-disk record layout
    pub fn to_record(&self) -> Vec<u8> {
        let mut record = Vec::with_capacity(RECORD_BYTES);
        record.push(self.label as u8);
        record.extend_from_slice(&self.image);
        record
    }
}

/// Parse a buffer of concatenated records
pub fn parse_records(bytes: &[u8]) -> Result<Vec<Cifar10Item>> {
    if bytes.len() % RECORD_BYTES != 0 {
        return Err(CifarError::Dataset(format!(
            "buffer of {} bytes is not a whole number of {}-byte records",
            bytes.len(),
            RECORD_BYTES
        )));
    }

    bytes
        .chunks_exact(RECORD_BYTES)
        .enumerate()
        .map(|(i, record)| {
            let label = record[0] as usize;
            if label >= NUM_CLASSES {
                return Err(CifarError::Dataset(format!(
                    "record {} has label {} outside 0..{}",
                    i, label, NUM_CLASSES
                )));
            }
            Ok(Cifar10Item::new(record[1..].to_vec(), label))
        })
        .collect()
}

/// Load every record of a split from an unpacked batches directory
pub fn load_split(batches_dir: &Path, split: Split) -> Result<Vec<Cifar10Item>> {
    let mut items = Vec::new();

    for name in split.files() {
        let path = batches_dir.join(name);
        if !path.exists() {
            return Err(CifarError::PathNotFound(path));
        }
        let bytes = fs::read(&path)?;
        let parsed = parse_records(&bytes)
            .map_err(|e| CifarError::Dataset(format!("{}: {}", path.display(), e)))?;
        debug!("Loaded {} records from {}", parsed.len(), path.display());
        items.extend(parsed);
    }

    Ok(items)
}

/// Write a split in the binary record format
///
/// Training items are spread over the five batch files in order; the test
/// split goes to a single file.
pub fn write_split(batches_dir: &Path, split: Split, items: &[Cifar10Item]) -> Result<()> {
    fs::create_dir_all(batches_dir)?;

    let files = split.files();
    let per_file = items.len().div_ceil(files.len()).max(1);
    let mut chunks = items.chunks(per_file);

    for name in files {
        let mut file = File::create(batches_dir.join(name))?;
        if let Some(chunk) = chunks.next() {
            for item in chunk {
                file.write_all(&item.to_record())?;
            }
        }
    }

    Ok(())
}

/// Make sure the dataset is unpacked under `data_dir`, downloading it on
/// first use. Returns the batches directory.
pub fn ensure_downloaded(data_dir: &Path) -> Result<PathBuf> {
    let batches_dir = data_dir.join(BATCHES_DIR);
    if batches_dir.exists() {
        debug!("CIFAR-10 already present at {}", batches_dir.display());
        return Ok(batches_dir);
    }

    fs::create_dir_all(data_dir)?;
    let archive = data_dir.join(ARCHIVE_NAME);

    if archive.exists() {
        info!("CIFAR-10 archive already downloaded, skipping fetch");
    } else {
        fetch_archive(CIFAR10_URL, &archive)?;
    }

    info!("Extracting {}", archive.display());
    extract_archive(&archive, data_dir)?;

    if !batches_dir.exists() {
        return Err(CifarError::Download(format!(
            "archive did not contain {}",
            BATCHES_DIR
        )));
    }

    Ok(batches_dir)
}

fn fetch_archive(url: &str, dest: &Path) -> Result<()> {
    info!("Downloading CIFAR-10 from {}", url);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg} [{elapsed_precise}]")
            .map_err(|e| CifarError::Download(e.to_string()))?,
    );
    spinner.set_message("Downloading CIFAR-10");
    spinner.enable_steady_tick(Duration::from_millis(120));

    let mut response = reqwest::blocking::get(url)
        .and_then(|response| response.error_for_status())
        .map_err(|e| CifarError::Download(format!("{}: {}", url, e)))?;

    let written = stream_to_file(&mut response, dest)
        .map_err(|e| CifarError::Download(format!("{}: {}", url, e)))?;

    spinner.finish_with_message(format!("Downloaded {} bytes", written));
    Ok(())
}

/// Copy `reader` into `dest` through a sibling `.partial` file
///
/// `dest` only appears once the copy completed; a failed copy removes the
/// partial file.
fn stream_to_file<R: Read>(reader: &mut R, dest: &Path) -> Result<u64> {
    let partial = dest.with_extension("partial");

    let copied = File::create(&partial).and_then(|mut file| {
        let written = io::copy(reader, &mut file)?;
        file.sync_all()?;
        Ok(written)
    });

    match copied {
        Ok(written) => {
            fs::rename(&partial, dest)?;
            debug!("Wrote {} bytes to {}", written, dest.display());
            Ok(written)
        }
        Err(e) => {
            let _ = fs::remove_file(&partial);
            Err(e.into())
        }
    }
}

fn extract_archive(archive: &Path, output_dir: &Path) -> Result<()> {
    let file = File::open(archive)?;
    let decoder = flate2::read::GzDecoder::new(file);
    tar::Archive::new(decoder)
        .unpack(output_dir)
        .map_err(|e| CifarError::Download(format!("failed to extract {}: {}", archive.display(), e)))
}
