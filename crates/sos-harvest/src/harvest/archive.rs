//! Package readers
//!
//! [`PackageOpener`] handles the two package layouts the bundled providers
//! deliver: Darwin Core archives (zip with `eml.xml` and a tab-delimited
//! `occurrence.txt`) and NORS JSON exports. Record batches are produced
//! lazily and can be read more than once.

use futures::stream::{self, BoxStream, StreamExt};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{HarvestError, Result};
use crate::models::PackageFormat;
use crate::verbatim::{DwcVerbatimObservation, NorsVerbatimObservation, VerbatimRecord};

const METADATA_FILE: &str = "eml.xml";
const OCCURRENCE_FILE: &str = "occurrence.txt";

pub type RecordBatches = BoxStream<'static, Result<Vec<VerbatimRecord>>>;

/// Opens a downloaded package
pub trait ArchiveOpener: Send + Sync {
    fn open(
        &self,
        package: &Path,
        format: PackageFormat,
        work_dir: &Path,
    ) -> Result<Box<dyn ArchiveReader>>;
}

/// Access to one opened package
pub trait ArchiveReader: Send + Sync {
    /// Raw metadata document, if the package has one
    fn open_metadata(&self) -> Result<Option<String>>;

    /// Records in batches of `page_size`; every call starts from the first record
    fn read_batches(&self, page_size: usize) -> Result<RecordBatches>;
}

/// Groups a record iterator into batches, stopping after the first error
struct Batches<I> {
    records: I,
    page_size: usize,
    failed: bool,
}

impl<I> Iterator for Batches<I>
where
    I: Iterator<Item = Result<VerbatimRecord>>,
{
    type Item = Result<Vec<VerbatimRecord>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let mut batch = Vec::with_capacity(self.page_size);
        for record in self.records.by_ref() {
            match record {
                Ok(record) => batch.push(record),
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
            if batch.len() >= self.page_size {
                break;
            }
        }
        (!batch.is_empty()).then_some(Ok(batch))
    }
}

/// Every page is read on the blocking pool
fn batched<I>(records: I, page_size: usize) -> RecordBatches
where
    I: Iterator<Item = Result<VerbatimRecord>> + Send + 'static,
{
    let pages = Batches {
        records,
        page_size: page_size.max(1),
        failed: false,
    };

    stream::unfold(Some(pages), |pages| async move {
        let mut pages = pages?;
        let read = tokio::task::spawn_blocking(move || {
            let page = pages.next();
            (pages, page)
        })
        .await;

        match read {
            Ok((pages, Some(page))) => Some((page, Some(pages))),
            Ok((_, None)) => None,
            Err(e) => Some((Err(HarvestError::from(e)), None)),
        }
    })
    .boxed()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PackageOpener;

impl ArchiveOpener for PackageOpener {
    fn open(
        &self,
        package: &Path,
        format: PackageFormat,
        work_dir: &Path,
    ) -> Result<Box<dyn ArchiveReader>> {
        match format {
            PackageFormat::DarwinCoreArchive => Ok(Box::new(DwcArchiveReader::unpack(package, work_dir)?)),
            PackageFormat::NorsJson => Ok(Box::new(NorsJsonReader::new(package))),
        }
    }
}

/// Unpacked Darwin Core archive
#[derive(Debug)]
pub struct DwcArchiveReader {
    directory: PathBuf,
    occurrence_file: PathBuf,
}

impl DwcArchiveReader {
    pub fn unpack(package: &Path, work_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(work_dir)?;
        let mut archive = zip::ZipArchive::new(File::open(package)?)?;
        archive.extract(work_dir)?;
        info!(
            package = %package.display(),
            files = archive.len(),
            "Unpacked Darwin Core archive"
        );

        let occurrence_file = find_file(work_dir, OCCURRENCE_FILE)?.ok_or_else(|| {
            HarvestError::Parse(format!("{} missing from {}", OCCURRENCE_FILE, package.display()))
        })?;

        Ok(Self {
            directory: work_dir.to_path_buf(),
            occurrence_file,
        })
    }
}

/// Case-insensitive lookup of a file name in a directory and its immediate subdirectories
fn find_file(dir: &Path, name: &str) -> Result<Option<PathBuf>> {
    let mut subdirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if path
            .file_name()
            .map_or(false, |f| f.to_string_lossy().eq_ignore_ascii_case(name))
        {
            return Ok(Some(path));
        }
    }
    for subdir in subdirs {
        if let Some(found) = find_file_shallow(&subdir, name)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

fn find_file_shallow(dir: &Path, name: &str) -> Result<Option<PathBuf>> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file()
            && path
                .file_name()
                .map_or(false, |f| f.to_string_lossy().eq_ignore_ascii_case(name))
        {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

impl ArchiveReader for DwcArchiveReader {
    fn open_metadata(&self) -> Result<Option<String>> {
        match find_file(&self.directory, METADATA_FILE)? {
            Some(path) => Ok(Some(std::fs::read_to_string(path)?)),
            None => Ok(None),
        }
    }

    fn read_batches(&self, page_size: usize) -> Result<RecordBatches> {
        let reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .quoting(false)
            .flexible(true)
            .from_path(&self.occurrence_file)?;
        debug!(file = %self.occurrence_file.display(), page_size, "Reading occurrences");

        let records = reader
            .into_deserialize::<DwcVerbatimObservation>()
            .zip(1u64..)
            .map(|(row, record_id)| {
                row.map(|mut record| {
                    record.record_id = record_id;
                    VerbatimRecord::Dwc(record)
                })
                .map_err(HarvestError::from)
            });
        Ok(batched(records, page_size))
    }
}

/// NORS export: a JSON array of observations
#[derive(Debug)]
pub struct NorsJsonReader {
    path: PathBuf,
}

impl NorsJsonReader {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl ArchiveReader for NorsJsonReader {
    fn open_metadata(&self) -> Result<Option<String>> {
        Ok(None)
    }

    fn read_batches(&self, page_size: usize) -> Result<RecordBatches> {
        let file = BufReader::new(File::open(&self.path)?);
        let observations: Vec<NorsVerbatimObservation> = serde_json::from_reader(file)?;
        debug!(file = %self.path.display(), records = observations.len(), "Read NORS export");

        let records = observations
            .into_iter()
            .zip(1u64..)
            .map(|(mut record, record_id)| {
                record.record_id = record_id;
                Ok(VerbatimRecord::Nors(record))
            });
        Ok(batched(records, page_size))
    }
}
