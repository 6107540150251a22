//! Output sinks: tab-separated text and Parquet, both written to a tmp file then renamed

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::RecordBatch;
use arrow::datatypes::Schema;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use serde::Deserialize;

use crate::batch::Batch;

/// Destination for finished batches.
pub trait BatchSink {
    /// Write `batch` as `name` (extension added by the sink), replacing any
    /// previous file of that name. Returns the final location.
    fn write(&mut self, name: &str, batch: &Batch) -> io::Result<PathBuf>;
}

/// On-disk batch format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Tsv,
    Parquet,
}

impl OutputFormat {
    /// Parse CLI/config string into enum
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "tsv" => Some(Self::Tsv),
            "parquet" => Some(Self::Parquet),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Tsv => "tsv",
            Self::Parquet => "parquet",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Build the sink for `format` writing into `output_dir`
pub fn make_sink(format: OutputFormat, output_dir: &Path, zstd_level: i32) -> Box<dyn BatchSink> {
    match format {
        OutputFormat::Tsv => Box::new(TsvSink::new(output_dir)),
        OutputFormat::Parquet => Box::new(ParquetSink::new(output_dir, zstd_level)),
    }
}

/// Create the output directory if absent and drop stale `.tmp` leftovers
pub fn prepare_output_dir(output_dir: &Path) -> io::Result<()> {
    fs::create_dir_all(output_dir)?;
    cleanup_tmp_files(output_dir)
}

/// Remove stale .tmp files in the output directory
pub fn cleanup_tmp_files(output_dir: &Path) -> io::Result<()> {
    for entry in fs::read_dir(output_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "tmp") {
            log::warn!("Removing stale tmp file: {}", path.display());
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

fn paths(output_dir: &Path, name: &str, ext: &str) -> (PathBuf, PathBuf) {
    let filename = format!("{name}.{ext}");
    let tmp = output_dir.join(format!("{filename}.tmp"));
    (tmp, output_dir.join(filename))
}

// === TSV ===

/// Tab-separated text: header row of column names, one line per row.
///
/// No quoting. Tabs and line breaks inside a cell become spaces so every
/// line keeps the same number of fields.
#[derive(Debug)]
pub struct TsvSink {
    output_dir: PathBuf,
}

impl TsvSink {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
        }
    }
}

fn escape_cell(cell: &str) -> std::borrow::Cow<'_, str> {
    if cell.contains(['\t', '\n', '\r']) {
        cell.replace(['\t', '\n', '\r'], " ").into()
    } else {
        cell.into()
    }
}

fn write_line<'a>(out: &mut impl Write, cells: impl Iterator<Item = &'a str>) -> io::Result<()> {
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            out.write_all(b"\t")?;
        }
        out.write_all(escape_cell(cell).as_bytes())?;
    }
    out.write_all(b"\n")
}

impl BatchSink for TsvSink {
    fn write(&mut self, name: &str, batch: &Batch) -> io::Result<PathBuf> {
        let (tmp_path, final_path) = paths(&self.output_dir, name, "tsv");
        let mut out = BufWriter::new(File::create(&tmp_path)?);
        write_line(&mut out, batch.columns().iter().map(String::as_str))?;
        for row in batch.rows() {
            write_line(&mut out, row.iter().map(String::as_str))?;
        }
        out.into_inner().map_err(io::IntoInnerError::into_error)?.sync_all()?;
        fs::rename(&tmp_path, &final_path)?;
        Ok(final_path)
    }
}

// === Parquet ===

/// Buffered parquet writer with atomic tmp→rename
pub struct ParquetFile {
    writer: ArrowWriter<File>,
    tmp_path: PathBuf,
    final_path: PathBuf,
    row_count: usize,
}

impl std::fmt::Debug for ParquetFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParquetFile")
            .field("final_path", &self.final_path)
            .field("row_count", &self.row_count)
            .finish_non_exhaustive()
    }
}

impl ParquetFile {
    /// Create a new file writing to a temporary path
    pub fn create(
        output_dir: &Path,
        name: &str,
        schema: &Schema,
        zstd_level: i32,
    ) -> io::Result<Self> {
        let (tmp_path, final_path) = paths(output_dir, name, "parquet");
        if tmp_path.exists() {
            fs::remove_file(&tmp_path)?;
        }

        let file = File::create(&tmp_path)?;
        let level = ZstdLevel::try_new(zstd_level)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::ZSTD(level))
            .build();

        let writer = ArrowWriter::try_new(file, Arc::new(schema.clone()), Some(props))
            .map_err(io::Error::other)?;

        Ok(Self {
            writer,
            tmp_path,
            final_path,
            row_count: 0,
        })
    }

    /// Write a record batch
    pub fn write_batch(&mut self, batch: &RecordBatch) -> io::Result<()> {
        self.row_count += batch.num_rows();
        self.writer.write(batch).map_err(io::Error::other)
    }

    /// Finalize: flush footer and atomically rename tmp → final
    pub fn finalize(self) -> io::Result<PathBuf> {
        log::debug!(
            "Finalizing {} ({} rows)",
            self.final_path.display(),
            self.row_count
        );
        self.writer.close().map_err(io::Error::other)?;
        fs::rename(&self.tmp_path, &self.final_path)?;
        Ok(self.final_path)
    }
}

/// One zstd-compressed parquet file per batch, every column `Utf8`
#[derive(Debug)]
pub struct ParquetSink {
    output_dir: PathBuf,
    zstd_level: i32,
}

impl ParquetSink {
    pub fn new(output_dir: &Path, zstd_level: i32) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            zstd_level,
        }
    }
}

impl BatchSink for ParquetSink {
    fn write(&mut self, name: &str, batch: &Batch) -> io::Result<PathBuf> {
        let record_batch = batch.to_record_batch().map_err(io::Error::other)?;
        let mut file =
            ParquetFile::create(&self.output_dir, name, &batch.schema(), self.zstd_level)?;
        file.write_batch(&record_batch)?;
        file.finalize()
    }
}

/// Check if a completed parquet file exists and has a valid footer
pub fn is_valid_parquet(path: &Path) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    parquet::file::reader::SerializedFileReader::new(file).is_ok()
}
