//! Reader/Writer traits and format dispatch
//!
//! Readers turn an input file into [`RawRecord`]s; writers persist a
//! [`LayoutSnapshot`]. The [`FormatRegistry`] picks one by file extension.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::layout::LayoutSnapshot;
use crate::record::RawRecord;

/// Errors that can occur during reading or writing
#[derive(Error, Debug)]
pub enum IoError {
    /// The file format is not supported
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The file extension could not be determined
    #[error("could not determine file format from path: {0}")]
    UnknownExtension(String),

    /// An I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A parsing error occurred
    #[error("parse error: {0}")]
    Parse(String),

    /// A serialization error occurred
    #[error("write error: {0}")]
    Write(String),
}

/// Result type for reader/writer operations
pub type IoResult<T> = Result<T, IoError>;

/// A reader parses an input file into records
pub trait Reader {
    fn read(&self, input: &Path) -> IoResult<Vec<RawRecord>>;

    /// File extensions this reader can handle (e.g., ["yaml", "yml"])
    fn supported_extensions(&self) -> &[&str];

    /// Check if this reader can handle the given file extension
    fn supports_extension(&self, ext: &str) -> bool {
        self.supported_extensions()
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// A writer persists a layout snapshot in one format
pub trait Writer {
    fn write(&self, snapshot: &LayoutSnapshot, output: &Path) -> IoResult<()>;

    /// Identifier for this output format (e.g., "json")
    fn format_id(&self) -> &str;

    /// File extensions that select this writer
    fn supported_extensions(&self) -> &[&str];
}

/// Input documents are either a bare list or `{ records: [...] }`
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordDocument {
    List(Vec<RawRecord>),
    Wrapped { records: Vec<RawRecord> },
}

impl From<RecordDocument> for Vec<RawRecord> {
    fn from(document: RecordDocument) -> Self {
        match document {
            RecordDocument::List(records) | RecordDocument::Wrapped { records } => records,
        }
    }
}

/// Reads records from JSON
#[derive(Debug, Default)]
pub struct JsonReader;

impl JsonReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read_str(&self, content: &str) -> IoResult<Vec<RawRecord>> {
        serde_json::from_str::<RecordDocument>(content)
            .map(Into::into)
            .map_err(|e| IoError::Parse(e.to_string()))
    }
}

impl Reader for JsonReader {
    fn read(&self, input: &Path) -> IoResult<Vec<RawRecord>> {
        let content = fs::read_to_string(input)?;
        self.read_str(&content)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["json"]
    }
}

/// Reads records from YAML
#[derive(Debug, Default)]
pub struct YamlReader;

impl YamlReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read_str(&self, content: &str) -> IoResult<Vec<RawRecord>> {
        serde_yaml::from_str::<RecordDocument>(content)
            .map(Into::into)
            .map_err(|e| IoError::Parse(e.to_string()))
    }
}

impl Reader for YamlReader {
    fn read(&self, input: &Path) -> IoResult<Vec<RawRecord>> {
        let content = fs::read_to_string(input)?;
        self.read_str(&content)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["yaml", "yml"]
    }
}

/// Writes a snapshot as pretty-printed JSON
#[derive(Debug, Default)]
pub struct JsonWriter;

impl JsonWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Writer for JsonWriter {
    fn write(&self, snapshot: &LayoutSnapshot, output: &Path) -> IoResult<()> {
        let content =
            serde_json::to_string_pretty(snapshot).map_err(|e| IoError::Write(e.to_string()))?;
        fs::write(output, content)?;
        Ok(())
    }

    fn format_id(&self) -> &str {
        "json"
    }

    fn supported_extensions(&self) -> &[&str] {
        &["json"]
    }
}

/// Writes a snapshot as YAML
#[derive(Debug, Default)]
pub struct YamlWriter;

impl YamlWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Writer for YamlWriter {
    fn write(&self, snapshot: &LayoutSnapshot, output: &Path) -> IoResult<()> {
        let content =
            serde_yaml::to_string(snapshot).map_err(|e| IoError::Write(e.to_string()))?;
        fs::write(output, content)?;
        Ok(())
    }

    fn format_id(&self) -> &str {
        "yaml"
    }

    fn supported_extensions(&self) -> &[&str] {
        &["yaml", "yml"]
    }
}

/// Registry of available readers and writers
pub struct FormatRegistry {
    readers: Vec<Box<dyn Reader>>,
    writers: Vec<Box<dyn Writer>>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            readers: Vec::new(),
            writers: Vec::new(),
        }
    }

    /// Create a registry with the JSON and YAML readers and writers
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_reader(Box::new(JsonReader::new()));
        registry.register_reader(Box::new(YamlReader::new()));
        registry.register_writer(Box::new(JsonWriter::new()));
        registry.register_writer(Box::new(YamlWriter::new()));
        registry
    }

    pub fn register_reader(&mut self, reader: Box<dyn Reader>) {
        self.readers.push(reader);
    }

    pub fn register_writer(&mut self, writer: Box<dyn Writer>) {
        self.writers.push(writer);
    }

    /// Find a reader for the given file extension
    pub fn reader_for_extension(&self, ext: &str) -> Option<&dyn Reader> {
        self.readers
            .iter()
            .find(|r| r.supports_extension(ext))
            .map(|r| r.as_ref())
    }

    /// Find a writer by format ID
    pub fn writer_for_format(&self, format_id: &str) -> Option<&dyn Writer> {
        self.writers
            .iter()
            .find(|w| w.format_id().eq_ignore_ascii_case(format_id))
            .map(|w| w.as_ref())
    }

    /// Get file extension from a path
    pub fn extension_from_path(path: &Path) -> Option<&str> {
        path.extension().and_then(|e| e.to_str())
    }

    /// Find a reader for the given path based on its extension
    pub fn reader_for_path(&self, path: &Path) -> IoResult<&dyn Reader> {
        let ext = Self::extension_from_path(path)
            .ok_or_else(|| IoError::UnknownExtension(path.display().to_string()))?;

        self.reader_for_extension(ext)
            .ok_or_else(|| IoError::UnsupportedFormat(ext.to_string()))
    }

    /// Find a writer for the given output path based on its extension
    pub fn writer_for_path(&self, path: &Path) -> IoResult<&dyn Writer> {
        let ext = Self::extension_from_path(path)
            .ok_or_else(|| IoError::UnknownExtension(path.display().to_string()))?;

        self.writers
            .iter()
            .find(|w| {
                w.supported_extensions()
                    .iter()
                    .any(|e| e.eq_ignore_ascii_case(ext))
            })
            .map(|w| w.as_ref())
            .ok_or_else(|| IoError::UnsupportedFormat(ext.to_string()))
    }
}
