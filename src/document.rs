use crate::error::{RagError, Result};
use calamine::{open_workbook_auto, Reader};
use log::{debug, info, warn};
use mime_guess::from_path;
use std::fs;
use std::path::{Path, PathBuf};

/// Default name of the plain-text corpus file
pub const DEFAULT_TEXT_FILE: &str = "Company_sample.txt";
/// Default name of the spreadsheet corpus file
pub const DEFAULT_SPREADSHEET_FILE: &str = "company_data.xlsx";

/// Represents a loaded document with its source metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// The text content of the document
    pub text: String,
    /// Where the text came from (file name, or `file#sheet` for workbooks)
    pub source_id: String,
}

impl Document {
    pub fn new(text: impl Into<String>, source_id: impl Into<String>) -> Self {
        Document {
            text: text.into(),
            source_id: source_id.into(),
        }
    }
}

/// Locations of the two corpus files
#[derive(Debug, Clone)]
pub struct CorpusPaths {
    pub text: PathBuf,
    pub spreadsheet: PathBuf,
}

impl CorpusPaths {
    /// Resolve both corpus files inside one directory
    pub fn in_dir<P: AsRef<Path>>(dir: P, text_file: &str, spreadsheet_file: &str) -> Self {
        let dir = dir.as_ref();
        CorpusPaths {
            text: dir.join(text_file),
            spreadsheet: dir.join(spreadsheet_file),
        }
    }

    /// Fail with `MissingData` naming every absent file
    pub fn ensure_present(&self) -> Result<()> {
        let missing: Vec<PathBuf> = [&self.text, &self.spreadsheet]
            .into_iter()
            .filter(|path| !path.exists())
            .cloned()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(RagError::MissingData { missing })
        }
    }
}

/// Load the text file followed by the spreadsheet.
///
/// Both files are checked before either is opened.
pub fn load_corpus(paths: &CorpusPaths) -> Result<Vec<Document>> {
    paths.ensure_present()?;

    let mut documents = load_file(&paths.text)?;
    documents.extend(load_file(&paths.spreadsheet)?);

    info!("Loaded {} documents", documents.len());
    Ok(documents)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Text,
    Delimited(u8),
    Workbook,
}

/// Load one file into one or more documents depending on its type
pub fn load_file<P: AsRef<Path>>(file_path: P) -> Result<Vec<Document>> {
    let path = file_path.as_ref();
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            RagError::Initialization(format!("Invalid file name: {}", path.display()))
        })?
        .to_string();

    match detect_kind(path)? {
        SourceKind::Text => {
            info!("Processing text document: {}", path.display());
            let text = fs::read_to_string(path).map_err(|e| {
                RagError::Initialization(format!(
                    "Failed to read text file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            Ok(vec![Document::new(text, file_name)])
        }
        SourceKind::Delimited(delimiter) => {
            info!("Processing delimited sheet: {}", path.display());
            let text = read_delimited(path, delimiter)?;
            if text.is_empty() {
                warn!("Sheet {} has no content", file_name);
                return Ok(Vec::new());
            }
            Ok(vec![Document::new(text, file_name)])
        }
        SourceKind::Workbook => {
            info!("Processing workbook: {}", path.display());
            read_workbook(path, &file_name)
        }
    }
}

fn detect_kind(path: &Path) -> Result<SourceKind> {
    let mime = from_path(path).first_or_octet_stream();
    let mime_type = mime.essence_str().to_ascii_lowercase();
    debug!("Detected MIME type: {}", mime_type);

    match mime_type.as_str() {
        "text/csv" => Ok(SourceKind::Delimited(b',')),
        "text/tab-separated-values" => Ok(SourceKind::Delimited(b'\t')),
        mime if mime.starts_with("text/") => Ok(SourceKind::Text),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        | "application/vnd.ms-excel"
        | "application/vnd.ms-excel.sheet.macroenabled.12"
        | "application/vnd.ms-excel.sheet.binary.macroenabled.12"
        | "application/vnd.oasis.opendocument.spreadsheet" => Ok(SourceKind::Workbook),
        _ => Err(RagError::Initialization(format!(
            "Unsupported document format: {} ({}). Only text and spreadsheet files are supported.",
            path.display(),
            mime_type
        ))),
    }
}

fn read_delimited(path: &Path, delimiter: u8) -> Result<String> {
    let read_error =
        |e: csv::Error| RagError::Initialization(format!("Failed to read {}: {}", path.display(), e));

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)
        .map_err(read_error)?;

    let mut lines = Vec::new();
    for record in reader.records() {
        let record = record.map_err(read_error)?;
        if let Some(line) = format_row(record.iter()) {
            lines.push(line);
        }
    }

    Ok(lines.join("\n"))
}

fn read_workbook(path: &Path, file_name: &str) -> Result<Vec<Document>> {
    let mut workbook = open_workbook_auto(path).map_err(|e| {
        RagError::Initialization(format!("Failed to open workbook {}: {}", path.display(), e))
    })?;

    let mut documents = Vec::new();
    for sheet in workbook.sheet_names() {
        let range = workbook.worksheet_range(&sheet).map_err(|e| {
            RagError::Initialization(format!(
                "Failed to read sheet {} of {}: {}",
                sheet,
                path.display(),
                e
            ))
        })?;

        let text = range
            .rows()
            .filter_map(|row| format_row(row.iter().map(|cell| cell.to_string())))
            .collect::<Vec<String>>()
            .join("\n");

        if text.is_empty() {
            debug!("Skipping empty sheet {}", sheet);
            continue;
        }

        documents.push(Document::new(text, format!("{}#{}", file_name, sheet)));
    }

    if documents.is_empty() {
        warn!("Workbook {} has no content", file_name);
    }

    Ok(documents)
}

/// Join the cells of a row with tabs; `None` for a blank row.
///
/// Interior blank cells stay as empty fields so columns keep their position.
fn format_row<I, S>(cells: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut cells: Vec<String> = cells
        .into_iter()
        .map(|cell| cell.as_ref().trim().to_string())
        .collect();

    while cells.last().is_some_and(|cell| cell.is_empty()) {
        cells.pop();
    }

    if cells.is_empty() {
        None
    } else {
        Some(cells.join("\t"))
    }
}
