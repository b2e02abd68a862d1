use crate::constants::{PDF_HEADER_SEARCH_WINDOW, PDF_MAGIC};
use crate::error::{CompressionError, Result};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Validate that the input exists, is a regular file and looks like a PDF.
pub fn validate_input_path(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(CompressionError::FileNotFound(path.to_path_buf()));
    }

    if !path.is_file() {
        return Err(CompressionError::InvalidPdf(path.to_path_buf()));
    }

    if !has_pdf_header(path)? {
        return Err(CompressionError::InvalidPdf(path.to_path_buf()));
    }

    Ok(())
}

/// Checks for the `%PDF-` marker near the start of the file. Viewers accept
/// some leading garbage, so the marker does not have to be at offset 0.
pub fn has_pdf_header(path: &Path) -> Result<bool> {
    let mut head = Vec::with_capacity(PDF_HEADER_SEARCH_WINDOW);
    File::open(path)?
        .take(PDF_HEADER_SEARCH_WINDOW as u64)
        .read_to_end(&mut head)?;

    Ok(head
        .windows(PDF_MAGIC.len())
        .any(|window| window == PDF_MAGIC))
}

/// Validate the output path against the input. The parent directory must
/// already exist and the output must not be the input file itself.
pub fn validate_output_path(input: &Path, output: &Path) -> Result<PathBuf> {
    let parent = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !parent.is_dir() {
        return Err(CompressionError::DirectoryNotFound(parent.to_path_buf()));
    }

    if output.exists() {
        let same = match (fs::canonicalize(input), fs::canonicalize(output)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };
        if same {
            return Err(CompressionError::SameInputOutput(output.to_path_buf()));
        }
    }

    Ok(output.to_path_buf())
}

/// Check if the file extension says PDF.
pub fn is_pdf_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}
