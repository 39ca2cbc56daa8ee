//! pdfium binding and document opening shared by the text and render stages.
//!
//! `PDFIUM_LIB_PATH` points at an existing library file
//! (`libpdfium.so`, `libpdfium.dylib`, `pdfium.dll`); without it the system
//! library search path is used.

use crate::error::ExtractError;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::debug;

/// Environment variable naming an explicit pdfium library file.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind to pdfium, preferring `PDFIUM_LIB_PATH` over the system library.
pub fn bind_pdfium() -> Result<Pdfium, ExtractError> {
    let bindings = match std::env::var(PDFIUM_LIB_PATH_ENV) {
        Ok(path) if !path.is_empty() => {
            debug!("Binding pdfium from {}={}", PDFIUM_LIB_PATH_ENV, path);
            Pdfium::bind_to_library(&path)
        }
        _ => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| ExtractError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Open a document, mapping pdfium failures to input errors.
pub fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, ExtractError> {
    pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| classify_load_error(pdf_path, password.is_some(), format!("{:?}", e)))
}

fn classify_load_error(pdf_path: &Path, had_password: bool, detail: String) -> ExtractError {
    if detail.contains("Password") || detail.contains("password") {
        if had_password {
            ExtractError::WrongPassword {
                path: pdf_path.to_path_buf(),
            }
        } else {
            ExtractError::PasswordRequired {
                path: pdf_path.to_path_buf(),
            }
        }
    } else {
        ExtractError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_errors_are_classified() {
        let p = Path::new("/tmp/locked.pdf");
        assert!(matches!(
            classify_load_error(p, false, "PdfiumLibraryInternalError(PasswordError)".into()),
            ExtractError::PasswordRequired { .. }
        ));
        assert!(matches!(
            classify_load_error(p, true, "PdfiumLibraryInternalError(PasswordError)".into()),
            ExtractError::WrongPassword { .. }
        ));
        assert!(matches!(
            classify_load_error(p, false, "PdfiumLibraryInternalError(FormatError)".into()),
            ExtractError::CorruptPdf { .. }
        ));
    }
}
