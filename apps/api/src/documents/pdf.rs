use std::panic;
use std::path::Path;

/// Extracts text page by page and joins pages with a newline.
pub(super) fn extract_text(path: &Path) -> Result<String, String> {
    // pdf-extract panics on some malformed inputs instead of returning an error.
    let pages = panic::catch_unwind(|| pdf_extract::extract_text_by_pages(path))
        .map_err(|_| "pdf parser panicked".to_string())?
        .map_err(|e| format!("pdf parse error: {e:?}"))?;

    Ok(pages.join("\n"))
}
