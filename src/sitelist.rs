//! Site-list input.
//!
//! The list is a plain text/CSV file with one candidate URL per row; only
//! the first cell of each row matters. Encodings are handled leniently: a
//! UTF-8 BOM is tolerated and non-UTF-8 bytes are replaced rather than
//! rejected, because these files come straight from spreadsheet exports.

use std::path::Path;

use crate::errors::RunError;
use crate::types::SiteRow;

/// Tokens that mark a cell as a column header rather than a URL. Skipped
/// wherever they occur, not just on the first row.
const HEADER_TOKENS: &[&str] = &["website", "url", "domain", "site"];

/// Whether a raw cell is a header token.
pub fn is_header_like(raw: &str) -> bool {
    let cleaned = raw.replace('\u{FEFF}', "");
    let cleaned = cleaned.trim().to_lowercase();
    HEADER_TOKENS.contains(&cleaned.as_str())
}

/// First cell of a CSV-ish row, with surrounding quotes removed.
fn first_cell(line: &str) -> String {
    let cell = line.split(',').next().unwrap_or("").trim();
    cell.trim_matches('"').trim().to_string()
}

/// Read every row of the site list, in order, 1-based. Rows are returned
/// as-is (including empty and header-like ones); the orchestrator decides
/// what to skip so that row indexes stay aligned with the input file.
pub fn read_site_rows(path: &Path) -> Result<Vec<SiteRow>, RunError> {
    let bytes = std::fs::read(path)
        .map_err(|e| RunError::SiteList(format!("{}: {e}", path.display())))?;

    let text = String::from_utf8_lossy(&bytes);
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(&text);

    Ok(text
        .lines()
        .enumerate()
        .map(|(i, line)| SiteRow {
            idx: i + 1,
            raw: first_cell(line),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_header_tokens_are_recognized() {
        assert!(is_header_like("website"));
        assert!(is_header_like("  URL  "));
        assert!(is_header_like("\u{FEFF}Domain"));
        assert!(is_header_like("SITE"));
        assert!(!is_header_like("example.com"));
        assert!(!is_header_like("websites.io"));
    }

    #[test]
    fn test_rows_keep_their_file_positions() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "website,notes").unwrap();
        writeln!(file, "example.com,main site").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "\"https://other.org\",x").unwrap();

        let rows = read_site_rows(file.path()).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], SiteRow { idx: 1, raw: "website".to_string() });
        assert_eq!(rows[1], SiteRow { idx: 2, raw: "example.com".to_string() });
        assert_eq!(rows[2], SiteRow { idx: 3, raw: String::new() });
        assert_eq!(rows[3], SiteRow { idx: 4, raw: "https://other.org".to_string() });
    }

    #[test]
    fn test_bom_and_invalid_bytes_are_tolerated() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\xEF\xBB\xBFwebsite\nexample.com\n\xFFbad.com\n")
            .unwrap();

        let rows = read_site_rows(file.path()).unwrap();
        assert_eq!(rows[0].raw, "website");
        assert!(is_header_like(&rows[0].raw));
        assert_eq!(rows[1].raw, "example.com");
        // The undecodable byte is replaced, the row itself survives.
        assert!(rows[2].raw.ends_with("bad.com"));
    }

    #[test]
    fn test_missing_file_is_a_run_error() {
        let err = read_site_rows(Path::new("/nonexistent/sites.csv")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
