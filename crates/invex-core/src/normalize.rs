//! Raw OCR / text-layer cleanup into canonical lines.

use crate::error::ExtractionError;

/// Page separator in raw input (form feed, as emitted by PDF text layers).
pub const PAGE_SEPARATOR: char = '\u{000C}';

/// Line entry standing in for a page break in [`NormalizedText`].
pub const PAGE_BREAK: &str = "\u{000C}";

/// Cleaned, line-oriented invoice text.
///
/// Lines are trimmed with internal whitespace collapsed. Runs of blank lines
/// are reduced to one empty line, and page breaks are kept as
/// [`PAGE_BREAK`] entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    lines: Vec<String>,
    pages: Vec<usize>,
}

impl NormalizedText {
    fn from_lines(lines: Vec<String>) -> Self {
        let mut page = 0;
        let pages = lines
            .iter()
            .map(|line| {
                if line == PAGE_BREAK {
                    page += 1;
                }
                page
            })
            .collect();
        Self { lines, pages }
    }

    /// All lines, page breaks included.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Line at `index`.
    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Zero-based page of the line at `index`.
    pub fn page_of(&self, index: usize) -> usize {
        self.pages.get(index).copied().unwrap_or(0)
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.last().map_or(1, |last| last + 1)
    }

    /// Whether the line at `index` is a page break marker.
    pub fn is_page_break(&self, index: usize) -> bool {
        self.line(index) == Some(PAGE_BREAK)
    }

    /// Text lines with their indices, skipping blanks and page breaks.
    pub fn content_lines(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, line)| !line.is_empty() && line.as_str() != PAGE_BREAK)
            .map(|(i, line)| (i, line.as_str()))
    }

    /// Lines joined with `\n`.
    pub fn as_text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Clean raw text into [`NormalizedText`].
///
/// Fails with [`ExtractionError::EmptyInput`] when the input has no
/// non-whitespace characters.
pub fn normalize(raw: &str) -> Result<NormalizedText, ExtractionError> {
    if raw.chars().all(|c| c.is_whitespace() || is_invisible(c)) {
        return Err(ExtractionError::EmptyInput);
    }

    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");

    let mut lines: Vec<String> = Vec::new();
    for (page_index, page) in unified.split(PAGE_SEPARATOR).enumerate() {
        if page_index > 0 {
            trim_trailing_blanks(&mut lines);
            lines.push(PAGE_BREAK.to_string());
        }

        for raw_line in page.split('\n') {
            let line = clean_line(raw_line);

            if line.is_empty() {
                // Collapse blank runs; no blank directly after a page break or at the start
                if matches!(lines.last(), Some(prev) if !prev.is_empty() && prev != PAGE_BREAK) {
                    lines.push(String::new());
                }
                continue;
            }

            let rejoin = starts_lowercase(&line)
                && lines.last().is_some_and(|prev| ends_with_broken_word(prev));
            match lines.last_mut() {
                Some(prev) if rejoin => {
                    prev.pop();
                    prev.push_str(&line);
                }
                _ => lines.push(line),
            }
        }
    }

    trim_trailing_blanks(&mut lines);
    while lines.last().map(String::as_str) == Some(PAGE_BREAK) {
        lines.pop();
        trim_trailing_blanks(&mut lines);
    }

    if lines.iter().all(|l| l.is_empty() || l == PAGE_BREAK) {
        return Err(ExtractionError::EmptyInput);
    }

    Ok(NormalizedText::from_lines(lines))
}

/// Map encoding artifacts to plain characters, collapse whitespace, and trim.
fn clean_line(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;

    for c in raw.chars() {
        let mapped = match c {
            '\u{00A0}' | '\u{2000}'..='\u{200A}' | '\u{202F}' | '\u{205F}' | '\u{3000}' => ' ',
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => '\'',
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => '"',
            '\u{2010}'..='\u{2015}' | '\u{2212}' => '-',
            c if is_invisible(c) => continue,
            c if c.is_control() && c != '\t' => continue,
            c => c,
        };

        if mapped.is_whitespace() {
            pending_space = !out.is_empty();
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(mapped);
        }
    }

    out
}

fn is_invisible(c: char) -> bool {
    matches!(c, '\u{200B}'..='\u{200D}' | '\u{2060}' | '\u{FEFF}' | '\u{00AD}')
}

fn ends_with_broken_word(line: &str) -> bool {
    let mut rev = line.chars().rev();
    matches!(
        (rev.next(), rev.next()),
        (Some('-'), Some(c)) if c.is_alphabetic()
    )
}

fn starts_lowercase(line: &str) -> bool {
    line.chars().next().is_some_and(char::is_lowercase)
}

fn trim_trailing_blanks(lines: &mut Vec<String>) {
    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize(""), Err(ExtractionError::EmptyInput));
        assert_eq!(normalize("  \n\t\r\n  "), Err(ExtractionError::EmptyInput));
        assert_eq!(normalize("\u{FEFF}\u{200B}\n"), Err(ExtractionError::EmptyInput));
        assert_eq!(normalize("\u{000C}\n\u{000C}"), Err(ExtractionError::EmptyInput));
    }

    #[test]
    fn test_collapses_whitespace_and_trims() {
        let text = normalize("  Invoice   #:\tINV-001  \r\nTotal:    $10.00").unwrap();
        assert_eq!(text.lines(), &["Invoice #: INV-001", "Total: $10.00"]);
    }

    #[test]
    fn test_rejoins_hyphenated_words() {
        let text = normalize("Consulting ser-\nvices rendered\nINV-\n001").unwrap();
        assert_eq!(text.lines(), &["Consulting services rendered", "INV-", "001"]);
    }

    #[test]
    fn test_collapses_blank_runs() {
        let text = normalize("\n\nA\n\n\n\nB\n\n").unwrap();
        assert_eq!(text.lines(), &["A", "", "B"]);
    }

    #[test]
    fn test_strips_encoding_artifacts() {
        let raw = "\u{FEFF}Acme\u{00A0}Corp \u{2014} \u{201C}Quality\u{201D}\u{0007}";
        let text = normalize(raw).unwrap();
        assert_eq!(text.lines(), &["Acme Corp - \"Quality\""]);
    }

    #[test]
    fn test_page_breaks_are_kept() {
        let text = normalize("Page one\n\n\u{000C}Page two\nmore\u{000C}").unwrap();
        assert_eq!(text.lines(), &["Page one", PAGE_BREAK, "Page two", "more"]);
        assert_eq!(text.page_count(), 2);
        assert_eq!(text.page_of(0), 0);
        assert_eq!(text.page_of(2), 1);
        assert!(text.is_page_break(1));
    }

    #[test]
    fn test_content_lines_skip_markers() {
        let text = normalize("A\n\nB\u{000C}C").unwrap();
        let content: Vec<_> = text.content_lines().collect();
        assert_eq!(content, vec![(0, "A"), (2, "B"), (4, "C")]);
    }
}
