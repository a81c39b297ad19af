//! Vendor and customer block detectors.
//!
//! Party details usually sit in short blocks: a header such as `Bill To:`
//! followed by a name and a few address lines. The vendor block often has no
//! header at all and is simply the top of the first page.

use lazy_static::lazy_static;
use regex::Regex;

use super::patterns::{
    COMPANY_SUFFIX, CUSTOMER_SECTION, LABEL_LINE, NOT_A_NAME, SHIP_TO_SECTION, VENDOR_SECTION,
};
use super::{Detector, ExtractionMatch, ValueKind};
use crate::error::DetectorError;
use crate::models::invoice::{FieldValue, MatchQuality, TextPosition, field_names};
use crate::normalize::NormalizedText;

lazy_static! {
    static ref STREET_LINE: Regex = Regex::new(r"^\d{1,6}[A-Za-z]?\s+[A-Za-z]").unwrap();
    static ref CITY_LINE: Regex = Regex::new(
        r"(?:,\s*[A-Za-z]{2}\.?\s+\d{5}(?:-\d{4})?|\b\d{4,5}\s+[A-Z][a-z]+|,\s*[A-Z][A-Za-z ]+\s+[A-Z]\d[A-Z]\s?\d[A-Z]\d)\b"
    ).unwrap();
}

/// Maximum number of lines read after a block header.
const MAX_BLOCK_LINES: usize = 4;

/// Which part of a party block a [`SectionDetector`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionPart {
    /// The first line (or the text after the header).
    Name,
    /// The lines after the name.
    Address,
    /// Name and address joined.
    Whole,
}

/// Detector for a headed party block.
pub struct SectionDetector {
    id: &'static str,
    field: &'static str,
    weight: f32,
    header: &'static Regex,
    part: SectionPart,
}

impl SectionDetector {
    pub fn new(
        id: &'static str,
        field: &'static str,
        header: &'static Regex,
        part: SectionPart,
    ) -> Self {
        Self {
            id,
            field,
            weight: 1.0,
            header,
            part,
        }
    }

    pub fn weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    /// The vendor block (`From:`, `Remit To:`, ...).
    pub fn vendor(part: SectionPart) -> Self {
        match part {
            SectionPart::Name => Self::new(
                "vendor_name.section",
                field_names::VENDOR_NAME,
                &VENDOR_SECTION,
                part,
            ),
            _ => Self::new(
                "vendor_address.section",
                field_names::VENDOR_ADDRESS,
                &VENDOR_SECTION,
                part,
            ),
        }
    }

    /// The billed party block (`Bill To:`, `Customer:`, ...).
    pub fn customer(part: SectionPart) -> Self {
        match part {
            SectionPart::Name => Self::new(
                "customer_name.section",
                field_names::CUSTOMER_NAME,
                &CUSTOMER_SECTION,
                part,
            ),
            _ => Self::new(
                "customer_address.section",
                field_names::CUSTOMER_ADDRESS,
                &CUSTOMER_SECTION,
                part,
            ),
        }
    }

    /// The delivery block, reported whole.
    pub fn ship_to() -> Self {
        Self::new("ship_to.section", field_names::SHIP_TO, &SHIP_TO_SECTION, SectionPart::Whole)
    }
}

impl Detector for SectionDetector {
    fn id(&self) -> &str {
        self.id
    }

    fn field(&self) -> &'static str {
        self.field
    }

    fn weight(&self) -> f32 {
        self.weight
    }

    fn detect(&self, text: &NormalizedText) -> Result<Vec<ExtractionMatch>, DetectorError> {
        let mut results = Vec::new();

        for (index, line) in text.content_lines() {
            let Some(caps) = self.header.captures(line) else {
                continue;
            };
            let inline = caps
                .name("rest")
                .map(|m| (m.as_str().trim(), m.start()))
                .filter(|(rest, _)| !rest.is_empty());

            let mut block: Vec<(TextPosition, &str)> = Vec::new();
            if let Some((rest, column)) = inline {
                block.push((TextPosition::new(index, column), rest));
            }
            block.extend(
                block_lines(text, index + 1).map(|(i, l)| (TextPosition::new(i, 0), l)),
            );

            let Some(((name_pos, name), rest)) = block.split_first() else {
                continue;
            };
            let (position, raw) = match self.part {
                SectionPart::Name => (*name_pos, name.to_string()),
                SectionPart::Address => match rest.first() {
                    Some((pos, _)) => (*pos, join_lines(rest)),
                    None => continue,
                },
                SectionPart::Whole => (*name_pos, join_lines(&block)),
            };

            let kind = match self.part {
                SectionPart::Name => ValueKind::Name,
                _ => ValueKind::Text,
            };
            if let Some((value, structural)) = kind.normalize(self.field, line, &raw)? {
                results.push(
                    ExtractionMatch::new(value, MatchQuality::Exact, raw)
                        .with_structural(structural)
                        .with_position(position),
                );
            }
        }

        Ok(results)
    }
}

/// Lines of a block starting at `start`, up to a blank line, a page break,
/// another labelled line, or [`MAX_BLOCK_LINES`].
fn block_lines(text: &NormalizedText, start: usize) -> impl Iterator<Item = (usize, &str)> {
    (start..text.len())
        .map_while(move |i| {
            let line = text.line(i)?;
            let ends_block = line.is_empty()
                || text.is_page_break(i)
                || LABEL_LINE.is_match(line)
                || line.contains('@');
            (!ends_block).then_some((i, line))
        })
        .take(MAX_BLOCK_LINES)
}

fn join_lines(lines: &[(TextPosition, &str)]) -> String {
    lines
        .iter()
        .map(|(_, line)| *line)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Content lines at the top of the first page, before any customer or
/// delivery block. This is where an unlabelled vendor block lives.
fn header_zone(text: &NormalizedText) -> impl Iterator<Item = (usize, &str)> {
    text.content_lines().take_while(move |(i, line)| {
        text.page_of(*i) == 0
            && !CUSTOMER_SECTION.is_match(line)
            && !SHIP_TO_SECTION.is_match(line)
    })
}

/// Vendor name from the first heading-like line of the document.
pub struct HeadingNameDetector {
    weight: f32,
}

impl HeadingNameDetector {
    pub fn new(weight: f32) -> Self {
        Self { weight }
    }
}

impl Detector for HeadingNameDetector {
    fn id(&self) -> &str {
        "vendor_name.heading"
    }

    fn field(&self) -> &'static str {
        field_names::VENDOR_NAME
    }

    fn weight(&self) -> f32 {
        self.weight
    }

    fn detect(&self, text: &NormalizedText) -> Result<Vec<ExtractionMatch>, DetectorError> {
        let heading = header_zone(text)
            .take(5)
            .find(|(_, line)| looks_like_name(line));

        let Some((index, line)) = heading else {
            return Ok(Vec::new());
        };
        let found = ValueKind::Name
            .normalize(self.field(), line, line)?
            .map(|(value, structural)| {
                ExtractionMatch::new(value, MatchQuality::Positional, line)
                    .with_structural(structural)
                    .with_position(TextPosition::new(index, 0))
            });

        Ok(found.into_iter().collect())
    }
}

fn looks_like_name(line: &str) -> bool {
    let total = line.chars().count();
    let letters = line.chars().filter(|c| c.is_alphabetic()).count();
    let digits = line.chars().filter(char::is_ascii_digit).count();

    letters >= 2
        && digits * 4 <= total
        && !line.contains([':', '@', '#', '$'])
        && !line.to_lowercase().contains("www.")
        && !NOT_A_NAME.is_match(line)
        && !VENDOR_SECTION.is_match(line)
}

/// Vendor name from a company-suffixed name (`... Inc.`, `... LLC`) in
/// the vendor's part of the page.
pub struct CompanySuffixDetector {
    weight: f32,
}

impl CompanySuffixDetector {
    pub fn new(weight: f32) -> Self {
        Self { weight }
    }
}

impl Detector for CompanySuffixDetector {
    fn id(&self) -> &str {
        "vendor_name.company_suffix"
    }

    fn field(&self) -> &'static str {
        field_names::VENDOR_NAME
    }

    fn weight(&self) -> f32 {
        self.weight
    }

    fn detect(&self, text: &NormalizedText) -> Result<Vec<ExtractionMatch>, DetectorError> {
        let mut results = Vec::new();

        for (index, line) in header_zone(text) {
            let Some(m) = COMPANY_SUFFIX.captures(line).and_then(|c| c.name("value")) else {
                continue;
            };
            let name = m.as_str().trim_end_matches(',');
            let normalized = ValueKind::Name.normalize(self.field(), line, name)?;
            if let Some((value, structural)) = normalized {
                results.push(
                    ExtractionMatch::new(value, MatchQuality::Partial, m.as_str())
                        .with_structural(structural)
                        .with_position(TextPosition::new(index, m.start())),
                );
            }
        }

        Ok(results)
    }
}

/// Vendor address from street and city lines at the top of the document.
pub struct HeaderAddressDetector {
    weight: f32,
}

impl HeaderAddressDetector {
    pub fn new(weight: f32) -> Self {
        Self { weight }
    }
}

impl Detector for HeaderAddressDetector {
    fn id(&self) -> &str {
        "vendor_address.header"
    }

    fn field(&self) -> &'static str {
        field_names::VENDOR_ADDRESS
    }

    fn weight(&self) -> f32 {
        self.weight
    }

    fn detect(&self, text: &NormalizedText) -> Result<Vec<ExtractionMatch>, DetectorError> {
        let mut lines: Vec<(TextPosition, &str)> = Vec::new();
        let mut last_index = None;

        for (index, line) in header_zone(text) {
            let contiguous = last_index.is_none_or(|last| index == last + 1);
            let is_address = !line.contains(':')
                && (STREET_LINE.is_match(line) || CITY_LINE.is_match(line));

            if is_address && (lines.is_empty() || contiguous) {
                lines.push((TextPosition::new(index, 0), line));
                last_index = Some(index);
            } else if !lines.is_empty() {
                break;
            }
        }

        let Some((position, _)) = lines.first().copied() else {
            return Ok(Vec::new());
        };
        let structural = if lines.iter().any(|(_, l)| CITY_LINE.is_match(l)) { 1.0 } else { 0.6 };
        let raw = join_lines(&lines);

        Ok(vec![
            ExtractionMatch::new(FieldValue::Text(raw.clone()), MatchQuality::Positional, raw)
                .with_structural(structural)
                .with_position(position),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "Acme Supplies\n\
        123 Main Street\n\
        Springfield, IL 62701\n\
        Phone: (555) 123-4567\n\
        \n\
        Bill To:\n\
        Beta Industries LLC\n\
        456 Oak Avenue\n\
        Portland, OR 97201\n\
        \n\
        Ship To: Beta Warehouse\n\
        789 Dock Road\n\
        Invoice #: INV-1";

    fn values(detector: &dyn Detector, input: &str) -> Vec<String> {
        let text = normalize(input).unwrap();
        detector
            .detect(&text)
            .unwrap()
            .into_iter()
            .map(|m| m.value.to_string())
            .collect()
    }

    #[test]
    fn test_customer_block() {
        assert_eq!(
            values(&SectionDetector::customer(SectionPart::Name), SAMPLE),
            vec!["Beta Industries LLC"]
        );
        assert_eq!(
            values(&SectionDetector::customer(SectionPart::Address), SAMPLE),
            vec!["456 Oak Avenue, Portland, OR 97201"]
        );
    }

    #[test]
    fn test_inline_block_header() {
        assert_eq!(
            values(&SectionDetector::ship_to(), SAMPLE),
            vec!["Beta Warehouse, 789 Dock Road"]
        );
    }

    #[test]
    fn test_labelled_line_is_not_a_header() {
        let detector = SectionDetector::customer(SectionPart::Name);
        assert!(values(&detector, "Customer ID: C-1001").is_empty());
    }

    #[test]
    fn test_vendor_heading() {
        assert_eq!(values(&HeadingNameDetector::new(0.5), SAMPLE), vec!["Acme Supplies"]);
        assert_eq!(
            values(&HeadingNameDetector::new(0.5), "INVOICE\nPage 1 of 2\nGlobex Corporation"),
            vec!["Globex Corporation"]
        );
    }

    #[test]
    fn test_company_suffix_ignores_customer_block() {
        assert!(values(&CompanySuffixDetector::new(0.8), SAMPLE).is_empty());
        assert_eq!(
            values(&CompanySuffixDetector::new(0.8), "ACME Corp\nInvoice #: 1"),
            vec!["ACME Corp"]
        );
    }

    #[test]
    fn test_header_address() {
        assert_eq!(
            values(&HeaderAddressDetector::new(0.6), SAMPLE),
            vec!["123 Main Street, Springfield, IL 62701"]
        );
    }
}
