//! Line-item table parsing.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use tracing::debug;

use super::rules::amounts::parse_amount;
use crate::models::invoice::LineItem;
use crate::normalize::NormalizedText;

lazy_static! {
    /// Summary lines that close a table.
    static ref TERMINATOR: Regex = Regex::new(
        r"(?i)^(?:sub[\s-]*total|grand\s+total|total|tax|vat|gst|shipping|freight|discount|balance|amount\s+(?:due|paid)|notes?|payment)\b"
    ).unwrap();

    /// `Key: value` lines such as bank details after a table.
    static ref KEY_VALUE: Regex = Regex::new(
        r"^[A-Za-z][A-Za-z .#/&-]{0,30}:(?:\s|$)"
    ).unwrap();

    static ref CLEAN_NUMBER: Regex = Regex::new(
        r"^-?\(?[$€£]?-?\d[\d,.']*\)?%?$"
    ).unwrap();
}

/// Numeric column of a line-item table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Quantity,
    UnitPrice,
    Total,
    Tax,
}

/// Numeric columns of a table, left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    columns: Vec<Column>,
}

impl TableLayout {
    const DEFAULT: [Column; 3] = [Column::Quantity, Column::UnitPrice, Column::Total];

    /// Recognize a header line: no digits, no `key:` label or question,
    /// at least two distinct column labels, and mostly column words.
    pub fn from_header(line: &str) -> Option<Self> {
        if line.is_empty()
            || line.chars().any(|c| c.is_ascii_digit() || matches!(c, ':' | '!' | '?'))
            || TERMINATOR.is_match(line)
        {
            return None;
        }

        let mut words = 0;
        let mut known = 0;
        let mut labels: Vec<String> = Vec::new();
        let mut columns: Vec<Column> = Vec::new();
        for word in line.split(|c: char| !c.is_alphabetic()).filter(|w| !w.is_empty()) {
            words += 1;
            let word = word.to_lowercase();
            let column = match word.as_str() {
                "unit" | "line" | "of" | "each" => {
                    known += 1;
                    continue;
                }
                "description" | "item" | "items" | "product" | "service" | "services"
                | "details" => None,
                "qty" | "quantity" | "hours" | "hrs" | "units" => Some(Column::Quantity),
                "price" | "rate" | "cost" => Some(Column::UnitPrice),
                "amount" | "total" | "ext" | "extended" => Some(Column::Total),
                "tax" | "vat" | "gst" => Some(Column::Tax),
                _ => continue,
            };
            known += 1;
            if !labels.contains(&word) {
                labels.push(word);
            }
            if let Some(column) = column {
                if !columns.contains(&column) {
                    columns.push(column);
                }
            }
        }

        if labels.len() < 2 || known * 3 < words * 2 {
            return None;
        }
        if columns.is_empty() || columns == [Column::Tax] {
            columns = Self::DEFAULT.to_vec();
        }
        Some(Self { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn has_tax(&self) -> bool {
        self.columns.contains(&Column::Tax)
    }

    /// `cells` holds one more token than there are columns: does reading
    /// the last one as tax leave a row where quantity times price matches
    /// the total?
    fn has_trailing_tax(&self, cells: &[&str]) -> bool {
        if !is_clean_number(cells[0]) {
            return false;
        }
        let value = |column: Column| {
            self.columns
                .iter()
                .position(|c| *c == column)
                .and_then(|i| cells.get(i))
                .and_then(|t| cell_value(t))
        };
        match (value(Column::Quantity), value(Column::UnitPrice), value(Column::Total)) {
            (Some(quantity), Some(price), Some(total)) => quantity
                .checked_mul(price)
                .and_then(|product| product.checked_sub(total))
                .is_some_and(|diff| diff.abs() <= row_tolerance(total)),
            _ => false,
        }
    }

    /// Parse one table row. Returns `None` for rows with neither a
    /// description nor a numeric cell.
    pub fn parse_row(&self, line: &str) -> Option<LineItem> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let max_cells = self.columns.len() + usize::from(!self.has_tax());

        // Numeric cells are taken from the right
        let mut first_cell = tokens.len();
        while first_cell > 0 && tokens.len() - first_cell < max_cells {
            let token = tokens[first_cell - 1];
            let left_is_cell = first_cell >= 2 && is_cell(tokens[first_cell - 2]);
            if is_clean_number(token)
                || is_placeholder(token)
                || (is_garbled(token) && left_is_cell)
            {
                first_cell -= 1;
            } else {
                break;
            }
        }

        // An extra cell is a trailing tax only when the cells before it add
        // up; otherwise the leftmost number belongs to the description
        if tokens.len() - first_cell > self.columns.len()
            && !self.has_trailing_tax(&tokens[first_cell..])
        {
            first_cell += 1;
        }

        let description = tokens[..first_cell].join(" ");
        let mut cells: Vec<Option<Decimal>> =
            tokens[first_cell..].iter().map(|t| cell_value(t)).collect();
        if description.is_empty() && cells.iter().all(Option::is_none) {
            return None;
        }

        let mut item = LineItem {
            description,
            ..LineItem::default()
        };
        if cells.len() > self.columns.len() {
            item.tax = cells.pop().flatten();
        }

        // Right-aligned: the last cell goes to the last column
        let offset = self.columns.len() - cells.len();
        for (column, value) in self.columns[offset..].iter().zip(cells) {
            match column {
                Column::Quantity => item.quantity = value,
                Column::UnitPrice => item.unit_price = value,
                Column::Total => item.line_total = value,
                Column::Tax => item.tax = value,
            }
        }

        Some(item)
    }
}

fn row_tolerance(total: Decimal) -> Decimal {
    (total.abs() / Decimal::ONE_HUNDRED).max(Decimal::new(1, 2))
}

fn is_clean_number(token: &str) -> bool {
    CLEAN_NUMBER.is_match(token) && parse_amount(token).is_some()
}

fn is_placeholder(token: &str) -> bool {
    matches!(token.to_lowercase().as_str(), "-" | "--" | "n/a" | "na" | "tbd")
}

/// Starts like a number but does not parse (OCR damage such as `5O.00`).
fn is_garbled(token: &str) -> bool {
    token.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '$' | '€' | '£'))
        && !is_clean_number(token)
}

fn is_cell(token: &str) -> bool {
    is_clean_number(token) || is_placeholder(token)
}

fn cell_value(token: &str) -> Option<Decimal> {
    if is_clean_number(token) { parse_amount(token) } else { None }
}

/// Finds line-item tables in normalized text.
#[derive(Debug, Clone, Default)]
pub struct LineItemParser;

impl LineItemParser {
    pub fn new() -> Self {
        Self
    }

    /// All line items, in table order.
    pub fn parse(&self, text: &NormalizedText) -> Vec<LineItem> {
        let mut items = Vec::new();
        let mut table: Option<TableLayout> = None;
        let mut rows = 0;

        for (index, line) in text.lines().iter().enumerate() {
            if text.is_page_break(index) {
                table = None;
                continue;
            }
            if let Some(layout) = TableLayout::from_header(line) {
                debug!("Line-item header at line {}: {:?}", index, layout.columns());
                table = Some(layout);
                rows = 0;
                continue;
            }

            let Some(layout) = &table else {
                continue;
            };
            if line.is_empty() {
                if rows > 0 {
                    table = None;
                }
                continue;
            }
            if TERMINATOR.is_match(line) || KEY_VALUE.is_match(line) {
                table = None;
                continue;
            }

            if let Some(item) = layout.parse_row(line) {
                items.push(item);
                rows += 1;
            }
        }

        items
    }
}
