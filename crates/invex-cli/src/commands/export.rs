//! Output formatting for extraction results.

use std::fmt::Write as _;

use rust_decimal::Decimal;
use serde_json::json;

use invex_core::{ExtractionResult, LineItem};

/// Output format for extraction results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    /// File extension used for batch outputs.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub fn format_result(result: &ExtractionResult, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => format_json(result),
        OutputFormat::Csv => format_csv(result),
        OutputFormat::Text => format_text(result),
    }
}

/// Pretty JSON with the data-quality summary alongside the result.
pub fn format_json(result: &ExtractionResult) -> anyhow::Result<String> {
    let mut value = serde_json::to_value(result)?;
    if let Some(object) = value.as_object_mut() {
        object.insert("data_quality".to_string(), json!(result.data_quality()));
    }
    Ok(serde_json::to_string_pretty(&value)?)
}

/// One `Field,Value,Confidence` row per field, then line items and summary
/// rows.
pub fn format_csv(result: &ExtractionResult) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["Field", "Value", "Confidence"])?;

    for (name, field) in &result.fields {
        let confidence = result.field_confidence.get(name).copied().unwrap_or_default();
        wtr.write_record([
            name.as_str(),
            &field.normalized_value.to_string(),
            &percent(confidence),
        ])?;
    }

    for (i, item) in result.line_items.iter().enumerate() {
        for (column, value) in line_item_cells(item) {
            wtr.write_record([format!("line_item_{}_{}", i + 1, column), value, String::new()])?;
        }
    }

    wtr.write_record(["overall_confidence", &percent(result.overall_confidence), ""])?;
    wtr.write_record([
        "math_validation",
        &tri_state(result.math_validation.calculations_correct),
        "",
    ])?;
    wtr.write_record([
        "missing_required_fields",
        &result.missing_required_fields.join(", "),
        "",
    ])?;
    wtr.write_record(["duplicate_detected", &result.duplicate_detected.to_string(), ""])?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn line_item_cells(item: &LineItem) -> [(&'static str, String); 5] {
    [
        ("description", item.description.clone()),
        ("quantity", decimal(item.quantity)),
        ("unit_price", decimal(item.unit_price)),
        ("line_total", decimal(item.line_total)),
        ("tax", decimal(item.tax)),
    ]
}

/// Human-readable summary.
pub fn format_text(result: &ExtractionResult) -> anyhow::Result<String> {
    let mut output = String::new();
    let text = |name: &str| result.text(name).unwrap_or_else(|| "-".to_string());

    writeln!(output, "Invoice: {}", text("invoice_number"))?;
    writeln!(output, "Date: {}", text("invoice_date"))?;
    if let Some(due) = result.text("due_date") {
        writeln!(output, "Due: {}", due)?;
    }
    output.push('\n');

    writeln!(output, "Vendor:")?;
    writeln!(output, "  {}", text("vendor_name"))?;
    if let Some(address) = result.text("vendor_address") {
        writeln!(output, "  {}", address)?;
    }
    output.push('\n');

    if let Some(customer) = result.text("customer_name") {
        writeln!(output, "Customer:")?;
        writeln!(output, "  {}", customer)?;
        if let Some(address) = result.text("customer_address") {
            writeln!(output, "  {}", address)?;
        }
        output.push('\n');
    }

    if !result.line_items.is_empty() {
        writeln!(output, "Line items:")?;
        for item in &result.line_items {
            writeln!(
                output,
                "  {} | qty {} | price {} | total {}",
                item.description,
                decimal(item.quantity),
                decimal(item.unit_price),
                decimal(item.line_total)
            )?;
        }
        output.push('\n');
    }

    let currency = result.text("currency").unwrap_or_default();
    writeln!(output, "Summary:")?;
    for (label, name) in [
        ("Subtotal", "subtotal"),
        ("Tax", "tax_amount"),
        ("Discount", "discount"),
        ("Shipping", "shipping"),
        ("Total", "total"),
        ("Balance", "balance_due"),
    ] {
        if let Some(amount) = result.amount(name) {
            writeln!(output, "  {:<9} {} {}", format!("{}:", label), amount, currency)?;
        }
    }

    writeln!(
        output,
        "\nMath check: {}",
        match result.math_validation.calculations_correct {
            Some(true) => "passed",
            Some(false) => "failed",
            None => "not attempted",
        }
    )?;
    if !result.missing_required_fields.is_empty() {
        writeln!(output, "Missing: {}", result.missing_required_fields.join(", "))?;
    }
    if result.duplicate_detected {
        writeln!(output, "Duplicate: yes")?;
    }

    Ok(output)
}

fn percent(confidence: f32) -> String {
    format!("{:.1}%", confidence * 100.0)
}

fn decimal(value: Option<Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn tri_state(value: Option<bool>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "null".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use invex_core::InvoiceEngine;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "Invoice #: INV-2024-001\nTotal Due: $1,242.50\n\n\
                          Description Qty Price Total\nWidget 3 50.00 150.00";

    fn sample() -> ExtractionResult {
        InvoiceEngine::default().extract(SAMPLE).unwrap()
    }

    #[test]
    fn test_csv_rows() {
        let csv = format_csv(&sample()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "Field,Value,Confidence");
        assert!(lines.contains(&"invoice_number,INV-2024-001,100.0%"));
        assert!(lines.contains(&"line_item_1_description,Widget,"));
        assert!(lines.contains(&"line_item_1_line_total,150.00,"));
        assert!(lines.contains(&"math_validation,false,"));
    }

    #[test]
    fn test_json_includes_data_quality() {
        let json = format_json(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["data_quality"]["has_line_items"], true);
        assert_eq!(value["extracted_data"]["invoice_number"], "INV-2024-001");
    }

    #[test]
    fn test_text_summary() {
        let text = format_text(&sample()).unwrap();
        assert!(text.starts_with("Invoice: INV-2024-001\n"));
        assert!(text.contains("Widget | qty 3 | price 50.00 | total 150.00"));
        assert!(text.contains("Math check: failed"));
    }
}
