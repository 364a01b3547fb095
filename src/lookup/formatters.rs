use crate::composer::format_usd;
use crate::models::TokenMetadata;
use comfy_table::{Cell, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use csv::Writer;
use serde_json::json;

const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "csv" => OutputFormat::Csv,
            _ => OutputFormat::Table,
        }
    }
}

pub fn format_metadata(token_address: &str, metadata: &TokenMetadata, format: &OutputFormat) -> String {
    let market_cap = metadata.market_cap_fd.map(format_usd);
    let price = metadata.price_usd.map(|p| format!("${}", p.normalize()));

    let rows = [
        ("token_address", Some(token_address.to_string())),
        ("name", metadata.name.clone()),
        ("symbol", metadata.symbol.clone()),
        ("market_cap", market_cap),
        ("price_usd", price),
    ];

    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec!["Field", "Value"]);
            for (field, value) in &rows {
                table.add_row(vec![
                    Cell::new(field),
                    Cell::new(value.as_deref().unwrap_or(NOT_AVAILABLE)),
                ]);
            }
            table.to_string()
        }
        OutputFormat::Json => serde_json::to_string_pretty(&json!({
            "token_address": token_address,
            "name": metadata.name,
            "symbol": metadata.symbol,
            "market_cap": metadata.market_cap_fd.map(|d| d.to_string()),
            "price_usd": metadata.price_usd.map(|d| d.normalize().to_string()),
        }))
        .unwrap_or_else(|_| "{}".to_string()),
        OutputFormat::Csv => {
            let mut wtr = Writer::from_writer(vec![]);
            let _ = wtr.write_record(["field", "value"]);
            for (field, value) in &rows {
                let _ = wtr.write_record([*field, value.as_deref().unwrap_or("")]);
            }
            String::from_utf8(wtr.into_inner().unwrap_or_default()).unwrap_or_default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn bonk() -> TokenMetadata {
        TokenMetadata {
            name: Some("Bonk".into()),
            symbol: Some("BONK".into()),
            market_cap_fd: Some(Decimal::new(150000050, 2)),
            price_usd: None,
        }
    }

    #[test]
    fn parses_output_format() {
        assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from("csv"), OutputFormat::Csv);
        assert_eq!(OutputFormat::from("whatever"), OutputFormat::Table);
    }

    #[test]
    fn metadata_csv_marks_missing_fields_empty() {
        let csv = format_metadata("mint", &bonk(), &OutputFormat::Csv);
        assert_eq!(
            csv,
            "field,value\n\
             token_address,mint\n\
             name,Bonk\n\
             symbol,BONK\n\
             market_cap,\"$1,500,000.50\"\n\
             price_usd,\n"
        );
    }

    #[test]
    fn metadata_json_keeps_nulls() {
        let out = format_metadata("mint", &TokenMetadata::unavailable(), &OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["token_address"], "mint");
        assert!(value["name"].is_null());
        assert!(value["market_cap"].is_null());
    }

    #[test]
    fn metadata_table_shows_placeholder() {
        let out = format_metadata("mint", &TokenMetadata::unavailable(), &OutputFormat::Table);
        assert!(out.contains("N/A"));
        assert!(out.contains("mint"));
    }
}
