//! Table and JSON rendering for CLI command results.

use serde::Serialize;
use serde_json::Value;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Table
    }
}

/// Print a list of rows (extensions, migrations, metrics) in the selected
/// format.
pub fn print_list<T: Serialize + Tabled>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("Nothing to show.");
            } else {
                let mut table = Table::new(items);
                table.with(Style::sharp());
                println!("{}", table);
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".to_string());
            println!("{}", json);
        }
    }
}

/// Print a single structured item. The table format renders top-level
/// fields as aligned key-value lines.
pub fn print_item<T: Serialize>(item: &T, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let value = serde_json::to_value(item).unwrap_or(Value::Null);
            for (key, rendered) in item_rows(&value) {
                print_kv(&key, &rendered);
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(item).unwrap_or_else(|_| "{}".to_string());
            println!("{}", json);
        }
    }
}

/// Flatten a serialized item into printable key-value rows. Non-object
/// values become a single `value` row; nested structures render as
/// compact JSON.
fn item_rows(value: &Value) -> Vec<(String, String)> {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| {
                let rendered = match v {
                    Value::String(s) => s.clone(),
                    Value::Null => "-".to_string(),
                    other => other.to_string(),
                };
                (k.clone(), rendered)
            })
            .collect(),
        other => vec![("value".to_string(), other.to_string())],
    }
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("✓ {}", msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("⚠ {}", msg);
}

/// Print an error message
pub fn print_error(msg: &str) {
    eprintln!("✗ {}", msg);
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<24} {}", format!("{}:", key), value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_flattens_to_rows() {
        let rows = item_rows(&json!({
            "name": "webhooks",
            "enabled": true,
            "last_error": null,
            "checks": {"db": "ok"},
        }));
        let get = |key: &str| {
            rows.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(rows.len(), 4);
        assert_eq!(get("name"), "webhooks");
        assert_eq!(get("enabled"), "true");
        assert_eq!(get("last_error"), "-");
        assert_eq!(get("checks"), r#"{"db":"ok"}"#);
    }

    #[test]
    fn scalar_renders_as_single_row() {
        let rows = item_rows(&json!("healthy"));
        assert_eq!(rows, vec![("value".to_string(), "\"healthy\"".to_string())]);
    }
}
