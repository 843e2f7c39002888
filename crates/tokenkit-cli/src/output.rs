use anyhow::Result;
use colored::Colorize;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::OutputFormat;

pub fn print_value(value: &Value, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Table => print_as_table(value),
    }
    Ok(())
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Renders rows under `header` as a rounded table.
pub fn print_rows<const N: usize>(header: [&str; N], rows: Vec<[String; N]>) {
    let mut builder = Builder::default();
    builder.push_record(header);
    for row in rows {
        builder.push_record(row);
    }
    println!("{}", builder.build().with(Style::rounded()));
}

fn print_as_table(value: &Value) {
    match value {
        Value::Object(map) => {
            let rows = map
                .iter()
                .map(|(k, v)| [k.clone(), cell(v)])
                .collect::<Vec<_>>();
            print_rows(["Field", "Value"], rows);
        }
        Value::Array(items) if items.is_empty() => println!("(empty)"),
        Value::Array(items) => {
            let rows = items
                .iter()
                .enumerate()
                .map(|(i, v)| [i.to_string(), cell(v)])
                .collect::<Vec<_>>();
            print_rows(["#", "Value"], rows);
        }
        other => println!("{}", cell(other)),
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}
