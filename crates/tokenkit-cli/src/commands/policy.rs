use anyhow::Result;
use tokenkit_auth::policy;

use crate::cli::OutputFormat;
use crate::output::{print_rows, print_value};

pub fn show(format: OutputFormat) -> Result<()> {
    let table = policy::table();

    if matches!(format, OutputFormat::Table) {
        let rows = table
            .iter()
            .map(|(family, p)| {
                [
                    (*family).to_string(),
                    format!("{:?}", p.encoding).to_uppercase(),
                    format!("{}d", p.validity_days),
                    p.freshness_days
                        .map_or_else(|| "-".to_string(), |d| format!("{d}d")),
                    if p.requires_email_match { "yes" } else { "no" }.to_string(),
                ]
            })
            .collect();
        print_rows(
            ["Context", "Encoding", "Validity", "Current", "Email match"],
            rows,
        );
        return Ok(());
    }

    let mut rows = serde_json::Map::new();
    for (family, p) in table {
        rows.insert(family.to_string(), serde_json::to_value(p)?);
    }
    print_value(&serde_json::Value::Object(rows), format)
}
