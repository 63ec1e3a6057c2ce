use crate::cli::ui;
use crate::core::quote::{QuoteRecord, RateStore};
use anyhow::{Context, Result};
use comfy_table::Table;

/// Builds a table of stored quotes, newest first.
pub fn build_history_table(records: &[QuoteRecord]) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("USD/RUB"),
        ui::header_cell("Captured at (UTC)"),
    ]);

    for record in records {
        table.add_row(vec![
            ui::number_cell(record.seq),
            ui::number_cell(record.rate),
            comfy_table::Cell::new(record.captured_at.format("%Y-%m-%d %H:%M:%S")),
        ]);
    }
    table
}

pub async fn show_history(store: &dyn RateStore, limit: usize) -> Result<()> {
    let records = store
        .recent(limit)
        .await
        .context("Failed to load stored quotes")?;

    if records.is_empty() {
        println!("No quotes stored yet.");
        return Ok(());
    }

    println!("{}", build_history_table(&records));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    #[test]
    fn test_history_table_rows() {
        let records = vec![
            QuoteRecord {
                rate: Decimal::new(760_000, 4),
                captured_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 10).unwrap(),
                seq: 2,
            },
            QuoteRecord {
                rate: Decimal::new(755_000, 4),
                captured_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                seq: 1,
            },
        ];

        let table = build_history_table(&records);
        assert_eq!(table.row_count(), 2);

        let rendered = table.to_string();
        assert!(rendered.contains("76.0000"));
        assert!(rendered.contains("2024-01-01 00:00:10"));
        assert!(rendered.find("76.0000") < rendered.find("75.5000"));
    }
}
