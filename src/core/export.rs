//! CSV export of the auction results.

use crate::{
    core::report::{self, SaleRecord},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use std::io::Write;
use tracing::info;

/// Column headers, in file order.
pub const EXPORT_HEADERS: [&str; 6] = ["Order", "Player Name", "Category", "Team", "Amount", "Sold At"];

const SOLD_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Writes one quoted row per sale. Rows keep the order of `sales`.
pub fn write_results_csv<W: Write>(writer: W, sales: &[SaleRecord]) -> Result<W> {
    let mut csv_writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(writer);

    csv_writer.write_record(EXPORT_HEADERS)?;
    for sale in sales {
        let category = sale
            .player
            .as_ref()
            .map(|p| p.category.to_string())
            .unwrap_or_default();
        csv_writer.write_record([
            sale.result.auction_order.to_string(),
            sale.player.as_ref().map(|p| p.name.clone()).unwrap_or_default(),
            category,
            sale.team.as_ref().map(|t| t.name.clone()).unwrap_or_default(),
            sale.result.final_amount.to_string(),
            sale.result.sold_at.format(SOLD_AT_FORMAT).to_string(),
        ])?;
    }

    csv_writer.into_inner().map_err(|e| Error::Io(e.into_error()))
}

/// Renders every sale, in auction order, as CSV bytes.
pub async fn export_results_csv(db: &DatabaseConnection) -> Result<Vec<u8>> {
    let sales = report::list_transactions(db).await?;
    let bytes = write_results_csv(Vec::new(), &sales)?;
    info!(rows = sales.len(), "Exported auction results");
    Ok(bytes)
}

/// File name for an export taken on `date`: `<prefix>-YYYY-MM-DD.csv`.
#[must_use]
pub fn export_filename(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix}-{}.csv", date.format("%Y-%m-%d"))
}
