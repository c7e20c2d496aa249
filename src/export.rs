//! CSV export of fee history.

use crate::domain::FeeHistory;
use std::io::Write;

const HEADER: [&str; 8] = [
    "created_at",
    "transaction_id",
    "configuration_id",
    "calculation_method",
    "original_amount",
    "calculated_fee",
    "currency",
    "fee_bearer",
];

/// Write `records` as CSV with a header row. Amounts carry exactly 2 decimals.
pub fn write_history_csv<W: Write>(writer: W, records: &[FeeHistory]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(HEADER)?;

    for record in records {
        let configuration_id = record
            .configuration_id
            .map(|id| id.to_string())
            .unwrap_or_default();
        wtr.write_record([
            record.created_at.to_rfc3339(),
            record.transaction_id.to_string(),
            configuration_id,
            record.calculation_method.to_string(),
            record.original_amount.amount_string(),
            record.calculated_fee.amount_string(),
            record.calculated_fee.currency.code().to_string(),
            record.fee_bearer.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Convenience wrapper returning the CSV document as a string.
pub fn history_csv_string(records: &[FeeHistory]) -> Result<String, csv::Error> {
    let mut buf = Vec::new();
    write_history_csv(&mut buf, records)?;
    String::from_utf8(buf).map_err(|e| csv::Error::from(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}
