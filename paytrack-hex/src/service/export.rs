//! CSV rendering of payment records.

use paytrack_types::{AppError, PaymentRecord};

pub const CSV_HEADER: [&str; 6] = [
    "Transaction Date",
    "Description",
    "Amount",
    "Category",
    "Payment Method",
    "Status",
];

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Renders records as CSV with a fixed header row. Quoting follows RFC 4180.
pub fn payments_to_csv(records: &[PaymentRecord]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER).map_err(csv_error)?;

    for record in records {
        let p = &record.payment;
        writer
            .write_record([
                p.transaction_date.format(DATE_FORMAT).to_string(),
                p.description.clone(),
                p.amount.to_string(),
                record.category.name.clone(),
                record.payment_method.name.clone(),
                p.status.to_string(),
            ])
            .map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::Internal(e.to_string()))
}

fn csv_error(e: csv::Error) -> AppError {
    AppError::Internal(format!("CSV export failed: {}", e))
}
