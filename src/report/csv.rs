//! CSV export of the transaction snapshot.

use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::{Error, models::Transaction, report::currency::format_csv_amount};

const HEADER: [&str; 5] = ["Date", "Type", "Category", "Amount", "Note"];

/// Write `transactions` as CSV, one row per transaction in the given order.
///
/// The header is always written, so an empty slice produces a header-only
/// document. Fields containing commas, quotes or line breaks are quoted.
///
/// # Errors
/// Returns [Error::CsvError] if the writer fails.
pub fn render_csv(transactions: &[Transaction]) -> Result<Vec<u8>, Error> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer.write_record(HEADER).map_err(csv_error)?;

    for transaction in transactions {
        let date = transaction
            .date
            .map(|date| date.to_string())
            .unwrap_or_default();

        writer
            .write_record([
                date.as_str(),
                transaction.kind.as_str(),
                transaction.category.as_str(),
                format_csv_amount(transaction.amount).as_str(),
                transaction.note.as_deref().unwrap_or(""),
            ])
            .map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))
}

fn csv_error(error: csv::Error) -> Error {
    tracing::error!("could not write CSV record: {error}");
    Error::CsvError(error.to_string())
}
