//! The validation boundary between raw store documents and the domain models.
//!
//! Documents arrive from the store as untyped JSON written by other clients.
//! Every coercion of their fields happens here, so that the rest of the crate
//! can rely on well-formed [Transaction], [Budget] and [MonthlyIncomeEntry]
//! values. None of these functions fail: malformed fields fall back to a
//! default and are logged at debug level.

use serde_json::Value;
use time::{
    Date, Duration, OffsetDateTime, format_description::BorrowedFormatItem,
    format_description::well_known::Rfc3339, macros::format_description,
};

use crate::{
    UserID,
    models::{Budget, MonthlyIncomeEntry, Transaction, TransactionType},
    stores::Document,
};

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// Coerce an `amount` field to a finite number.
///
/// Numbers are used as-is and strings are parsed after trimming whitespace
/// (an empty string is zero). Anything else, including a missing field, a
/// non-numeric string or a value that is not finite, is zero.
pub fn coerce_amount(value: Option<&Value>) -> f64 {
    let amount = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) if text.trim().is_empty() => Some(0.0),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    match amount {
        Some(amount) if amount.is_finite() => amount,
        _ => {
            tracing::debug!("coercing non-numeric amount {value:?} to 0");
            0.0
        }
    }
}

/// Parse a timestamp field.
///
/// Accepts an RFC 3339 string, an object with `seconds` and optional
/// `nanoseconds` (also with a leading underscore, as exported by Firestore),
/// or an integer number of milliseconds since the Unix epoch.
pub fn parse_timestamp(value: &Value) -> Option<OffsetDateTime> {
    match value {
        Value::String(text) => OffsetDateTime::parse(text, &Rfc3339).ok(),
        Value::Number(number) => {
            let millis = number.as_i64()?;
            OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
        }
        Value::Object(object) => {
            let seconds = object
                .get("seconds")
                .or_else(|| object.get("_seconds"))
                .and_then(Value::as_i64)?;
            let nanoseconds = object
                .get("nanoseconds")
                .or_else(|| object.get("_nanoseconds"))
                .and_then(Value::as_i64)
                .unwrap_or(0);

            OffsetDateTime::from_unix_timestamp(seconds)
                .ok()
                .map(|timestamp| timestamp + Duration::nanoseconds(nanoseconds))
        }
        _ => None,
    }
}

/// Parse a calendar date field.
///
/// Accepts `YYYY-MM-DD` or any of the timestamp shapes understood by
/// [parse_timestamp], in which case the UTC date is used.
pub fn parse_date(value: &Value) -> Option<Date> {
    if let Value::String(text) = value {
        if let Ok(date) = Date::parse(text, &DATE_FORMAT) {
            return Some(date);
        }
    }

    parse_timestamp(value).map(|timestamp| timestamp.date())
}

/// Normalize a transaction document.
///
/// A `type` other than `"income"` is treated as an expense.
pub fn parse_transaction(document: &Document) -> Transaction {
    let kind = match document.get("type").and_then(Value::as_str) {
        Some("income") => TransactionType::Income,
        _ => TransactionType::Expense,
    };

    let date = document.get("date").and_then(|value| {
        let date = parse_date(value);
        if date.is_none() {
            tracing::debug!(
                "transaction {} has an unreadable date {value:?}",
                document.id
            );
        }
        date
    });

    let note = text_field(document, "note");

    Transaction {
        id: document.id.clone(),
        user_id: UserID::new(text_field(document, "userId")),
        kind,
        amount: coerce_amount(document.get("amount")),
        category: text_field(document, "category"),
        label: text_field(document, "label"),
        date,
        note: (!note.is_empty()).then_some(note),
        created_at: document.get("createdAt").and_then(parse_timestamp),
        updated_at: document.get("updatedAt").and_then(parse_timestamp),
    }
}

/// Normalize a budget document.
pub fn parse_budget(document: &Document) -> Budget {
    Budget {
        id: document.id.clone(),
        user_id: UserID::new(text_field(document, "userId")),
        amount: coerce_amount(document.get("amount")),
    }
}

/// Normalize a monthly income document.
pub fn parse_monthly_income(document: &Document) -> MonthlyIncomeEntry {
    MonthlyIncomeEntry {
        id: document.id.clone(),
        user_id: UserID::new(text_field(document, "userId")),
        amount: coerce_amount(document.get("amount")),
        created_at: document.get("createdAt").and_then(parse_timestamp),
    }
}

/// Read a text field, rendering numbers as text and anything else as empty.
fn text_field(document: &Document, name: &str) -> String {
    match document.get(name) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    }
}
