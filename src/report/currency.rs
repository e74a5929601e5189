//! Currency formatting for the two export targets.
//!
//! The PDF shows amounts the way people read them (`₦1,234.50`) while the CSV
//! holds plain numbers that spreadsheets can parse (`1234.50`).

use std::sync::OnceLock;

use numfmt::{Formatter, Precision};

/// Format `amount` for display in the PDF report.
///
/// The symbol is prefixed, thousands are grouped with commas and there are
/// always exactly two decimal places. Negative amounts put the sign before
/// the symbol, e.g. `-₦12.00`.
pub fn format_pdf_currency(amount: f64, symbol: &str) -> String {
    let cents = (amount.abs() * 100.0).round();

    // numfmt renders zero as "0", and rounding can turn a tiny negative
    // number into zero, so zero never gets a sign.
    if cents == 0.0 {
        return format!("{symbol}0.00");
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    let digits = match grouping_formatter() {
        Some(formatter) => with_two_decimals(formatter.fmt_string(cents / 100.0)),
        None => format!("{:.2}", cents / 100.0),
    };

    format!("{sign}{symbol}{digits}")
}

/// Format `amount` for the CSV export: two decimal places, no grouping and
/// no symbol.
pub fn format_csv_amount(amount: f64) -> String {
    format!("{amount:.2}")
}

fn grouping_formatter() -> Option<&'static Formatter> {
    static FORMATTER: OnceLock<Option<Formatter>> = OnceLock::new();

    FORMATTER
        .get_or_init(|| match Formatter::currency("") {
            Ok(formatter) => Some(formatter.precision(Precision::Decimals(2))),
            Err(error) => {
                tracing::error!("could not create the currency formatter: {error:?}");
                None
            }
        })
        .as_ref()
}

/// numfmt omits trailing zeros, e.g. "12.30" is rendered as "12.3", so pad
/// the fraction back to two digits.
fn with_two_decimals(mut formatted: String) -> String {
    match formatted.find('.') {
        Some(point) => {
            for _ in formatted.len() - point - 1..2 {
                formatted.push('0');
            }
        }
        None => formatted.push_str(".00"),
    }

    formatted
}

#[cfg(test)]
mod tests {
    use super::{format_csv_amount, format_pdf_currency, with_two_decimals};

    #[test]
    fn pdf_currency_groups_thousands() {
        let cases = [
            (0.0, "₦0.00"),
            (5.5, "₦5.50"),
            (999.999, "₦1,000.00"),
            (1234.5, "₦1,234.50"),
            (1_234_567.891, "₦1,234,567.89"),
            (100_000.0, "₦100,000.00"),
        ];

        for (amount, want) in cases {
            assert_eq!(format_pdf_currency(amount, "₦"), want, "amount {amount}");
        }
    }

    #[test]
    fn pdf_currency_negative_sign_goes_first() {
        assert_eq!(format_pdf_currency(-12.0, "₦"), "-₦12.00");
        assert_eq!(format_pdf_currency(-1500.25, "$"), "-$1,500.25");
    }

    #[test]
    fn pdf_currency_negative_zero_has_no_sign() {
        assert_eq!(format_pdf_currency(-0.001, "₦"), "₦0.00");
    }

    #[test]
    fn pdf_currency_keeps_trailing_zeros() {
        assert_eq!(format_pdf_currency(12.3, "₦"), "₦12.30");
        assert_eq!(format_pdf_currency(12.0, "₦"), "₦12.00");
        assert_eq!(format_pdf_currency(0.5, "$"), "$0.50");
    }

    #[test]
    fn fraction_is_padded_to_two_digits() {
        assert_eq!(with_two_decimals("1,234".to_owned()), "1,234.00");
        assert_eq!(with_two_decimals("1,234.5".to_owned()), "1,234.50");
        assert_eq!(with_two_decimals("1,234.56".to_owned()), "1,234.56");
    }

    #[test]
    fn csv_amount_is_plain() {
        assert_eq!(format_csv_amount(1234.5), "1234.50");
        assert_eq!(format_csv_amount(0.0), "0.00");
        assert_eq!(format_csv_amount(-3.456), "-3.46");
    }
}
