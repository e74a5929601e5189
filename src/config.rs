//! Settings for the exported reports.

use std::path::PathBuf;

use time::Date;

use crate::{Error, timezone::local_today};

/// The default application name used in report titles and file names.
pub const DEFAULT_APP_NAME: &str = "CashPilot";
/// The default currency symbol.
pub const DEFAULT_CURRENCY_SYMBOL: &str = "₦";
/// The default canonical timezone.
pub const DEFAULT_TIMEZONE: &str = "Etc/UTC";

/// How reports are named and presented.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    /// Used in the PDF title and in export file names.
    pub app_name: String,
    /// Prefixed to amounts in the PDF report.
    pub currency_symbol: String,
    /// Canonical timezone name used for the "generated on" date.
    pub local_timezone: String,
    /// PNG logo for the PDF header.
    pub logo_path: Option<PathBuf>,
}

impl ReportConfig {
    /// Today's date in the configured timezone.
    ///
    /// # Errors
    /// Returns [Error::InvalidTimezoneError] if `local_timezone` is not a
    /// canonical timezone name.
    pub fn today(&self) -> Result<Date, Error> {
        local_today(&self.local_timezone)
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_owned(),
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_owned(),
            local_timezone: DEFAULT_TIMEZONE.to_owned(),
            logo_path: None,
        }
    }
}
