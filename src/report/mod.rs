//! Export of the transaction snapshot as CSV and PDF reports.
//!
//! Rendering is a pure transform of the snapshot, the totals and any chart
//! images. Subscriptions and identity never reach this module.

use time::Date;

use crate::{capture::RasterImage, config::ReportConfig};

mod csv;
mod currency;
pub mod layout;
mod pdf;

pub use self::csv::render_csv;
pub use currency::{format_csv_amount, format_pdf_currency};
pub use pdf::render_pdf;

/// Settings for the PDF report.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfOptions {
    /// Shown in the report title.
    pub app_name: String,
    /// Prefixed to every amount.
    pub currency_symbol: String,
    /// The date shown in the "Generated on" line.
    pub generated_on: Date,
    /// Optional PNG logo drawn above the title.
    pub logo: Option<RasterImage>,
}

impl PdfOptions {
    /// Build the options from `config`.
    ///
    /// A logo that cannot be read is logged and left out.
    pub fn from_config(config: &ReportConfig, generated_on: Date) -> Self {
        let logo = config
            .logo_path
            .as_deref()
            .and_then(|path| match RasterImage::load_png(path) {
                Ok(logo) => Some(logo),
                Err(error) => {
                    tracing::warn!("could not load logo {}: {error}", path.display());
                    None
                }
            });

        Self {
            app_name: config.app_name.clone(),
            currency_symbol: config.currency_symbol.clone(),
            generated_on,
            logo,
        }
    }
}

/// A rendered report, ready to be saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// Suggested file name, e.g. `CashPilot-2024-05-17.pdf`.
    pub file_name: String,
    /// MIME type of `bytes`.
    pub media_type: &'static str,
    /// The file contents.
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    /// Wrap a rendered CSV report.
    pub fn csv(app_name: &str, date: Date, bytes: Vec<u8>) -> Self {
        Self {
            file_name: format!("{app_name}-{date}.csv"),
            media_type: "text/csv; charset=utf-8",
            bytes,
        }
    }

    /// Wrap a rendered PDF report.
    pub fn pdf(app_name: &str, date: Date, bytes: Vec<u8>) -> Self {
        Self {
            file_name: format!("{app_name}-{date}.pdf"),
            media_type: "application/pdf",
            bytes,
        }
    }
}
