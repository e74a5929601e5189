//! Page layout of the PDF report.
//!
//! The report is planned as plain data before anything is drawn, so the
//! placement and pagination rules can be checked without parsing a PDF.
//! All coordinates are in points, measured from the left and top edges of an
//! A4 page. Text positions are baselines, image positions are top-left
//! corners.

use crate::{
    capture::ChartImages,
    charts::ChartKind,
    metrics::Totals,
    models::Transaction,
    report::{PdfOptions, currency::format_pdf_currency},
};

/// A4 width in points.
pub const PAGE_WIDTH: f64 = 595.28;
/// A4 height in points.
pub const PAGE_HEIGHT: f64 = 841.89;

const MARGIN: f64 = 40.0;
const TOP: f64 = 40.0;

const LOGO_SIZE: f64 = 50.0;
const TITLE_Y: f64 = 110.0;
const TITLE_SIZE: f64 = 22.0;
const BODY_SIZE: f64 = 12.0;
const HEADING_SIZE: f64 = 16.0;
const TABLE_SIZE: f64 = 11.0;

const CHART_WIDTH: f64 = 230.0;
const CHART_HEIGHT: f64 = 200.0;
const CHART_CAPTION_GAP: f64 = 10.0;
const CHART_BLOCK_HEIGHT: f64 = 230.0;

const COLUMNS: [f64; 5] = [40.0, 140.0, 240.0, 340.0, 440.0];
const ROW_HEIGHT: f64 = 16.0;
/// Rows are only started above this line, anything lower goes on a new page.
pub const PAGE_BREAK_Y: f64 = 760.0;

/// An image placed on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    /// The application logo.
    Logo,
    /// A captured dashboard chart.
    Chart(ChartKind),
}

/// A single drawing instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Text with its baseline at `y`.
    Text {
        /// The text to draw.
        text: String,
        /// Left edge of the text.
        x: f64,
        /// Baseline.
        y: f64,
        /// Font size in points.
        size: f64,
        /// Whether to use the bold face.
        bold: bool,
    },
    /// A horizontal 1 pt line.
    Rule {
        /// Start of the line.
        x1: f64,
        /// End of the line.
        x2: f64,
        /// Vertical position.
        y: f64,
    },
    /// An image with its top-left corner at (`x`, `y`).
    Image {
        /// Which image to draw.
        slot: ImageSlot,
        /// Left edge.
        x: f64,
        /// Top edge.
        y: f64,
        /// Width in points.
        width: f64,
        /// Height in points.
        height: f64,
    },
}

/// The draw operations of one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Operations in drawing order.
    pub ops: Vec<DrawOp>,
}

/// Where a transaction row ended up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowPlacement {
    /// Index of the transaction in the input slice.
    pub index: usize,
    /// Zero-based page number.
    pub page: usize,
    /// Baseline of the row.
    pub y: f64,
}

/// The planned report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLayout {
    /// Pages in order, never empty.
    pub pages: Vec<Page>,
    /// One placement per transaction, in input order.
    pub rows: Vec<RowPlacement>,
}

/// Plan every page of the report.
///
/// The logo slot is only used when `options` has a logo, and the chart block
/// is only added when at least one chart image was captured.
pub fn plan_report(
    transactions: &[Transaction],
    totals: &Totals,
    images: &ChartImages,
    options: &PdfOptions,
) -> ReportLayout {
    let mut ops = Vec::new();
    let mut y = TOP;

    if options.logo.is_some() {
        ops.push(DrawOp::Image {
            slot: ImageSlot::Logo,
            x: PAGE_WIDTH / 2.0 - LOGO_SIZE / 2.0,
            y,
            width: LOGO_SIZE,
            height: LOGO_SIZE,
        });
    }

    y = TITLE_Y;
    ops.push(centered_text(
        format!("{} Financial Report", options.app_name),
        y,
        TITLE_SIZE,
        true,
    ));
    y += 20.0;
    ops.push(centered_text(
        format!("Generated on: {}", options.generated_on),
        y,
        BODY_SIZE,
        false,
    ));
    y += 30.0;

    ops.push(text("Summary Overview", MARGIN, y, HEADING_SIZE));
    y += 20.0;
    let symbol = &options.currency_symbol;
    for (label, amount) in [
        ("Total Income", totals.income),
        ("Total Expenses", totals.expense),
        ("Balance", totals.balance),
    ] {
        ops.push(text(
            format!("{label}: {}", format_pdf_currency(amount, symbol)),
            MARGIN,
            y,
            BODY_SIZE,
        ));
        y += 18.0;
    }
    y += 12.0;

    if !images.is_empty() {
        let image_y = y + CHART_CAPTION_GAP;
        for (kind, x) in [
            (ChartKind::ExpenseBreakdown, 40.0),
            (ChartKind::IncomeVsExpense, 300.0),
        ] {
            if images.get(kind).is_none() {
                continue;
            }
            ops.push(text(kind.title(), x, y, BODY_SIZE));
            ops.push(DrawOp::Image {
                slot: ImageSlot::Chart(kind),
                x,
                y: image_y,
                width: CHART_WIDTH,
                height: CHART_HEIGHT,
            });
        }
        y = image_y + CHART_BLOCK_HEIGHT;
    }

    ops.push(text("Transactions", MARGIN, y, HEADING_SIZE));
    y += 15.0;
    ops.push(DrawOp::Rule {
        x1: MARGIN,
        x2: PAGE_WIDTH - MARGIN,
        y,
    });
    y += 15.0;
    for (heading, x) in ["Date", "Type", "Category", "Amount", "Note"]
        .into_iter()
        .zip(COLUMNS)
    {
        ops.push(text(heading, x, y, TABLE_SIZE));
    }
    y += 12.0;

    let mut pages = vec![Page { ops }];
    let mut rows = Vec::with_capacity(transactions.len());

    for (index, transaction) in transactions.iter().enumerate() {
        if y > PAGE_BREAK_Y {
            pages.push(Page::default());
            y = TOP;
        }

        let page = pages.len() - 1;
        for (cell, x) in row_cells(transaction, symbol).into_iter().zip(COLUMNS) {
            pages[page].ops.push(text(cell, x, y, TABLE_SIZE));
        }
        rows.push(RowPlacement { index, page, y });

        y += ROW_HEIGHT;
    }

    ReportLayout { pages, rows }
}

fn row_cells(transaction: &Transaction, symbol: &str) -> [String; 5] {
    let date = match transaction.date {
        Some(date) => date.to_string().chars().take(10).collect(),
        None => "-".to_owned(),
    };

    [
        date,
        transaction.kind.as_str().to_owned(),
        transaction.category.clone(),
        format_pdf_currency(transaction.amount, symbol),
        transaction
            .note
            .clone()
            .unwrap_or_else(|| "-".to_owned()),
    ]
}

fn text(text: impl Into<String>, x: f64, y: f64, size: f64) -> DrawOp {
    DrawOp::Text {
        text: text.into(),
        x,
        y,
        size,
        bold: false,
    }
}

fn centered_text(text: String, y: f64, size: f64, bold: bool) -> DrawOp {
    let x = (PAGE_WIDTH - text_width(&text, size, bold)) / 2.0;

    DrawOp::Text {
        text,
        x,
        y,
        size,
        bold,
    }
}

/// Approximate width of DejaVu Sans text, used for centring only.
fn text_width(text: &str, size: f64, bold: bool) -> f64 {
    let em = if bold { 0.62 } else { 0.55 };
    text.chars().count() as f64 * size * em
}
