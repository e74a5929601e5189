//! Draws a planned [ReportLayout] into a PDF document with `printpdf`.
//!
//! Text is set in DejaVu Sans, embedded in every report, so currency signs
//! such as `₦` and non-Latin categories and notes are drawn as written.

use std::io::BufWriter;

use printpdf::{
    Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfLayerReference, Point,
    image_crate::{self, DynamicImage},
};

use crate::{
    Error,
    capture::{ChartImages, RasterImage},
    metrics::Totals,
    models::Transaction,
    report::{
        PdfOptions,
        layout::{DrawOp, ImageSlot, PAGE_HEIGHT, PAGE_WIDTH, ReportLayout, plan_report},
    },
};

/// Render the PDF report for `transactions`.
///
/// Images that cannot be decoded are left out of the report.
///
/// # Errors
/// Returns [Error::PdfError] if the document cannot be assembled or written.
pub fn render_pdf(
    transactions: &[Transaction],
    totals: &Totals,
    images: &ChartImages,
    options: &PdfOptions,
) -> Result<Vec<u8>, Error> {
    let layout = plan_report(transactions, totals, images, options);

    tracing::debug!(
        "rendering PDF report with {} rows over {} pages",
        layout.rows.len(),
        layout.pages.len()
    );

    draw(&layout, images, options)
}

const REGULAR_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
const BOLD_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

fn draw(layout: &ReportLayout, images: &ChartImages, options: &PdfOptions) -> Result<Vec<u8>, Error> {
    let (doc, first_page, first_layer) = PdfDocument::new(
        format!("{} Financial Report", options.app_name),
        to_mm(PAGE_WIDTH),
        to_mm(PAGE_HEIGHT),
        "Layer 1",
    );

    let fonts = Fonts {
        regular: doc.add_external_font(REGULAR_FONT).map_err(pdf_error)?,
        bold: doc.add_external_font(BOLD_FONT).map_err(pdf_error)?,
    };

    for (index, page) in layout.pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(to_mm(PAGE_WIDTH), to_mm(PAGE_HEIGHT), "Layer 1");
            doc.get_page(page).get_layer(layer)
        };

        for op in &page.ops {
            draw_op(&layer, op, &fonts, images, options);
        }
    }

    let mut writer = BufWriter::new(Vec::<u8>::new());
    doc.save(&mut writer).map_err(pdf_error)?;
    writer
        .into_inner()
        .map_err(|error| Error::PdfError(error.to_string()))
}

fn draw_op(
    layer: &PdfLayerReference,
    op: &DrawOp,
    fonts: &Fonts,
    images: &ChartImages,
    options: &PdfOptions,
) {
    match op {
        DrawOp::Text {
            text,
            x,
            y,
            size,
            bold,
        } => {
            let font = if *bold { &fonts.bold } else { &fonts.regular };
            layer.use_text(text.as_str(), *size as f32, to_mm(*x), from_top(*y), font);
        }
        DrawOp::Rule { x1, x2, y } => {
            layer.set_outline_thickness(1.0);
            layer.add_line(Line {
                points: vec![
                    (Point::new(to_mm(*x1), from_top(*y)), false),
                    (Point::new(to_mm(*x2), from_top(*y)), false),
                ],
                is_closed: false,
            });
        }
        DrawOp::Image {
            slot,
            x,
            y,
            width,
            height,
        } => {
            let source = match slot {
                ImageSlot::Logo => options.logo.as_ref(),
                ImageSlot::Chart(kind) => images.get(*kind),
            };
            let Some(source) = source else {
                return;
            };

            match decode_png(source) {
                Ok((image, pixel_width, pixel_height)) => image.add_to_layer(
                    layer.clone(),
                    ImageTransform {
                        translate_x: Some(to_mm(*x)),
                        translate_y: Some(from_top(y + height)),
                        // At 72 DPI one pixel is one point.
                        dpi: Some(72.0),
                        scale_x: Some((width / pixel_width as f64) as f32),
                        scale_y: Some((height / pixel_height as f64) as f32),
                        ..Default::default()
                    },
                ),
                Err(error) => tracing::warn!("leaving {slot:?} out of the PDF report: {error}"),
            }
        }
    }
}

/// Decode a PNG into an image printpdf can embed, along with its size in
/// pixels.
fn decode_png(source: &RasterImage) -> Result<(Image, u32, u32), Error> {
    let decoded = image_crate::load_from_memory_with_format(
        source.bytes(),
        image_crate::ImageFormat::Png,
    )
    .map_err(|error| Error::ImageError(error.to_string()))?;

    // The alpha channel is dropped, printpdf embeds RGB.
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::ImageError("image has no pixels".to_owned()));
    }

    Ok((
        Image::from_dynamic_image(&DynamicImage::ImageRgb8(rgb)),
        width,
        height,
    ))
}

fn to_mm(points: f64) -> Mm {
    Mm((points * 25.4 / 72.0) as f32)
}

/// Convert a distance from the top edge to printpdf's bottom-up coordinates.
fn from_top(y: f64) -> Mm {
    to_mm(PAGE_HEIGHT - y)
}

fn pdf_error(error: impl std::fmt::Display) -> Error {
    tracing::error!("could not build the PDF report: {error}");
    Error::PdfError(error.to_string())
}
