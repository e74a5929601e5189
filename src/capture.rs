//! Turns rendered dashboard charts into PNG images for the PDF report.
//!
//! Capturing is best effort: a chart that cannot be captured is left out of
//! the report and the failure is logged.

use std::{future::Future, path::Path};

use crate::{
    Error,
    charts::{ChartKind, ChartSurface},
};

/// A PNG encoded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    bytes: Vec<u8>,
}

impl RasterImage {
    /// Wrap PNG bytes.
    pub fn png(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Read a PNG image from disk.
    ///
    /// # Errors
    /// Returns [Error::IoError] if the file cannot be read.
    pub fn load_png(path: &Path) -> Result<Self, Error> {
        Ok(Self::png(std::fs::read(path)?))
    }

    /// The encoded image.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Why a chart could not be captured.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CaptureError {
    /// The chart has not been drawn yet.
    #[error("the {0} chart is not mounted")]
    NotMounted(ChartKind),

    /// This build cannot rasterize charts.
    #[error("chart rendering is not available in this build")]
    RendererUnavailable,

    /// The renderer failed.
    #[error("could not render the {0} chart: {1}")]
    RenderFailed(ChartKind, String),
}

/// Produces a raster image of a chart surface.
pub trait ChartCapturer {
    /// Capture the current contents of `surface`.
    fn capture(&self, surface: &ChartSurface) -> impl Future<Output = Result<RasterImage, CaptureError>>;
}

/// Rasterizes charts with the ECharts server side renderer.
///
/// Rendering needs the `ssr` feature. Without it every capture fails with
/// [CaptureError::RendererUnavailable].
#[derive(Debug, Clone, Copy)]
pub struct EchartsCapturer {
    width: u32,
    height: u32,
}

impl EchartsCapturer {
    /// A capturer producing images of `width` x `height` pixels.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for EchartsCapturer {
    fn default() -> Self {
        Self::new(460, 400)
    }
}

impl ChartCapturer for EchartsCapturer {
    fn capture(&self, surface: &ChartSurface) -> impl Future<Output = Result<RasterImage, CaptureError>> {
        let kind = surface.kind();
        let chart = surface.chart();
        let (width, height) = (self.width, self.height);

        async move {
            let chart = chart.ok_or(CaptureError::NotMounted(kind))?;
            render_png(kind, chart, width, height)
        }
    }
}

#[cfg(feature = "ssr")]
fn render_png(
    kind: ChartKind,
    chart: &charming::Chart,
    width: u32,
    height: u32,
) -> Result<RasterImage, CaptureError> {
    let mut renderer = charming::ImageRenderer::new(width, height);

    renderer
        .render_format(charming::ImageFormat::Png, chart)
        .map(RasterImage::png)
        .map_err(|error| CaptureError::RenderFailed(kind, format!("{error:?}")))
}

#[cfg(not(feature = "ssr"))]
fn render_png(
    _kind: ChartKind,
    _chart: &charming::Chart,
    _width: u32,
    _height: u32,
) -> Result<RasterImage, CaptureError> {
    Err(CaptureError::RendererUnavailable)
}

/// The chart images available to the PDF report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartImages {
    images: Vec<(ChartKind, RasterImage)>,
}

impl ChartImages {
    /// No chart images.
    pub fn none() -> Self {
        Self::default()
    }

    /// Add or replace the image for `kind`.
    pub fn insert(&mut self, kind: ChartKind, image: RasterImage) {
        self.images.retain(|(existing, _)| *existing != kind);
        self.images.push((kind, image));
    }

    /// The image for `kind`, if it was captured.
    pub fn get(&self, kind: ChartKind) -> Option<&RasterImage> {
        self.images
            .iter()
            .find(|(existing, _)| *existing == kind)
            .map(|(_, image)| image)
    }

    /// Whether no chart was captured.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Capture every surface, skipping the ones that fail.
pub async fn capture_charts<C: ChartCapturer>(capturer: &C, surfaces: &[ChartSurface]) -> ChartImages {
    let mut images = ChartImages::none();

    for surface in surfaces {
        match capturer.capture(surface).await {
            Ok(image) => images.insert(surface.kind(), image),
            Err(error) => tracing::warn!("skipping chart in report: {error}"),
        }
    }

    images
}
