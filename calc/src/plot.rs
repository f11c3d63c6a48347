//! The plotting seam. Table strings describe plots; a [`ChartBackend`]
//! draws them and writes image files.

use std::path::{Path, PathBuf};

use rivet::block::Options;

use crate::error::CalcError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Line,
    Scatter,
    Bar,
}

impl SeriesKind {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "line" | "l" => Some(SeriesKind::Line),
            "scatter" | "s" | "point" => Some(SeriesKind::Scatter),
            "bar" | "b" => Some(SeriesKind::Bar),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub y_column: String,
    pub kind: SeriesKind,
    pub color: String,
}

/// Everything needed to draw one figure from a named table.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSpec {
    pub table: String,
    pub x_column: String,
    pub series: Vec<Series>,
    /// Inclusive data-row range.
    pub rows: Option<(usize, usize)>,
    pub grid: bool,
}

impl PlotSpec {
    /// Build from `plot` options `x:col, y:col, r:A-B, k:kind, c:color, g:t/f`.
    pub fn from_options(table: &str, options: &Options) -> Result<Self, CalcError> {
        let x_column = options
            .get("x")
            .ok_or_else(|| CalcError::Plot(format!("plot of '{}' needs an x column", table)))?;
        Ok(PlotSpec {
            table: table.to_string(),
            x_column: x_column.to_string(),
            series: vec![series_from_options(options)?],
            rows: options.range("r"),
            grid: options.flag("g").unwrap_or(true),
        })
    }

    /// Add the series described by `add` options.
    pub fn add_series(&mut self, options: &Options) -> Result<(), CalcError> {
        self.series.push(series_from_options(options)?);
        Ok(())
    }
}

fn series_from_options(options: &Options) -> Result<Series, CalcError> {
    let y_column = options
        .get("y")
        .ok_or_else(|| CalcError::Plot("series needs a y column".to_string()))?;
    let kind = match options.get("k") {
        None => SeriesKind::Line,
        Some(k) => SeriesKind::parse(k)
            .ok_or_else(|| CalcError::Plot(format!("unknown series kind '{}'", k)))?,
    };
    Ok(Series {
        y_column: y_column.to_string(),
        kind,
        color: options.get("c").unwrap_or("black").to_string(),
    })
}

/// A charting library.
pub trait ChartBackend {
    /// Draw (or redraw) the current figure.
    fn draw(&mut self, spec: &PlotSpec) -> Result<(), CalcError>;
    /// Write the current figure as a raster image at `path`.
    fn export(&mut self, spec: &PlotSpec, path: &Path) -> Result<(), CalcError>;
}

/// Records every call; used when no charting library is attached.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub drawn: Vec<PlotSpec>,
    pub exported: Vec<(PlotSpec, PathBuf)>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChartBackend for RecordingBackend {
    fn draw(&mut self, spec: &PlotSpec) -> Result<(), CalcError> {
        self.drawn.push(spec.clone());
        Ok(())
    }

    fn export(&mut self, spec: &PlotSpec, path: &Path) -> Result<(), CalcError> {
        self.exported.push((spec.clone(), path.to_path_buf()));
        Ok(())
    }
}
