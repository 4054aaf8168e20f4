// src/render.rs
use std::io::{self, Stdout, Write};

use chrono::{DateTime, TimeDelta, Utc};
use crossterm::{
    cursor::MoveTo,
    queue,
    terminal::{self, Clear, ClearType},
};
use rasciigraph::Config as PlotConfig;

use crate::config::lookback::format_go_duration;
use crate::error::RenderError;
use crate::series::DenseSeries;

/// Share of the terminal the chart may use.
const SCREEN_FILL: f64 = 0.98;
/// Columns kept free for the y-axis labels left of the plot.
const AXIS_GUTTER: usize = 12;
/// Label padding, as in asciigraph.
const AXIS_OFFSET: u32 = 3;

/// Plot `values` as an ASCII line chart with `caption` underneath. `width`
/// counts data columns only. An empty series prints just the caption.
pub fn plot(values: &[f64], width: usize, height: usize, caption: &str) -> String {
    if values.is_empty() {
        return caption.to_string();
    }
    let config = PlotConfig::default()
        .with_width(width.max(1) as u32)
        .with_height(height.max(1) as u32)
        .with_offset(AXIS_OFFSET)
        .with_caption(caption.to_string());
    rasciigraph::plot(values.to_vec(), config)
}

#[derive(Debug, Clone)]
pub struct RenderContext {
    pub metric: String,
    pub namespace: String,
    pub lookback: TimeDelta,
    pub as_of: DateTime<Utc>,
}

impl RenderContext {
    pub fn caption(&self) -> String {
        format!(
            "[{}/{}] with lookback={} (last updated at {})",
            self.namespace,
            self.metric,
            format_go_duration(self.lookback),
            self.as_of.format("%Y-%m-%d %H:%M:%S %Z")
        )
    }
}

pub trait Renderer: Send {
    fn render(&mut self, series: &DenseSeries, ctx: &RenderContext) -> Result<(), RenderError>;
}

/// Clears the screen and redraws the chart sized to the current terminal.
pub struct TerminalRenderer<W> {
    out: W,
}

impl TerminalRenderer<Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write + Send> Renderer for TerminalRenderer<W> {
    fn render(&mut self, series: &DenseSeries, ctx: &RenderContext) -> Result<(), RenderError> {
        let (cols, rows) = terminal::size().map_err(RenderError::TerminalSize)?;
        let width = ((cols as f64 * SCREEN_FILL) as usize).saturating_sub(AXIS_GUTTER);
        // last row holds the caption
        let height = ((rows as f64 * SCREEN_FILL) as usize).saturating_sub(1);
        let graph = plot(series.values(), width, height, &ctx.caption());

        queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        writeln!(self.out, "{graph}")?;
        self.out.flush()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub values: Vec<f64>,
    pub as_of: DateTime<Utc>,
    pub caption: String,
}

/// Keeps every frame in memory; optionally fails on the n-th call (1-based).
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub frames: Vec<Frame>,
    fail_on: Option<usize>,
    calls: usize,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on: Some(call),
            ..Self::default()
        }
    }
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, series: &DenseSeries, ctx: &RenderContext) -> Result<(), RenderError> {
        self.calls += 1;
        if self.fail_on == Some(self.calls) {
            return Err(RenderError::Other(format!("scripted failure on render #{}", self.calls)));
        }
        self.frames.push(Frame {
            values: series.values().to_vec(),
            as_of: ctx.as_of,
            caption: ctx.caption(),
        });
        Ok(())
    }
}

impl<R: Renderer + ?Sized> Renderer for &mut R {
    fn render(&mut self, series: &DenseSeries, ctx: &RenderContext) -> Result<(), RenderError> {
        (**self).render(series, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn caption_uses_go_style_lookback() {
        let ctx = RenderContext {
            metric: "orders|created".into(),
            namespace: "Shop".into(),
            lookback: TimeDelta::hours(-12),
            as_of: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        };
        assert_eq!(
            ctx.caption(),
            "[Shop/orders|created] with lookback=-12h0m0s (last updated at 2024-03-01 12:00:00 UTC)"
        );
    }

    #[test]
    fn empty_series_plots_only_the_caption() {
        assert_eq!(plot(&[], 40, 10, "cap"), "cap");
    }

    #[test]
    fn plot_draws_axis_rows_and_caption() {
        let graph = plot(&[0.0, 3.0, 0.0, 0.0, 7.0], 20, 5, "[Shop/orders]");
        assert!(graph.lines().count() > 2);
        assert!(graph.contains('┤'));
        assert!(graph.trim_end().ends_with("[Shop/orders]"));
    }

    #[test]
    fn recording_renderer_fails_on_request() {
        let ctx = RenderContext {
            metric: "m".into(),
            namespace: "n".into(),
            lookback: TimeDelta::minutes(-5),
            as_of: Utc::now(),
        };
        let s = DenseSeries::empty(ctx.as_of);
        let mut r = RecordingRenderer::failing_on(2);
        assert!(r.render(&s, &ctx).is_ok());
        assert!(r.render(&s, &ctx).is_err());
        assert_eq!(r.frames.len(), 1);
    }
}
