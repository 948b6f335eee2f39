use std::ops::Range;

use plotters::prelude::*;
use thiserror::Error;

use crate::services::results_json::{ResultsJsonError, load_results_from_json_file};
use crate::services::results_types::ResultsDocument;
use crate::services::trace_query::{
    Channel, TraceQueryError, device_summaries, rank_by_lifetime, series, window,
};

const PANEL_CHANNELS: [Channel; 4] = [
    Channel::JunctionTemperature,
    Channel::Voltage,
    Channel::Current,
    Channel::TotalLoss,
];

#[derive(Error, Debug)]
pub enum TracePlotError {
    #[error(transparent)]
    Results(#[from] ResultsJsonError),
    #[error(transparent)]
    Query(#[from] TraceQueryError),
    #[error("results contain no trace data to plot")]
    NoData,
    #[error("failed to render trace plot: {0}")]
    Plot(String),
}

/// Time window of a plot; an open end keeps every sample on that side.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeSpan {
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl TimeSpan {
    pub fn new(start: Option<f64>, end: Option<f64>) -> Self {
        Self { start, end }
    }

    fn bounds(&self) -> (f64, f64) {
        (
            self.start.unwrap_or(f64::NEG_INFINITY),
            self.end.unwrap_or(f64::INFINITY),
        )
    }
}

/// One stacked chart: a channel with one line per device.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub channel: Channel,
    pub lines: Vec<(String, Vec<(f64, f64)>)>,
}

impl Panel {
    fn bounds(&self) -> (Range<f64>, Range<f64>) {
        let points = self.lines.iter().flat_map(|(_, points)| points.iter());
        let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
        for (x, y) in points {
            x_min = x_min.min(*x);
            x_max = x_max.max(*x);
            y_min = y_min.min(*y);
            y_max = y_max.max(*y);
        }
        (padded(x_min, x_max, 0.0), padded(y_min, y_max, 0.05))
    }
}

fn padded(low: f64, high: f64, fraction: f64) -> Range<f64> {
    if !(low.is_finite() && high.is_finite()) {
        return 0.0..1.0;
    }
    let span = high - low;
    if span <= 0.0 {
        return (low - 1.0)..(high + 1.0);
    }
    (low - fraction * span)..(high + fraction * span)
}

/// Junction temperature, voltage, current and total loss panels for the
/// selected devices, or for every device with trace data when `devices`
/// is empty, restricted to `span`.
pub fn panels(
    document: &ResultsDocument,
    devices: &[String],
    span: TimeSpan,
) -> Result<Vec<Panel>, TracePlotError> {
    let (start, end) = span.bounds();
    let names: Vec<&str> = if devices.is_empty() {
        document
            .devices
            .iter()
            .filter(|device| !device.series.time.is_empty())
            .map(|device| device.name.as_str())
            .collect()
    } else {
        devices.iter().map(String::as_str).collect()
    };

    let mut panels = Vec::with_capacity(PANEL_CHANNELS.len());
    for channel in PANEL_CHANNELS {
        let mut lines = Vec::with_capacity(names.len());
        for name in &names {
            let points = series(document, name, channel)?;
            let visible = window(&points, start, end)?;
            if !visible.is_empty() {
                lines.push((name.to_string(), visible.to_vec()));
            }
        }
        panels.push(Panel { channel, lines });
    }
    if panels.iter().all(|panel| panel.lines.is_empty()) {
        return Err(TracePlotError::NoData);
    }
    Ok(panels)
}

/// Years to failure of the selected devices (all when `devices` is empty),
/// longest-lived first. Failed runs and runs without appreciable damage
/// have no finite lifetime to draw and are left out.
pub fn lifetime_bars(document: &ResultsDocument, devices: &[String]) -> Vec<(String, f64)> {
    let summaries = device_summaries(document);
    rank_by_lifetime(&summaries)
        .into_iter()
        .filter(|summary| devices.is_empty() || devices.contains(&summary.name))
        .filter(|summary| summary.completed)
        .filter_map(|summary| {
            summary
                .years_to_failure
                .filter(|years| years.is_finite() && *years > 0.0)
                .map(|years| (summary.name.clone(), years))
        })
        .collect()
}

pub async fn plot_results_from_json_file(
    input_path: &str,
    output_path: &str,
    devices: &[String],
    span: TimeSpan,
) -> Result<(), TracePlotError> {
    let document = load_results_from_json_file(input_path).await?;
    write_results_png(&document, output_path, devices, span).await
}

pub async fn write_results_png(
    document: &ResultsDocument,
    output_path: &str,
    devices: &[String],
    span: TimeSpan,
) -> Result<(), TracePlotError> {
    let panels = panels(document, devices, span)?;
    let bars = lifetime_bars(document, devices);
    let output_path = output_path.to_string();
    tokio::task::spawn_blocking(move || render_panels_png(&output_path, &panels, &bars))
        .await
        .map_err(|e| TracePlotError::Plot(e.to_string()))??;
    Ok(())
}

const PANEL_HEIGHT: u32 = 320;

fn render_panels_png(
    output_path: &str,
    panels: &[Panel],
    bars: &[(String, f64)],
) -> Result<(), TracePlotError> {
    let trace_height = PANEL_HEIGHT * panels.len() as u32;
    let bar_height = if bars.is_empty() { 0 } else { PANEL_HEIGHT };
    let root = BitMapBackend::new(output_path, (1200, trace_height + bar_height))
        .into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;
    let (trace_area, bar_area) = root.split_vertically(trace_height);

    for (area, panel) in trace_area.split_evenly((panels.len(), 1)).iter().zip(panels) {
        let (x_range, y_range) = panel.bounds();
        let mut chart = ChartBuilder::on(area)
            .margin(15)
            .caption(panel.channel.label(), ("sans-serif", 22))
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range, y_range)
            .map_err(plot_error)?;

        chart
            .configure_mesh()
            .x_desc("Time (s)")
            .label_style(("sans-serif", 14))
            .axis_desc_style(("sans-serif", 16))
            .draw()
            .map_err(plot_error)?;

        for (index, (name, points)) in panel.lines.iter().enumerate() {
            let color = Palette99::pick(index).to_rgba();
            chart
                .draw_series(LineSeries::new(points.iter().copied(), &color))
                .map_err(plot_error)?
                .label(name.clone())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(plot_error)?;
    }

    if !bars.is_empty() {
        draw_lifetime_bars(&bar_area, bars)?;
    }

    root.present().map_err(plot_error)?;
    Ok(())
}

fn draw_lifetime_bars<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    bars: &[(String, f64)],
) -> Result<(), TracePlotError> {
    let longest = bars.iter().map(|(_, years)| *years).fold(0.0, f64::max);
    let mut chart = ChartBuilder::on(area)
        .margin(15)
        .caption("Lifetime comparison", ("sans-serif", 22))
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d((0..bars.len()).into_segmented(), 0.0..longest * 1.1)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc("Years to failure")
        .x_label_formatter(&|segment| match segment {
            SegmentValue::CenterOf(index) => bars
                .get(*index)
                .map(|(name, _)| name.clone())
                .unwrap_or_default(),
            _ => String::new(),
        })
        .label_style(("sans-serif", 14))
        .axis_desc_style(("sans-serif", 16))
        .draw()
        .map_err(plot_error)?;

    let bar_style = ShapeStyle::from(&RGBColor(30, 122, 204)).filled();
    chart
        .draw_series(bars.iter().enumerate().map(|(index, (_, years))| {
            let mut bar = Rectangle::new(
                [
                    (SegmentValue::Exact(index), 0.0),
                    (SegmentValue::Exact(index + 1), *years),
                ],
                bar_style,
            );
            bar.set_margin(0, 0, 10, 10);
            bar
        }))
        .map_err(plot_error)?;
    Ok(())
}

fn plot_error<E: std::fmt::Display>(error: E) -> TracePlotError {
    TracePlotError::Plot(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::results_types::{DeviceResult, LifetimeRecord, RunStatus, TraceSeries};
    use assert_fs::prelude::*;
    use chrono::Utc;
    use predicates::prelude::*;

    fn lifetime(years: Option<f64>) -> Option<LifetimeRecord> {
        Some(LifetimeRecord {
            damage_fraction: if years.is_some() { 1e-6 } else { 0.0 },
            missions_to_failure: years.map(|_| 1e6),
            seconds_to_failure: years.map(|y| y * 3.15e7),
            years_to_failure: years,
            weighted_cycle_count: 1.0,
            sum_cycles_to_failure: Some(1e6),
            cycles: vec![],
        })
    }

    fn completed(name: &str, series: TraceSeries, years: Option<f64>) -> DeviceResult {
        DeviceResult {
            name: name.to_string(),
            status: RunStatus::Completed,
            series,
            excursion: None,
            lifetime: lifetime(years),
        }
    }

    fn document_series() -> TraceSeries {
        TraceSeries {
            time: vec![0.0, 0.5, 1.0],
            junction_temperature: vec![50.0, 58.0, 54.0],
            voltage: vec![400.0, 400.0, 0.0],
            current: vec![10.0, 10.0, 0.0],
            total_loss: vec![12.0, 13.0, 0.0],
            stage_temperatures: vec![vec![50.0, 58.0, 54.0]],
            ..TraceSeries::default()
        }
    }

    fn document() -> ResultsDocument {
        ResultsDocument {
            generated_at: Utc::now(),
            mission: "bench".to_string(),
            ambient_temperature: 50.0,
            mission_duration: 1.0,
            devices: vec![
                completed("A", document_series(), Some(12.5)),
                DeviceResult {
                    name: "B".to_string(),
                    status: RunStatus::Failed {
                        kind: "configuration_error".to_string(),
                        message: "bad".to_string(),
                        failure: None,
                    },
                    series: TraceSeries::default(),
                    excursion: None,
                    lifetime: None,
                },
                completed("D", TraceSeries::default(), None),
                completed("E", TraceSeries::default(), Some(40.0)),
            ],
        }
    }

    #[test]
    fn panels_skip_devices_without_trace_data() {
        let drawn = panels(&document(), &[], TimeSpan::default()).unwrap();

        assert_eq!(drawn.len(), 4);
        assert_eq!(drawn[0].channel, Channel::JunctionTemperature);
        assert!(drawn.iter().all(|panel| panel.lines.len() == 1));
        assert_eq!(drawn[3].lines[0].1[1], (0.5, 13.0));
    }

    #[test]
    fn selecting_only_failed_devices_has_nothing_to_plot() {
        let err = panels(&document(), &["B".to_string()], TimeSpan::default()).unwrap_err();
        assert!(matches!(err, TracePlotError::NoData));

        let err = panels(&document(), &["C".to_string()], TimeSpan::default()).unwrap_err();
        assert!(matches!(err, TracePlotError::Query(TraceQueryError::UnknownDevice(_))));
    }

    #[test]
    fn time_span_restricts_every_panel() {
        let span = TimeSpan::new(Some(0.25), Some(0.75));
        let drawn = panels(&document(), &[], span).unwrap();

        assert!(drawn.iter().all(|panel| panel.lines[0].1.len() == 1));
        assert_eq!(drawn[0].lines[0].1[0], (0.5, 58.0));

        let span = TimeSpan::new(Some(2.0), None);
        let err = panels(&document(), &[], span).unwrap_err();
        assert!(matches!(err, TracePlotError::NoData));

        let span = TimeSpan::new(Some(1.0), Some(0.0));
        let err = panels(&document(), &[], span).unwrap_err();
        assert!(matches!(err, TracePlotError::Query(TraceQueryError::InvalidWindow { .. })));
    }

    #[test]
    fn lifetime_bars_rank_finite_lifetimes_longest_first() {
        assert_eq!(
            lifetime_bars(&document(), &[]),
            vec![("E".to_string(), 40.0), ("A".to_string(), 12.5)]
        );
        assert_eq!(
            lifetime_bars(&document(), &["A".to_string(), "B".to_string()]),
            vec![("A".to_string(), 12.5)]
        );
        assert!(lifetime_bars(&document(), &["D".to_string()]).is_empty());
    }

    #[test]
    fn flat_series_gets_a_non_empty_range() {
        assert_eq!(padded(5.0, 5.0, 0.05), 4.0..6.0);
        assert_eq!(padded(0.0, 10.0, 0.1), -1.0..11.0);
    }

    #[tokio::test]
    async fn writes_png_for_results() {
        let output_file = assert_fs::NamedTempFile::new("traces.png").unwrap();

        write_results_png(
            &document(),
            output_file.path().to_str().unwrap(),
            &[],
            TimeSpan::default(),
        )
        .await
        .unwrap();

        output_file.assert(predicate::path::exists());
        let png = std::fs::read(output_file.path()).unwrap();
        // IHDR height: four trace panels plus the lifetime bars
        let height = u32::from_be_bytes([png[20], png[21], png[22], png[23]]);
        assert_eq!(height, 5 * PANEL_HEIGHT);
    }

    #[tokio::test]
    async fn omits_lifetime_bars_without_finite_lifetimes() {
        let output_file = assert_fs::NamedTempFile::new("traces.png").unwrap();
        let mut document = document();
        document.devices.retain(|device| device.name != "A" && device.name != "E");
        document.devices.push(completed("F", document_series(), None));

        write_results_png(
            &document,
            output_file.path().to_str().unwrap(),
            &[],
            TimeSpan::default(),
        )
        .await
        .unwrap();

        let png = std::fs::read(output_file.path()).unwrap();
        let height = u32::from_be_bytes([png[20], png[21], png[22], png[23]]);
        assert_eq!(height, 4 * PANEL_HEIGHT);
    }
}
