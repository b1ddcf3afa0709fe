//! Chart descriptions handed to an external renderer
//!
//! Series are decimated with the table's display stride; event shading uses the
//! full-resolution x values at the interval bounds.

use crate::events::EventConfig;
use emg_core::columns::{dedup_columns, find_columns};
use emg_core::{EmgError, EmgResult, SignalTable};
use serde::{Deserialize, Serialize};

/// Initial visibility of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Visibility {
    #[serde(rename = "visible")]
    Visible,
    /// Hidden but listed in the legend
    #[serde(rename = "legendonly")]
    LegendOnly,
}

/// Chart defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Column groups plotted when the request names no y columns
    pub default_groups: Vec<String>,
    pub title: String,
    pub y_title: String,
    pub legend_title: String,
    /// Fill of shaded event windows
    pub event_fill: String,
    pub event_opacity: f64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            default_groups: ["RMS", "Moving Average", "CH", "Bandpass"]
                .iter()
                .map(|g| g.to_string())
                .collect(),
            title: "EMG Data".to_string(),
            y_title: "Processed Values".to_string(),
            legend_title: "Data Source".to_string(),
            event_fill: "green".to_string(),
            event_opacity: 0.15,
        }
    }
}

/// What to plot
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChartRequest {
    /// x column (default: the time column)
    pub x: Option<String>,
    /// y columns (default: the configured groups)
    pub y: Vec<String>,
    /// Columns visible by default; `None` shows every series
    pub visible: Option<Vec<String>>,
    /// Event column whose windows are shaded
    pub events: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub visibility: Visibility,
}

/// Vertical band between two x positions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShadedRegion {
    pub x0: f64,
    pub x1: f64,
    pub fill_color: String,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartLayout {
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    pub legend_title: String,
}

/// Renderable chart description
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub layout: ChartLayout,
    pub series: Vec<Series>,
    pub regions: Vec<ShadedRegion>,
}

impl ChartSpec {
    pub fn to_json(&self) -> EmgResult<String> {
        serde_json::to_string(self)
            .map_err(|e| EmgError::config(format!("Failed to serialize chart: {}", e)))
    }
}

impl ChartConfig {
    /// Build the chart for `request`, marking events with `events`
    pub fn build(
        &self,
        table: &SignalTable,
        request: &ChartRequest,
        events: &EventConfig,
    ) -> EmgResult<ChartSpec> {
        let x_name = request.x.as_deref().unwrap_or(table.time_name());
        let x_full = table.column(x_name)?;
        let y_names = if request.y.is_empty() {
            dedup_columns(find_columns(table, &self.default_groups)?)
        } else {
            request.y.clone()
        };

        let stride = table.display_stride();
        let decimate =
            |values: &[f64]| -> Vec<f64> { values.iter().step_by(stride).copied().collect() };
        let x = decimate(x_full);

        let series = y_names
            .into_iter()
            .map(|name| -> EmgResult<Series> {
                let y = decimate(table.column(&name)?);
                let visibility = match &request.visible {
                    Some(visible) if !visible.contains(&name) => Visibility::LegendOnly,
                    _ => Visibility::Visible,
                };
                Ok(Series {
                    name,
                    x: x.clone(),
                    y,
                    visibility,
                })
            })
            .collect::<EmgResult<Vec<_>>>()?;

        let regions = match &request.events {
            Some(column) => events
                .find_events(table, Some(column.as_str()))?
                .into_iter()
                .map(|interval| ShadedRegion {
                    x0: x_full[interval.start.index],
                    x1: x_full[interval.stop.index],
                    fill_color: self.event_fill.clone(),
                    opacity: self.event_opacity,
                })
                .collect(),
            None => Vec::new(),
        };

        Ok(ChartSpec {
            layout: ChartLayout {
                title: self.title.clone(),
                x_title: x_name.to_string(),
                y_title: self.y_title.clone(),
                legend_title: self.legend_title.clone(),
            },
            series,
            regions,
        })
    }
}

/// Chart with default settings
pub fn chart(table: &SignalTable, request: &ChartRequest) -> EmgResult<ChartSpec> {
    ChartConfig::default().build(table, request, &EventConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use emg_core::TableSettings;

    fn table(rows: usize) -> SignalTable {
        let mut events = vec![0.0; rows];
        for value in events.iter_mut().take(20).skip(10) {
            *value = 3.0;
        }
        SignalTable::from_columns(
            vec![
                ("Elapse (s)", (0..rows).map(|i| i as f64 / 100.0).collect()),
                ("CH1_4680", vec![1.0; rows]),
                ("RMS 1_4680", vec![0.5; rows]),
                ("Event_4680", events),
            ],
            TableSettings::new(vec!["CH1_4680".to_string()], "Elapse (s)", "Event_4680"),
        )
        .unwrap()
    }

    #[test]
    fn test_default_series_and_layout() {
        let spec = chart(&table(50), &ChartRequest::default()).unwrap();

        let names: Vec<&str> = spec.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["RMS 1_4680", "CH1_4680"]);
        assert_eq!(spec.layout.title, "EMG Data");
        assert_eq!(spec.layout.x_title, "Elapse (s)");
        assert_eq!(spec.series[0].x.len(), 50);
        assert!(spec.regions.is_empty());
    }

    #[test]
    fn test_decimation_respects_budget() {
        let spec = chart(&table(2500), &ChartRequest::default()).unwrap();
        // stride 2500 / 1000 = 2
        assert_eq!(spec.series[0].y.len(), 1250);
        assert_eq!(spec.series[0].x[1], 0.02);
    }

    #[test]
    fn test_visibility_and_events() {
        let request = ChartRequest {
            y: vec!["CH1_4680".to_string(), "RMS 1_4680".to_string()],
            visible: Some(vec!["RMS 1_4680".to_string()]),
            events: Some("Event_4680".to_string()),
            ..ChartRequest::default()
        };
        let spec = chart(&table(50), &request).unwrap();

        assert_eq!(spec.series[0].visibility, Visibility::LegendOnly);
        assert_eq!(spec.series[1].visibility, Visibility::Visible);
        assert_eq!(spec.regions.len(), 1);
        assert_eq!(spec.regions[0].x0, 0.1);
        assert_eq!(spec.regions[0].x1, 0.2);
        assert_eq!(spec.regions[0].fill_color, "green");
    }

    #[test]
    fn test_json_shape() {
        let request = ChartRequest {
            visible: Some(Vec::new()),
            ..ChartRequest::default()
        };
        let json = chart(&table(5), &request).unwrap().to_json().unwrap();
        assert!(json.contains("\"legendonly\""));
        assert!(json.contains("\"legend_title\":\"Data Source\""));
    }

    #[test]
    fn test_missing_columns() {
        let request = ChartRequest {
            y: vec!["Bandpass 1_4680".to_string()],
            ..ChartRequest::default()
        };
        assert!(matches!(
            chart(&table(5), &request),
            Err(EmgError::ColumnNotFound { .. })
        ));
    }
}
