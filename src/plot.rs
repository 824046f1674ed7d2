//! Typed views of the plot-server messages.
//!
//! A plot server draws `y_count` traces against a scrolling x axis. Two
//! messages drive it, both carried as a plain [`Payload`]: the window
//! description ([`PlotWindow`]) and one sample per trace at a given x
//! ([`DataPoint`]). The `from_payload` constructors read them the way the
//! server does: numbers are taken from any JSON number and colour components
//! that are missing or not numbers stay at zero.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::payload::Payload;
use crate::{Result, TransferError};

/// Most traces a single window can draw.
pub const MAX_Y_PLOTS: usize = 8;

/// Longest title or axis label kept; longer ones are cut.
pub const MAX_LABEL_LEN: usize = 63;

/// `cmd` value tagging a data-point message.
pub const PLOT_CMD: &str = "plot";

const DEFAULT_MAX_POINT: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    /// Read `{"r", "g", "b", "a"}` from a colour entry.
    ///
    /// Components clamp to `0..=255`; absent or non-numeric ones are 0, and a
    /// non-object entry is black with zero alpha.
    pub fn from_value(value: &Value) -> Self {
        let component = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_f64)
                .map(|n| n.clamp(0.0, 255.0) as u8)
                .unwrap_or_default()
        };
        Self {
            r: component("r"),
            g: component("g"),
            b: component("b"),
            a: component("a"),
        }
    }
}

/// Window description. `y_color` always holds exactly `y_count` entries.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotWindow {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub width: u32,
    pub height: u32,
    pub y_count: usize,
    pub max_point: u32,
    pub x_step: f64,
    pub x_range: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub x_grid_step: f64,
    pub y_grid_step: f64,
    pub y_color: Vec<Rgba>,
}

// Wire shape before range checks. Integer fields are read as plain numbers
// and truncated, so `800.0` is as good as `800`.
#[derive(Deserialize)]
struct RawWindow {
    title: String,
    x_label: String,
    y_label: String,
    width: f64,
    height: f64,
    y_count: f64,
    #[serde(default)]
    max_point: Option<f64>,
    x_step: f64,
    x_range: f64,
    y_min: f64,
    y_max: f64,
    x_grid_step: f64,
    y_grid_step: f64,
    y_color: Vec<Value>,
}

impl PlotWindow {
    pub fn from_payload(payload: &Payload) -> Result<Self> {
        let raw: RawWindow = serde_json::from_value(payload.clone().into_value())
            .map_err(|e| TransferError::InvalidWindow(e.to_string()))?;

        let width = positive("width", raw.width)?;
        let height = positive("height", raw.height)?;
        let y_count = Some(raw.y_count.trunc())
            .filter(|count| (1.0..=MAX_Y_PLOTS as f64).contains(count))
            .map(|count| count as usize)
            .ok_or_else(|| {
                TransferError::InvalidWindow(format!(
                    "y_count {} outside 1..={MAX_Y_PLOTS}",
                    raw.y_count
                ))
            })?;
        if raw.y_min >= raw.y_max {
            return Err(TransferError::InvalidWindow(format!(
                "y_min {} is not below y_max {}",
                raw.y_min, raw.y_max
            )));
        }

        if raw.y_color.len() > y_count {
            debug!(
                "Ignoring {} colours beyond y_count {y_count}",
                raw.y_color.len() - y_count
            );
        }
        let mut y_color: Vec<Rgba> = raw
            .y_color
            .iter()
            .take(y_count)
            .map(Rgba::from_value)
            .collect();
        y_color.resize(y_count, Rgba::default());

        Ok(Self {
            title: clip_label(raw.title),
            x_label: clip_label(raw.x_label),
            y_label: clip_label(raw.y_label),
            width,
            height,
            y_count,
            max_point: raw
                .max_point
                .map(|points| points.max(0.0) as u32)
                .unwrap_or(DEFAULT_MAX_POINT),
            x_step: raw.x_step,
            x_range: raw.x_range,
            y_min: raw.y_min,
            y_max: raw.y_max,
            x_grid_step: raw.x_grid_step,
            y_grid_step: raw.y_grid_step,
            y_color,
        })
    }

    pub fn to_payload(&self) -> Payload {
        let colors: Vec<Value> = self
            .y_color
            .iter()
            .take(self.y_count)
            .map(|c| json!({"r": c.r, "g": c.g, "b": c.b, "a": c.a}))
            .collect();

        let mut payload = Payload::new();
        payload.insert("title", self.title.as_str());
        payload.insert("x_label", self.x_label.as_str());
        payload.insert("y_label", self.y_label.as_str());
        payload.insert("width", self.width);
        payload.insert("height", self.height);
        payload.insert("y_count", self.y_count);
        payload.insert("max_point", self.max_point);
        payload.insert("x_step", self.x_step);
        payload.insert("x_range", self.x_range);
        payload.insert("y_min", self.y_min);
        payload.insert("y_max", self.y_max);
        payload.insert("x_grid_step", self.x_grid_step);
        payload.insert("y_grid_step", self.y_grid_step);
        payload.insert("y_color", colors);
        payload
    }

    /// One-line description for logs.
    pub fn summary(&self) -> String {
        format!(
            "\"{}\" {}x{}, {} traces, x range {} step {}, y [{}, {}]",
            self.title,
            self.width,
            self.height,
            self.y_count,
            self.x_range,
            self.x_step,
            self.y_min,
            self.y_max
        )
    }
}

/// One sample per trace at position `x`.
///
/// On the wire: `{"cmd": "plot", "data": [x, y0, y1, ...]}`.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    pub x: f64,
    pub y: Vec<f64>,
}

impl DataPoint {
    /// Keeps at most [`MAX_Y_PLOTS`] samples.
    pub fn new(x: f64, mut y: Vec<f64>) -> Self {
        y.truncate(MAX_Y_PLOTS);
        Self { x, y }
    }

    /// Read a data-point message.
    ///
    /// `data` must be a non-empty array; its first element is x and the rest
    /// are the trace samples. Non-numeric elements read as 0. A `cmd` other
    /// than `"plot"` is rejected; a missing `cmd` is accepted.
    pub fn from_payload(payload: &Payload) -> Result<Self> {
        if let Some(cmd) = payload.get("cmd") {
            if cmd.as_str() != Some(PLOT_CMD) {
                return Err(TransferError::InvalidDataPoint(format!(
                    "cmd is {cmd}, expected \"{PLOT_CMD}\""
                )));
            }
        }

        let data = payload
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| TransferError::InvalidDataPoint("no data array".to_string()))?;
        let mut values = data.iter().map(|v| v.as_f64().unwrap_or_default());
        let x = values
            .next()
            .ok_or_else(|| TransferError::InvalidDataPoint("data array is empty".to_string()))?;

        if data.len() - 1 > MAX_Y_PLOTS {
            debug!(
                "Ignoring {} samples beyond the first {MAX_Y_PLOTS}",
                data.len() - 1 - MAX_Y_PLOTS
            );
        }
        Ok(Self::new(x, values.collect()))
    }

    pub fn to_payload(&self) -> Payload {
        let data: Vec<f64> = std::iter::once(self.x)
            .chain(self.y.iter().take(MAX_Y_PLOTS).copied())
            .collect();

        let mut payload = Payload::new();
        payload.insert("cmd", PLOT_CMD);
        payload.insert("data", data);
        payload
    }
}

fn positive(name: &str, value: f64) -> Result<u32> {
    let truncated = value.trunc();
    if truncated >= 1.0 && truncated <= u32::MAX as f64 {
        Ok(truncated as u32)
    } else {
        Err(TransferError::InvalidWindow(format!(
            "{name} must be positive, got {value}"
        )))
    }
}

fn clip_label(label: String) -> String {
    if label.chars().count() <= MAX_LABEL_LEN {
        label
    } else {
        label.chars().take(MAX_LABEL_LEN).collect()
    }
}
