use crate::config::Config;
use crate::models::{error::AppError, reading::Reading, window::Window};
use chrono_tz::Tz;
use log::{info, warn};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// On-disk shape of a reading; timestamps are wall-clock time in the export zone.
#[derive(Serialize, Debug)]
struct ExportRecord<'a> {
    sensor_id: &'a str,
    message_date: String,
    values: &'a [f64],
    labels: &'a [String],
    display: &'a str,
    battery: Option<u8>,
    signal_strength: Option<i32>,
    voltage: Option<f64>,
}

impl<'a> ExportRecord<'a> {
    fn new(r: &'a Reading, tz: Tz) -> Self {
        Self {
            sensor_id: &r.sensor_id,
            message_date: r
                .timestamp
                .with_timezone(&tz)
                .format(Config::TIMESTAMP_FORMAT)
                .to_string(),
            values: &r.values,
            labels: &r.labels,
            display: &r.display,
            battery: r.battery,
            signal_strength: r.signal_strength,
            voltage: r.voltage,
        }
    }
}

/// `20231201_20231225_345749.json`
pub fn export_file_name(sensor_id: &str, window: &Window) -> String {
    format!(
        "{}_{}_{sensor_id}.json",
        window.start().format("%Y%m%d"),
        window.end().format("%Y%m%d")
    )
}

/// Writes the readings of one sensor as a JSON array under `output_dir`,
/// with message dates rendered in `tz`.
///
/// Returns the written path, or `None` when there was nothing to write.
pub fn write_readings(
    output_dir: &Path,
    sensor_id: &str,
    window: &Window,
    readings: &[Reading],
    tz: Tz,
) -> Result<Option<PathBuf>, AppError> {
    if readings.is_empty() {
        warn!("No readings for sensor {sensor_id} in {window}, nothing exported");
        return Ok(None);
    }

    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(export_file_name(sensor_id, window));

    let records: Vec<ExportRecord<'_>> = readings
        .iter()
        .map(|r| ExportRecord::new(r, tz))
        .collect();
    let mut writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(&mut writer, &records)
        .map_err(|e| AppError::DataError(format!("Failed to serialize readings: {e}")))?;
    writer.flush()?;

    info!(
        "Exported {} readings of sensor {sensor_id} to {}",
        readings.len(),
        path.display()
    );
    Ok(Some(path))
}
