use crate::config::Config;
use crate::models::{
    error::AppError,
    reading::{Reading, SensorReadings},
    window::{Window, split_window},
};
use crate::services::api::SensorApi;
use chrono::{Duration, NaiveDateTime};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};

/// Fetches sensor readings over arbitrary windows, splitting them into
/// requests the API accepts.
///
/// The fetcher keeps no state between calls. Every upstream call after the
/// first one of a run is preceded by a pause of the polling interval.
pub struct WindowFetcher<A> {
    api: A,
    max_span: Duration,
    show_progress: bool,
}

impl<A: SensorApi> WindowFetcher<A> {
    /// Creates a fetcher limited to the API's seven day span.
    pub fn new(api: A) -> Self {
        Self {
            api,
            max_span: Config::max_window_span(),
            show_progress: false,
        }
    }

    /// Overrides the maximum span of a single request. The span must be
    /// positive.
    pub fn with_max_span(mut self, max_span: Duration) -> Result<Self, AppError> {
        if max_span <= Duration::zero() {
            return Err(AppError::ConfigError(format!(
                "Maximum window span must be positive, got {max_span}"
            )));
        }
        self.max_span = max_span;
        Ok(self)
    }

    /// Draws a countdown bar on stderr during the pauses between requests.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn max_span(&self) -> Duration {
        self.max_span
    }

    /// Fetches the readings of one sensor over `[start, end]`.
    ///
    /// Results of the sub-windows are concatenated in chronological order.
    /// The first failing request aborts the fetch.
    pub async fn fetch_for_sensor(
        &self,
        sensor_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        interval_minutes: u32,
    ) -> Result<Vec<Reading>, AppError> {
        let windows = split_window(start, end, self.max_span)?;
        let mut pacer = Pacer::new(interval_minutes, self.show_progress);
        self.fetch_windows(sensor_id, &windows, &mut pacer).await
    }

    /// Fetches every sensor in order over the same window.
    pub async fn fetch_for_sensors(
        &self,
        sensor_ids: &[String],
        start: NaiveDateTime,
        end: NaiveDateTime,
        interval_minutes: u32,
    ) -> Result<Vec<SensorReadings>, AppError> {
        let windows = split_window(start, end, self.max_span)?;
        let mut pacer = Pacer::new(interval_minutes, self.show_progress);

        let mut results = Vec::with_capacity(sensor_ids.len());
        for sensor_id in sensor_ids {
            let readings = self.fetch_windows(sensor_id, &windows, &mut pacer).await?;
            results.push(SensorReadings::new(sensor_id.clone(), readings));
        }
        Ok(results)
    }

    async fn fetch_windows(
        &self,
        sensor_id: &str,
        windows: &[Window],
        pacer: &mut Pacer,
    ) -> Result<Vec<Reading>, AppError> {
        if windows.len() > 1 {
            warn!(
                "Window longer than {} days, sensor {sensor_id} is fetched in {} requests",
                self.max_span.num_days(),
                windows.len()
            );
        }

        let mut readings = Vec::new();
        for window in windows {
            pacer.wait().await;

            info!("Fetching sensor {sensor_id} for {window}");
            let batch = self.api.get_readings(sensor_id, window).await?;
            if batch.is_empty() {
                warn!("Sensor {sensor_id} returned no readings for {window}");
            } else {
                debug!("Sensor {sensor_id}: {} readings for {window}", batch.len());
            }
            readings.extend(batch);
        }
        Ok(readings)
    }
}

/// Spaces consecutive upstream calls by the polling interval.
struct Pacer {
    interval: std::time::Duration,
    show_progress: bool,
    calls: usize,
}

impl Pacer {
    fn new(interval_minutes: u32, show_progress: bool) -> Self {
        Self {
            interval: std::time::Duration::from_secs(u64::from(interval_minutes) * 60),
            show_progress,
            calls: 0,
        }
    }

    async fn wait(&mut self) {
        if self.calls > 0 && !self.interval.is_zero() {
            info!(
                "Waiting {} min before the next request",
                self.interval.as_secs() / 60
            );
            if self.show_progress {
                self.countdown().await;
            } else {
                tokio::time::sleep(self.interval).await;
            }
        }
        self.calls += 1;
    }

    /// Sleeps the interval one second at a time, advancing a progress bar.
    async fn countdown(&self) {
        let secs = self.interval.as_secs();
        let bar = ProgressBar::new(secs);
        if let Ok(style) =
            ProgressStyle::with_template("Polling delay [{bar:40}] {pos}/{len}s (eta {eta})")
        {
            bar.set_style(style.progress_chars("=> "));
        }

        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(1));
        // The first tick completes immediately
        ticker.tick().await;
        for _ in 0..secs {
            ticker.tick().await;
            bar.inc(1);
        }
        bar.finish_and_clear();
    }
}
