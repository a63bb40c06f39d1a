//! Combines the observation, forecast and sunrise/sunset feeds into the card state.
//!
//! State is published on `watch` channels so a presentation layer can either take
//! snapshots or subscribe to changes. Every completed refresh replaces the whole
//! [`WeatherState`]; fields from two different refresh cycles are never mixed.
//!
//! The theme is derived once, by [`WeatherAggregator::start`]. A long-running
//! session keeps that theme after the actual sunset.

use chrono::{Local, NaiveDateTime};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    error::WeatherError,
    model::{ThemeMode, WeatherState},
    provider::WeatherSource,
    theme::theme_for,
};

#[derive(Debug)]
pub struct WeatherAggregator<S> {
    source: S,
    state: watch::Sender<WeatherState>,
    theme: watch::Sender<ThemeMode>,
    last_error: watch::Sender<Option<String>>,
}

impl<S: WeatherSource> WeatherAggregator<S> {
    /// Aggregator holding placeholder state. Performs no I/O.
    pub fn new(source: S) -> Self {
        let (state, _) = watch::channel(WeatherState::placeholder());
        let (theme, _) = watch::channel(ThemeMode::default());
        let (last_error, _) = watch::channel(None);

        Self {
            source,
            state,
            theme,
            last_error,
        }
    }

    /// Creates the aggregator, then derives the theme and runs the first refresh.
    ///
    /// Failures are logged and kept as [`last_error`](Self::last_error) rather than returned.
    pub async fn start(source: S) -> Self {
        let aggregator = Self::new(source);

        let (theme, refresh) = tokio::join!(aggregator.determine_theme(), aggregator.refresh());

        if let Err(err) = refresh {
            warn!(error = %err, "initial refresh failed");
        }
        if let Err(err) = theme {
            warn!(
                error = %err,
                "could not determine day/night theme, keeping {}",
                aggregator.theme()
            );
            aggregator.last_error.send_if_modified(|last| {
                if last.is_none() {
                    *last = Some(err.user_message());
                    true
                } else {
                    false
                }
            });
        }

        aggregator
    }

    /// Derives day/night from today's sunrise/sunset using the local wall clock.
    pub async fn determine_theme(&self) -> Result<ThemeMode, WeatherError> {
        self.determine_theme_at(Local::now().naive_local()).await
    }

    /// Derives day/night for `now`; the theme is left unchanged on failure.
    pub async fn determine_theme_at(
        &self,
        now: NaiveDateTime,
    ) -> Result<ThemeMode, WeatherError> {
        let records = self.source.fetch_sun_times().await?;
        let theme = theme_for(&records, now, self.source.location_name())?;

        info!(%theme, %now, "theme determined");
        self.theme.send_replace(theme);
        Ok(theme)
    }

    /// Fetches observation and forecast concurrently and replaces the state.
    ///
    /// `is_loading` is raised before any request is issued and is always lowered
    /// when this returns. On failure the previous fields are kept.
    pub async fn refresh(&self) -> Result<(), WeatherError> {
        self.state.send_modify(|s| s.is_loading = true);
        debug!("refresh started");

        let fetched = tokio::try_join!(self.source.fetch_current(), self.source.fetch_forecast());

        match fetched {
            Ok((current, forecast)) => {
                let next = WeatherState::merge(current, forecast);
                info!(
                    location = %next.location_name,
                    temperature = next.temperature,
                    weather_code = next.weather_code,
                    "refresh completed"
                );
                self.state.send_replace(next);
                self.last_error.send_replace(None);
                Ok(())
            }
            Err(err) => {
                warn!(
                    error = %err,
                    network = err.is_network(),
                    "refresh failed, keeping previous data"
                );
                self.state.send_modify(|s| s.is_loading = false);
                self.last_error.send_replace(Some(err.user_message()));
                Err(err)
            }
        }
    }

    pub fn state(&self) -> WeatherState {
        self.state.borrow().clone()
    }

    pub fn theme(&self) -> ThemeMode {
        *self.theme.borrow()
    }

    /// User-facing message for the most recent failure, cleared by a successful refresh.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<WeatherState> {
        self.state.subscribe()
    }

    pub fn subscribe_theme(&self) -> watch::Receiver<ThemeMode> {
        self.theme.subscribe()
    }

    #[cfg(test)]
    fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CurrentObservation, ForecastSummary, SunTimes};
    use async_trait::async_trait;
    use chrono::{DateTime, NaiveDate, NaiveTime};
    use std::{
        sync::{
            Arc, Mutex,
            atomic::{AtomicBool, AtomicUsize, Ordering},
        },
        time::Duration,
    };
    use tokio::sync::Notify;

    /// In-process source whose responses are tagged with the call number.
    #[derive(Debug, Default)]
    struct FakeSource {
        current_calls: AtomicUsize,
        forecast_calls: AtomicUsize,
        fail_current: AtomicBool,
        fail_forecast: AtomicBool,
        hold_current: AtomicBool,
        release: Notify,
        /// Per-call delays in milliseconds, indexed by call number.
        delays_ms: Vec<u64>,
        sun: Mutex<Vec<SunTimes>>,
    }

    impl FakeSource {
        async fn delay(&self, call: usize) {
            if let Some(ms) = self.delays_ms.get(call - 1) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
        }
    }

    #[async_trait]
    impl WeatherSource for FakeSource {
        async fn fetch_current(&self) -> Result<CurrentObservation, WeatherError> {
            let call = self.current_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.hold_current.load(Ordering::SeqCst) {
                self.release.notified().await;
            }
            self.delay(call).await;
            if self.fail_current.load(Ordering::SeqCst) {
                return Err(WeatherError::missing("records.Station[0]"));
            }
            Ok(CurrentObservation {
                observation_time: DateTime::parse_from_rfc3339("2024-05-03T14:00:00+08:00")
                    .unwrap(),
                location_name: format!("cycle-{call}"),
                temperature: 23.7,
                wind_speed: call as f64,
            })
        }

        async fn fetch_forecast(&self) -> Result<ForecastSummary, WeatherError> {
            let call = self.forecast_calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.delay(call).await;
            if self.fail_forecast.load(Ordering::SeqCst) {
                return Err(WeatherError::invalid("PoP.parameterName", "abc"));
            }
            Ok(ForecastSummary {
                description: format!("cycle-{call}"),
                weather_code: 8,
                rain_possibility: 30,
                comfortably: "comfortable".into(),
            })
        }

        async fn fetch_sun_times(&self) -> Result<Vec<SunTimes>, WeatherError> {
            Ok(self.sun.lock().unwrap().clone())
        }

        fn location_name(&self) -> &str {
            "Taipei"
        }
    }

    fn six_to_six(date: NaiveDate) -> SunTimes {
        SunTimes {
            date,
            sunrise: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            sunset: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        }
    }

    fn may_third() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 3).unwrap()
    }

    #[tokio::test]
    async fn new_starts_with_placeholder_and_day() {
        let agg = WeatherAggregator::new(FakeSource::default());

        assert!(agg.state().is_loading);
        assert_eq!(agg.theme(), ThemeMode::Day);
        assert_eq!(agg.last_error(), None);
        assert_eq!(agg.source().current_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn refresh_merges_both_feeds() {
        let agg = WeatherAggregator::new(FakeSource::default());

        agg.refresh().await.unwrap();
        let state = agg.state();

        assert!(!state.is_loading);
        assert_eq!(state.location_name, "cycle-1");
        assert_eq!(state.description, "cycle-1");
        assert_eq!(state.rain_possibility, 30);
        assert_eq!(state.comfortably, "comfortable");
        assert_eq!(state.display_temperature(), 24);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_stale_data_and_stops_loading() {
        let agg = WeatherAggregator::new(FakeSource::default());
        agg.refresh().await.unwrap();
        let before = agg.state();

        agg.source().fail_forecast.store(true, Ordering::SeqCst);
        let err = agg.refresh().await.unwrap_err();
        assert!(matches!(err, WeatherError::InvalidField { .. }));

        let after = agg.state();
        assert!(!after.is_loading);
        assert_eq!(after, before);
        assert!(agg.last_error().is_some());

        agg.source().fail_forecast.store(false, Ordering::SeqCst);
        agg.refresh().await.unwrap();
        assert_eq!(agg.last_error(), None);
    }

    #[tokio::test]
    async fn failure_on_first_refresh_leaves_placeholder_not_loading() {
        let source = FakeSource::default();
        source.fail_current.store(true, Ordering::SeqCst);
        let agg = WeatherAggregator::new(source);

        assert!(agg.refresh().await.is_err());
        let state = agg.state();
        assert!(!state.is_loading);
        assert!(state.location_name.is_empty());
    }

    #[tokio::test]
    async fn loading_is_visible_while_requests_are_in_flight() {
        let agg = Arc::new(WeatherAggregator::new(FakeSource::default()));
        agg.refresh().await.unwrap();
        assert!(!agg.state().is_loading);

        agg.source().hold_current.store(true, Ordering::SeqCst);
        let mut rx = agg.subscribe_state();
        let task = tokio::spawn({
            let agg = Arc::clone(&agg);
            async move { agg.refresh().await }
        });

        rx.wait_for(|s| s.is_loading).await.unwrap();
        assert_eq!(agg.state().location_name, "cycle-1");

        agg.source().release.notify_one();
        task.await.unwrap().unwrap();

        let state = agg.state();
        assert!(!state.is_loading);
        assert_eq!(state.location_name, "cycle-2");
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_refreshes_never_mix_cycles() {
        let source = FakeSource {
            // The first cycle answers after the second one.
            delays_ms: vec![50, 10],
            ..FakeSource::default()
        };
        let agg = WeatherAggregator::new(source);

        let (first, second) = tokio::join!(agg.refresh(), agg.refresh());
        first.unwrap();
        second.unwrap();

        let state = agg.state();
        assert!(!state.is_loading);
        assert_eq!(state.location_name, state.description);
        assert_eq!(state.wind_speed, if state.location_name == "cycle-1" { 1.0 } else { 2.0 });
    }

    #[tokio::test]
    async fn theme_follows_sunrise_and_sunset() {
        let source = FakeSource::default();
        *source.sun.lock().unwrap() = vec![six_to_six(may_third())];
        let agg = WeatherAggregator::new(source);

        let at = |h, m| may_third().and_hms_opt(h, m, 0).unwrap();

        assert_eq!(agg.determine_theme_at(at(20, 0)).await.unwrap(), ThemeMode::Night);
        assert_eq!(agg.theme(), ThemeMode::Night);
        assert_eq!(agg.determine_theme_at(at(12, 0)).await.unwrap(), ThemeMode::Day);
        assert_eq!(agg.determine_theme_at(at(6, 0)).await.unwrap(), ThemeMode::Day);
        assert_eq!(agg.determine_theme_at(at(18, 0)).await.unwrap(), ThemeMode::Day);
    }

    #[tokio::test]
    async fn missing_sun_record_keeps_previous_theme() {
        let source = FakeSource::default();
        *source.sun.lock().unwrap() = vec![six_to_six(may_third())];
        let agg = WeatherAggregator::new(source);

        let evening = may_third().and_hms_opt(20, 0, 0).unwrap();
        agg.determine_theme_at(evening).await.unwrap();
        assert_eq!(agg.theme(), ThemeMode::Night);

        let next_noon = may_third().succ_opt().unwrap().and_hms_opt(12, 0, 0).unwrap();
        let err = agg.determine_theme_at(next_noon).await.unwrap_err();

        assert!(matches!(
            err,
            WeatherError::DataUnavailable { ref date, .. } if date == "2024-05-04"
        ));
        assert_eq!(agg.theme(), ThemeMode::Night);
    }

    #[tokio::test]
    async fn start_refreshes_once_and_records_theme_failure() {
        // No sunrise/sunset rows at all, so the theme lookup fails.
        let agg = WeatherAggregator::start(FakeSource::default()).await;

        let state = agg.state();
        assert!(!state.is_loading);
        assert_eq!(state.location_name, "cycle-1");
        assert_eq!(agg.source().current_calls.load(Ordering::SeqCst), 1);
        assert_eq!(agg.theme(), ThemeMode::Day);
        assert!(agg.last_error().unwrap().contains("Taipei"));
    }

    #[tokio::test]
    async fn start_with_todays_record_has_no_error() {
        let source = FakeSource::default();
        let today = Local::now().date_naive();
        *source.sun.lock().unwrap() = vec![
            six_to_six(today.pred_opt().unwrap()),
            six_to_six(today),
            six_to_six(today.succ_opt().unwrap()),
        ];

        let agg = WeatherAggregator::start(source).await;

        assert_eq!(agg.last_error(), None);
        assert!(!agg.state().is_loading);
    }
}
