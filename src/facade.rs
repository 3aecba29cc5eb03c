/* Public Façade (spec §4.6): the one type host code is meant to touch.
 * Wraps `ServiceHandle` so nothing outside this crate ever sees the
 * worker's internal command/watch-channel plumbing — only the typed
 * operations spec'd for the host boundary, returning `DriverError`. */

use std::time::Duration;

use crate::codec::config::Config as StationConfig;
use crate::codec::current::Observation;
use crate::config::DriverConfig;
use crate::error::DriverError;
use crate::records::{HistoryExportRecord, ObservationRecord};
use crate::service::{self, Health, ServiceHandle};
use crate::transport::RusbTransport;

pub struct Driver {
    handle: ServiceHandle,
}

impl Driver {
    /* Opens the first WS-28xx dongle found on the bus and starts its
     * service worker. Returns as soon as the worker task is spawned;
     * transceiver init and pairing happen in the background — poll
     * `transceiver_is_present`/`pair` to observe progress. */
    pub fn open(config: &DriverConfig) -> Result<Self, DriverError> {
        let transport = RusbTransport::open().map_err(DriverError::TransportFault)?;
        let handle = service::spawn(transport, config);
        Ok(Self { handle })
    }

    pub fn current_observation(&self) -> Option<Observation> {
        self.handle.current_observation()
    }

    /* Spec §6 "Emitted records": the flat name->value shape a host
     * weather-data service consumes, with a receipt timestamp. */
    pub fn current_observation_record(&self) -> Option<ObservationRecord> {
        self.handle.current_observation_record()
    }

    pub async fn start_caching_history(
        &self,
        since: Option<chrono::NaiveDateTime>,
        num_records: Option<usize>,
    ) {
        self.handle.start_caching_history(since, num_records).await;
    }

    pub async fn stop_caching_history(&self) {
        self.handle.stop_caching_history().await;
    }

    pub async fn get_history_cache_records(&self) -> Vec<HistoryExportRecord> {
        self.handle.get_history_cache_records().await
    }

    pub async fn clear_history_cache(&self) {
        self.handle.clear_history_cache().await;
    }

    pub async fn get_num_history_scanned(&self) -> usize {
        self.handle.get_num_history_scanned().await
    }

    pub async fn get_uncached_history_count(&self) -> u16 {
        self.handle.get_uncached_history_count().await
    }

    pub async fn get_next_history_index(&self) -> u16 {
        self.handle.get_next_history_index().await
    }

    pub async fn get_latest_history_index(&self) -> u16 {
        self.handle.get_latest_history_index().await
    }

    pub fn get_config(&self) -> Option<StationConfig> {
        self.handle.get_config()
    }

    pub async fn set_config(&self, config: StationConfig) -> Result<(), DriverError> {
        validate_config(&config)?;
        self.handle.set_config(config).await
    }

    /* Convenience over `set_config` that mutates only `history_interval`
     * (spec §4.6). */
    pub async fn set_interval(&self, minutes: u32) -> Result<(), DriverError> {
        self.handle.set_interval(minutes).await
    }

    pub async fn set_time(&self) -> Result<(), DriverError> {
        self.handle.set_time().await
    }

    pub async fn pair(&self, timeout: Duration) -> Result<(), DriverError> {
        self.handle.pair(timeout).await
    }

    pub fn transceiver_is_present(&self) -> bool {
        self.handle.transceiver_is_present()
    }

    pub fn transceiver_is_paired(&self) -> bool {
        self.handle.transceiver_is_paired()
    }

    pub fn get_transceiver_serial(&self) -> Option<String> {
        self.handle.get_transceiver_serial()
    }

    pub fn get_transceiver_id(&self) -> Option<u16> {
        self.handle.get_transceiver_id()
    }

    /* Supplemented beyond spec §4.6: surfaces the `Degraded`/`NoContact`
     * health signal spec §7 says is "observable via a health query". */
    pub fn health(&self) -> Health {
        self.handle.health()
    }

    pub async fn shutdown(&self) {
        self.handle.shutdown().await;
    }
}

/* `InvalidConfig` rejections happen here, before anything is queued
 * for the worker to write (spec §7: caller-supplied config fails range
 * checks before any write). */
fn validate_config(config: &StationConfig) -> Result<(), DriverError> {
    if !(1..=8).contains(&config.lcd_contrast) {
        return Err(DriverError::InvalidConfig(format!(
            "lcd_contrast must be 1..=8, got {}",
            config.lcd_contrast
        )));
    }
    if config.temp_indoor.min > config.temp_indoor.max {
        return Err(DriverError::InvalidConfig(
            "temp_indoor.min must not exceed temp_indoor.max".to_string(),
        ));
    }
    if config.temp_outdoor.min > config.temp_outdoor.max {
        return Err(DriverError::InvalidConfig(
            "temp_outdoor.min must not exceed temp_outdoor.max".to_string(),
        ));
    }
    if config.humidity_indoor.min > config.humidity_indoor.max {
        return Err(DriverError::InvalidConfig(
            "humidity_indoor.min must not exceed humidity_indoor.max".to_string(),
        ));
    }
    if config.humidity_outdoor.min > config.humidity_outdoor.max {
        return Err(DriverError::InvalidConfig(
            "humidity_outdoor.min must not exceed humidity_outdoor.max".to_string(),
        ));
    }
    Ok(())
}
