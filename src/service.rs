/* Service loop: the single worker task that owns the USB transport
 * and the protocol state machine. Everything the façade exposes is
 * either a shared slot this loop publishes into, or a command this
 * loop drains from its queue. */

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tracing::{error, info, warn};

use crate::codec::config::Config as WireConfig;
use crate::codec::current::Observation;
use crate::codec::frame::{self, Action, FrameHeader, ResponseType};
use crate::codec::history::HistoryRecord;
use crate::config::DriverConfig;
use crate::error::DriverError;
use crate::protocol::{Decision, HistoryProgress, NextRequest, PendingWrites};
use crate::records::{HistoryExportRecord, ObservationRecord};
use crate::transceiver::{DeviceId, TransceiverController, TransceiverInfo, TransceiverState};
use crate::transport::{UsbTransport, FRAME_LENGTH};

/* Fixed by spec §4.5, not host-configurable: the read_state polling
 * window before a sync loss is declared, and the read_state retry
 * cadence within that window. */
const SYNC_LOSS_WINDOW: Duration = Duration::from_secs(10);
const STATE_POLL_INTERVAL: Duration = Duration::from_millis(200);
const DUPLICATE_WINDOW: Duration = Duration::from_secs(3);

/* Host-configurable cadence/retry knobs (spec §6), threaded in from
 * `DriverConfig` at `spawn` time rather than hardcoded. */
#[derive(Debug, Clone, Copy)]
struct ServiceTiming {
    initial_inter_frame_sleep: Duration,
    steady_inter_frame_sleep: Duration,
    polling_interval: Duration,
    pairing_timeout: Duration,
    /* `None` means "infinite", the `max_tries == 0` case from spec §6. */
    max_tries: Option<u32>,
}

impl ServiceTiming {
    fn from_config(config: &DriverConfig) -> Self {
        Self {
            initial_inter_frame_sleep: Duration::from_millis(config.comm_interval_ms[0]),
            steady_inter_frame_sleep: Duration::from_millis(config.comm_interval_ms[1]),
            polling_interval: Duration::from_secs(config.polling_interval_secs),
            pairing_timeout: Duration::from_secs(config.pairing_timeout_secs),
            max_tries: (config.max_tries != 0).then_some(config.max_tries),
        }
    }

    /* 200ms, 400ms, 800ms, ... — same progression the old fixed
     * `RETRY_BACKOFFS` table used, just no longer capped at 3 entries. */
    fn retry_backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(200u64.saturating_mul(1u64 << attempt.min(10)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Ok,
    Degraded,
    NoContact,
}

/* Which USB primitive faulted, so `retry_transport_fault` re-issues the
 * same request rather than substituting an unrelated one. */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FaultedOp {
    ReadState,
    ReadFrame,
}

/* Append-only, timestamp-ordered set keyed by `(timestamp, index)`.
 * Content-hash de-dupe drops repeats seen within 3 s. */
#[derive(Default)]
pub struct HistoryCache {
    records: VecDeque<(u16, HistoryRecord)>,
    recent_hashes: VecDeque<(u64, std::time::Instant)>,
    terminate_at_count: Option<usize>,
    terminate_since: Option<chrono::NaiveDateTime>,
    scanned: usize,
    latest_index: u16,
    next_index: u16,
    caching: bool,
}

impl HistoryCache {
    fn is_duplicate(&mut self, hash: u64, now: std::time::Instant) -> bool {
        self.recent_hashes
            .retain(|(_, seen)| now.duration_since(*seen) < DUPLICATE_WINDOW);
        if self.recent_hashes.iter().any(|(h, _)| *h == hash) {
            return true;
        }
        self.recent_hashes.push_back((hash, now));
        false
    }

    fn push(&mut self, index: u16, record: HistoryRecord) {
        if let Some((_, last)) = self.records.back() {
            if record.timestamp <= last.timestamp {
                warn!("dropping out-of-order history record");
                return;
            }
        }
        self.scanned += 1;
        self.records.push_back((index, record));
    }

    fn should_stop(&self) -> bool {
        if let Some(n) = self.terminate_at_count {
            if self.scanned >= n {
                return true;
            }
        }
        if let Some(since) = self.terminate_since {
            if let Some((_, last)) = self.records.back() {
                if last.timestamp <= since {
                    return true;
                }
            }
        }
        false
    }
}

pub enum Command {
    SetConfig {
        config: WireConfig,
        reply: oneshot::Sender<Result<(), DriverError>>,
    },
    SetInterval {
        minutes: u32,
        reply: oneshot::Sender<Result<(), DriverError>>,
    },
    SetTime {
        reply: oneshot::Sender<Result<(), DriverError>>,
    },
    StartCachingHistory {
        since: Option<chrono::NaiveDateTime>,
        count: Option<usize>,
    },
    StopCachingHistory,
    ClearHistoryCache,
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

struct Shared {
    observation: watch::Sender<Option<Observation>>,
    observed_at: watch::Sender<Option<chrono::NaiveDateTime>>,
    config: watch::Sender<Option<WireConfig>>,
    state: watch::Sender<TransceiverState>,
    health: watch::Sender<Health>,
    info: watch::Sender<Option<TransceiverInfo>>,
}

pub struct ServiceHandle {
    tx: mpsc::Sender<Command>,
    observation: watch::Receiver<Option<Observation>>,
    observed_at: watch::Receiver<Option<chrono::NaiveDateTime>>,
    config: watch::Receiver<Option<WireConfig>>,
    state: watch::Receiver<TransceiverState>,
    health: watch::Receiver<Health>,
    info: watch::Receiver<Option<TransceiverInfo>>,
    history: Arc<Mutex<HistoryCache>>,
}

impl ServiceHandle {
    pub fn current_observation(&self) -> Option<Observation> {
        self.observation.borrow().clone()
    }

    /* Spec §6 "Emitted records": the flat host-facing shape, stamped
     * with the time this driver received the frame (the Current
     * Weather frame itself carries no "now" field - see `records.rs`). */
    pub fn current_observation_record(&self) -> Option<ObservationRecord> {
        let obs = self.observation.borrow().clone()?;
        let at = (*self.observed_at.borrow())?;
        Some(ObservationRecord::from_observation(at, &obs))
    }

    pub fn get_config(&self) -> Option<WireConfig> {
        self.config.borrow().clone()
    }

    pub fn health(&self) -> Health {
        *self.health.borrow()
    }

    pub fn transceiver_is_paired(&self) -> bool {
        *self.state.borrow() == TransceiverState::Paired
    }

    pub fn transceiver_is_present(&self) -> bool {
        !matches!(*self.state.borrow(), TransceiverState::Uninitialised)
    }

    pub fn get_transceiver_serial(&self) -> Option<String> {
        self.info.borrow().as_ref().map(|i| i.serial.clone())
    }

    pub fn get_transceiver_id(&self) -> Option<u16> {
        self.info.borrow().as_ref().map(|i| i.device_id.0)
    }

    pub async fn set_config(&self, config: WireConfig) -> Result<(), DriverError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::SetConfig { config, reply })
            .await
            .map_err(|_| DriverError::Cancelled)?;
        rx.await.map_err(|_| DriverError::Cancelled)?
    }

    pub async fn set_interval(&self, minutes: u32) -> Result<(), DriverError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::SetInterval { minutes, reply })
            .await
            .map_err(|_| DriverError::Cancelled)?;
        rx.await.map_err(|_| DriverError::Cancelled)?
    }

    pub async fn set_time(&self) -> Result<(), DriverError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::SetTime { reply })
            .await
            .map_err(|_| DriverError::Cancelled)?;
        rx.await.map_err(|_| DriverError::Cancelled)?
    }

    pub async fn start_caching_history(
        &self,
        since: Option<chrono::NaiveDateTime>,
        count: Option<usize>,
    ) {
        let _ = self.tx.send(Command::StartCachingHistory { since, count }).await;
    }

    pub async fn stop_caching_history(&self) {
        let _ = self.tx.send(Command::StopCachingHistory).await;
    }

    pub async fn clear_history_cache(&self) {
        let _ = self.tx.send(Command::ClearHistoryCache).await;
    }

    pub async fn get_history_cache_records(&self) -> Vec<HistoryExportRecord> {
        self.history
            .lock()
            .await
            .records
            .iter()
            .map(|(idx, rec)| HistoryExportRecord::from_record(*idx, rec))
            .collect()
    }

    pub async fn get_num_history_scanned(&self) -> usize {
        self.history.lock().await.scanned
    }

    pub async fn get_uncached_history_count(&self) -> u16 {
        let h = self.history.lock().await;
        h.latest_index.wrapping_sub(h.next_index)
    }

    pub async fn get_next_history_index(&self) -> u16 {
        self.history.lock().await.next_index
    }

    pub async fn get_latest_history_index(&self) -> u16 {
        self.history.lock().await.latest_index
    }

    /* Blocks up to `timeout` or until the transceiver reaches `Paired`. */
    pub async fn pair(&self, timeout: Duration) -> Result<(), DriverError> {
        let mut rx = self.state.clone();
        if *rx.borrow() == TransceiverState::Paired {
            return Ok(());
        }
        tokio::time::timeout(timeout, async {
            loop {
                if rx.changed().await.is_err() {
                    return Err(DriverError::Cancelled);
                }
                if *rx.borrow() == TransceiverState::Paired {
                    return Ok(());
                }
            }
        })
        .await
        .map_err(|_| DriverError::Timeout)?
    }

    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Shutdown { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }
}

struct Worker<T: UsbTransport> {
    controller: TransceiverController<T>,
    rx: mpsc::Receiver<Command>,
    shared: Shared,
    history: Arc<Mutex<HistoryCache>>,
    device_id: DeviceId,
    pending: PendingWrites,
    pending_config_target: Option<WireConfig>,
    sync_losses: u32,
    timing: ServiceTiming,
    pairing_started_at: Option<tokio::time::Instant>,
    pairing_timeout_warned: bool,
}

impl<T: UsbTransport> Worker<T> {
    async fn run(mut self) {
        let _ = self.shared.state.send(TransceiverState::Initialising);
        match self.controller.init().await {
            Ok(info) => {
                self.device_id = info.device_id.clone();
                let _ = self.shared.info.send(Some(info));
                let _ = self.shared.state.send(TransceiverState::Idle);
                if self.device_id.is_paired() {
                    let _ = self.shared.state.send(TransceiverState::Paired);
                } else {
                    let _ = self.shared.state.send(TransceiverState::Pairing);
                    self.pairing_started_at = Some(tokio::time::Instant::now());
                }
            }
            Err(e) => {
                error!(error = %e, "transceiver init failed");
                let _ = self.shared.health.send(Health::NoContact);
                return;
            }
        }

        let mut first_iteration = true;
        loop {
            tokio::select! {
                biased;
                cmd = self.rx.recv() => {
                    match cmd {
                        Some(cmd) => {
                            if self.handle_command(cmd).await {
                                return;
                            }
                        }
                        None => return,
                    }
                }
                _ = self.iterate(&mut first_iteration) => {}
            }
        }
    }

    /* Returns `true` if the worker should exit. */
    async fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::SetConfig { config, reply } => {
                self.pending_config_target = Some(config);
                self.pending.set_config = true;
                let _ = reply.send(Ok(()));
            }
            Command::SetInterval { minutes, reply } => {
                let result = crate::codec::config::HistoryInterval::from_index(
                    minutes_to_index(minutes),
                )
                .map_err(DriverError::CodecFault);
                match result {
                    Ok(interval) => {
                        if let Some(mut cfg) = self.shared.config.borrow().clone() {
                            cfg.history_interval = interval;
                            self.pending_config_target = Some(cfg);
                            self.pending.set_config = true;
                            let _ = reply.send(Ok(()));
                        } else {
                            let _ = reply.send(Err(DriverError::InvalidConfig(
                                "no config has been read yet".to_string(),
                            )));
                        }
                    }
                    Err(e) => {
                        let _ = reply.send(Err(e));
                    }
                }
            }
            Command::SetTime { reply } => {
                self.pending.set_time = true;
                let _ = reply.send(Ok(()));
            }
            Command::StartCachingHistory { since, count } => {
                let mut h = self.history.lock().await;
                h.caching = true;
                h.terminate_since = since;
                h.terminate_at_count = count;
                self.pending.history_catchup = Some(h.next_index);
            }
            Command::StopCachingHistory => {
                self.history.lock().await.caching = false;
                self.pending.history_catchup = None;
            }
            Command::ClearHistoryCache => {
                let mut h = self.history.lock().await;
                h.records.clear();
                h.scanned = 0;
            }
            Command::Shutdown { reply } => {
                let _ = self.shared.state.send(TransceiverState::ShuttingDown);
                let _ = reply.send(());
                return true;
            }
        }
        false
    }

    async fn iterate(&mut self, first_iteration: &mut bool) {
        self.warn_on_pairing_timeout();

        if !self.poll_until_ready().await {
            /* Spec §6 `polling_interval`: "seconds between service loop
             * cycles when idle". Only applies once the re-arm budget is
             * exhausted and the transceiver is genuinely idle/absent —
             * while still within budget, re-arm attempts keep using the
             * fixed §4.5 cadence so sync-loss recovery stays prompt. */
            if self
                .timing
                .max_tries
                .is_some_and(|budget| self.sync_losses >= budget)
            {
                tokio::time::sleep(self.timing.polling_interval).await;
            }
            return;
        }

        let frame = match self.controller.transport().read_frame().await {
            Ok(f) => f,
            Err(_) => match self.retry_transport_fault(FaultedOp::ReadFrame).await {
                Some(frame) => frame,
                None => return,
            },
        };

        self.apply_frame(&frame).await;

        let sleep_for = if *first_iteration {
            *first_iteration = false;
            self.timing.initial_inter_frame_sleep
        } else {
            self.timing.steady_inter_frame_sleep
        };
        tokio::time::sleep(sleep_for).await;
    }

    /* Spec §6 `pairing_timeout`: purely observational here — the
     * blocking wait lives in `ServiceHandle::pair`, which the façade
     * hands its own timeout, but an unpaired worker that outlives this
     * window is worth a log line. */
    fn warn_on_pairing_timeout(&mut self) {
        if self.pairing_timeout_warned {
            return;
        }
        if let Some(started) = self.pairing_started_at {
            if tokio::time::Instant::now().duration_since(started) >= self.timing.pairing_timeout {
                warn!(
                    timeout_secs = self.timing.pairing_timeout.as_secs(),
                    "no pairing response within the configured pairing_timeout window"
                );
                self.pairing_timeout_warned = true;
            }
        }
    }

    /* Step 1: poll `read_state` until ready, handling sync-loss
     * recovery after a 10 s window with no data. */
    async fn poll_until_ready(&mut self) -> bool {
        let deadline = tokio::time::Instant::now() + SYNC_LOSS_WINDOW;
        loop {
            match self.controller.transport().read_state().await {
                Ok((_, true)) => {
                    self.sync_losses = 0;
                    let _ = self.shared.health.send(Health::Ok);
                    return true;
                }
                Ok((_, false)) => {
                    if tokio::time::Instant::now() >= deadline {
                        self.sync_losses += 1;
                        warn!(count = self.sync_losses, "sync loss, re-arming receiver");
                        let _ = self.controller.arm().await;
                        if self
                            .timing
                            .max_tries
                            .is_some_and(|budget| self.sync_losses >= budget)
                        {
                            let _ = self.shared.health.send(Health::NoContact);
                        }
                        return false;
                    }
                    tokio::time::sleep(STATE_POLL_INTERVAL).await;
                }
                Err(_) => {
                    self.retry_transport_fault(FaultedOp::ReadState).await;
                    return false;
                }
            }
        }
    }

    /* Spec §4.5: "transport faults retry the same request up to 3
     * times with exponential backoff." Which request that is depends
     * on which call faulted — a `read_frame()` fault must be retried
     * with `read_frame()`, not papered over with an unrelated
     * `read_state()` poll, or the dropped frame is never actually
     * retried. `FaultedOp::ReadFrame`'s recovered frame is handed back
     * to the caller so `iterate()` can still apply it. */
    async fn retry_transport_fault(&mut self, op: FaultedOp) -> Option<[u8; FRAME_LENGTH]> {
        let mut attempt = 0u32;
        loop {
            if self.timing.max_tries.is_some_and(|max| attempt >= max) {
                break;
            }
            tokio::time::sleep(self.timing.retry_backoff(attempt)).await;
            match op {
                FaultedOp::ReadState => {
                    if self.controller.transport().read_state().await.is_ok() {
                        return None;
                    }
                }
                FaultedOp::ReadFrame => {
                    if let Ok(frame) = self.controller.transport().read_frame().await {
                        return Some(frame);
                    }
                }
            }
            attempt += 1;
        }
        let _ = self.shared.health.send(Health::Degraded);
        None
    }

    async fn apply_frame(&mut self, frame: &[u8; FRAME_LENGTH]) {
        let header = match FrameHeader::parse(frame) {
            Ok(h) => h,
            Err(e) => {
                warn!(error = %e, "dropping frame with bad header");
                return;
            }
        };
        if self.device_id.is_paired() && header.device_id != self.device_id.0 {
            warn!("dropping frame: device id mismatch");
            return;
        }

        let response = match ResponseType::from_byte(frame[frame::HEADER_LEN]) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "dropping frame with unknown response type");
                return;
            }
        };

        let payload = &frame[frame::HEADER_LEN + 1..];

        let mut history_progress = HistoryProgress {
            latest_index: 0,
            this_index: 0,
        };
        let mut config_dirty = false;

        match response {
            ResponseType::Current => match Observation::decode(payload) {
                Ok(obs) => {
                    let _ = self.shared.observation.send(Some(obs));
                    let _ = self
                        .shared
                        .observed_at
                        .send(Some(chrono::Utc::now().naive_utc()));
                }
                Err(e) => warn!(error = %e, "discarding current-weather frame"),
            },
            ResponseType::History => match HistoryRecord::decode(payload) {
                Ok(record) => {
                    let mut h = self.history.lock().await;
                    if h.caching {
                        let hash = record.content_hash();
                        /* `index` is the slot this record was just fetched
                         * from; `HistoryProgress.this_index` must carry
                         * that same pre-increment value; `next_request`
                         * is the one that advances past it. Storing the
                         * post-increment `next_index` here instead would
                         * skip every other record. */
                        let index = h.next_index;
                        if !h.is_duplicate(hash, std::time::Instant::now()) {
                            h.push(index, record);
                        }
                        history_progress = HistoryProgress {
                            latest_index: h.latest_index,
                            this_index: index,
                        };
                        h.next_index = index.wrapping_add(1);
                        if h.should_stop() {
                            h.caching = false;
                            self.pending.history_catchup = None;
                        } else {
                            self.pending.history_catchup = Some(h.next_index);
                        }
                    }
                }
                Err(e) => warn!(error = %e, "discarding history frame"),
            },
            ResponseType::GetConfig => match WireConfig::decode(payload) {
                Ok(cfg) => {
                    config_dirty = self
                        .pending_config_target
                        .as_ref()
                        .is_some_and(|target| *target != cfg);
                    let _ = self.shared.config.send(Some(cfg));
                }
                Err(e) => warn!(error = %e, "discarding config frame"),
            },
            ResponseType::RequestSetConfig | ResponseType::RequestSetTime => {
                let candidate = header.device_id;
                self.device_id = crate::protocol::adopt_device_id(&self.device_id, response, candidate);
                if self.device_id.is_paired() {
                    let _ = self.shared.state.send(TransceiverState::Paired);
                    self.pairing_started_at = None;
                }
            }
            ResponseType::Ack => {
                self.pending.set_time = false;
                self.pending.set_config = false;
            }
        }

        let decision = Decision {
            response,
            pending: &self.pending,
            config_dirty,
            history: history_progress,
        };
        let next = crate::protocol::next_request(decision);
        self.send_next_request(next).await;
    }

    async fn send_next_request(&mut self, next: NextRequest) {
        if frame::require_nonzero_device_id(self.device_id.0).is_err() {
            return;
        }

        let mut buf = [0u8; FRAME_LENGTH];
        let action = next.action();
        match &next {
            NextRequest::SetConfig => {
                if let Some(cfg) = &self.pending_config_target {
                    let encoded = cfg.encode();
                    buf[frame::HEADER_LEN + 1..frame::HEADER_LEN + 1 + encoded.len()]
                        .copy_from_slice(&encoded);
                }
            }
            NextRequest::GetHistory { index } => {
                let idx_bytes = index.to_be_bytes();
                buf[frame::HEADER_LEN + 1] = idx_bytes[0];
                buf[frame::HEADER_LEN + 2] = idx_bytes[1];
            }
            _ => {}
        }
        buf[frame::HEADER_LEN] = action as u8;

        let header = FrameHeader {
            length: (FRAME_LENGTH - 3) as u8,
            device_id: self.device_id.0,
        };
        header.write(&mut buf);

        if let Err(e) = self.controller.transport().write_frame(&buf).await {
            warn!(error = %e, "failed writing next request frame");
        }
    }
}

fn minutes_to_index(minutes: u32) -> u8 {
    use crate::codec::config::HistoryInterval;
    let table = [1, 5, 10, 15, 20, 30, 60, 120, 240, 360, 480, 720, 1440];
    table
        .iter()
        .position(|&m| m == minutes)
        .map(|i| i as u8)
        .unwrap_or(HistoryInterval::Min1 as u8)
}

pub fn spawn<T: UsbTransport + 'static>(transport: T, config: &DriverConfig) -> ServiceHandle {
    let (tx, rx) = mpsc::channel(16);
    let (obs_tx, obs_rx) = watch::channel(None);
    let (observed_at_tx, observed_at_rx) = watch::channel(None);
    let (cfg_tx, cfg_rx) = watch::channel(None);
    let (state_tx, state_rx) = watch::channel(TransceiverState::Uninitialised);
    let (health_tx, health_rx) = watch::channel(Health::Ok);
    let (info_tx, info_rx) = watch::channel(None);
    let history = Arc::new(Mutex::new(HistoryCache::default()));

    let controller = TransceiverController::new(transport, config.transceiver_frequency);
    let worker = Worker {
        controller,
        rx,
        shared: Shared {
            observation: obs_tx,
            observed_at: observed_at_tx,
            config: cfg_tx,
            state: state_tx,
            health: health_tx,
            info: info_tx,
        },
        history: Arc::clone(&history),
        device_id: DeviceId::UNPAIRED,
        pending: PendingWrites::default(),
        pending_config_target: None,
        sync_losses: 0,
        timing: ServiceTiming::from_config(config),
        pairing_started_at: None,
        pairing_timeout_warned: false,
    };

    tokio::spawn(async move {
        info!("service worker started");
        worker.run().await;
        info!("service worker stopped");
    });

    ServiceHandle {
        tx,
        observation: obs_rx,
        observed_at: observed_at_rx,
        config: cfg_rx,
        state: state_rx,
        health: health_rx,
        info: info_rx,
        history,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    #[tokio::test]
    async fn shutdown_completes_within_one_second() {
        let mock = MockTransport::new();
        mock.set_config_flash_page(0x1f9, [0u8; crate::transport::CONFIG_FLASH_PAGE_LEN])
            .await;
        mock.set_config_flash_page(0x1f5, [0u8; crate::transport::CONFIG_FLASH_PAGE_LEN])
            .await;
        mock.push_idle_states(50).await;

        let handle = spawn(mock, &DriverConfig::default());
        tokio::time::sleep(Duration::from_millis(50)).await;

        let start = tokio::time::Instant::now();
        tokio::time::timeout(Duration::from_secs(1), handle.shutdown())
            .await
            .expect("shutdown must complete within 1s");
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn history_cache_dedupes_within_window() {
        let mut cache = HistoryCache::default();
        let now = std::time::Instant::now();
        assert!(!cache.is_duplicate(123, now));
        assert!(cache.is_duplicate(123, now));
    }

    #[test]
    fn minutes_to_index_matches_known_table() {
        assert_eq!(minutes_to_index(1), 0);
        assert_eq!(minutes_to_index(1440), 12);
        assert_eq!(minutes_to_index(999_999), 0);
    }

    fn history_record_at(minute: i64) -> HistoryRecord {
        HistoryRecord {
            timestamp: chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
                + chrono::Duration::minutes(minute),
            temp_indoor_tenths_c: Some(200),
            temp_outdoor_tenths_c: Some(150),
            humidity_indoor_pct: 45,
            humidity_outdoor_pct: 50,
            pressure_rel_hpa_tenths: 10130,
            rain_counter_raw: 0,
            wind_direction: crate::codec::Direction::N,
            gust_direction: crate::codec::Direction::N,
            wind_speed_cms: Some(0),
            gust_speed_cms: Some(0),
        }
    }

    /* `terminate_since` must compare against the most recently scanned
     * record, not the first one ever pushed, or the since-based cutoff
     * can only ever fire on the very first record. */
    #[test]
    fn should_stop_terminate_since_checks_most_recent_record() {
        let mut cache = HistoryCache {
            terminate_since: Some(
                chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 5, 0)
                    .unwrap(),
            ),
            ..Default::default()
        };
        cache.push(0, history_record_at(0));
        assert!(cache.should_stop(), "still at or before the cutoff");
        cache.push(1, history_record_at(10));
        assert!(
            !cache.should_stop(),
            "the most recently scanned record is past the cutoff, so scanning must continue"
        );
    }

    #[test]
    fn service_timing_treats_zero_max_tries_as_infinite() {
        let config = DriverConfig {
            max_tries: 0,
            ..Default::default()
        };
        assert_eq!(ServiceTiming::from_config(&config).max_tries, None);

        let config = DriverConfig {
            max_tries: 5,
            ..Default::default()
        };
        assert_eq!(ServiceTiming::from_config(&config).max_tries, Some(5));
    }

    #[test]
    fn service_timing_reads_comm_interval_from_config() {
        let config = DriverConfig {
            comm_interval_ms: [111, 222],
            ..Default::default()
        };
        let timing = ServiceTiming::from_config(&config);
        assert_eq!(timing.initial_inter_frame_sleep, Duration::from_millis(111));
        assert_eq!(timing.steady_inter_frame_sleep, Duration::from_millis(222));
    }
}
