/* USB Transport: thin wrapper around the kernel USB primitives exposing
 * the four control transfers and the interrupt read the WS-28xx dongle
 * protocol is built on. Nothing above this layer touches `rusb`
 * directly — drivers above see only `UsbTransport`, which makes the
 * rest of the core testable against `MockTransport` without hardware
 * attached. */

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::TransportError;

pub const VENDOR_ID: u16 = 0x6666;
pub const PRODUCT_ID: u16 = 0x5555;

/* USB message ids, i.e. the first payload byte of every control write
 * and the report id of every control/interrupt read. */
pub const MSG_SET_RX: u8 = 0xd0;
pub const MSG_SET_TX: u8 = 0xd1;
pub const MSG_SET_FREQUENCY: u8 = 0xd7;
pub const MSG_SET_PREAMBLE_PATTERN: u8 = 0xd8;
pub const MSG_EXECUTE: u8 = 0xd9;
pub const MSG_SET_RADIO_REGISTERS: u8 = 0xdd;
pub const MSG_WRITE_FRAME: u8 = 0xd5;
pub const MSG_READ_FRAME: u8 = 0xd6;
pub const MSG_READ_STATE: u8 = 0xde;
pub const MSG_READ_CONFIG_FLASH: u8 = 0xdc;

pub const FRAME_LENGTH: usize = 273;
pub const CONFIG_FLASH_PAGE_LEN: usize = 32;

/* Low nibble of the state byte returned by `read_state`. */
pub const STATE_INITIALISING: u8 = 0x14;
pub const STATE_IDLE: u8 = 0x15;
pub const STATE_DATA_AVAILABLE: u8 = 0x16;

const IFACE: u16 = 0;
const EP_IN: u8 = 0x81;
#[allow(dead_code)]
const EP_OUT: u8 = 0x01;

const USB_TIMEOUT: Duration = Duration::from_millis(1000);

/* HID class request, SET_REPORT, output report, per-interface. This is
 * how the dongle's "control transfer" writes are actually issued on
 * the wire; `read_frame`/`read_state` instead pull from the interrupt
 * IN endpoint. */
const HID_SET_REPORT: u8 = 0x09;
const HID_REPORT_TYPE_OUTPUT: u16 = 0x02;
const REQUEST_TYPE_SET_REPORT: u8 = 0x21; // host-to-device | class | interface

/* Universal transport interface consumed by the transceiver controller
 * and the service loop: the full set of USB primitives the WS-28xx
 * protocol needs, with nothing device-specific leaking through. */
#[async_trait]
pub trait UsbTransport: Send + Sync {
    /* 5-byte control write `f0 addr 01 value 00`, used only during
     * transceiver init (register programming). */
    async fn write_register(&self, addr: u8, value: u8) -> Result<(), TransportError>;

    /* 15- or 21-byte control write; `payload[0]` is the message id. */
    async fn write_command(&self, payload: &[u8]) -> Result<(), TransportError>;

    /* Write a 273-byte frame buffer (message id `d5`). */
    async fn write_frame(&self, frame: &[u8; FRAME_LENGTH]) -> Result<(), TransportError>;

    /* Read a 273-byte frame buffer (message id `d6`). */
    async fn read_frame(&self) -> Result<[u8; FRAME_LENGTH], TransportError>;

    /* 6-byte interrupt read (message id `de`); returns (state byte,
     * data-ready flag) where data-ready is `state & 0x0f == 0x16`. */
    async fn read_state(&self) -> Result<(u8, bool), TransportError>;

    /* Read one 32-byte EEPROM page (message id `dc`), used only during
     * transceiver init to recover the serial number, device id, and
     * frequency correction baked in at the factory. */
    async fn read_config_flash(&self, addr: u16) -> Result<[u8; CONFIG_FLASH_PAGE_LEN], TransportError>;
}

/* Concrete transport backed by `rusb` (libusb). `rusb` is a blocking
 * API, so every call is dispatched through `spawn_blocking` — no
 * blocking syscall ever runs on a Tokio worker thread. */
pub struct RusbTransport {
    handle: Arc<rusb::DeviceHandle<rusb::GlobalContext>>,
}

impl RusbTransport {
    /* Open the dongle by vendor/product id. Fails if no matching
     * device is attached, or if the interface can't be claimed. */
    pub fn open() -> Result<Self, TransportError> {
        let handle = rusb::open_device_with_vid_pid(VENDOR_ID, PRODUCT_ID).ok_or(
            TransportError::DeviceNotFound {
                vid: VENDOR_ID,
                pid: PRODUCT_ID,
            },
        )?;

        handle.set_auto_detach_kernel_driver(true).ok();
        handle.claim_interface(IFACE as u8)?;

        debug!("opened WS-28xx dongle {VENDOR_ID:#06x}:{PRODUCT_ID:#06x}");

        Ok(Self {
            handle: Arc::new(handle),
        })
    }

    fn control_write(handle: &rusb::DeviceHandle<rusb::GlobalContext>, buf: &[u8]) -> Result<(), TransportError> {
        let wvalue = (HID_REPORT_TYPE_OUTPUT << 8) | buf[0] as u16;
        let n = handle.write_control(
            REQUEST_TYPE_SET_REPORT,
            HID_SET_REPORT,
            wvalue,
            IFACE,
            buf,
            USB_TIMEOUT,
        )?;
        if n != buf.len() {
            return Err(TransportError::ShortTransfer {
                expected: buf.len(),
                actual: n,
            });
        }
        debug!("TX {n} bytes: {:02x?}", buf);
        Ok(())
    }

    fn interrupt_read(
        handle: &rusb::DeviceHandle<rusb::GlobalContext>,
        len: usize,
    ) -> Result<Vec<u8>, TransportError> {
        let mut buf = vec![0u8; len];
        let n = handle.read_interrupt(EP_IN, &mut buf, USB_TIMEOUT)?;
        buf.truncate(n);
        debug!("RX {n} bytes: {:02x?}", buf);
        Ok(buf)
    }
}

#[async_trait]
impl UsbTransport for RusbTransport {
    async fn write_register(&self, addr: u8, value: u8) -> Result<(), TransportError> {
        let buf = [0xf0, addr, 0x01, value, 0x00];
        let handle = Arc::clone(&self.handle);
        tokio::task::spawn_blocking(move || Self::control_write(&handle, &buf))
            .await
            .expect("blocking USB write task panicked")
    }

    async fn write_command(&self, payload: &[u8]) -> Result<(), TransportError> {
        let buf = payload.to_vec();
        let handle = Arc::clone(&self.handle);
        tokio::task::spawn_blocking(move || Self::control_write(&handle, &buf))
            .await
            .expect("blocking USB write task panicked")
    }

    async fn write_frame(&self, frame: &[u8; FRAME_LENGTH]) -> Result<(), TransportError> {
        let mut buf = Vec::with_capacity(FRAME_LENGTH + 1);
        buf.push(MSG_WRITE_FRAME);
        buf.extend_from_slice(frame);
        let handle = Arc::clone(&self.handle);
        tokio::task::spawn_blocking(move || Self::control_write(&handle, &buf))
            .await
            .expect("blocking USB write task panicked")
    }

    async fn read_frame(&self) -> Result<[u8; FRAME_LENGTH], TransportError> {
        let handle = Arc::clone(&self.handle);
        let raw = tokio::task::spawn_blocking(move || Self::interrupt_read(&handle, FRAME_LENGTH + 1))
            .await
            .expect("blocking USB read task panicked")?;

        if raw.len() < FRAME_LENGTH + 1 || raw[0] != MSG_READ_FRAME {
            return Err(TransportError::ShortTransfer {
                expected: FRAME_LENGTH + 1,
                actual: raw.len(),
            });
        }

        let mut frame = [0u8; FRAME_LENGTH];
        frame.copy_from_slice(&raw[1..FRAME_LENGTH + 1]);
        Ok(frame)
    }

    async fn read_state(&self) -> Result<(u8, bool), TransportError> {
        let handle = Arc::clone(&self.handle);
        let raw = tokio::task::spawn_blocking(move || Self::interrupt_read(&handle, 6))
            .await
            .expect("blocking USB read task panicked")?;

        if raw.len() < 2 {
            return Err(TransportError::ShortTransfer {
                expected: 6,
                actual: raw.len(),
            });
        }

        let state = raw[1];
        let ready = state & 0x0f == STATE_DATA_AVAILABLE;
        Ok((state, ready))
    }

    async fn read_config_flash(&self, addr: u16) -> Result<[u8; CONFIG_FLASH_PAGE_LEN], TransportError> {
        let addr_bytes = addr.to_be_bytes();
        let cmd = [MSG_READ_CONFIG_FLASH, addr_bytes[0], addr_bytes[1]];
        let handle = Arc::clone(&self.handle);
        tokio::task::spawn_blocking(move || Self::control_write(&handle, &cmd))
            .await
            .expect("blocking USB write task panicked")?;

        let handle = Arc::clone(&self.handle);
        let raw = tokio::task::spawn_blocking(move || Self::interrupt_read(&handle, CONFIG_FLASH_PAGE_LEN + 1))
            .await
            .expect("blocking USB read task panicked")?;

        if raw.len() < CONFIG_FLASH_PAGE_LEN + 1 {
            return Err(TransportError::ShortTransfer {
                expected: CONFIG_FLASH_PAGE_LEN + 1,
                actual: raw.len(),
            });
        }
        let mut page = [0u8; CONFIG_FLASH_PAGE_LEN];
        page.copy_from_slice(&raw[1..CONFIG_FLASH_PAGE_LEN + 1]);
        Ok(page)
    }
}

#[cfg(any(test, feature = "mock-transport"))]
pub mod mock {
    use super::*;
    use tokio::sync::Mutex;

    /* In-memory transport double for tests: a FIFO of canned frames
     * standing in for the console's responses, and a log of every
     * request issued, for assertions. */
    pub struct MockTransport {
        inner: Mutex<MockState>,
    }

    struct MockState {
        pending_frames: std::collections::VecDeque<[u8; FRAME_LENGTH]>,
        pending_states: std::collections::VecDeque<(u8, bool)>,
        pending_config_flash: std::collections::HashMap<u16, [u8; CONFIG_FLASH_PAGE_LEN]>,
        pub written_frames: Vec<[u8; FRAME_LENGTH]>,
        pub written_commands: Vec<Vec<u8>>,
        pub written_registers: Vec<(u8, u8)>,
        fail_next_read: usize,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self {
                inner: Mutex::new(MockState {
                    pending_frames: Default::default(),
                    pending_states: Default::default(),
                    pending_config_flash: Default::default(),
                    written_frames: Vec::new(),
                    written_commands: Vec::new(),
                    written_registers: Vec::new(),
                    fail_next_read: 0,
                }),
            }
        }

        pub async fn push_frame(&self, frame: [u8; FRAME_LENGTH]) {
            self.inner.lock().await.pending_frames.push_back(frame);
        }

        pub async fn set_config_flash_page(&self, addr: u16, page: [u8; CONFIG_FLASH_PAGE_LEN]) {
            self.inner.lock().await.pending_config_flash.insert(addr, page);
        }

        pub async fn push_state(&self, state: u8, ready: bool) {
            self.inner.lock().await.pending_states.push_back((state, ready));
        }

        /* Queue `n` consecutive "nothing ready" reads, for sync-loss tests. */
        pub async fn push_idle_states(&self, n: usize) {
            let mut inner = self.inner.lock().await;
            for _ in 0..n {
                inner.pending_states.push_back((STATE_IDLE, false));
            }
        }

        pub async fn fail_next_reads(&self, n: usize) {
            self.inner.lock().await.fail_next_read = n;
        }

        pub async fn written_commands(&self) -> Vec<Vec<u8>> {
            self.inner.lock().await.written_commands.clone()
        }

        pub async fn written_frames(&self) -> Vec<[u8; FRAME_LENGTH]> {
            self.inner.lock().await.written_frames.clone()
        }
    }

    impl Default for MockTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl UsbTransport for MockTransport {
        async fn write_register(&self, addr: u8, value: u8) -> Result<(), TransportError> {
            self.inner.lock().await.written_registers.push((addr, value));
            Ok(())
        }

        async fn write_command(&self, payload: &[u8]) -> Result<(), TransportError> {
            self.inner.lock().await.written_commands.push(payload.to_vec());
            Ok(())
        }

        async fn write_frame(&self, frame: &[u8; FRAME_LENGTH]) -> Result<(), TransportError> {
            self.inner.lock().await.written_frames.push(*frame);
            Ok(())
        }

        async fn read_frame(&self) -> Result<[u8; FRAME_LENGTH], TransportError> {
            let mut inner = self.inner.lock().await;
            if inner.fail_next_read > 0 {
                inner.fail_next_read -= 1;
                return Err(TransportError::ShortTransfer {
                    expected: FRAME_LENGTH,
                    actual: 0,
                });
            }
            inner
                .pending_frames
                .pop_front()
                .ok_or(TransportError::ShortTransfer {
                    expected: FRAME_LENGTH,
                    actual: 0,
                })
        }

        async fn read_state(&self) -> Result<(u8, bool), TransportError> {
            let mut inner = self.inner.lock().await;
            if inner.fail_next_read > 0 {
                inner.fail_next_read -= 1;
                return Err(TransportError::ShortTransfer {
                    expected: 6,
                    actual: 0,
                });
            }
            Ok(inner.pending_states.pop_front().unwrap_or((STATE_IDLE, false)))
        }

        async fn read_config_flash(&self, addr: u16) -> Result<[u8; CONFIG_FLASH_PAGE_LEN], TransportError> {
            let inner = self.inner.lock().await;
            Ok(inner
                .pending_config_flash
                .get(&addr)
                .copied()
                .unwrap_or([0u8; CONFIG_FLASH_PAGE_LEN]))
        }
    }
}
