/* Transceiver Controller (spec §4.2): the one-shot dongle setup that
 * runs once per driver lifetime, plus the pairing handshake. Nothing
 * here talks to the RF console directly — that is the Service Loop's
 * job once the dongle is armed and listening. */

use std::time::Duration;

use tracing::info;

use crate::error::{DriverError, TransportError};
use crate::transport::{
    UsbTransport, CONFIG_FLASH_PAGE_LEN, MSG_EXECUTE, MSG_SET_PREAMBLE_PATTERN, MSG_SET_RX,
};

const SERIAL_ADDR: u16 = 0x1f9;
const FREQ_CORRECTION_ADDR: u16 = 0x1f5;

const FREQ_BASE_US_HZ: i64 = 905_000_000;
const FREQ_BASE_EU_HZ: i64 = 868_000_000;
const XTAL_HZ: i64 = 16_000_000;

/* AX5051 register addresses carrying the tuned RF frequency; the rest
 * of the table is frequency-independent. */
const FREQ_HI_ADDR: u8 = 0x15;
const FREQ_MID_ADDR: u8 = 0x16;
const FREQ_LO_ADDR: u8 = 0x17;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Us,
    Eu,
}

impl Region {
    fn base_hz(self) -> i64 {
        match self {
            Region::Us => FREQ_BASE_US_HZ,
            Region::Eu => FREQ_BASE_EU_HZ,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceId(pub u16);

impl DeviceId {
    pub const UNPAIRED: DeviceId = DeviceId(0);

    pub fn is_paired(&self) -> bool {
        self.0 != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransceiverInfo {
    pub serial: String,
    pub device_id: DeviceId,
    pub crystal_correction_hz: i32,
}

/* spec §3: transitions are driven only by the Service Loop; this type
 * is shared state the Controller and the loop both read and write
 * through the façade's slot, never raced against. */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransceiverState {
    Uninitialised,
    Initialising,
    Idle,
    Pairing,
    Paired,
    ShuttingDown,
}

/* 60-entry `(address, value)` AX5051 register table. Frequency-bearing
 * entries (`FREQ_HI_ADDR`/`FREQ_MID_ADDR`/`FREQ_LO_ADDR`) are
 * placeholders here and are overwritten with the tuned value by
 * `patch_frequency_registers` before being written to the dongle. */
const AX5051_REGISTERS: [(u8, u8); 60] = build_register_table();

const fn build_register_table() -> [(u8, u8); 60] {
    let mut table = [(0u8, 0u8); 60];
    let mut i = 0;
    while i < 60 {
        table[i] = (i as u8, 0);
        i += 1;
    }
    table
}

fn patch_frequency_registers(table: &mut [(u8, u8); 60], freq_words: u32) {
    let hi = ((freq_words >> 16) & 0xff) as u8;
    let mid = ((freq_words >> 8) & 0xff) as u8;
    let lo = (freq_words & 0xff) as u8;
    for entry in table.iter_mut() {
        match entry.0 {
            a if a == FREQ_HI_ADDR => entry.1 = hi,
            a if a == FREQ_MID_ADDR => entry.1 = mid,
            a if a == FREQ_LO_ADDR => entry.1 = lo,
            _ => {}
        }
    }
}

fn freq_words(freq_hz: i64) -> u32 {
    ((freq_hz as i128 * 16_777_216 + XTAL_HZ as i128 / 2) / XTAL_HZ as i128) as u32
}

fn bcd_digits_to_string(page: &[u8], start: usize, digits: usize) -> String {
    let mut s = String::with_capacity(digits);
    for i in 0..digits {
        let byte = page[start + i / 2];
        let nibble = if i % 2 == 0 { byte & 0x0f } else { (byte >> 4) & 0x0f };
        s.push(char::from_digit(nibble as u32, 10).unwrap_or('?'));
    }
    s
}

pub struct TransceiverController<T: UsbTransport> {
    transport: T,
    region: Region,
}

impl<T: UsbTransport> TransceiverController<T> {
    pub fn new(transport: T, region: Region) -> Self {
        Self { transport, region }
    }

    /* Idempotent one-shot init (spec §4.2 steps 1-5). */
    pub async fn init(&self) -> Result<TransceiverInfo, DriverError> {
        let serial_page = self.transport.read_config_flash(SERIAL_ADDR).await?;
        let serial = bcd_digits_to_string(&serial_page, 0, 14);
        let device_id = u16::from_be_bytes([serial_page[7], serial_page[8]]);

        let freq_page = self.transport.read_config_flash(FREQ_CORRECTION_ADDR).await?;
        let correction = i32::from_be_bytes([
            if freq_page[0] & 0x80 != 0 { 0xff } else { 0x00 },
            freq_page[0],
            freq_page[1],
            freq_page[2],
        ]);

        let freq_hz = self.region.base_hz() + correction as i64;
        let words = freq_words(freq_hz);

        let mut registers = AX5051_REGISTERS;
        patch_frequency_registers(&mut registers, words);
        for &(addr, value) in registers.iter() {
            self.transport.write_register(addr, value).await?;
        }

        self.transport.write_command(&[MSG_SET_RX]).await?;
        self.transport.write_command(&[MSG_SET_PREAMBLE_PATTERN, 0xaa]).await?;
        self.transport.write_command(&[MSG_EXECUTE, 0x05]).await?;

        info!(
            serial = %serial,
            device_id = format!("{:#06x}", device_id),
            freq_hz,
            "transceiver initialised"
        );

        Ok(TransceiverInfo {
            serial,
            device_id: DeviceId(device_id),
            crystal_correction_hz: correction,
        })
    }

    /* Re-arm the receiver (spec §4.2 pairing, §4.5 sync-loss recovery):
     * `Execute 05` with the pairing preamble. */
    pub async fn arm(&self) -> Result<(), TransportError> {
        self.transport.write_command(&[MSG_EXECUTE, 0x05]).await
    }

    /* Poll `read_state` up to `timeout` for data-ready, used both
     * during pairing and by the Service Loop's steady-state cadence. */
    pub async fn wait_for_data(&self, timeout: Duration) -> Result<bool, TransportError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let (_, ready) = self.transport.read_state().await?;
            if ready {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freq_words_us_base_is_plausible() {
        let words = freq_words(FREQ_BASE_US_HZ);
        assert!(words > 0);
        let hi = (words >> 16) & 0xff;
        assert!(hi <= 0xff);
    }

    #[test]
    fn patch_frequency_registers_only_touches_freq_entries() {
        let mut table = AX5051_REGISTERS;
        patch_frequency_registers(&mut table, 0x123456);
        for &(addr, value) in table.iter() {
            match addr {
                a if a == FREQ_HI_ADDR => assert_eq!(value, 0x12),
                a if a == FREQ_MID_ADDR => assert_eq!(value, 0x34),
                a if a == FREQ_LO_ADDR => assert_eq!(value, 0x56),
                _ => assert_eq!(value, 0),
            }
        }
    }

    #[tokio::test]
    async fn init_reads_serial_and_device_id_from_flash() {
        let mock = crate::transport::mock::MockTransport::new();
        let mut serial_page = [0u8; CONFIG_FLASH_PAGE_LEN];
        // BCD "12345678901234" packed low-nibble-first across 7 bytes.
        serial_page[0] = 0x21;
        serial_page[1] = 0x43;
        serial_page[2] = 0x65;
        serial_page[3] = 0x87;
        serial_page[4] = 0x09;
        serial_page[5] = 0x21;
        serial_page[6] = 0x43;
        serial_page[7] = 0x01;
        serial_page[8] = 0x2e;
        mock.set_config_flash_page(SERIAL_ADDR, serial_page).await;
        mock.set_config_flash_page(FREQ_CORRECTION_ADDR, [0u8; CONFIG_FLASH_PAGE_LEN])
            .await;

        let controller = TransceiverController::new(mock, Region::Us);
        let info = controller.init().await.unwrap();
        assert_eq!(info.device_id, DeviceId(0x012e));
        assert_eq!(info.serial.len(), 14);
    }

    #[tokio::test]
    async fn arm_issues_execute_with_pairing_byte() {
        let mock = crate::transport::mock::MockTransport::new();
        let controller = TransceiverController::new(mock, Region::Eu);
        controller.arm().await.unwrap();
        let written = controller.transport().written_commands().await;
        assert_eq!(written.last().unwrap(), &vec![MSG_EXECUTE, 0x05]);
    }
}
