/* History record codec (spec §3 `HistoryRecord`, §4.3 GetHistory).
 *
 * Simpler than the Current Weather frame: no min/max tracking, no
 * alarm state, just a point-in-time sample the console logged at its
 * configured interval. Layout is this crate's own self-consistent
 * nibble table (see the note at the top of `codec/mod.rs`). */

use chrono::NaiveDateTime;

use super::{decode_bcd, decode_timestamp, encode_bcd, encode_timestamp, Direction, NibbleField};
use crate::error::CodecError;

const TIMESTAMP: NibbleField = NibbleField::new("timestamp", 0, 10);
const TEMP_INDOOR: NibbleField = NibbleField::new("temp_indoor", 10, 5);
const TEMP_OUTDOOR: NibbleField = NibbleField::new("temp_outdoor", 15, 5);
const HUMIDITY_INDOOR: NibbleField = NibbleField::new("humidity_indoor", 20, 2);
const HUMIDITY_OUTDOOR: NibbleField = NibbleField::new("humidity_outdoor", 22, 2);
const PRESSURE_REL_HPA: NibbleField = NibbleField::new("pressure_rel_hpa", 24, 5);
const RAIN_COUNTER_RAW: NibbleField = NibbleField::new("rain_counter_raw", 29, 7);
const WIND_DIRECTION: NibbleField = NibbleField::new("wind_direction", 36, 1);
const GUST_DIRECTION: NibbleField = NibbleField::new("gust_direction", 37, 1);
const WIND_SPEED: NibbleField = NibbleField::new("wind_speed", 38, 6);
const GUST_SPEED: NibbleField = NibbleField::new("gust_speed", 44, 6);

pub const HISTORY_PAYLOAD_LEN: usize = 27;
const CHECKSUM_OFFSET: usize = 25;

/* Same ±40.0C/+400 rule as the Current Weather and Config frames. */
fn decode_temp(buf: &[u8], field: &NibbleField) -> Result<Option<i32>, CodecError> {
    Ok(decode_bcd(buf, field)?.map(|raw| raw as i32 - 400))
}

fn encode_temp(buf: &mut [u8], field: &NibbleField, tenths: Option<i32>) {
    encode_bcd(buf, field, tenths.map(|t| (t + 400).clamp(0, 99_999) as u32));
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub timestamp: NaiveDateTime,
    pub temp_indoor_tenths_c: Option<i32>,
    pub temp_outdoor_tenths_c: Option<i32>,
    pub humidity_indoor_pct: u8,
    pub humidity_outdoor_pct: u8,
    pub pressure_rel_hpa_tenths: u32,
    pub rain_counter_raw: u32,
    pub wind_direction: Direction,
    pub gust_direction: Direction,
    pub wind_speed_cms: Option<u32>,
    pub gust_speed_cms: Option<u32>,
}

impl HistoryRecord {
    pub fn decode(payload: &[u8]) -> Result<Self, CodecError> {
        if payload.len() < HISTORY_PAYLOAD_LEN {
            return Err(CodecError::TooShort {
                expected: HISTORY_PAYLOAD_LEN,
                actual: payload.len(),
            });
        }

        let computed = super::running_checksum(payload, CHECKSUM_OFFSET);
        let received =
            u16::from_be_bytes([payload[CHECKSUM_OFFSET], payload[CHECKSUM_OFFSET + 1]]);
        if computed != received {
            return Err(CodecError::ChecksumMismatch { computed, received });
        }

        Ok(HistoryRecord {
            timestamp: decode_timestamp(payload, &TIMESTAMP)?,
            temp_indoor_tenths_c: decode_temp(payload, &TEMP_INDOOR)?,
            temp_outdoor_tenths_c: decode_temp(payload, &TEMP_OUTDOOR)?,
            humidity_indoor_pct: decode_bcd(payload, &HUMIDITY_INDOOR)?.unwrap_or(0) as u8,
            humidity_outdoor_pct: decode_bcd(payload, &HUMIDITY_OUTDOOR)?.unwrap_or(0) as u8,
            pressure_rel_hpa_tenths: decode_bcd(payload, &PRESSURE_REL_HPA)?.unwrap_or(0),
            rain_counter_raw: decode_bcd(payload, &RAIN_COUNTER_RAW)?.unwrap_or(0),
            wind_direction: Direction::from_nibble(super::read_raw(payload, &WIND_DIRECTION) as u8)
                .expect("nibble is always in 0..16"),
            gust_direction: Direction::from_nibble(super::read_raw(payload, &GUST_DIRECTION) as u8)
                .expect("nibble is always in 0..16"),
            wind_speed_cms: decode_bcd(payload, &WIND_SPEED)?,
            gust_speed_cms: decode_bcd(payload, &GUST_SPEED)?,
        })
    }

    pub fn encode(&self) -> [u8; HISTORY_PAYLOAD_LEN] {
        let mut buf = [0u8; HISTORY_PAYLOAD_LEN];

        encode_timestamp(&mut buf, &TIMESTAMP, self.timestamp);
        encode_temp(&mut buf, &TEMP_INDOOR, self.temp_indoor_tenths_c);
        encode_temp(&mut buf, &TEMP_OUTDOOR, self.temp_outdoor_tenths_c);
        encode_bcd(&mut buf, &HUMIDITY_INDOOR, Some(self.humidity_indoor_pct as u32));
        encode_bcd(&mut buf, &HUMIDITY_OUTDOOR, Some(self.humidity_outdoor_pct as u32));
        encode_bcd(&mut buf, &PRESSURE_REL_HPA, Some(self.pressure_rel_hpa_tenths));
        encode_bcd(&mut buf, &RAIN_COUNTER_RAW, Some(self.rain_counter_raw));
        super::write_raw(&mut buf, &WIND_DIRECTION, self.wind_direction.to_nibble() as u32);
        super::write_raw(&mut buf, &GUST_DIRECTION, self.gust_direction.to_nibble() as u32);
        encode_bcd(&mut buf, &WIND_SPEED, self.wind_speed_cms);
        encode_bcd(&mut buf, &GUST_SPEED, self.gust_speed_cms);

        let checksum = super::running_checksum(&buf, CHECKSUM_OFFSET);
        buf[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2].copy_from_slice(&checksum.to_be_bytes());
        buf
    }

    /* FNV-1a over the fields that matter for "is this a new sample",
     * deliberately excluding `timestamp`: the console can re-send the
     * same slot with a corrected clock, and the service loop de-dupes
     * on content, not on time (see `service::HistoryCache`). */
    pub fn content_hash(&self) -> u64 {
        let mut hash: u64 = 0xcbf29ce484222325;
        let mut mix = |b: &[u8]| {
            for &byte in b {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(0x100000001b3);
            }
        };
        mix(&self.temp_indoor_tenths_c.unwrap_or(i32::MIN).to_be_bytes());
        mix(&self.temp_outdoor_tenths_c.unwrap_or(i32::MIN).to_be_bytes());
        mix(&[self.humidity_indoor_pct, self.humidity_outdoor_pct]);
        mix(&self.pressure_rel_hpa_tenths.to_be_bytes());
        mix(&self.rain_counter_raw.to_be_bytes());
        mix(&[self.wind_direction.to_nibble(), self.gust_direction.to_nibble()]);
        mix(&self.wind_speed_cms.unwrap_or(u32::MAX).to_be_bytes());
        mix(&self.gust_speed_cms.unwrap_or(u32::MAX).to_be_bytes());
        hash
    }
}
