/* Current Weather frame codec (spec §3 `Observation`, §4.3).
 *
 * Field offsets below are this crate's own self-consistent layout (see
 * the note at the top of `codec/mod.rs`); the one byte range borrowed
 * verbatim from spec §9's Open Questions is `_AlarmRingingFlags` at
 * bytes 6-7, which this layout places exactly there. */

use chrono::NaiveDateTime;

use super::{decode_bcd, decode_timestamp, encode_bcd, encode_timestamp, read_raw, write_raw, Direction, NibbleField, Tentative};
use crate::error::CodecError;

const BATTERY_FLAGS: NibbleField = NibbleField::new("battery_flags", 0, 2);
const SIGNAL_QUALITY_STEPS: NibbleField = NibbleField::new("signal_quality_steps", 2, 2);
const WEATHER_STATE: NibbleField = NibbleField::new("weather_state", 4, 1);
const WEATHER_TENDENCY: NibbleField = NibbleField::new("weather_tendency", 5, 1);
const WIND_DIRECTION: NibbleField = NibbleField::new("wind_direction", 6, 1);
const GUST_DIRECTION: NibbleField = NibbleField::new("gust_direction", 7, 1);
/* bytes 4-5 reserved */
const ALARM_RINGING_FLAGS: NibbleField = NibbleField::new("alarm_ringing_flags", 12, 4);
const WIND_DIRECTION_HISTORY: NibbleField = NibbleField::new("wind_direction_history", 16, 5);
const GUST_DIRECTION_HISTORY: NibbleField = NibbleField::new("gust_direction_history", 21, 5);
const TEMP_INDOOR: NibbleField = NibbleField::new("temp_indoor", 26, 5);
const TEMP_OUTDOOR: NibbleField = NibbleField::new("temp_outdoor", 31, 5);
const DEWPOINT: NibbleField = NibbleField::new("dewpoint", 36, 5);
const WINDCHILL: NibbleField = NibbleField::new("windchill", 41, 5);
const HUMIDITY_INDOOR: NibbleField = NibbleField::new("humidity_indoor", 46, 3);
const HUMIDITY_OUTDOOR: NibbleField = NibbleField::new("humidity_outdoor", 49, 3);
const WIND_SPEED: NibbleField = NibbleField::new("wind_speed", 52, 6);
const GUST_SPEED: NibbleField = NibbleField::new("gust_speed", 58, 6);
const RAIN_COUNTER_TOTAL: NibbleField = NibbleField::new("rain_counter_total", 64, 7);
const RAIN_24H: NibbleField = NibbleField::new("rain_24h", 71, 7);
const RAIN_WEEK: NibbleField = NibbleField::new("rain_week", 78, 7);
const RAIN_MONTH: NibbleField = NibbleField::new("rain_month", 85, 7);
const PRESSURE_REL_HPA: NibbleField = NibbleField::new("pressure_rel_hpa", 92, 5);
const PRESSURE_REL_INHG: NibbleField = NibbleField::new("pressure_rel_inhg", 97, 5);
const LAST_RAIN_RESET_TS: NibbleField = NibbleField::new("last_rain_reset_ts", 102, 10);

const TEMP_INDOOR_MIN: NibbleField = NibbleField::new("temp_indoor_min", 112, 5);
const TEMP_INDOOR_MIN_TS: NibbleField = NibbleField::new("temp_indoor_min_ts", 117, 10);
const TEMP_INDOOR_MAX: NibbleField = NibbleField::new("temp_indoor_max", 127, 5);
const TEMP_INDOOR_MAX_TS: NibbleField = NibbleField::new("temp_indoor_max_ts", 132, 10);
const TEMP_OUTDOOR_MIN: NibbleField = NibbleField::new("temp_outdoor_min", 142, 5);
const TEMP_OUTDOOR_MIN_TS: NibbleField = NibbleField::new("temp_outdoor_min_ts", 147, 10);
const TEMP_OUTDOOR_MAX: NibbleField = NibbleField::new("temp_outdoor_max", 157, 5);
const TEMP_OUTDOOR_MAX_TS: NibbleField = NibbleField::new("temp_outdoor_max_ts", 162, 10);
const HUMIDITY_INDOOR_MIN: NibbleField = NibbleField::new("humidity_indoor_min", 172, 3);
const HUMIDITY_INDOOR_MIN_TS: NibbleField = NibbleField::new("humidity_indoor_min_ts", 175, 10);
const HUMIDITY_INDOOR_MAX: NibbleField = NibbleField::new("humidity_indoor_max", 185, 3);
const HUMIDITY_INDOOR_MAX_TS: NibbleField = NibbleField::new("humidity_indoor_max_ts", 188, 10);
const HUMIDITY_OUTDOOR_MIN: NibbleField = NibbleField::new("humidity_outdoor_min", 198, 3);
const HUMIDITY_OUTDOOR_MIN_TS: NibbleField = NibbleField::new("humidity_outdoor_min_ts", 201, 10);
const HUMIDITY_OUTDOOR_MAX: NibbleField = NibbleField::new("humidity_outdoor_max", 211, 3);
const HUMIDITY_OUTDOOR_MAX_TS: NibbleField = NibbleField::new("humidity_outdoor_max_ts", 214, 10);
const PRESSURE_MIN: NibbleField = NibbleField::new("pressure_min", 224, 5);
const PRESSURE_MIN_TS: NibbleField = NibbleField::new("pressure_min_ts", 229, 10);
const PRESSURE_MAX: NibbleField = NibbleField::new("pressure_max", 239, 5);
const PRESSURE_MAX_TS: NibbleField = NibbleField::new("pressure_max_ts", 244, 10);

pub const CURRENT_PAYLOAD_LEN: usize = 129;
const CHECKSUM_OFFSET: usize = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Humidity {
    Percent(u8),
    Underflow,
    Overflow,
}

fn decode_humidity(buf: &[u8], field: &NibbleField) -> Result<Humidity, CodecError> {
    let raw = decode_bcd(buf, field)?.unwrap_or(110);
    Ok(match raw {
        10 => Humidity::Underflow,
        1..=99 => Humidity::Percent(raw as u8),
        _ => Humidity::Overflow,
    })
}

fn encode_humidity(buf: &mut [u8], field: &NibbleField, h: Humidity) {
    let raw = match h {
        Humidity::Percent(v) => v as u32,
        Humidity::Underflow => 10,
        Humidity::Overflow => 110,
    };
    encode_bcd(buf, field, Some(raw));
}

/* Tenths of a degree Celsius, matching the `Config` threshold unit. */
fn decode_temp(buf: &[u8], field: &NibbleField) -> Result<Option<i32>, CodecError> {
    Ok(decode_bcd(buf, field)?.map(|raw| raw as i32 - 400))
}

fn encode_temp(buf: &mut [u8], field: &NibbleField, tenths: Option<i32>) {
    encode_bcd(buf, field, tenths.map(|t| (t + 400).clamp(0, 99_999) as u32));
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMax<T: Copy + PartialEq> {
    pub value: T,
    pub at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatteryFlags {
    pub console: bool,
    pub thp: bool,
    pub rain: bool,
    pub wind: bool,
    pub sun: bool,
}

impl BatteryFlags {
    fn from_raw(v: u32) -> Self {
        Self {
            console: v & 0x01 != 0,
            thp: v & 0x02 != 0,
            rain: v & 0x04 != 0,
            wind: v & 0x08 != 0,
            sun: v & 0x10 != 0,
        }
    }
    fn to_raw(self) -> u32 {
        (self.console as u32)
            | (self.thp as u32) << 1
            | (self.rain as u32) << 2
            | (self.wind as u32) << 3
            | (self.sun as u32) << 4
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub battery: BatteryFlags,
    pub signal_quality_pct: u8,
    pub weather_state: u8,
    pub weather_tendency: u8,
    pub alarm_ringing_mask: u16,

    pub wind_direction: Direction,
    pub wind_direction_history: [Direction; 5],
    pub gust_direction: Direction,
    pub gust_direction_history: [Direction; 5],

    pub temp_indoor_tenths_c: Option<i32>,
    pub temp_outdoor_tenths_c: Option<i32>,
    pub dewpoint_tenths_c: Option<i32>,
    pub windchill_tenths_c: Option<i32>,
    pub humidity_indoor: Humidity,
    pub humidity_outdoor: Humidity,

    pub wind_speed_cms: Option<u32>,
    pub gust_speed_cms: Option<u32>,

    pub rain_counter_total_mm_tenths: u32,
    pub rain_24h_mm_tenths: u32,
    pub rain_week_mm_tenths: Tentative<u32>,
    pub rain_month_mm_tenths: Tentative<u32>,

    pub pressure_rel_hpa_tenths: u32,
    pub pressure_rel_inhg_hundredths: u32,
    pub last_rain_reset: NaiveDateTime,

    pub temp_indoor_min: MinMax<Option<i32>>,
    pub temp_indoor_max: MinMax<Option<i32>>,
    pub temp_outdoor_min: MinMax<Option<i32>>,
    pub temp_outdoor_max: MinMax<Option<i32>>,
    pub humidity_indoor_min: MinMax<u32>,
    pub humidity_indoor_max: MinMax<u32>,
    pub humidity_outdoor_min: MinMax<u32>,
    pub humidity_outdoor_max: MinMax<u32>,
    pub pressure_rel_hpa_min: MinMax<u32>,
    pub pressure_rel_hpa_max: MinMax<u32>,
}

/* A single nibble has exactly as many values (16) as `Direction` has
 * variants, so every nibble decodes to a valid direction; there is no
 * spare bit pattern left over for a "no reading" sentinel at this
 * width. */
fn decode_directions(buf: &[u8], field: &NibbleField) -> [Direction; 5] {
    let mut out = [Direction::N; 5];
    for (i, slot) in out.iter_mut().enumerate() {
        let nib = super::get_nibble(buf, field.start_nibble + i);
        *slot = Direction::from_nibble(nib).expect("nibble is always in 0..16");
    }
    out
}

fn encode_directions(buf: &mut [u8], field: &NibbleField, dirs: &[Direction; 5]) {
    for (i, d) in dirs.iter().enumerate() {
        super::set_nibble(buf, field.start_nibble + i, d.to_nibble());
    }
}

impl Observation {
    pub fn decode(payload: &[u8]) -> Result<Self, CodecError> {
        if payload.len() < CURRENT_PAYLOAD_LEN {
            return Err(CodecError::TooShort {
                expected: CURRENT_PAYLOAD_LEN,
                actual: payload.len(),
            });
        }

        let computed = super::running_checksum(payload, CHECKSUM_OFFSET);
        let received =
            u16::from_be_bytes([payload[CHECKSUM_OFFSET], payload[CHECKSUM_OFFSET + 1]]);
        if computed != received {
            return Err(CodecError::ChecksumMismatch { computed, received });
        }

        let min_max_i32 = |value_f: &NibbleField, ts_f: &NibbleField| -> Result<MinMax<Option<i32>>, CodecError> {
            Ok(MinMax {
                value: decode_temp(payload, value_f)?,
                at: decode_timestamp(payload, ts_f)?,
            })
        };
        let min_max_u32 = |value_f: &NibbleField, ts_f: &NibbleField| -> Result<MinMax<u32>, CodecError> {
            Ok(MinMax {
                value: decode_bcd(payload, value_f)?.unwrap_or(0),
                at: decode_timestamp(payload, ts_f)?,
            })
        };

        Ok(Observation {
            battery: BatteryFlags::from_raw(read_raw(payload, &BATTERY_FLAGS)),
            signal_quality_pct: (read_raw(payload, &SIGNAL_QUALITY_STEPS) * 5) as u8,
            weather_state: read_raw(payload, &WEATHER_STATE) as u8,
            weather_tendency: read_raw(payload, &WEATHER_TENDENCY) as u8,
            alarm_ringing_mask: read_raw(payload, &ALARM_RINGING_FLAGS) as u16,
            wind_direction: Direction::from_nibble(read_raw(payload, &WIND_DIRECTION) as u8)
                .expect("nibble is always in 0..16"),
            wind_direction_history: decode_directions(payload, &WIND_DIRECTION_HISTORY),
            gust_direction: Direction::from_nibble(read_raw(payload, &GUST_DIRECTION) as u8)
                .expect("nibble is always in 0..16"),
            gust_direction_history: decode_directions(payload, &GUST_DIRECTION_HISTORY),
            temp_indoor_tenths_c: decode_temp(payload, &TEMP_INDOOR)?,
            temp_outdoor_tenths_c: decode_temp(payload, &TEMP_OUTDOOR)?,
            dewpoint_tenths_c: decode_temp(payload, &DEWPOINT)?,
            windchill_tenths_c: decode_temp(payload, &WINDCHILL)?,
            humidity_indoor: decode_humidity(payload, &HUMIDITY_INDOOR)?,
            humidity_outdoor: decode_humidity(payload, &HUMIDITY_OUTDOOR)?,
            wind_speed_cms: decode_bcd(payload, &WIND_SPEED)?,
            gust_speed_cms: decode_bcd(payload, &GUST_SPEED)?,
            rain_counter_total_mm_tenths: decode_bcd(payload, &RAIN_COUNTER_TOTAL)?.unwrap_or(0),
            rain_24h_mm_tenths: decode_bcd(payload, &RAIN_24H)?.unwrap_or(0),
            rain_week_mm_tenths: Tentative {
                value: decode_bcd(payload, &RAIN_WEEK)?.unwrap_or(0),
                tentative: true,
            },
            rain_month_mm_tenths: Tentative {
                value: decode_bcd(payload, &RAIN_MONTH)?.unwrap_or(0),
                tentative: true,
            },
            pressure_rel_hpa_tenths: decode_bcd(payload, &PRESSURE_REL_HPA)?.unwrap_or(0),
            pressure_rel_inhg_hundredths: decode_bcd(payload, &PRESSURE_REL_INHG)?.unwrap_or(0),
            last_rain_reset: decode_timestamp(payload, &LAST_RAIN_RESET_TS)?,
            temp_indoor_min: min_max_i32(&TEMP_INDOOR_MIN, &TEMP_INDOOR_MIN_TS)?,
            temp_indoor_max: min_max_i32(&TEMP_INDOOR_MAX, &TEMP_INDOOR_MAX_TS)?,
            temp_outdoor_min: min_max_i32(&TEMP_OUTDOOR_MIN, &TEMP_OUTDOOR_MIN_TS)?,
            temp_outdoor_max: min_max_i32(&TEMP_OUTDOOR_MAX, &TEMP_OUTDOOR_MAX_TS)?,
            humidity_indoor_min: min_max_u32(&HUMIDITY_INDOOR_MIN, &HUMIDITY_INDOOR_MIN_TS)?,
            humidity_indoor_max: min_max_u32(&HUMIDITY_INDOOR_MAX, &HUMIDITY_INDOOR_MAX_TS)?,
            humidity_outdoor_min: min_max_u32(&HUMIDITY_OUTDOOR_MIN, &HUMIDITY_OUTDOOR_MIN_TS)?,
            humidity_outdoor_max: min_max_u32(&HUMIDITY_OUTDOOR_MAX, &HUMIDITY_OUTDOOR_MAX_TS)?,
            pressure_rel_hpa_min: min_max_u32(&PRESSURE_MIN, &PRESSURE_MIN_TS)?,
            pressure_rel_hpa_max: min_max_u32(&PRESSURE_MAX, &PRESSURE_MAX_TS)?,
        })
    }

    pub fn encode(&self) -> [u8; CURRENT_PAYLOAD_LEN] {
        let mut buf = [0u8; CURRENT_PAYLOAD_LEN];

        write_raw(&mut buf, &BATTERY_FLAGS, self.battery.to_raw());
        write_raw(&mut buf, &SIGNAL_QUALITY_STEPS, (self.signal_quality_pct / 5) as u32);
        write_raw(&mut buf, &WEATHER_STATE, self.weather_state as u32);
        write_raw(&mut buf, &WEATHER_TENDENCY, self.weather_tendency as u32);
        write_raw(&mut buf, &ALARM_RINGING_FLAGS, self.alarm_ringing_mask as u32);
        write_raw(&mut buf, &WIND_DIRECTION, self.wind_direction.to_nibble() as u32);
        encode_directions(&mut buf, &WIND_DIRECTION_HISTORY, &self.wind_direction_history);
        write_raw(&mut buf, &GUST_DIRECTION, self.gust_direction.to_nibble() as u32);
        encode_directions(&mut buf, &GUST_DIRECTION_HISTORY, &self.gust_direction_history);
        encode_temp(&mut buf, &TEMP_INDOOR, self.temp_indoor_tenths_c);
        encode_temp(&mut buf, &TEMP_OUTDOOR, self.temp_outdoor_tenths_c);
        encode_temp(&mut buf, &DEWPOINT, self.dewpoint_tenths_c);
        encode_temp(&mut buf, &WINDCHILL, self.windchill_tenths_c);
        encode_humidity(&mut buf, &HUMIDITY_INDOOR, self.humidity_indoor);
        encode_humidity(&mut buf, &HUMIDITY_OUTDOOR, self.humidity_outdoor);
        encode_bcd(&mut buf, &WIND_SPEED, self.wind_speed_cms);
        encode_bcd(&mut buf, &GUST_SPEED, self.gust_speed_cms);
        encode_bcd(&mut buf, &RAIN_COUNTER_TOTAL, Some(self.rain_counter_total_mm_tenths));
        encode_bcd(&mut buf, &RAIN_24H, Some(self.rain_24h_mm_tenths));
        encode_bcd(&mut buf, &RAIN_WEEK, Some(self.rain_week_mm_tenths.value));
        encode_bcd(&mut buf, &RAIN_MONTH, Some(self.rain_month_mm_tenths.value));
        encode_bcd(&mut buf, &PRESSURE_REL_HPA, Some(self.pressure_rel_hpa_tenths));
        encode_bcd(&mut buf, &PRESSURE_REL_INHG, Some(self.pressure_rel_inhg_hundredths));
        encode_timestamp(&mut buf, &LAST_RAIN_RESET_TS, self.last_rain_reset);

        encode_temp(&mut buf, &TEMP_INDOOR_MIN, self.temp_indoor_min.value);
        encode_timestamp(&mut buf, &TEMP_INDOOR_MIN_TS, self.temp_indoor_min.at);
        encode_temp(&mut buf, &TEMP_INDOOR_MAX, self.temp_indoor_max.value);
        encode_timestamp(&mut buf, &TEMP_INDOOR_MAX_TS, self.temp_indoor_max.at);
        encode_temp(&mut buf, &TEMP_OUTDOOR_MIN, self.temp_outdoor_min.value);
        encode_timestamp(&mut buf, &TEMP_OUTDOOR_MIN_TS, self.temp_outdoor_min.at);
        encode_temp(&mut buf, &TEMP_OUTDOOR_MAX, self.temp_outdoor_max.value);
        encode_timestamp(&mut buf, &TEMP_OUTDOOR_MAX_TS, self.temp_outdoor_max.at);
        encode_bcd(&mut buf, &HUMIDITY_INDOOR_MIN, Some(self.humidity_indoor_min.value));
        encode_timestamp(&mut buf, &HUMIDITY_INDOOR_MIN_TS, self.humidity_indoor_min.at);
        encode_bcd(&mut buf, &HUMIDITY_INDOOR_MAX, Some(self.humidity_indoor_max.value));
        encode_timestamp(&mut buf, &HUMIDITY_INDOOR_MAX_TS, self.humidity_indoor_max.at);
        encode_bcd(&mut buf, &HUMIDITY_OUTDOOR_MIN, Some(self.humidity_outdoor_min.value));
        encode_timestamp(&mut buf, &HUMIDITY_OUTDOOR_MIN_TS, self.humidity_outdoor_min.at);
        encode_bcd(&mut buf, &HUMIDITY_OUTDOOR_MAX, Some(self.humidity_outdoor_max.value));
        encode_timestamp(&mut buf, &HUMIDITY_OUTDOOR_MAX_TS, self.humidity_outdoor_max.at);
        encode_bcd(&mut buf, &PRESSURE_MIN, Some(self.pressure_rel_hpa_min.value));
        encode_timestamp(&mut buf, &PRESSURE_MIN_TS, self.pressure_rel_hpa_min.at);
        encode_bcd(&mut buf, &PRESSURE_MAX, Some(self.pressure_rel_hpa_max.value));
        encode_timestamp(&mut buf, &PRESSURE_MAX_TS, self.pressure_rel_hpa_max.at);

        let checksum = super::running_checksum(&buf, CHECKSUM_OFFSET);
        buf[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2].copy_from_slice(&checksum.to_be_bytes());
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2013, 6, 24)
            .unwrap()
            .and_hms_opt(9, 10, 0)
            .unwrap()
    }

    fn sample() -> Observation {
        Observation {
            battery: BatteryFlags::default(),
            signal_quality_pct: 75,
            weather_state: 1,
            weather_tendency: 2,
            alarm_ringing_mask: 0x0000,
            wind_direction: Direction::S,
            wind_direction_history: [Direction::S; 5],
            gust_direction: Direction::S,
            gust_direction_history: [Direction::S; 5],
            temp_indoor_tenths_c: Some(235),
            temp_outdoor_tenths_c: Some(137),
            dewpoint_tenths_c: Some(80),
            windchill_tenths_c: Some(-15),
            humidity_indoor: Humidity::Percent(59),
            humidity_outdoor: Humidity::Percent(86),
            wind_speed_cms: Some(100),
            gust_speed_cms: Some(120),
            rain_counter_total_mm_tenths: 123_45,
            rain_24h_mm_tenths: 51,
            rain_week_mm_tenths: Tentative { value: 200, tentative: true },
            rain_month_mm_tenths: Tentative { value: 900, tentative: true },
            pressure_rel_hpa_tenths: 10192,
            pressure_rel_inhg_hundredths: 30090,
            last_rain_reset: epoch(),
            temp_indoor_min: MinMax { value: Some(180), at: epoch() },
            temp_indoor_max: MinMax { value: Some(260), at: epoch() },
            temp_outdoor_min: MinMax { value: Some(50), at: epoch() },
            temp_outdoor_max: MinMax { value: Some(300), at: epoch() },
            humidity_indoor_min: MinMax { value: 40, at: epoch() },
            humidity_indoor_max: MinMax { value: 70, at: epoch() },
            humidity_outdoor_min: MinMax { value: 30, at: epoch() },
            humidity_outdoor_max: MinMax { value: 95, at: epoch() },
            pressure_rel_hpa_min: MinMax { value: 9950, at: epoch() },
            pressure_rel_hpa_max: MinMax { value: 10300, at: epoch() },
        }
    }

    #[test]
    fn round_trip() {
        let obs = sample();
        let encoded = obs.encode();
        let decoded = Observation::decode(&encoded).unwrap();
        assert_eq!(decoded, obs);
    }

    #[test]
    fn decode_matches_spec_example_values() {
        /* Grounded in spec §8 scenario 1's stated target values (the
         * full 213-byte sample itself is not reproducible — see
         * DESIGN.md); this constructs a buffer encoding those same
         * values and checks they survive the round trip. */
        let mut obs = sample();
        obs.temp_indoor_tenths_c = Some(235); // 23.5C
        obs.temp_outdoor_tenths_c = Some(137); // 13.7C
        obs.humidity_indoor = Humidity::Percent(59);
        obs.rain_24h_mm_tenths = 51; // 0.51mm... modeled in tenths of a raw unit
        obs.pressure_rel_hpa_tenths = 10192; // 1019.2 hPa
        obs.wind_direction = Direction::Wsw;
        obs.alarm_ringing_mask = 0x0000;

        let encoded = obs.encode();
        let decoded = Observation::decode(&encoded).unwrap();
        assert_eq!(decoded.temp_indoor_tenths_c, Some(235));
        assert_eq!(decoded.temp_outdoor_tenths_c, Some(137));
        assert_eq!(decoded.humidity_indoor, Humidity::Percent(59));
        assert_eq!(decoded.pressure_rel_hpa_tenths, 10192);
        assert_eq!(decoded.wind_direction, Direction::Wsw);
        assert_eq!(decoded.alarm_ringing_mask, 0x0000);
    }

    #[test]
    fn checksum_mismatch_is_rejected() {
        let obs = sample();
        let mut encoded = obs.encode();
        encoded[0] ^= 0xff;
        assert!(matches!(
            Observation::decode(&encoded),
            Err(CodecError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn all_f_sentinel_decodes_to_none() {
        let mut obs = sample();
        obs.temp_outdoor_tenths_c = None;
        obs.wind_speed_cms = None;
        let encoded = obs.encode();
        let decoded = Observation::decode(&encoded).unwrap();
        assert_eq!(decoded.temp_outdoor_tenths_c, None);
        assert_eq!(decoded.wind_speed_cms, None);
    }

    #[test]
    fn humidity_sentinels_round_trip() {
        let mut obs = sample();
        obs.humidity_indoor = Humidity::Underflow;
        obs.humidity_outdoor = Humidity::Overflow;
        let encoded = obs.encode();
        let decoded = Observation::decode(&encoded).unwrap();
        assert_eq!(decoded.humidity_indoor, Humidity::Underflow);
        assert_eq!(decoded.humidity_outdoor, Humidity::Overflow);
    }
}
