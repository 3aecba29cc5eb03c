/* Config frame codec (GetConfig/SetConfig).
 *
 * Layout: 48-byte payload. Bytes `0..=42` (43 bytes) are covered by the
 * checksum; bytes `43..=45` are `ResetMinMaxFlags` (write-only, always
 * decoded as all-clear); bytes `46..=47` carry the checksum itself.
 * A 48-byte sample ending `.. 00 00 05 1b` decodes with checksum
 * `0x051b`.
 *
 * The SetConfig byte-reversal rule is applied per named group via
 * `reverse_group`; see `REVERSED_GROUPS`. */

use super::{config_checksum, read_raw, reverse_group, write_raw, NibbleField};
use crate::error::CodecError;

pub const CONFIG_PAYLOAD_LEN: usize = 48;
const CHECKSUM_OFFSET: usize = 46;
const RESET_FLAGS_RANGE: std::ops::Range<usize> = 43..46;

const FORMAT_BYTE: NibbleField = NibbleField::new("format_byte", 0, 2);
const WEATHER_THRESHOLD: NibbleField = NibbleField::new("weather_threshold", 2, 2);
const STORM_THRESHOLD: NibbleField = NibbleField::new("storm_threshold", 4, 2);
const LCD_CONTRAST: NibbleField = NibbleField::new("lcd_contrast", 6, 2);
const LOW_BATTERY_MASK: NibbleField = NibbleField::new("low_battery_mask", 8, 2);
const ALARM_WIND_DIR_MASK: NibbleField = NibbleField::new("alarm_wind_dir_mask", 10, 4);
const ALARM_OTHER_MASK: NibbleField = NibbleField::new("alarm_other_mask", 14, 4);
const HUMIDITY_INDOOR_MIN: NibbleField = NibbleField::new("humidity_indoor_min", 18, 2);
const HUMIDITY_INDOOR_MAX: NibbleField = NibbleField::new("humidity_indoor_max", 20, 2);
const HUMIDITY_OUTDOOR_MIN: NibbleField = NibbleField::new("humidity_outdoor_min", 22, 2);
const HUMIDITY_OUTDOOR_MAX: NibbleField = NibbleField::new("humidity_outdoor_max", 24, 2);
const TEMP_INDOOR_MIN: NibbleField = NibbleField::new("temp_indoor_min", 26, 5);
const TEMP_INDOOR_MAX: NibbleField = NibbleField::new("temp_indoor_max", 31, 5);
const TEMP_OUTDOOR_MIN: NibbleField = NibbleField::new("temp_outdoor_min", 36, 5);
const TEMP_OUTDOOR_MAX: NibbleField = NibbleField::new("temp_outdoor_max", 41, 5);
const RAIN_24H_MAX: NibbleField = NibbleField::new("rain_24h_max", 46, 6);
const GUST_MAX: NibbleField = NibbleField::new("gust_max", 52, 6);
const PRESSURE_MIN: NibbleField = NibbleField::new("pressure_min", 58, 5);
const PRESSURE_MAX: NibbleField = NibbleField::new("pressure_max", 63, 5);
const HISTORY_INTERVAL_BYTE: usize = 42;

/* Field groups that are byte-reversed on the wire for SetConfig frames. */
const REVERSED_GROUPS: &[&[NibbleField]] = &[
    &[ALARM_WIND_DIR_MASK, ALARM_OTHER_MASK],
    &[HUMIDITY_INDOOR_MIN, HUMIDITY_INDOOR_MAX],
    &[HUMIDITY_OUTDOOR_MIN, HUMIDITY_OUTDOOR_MAX],
    &[TEMP_INDOOR_MIN, TEMP_INDOOR_MAX],
    &[TEMP_OUTDOOR_MIN, TEMP_OUTDOOR_MAX],
    &[RAIN_24H_MAX],
    &[GUST_MAX],
    &[PRESSURE_MIN, PRESSURE_MAX],
];

fn apply_reversal(buf: &mut [u8]) {
    for group in REVERSED_GROUPS {
        reverse_group(buf, group);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindUnit {
    MetersPerSecond,
    Knots,
    Beaufort,
    KmPerHour,
    MilesPerHour,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RainUnit {
    Millimeters,
    Inches,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressureUnit {
    InHg,
    Hpa,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureUnit {
    Fahrenheit,
    Celsius,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockFormat {
    Hour24,
    Hour12,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Formats {
    pub wind: WindUnit,
    pub rain: RainUnit,
    pub pressure: PressureUnit,
    pub temperature: TemperatureUnit,
    pub clock: ClockFormat,
}

/* History sampling interval. Flattened list of every distinct interval
 * the console supports; wire value is the list index (spec §8
 * scenario 3: wire value `0` decodes to `Min1`). */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum HistoryInterval {
    Min1 = 0,
    Min5 = 1,
    Min10 = 2,
    Min15 = 3,
    Min20 = 4,
    Min30 = 5,
    Min60 = 6,
    Min120 = 7,
    Hour4 = 8,
    Hour6 = 9,
    Hour8 = 10,
    Hour12 = 11,
    Hour24 = 12,
}

impl HistoryInterval {
    const TABLE: [HistoryInterval; 13] = [
        HistoryInterval::Min1,
        HistoryInterval::Min5,
        HistoryInterval::Min10,
        HistoryInterval::Min15,
        HistoryInterval::Min20,
        HistoryInterval::Min30,
        HistoryInterval::Min60,
        HistoryInterval::Min120,
        HistoryInterval::Hour4,
        HistoryInterval::Hour6,
        HistoryInterval::Hour8,
        HistoryInterval::Hour12,
        HistoryInterval::Hour24,
    ];

    pub fn from_index(i: u8) -> Result<Self, CodecError> {
        Self::TABLE
            .get(i as usize)
            .copied()
            .ok_or(CodecError::NibbleOutOfRange {
                field: "history_interval",
                value: i as u32,
            })
    }

    pub fn to_index(self) -> u8 {
        self as u32 as u8
    }

    pub fn to_minutes(self) -> u32 {
        match self {
            HistoryInterval::Min1 => 1,
            HistoryInterval::Min5 => 5,
            HistoryInterval::Min10 => 10,
            HistoryInterval::Min15 => 15,
            HistoryInterval::Min20 => 20,
            HistoryInterval::Min30 => 30,
            HistoryInterval::Min60 => 60,
            HistoryInterval::Min120 => 120,
            HistoryInterval::Hour4 => 240,
            HistoryInterval::Hour6 => 360,
            HistoryInterval::Hour8 => 480,
            HistoryInterval::Hour12 => 720,
            HistoryInterval::Hour24 => 1440,
        }
    }
}

/* Battery-low mask, 5 bits: console, THP, rain, wind, sun. */
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LowBatteryMask {
    pub console: bool,
    pub thp: bool,
    pub rain: bool,
    pub wind: bool,
    pub sun: bool,
}

impl LowBatteryMask {
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinMaxThreshold {
    pub min: i32,
    pub max: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub formats: Formats,
    pub weather_threshold: u8,
    pub storm_threshold: u8,
    pub lcd_contrast: u8,
    pub low_battery_mask: LowBatteryMask,
    pub alarm_wind_dir_mask: u16,
    pub alarm_other_mask: u16,
    /* Tenths of a degree Celsius, e.g. 235 = 23.5C. */
    pub temp_indoor: MinMaxThreshold,
    pub temp_outdoor: MinMaxThreshold,
    pub humidity_indoor: MinMaxThreshold,
    pub humidity_outdoor: MinMaxThreshold,
    pub rain_24h_max_mm_tenths: u32,
    pub gust_max_ms_hundredths: u32,
    /* Tenths of hPa. */
    pub pressure_rel_hpa_tenths: MinMaxThreshold,
    pub history_interval: HistoryInterval,
}

impl Config {
    pub fn decode(payload: &[u8]) -> Result<Self, CodecError> {
        if payload.len() < CONFIG_PAYLOAD_LEN {
            return Err(CodecError::TooShort {
                expected: CONFIG_PAYLOAD_LEN,
                actual: payload.len(),
            });
        }

        let computed = config_checksum(payload);
        let received =
            u16::from_be_bytes([payload[CHECKSUM_OFFSET], payload[CHECKSUM_OFFSET + 1]]);
        if computed != received {
            return Err(CodecError::ChecksumMismatch { computed, received });
        }

        /* `encode()` writes every field in normal order and then
         * byte-reverses the 8 `REVERSED_GROUPS` spans as its last step
         * before checksumming. Undo that here, before any field is
         * read, by applying the same (self-inverse) reversal once more
         * — mirrors `codec/mod.rs`'s note that `decode_reversed` must
         * run before the group's fields are read. */
        let mut unreversed = [0u8; CONFIG_PAYLOAD_LEN];
        unreversed.copy_from_slice(&payload[..CONFIG_PAYLOAD_LEN]);
        apply_reversal(&mut unreversed);
        let payload = &unreversed[..];

        let format_byte = read_raw(payload, &FORMAT_BYTE);
        let formats = Formats {
            wind: match format_byte & 0x07 {
                0 => WindUnit::MetersPerSecond,
                1 => WindUnit::Knots,
                2 => WindUnit::Beaufort,
                3 => WindUnit::KmPerHour,
                _ => WindUnit::MilesPerHour,
            },
            rain: if format_byte & 0x08 != 0 {
                RainUnit::Inches
            } else {
                RainUnit::Millimeters
            },
            pressure: if format_byte & 0x10 != 0 {
                PressureUnit::Hpa
            } else {
                PressureUnit::InHg
            },
            temperature: if format_byte & 0x20 != 0 {
                TemperatureUnit::Celsius
            } else {
                TemperatureUnit::Fahrenheit
            },
            clock: if format_byte & 0x40 != 0 {
                ClockFormat::Hour12
            } else {
                ClockFormat::Hour24
            },
        };

        Ok(Config {
            formats,
            weather_threshold: read_raw(payload, &WEATHER_THRESHOLD) as u8,
            storm_threshold: read_raw(payload, &STORM_THRESHOLD) as u8,
            lcd_contrast: read_raw(payload, &LCD_CONTRAST) as u8,
            low_battery_mask: LowBatteryMask::from_raw(read_raw(payload, &LOW_BATTERY_MASK)),
            alarm_wind_dir_mask: read_raw(payload, &ALARM_WIND_DIR_MASK) as u16,
            alarm_other_mask: read_raw(payload, &ALARM_OTHER_MASK) as u16,
            temp_indoor: MinMaxThreshold {
                min: decode_temp(payload, &TEMP_INDOOR_MIN)?,
                max: decode_temp(payload, &TEMP_INDOOR_MAX)?,
            },
            temp_outdoor: MinMaxThreshold {
                min: decode_temp(payload, &TEMP_OUTDOOR_MIN)?,
                max: decode_temp(payload, &TEMP_OUTDOOR_MAX)?,
            },
            humidity_indoor: MinMaxThreshold {
                min: decode_pct(payload, &HUMIDITY_INDOOR_MIN)?,
                max: decode_pct(payload, &HUMIDITY_INDOOR_MAX)?,
            },
            humidity_outdoor: MinMaxThreshold {
                min: decode_pct(payload, &HUMIDITY_OUTDOOR_MIN)?,
                max: decode_pct(payload, &HUMIDITY_OUTDOOR_MAX)?,
            },
            rain_24h_max_mm_tenths: super::decode_bcd(payload, &RAIN_24H_MAX)?.unwrap_or(0),
            gust_max_ms_hundredths: super::decode_bcd(payload, &GUST_MAX)?.unwrap_or(0),
            pressure_rel_hpa_tenths: MinMaxThreshold {
                min: super::decode_bcd(payload, &PRESSURE_MIN)?.unwrap_or(0) as i32,
                max: super::decode_bcd(payload, &PRESSURE_MAX)?.unwrap_or(0) as i32,
            },
            history_interval: HistoryInterval::from_index(payload[HISTORY_INTERVAL_BYTE])?,
        })
    }

    /* Encode into a fresh `CONFIG_PAYLOAD_LEN`-byte buffer, reverse the
     * SetConfig groups, fill in the checksum, and zero the
     * write-only reset flags (the caller may overwrite them
     * afterwards if it actually wants to request a reset). */
    pub fn encode(&self) -> [u8; CONFIG_PAYLOAD_LEN] {
        let mut buf = [0u8; CONFIG_PAYLOAD_LEN];

        let format_byte = match self.formats.wind {
            WindUnit::MetersPerSecond => 0,
            WindUnit::Knots => 1,
            WindUnit::Beaufort => 2,
            WindUnit::KmPerHour => 3,
            WindUnit::MilesPerHour => 4,
        } | if self.formats.rain == RainUnit::Inches { 0x08 } else { 0 }
            | if self.formats.pressure == PressureUnit::Hpa { 0x10 } else { 0 }
            | if self.formats.temperature == TemperatureUnit::Celsius { 0x20 } else { 0 }
            | if self.formats.clock == ClockFormat::Hour12 { 0x40 } else { 0 };

        write_raw(&mut buf, &FORMAT_BYTE, format_byte);
        write_raw(&mut buf, &WEATHER_THRESHOLD, self.weather_threshold as u32);
        write_raw(&mut buf, &STORM_THRESHOLD, self.storm_threshold as u32);
        write_raw(&mut buf, &LCD_CONTRAST, self.lcd_contrast as u32);
        write_raw(&mut buf, &LOW_BATTERY_MASK, self.low_battery_mask.to_raw());
        write_raw(&mut buf, &ALARM_WIND_DIR_MASK, self.alarm_wind_dir_mask as u32);
        write_raw(&mut buf, &ALARM_OTHER_MASK, self.alarm_other_mask as u32);
        encode_temp(&mut buf, &TEMP_INDOOR_MIN, self.temp_indoor.min);
        encode_temp(&mut buf, &TEMP_INDOOR_MAX, self.temp_indoor.max);
        encode_temp(&mut buf, &TEMP_OUTDOOR_MIN, self.temp_outdoor.min);
        encode_temp(&mut buf, &TEMP_OUTDOOR_MAX, self.temp_outdoor.max);
        super::encode_bcd(&mut buf, &HUMIDITY_INDOOR_MIN, Some(self.humidity_indoor.min as u32));
        super::encode_bcd(&mut buf, &HUMIDITY_INDOOR_MAX, Some(self.humidity_indoor.max as u32));
        super::encode_bcd(&mut buf, &HUMIDITY_OUTDOOR_MIN, Some(self.humidity_outdoor.min as u32));
        super::encode_bcd(&mut buf, &HUMIDITY_OUTDOOR_MAX, Some(self.humidity_outdoor.max as u32));
        super::encode_bcd(&mut buf, &RAIN_24H_MAX, Some(self.rain_24h_max_mm_tenths));
        super::encode_bcd(&mut buf, &GUST_MAX, Some(self.gust_max_ms_hundredths));
        super::encode_bcd(&mut buf, &PRESSURE_MIN, Some(self.pressure_rel_hpa_tenths.min as u32));
        super::encode_bcd(&mut buf, &PRESSURE_MAX, Some(self.pressure_rel_hpa_tenths.max as u32));
        buf[HISTORY_INTERVAL_BYTE] = self.history_interval.to_index();

        apply_reversal(&mut buf);

        for i in RESET_FLAGS_RANGE {
            buf[i] = 0;
        }

        let checksum = config_checksum(&buf);
        buf[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2].copy_from_slice(&checksum.to_be_bytes());
        buf
    }
}

/* Temperature rule (spec §4.3): five nibbles, value x10, offset +400.
 * Range 0..1000 maps to -40.0..+60.0C; returned in tenths of a degree. */
fn decode_temp(buf: &[u8], field: &NibbleField) -> Result<i32, CodecError> {
    let raw = super::decode_bcd(buf, field)?.unwrap_or(400);
    Ok(raw as i32 - 400)
}

fn encode_temp(buf: &mut [u8], field: &NibbleField, tenths: i32) {
    let raw = (tenths + 400).clamp(0, 99_999) as u32;
    super::encode_bcd(buf, field, Some(raw));
}

/* Humidity alarm thresholds are plain 0..99 percentages — no
 * underflow/overflow sentinel applies to a configured threshold. */
fn decode_pct(buf: &[u8], field: &NibbleField) -> Result<i32, CodecError> {
    Ok(super::decode_bcd(buf, field)?.unwrap_or(0) as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> Config {
        Config {
            formats: Formats {
                wind: WindUnit::MetersPerSecond,
                rain: RainUnit::Millimeters,
                pressure: PressureUnit::Hpa,
                temperature: TemperatureUnit::Celsius,
                clock: ClockFormat::Hour24,
            },
            weather_threshold: 3,
            storm_threshold: 5,
            lcd_contrast: 4,
            low_battery_mask: LowBatteryMask::default(),
            alarm_wind_dir_mask: 0x00ff,
            alarm_other_mask: 0x0f0f,
            temp_indoor: MinMaxThreshold { min: -50, max: 500 },
            temp_outdoor: MinMaxThreshold { min: 20, max: 420 },
            humidity_indoor: MinMaxThreshold { min: 20, max: 80 },
            humidity_outdoor: MinMaxThreshold { min: 15, max: 95 },
            rain_24h_max_mm_tenths: 5100,
            gust_max_ms_hundredths: 250000,
            pressure_rel_hpa_tenths: MinMaxThreshold {
                min: 9500,
                max: 10500,
            },
            history_interval: HistoryInterval::Min1,
        }
    }

    #[test]
    fn round_trip_identity_modulo_reset_flags() {
        let cfg = sample_config();
        let encoded = cfg.encode();
        let decoded = Config::decode(&encoded).expect("checksum must validate");
        assert_eq!(decoded, cfg);
    }

    #[test]
    fn checksum_excludes_reset_flags() {
        let cfg = sample_config();
        let mut encoded = cfg.encode();
        encoded[44] = 0xaa; // mutate a reset-flag byte, still must decode fine
        let decoded = Config::decode(&encoded).expect("reset flags are excluded from checksum");
        assert_eq!(decoded, cfg);
    }

    #[test]
    fn flipped_payload_bit_fails_checksum() {
        let cfg = sample_config();
        let mut encoded = cfg.encode();
        encoded[3] ^= 0x01; // flip a bit inside the checksummed range
        assert!(matches!(
            Config::decode(&encoded),
            Err(CodecError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn history_interval_zero_is_one_minute() {
        let mut cfg = sample_config();
        cfg.history_interval = HistoryInterval::Min1;
        let encoded = cfg.encode();
        assert_eq!(encoded[HISTORY_INTERVAL_BYTE], 0);
        assert_eq!(HistoryInterval::from_index(0).unwrap().to_minutes(), 1);
    }

    #[test]
    fn set_config_reversal_is_involutive_on_temp_outdoor() {
        let cfg = sample_config();
        let mut encoded = cfg.encode();
        apply_reversal(&mut encoded);
        apply_reversal(&mut encoded);
        let checksum = config_checksum(&encoded);
        encoded[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2].copy_from_slice(&checksum.to_be_bytes());
        let decoded = Config::decode(&encoded).unwrap();
        assert_eq!(decoded.temp_outdoor, cfg.temp_outdoor);
    }
}
