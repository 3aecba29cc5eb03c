/* Emitted records (spec §6): the flat name->value shape the host's
 * weather-data service consumes, derived from the codec's `Observation`
 * and `HistoryRecord`. These are plain `#[derive(Serialize)]` structs —
 * a struct serializes to exactly the flat JSON object spec.md describes,
 * without resorting to a hand-rolled `HashMap<String, Value>`, the same
 * way the teacher's own JSON test fixtures are plain structs rather than
 * dynamic maps.
 *
 * Unit conversion happens here, at the façade boundary, not in the
 * codec (spec §9): the codec only ever works in the wire's native
 * units (tenths of a degree, hundredths of a m/s, ...); this module
 * converts to the plain float units a host-facing record should carry.
 */

use serde::Serialize;

use crate::codec::current::{Humidity, MinMax, Observation};
use crate::codec::history::HistoryRecord;
use crate::codec::Direction;

fn compass_name(d: Direction) -> &'static str {
    match d {
        Direction::N => "N",
        Direction::Nne => "NNE",
        Direction::Ne => "NE",
        Direction::Ene => "ENE",
        Direction::E => "E",
        Direction::Ese => "ESE",
        Direction::Se => "SE",
        Direction::Sse => "SSE",
        Direction::S => "S",
        Direction::Ssw => "SSW",
        Direction::Sw => "SW",
        Direction::Wsw => "WSW",
        Direction::W => "W",
        Direction::Wnw => "WNW",
        Direction::Nw => "NW",
        Direction::Nnw => "NNW",
    }
}

fn humidity_pct(h: Humidity) -> Option<u8> {
    match h {
        Humidity::Percent(v) => Some(v),
        Humidity::Underflow | Humidity::Overflow => None,
    }
}

/* A decoded temperature is carried in tenths of a degree Celsius on the
 * wire; emitted records use plain floating-point degrees. */
fn tenths_to_c(tenths: Option<i32>) -> Option<f64> {
    tenths.map(|t| t as f64 / 10.0)
}

fn hundredths_to_ms(hundredths: Option<u32>) -> Option<f64> {
    hundredths.map(|v| v as f64 / 100.0)
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MinMaxRecord<T: Serialize> {
    pub value: T,
    pub at: chrono::NaiveDateTime,
}

impl<T: Copy + PartialEq> MinMax<T> {
    fn map_record<U: Serialize>(self, f: impl FnOnce(T) -> U) -> MinMaxRecord<U> {
        MinMaxRecord {
            value: f(self.value),
            at: self.at,
        }
    }
}

/* Flat, host-facing observation record: one JSON object per current-
 * weather frame, stamped with the time the driver received it (the
 * console's Current Weather frame carries no "now" field of its own —
 * only min/max timestamps and the last-rain-reset time — so the
 * driver's own clock is the natural timestamp for "when was this
 * reading current", consistent with how `pywws`-family drivers stamp
 * readings at capture time rather than relying on station time). */
#[derive(Debug, Clone, Serialize)]
pub struct ObservationRecord {
    pub timestamp: chrono::NaiveDateTime,

    pub temp_indoor_c: Option<f64>,
    pub temp_outdoor_c: Option<f64>,
    pub dewpoint_c: Option<f64>,
    pub windchill_c: Option<f64>,
    pub humidity_indoor_pct: Option<u8>,
    pub humidity_outdoor_pct: Option<u8>,

    pub wind_speed_ms: Option<f64>,
    pub wind_direction: &'static str,
    pub gust_speed_ms: Option<f64>,
    pub gust_direction: &'static str,

    pub rain_counter_total_mm: f64,
    pub rain_24h_mm: f64,
    pub rain_week_mm: f64,
    pub rain_month_mm: f64,
    pub last_rain_reset: chrono::NaiveDateTime,

    pub pressure_rel_hpa: f64,
    pub pressure_rel_inhg: f64,

    pub battery_console_low: bool,
    pub battery_thp_low: bool,
    pub battery_rain_low: bool,
    pub battery_wind_low: bool,
    pub battery_sun_low: bool,

    pub signal_quality_pct: u8,
    pub weather_state: u8,
    pub weather_tendency: u8,
    pub alarm_ringing_mask: u16,

    pub temp_indoor_min: MinMaxRecord<Option<f64>>,
    pub temp_indoor_max: MinMaxRecord<Option<f64>>,
    pub temp_outdoor_min: MinMaxRecord<Option<f64>>,
    pub temp_outdoor_max: MinMaxRecord<Option<f64>>,
    pub humidity_indoor_min: MinMaxRecord<u32>,
    pub humidity_indoor_max: MinMaxRecord<u32>,
    pub humidity_outdoor_min: MinMaxRecord<u32>,
    pub humidity_outdoor_max: MinMaxRecord<u32>,
    pub pressure_rel_hpa_min: MinMaxRecord<u32>,
    pub pressure_rel_hpa_max: MinMaxRecord<u32>,
}

impl ObservationRecord {
    pub fn from_observation(timestamp: chrono::NaiveDateTime, obs: &Observation) -> Self {
        Self {
            timestamp,
            temp_indoor_c: tenths_to_c(obs.temp_indoor_tenths_c),
            temp_outdoor_c: tenths_to_c(obs.temp_outdoor_tenths_c),
            dewpoint_c: tenths_to_c(obs.dewpoint_tenths_c),
            windchill_c: tenths_to_c(obs.windchill_tenths_c),
            humidity_indoor_pct: humidity_pct(obs.humidity_indoor),
            humidity_outdoor_pct: humidity_pct(obs.humidity_outdoor),
            wind_speed_ms: hundredths_to_ms(obs.wind_speed_cms),
            wind_direction: compass_name(obs.wind_direction),
            gust_speed_ms: hundredths_to_ms(obs.gust_speed_cms),
            gust_direction: compass_name(obs.gust_direction),
            rain_counter_total_mm: obs.rain_counter_total_mm_tenths as f64 / 10.0,
            rain_24h_mm: obs.rain_24h_mm_tenths as f64 / 10.0,
            rain_week_mm: obs.rain_week_mm_tenths.value as f64 / 10.0,
            rain_month_mm: obs.rain_month_mm_tenths.value as f64 / 10.0,
            last_rain_reset: obs.last_rain_reset,
            pressure_rel_hpa: obs.pressure_rel_hpa_tenths as f64 / 10.0,
            pressure_rel_inhg: obs.pressure_rel_inhg_hundredths as f64 / 100.0,
            battery_console_low: obs.battery.console,
            battery_thp_low: obs.battery.thp,
            battery_rain_low: obs.battery.rain,
            battery_wind_low: obs.battery.wind,
            battery_sun_low: obs.battery.sun,
            signal_quality_pct: obs.signal_quality_pct,
            weather_state: obs.weather_state,
            weather_tendency: obs.weather_tendency,
            alarm_ringing_mask: obs.alarm_ringing_mask,
            temp_indoor_min: obs.temp_indoor_min.map_record(tenths_to_c),
            temp_indoor_max: obs.temp_indoor_max.map_record(tenths_to_c),
            temp_outdoor_min: obs.temp_outdoor_min.map_record(tenths_to_c),
            temp_outdoor_max: obs.temp_outdoor_max.map_record(tenths_to_c),
            humidity_indoor_min: obs.humidity_indoor_min.map_record(|v| v),
            humidity_indoor_max: obs.humidity_indoor_max.map_record(|v| v),
            humidity_outdoor_min: obs.humidity_outdoor_min.map_record(|v| v),
            humidity_outdoor_max: obs.humidity_outdoor_max.map_record(|v| v),
            pressure_rel_hpa_min: obs.pressure_rel_hpa_min.map_record(|v| v),
            pressure_rel_hpa_max: obs.pressure_rel_hpa_max.map_record(|v| v),
        }
    }
}

/* Flat, host-facing history record: same shape as `ObservationRecord`'s
 * subset of fields a history sample carries, plus the ring-buffer slot
 * it came from (spec §6: "same shape plus record index"). */
#[derive(Debug, Clone, Serialize)]
pub struct HistoryExportRecord {
    pub record_index: u16,
    pub timestamp: chrono::NaiveDateTime,
    pub temp_indoor_c: Option<f64>,
    pub temp_outdoor_c: Option<f64>,
    pub humidity_indoor_pct: u8,
    pub humidity_outdoor_pct: u8,
    pub pressure_rel_hpa: f64,
    pub rain_counter_raw_mm: f64,
    pub wind_speed_ms: Option<f64>,
    pub wind_direction: &'static str,
    pub gust_speed_ms: Option<f64>,
    pub gust_direction: &'static str,
}

impl HistoryExportRecord {
    pub fn from_record(record_index: u16, rec: &HistoryRecord) -> Self {
        Self {
            record_index,
            timestamp: rec.timestamp,
            temp_indoor_c: tenths_to_c(rec.temp_indoor_tenths_c),
            temp_outdoor_c: tenths_to_c(rec.temp_outdoor_tenths_c),
            humidity_indoor_pct: rec.humidity_indoor_pct,
            humidity_outdoor_pct: rec.humidity_outdoor_pct,
            pressure_rel_hpa: rec.pressure_rel_hpa_tenths as f64 / 10.0,
            rain_counter_raw_mm: rec.rain_counter_raw as f64 / 100.0,
            wind_speed_ms: hundredths_to_ms(rec.wind_speed_cms),
            wind_direction: compass_name(rec.wind_direction),
            gust_speed_ms: hundredths_to_ms(rec.gust_speed_cms),
            gust_direction: compass_name(rec.gust_direction),
        }
    }
}
