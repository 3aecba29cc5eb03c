/* Host-facing driver configuration. Distinct from
 * `codec::config::Config`, which is the console's own settings image
 * exchanged over the wire — this is how the *driver itself* is told
 * to behave. Deserialized from whatever config file format the host
 * environment uses; this crate only owns the shape and defaults. */

use serde::Deserialize;

use crate::transceiver::Region;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct DriverConfig {
    #[serde(default = "default_region")]
    pub transceiver_frequency: Region,

    #[serde(default = "default_polling_interval")]
    pub polling_interval_secs: u64,

    #[serde(default = "default_comm_interval")]
    pub comm_interval_ms: [u64; 2],

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_pairing_timeout")]
    pub pairing_timeout_secs: u64,

    #[serde(default = "default_max_tries")]
    pub max_tries: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            transceiver_frequency: default_region(),
            polling_interval_secs: default_polling_interval(),
            comm_interval_ms: default_comm_interval(),
            model: default_model(),
            pairing_timeout_secs: default_pairing_timeout(),
            max_tries: default_max_tries(),
        }
    }
}

fn default_region() -> Region {
    Region::Us
}

fn default_polling_interval() -> u64 {
    30
}

fn default_comm_interval() -> [u64; 2] {
    [380, 200]
}

fn default_model() -> String {
    "LaCrosse WS28xx".to_string()
}

fn default_pairing_timeout() -> u64 {
    90
}

fn default_max_tries() -> u32 {
    3
}

/* `Region` lives in `transceiver`, not here, since the Controller is
 * what actually consumes it; `serde::Deserialize` is implemented here
 * instead of there to keep the wire-protocol module free of config
 * file concerns. */
impl<'de> Deserialize<'de> for Region {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.to_ascii_uppercase().as_str() {
            "US" => Ok(Region::Us),
            "EU" => Ok(Region::Eu),
            other => Err(serde::de::Error::custom(format!(
                "unknown transceiver_frequency region {other:?}, expected \"US\" or \"EU\""
            ))),
        }
    }
}
