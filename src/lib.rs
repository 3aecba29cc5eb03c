/* Host-side driver core for the LaCrosse WS-28xx USB weather station
 * transceiver (see `SPEC_FULL.md`). Talks to the dongle over USB,
 * drives the RF framing protocol, and exposes current observations,
 * a history cache, and the console's configuration to the host through
 * `facade::Driver`. Everything upstream of that — CLI, storage,
 * display unit conversion — lives outside this crate. */

pub mod codec;
pub mod config;
pub mod error;
pub mod facade;
pub mod protocol;
pub mod records;
pub mod service;
pub mod transceiver;
pub mod transport;

pub use config::DriverConfig;
pub use error::{CodecError, DriverError, TransportError};
pub use facade::Driver;
pub use service::Health;
pub use transceiver::{DeviceId, Region, TransceiverInfo, TransceiverState};
