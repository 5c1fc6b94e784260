//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements   | Connects to                       |
//! |------------|--------------|-----------------------------------|
//! | `hardware` | SensorPort   | NTC probes, button GPIO           |
//! |            | ActuatorPort | pump relay, indicator LEDs        |
//! | `log_sink` | EventSink    | Serial log output                 |
//! | `nvs`      | ConfigPort   | NVS / in-memory store             |
//! |            | StoragePort  |                                   |
//! | `time`     | ClockPort    | ESP32 system timer + SNTP time    |

pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod time;
