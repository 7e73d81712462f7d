//! Configured power hierarchy: system, chassis, devices and rails.
//!
//! Ownership is strictly top-down. Cross references between entities go
//! through [`IdMap`] handles, never through stored pointers.

mod chassis;
mod configuration;
mod device;
pub mod id_map;
mod rail;
mod sensor_monitoring;
mod system;

pub use chassis::Chassis;
pub use configuration::{Configuration, Rule};
pub use device::Device;
pub use id_map::{DeviceHandle, IdMap, RailHandle};
pub use rail::Rail;
pub use sensor_monitoring::SensorMonitoring;
pub use system::System;
