//! # pwrmgr
//!
//! Voltage regulator configuration and PMBus fault monitoring for a
//! board-management controller.
//!
//! ## Features
//!
//! - **Regulator configuration**: a System → Chassis → Device → Rail
//!   hierarchy configured by small action programs loaded from JSON
//! - **Fault detection**: power supply and sequencer monitors with power-on
//!   debounce, PGOOD deglitch and latched, once-per-assertion fault records
//! - **Coordination**: a single-threaded manager that routes presence and
//!   power events and polls every monitor on a fixed interval
//! - **Simulation**: an in-memory register file standing in for the bus
//!
//! ## Quick Start
//!
//! ```rust
//! use pwrmgr::config::Document;
//! use pwrmgr::fault::TracingSink;
//! use pwrmgr::manager::Manager;
//! use pwrmgr::pmbus::RegisterAccess;
//! use pwrmgr::sim::SimulatedBus;
//!
//! let document = Document::from_json(r#"{
//!     "chassis": [{ "number": 1, "devices": [{
//!         "id": "vdd_reg",
//!         "rails": [{ "id": "vdd", "configuration": {
//!             "volts": 1.0, "actions": [{ "write_volts": {} }]
//!         }}]
//!     }]}],
//!     "power_supplies": [{ "id": "psu0", "inventory_path": "/system/chassis/psu0" }]
//! }"#).unwrap();
//!
//! let bus = SimulatedBus::new();
//! let factory = |id: &str, _bus: u8, _address: u16| -> Box<dyn RegisterAccess> { Box::new(bus.device(id)) };
//! let system = document.build_system(factory).unwrap();
//! system.configure().unwrap();
//! assert_eq!(bus.writes().len(), 1);
//!
//! let mut manager = Manager::new(document.manager.clone(), TracingSink::new());
//! for monitor in document.build_monitors(factory).unwrap() {
//!     manager.add_monitor(monitor);
//! }
//! manager.analyze();
//! ```
//!
//! ## Architecture
//!
//! - [`pmbus`] - command names, STATUS_WORD decoding, register transport
//! - [`model`] - the configured hierarchy and its id registry
//! - [`action`] - the configuration action language
//! - [`fault`] - fault records and the outbound event sink
//! - [`monitor`] - power supply and sequencer fault monitors
//! - [`manager`] - event routing and the polling loop
//! - [`config`] - JSON configuration documents
//! - [`sim`] - simulated register file

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod action;
pub mod config;
pub mod error;
pub mod fault;
pub mod manager;
pub mod model;
pub mod monitor;
pub mod pmbus;
pub mod sim;

// Re-export main public types for convenience
pub use action::{Action, ActionEnvironment};
pub use config::{Document, ManagerConfig};
pub use error::{ActionError, ConfigurationError, Error, MonitorError, TransportError};
pub use fault::{EventSink, FaultClass, FaultRecord, TracingSink};
pub use manager::{BusEvent, Manager};
pub use model::{Chassis, Device, Rail, System};
pub use monitor::{FaultMonitor, PowerSupply, SequencerMonitor};
pub use sim::SimulatedBus;
