//! Simulated PMBus register file.
//!
//! Backs the daemon when no hardware is attached and every test that needs
//! a device. Unset registers read as zero. Writes are logged in global
//! order across all devices, and reads or writes can be made to fail per
//! device or per register.

use crate::error::TransportError;
use crate::pmbus::{Encoding, RegisterAccess};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const INJECTED_FAILURE: &str = "injected failure";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRecord {
    pub device: String,
    pub command: String,
    pub encoding: Encoding,
    pub value: u16,
}

type RegisterKey = (String, String);

#[derive(Debug, Default)]
struct BusState {
    registers: HashMap<RegisterKey, u16>,
    read_only: HashSet<RegisterKey>,
    reads: HashMap<RegisterKey, usize>,
    writes: Vec<WriteRecord>,
    // (device, None) fails every register of the device
    failing_reads: HashSet<(String, Option<String>)>,
    failing_writes: HashSet<(String, Option<String>)>,
}

fn key(device: &str, command: &str) -> RegisterKey {
    (device.to_string(), command.to_string())
}

fn fails(set: &HashSet<(String, Option<String>)>, device: &str, command: &str) -> bool {
    set.contains(&(device.to_string(), None)) || set.contains(&(device.to_string(), Some(command.to_string())))
}

/// Shared register file. Clones refer to the same state.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBus {
    state: Arc<Mutex<BusState>>,
}

impl SimulatedBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register access handle for one device.
    pub fn device(&self, name: &str) -> SimulatedDevice {
        SimulatedDevice {
            bus: self.clone(),
            name: name.to_string(),
        }
    }

    pub fn set_register(&self, device: &str, command: &str, value: u16) {
        self.lock().registers.insert(key(device, command), value);
    }

    pub fn register(&self, device: &str, command: &str) -> Option<u16> {
        self.lock().registers.get(&key(device, command)).copied()
    }

    /// Writes to this register are logged but do not change its value.
    pub fn set_read_only(&self, device: &str, command: &str) {
        self.lock().read_only.insert(key(device, command));
    }

    pub fn read_count(&self, device: &str, command: &str) -> usize {
        self.lock().reads.get(&key(device, command)).copied().unwrap_or(0)
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        self.lock().writes.clone()
    }

    pub fn writes_to(&self, device: &str) -> Vec<WriteRecord> {
        self.lock()
            .writes
            .iter()
            .filter(|record| record.device == device)
            .cloned()
            .collect()
    }

    pub fn clear_writes(&self) {
        self.lock().writes.clear();
    }

    /// Makes reads fail, for one register or for the whole device.
    pub fn fail_reads(&self, device: &str, command: Option<&str>) {
        self.lock()
            .failing_reads
            .insert((device.to_string(), command.map(str::to_string)));
    }

    pub fn fail_writes(&self, device: &str, command: Option<&str>) {
        self.lock()
            .failing_writes
            .insert((device.to_string(), command.map(str::to_string)));
    }

    /// Removes every injected failure for `device`.
    pub fn restore(&self, device: &str) {
        let mut state = self.lock();
        state.failing_reads.retain(|(name, _)| name != device);
        state.failing_writes.retain(|(name, _)| name != device);
    }
}

/// [`RegisterAccess`] for one device on a [`SimulatedBus`].
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    bus: SimulatedBus,
    name: String,
}

impl SimulatedDevice {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl RegisterAccess for SimulatedDevice {
    fn read(&self, command: &str, _encoding: Encoding) -> Result<u16, TransportError> {
        let mut state = self.bus.lock();
        if fails(&state.failing_reads, &self.name, command) {
            return Err(TransportError::read(command, INJECTED_FAILURE));
        }
        let register = key(&self.name, command);
        let value = state.registers.get(&register).copied().unwrap_or(0);
        *state.reads.entry(register).or_insert(0) += 1;
        Ok(value)
    }

    fn write(&self, command: &str, encoding: Encoding, value: u16) -> Result<(), TransportError> {
        let mut state = self.bus.lock();
        if fails(&state.failing_writes, &self.name, command) {
            return Err(TransportError::write(command, INJECTED_FAILURE));
        }
        let register = key(&self.name, command);
        if !state.read_only.contains(&register) {
            state.registers.insert(register, value);
        }
        state.writes.push(WriteRecord {
            device: self.name.clone(),
            command: command.to_string(),
            encoding,
            value,
        });
        Ok(())
    }
}
