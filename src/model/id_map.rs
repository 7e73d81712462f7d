use crate::error::ConfigurationError;
use std::collections::HashMap;

/// Position of a device inside its [`crate::model::System`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle {
    pub chassis: usize,
    pub device: usize,
}

impl DeviceHandle {
    pub fn rail(self, rail: usize) -> RailHandle {
        RailHandle {
            chassis: self.chassis,
            device: self.device,
            rail,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RailHandle {
    pub chassis: usize,
    pub device: usize,
    pub rail: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Device(DeviceHandle),
    Rail(RailHandle),
    Rule(usize),
}

/// Id registry for one system. All ids share a single namespace.
#[derive(Debug, Default)]
pub struct IdMap {
    entries: HashMap<String, Entry>,
}

impl IdMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, id: &str, entry: Entry) -> Result<(), ConfigurationError> {
        if self.entries.contains_key(id) {
            return Err(ConfigurationError::DuplicateId(id.to_string()));
        }
        self.entries.insert(id.to_string(), entry);
        Ok(())
    }

    pub fn add_device(&mut self, id: &str, handle: DeviceHandle) -> Result<(), ConfigurationError> {
        self.insert(id, Entry::Device(handle))
    }

    pub fn add_rail(&mut self, id: &str, handle: RailHandle) -> Result<(), ConfigurationError> {
        self.insert(id, Entry::Rail(handle))
    }

    pub fn add_rule(&mut self, id: &str, index: usize) -> Result<(), ConfigurationError> {
        self.insert(id, Entry::Rule(index))
    }

    pub fn device(&self, id: &str) -> Result<DeviceHandle, ConfigurationError> {
        match self.entries.get(id) {
            Some(Entry::Device(handle)) => Ok(*handle),
            _ => Err(ConfigurationError::unresolved("device", id)),
        }
    }

    pub fn rail(&self, id: &str) -> Result<RailHandle, ConfigurationError> {
        match self.entries.get(id) {
            Some(Entry::Rail(handle)) => Ok(*handle),
            _ => Err(ConfigurationError::unresolved("rail", id)),
        }
    }

    pub fn rule(&self, id: &str) -> Result<usize, ConfigurationError> {
        match self.entries.get(id) {
            Some(Entry::Rule(index)) => Ok(*index),
            _ => Err(ConfigurationError::unresolved("rule", id)),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
