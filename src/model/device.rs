use crate::action::ActionEnvironment;
use crate::error::{ConfigurationError, Error};
use crate::fault::EventSink;
use crate::model::id_map::IdMap;
use crate::model::{Chassis, Configuration, DeviceHandle, Rail, System};
use crate::pmbus::RegisterAccess;
use std::fmt;

/// A PMBus device, usually a voltage regulator, and the rails it produces.
pub struct Device {
    id: String,
    is_regulator: bool,
    bus: u8,
    address: u16,
    registers: Box<dyn RegisterAccess>,
    configuration: Option<Configuration>,
    rails: Vec<Rail>,
}

impl Device {
    pub fn new(id: impl Into<String>, registers: Box<dyn RegisterAccess>, mut rails: Vec<Rail>) -> Self {
        let id = id.into();
        for rail in &mut rails {
            rail.set_device_id(&id);
        }
        Self {
            id,
            is_regulator: true,
            bus: 0,
            address: 0,
            registers,
            configuration: None,
            rails,
        }
    }

    pub fn with_address(mut self, bus: u8, address: u16) -> Self {
        self.bus = bus;
        self.address = address;
        self
    }

    pub fn with_configuration(mut self, configuration: Configuration) -> Self {
        self.configuration = Some(configuration);
        self
    }

    pub fn with_regulator(mut self, is_regulator: bool) -> Self {
        self.is_regulator = is_regulator;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_regulator(&self) -> bool {
        self.is_regulator
    }

    pub fn bus(&self) -> u8 {
        self.bus
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn registers(&self) -> &dyn RegisterAccess {
        self.registers.as_ref()
    }

    pub fn configuration(&self) -> Option<&Configuration> {
        self.configuration.as_ref()
    }

    pub fn rails(&self) -> &[Rail] {
        &self.rails
    }

    pub fn add_to_id_map(&self, id_map: &mut IdMap, handle: DeviceHandle) -> Result<(), ConfigurationError> {
        id_map.add_device(&self.id, handle)?;
        for (index, rail) in self.rails.iter().enumerate() {
            rail.add_to_id_map(id_map, handle.rail(index))?;
        }
        Ok(())
    }

    /// Applies the device configuration, then each rail's in order.
    pub fn configure(&self, system: &System, chassis: &Chassis) -> Result<(), Error> {
        if let Some(configuration) = &self.configuration {
            let mut env = ActionEnvironment::new(system, chassis, self);
            configuration
                .execute(&mut env, &self.id)
                .map_err(|source| Error::Configure {
                    entity: self.id.clone(),
                    source,
                })?;
        }
        for rail in &self.rails {
            rail.configure(system, chassis, self).map_err(|source| Error::Configure {
                entity: rail.id().to_string(),
                source,
            })?;
        }
        Ok(())
    }

    /// Non-regulator devices are configured but never monitored.
    pub fn monitor_sensors(&self, system: &System, chassis: &Chassis, sink: &mut dyn EventSink) {
        if !self.is_regulator {
            return;
        }
        for rail in &self.rails {
            rail.monitor_sensors(system, chassis, self, sink);
        }
    }

    pub fn clear_error_history(&self) {
        for rail in &self.rails {
            rail.clear_error_history();
        }
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("is_regulator", &self.is_regulator)
            .field("bus", &self.bus)
            .field("address", &format_args!("{:#04x}", self.address))
            .field("configuration", &self.configuration)
            .field("rails", &self.rails)
            .finish()
    }
}
