use crate::action::Action;
use crate::error::{ConfigurationError, Error};
use crate::fault::EventSink;
use crate::model::id_map::IdMap;
use crate::model::{Chassis, Device, Rail, Rule};
use std::collections::HashSet;
use tracing::{error, info};

/// Root of the configured hierarchy. Owns the rules, the chassis and the
/// id registry that resolves `run_rule` and `set_device` references.
#[derive(Debug)]
pub struct System {
    rules: Vec<Rule>,
    chassis: Vec<Chassis>,
    id_map: IdMap,
}

impl System {
    /// Registers every rule, device and rail, then checks that every
    /// reference made by an action resolves. Nothing has been executed if
    /// this fails.
    pub fn new(rules: Vec<Rule>, chassis: Vec<Chassis>) -> Result<Self, ConfigurationError> {
        let mut numbers = HashSet::new();
        for entry in &chassis {
            if !numbers.insert(entry.number()) {
                return Err(ConfigurationError::DuplicateChassisNumber(entry.number()));
            }
        }

        let mut id_map = IdMap::new();
        for (index, rule) in rules.iter().enumerate() {
            id_map.add_rule(rule.id(), index)?;
        }
        for (index, entry) in chassis.iter().enumerate() {
            entry.add_to_id_map(&mut id_map, index)?;
        }

        let system = Self {
            rules,
            chassis,
            id_map,
        };
        system.check_references()?;
        Ok(system)
    }

    fn check_references(&self) -> Result<(), ConfigurationError> {
        let check = |actions: &[Action]| -> Result<(), ConfigurationError> {
            actions
                .iter()
                .try_for_each(|action| action.check_references(&self.id_map))
        };

        for rule in &self.rules {
            check(rule.actions())?;
        }
        for chassis in &self.chassis {
            for device in chassis.devices() {
                if let Some(configuration) = device.configuration() {
                    check(configuration.actions())?;
                }
                for rail in device.rails() {
                    if let Some(configuration) = rail.configuration() {
                        check(configuration.actions())?;
                    }
                    if let Some(sensor_monitoring) = rail.sensor_monitoring() {
                        check(sensor_monitoring.actions())?;
                    }
                }
            }
        }
        Ok(())
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn chassis(&self) -> &[Chassis] {
        &self.chassis
    }

    pub fn id_map(&self) -> &IdMap {
        &self.id_map
    }

    pub fn rule(&self, id: &str) -> Result<&Rule, ConfigurationError> {
        let index = self.id_map.rule(id)?;
        self.rules
            .get(index)
            .ok_or_else(|| ConfigurationError::unresolved("rule", id))
    }

    /// Device and the chassis that contains it.
    pub fn locate_device(&self, id: &str) -> Result<(&Chassis, &Device), ConfigurationError> {
        let handle = self.id_map.device(id)?;
        self.chassis
            .get(handle.chassis)
            .and_then(|chassis| Some((chassis, chassis.devices().get(handle.device)?)))
            .ok_or_else(|| ConfigurationError::unresolved("device", id))
    }

    pub fn device(&self, id: &str) -> Result<&Device, ConfigurationError> {
        self.locate_device(id).map(|(_, device)| device)
    }

    pub fn rail(&self, id: &str) -> Result<&Rail, ConfigurationError> {
        let handle = self.id_map.rail(id)?;
        self.chassis
            .get(handle.chassis)
            .and_then(|chassis| chassis.devices().get(handle.device))
            .and_then(|device| device.rails().get(handle.rail))
            .ok_or_else(|| ConfigurationError::unresolved("rail", id))
    }

    /// Configures every chassis. A failing chassis is logged and does not
    /// prevent the others from being configured; the first error is returned.
    pub fn configure(&self) -> Result<(), Error> {
        info!(chassis = self.chassis.len(), rules = self.rules.len(), "configuring system");
        let mut first_error = None;
        for chassis in &self.chassis {
            if let Err(e) = chassis.configure(self) {
                error!(chassis = chassis.number(), error = %e, "chassis configuration failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn monitor_sensors(&self, sink: &mut dyn EventSink) {
        for chassis in &self.chassis {
            chassis.monitor_sensors(self, sink);
        }
    }

    pub fn clear_error_history(&self) {
        for chassis in &self.chassis {
            chassis.clear_error_history();
        }
    }
}
