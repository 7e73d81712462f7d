//! Regulator configuration actions.
//!
//! Actions form a small tree-shaped language loaded from the configuration
//! file. Every action evaluates to a boolean; register accesses go through
//! the [`crate::pmbus::RegisterAccess`] of the environment's current device.

use crate::error::{ActionError, ConfigurationError, TransportError};
use crate::fault::SensorReading;
use crate::model::{Chassis, Device, IdMap, Rail, System};
use crate::pmbus::{f64_to_linear11, linear11_to_f64, Encoding, VOUT_COMMAND};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Maximum number of nested `run_rule` invocations.
pub const MAX_RULE_DEPTH: usize = 30;

fn default_vout_command() -> String {
    VOUT_COMMAND.to_string()
}

fn full_mask() -> u16 {
    0xFFFF
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Write {
        command: String,
        encoding: Encoding,
        value: u16,
        #[serde(default)]
        verify: bool,
    },
    WriteVolts {
        #[serde(default = "default_vout_command")]
        command: String,
        #[serde(default)]
        volts: Option<f64>,
    },
    Compare {
        command: String,
        encoding: Encoding,
        value: u16,
        #[serde(default = "full_mask")]
        mask: u16,
    },
    ReadSensor {
        command: String,
        encoding: Encoding,
        sensor: String,
    },
    Sequence(Vec<Action>),
    RunRule(String),
    SetDevice(String),
    If {
        condition: Box<Action>,
        then: Vec<Action>,
        #[serde(default, rename = "else")]
        otherwise: Vec<Action>,
    },
    Not(Box<Action>),
    And(Vec<Action>),
    Or(Vec<Action>),
}

impl Action {
    pub fn execute(&self, env: &mut ActionEnvironment<'_>) -> Result<bool, ActionError> {
        match self {
            Action::Write {
                command,
                encoding,
                value,
                verify,
            } => {
                let registers = env.device().registers();
                registers.write(command, *encoding, *value)?;
                if *verify {
                    let read = registers.read(command, *encoding)?;
                    if read != *value {
                        return Err(TransportError::VerifyMismatch {
                            command: command.clone(),
                            written: *value,
                            read,
                        }
                        .into());
                    }
                }
                trace!(device = env.device().id(), command = %command, value, "register written");
                Ok(true)
            }
            Action::WriteVolts { command, volts } => {
                let volts = volts
                    .or(env.volts())
                    .ok_or_else(|| ConfigurationError::MissingVolts(env.entity_id().to_string()))?;
                let raw = f64_to_linear11(volts);
                env.device().registers().write(command, Encoding::Linear11, raw)?;
                debug!(device = env.device().id(), command = %command, volts, raw, "output voltage written");
                Ok(true)
            }
            Action::Compare {
                command,
                encoding,
                value,
                mask,
            } => {
                let read = env.device().registers().read(command, *encoding)?;
                Ok(read & mask == value & mask)
            }
            Action::ReadSensor {
                command,
                encoding,
                sensor,
            } => {
                let raw = env.device().registers().read(command, *encoding)?;
                let value = match encoding {
                    Encoding::Linear11 => linear11_to_f64(raw),
                    Encoding::Byte | Encoding::Word => f64::from(raw),
                };
                env.record_reading(sensor, value);
                Ok(true)
            }
            Action::Sequence(actions) => execute_sequence(actions, env),
            Action::RunRule(id) => env.run_rule(id),
            Action::SetDevice(id) => {
                env.set_device(id)?;
                Ok(true)
            }
            Action::If {
                condition,
                then,
                otherwise,
            } => {
                if condition.execute(env)? {
                    execute_sequence(then, env)
                } else if otherwise.is_empty() {
                    Ok(false)
                } else {
                    execute_sequence(otherwise, env)
                }
            }
            Action::Not(action) => Ok(!action.execute(env)?),
            Action::And(actions) => {
                let mut result = true;
                for action in actions {
                    result &= action.execute(env)?;
                }
                Ok(result)
            }
            Action::Or(actions) => {
                let mut result = false;
                for action in actions {
                    result |= action.execute(env)?;
                }
                Ok(result)
            }
        }
    }

    /// Checks that every rule and device id named by this action exists.
    pub(crate) fn check_references(&self, id_map: &IdMap) -> Result<(), ConfigurationError> {
        match self {
            Action::RunRule(id) => id_map.rule(id).map(|_| ()),
            Action::SetDevice(id) => id_map.device(id).map(|_| ()),
            Action::Sequence(actions) | Action::And(actions) | Action::Or(actions) => actions
                .iter()
                .try_for_each(|action| action.check_references(id_map)),
            Action::Not(action) => action.check_references(id_map),
            Action::If {
                condition,
                then,
                otherwise,
            } => {
                condition.check_references(id_map)?;
                then.iter()
                    .chain(otherwise)
                    .try_for_each(|action| action.check_references(id_map))
            }
            Action::Write { .. }
            | Action::WriteVolts { .. }
            | Action::Compare { .. }
            | Action::ReadSensor { .. } => Ok(()),
        }
    }
}

/// Runs `actions` in order, stopping at the first error. Returns the result
/// of the last action, or `true` for an empty list.
pub fn execute_sequence(actions: &[Action], env: &mut ActionEnvironment<'_>) -> Result<bool, ActionError> {
    let mut result = true;
    for action in actions {
        result = action.execute(env)?;
    }
    Ok(result)
}

/// Execution context for one action tree.
pub struct ActionEnvironment<'a> {
    system: &'a System,
    chassis: &'a Chassis,
    device: &'a Device,
    rail: Option<&'a Rail>,
    volts: Option<f64>,
    rule_depth: usize,
    readings: Vec<SensorReading>,
}

impl<'a> ActionEnvironment<'a> {
    pub fn new(system: &'a System, chassis: &'a Chassis, device: &'a Device) -> Self {
        Self {
            system,
            chassis,
            device,
            rail: None,
            volts: None,
            rule_depth: 0,
            readings: Vec::new(),
        }
    }

    pub fn for_rail(system: &'a System, chassis: &'a Chassis, device: &'a Device, rail: &'a Rail) -> Self {
        Self {
            rail: Some(rail),
            ..Self::new(system, chassis, device)
        }
    }

    pub fn system(&self) -> &'a System {
        self.system
    }

    pub fn chassis(&self) -> &'a Chassis {
        self.chassis
    }

    pub fn device(&self) -> &'a Device {
        self.device
    }

    pub fn rail(&self) -> Option<&'a Rail> {
        self.rail
    }

    /// Id of the rail being configured, else of the current device.
    pub fn entity_id(&self) -> &'a str {
        match self.rail {
            Some(rail) => rail.id(),
            None => self.device.id(),
        }
    }

    pub fn volts(&self) -> Option<f64> {
        self.volts
    }

    pub fn set_volts(&mut self, volts: Option<f64>) {
        self.volts = volts;
    }

    pub fn rule_depth(&self) -> usize {
        self.rule_depth
    }

    pub fn readings(&self) -> &[SensorReading] {
        &self.readings
    }

    pub fn take_readings(&mut self) -> Vec<SensorReading> {
        std::mem::take(&mut self.readings)
    }

    pub fn set_device(&mut self, id: &str) -> Result<(), ConfigurationError> {
        let (chassis, device) = self.system.locate_device(id)?;
        self.chassis = chassis;
        self.device = device;
        Ok(())
    }

    pub fn run_rule(&mut self, id: &str) -> Result<bool, ActionError> {
        let system = self.system;
        let rule = system.rule(id)?;
        if self.rule_depth >= MAX_RULE_DEPTH {
            return Err(ActionError::RuleDepthExceeded(id.to_string()));
        }
        self.rule_depth += 1;
        let result = execute_sequence(rule.actions(), self);
        self.rule_depth -= 1;
        result
    }

    fn record_reading(&mut self, sensor: &str, value: f64) {
        self.readings.push(SensorReading {
            device: self.device.id().to_string(),
            rail: self.rail.map(|rail| rail.id().to_string()),
            sensor: sensor.to_string(),
            value,
        });
    }
}
