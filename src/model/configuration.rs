use crate::action::{execute_sequence, Action, ActionEnvironment};
use crate::error::ActionError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration changes applied to a device or rail, optionally with the
/// output voltage that `write_volts` actions fall back to.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub volts: Option<f64>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl Configuration {
    pub fn new(volts: Option<f64>, actions: Vec<Action>) -> Self {
        Self { volts, actions }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn execute(&self, env: &mut ActionEnvironment<'_>, entity: &str) -> Result<(), ActionError> {
        match self.volts {
            Some(volts) => debug!("Configuring {}: volts={:.6}", entity, volts),
            None => debug!("Configuring {}", entity),
        }
        env.set_volts(self.volts);
        execute_sequence(&self.actions, env)?;
        Ok(())
    }
}

/// Named, reusable action list referenced by `run_rule`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub actions: Vec<Action>,
}

impl Rule {
    pub fn new(id: impl Into<String>, actions: Vec<Action>) -> Self {
        Self {
            id: id.into(),
            actions,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }
}
