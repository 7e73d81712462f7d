use crate::action::ActionEnvironment;
use crate::error::{ActionError, ConfigurationError};
use crate::fault::EventSink;
use crate::model::id_map::IdMap;
use crate::model::{Chassis, Configuration, Device, RailHandle, SensorMonitoring, System};

/// A voltage rail produced by a device.
#[derive(Debug)]
pub struct Rail {
    id: String,
    device_id: String,
    configuration: Option<Configuration>,
    sensor_monitoring: Option<SensorMonitoring>,
}

impl Rail {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            device_id: String::new(),
            configuration: None,
            sensor_monitoring: None,
        }
    }

    pub fn with_configuration(mut self, configuration: Configuration) -> Self {
        self.configuration = Some(configuration);
        self
    }

    pub fn with_sensor_monitoring(mut self, sensor_monitoring: SensorMonitoring) -> Self {
        self.sensor_monitoring = Some(sensor_monitoring);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Id of the owning device; empty until the rail is handed to [`Device::new`].
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub(crate) fn set_device_id(&mut self, device_id: &str) {
        self.device_id = device_id.to_string();
    }

    pub fn configuration(&self) -> Option<&Configuration> {
        self.configuration.as_ref()
    }

    pub fn sensor_monitoring(&self) -> Option<&SensorMonitoring> {
        self.sensor_monitoring.as_ref()
    }

    pub fn add_to_id_map(&self, id_map: &mut IdMap, handle: RailHandle) -> Result<(), ConfigurationError> {
        id_map.add_rail(&self.id, handle)
    }

    pub fn configure(&self, system: &System, chassis: &Chassis, device: &Device) -> Result<(), ActionError> {
        if let Some(configuration) = &self.configuration {
            let mut env = ActionEnvironment::for_rail(system, chassis, device, self);
            configuration.execute(&mut env, &self.id)?;
        }
        Ok(())
    }

    pub fn monitor_sensors(&self, system: &System, chassis: &Chassis, device: &Device, sink: &mut dyn EventSink) {
        if let Some(sensor_monitoring) = &self.sensor_monitoring {
            sensor_monitoring.execute(system, chassis, device, self, sink);
        }
    }

    pub fn clear_error_history(&self) {
        if let Some(sensor_monitoring) = &self.sensor_monitoring {
            sensor_monitoring.clear_error_history();
        }
    }
}
