//! Polling and event coordination.
//!
//! The [`Manager`] is the single owner of every monitor and of the
//! configured [`System`]. Events, debounce deadlines and poll ticks are
//! handled one at a time from [`Manager::run`], so no handler ever
//! overlaps another.

use crate::config::ManagerConfig;
use crate::fault::EventSink;
use crate::model::System;
use crate::monitor::FaultMonitor;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Inbound notification from the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BusEvent {
    PresenceChanged { device: String, present: bool },
    PowerStateChanged { on: bool },
}

pub struct Manager<S: EventSink> {
    config: ManagerConfig,
    monitors: Vec<Box<dyn FaultMonitor>>,
    system: Option<System>,
    sink: S,
    system_power_on: bool,
    polls: u64,
}

impl<S: EventSink> Manager<S> {
    pub fn new(config: ManagerConfig, sink: S) -> Self {
        Self {
            config,
            monitors: Vec::new(),
            system: None,
            sink,
            system_power_on: false,
            polls: 0,
        }
    }

    pub fn with_system(mut self, system: System) -> Self {
        self.system = Some(system);
        self
    }

    /// Monitors are analyzed in the order they are added.
    pub fn add_monitor(&mut self, monitor: Box<dyn FaultMonitor>) {
        debug!(monitor = monitor.name(), "monitor registered");
        self.monitors.push(monitor);
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn monitors(&self) -> &[Box<dyn FaultMonitor>] {
        &self.monitors
    }

    pub fn monitor(&self, name: &str) -> Option<&dyn FaultMonitor> {
        self.monitors
            .iter()
            .find(|monitor| monitor.name() == name)
            .map(|monitor| monitor.as_ref())
    }

    pub fn system(&self) -> Option<&System> {
        self.system.as_ref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn system_power_on(&self) -> bool {
        self.system_power_on
    }

    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// One poll of every monitor, then sensor monitoring while powered on.
    pub fn analyze(&mut self) {
        self.polls = self.polls.wrapping_add(1);
        for monitor in &mut self.monitors {
            if let Err(e) = monitor.analyze(&mut self.sink) {
                error!(monitor = monitor.name(), error = %e, "analysis failed");
            }
        }
        if self.system_power_on {
            if let Some(system) = &self.system {
                system.monitor_sensors(&mut self.sink);
            }
        }
    }

    pub fn handle_event(&mut self, event: BusEvent, now: Instant) {
        match event {
            BusEvent::PresenceChanged { device, present } => self.presence_changed(&device, present, now),
            BusEvent::PowerStateChanged { on } => self.power_state_changed(on, now),
        }
    }

    pub fn presence_changed(&mut self, device: &str, present: bool, now: Instant) {
        match self.monitors.iter_mut().find(|monitor| monitor.name() == device) {
            Some(monitor) => monitor.presence_changed(present, now, &mut self.sink),
            None => warn!(device, present, "presence change for unknown device"),
        }
    }

    /// Faults from the previous power cycle are forgotten before any
    /// monitor sees the new state.
    pub fn power_state_changed(&mut self, on: bool, now: Instant) {
        if on == self.system_power_on {
            debug!(on, "power state unchanged");
            return;
        }
        info!(on, "system power state changed");

        for monitor in &mut self.monitors {
            monitor.clear_faults();
        }
        if let Some(system) = &self.system {
            system.clear_error_history();
        }

        self.system_power_on = on;
        for monitor in &mut self.monitors {
            monitor.power_state_changed(on, now);
        }

        if on {
            if let Some(system) = &self.system {
                if let Err(e) = system.configure() {
                    error!(error = %e, "regulator configuration failed");
                }
            }
        }
    }

    pub fn expire_timers(&mut self, now: Instant) {
        for monitor in &mut self.monitors {
            if monitor.timer_deadline().is_some_and(|deadline| deadline <= now) {
                monitor.timer_expired(now);
            }
        }
    }

    /// Earliest pending debounce deadline of any monitor.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.monitors
            .iter()
            .filter_map(|monitor| monitor.timer_deadline())
            .min()
    }

    /// Runs until `shutdown` completes. The first poll happens one interval
    /// after start; a tick delayed by a slow handler is not made up.
    pub async fn run<F>(&mut self, mut events: mpsc::UnboundedReceiver<BusEvent>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let period = self.config.poll_interval();
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut events_open = true;

        info!(
            monitors = self.monitors.len(),
            poll_ms = self.config.poll_interval_ms,
            "manager started"
        );

        loop {
            let deadline = self.next_deadline();
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!(polls = self.polls, "manager stopping");
                    break;
                }
                event = events.recv(), if events_open => match event {
                    Some(event) => self.handle_event(event, Instant::now()),
                    None => {
                        debug!("event channel closed");
                        events_open = false;
                    }
                },
                _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.expire_timers(Instant::now());
                }
                _ = ticker.tick() => self.analyze(),
            }
        }
    }
}
