use crate::fault::{EventSink, FaultClass, FaultRecord, RegisterReading, MAX_SNAPSHOT_REGISTERS};
use crate::pmbus::{Encoding, RegisterAccess, StatusWord, STATUS_WORD};
use heapless::Vec;
use tracing::{error, info};

/// STATUS_WORD reads with a once-per-episode failure report.
#[derive(Debug, Default, Clone)]
pub(crate) struct StatusPoller {
    failure_logged: bool,
}

impl StatusPoller {
    pub(crate) fn failure_logged(&self) -> bool {
        self.failure_logged
    }

    pub(crate) fn reset(&mut self) {
        self.failure_logged = false;
    }

    /// Reads STATUS_WORD. The first failure of an episode is logged and
    /// published as [`FaultClass::ReadFailure`]; a successful read ends the
    /// episode.
    pub(crate) fn poll(
        &mut self,
        name: &str,
        registers: &dyn RegisterAccess,
        sink: &mut dyn EventSink,
    ) -> Option<StatusWord> {
        match registers.read(STATUS_WORD, Encoding::Word) {
            Ok(raw) => {
                if self.failure_logged {
                    info!(device = name, "STATUS_WORD readable again");
                    self.failure_logged = false;
                }
                Some(StatusWord(raw))
            }
            Err(e) => {
                if !self.failure_logged {
                    self.failure_logged = true;
                    error!(device = name, error = %e, "failed to read STATUS_WORD");
                    let record = FaultRecord::new(name, FaultClass::ReadFailure).with_message(e.to_string());
                    sink.fault_detected(&record);
                }
                None
            }
        }
    }
}

/// Counts consecutive polls with a condition asserted.
#[derive(Debug, Clone)]
pub(crate) struct Deglitch {
    count: u8,
    limit: u8,
}

impl Deglitch {
    pub(crate) fn new(limit: u8) -> Self {
        Self {
            count: 0,
            limit: limit.max(1),
        }
    }

    /// True once the condition has held for `limit` consecutive polls.
    pub(crate) fn update(&mut self, asserted: bool) -> bool {
        if asserted {
            self.count = self.count.saturating_add(1);
        } else {
            self.count = 0;
        }
        self.count >= self.limit
    }

    pub(crate) fn reset(&mut self) {
        self.count = 0;
    }

    /// Asserted, but not yet for `limit` consecutive polls.
    pub(crate) fn pending(&self) -> bool {
        self.count > 0 && self.count < self.limit
    }
}

/// Best-effort read of `commands`; registers that fail to read are left out.
pub(crate) fn read_snapshot<'c>(
    registers: &dyn RegisterAccess,
    commands: impl IntoIterator<Item = &'c str>,
) -> Vec<RegisterReading, MAX_SNAPSHOT_REGISTERS> {
    let mut snapshot = Vec::new();
    for command in commands {
        if let Ok(value) = registers.read(command, Encoding::Byte) {
            let reading = RegisterReading {
                command: command.to_string(),
                value,
            };
            if snapshot.push(reading).is_err() {
                break;
            }
        }
    }
    snapshot
}
