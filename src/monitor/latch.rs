use crate::fault::FaultClass;

/// One sticky flag per [`FaultClass`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FaultLatches(u16);

impl FaultLatches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag; true only if it was not already set.
    pub fn latch(&mut self, class: FaultClass) -> bool {
        let newly = !self.is_latched(class);
        self.0 |= class.bit();
        newly
    }

    pub fn is_latched(&self, class: FaultClass) -> bool {
        self.0 & class.bit() != 0
    }

    pub fn any(&self) -> bool {
        self.0 != 0
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    pub fn latched(&self) -> impl Iterator<Item = FaultClass> {
        let latches = *self;
        FaultClass::ALL
            .into_iter()
            .filter(move |class| latches.is_latched(*class))
    }
}
