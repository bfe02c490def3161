use crate::constants::RESOLUTION;
use crate::duty::Duty;

/// Position within the current period. The output is high while the
/// position is below the duty threshold, so a new duty applies on the very
/// next tick without re-arming anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickCounter {
    i: u16,
}

impl TickCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Level for the current tick, then advance.
    pub fn level(&mut self, duty: Duty) -> bool {
        let high = self.i < duty.as_ticks();
        self.i = (self.i + 1) % RESOLUTION;
        high
    }
}
