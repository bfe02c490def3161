use std::fmt::Display;

use crate::constants::RESOLUTION;
use crate::softpwm::Error;

/// Duty cycle in tenths of a percent, always within `0..=RESOLUTION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Duty(pub(crate) u16);

impl Duty {
    pub const OFF: Duty = Duty(0);
    pub const FULL: Duty = Duty(RESOLUTION);

    /// Number of high ticks per period.
    pub fn as_ticks(self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for Duty {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        (value <= RESOLUTION)
            .then_some(Self(value))
            .ok_or(Error::InvalidDuty(value))
    }
}

impl From<Duty> for u16 {
    fn from(value: Duty) -> Self {
        value.0
    }
}

impl Display for Duty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}%", self.0 / 10, self.0 % 10)
    }
}
