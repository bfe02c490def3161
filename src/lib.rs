pub mod constants;
pub mod duty;
pub mod output;
pub mod softpwm;
pub mod waveform;

pub use duty::Duty;
pub use output::Output;
pub use softpwm::{Error, SoftPwm};
