use std::time::Duration;

/// Ticks per waveform period; also the largest accepted duty value.
pub const RESOLUTION: u16 = 1000;

const TICK_MICROS: u64 = 100;

/// Minimum pulse width.
pub const TICK: Duration = Duration::from_micros(TICK_MICROS);

/// One full waveform cycle, ~10 Hz.
pub const PERIOD: Duration = Duration::from_micros(TICK_MICROS * RESOLUTION as u64);

// Main GPIO controller on a Raspberry Pi
pub const DEFAULT_CHIP: &str = "/dev/gpiochip0";
pub const DEFAULT_LINE: u32 = 17;

/// Consumer label the kernel shows for lines we hold.
pub const CONSUMER: &str = "pwm";
