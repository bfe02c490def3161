use gpio_cdev::{Chip, LineHandle, LineRequestFlags};

/// A line that can be driven high or low.
pub trait Output: Send + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    fn set_level(&mut self, high: bool) -> Result<(), Self::Error>;
}

impl Output for LineHandle {
    type Error = gpio_cdev::Error;

    fn set_level(&mut self, high: bool) -> Result<(), Self::Error> {
        self.set_value(if high { 1 } else { 0 })
    }
}

/// Open `chip_path` and request `offset` as an output, initially low.
pub fn request_line(
    chip_path: &str,
    offset: u32,
    consumer: &str,
) -> Result<LineHandle, gpio_cdev::Error> {
    let mut chip = Chip::new(chip_path)?;
    let line = chip.get_line(offset)?;
    line.request(LineRequestFlags::OUTPUT, 0, consumer)
}
