use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use gpio_cdev::LineHandle;
use gpio_softpwm::constants::{CONSUMER, DEFAULT_CHIP, DEFAULT_LINE, RESOLUTION};
use gpio_softpwm::{output, SoftPwm};
use log::info;
use tokio::signal;
use tokio::time::sleep;

/**
 * This program drives a GPIO line with software PWM. Without --duty it sweeps
 * the duty cycle upward, holding each step for --step-secs, then turns the
 * line off. Ctrl-C stops early and still leaves the line low.
 */
#[derive(Parser, Debug)]
#[command(version, about = "Software PWM on a single GPIO line")]
struct Args {
    /// GPIO character device
    #[arg(long, default_value = DEFAULT_CHIP)]
    chip: String,

    /// Line offset on the chip
    #[arg(long, default_value_t = DEFAULT_LINE)]
    line: u32,

    /// Hold this duty cycle (0-1000) until Ctrl-C instead of sweeping
    #[arg(long)]
    duty: Option<u16>,

    /// First sweep duty
    #[arg(long, default_value_t = 100)]
    from: u16,

    /// Last sweep duty
    #[arg(long, default_value_t = RESOLUTION)]
    to: u16,

    /// Sweep increment
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u16).range(1..))]
    step: u16,

    /// Seconds to hold each sweep step
    #[arg(long, default_value_t = 5)]
    step_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    // 1. Request the line as an output, initially low
    let line = output::request_line(&args.chip, args.line, CONSUMER)
        .with_context(|| format!("requesting line {} on {}", args.line, args.chip))?;
    let pwm = SoftPwm::new(line)?;

    // 2. Drive it until the sweep ends or we are interrupted
    let result = tokio::select! {
        result = drive(&pwm, &args) => result,
        _ = signal::ctrl_c() => {
            info!("interrupted");
            Ok(())
        }
    };

    // 3. Whatever happened, leave the line low
    pwm.off()?;
    info!("line {} off", args.line);

    result
}

async fn drive(pwm: &SoftPwm<LineHandle>, args: &Args) -> anyhow::Result<()> {
    if let Some(duty) = args.duty {
        pwm.set(duty)?;
        info!("holding {} on line {}", pwm.duty(), args.line);
        std::future::pending::<()>().await;
        return Ok(());
    }

    let hold = Duration::from_secs(args.step_secs);
    for duty in (args.from..=args.to).step_by(args.step as usize) {
        pwm.set(duty)?;
        info!("duty {} on line {}", pwm.duty(), args.line);
        sleep(hold).await;
    }

    Ok(())
}
