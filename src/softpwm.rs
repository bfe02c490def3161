//! Software PWM for a single output line. A background thread walks a fixed
//! tick grid and drives the line high while the tick counter is below the
//! duty threshold.

use std::error::Error as _;
use std::mem;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use log::{debug, error, warn};

use crate::constants::{PERIOD, RESOLUTION, TICK};
use crate::duty::Duty;
use crate::output::Output;
use crate::waveform::TickCounter;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("duty cycle {0} outside 0..={max}", max = RESOLUTION)]
    InvalidDuty(u16),
    #[error("output fault")]
    Output(#[source] BoxError),
    #[error("pwm loop panicked, output line lost")]
    LoopPanicked,
}

/// Output handed back by a loop that died on a write error.
struct Fault<O> {
    output: O,
    error: BoxError,
}

struct Worker<O> {
    stop: Sender<()>,
    handle: JoinHandle<Result<O, Fault<O>>>,
}

enum State<O> {
    Idle(O),
    Running(Worker<O>),
    Lost,
}

/// Software PWM controller owning one output line.
///
/// `set` and `off` take `&self`, so a controller can be shared behind an
/// `Arc` and driven from several threads. At most one loop runs at a time.
pub struct SoftPwm<O: Output> {
    duty: Arc<AtomicU16>,
    state: Mutex<State<O>>,
}

impl<O: Output> SoftPwm<O> {
    /// Take ownership of `output` and drive it low. No loop runs until the
    /// first `set`.
    pub fn new(mut output: O) -> Result<Self, Error> {
        output
            .set_level(false)
            .map_err(|e| Error::Output(Box::new(e)))?;

        Ok(Self {
            duty: Arc::new(AtomicU16::new(Duty::OFF.as_ticks())),
            state: Mutex::new(State::Idle(output)),
        })
    }

    /// Duty most recently accepted by `set`.
    pub fn duty(&self) -> Duty {
        Duty(self.duty.load(Ordering::Relaxed))
    }

    pub fn is_running(&self) -> bool {
        matches!(&*self.lock(), State::Running(worker) if !worker.handle.is_finished())
    }

    /// Set the duty cycle to a value between zero and 1000, inclusive,
    /// starting the loop if it is not running. The running loop picks up the
    /// new value within one tick.
    ///
    /// A fault from a loop that has since died is reported here instead, and
    /// the new duty is not applied.
    pub fn set(&self, duty: u16) -> Result<(), Error> {
        let duty = Duty::try_from(duty)?;
        let mut state = self.lock();

        if matches!(&*state, State::Running(worker) if worker.handle.is_finished()) {
            retire(&mut *state, Worker::join)?;
        }

        match mem::replace(&mut *state, State::Lost) {
            State::Idle(output) => {
                self.duty.store(duty.as_ticks(), Ordering::Relaxed);
                debug!("starting pwm loop at {duty}");
                *state = State::Running(Worker::spawn(output, Arc::clone(&self.duty)));
                Ok(())
            }
            running @ State::Running(_) => {
                self.duty.store(duty.as_ticks(), Ordering::Relaxed);
                *state = running;
                Ok(())
            }
            State::Lost => Err(Error::LoopPanicked),
        }
    }

    /// Stop the loop and wait until the line has been driven low. Does nothing
    /// when no loop is running.
    pub fn off(&self) -> Result<(), Error> {
        let mut state = self.lock();
        retire(&mut *state, Worker::stop)
    }

    fn lock(&self) -> MutexGuard<'_, State<O>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<O: Output> Drop for SoftPwm<O> {
    fn drop(&mut self) {
        if let Err(e) = self.off() {
            match e.source() {
                Some(cause) => warn!("pwm shutdown on drop failed: {e}: {cause}"),
                None => warn!("pwm shutdown on drop failed: {e}"),
            }
        }
    }
}

/// Finish a running worker with `finish` and put the returned output back.
fn retire<O: Output>(
    state: &mut State<O>,
    finish: fn(Worker<O>) -> (State<O>, Result<(), Error>),
) -> Result<(), Error> {
    match mem::replace(state, State::Lost) {
        State::Running(worker) => {
            let (next, result) = finish(worker);
            *state = next;
            result
        }
        State::Lost => Err(Error::LoopPanicked),
        idle => {
            *state = idle;
            Ok(())
        }
    }
}

impl<O: Output> Worker<O> {
    fn spawn(output: O, duty: Arc<AtomicU16>) -> Self {
        let (stop, stop_rx) = mpsc::channel();
        let handle = thread::spawn(move || run(output, &duty, &stop_rx));
        Self { stop, handle }
    }

    fn stop(self) -> (State<O>, Result<(), Error>) {
        // Fails only if the loop already exited on a fault; join reports it.
        let _ = self.stop.send(());
        self.join()
    }

    fn join(self) -> (State<O>, Result<(), Error>) {
        match self.handle.join() {
            Ok(Ok(output)) => (State::Idle(output), Ok(())),
            Ok(Err(Fault { output, error })) => (State::Idle(output), Err(Error::Output(error))),
            Err(_) => (State::Lost, Err(Error::LoopPanicked)),
        }
    }
}

fn run<O: Output>(mut output: O, duty: &AtomicU16, stop: &Receiver<()>) -> Result<O, Fault<O>> {
    let result = drive(&mut output, duty, stop);
    if let Err(e) = &result {
        warn!("output fault, stopping pwm loop: {e}");
    }

    // One attempt at leaving the line low, fault or not.
    let low = output.set_level(false);

    match (result, low) {
        (Ok(()), Ok(())) => {
            debug!("pwm loop stopped");
            Ok(output)
        }
        (Ok(()), Err(e)) => Err(Fault {
            output,
            error: Box::new(e),
        }),
        (Err(e), low) => {
            if let Err(low_err) = low {
                error!("could not drive line low after fault: {low_err}");
            }
            Err(Fault {
                output,
                error: Box::new(e),
            })
        }
    }
}

/// Tick until a stop request arrives. Deadlines sit on a fixed grid so
/// scheduling jitter does not accumulate.
fn drive<O: Output>(output: &mut O, duty: &AtomicU16, stop: &Receiver<()>) -> Result<(), O::Error> {
    let mut counter = TickCounter::new();
    let mut deadline = Instant::now();

    loop {
        deadline += TICK;
        let now = Instant::now();
        if now > deadline + PERIOD {
            debug!("pwm loop {:?} behind, re-anchoring tick grid", now - deadline);
            deadline = now;
        }

        match stop.recv_timeout(deadline.saturating_duration_since(now)) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return Ok(()),
        }

        let duty = Duty(duty.load(Ordering::Relaxed));
        output.set_level(counter.level(duty))?;
    }
}
