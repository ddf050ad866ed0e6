//! Background quantization.
//!
//! A [`QuantizeJob`] owns its pixel buffer, runs the whole pipeline on a
//! dedicated thread and publishes the outcome exactly once. Callers poll
//! [`QuantizeJob::is_finished`] and then read [`QuantizeJob::data`]; no
//! partial palette is ever visible.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};

use crate::error::JobError;
use crate::palette::Palette;
use crate::{QuantizeConfig, quantize_pixels};

/// Lifecycle of a [`QuantizeJob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    Running,
    Finished,
    Failed,
}

#[derive(Debug, Default)]
struct Shared {
    outcome: OnceLock<Result<Palette, JobError>>,
    cancel: AtomicBool,
}

type Worker = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug)]
struct Input {
    pixels: Vec<rgb::RGBA<u8>>,
    width: usize,
    height: usize,
    config: QuantizeConfig,
}

/// Palette extraction running off the calling thread.
#[derive(Debug)]
pub struct QuantizeJob {
    input: Option<Input>,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl QuantizeJob {
    /// Take ownership of the pixels; nothing runs until [`start`](Self::start).
    pub fn new(
        pixels: Vec<rgb::RGBA<u8>>,
        width: usize,
        height: usize,
        config: QuantizeConfig,
    ) -> Self {
        Self {
            input: Some(Input {
                pixels,
                width,
                height,
                config,
            }),
            shared: Arc::new(Shared::default()),
            handle: None,
        }
    }

    /// Spawn the worker thread. Returns immediately.
    ///
    /// If the thread cannot be spawned the job moves to
    /// [`JobState::Failed`] with the same [`JobError::Spawn`] it returns.
    pub fn start(&mut self) -> Result<(), JobError> {
        self.start_with(|worker| {
            thread::Builder::new()
                .name("median-palette".to_string())
                .spawn(worker)
        })
    }

    fn start_with<S>(&mut self, spawn: S) -> Result<(), JobError>
    where
        S: FnOnce(Worker) -> io::Result<JoinHandle<()>>,
    {
        let input = self.input.take().ok_or(JobError::AlreadyStarted)?;
        let shared = Arc::clone(&self.shared);

        let worker: Worker = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                quantize_pixels(
                    &input.pixels,
                    input.width,
                    input.height,
                    &input.config,
                    Some(&shared.cancel),
                )
            }));
            let outcome = match outcome {
                Ok(result) => result.map_err(JobError::from),
                Err(payload) => Err(JobError::Panicked(panic_message(payload))),
            };
            if let Err(e) = &outcome {
                log::debug!("quantize job failed: {e}");
            }
            let _ = shared.outcome.set(outcome);
        });

        match spawn(worker) {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                let err = JobError::Spawn(e.to_string());
                log::warn!("could not start quantize job: {err}");
                let _ = self.shared.outcome.set(Err(err.clone()));
                Err(err)
            }
        }
    }

    pub fn state(&self) -> JobState {
        match self.shared.outcome.get() {
            Some(Ok(_)) => JobState::Finished,
            Some(Err(_)) => JobState::Failed,
            None if self.input.is_some() => JobState::Created,
            None => JobState::Running,
        }
    }

    /// True once the outcome is published, whether success or failure.
    pub fn is_finished(&self) -> bool {
        self.shared.outcome.get().is_some()
    }

    /// Coarse progress: 0.0 until the outcome is published, then 1.0.
    pub fn progress(&self) -> f32 {
        if self.is_finished() { 1.0 } else { 0.0 }
    }

    /// The finished palette, [`JobError::NotReady`] before that, or the
    /// cause of failure.
    pub fn data(&self) -> Result<&Palette, JobError> {
        match self.shared.outcome.get() {
            Some(Ok(palette)) => Ok(palette),
            Some(Err(e)) => Err(e.clone()),
            None => Err(JobError::NotReady),
        }
    }

    /// Ask the worker to stop at its next split iteration. A job that
    /// already finished keeps its result.
    pub fn cancel(&self) {
        self.shared.cancel.store(true, Ordering::Relaxed);
    }

    /// Block until the worker exits and take the outcome. A job that was
    /// never started is started first.
    pub fn wait(mut self) -> Result<Palette, JobError> {
        if self.input.is_some() {
            self.start()?;
        }
        if let Some(handle) = self.handle.take() {
            if let Err(payload) = handle.join() {
                return Err(JobError::Panicked(panic_message(payload)));
            }
        }
        let shared = Arc::try_unwrap(self.shared).map_err(|_| JobError::NotReady)?;
        shared.outcome.into_inner().unwrap_or(Err(JobError::NotReady))
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
