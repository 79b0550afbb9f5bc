pub mod bidding_engine;
pub mod settlement;
pub mod ui;

pub use self::{bidding_engine::*, settlement::*, ui::*};

use crate::{
    event::Event,
    event_log::{self, Reader as _},
    progress::{self, ProgressTracker as _},
};
use anyhow::{bail, format_err, Result};
use std::{
    sync::{
        atomic::{self, AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

pub type ServiceId = String;
pub type ServiceIdRef<'a> = &'a str;

/// A service that handles events on the log
pub trait LogFollowerService: Send + Sync {
    fn get_log_progress_id(&self) -> ServiceId;

    fn handle_event(&mut self, event: Event) -> Result<()>;
}

/// A service that is a loop that does something
pub trait LoopService: Send + Sync {
    fn run_iteration(&mut self) -> Result<()>;
}

/// Service execution control instance
///
/// All services are basically a loop, and we would like to be able to
/// gracefully terminate them, and handle a top-level error of any of
/// them by gracefully stopping everything else.
#[derive(Clone)]
pub struct ServiceControl {
    stop_all: Arc<AtomicBool>,
    progress_store: progress::SharedProgressTracker,
}

impl ServiceControl {
    pub fn new(progress_store: progress::SharedProgressTracker) -> Self {
        Self {
            stop_all: Default::default(),
            progress_store,
        }
    }

    pub fn stop_all(&self) {
        self.stop_all.store(true, Ordering::SeqCst);
    }

    pub fn spawn_loop(&self, mut service: impl LoopService + 'static) -> JoinHandle {
        self.spawn_loop_raw(move || service.run_iteration())
    }

    /// Runs a log follower from wherever it last left off, storing its
    /// progress after each drained batch.
    pub fn spawn_log_follower(
        &self,
        mut service: impl LogFollowerService + 'static,
        event_reader: event_log::SharedReader,
    ) -> JoinHandle {
        let service_id = service.get_log_progress_id();

        let mut progress = match (|| -> Result<event_log::Offset> {
            Ok(match self.progress_store.load(&service_id)? {
                Some(offset) => offset,
                None => event_reader.get_start_offset()?,
            })
        })() {
            // To avoid returning a `Result` directly from here, spawn a
            // thread that will immediately terminate with an error, just
            // like the initial progress load was done from the spawned
            // thread itself.
            Err(e) => {
                return JoinHandle::new(
                    Arc::new(AtomicBool::new(false)),
                    thread::spawn(move || Err(e)),
                )
            }
            Ok(offset) => offset,
        };

        self.spawn_loop_raw({
            let progress_store = self.progress_store.clone();
            move || {
                let event_log::WithOffset {
                    offset: new_offset,
                    data: events,
                } = event_reader.read(progress, 16, Some(Duration::from_secs(1)))?;

                for event in events {
                    service.handle_event(event.details)?;
                }

                if new_offset != progress {
                    progress = new_offset;
                    progress_store.store(&service_id, new_offset)?;
                }
                Ok(())
            }
        })
    }

    /// Start a new service as a loop, with a certain body
    ///
    /// This will take care of checking termination condition and
    /// handling any errors returned by `f`
    fn spawn_loop_raw<F>(&self, mut f: F) -> JoinHandle
    where
        F: FnMut() -> Result<()> + Send + Sync + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));

        JoinHandle::new(
            stop.clone(),
            thread::spawn({
                let stop_all = self.stop_all.clone();
                move || match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    while !stop.load(atomic::Ordering::SeqCst)
                        && !stop_all.load(atomic::Ordering::SeqCst)
                    {
                        if let Err(e) = f() {
                            stop_all.store(true, atomic::Ordering::SeqCst);
                            return Err(e);
                        }
                    }
                    Ok(())
                })) {
                    Err(_e) => {
                        stop_all.store(true, atomic::Ordering::SeqCst);
                        bail!("service panicked");
                    }
                    Ok(res) => res,
                }
            }),
        )
    }
}

/// Simple thread join wrapper that joins the thread on drop
pub struct JoinHandle {
    stop: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<Result<()>>>,
}

impl JoinHandle {
    fn new(stop: Arc<AtomicBool>, handle: thread::JoinHandle<Result<()>>) -> Self {
        JoinHandle {
            stop,
            thread: Some(handle),
        }
    }

    fn join_mut(&mut self) -> Result<()> {
        if let Some(h) = self.thread.take() {
            h.join().map_err(|e| format_err!("join failed: {:?}", e))?
        } else {
            Ok(())
        }
    }

    pub fn join(mut self) -> Result<()> {
        self.join_mut()
    }
}

impl Drop for JoinHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        self.join_mut().expect("not failed")
    }
}
