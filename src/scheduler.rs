//! Frame-paced driver for a simulation
//!
//! The engine has no clock of its own. [`FramePacer`] ticks a shared engine
//! from a tokio interval, one step per frame, with the lock held for exactly
//! one step so other tasks (a renderer, a mode toggle) can get in between
//! frames. Pausing and stopping go through a [`PacerHandle`].

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

use crate::layout::BubbleLayout;
use crate::simulation::{Simulation, TickOutcome};

/// Default frame rate
pub const DEFAULT_FPS: u32 = 60;

/// Something that advances by discrete steps
pub trait Steppable: Send {
    fn step(&mut self) -> TickOutcome;
}

impl Steppable for Simulation {
    fn step(&mut self) -> TickOutcome {
        self.tick()
    }
}

impl Steppable for BubbleLayout {
    fn step(&mut self) -> TickOutcome {
        self.simulation_mut().tick()
    }
}

/// A simulation shared between the pacer and other tasks
pub type SharedSimulation = Arc<Mutex<Simulation>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PacerCommand {
    Run,
    Pause,
    Stop,
}

/// Counters reported when a pacer finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacerStats {
    /// Frames on which the engine was polled
    pub frames: u64,
    /// Frames on which the engine actually moved
    pub steps: u64,
}

/// Ticks an engine once per frame
#[derive(Debug, Clone, Copy)]
pub struct FramePacer {
    frame: Duration,
    until_parked: bool,
}

impl Default for FramePacer {
    fn default() -> Self {
        Self::at_fps(DEFAULT_FPS)
    }
}

impl FramePacer {
    pub fn new(frame: Duration) -> Self {
        Self {
            frame,
            until_parked: false,
        }
    }

    /// Pace at `fps` frames per second (at least 1)
    pub fn at_fps(fps: u32) -> Self {
        Self::new(Duration::from_secs(1) / fps.max(1))
    }

    /// Finish on its own once the engine converges or has nothing to do
    ///
    /// Without this the pacer keeps polling a parked engine so that a reheat
    /// from another task resumes motion.
    pub fn until_parked(mut self) -> Self {
        self.until_parked = true;
        self
    }

    pub fn frame(&self) -> Duration {
        self.frame
    }

    /// Start ticking `engine` on the current tokio runtime
    pub fn spawn<T>(&self, engine: Arc<Mutex<T>>) -> PacerHandle
    where
        T: Steppable + 'static,
    {
        let (commands, receiver) = watch::channel(PacerCommand::Run);
        let task = tokio::spawn(drive(engine, *self, receiver));
        PacerHandle { commands, task }
    }
}

async fn drive<T>(
    engine: Arc<Mutex<T>>,
    pacer: FramePacer,
    mut commands: watch::Receiver<PacerCommand>,
) -> PacerStats
where
    T: Steppable,
{
    let mut interval = time::interval(pacer.frame);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut stats = PacerStats::default();

    loop {
        let command = *commands.borrow_and_update();
        match command {
            PacerCommand::Stop => break,
            PacerCommand::Pause => {
                if commands.changed().await.is_err() {
                    break;
                }
                continue;
            }
            PacerCommand::Run => {}
        }

        tokio::select! {
            _ = interval.tick() => {}
            changed = commands.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
        }

        let Some(outcome) = step_once(&engine) else {
            warn!("engine lock poisoned, stopping frame pacer");
            break;
        };

        stats.frames += 1;
        if outcome == TickOutcome::Stepped {
            stats.steps += 1;
        } else if pacer.until_parked {
            break;
        }
    }

    debug!(frames = stats.frames, steps = stats.steps, "frame pacer finished");
    stats
}

/// One step with the lock held; `None` if the lock is poisoned
fn step_once<T: Steppable>(engine: &Mutex<T>) -> Option<TickOutcome> {
    engine.lock().ok().map(|mut engine| engine.step())
}

/// Control side of a running [`FramePacer`]
pub struct PacerHandle {
    commands: watch::Sender<PacerCommand>,
    task: JoinHandle<PacerStats>,
}

impl PacerHandle {
    /// Stop ticking after the current frame; state is left untouched
    pub fn pause(&self) {
        self.commands.send_replace(PacerCommand::Pause);
    }

    /// Continue from wherever the engine is now
    pub fn resume(&self) {
        self.commands.send_replace(PacerCommand::Run);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the pacer and wait for its task
    pub async fn stop(self) -> Result<PacerStats, JoinError> {
        self.commands.send_replace(PacerCommand::Stop);
        self.task.await
    }

    /// Wait for the pacer to finish on its own (see [`FramePacer::until_parked`])
    pub async fn join(self) -> Result<PacerStats, JoinError> {
        self.task.await
    }
}
