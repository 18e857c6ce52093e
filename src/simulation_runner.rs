use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::thread::{spawn, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::path_config::PathConfig;
use crate::path_simulator::{PathSimulator, SimulationState};
use crate::position_sink::PositionSink;

/// How often the simulation advances while a run is active.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);


enum CommandMessage {
    Start(PathConfig, Sender<Result<()>>),
    Pause,
    Resume,
    Stop,
    Quit,
}


/// Reported to the host when a run ends.
#[derive(Debug)]
pub enum RunEvent {
    Finished,
    Failed(Error),
}


/**
 * Owns the simulator. Commands and ticks are handled one at a time on the
 * same thread, so a tick never sees a half applied start or stop.
 */
struct SimulationRunner {
    simulator: PathSimulator,
    tick_period: Duration,
    event_tx: Sender<RunEvent>,
}


impl SimulationRunner {
    fn new(
        simulator: PathSimulator,
        tick_period: Duration,
        event_tx: Sender<RunEvent>,
    ) -> SimulationRunner {
        SimulationRunner {
            simulator: simulator,
            tick_period: tick_period,
            event_tx: event_tx,
        }
    }

    /**
     * Processes commands and delivers ticks at a fixed rate until told to
     * quit. Should be run in a thread.
     */
    fn run(&mut self, command_rx: Receiver<CommandMessage>) {
        // None while stopped; no ticks are delivered then
        let mut next_tick: Option<Instant> = None;
        loop {
            let message = match next_tick {
                Some(deadline) => {
                    let timeout = deadline.saturating_duration_since(Instant::now());
                    match command_rx.recv_timeout(timeout) {
                        Ok(message) => Some(message),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => {
                            info!("Command channel closed, simulation shutting down");
                            return;
                        }
                    }
                }
                None => match command_rx.recv() {
                    Ok(message) => Some(message),
                    Err(_) => {
                        info!("Command channel closed, simulation shutting down");
                        return;
                    }
                },
            };

            match message {
                Some(CommandMessage::Start(config, reply_tx)) => {
                    let result = self.simulator.start(config);
                    next_tick = match result {
                        Ok(_) => Some(Instant::now() + self.tick_period),
                        Err(Error::SinkUnavailable(_)) => None,
                        // A rejected start leaves any current run alone
                        Err(_) => next_tick,
                    };
                    if reply_tx.send(result).is_err() {
                        warn!("Start requester went away before the reply");
                    }
                }
                Some(CommandMessage::Pause) => self.simulator.pause(),
                Some(CommandMessage::Resume) => self.simulator.resume(),
                Some(CommandMessage::Stop) => {
                    let was_running = self.simulator.state() != SimulationState::Stopped;
                    self.simulator.stop();
                    next_tick = None;
                    if was_running {
                        self.send_event(RunEvent::Finished);
                    }
                }
                Some(CommandMessage::Quit) => {
                    self.simulator.stop();
                    info!("Simulation shutting down");
                    return;
                }
                None => {
                    next_tick = match next_tick {
                        Some(deadline) => self.run_tick(deadline),
                        None => None,
                    };
                }
            }
        }
    }

    /**
     * Runs one tick and returns when the next one is due, or None once the run
     * has ended. Late ticks are caught up rather than skipped.
     */
    fn run_tick(&mut self, deadline: Instant) -> Option<Instant> {
        match self.simulator.tick() {
            Ok(_) => (),
            Err(e) => {
                error!("Simulation halted: {}", e);
                self.send_event(RunEvent::Failed(e));
                return None;
            }
        }
        if self.simulator.state() == SimulationState::Stopped {
            self.send_event(RunEvent::Finished);
            return None;
        }
        Some(deadline + self.tick_period)
    }

    fn send_event(&self, event: RunEvent) {
        match self.event_tx.send(event) {
            Ok(_) => (),
            Err(e) => debug!("Nobody is listening for run events: {:?}", e.0),
        }
    }
}


/**
 * The host side of a simulation thread.
 */
pub struct SimulatorHandle {
    command_tx: Sender<CommandMessage>,
    event_rx: Receiver<RunEvent>,
    join_handle: JoinHandle<()>,
}


impl SimulatorHandle {
    /**
     * Starts a new run and waits for the simulation thread to accept it.
     */
    pub fn start(&self, config: PathConfig) -> Result<()> {
        let (reply_tx, reply_rx) = channel();
        self.send(CommandMessage::Start(config, reply_tx))?;
        match reply_rx.recv() {
            Ok(result) => result,
            Err(_) => Err(Error::Disconnected),
        }
    }

    pub fn pause(&self) -> Result<()> {
        self.send(CommandMessage::Pause)
    }

    pub fn resume(&self) -> Result<()> {
        self.send(CommandMessage::Resume)
    }

    pub fn stop(&self) -> Result<()> {
        self.send(CommandMessage::Stop)
    }

    pub fn events(&self) -> &Receiver<RunEvent> {
        &self.event_rx
    }

    /**
     * Stops any run and waits for the simulation thread to exit.
     */
    pub fn shutdown(self) {
        match self.command_tx.send(CommandMessage::Quit) {
            Ok(_) => (),
            Err(_) => warn!("Simulation thread already exited"),
        }
        match self.join_handle.join() {
            Ok(_) => (),
            Err(_) => error!("Unable to join thread, simulation thread panicked"),
        }
    }

    fn send(&self, message: CommandMessage) -> Result<()> {
        match self.command_tx.send(message) {
            Ok(_) => Ok(()),
            Err(_) => Err(Error::Disconnected),
        }
    }
}


pub fn spawn_simulator<S>(sink: S, tick_period: Duration) -> SimulatorHandle
where
    S: PositionSink + Send + 'static,
{
    let (command_tx, command_rx) = channel();
    let (event_tx, event_rx) = channel();
    let join_handle = spawn(move || {
        let simulator = PathSimulator::new(Box::new(sink));
        let mut runner = SimulationRunner::new(simulator, tick_period, event_tx);
        runner.run(command_rx);
    });
    SimulatorHandle {
        command_tx: command_tx,
        event_rx: event_rx,
        join_handle: join_handle,
    }
}
