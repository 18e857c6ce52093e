use chrono::{DateTime, Duration, Utc};

use crate::error::{Error, Result};
use crate::path_config::{EndOfPath, PathConfig};
use crate::position_sink::PositionSink;
use crate::telemetry::{distance, interpolate, PositionSample, Waypoint};

type Steps = u64;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimulationState {
    Moving,
    Waiting,
    Paused,
    Stopped,
}


/**
 * When the dwell at the current waypoint ends. A single waypoint path never
 * stops waiting.
 */
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WaitDeadline {
    Bounded(DateTime<Utc>),
    Unbounded,
}


impl WaitDeadline {
    fn expired(&self, now: DateTime<Utc>) -> bool {
        match *self {
            WaitDeadline::Bounded(deadline) => now >= deadline,
            WaitDeadline::Unbounded => false,
        }
    }
}


/// Progress within a run.
#[derive(Clone, Debug)]
struct RunCursor {
    waypoint_index: usize,
    position: Waypoint,
    segment_elapsed_steps: Steps,
    segment_total_steps: Steps,
    wait_deadline: WaitDeadline,
}


/// What to go back to when a paused run resumes.
#[derive(Clone, Copy, Debug)]
enum Resumption {
    Moving,
    Waiting(Option<Duration>),
}


struct Run {
    config: PathConfig,
    end_of_path: EndOfPath,
    // Traversal order. Reverse loops replace this with a reversed copy.
    route: Vec<Waypoint>,
    cursor: RunCursor,
    resumption: Option<Resumption>,
}


/**
 * Advances a virtual position along a list of waypoints, one tick at a time.
 * Movement is counted in ticks; dwelling at a waypoint is measured against
 * the clock, so a late tick delays movement but not the end of a wait.
 */
pub struct PathSimulator {
    state: SimulationState,
    run: Option<Run>,
    sink: Box<dyn PositionSink + Send>,
}


impl PathSimulator {
    pub fn new(sink: Box<dyn PositionSink + Send>) -> PathSimulator {
        PathSimulator {
            state: SimulationState::Stopped,
            run: None,
            sink: sink,
        }
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    /// The last computed position, if a run is in progress.
    pub fn position(&self) -> Option<Waypoint> {
        self.run.as_ref().map(|run| run.cursor.position)
    }

    pub fn current_waypoint_index(&self) -> Option<usize> {
        self.run.as_ref().map(|run| run.cursor.waypoint_index)
    }

    /// The waypoints in the order they are currently being traversed.
    pub fn route(&self) -> Option<&[Waypoint]> {
        self.run.as_ref().map(|run| run.route.as_slice())
    }

    /// The end of the segment being (or about to be) traveled.
    pub fn segment_target(&self) -> Option<Waypoint> {
        self.run
            .as_ref()
            .and_then(|run| run.route.get(run.cursor.waypoint_index + 1))
            .copied()
    }

    /// (elapsed, total) ticks of the current segment.
    pub fn segment_steps(&self) -> Option<(u64, u64)> {
        self.run.as_ref().map(|run| {
            (run.cursor.segment_elapsed_steps, run.cursor.segment_total_steps)
        })
    }

    pub fn wait_deadline(&self) -> Option<WaitDeadline> {
        self.run.as_ref().map(|run| run.cursor.wait_deadline)
    }

    pub fn start(&mut self, config: PathConfig) -> Result<()> {
        self.start_at(config, Utc::now())
    }

    /**
     * Begins a new run, discarding any previous one. The first tick happens
     * right away, so the first waypoint is emitted now and the next tick
     * already moves along the first segment.
     */
    pub fn start_at(&mut self, config: PathConfig, now: DateTime<Utc>) -> Result<()> {
        config.validate()?;

        if config.loop_path && config.reverse_loop {
            warn!("Both loop and reverse loop requested, looping takes precedence");
        }
        info!(
            "Starting run with {} waypoints at {} m/s, waiting {} s at each",
            config.waypoints.len(),
            config.speed,
            config.interval_seconds);

        let route = config.waypoints.clone();
        let first = route[0];
        let mut run = Run {
            end_of_path: config.end_of_path(),
            config: config,
            route: route,
            cursor: RunCursor {
                waypoint_index: 0,
                position: first,
                segment_elapsed_steps: 0,
                segment_total_steps: 0,
                wait_deadline: WaitDeadline::Unbounded,
            },
            resumption: None,
        };

        if run.route.len() == 1 {
            debug!("Single waypoint, holding position until stopped");
            self.state = SimulationState::Waiting;
        } else {
            prepare_segment(&mut run);
            self.state = SimulationState::Moving;
        }
        self.run = Some(run);

        self.tick_at(now).map(|_| ())
    }

    pub fn pause(&mut self) {
        self.pause_at(Utc::now());
    }

    /**
     * Freezes the run. Ticks are ignored until the run is resumed, restarted
     * or stopped.
     */
    pub fn pause_at(&mut self, now: DateTime<Utc>) {
        let resumption = match self.state {
            SimulationState::Moving => Resumption::Moving,
            SimulationState::Waiting => {
                let remaining = match self.run.as_ref().map(|run| run.cursor.wait_deadline) {
                    Some(WaitDeadline::Bounded(deadline)) => {
                        Some(std::cmp::max(deadline - now, Duration::zero()))
                    }
                    _ => None,
                };
                Resumption::Waiting(remaining)
            }
            SimulationState::Paused | SimulationState::Stopped => {
                debug!("Ignoring pause while {:?}", self.state);
                return;
            }
        };
        if let Some(run) = self.run.as_mut() {
            run.resumption = Some(resumption);
        }
        info!("Pausing run");
        self.state = SimulationState::Paused;
    }

    pub fn resume(&mut self) {
        self.resume_at(Utc::now());
    }

    /**
     * Continues a paused run where it left off. A dwell that was interrupted
     * gets the rest of its time from now.
     */
    pub fn resume_at(&mut self, now: DateTime<Utc>) {
        if self.state != SimulationState::Paused {
            debug!("Ignoring resume while {:?}", self.state);
            return;
        }
        let run = match self.run.as_mut() {
            Some(run) => run,
            None => {
                self.state = SimulationState::Stopped;
                return;
            }
        };
        info!("Resuming run");
        match run.resumption.take() {
            Some(Resumption::Waiting(remaining)) => {
                run.cursor.wait_deadline = match remaining {
                    Some(remaining) => WaitDeadline::Bounded(now + remaining),
                    None => WaitDeadline::Unbounded,
                };
                self.state = SimulationState::Waiting;
            }
            Some(Resumption::Moving) | None => self.state = SimulationState::Moving,
        }
    }

    /**
     * Ends the run. Subsequent ticks do nothing.
     */
    pub fn stop(&mut self) {
        if self.state != SimulationState::Stopped {
            info!("Stopping run");
        }
        self.state = SimulationState::Stopped;
        self.run = None;
    }

    pub fn tick(&mut self) -> Result<Option<PositionSample>> {
        self.tick_at(Utc::now())
    }

    /**
     * Advances the simulation by one step and returns the emitted sample, or
     * None if the simulator is paused or stopped.
     */
    pub fn tick_at(&mut self, now: DateTime<Utc>) -> Result<Option<PositionSample>> {
        let step = match self.state {
            SimulationState::Paused | SimulationState::Stopped => return Ok(None),
            SimulationState::Moving => self.move_step(now).map(|position| (position, false)),
            SimulationState::Waiting => self.wait_step(now),
        };
        let (position, finished) = match step {
            Some(step) => step,
            None => {
                // Active state without a run; nothing sensible to emit
                self.stop();
                return Ok(None);
            }
        };

        let sample = PositionSample::new(&position, now);
        self.publish(&sample)?;
        if finished {
            info!("End of path reached");
            self.stop();
        }
        Ok(Some(sample))
    }

    fn move_step(&mut self, now: DateTime<Utc>) -> Option<Waypoint> {
        let run = self.run.as_mut()?;
        let cursor = &mut run.cursor;
        if cursor.segment_elapsed_steps <= cursor.segment_total_steps {
            let start = run.route[cursor.waypoint_index];
            let end = run.route[cursor.waypoint_index + 1];
            let fraction = if cursor.segment_total_steps > 0 {
                cursor.segment_elapsed_steps as f64 / cursor.segment_total_steps as f64
            } else {
                1.0
            };
            cursor.position = interpolate(&start, &end, fraction);
            cursor.segment_elapsed_steps += 1;
        } else {
            cursor.waypoint_index += 1;
            cursor.position = run.route[cursor.waypoint_index];
            cursor.wait_deadline = WaitDeadline::Bounded(
                now + Duration::seconds(i64::from(run.config.interval_seconds)));
            debug!(
                "Reached waypoint {} at {:.6}, {:.6}",
                cursor.waypoint_index,
                cursor.position.latitude,
                cursor.position.longitude);
            self.state = SimulationState::Waiting;
        }
        Some(cursor.position)
    }

    /**
     * Holds the current waypoint. The returned flag is set when the run is
     * over and should stop once the held position has been emitted.
     */
    fn wait_step(&mut self, now: DateTime<Utc>) -> Option<(Waypoint, bool)> {
        let run = self.run.as_mut()?;
        let held = run.route[run.cursor.waypoint_index];
        run.cursor.position = held;
        if !run.cursor.wait_deadline.expired(now) {
            return Some((held, false));
        }

        if run.cursor.waypoint_index + 1 >= run.route.len() {
            match run.end_of_path {
                EndOfPath::Restart => {
                    debug!("End of path, restarting from the first waypoint");
                    run.cursor.waypoint_index = 0;
                    prepare_segment(run);
                    self.state = SimulationState::Moving;
                }
                EndOfPath::Reverse => {
                    debug!("End of path, reversing direction");
                    run.route = run.route.iter().rev().copied().collect();
                    run.cursor.waypoint_index = 0;
                    prepare_segment(run);
                    self.state = SimulationState::Moving;
                }
                EndOfPath::Stop => return Some((held, true)),
            }
        } else {
            prepare_segment(run);
            self.state = SimulationState::Moving;
        }
        Some((held, false))
    }

    fn publish(&mut self, sample: &PositionSample) -> Result<()> {
        match self.sink.publish(sample) {
            Ok(_) => Ok(()),
            Err(e) => {
                error!("Unable to publish position, stopping: {}", e);
                self.stop();
                Err(Error::SinkUnavailable(e.0))
            }
        }
    }
}


/**
 * Sets up timing for the segment from the current waypoint to the next one.
 * A segment always lasts at least one tick; a non-finite duration from a zero
 * or negative speed saturates.
 */
fn prepare_segment(run: &mut Run) {
    let cursor = &mut run.cursor;
    let start = run.route[cursor.waypoint_index];
    let end = run.route[cursor.waypoint_index + 1];
    let distance_m = distance(&start, &end);
    let seconds = (distance_m / run.config.speed).floor();
    // Float to int casts saturate, and NaN becomes 0
    cursor.segment_total_steps = std::cmp::max(1, seconds as Steps);
    cursor.segment_elapsed_steps = 0;
    cursor.position = start;
    cursor.wait_deadline = WaitDeadline::Unbounded;
    debug!(
        "Segment {} -> {}: {:.1} m in {} ticks",
        cursor.waypoint_index,
        cursor.waypoint_index + 1,
        distance_m,
        cursor.segment_total_steps);
}
