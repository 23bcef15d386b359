//! Systems: events that belong to no particle, scheduled on their own clock.

use std::cmp::Ordering;
use log::{debug, info};
use rand::Rng;
use serde::Deserialize;
use crate::dynamics::{Dynamics, NEventData};
use crate::models::{IDRange, Vector3};
use crate::scheduler::{Event, EventOutcome, EventSource, EventType, NO_PARTICLE};
use crate::simulation::SystemState;
use crate::utils::SimulationError;

fn default_set_point() -> f64 {
    0.05
}

fn default_set_frequency() -> u64 {
    50_000
}

fn all_particles() -> IDRange {
    IDRange::All
}

fn no_crossing() -> EventType {
    EventType::None
}

/// Retunes an Andersen thermostat so its events make up `set_point` of all
/// events, checked every `set_frequency` events.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ThermostatTuning {
    #[serde(default = "default_set_point")]
    pub set_point: f64,
    #[serde(default = "default_set_frequency")]
    pub set_frequency: u64,
}

impl Default for ThermostatTuning {
    fn default() -> Self {
        ThermostatTuning { set_point: default_set_point(), set_frequency: default_set_frequency() }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum SystemKind {
    /// Wakes the output plugins every `period`.
    Ticker { period: f64 },
    /// Stops the run at system time `time`.
    Halt { time: f64 },
    /// Resamples the velocity of a random particle of `range` from a
    /// Maxwell-Boltzmann distribution at `temperature`.
    ///
    /// `mean_free_time` is per particle, the thermostat fires `N` times as often.
    AndersenThermostat {
        #[serde(default = "all_particles")]
        range: IDRange,
        mean_free_time: f64,
        temperature: f64,
        #[serde(default)]
        tune: Option<ThermostatTuning>,
        #[serde(skip)]
        members: Vec<usize>,
        #[serde(skip)]
        thermostat_events: u64,
    },
    /// Rescales every velocity to the temperature `kt` every `period`, then
    /// zeroes the centre-of-mass velocity.
    Rescale { kt: f64, period: f64 },
    /// Harmonic bias `a (r - b)^2` on the distance `r` between the centres
    /// of mass of two particle sets, discretised into steps of `delta_u`.
    ///
    /// `step` counts the steps away from the minimum: negative inside `b`,
    /// positive outside. It is computed from the configuration when absent.
    Umbrella {
        range1: IDRange,
        range2: IDRange,
        a: f64,
        b: f64,
        delta_u: f64,
        #[serde(default)]
        step: Option<i64>,
        #[serde(skip, default = "no_crossing")]
        crossing: EventType,
    },
}

/// Radial bounds `(r_min, r_max)` of an umbrella step.
pub fn umbrella_bounds(a: f64, b: f64, delta_u: f64, step: i64) -> (f64, f64) {
    let offset = |level: i64| (level as f64 * delta_u / a).sqrt();
    match step.cmp(&0) {
        Ordering::Equal => (b - offset(1), b + offset(1)),
        Ordering::Greater => (b + offset(step), b + offset(step + 1)),
        Ordering::Less => (b - offset(1 - step), b - offset(-step)),
    }
}

/// The umbrella step holding the separation `r`.
pub fn umbrella_step(a: f64, b: f64, delta_u: f64, r: f64) -> i64 {
    let level = (a * (r - b) * (r - b) / delta_u).floor() as i64;
    if r < b {
        -level
    } else {
        level
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct System {
    pub name: String,
    /// Time left until the next event.
    #[serde(skip)]
    pub dt: f64,
    #[serde(flatten)]
    pub kind: SystemKind,
}

fn free_time(rng: &mut impl Rng, mean_free_time: f64) -> f64 {
    let uniform: f64 = rng.random();
    -mean_free_time * (1.0 - uniform).ln()
}

impl System {
    pub fn new(name: &str, kind: SystemKind) -> Self {
        System { name: name.to_string(), dt: f64::INFINITY, kind }
    }

    pub fn ticker(name: &str, period: f64) -> Self {
        System::new(name, SystemKind::Ticker { period })
    }

    pub fn halt(name: &str, time: f64) -> Self {
        System::new(name, SystemKind::Halt { time })
    }

    pub fn andersen(name: &str, range: IDRange, mean_free_time: f64, temperature: f64, tune: Option<ThermostatTuning>) -> Self {
        System::new(
            name,
            SystemKind::AndersenThermostat {
                range,
                mean_free_time,
                temperature,
                tune,
                members: Vec::new(),
                thermostat_events: 0,
            },
        )
    }

    pub fn rescale(name: &str, kt: f64, period: f64) -> Self {
        System::new(name, SystemKind::Rescale { kt, period })
    }

    pub fn umbrella(name: &str, range1: IDRange, range2: IDRange, a: f64, b: f64, delta_u: f64) -> Self {
        System::new(
            name,
            SystemKind::Umbrella { range1, range2, a, b, delta_u, step: None, crossing: EventType::None },
        )
    }

    /// Checks the parameters and schedules the first event.
    pub fn initialise(&mut self, dynamics: &Dynamics, state: &mut SystemState) -> Result<(), SimulationError> {
        let name = self.name.as_str();
        let invalid = |what: &str| SimulationError::Configuration(format!("System \"{}\" {}", name, what));
        self.dt = match &mut self.kind {
            SystemKind::Ticker { period } => {
                if !(*period > 0.0) || period.is_infinite() {
                    return Err(invalid("needs a positive, finite period"));
                }
                *period
            }
            SystemKind::Halt { time } => {
                if time.is_nan() {
                    return Err(invalid("has no halt time"));
                }
                *time - state.system_time()
            }
            SystemKind::AndersenThermostat { range, mean_free_time, temperature, tune, members, thermostat_events } => {
                if !(*mean_free_time > 0.0) || !(*temperature > 0.0) {
                    return Err(invalid("needs a positive mean free time and temperature"));
                }
                if let Some(tune) = tune {
                    if !(tune.set_point > 0.0) || tune.set_frequency == 0 {
                        return Err(invalid("has invalid tuning parameters"));
                    }
                }
                if dynamics.has_orientation_data() {
                    return Err(SimulationError::NotImplemented(format!(
                        "Andersen thermostat \"{}\" with orientation data", name
                    )));
                }
                *members = range.iter(state.n()).collect();
                if members.is_empty() {
                    return Err(invalid("acts on no particles"));
                }
                *mean_free_time /= members.len() as f64;
                *thermostat_events = 0;
                free_time(&mut state.context.rng, *mean_free_time)
            }
            SystemKind::Rescale { kt, period } => {
                if !(*kt > 0.0) || !(*period > 0.0) || period.is_infinite() {
                    return Err(invalid("needs a positive temperature and a positive, finite period"));
                }
                *period
            }
            SystemKind::Umbrella { range1, range2, a, b, delta_u, step, .. } => {
                if !(*a > 0.0) || !(*b >= 0.0) || !(*delta_u > 0.0) {
                    return Err(invalid("needs a positive a and delta_u and a non-negative b"));
                }
                let n = state.n();
                if range1.iter(n).next().is_none() || range2.iter(n).next().is_none() {
                    return Err(invalid("acts on an empty range"));
                }
                if step.is_none() {
                    let r = dynamics.range_separation(state, range1, range2);
                    *step = Some(umbrella_step(*a, *b, *delta_u, r));
                }
                f64::INFINITY
            }
        };
        self.recalculate(dynamics, state);
        debug!("System \"{}\" first fires in {}", self.name, self.dt);
        Ok(())
    }

    /// Re-predicts an umbrella crossing from the current state. The particles
    /// of both ranges must be up to date.
    pub fn recalculate(&mut self, dynamics: &Dynamics, state: &SystemState) {
        if let SystemKind::Umbrella { range1, range2, a, b, delta_u, step: Some(step), crossing } = &mut self.kind {
            let (r_min, r_max) = umbrella_bounds(*a, *b, *delta_u, *step);
            self.dt = f64::INFINITY;
            *crossing = EventType::None;
            if r_min > 0.0 {
                let dt = dynamics.sphere_sphere_in_root_ranges(state, range1, range2, r_min);
                if dt < self.dt {
                    self.dt = dt;
                    *crossing = EventType::StepIn;
                }
            }
            let dt = dynamics.sphere_sphere_out_root_ranges(state, range1, range2, r_max);
            if dt < self.dt {
                self.dt = dt;
                *crossing = EventType::StepOut;
            }
        }
    }

    /// Re-predicts the event if it depends on any of the `changed` particles.
    ///
    /// Returns whether the event was re-predicted.
    pub fn particles_updated(
        &mut self,
        dynamics: &mut Dynamics,
        state: &mut SystemState,
        changed: &[usize],
    ) -> Result<bool, SimulationError> {
        let members: Vec<usize> = match &self.kind {
            SystemKind::Umbrella { range1, range2, .. } => {
                if !changed.iter().any(|&p| range1.contains(p) || range2.contains(p)) {
                    return Ok(false);
                }
                range1.iter(state.n()).chain(range2.iter(state.n())).collect()
            }
            _ => return Ok(false),
        };
        for p in members {
            dynamics.update_particle_id(state, p)?;
        }
        self.recalculate(dynamics, state);
        Ok(true)
    }

    /// Moves the system clock forward by `dt`.
    ///
    /// A tuned thermostat also adjusts its mean free time here, so the
    /// adjustment happens at the same event count in every run.
    pub fn stream(&mut self, dt: f64, state: &mut SystemState) {
        self.dt -= dt;
        if let SystemKind::AndersenThermostat { mean_free_time, tune: Some(tune), thermostat_events, .. } = &mut self.kind {
            let event_count = state.context.event_count;
            if event_count != 0 && event_count % tune.set_frequency == 0 && *thermostat_events != 0 {
                *mean_free_time *= *thermostat_events as f64 / (tune.set_frequency as f64 * tune.set_point);
                self.dt = free_time(&mut state.context.rng, *mean_free_time);
                *thermostat_events = 0;
                debug!("Thermostat \"{}\" retuned to a mean free time of {}", self.name, mean_free_time);
            }
        }
    }

    pub fn event_type(&self) -> EventType {
        match self.kind {
            SystemKind::Ticker { .. } => EventType::NonEvent,
            SystemKind::Halt { .. } => EventType::Halt,
            SystemKind::AndersenThermostat { .. } => EventType::Gaussian,
            SystemKind::Rescale { .. } => EventType::Rescale,
            SystemKind::Umbrella { crossing, .. } => crossing,
        }
    }

    pub fn get_event(&self, id: usize) -> Event {
        if self.dt == f64::INFINITY {
            Event::new(f64::INFINITY, NO_PARTICLE, None, EventSource::System, id, EventType::None)
        } else {
            Event::system(self.dt, id, self.event_type())
        }
    }

    /// Runs the due event. The system time must already be at the event.
    pub fn run_event(&mut self, dynamics: &mut Dynamics, state: &mut SystemState) -> Result<EventOutcome, SimulationError> {
        let outcome = match &mut self.kind {
            SystemKind::Ticker { period } => {
                self.dt += *period;
                EventOutcome::empty()
            }
            SystemKind::Halt { .. } => {
                self.dt = f64::INFINITY;
                info!("Halt \"{}\" reached at time {}", self.name, state.system_time());
                EventOutcome::empty()
            }
            SystemKind::AndersenThermostat { mean_free_time, temperature, members, thermostat_events, .. } => {
                *thermostat_events += 1;
                self.dt = free_time(&mut state.context.rng, *mean_free_time);
                let p = members[state.context.rng.random_range(0..members.len())];
                dynamics.update_particle_id(state, p)?;
                let data = dynamics.random_gaussian_event(state, p, temperature.sqrt(), 3)?;
                EventOutcome::new(NEventData::from_single(data))
            }
            SystemKind::Rescale { kt, period } => {
                self.dt += *period;
                dynamics.update_all_particles(state);
                let current = dynamics.kt(state);
                if current > 0.0 {
                    dynamics.rescale_system_kinetic_energy(state, *kt / current);
                    dynamics.set_com_velocity(state, Vector3::zero());
                    debug!("Rescaled kT from {} to {}", current, kt);
                }
                EventOutcome::empty().rebuilding()
            }
            SystemKind::Umbrella { range1, range2, delta_u, step, crossing, .. } => {
                let current = step.ok_or_else(|| {
                    SimulationError::InvalidState(format!("Umbrella \"{}\" was never initialised", self.name))
                })?;
                let next = match *crossing {
                    EventType::StepIn => current - 1,
                    EventType::StepOut => current + 1,
                    other => {
                        return Err(SimulationError::InvalidState(format!(
                            "Umbrella \"{}\" fired a {} event", self.name, other
                        )))
                    }
                };
                let n = state.n();
                for p in range1.iter(n).chain(range2.iter(n)) {
                    dynamics.update_particle_id(state, p)?;
                }
                let delta_ke = -((next.abs() - current.abs()) as f64) * *delta_u;
                let data = dynamics.multibody_well_event(state, range1, range2, delta_ke, *crossing)?;
                if data.single.iter().all(|record| record.event_type != EventType::Bounce) {
                    *step = Some(next);
                }
                debug!("Umbrella \"{}\" on step {:?}", self.name, step);
                EventOutcome::new(data)
            }
        };
        self.recalculate(dynamics, state);
        Ok(outcome)
    }
}
