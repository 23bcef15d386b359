use log::{debug, info};
use serde::Serialize;
use crate::dynamics::{Dynamics, DynamicsKind, RotationalState};
use crate::globals::Global;
use crate::interactions::Interaction;
use crate::locals::Local;
use crate::models::{BoundaryCondition, Particle, Species};
use crate::scheduler::{Event, EventOutcome, EventSource, EventType, Scheduler};
use crate::simulation::{OutputPlugin, SimulationView, SystemState, World};
use crate::systems::System;
use crate::utils::{SimulationConfig, SimulationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SimulationStatus {
    /// Still being configured.
    Uninitialised,
    Initialised,
    Running,
    /// Stopped by a halt event.
    Halted,
}

/// State of the simulation at one instant, every particle brought up to date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub system_time: f64,
    pub event_count: u64,
    pub kinetic_energy: f64,
    pub internal_energy: f64,
    pub kt: f64,
    pub particles: Vec<Particle>,
}

/// The event-driven simulation: the world, its scheduler and the output plugins.
///
/// Configure it with the `add_*` methods, call [`Simulation::initialise`] once
/// and pump events with [`Simulation::run_next_event`] or [`Simulation::run`].
pub struct Simulation {
    world: World,
    scheduler: Scheduler,
    plugins: Vec<Box<dyn OutputPlugin>>,
    status: SimulationStatus,
}

impl Simulation {
    pub fn new(config: SimulationConfig, boundary: BoundaryCondition, kind: DynamicsKind) -> Self {
        let mut state = SystemState::new(config);
        state.boundary = boundary;
        Simulation {
            world: World::new(state, Dynamics::new(kind)),
            scheduler: Scheduler::new(config.scheduler),
            plugins: Vec::new(),
            status: SimulationStatus::Uninitialised,
        }
    }

    fn check_configurable(&self, what: &str) -> Result<(), SimulationError> {
        if self.status != SimulationStatus::Uninitialised {
            return Err(SimulationError::InvalidState(format!(
                "Cannot add {} to an initialised simulation",
                what
            )));
        }
        Ok(())
    }

    /// Appends a particle and returns its ID.
    pub fn add_particle(&mut self, mut particle: Particle) -> Result<usize, SimulationError> {
        self.check_configurable("a particle")?;
        let id = self.world.state.n();
        particle.id = id;
        self.world.state.particles.push(particle);
        Ok(id)
    }

    pub fn add_species(&mut self, species: Species) -> Result<(), SimulationError> {
        self.check_configurable("a species")?;
        self.world.state.species.push(species);
        Ok(())
    }

    pub fn add_interaction(&mut self, interaction: Interaction) -> Result<(), SimulationError> {
        self.check_configurable("an interaction")?;
        self.world.interactions.push(interaction);
        Ok(())
    }

    pub fn add_local(&mut self, local: Local) -> Result<(), SimulationError> {
        self.check_configurable("a local")?;
        self.world.locals.push(local);
        Ok(())
    }

    pub fn add_global(&mut self, global: Global) -> Result<(), SimulationError> {
        self.check_configurable("a global")?;
        self.world.globals.push(global);
        Ok(())
    }

    pub fn add_system(&mut self, system: System) -> Result<(), SimulationError> {
        self.check_configurable("a system")?;
        self.world.systems.push(system);
        Ok(())
    }

    /// Plugins added after initialisation are initialised straight away.
    pub fn add_plugin(&mut self, mut plugin: Box<dyn OutputPlugin>) {
        if self.status != SimulationStatus::Uninitialised {
            plugin.initialise(&SimulationView::new(&self.world.state, &self.world.dynamics));
        }
        self.plugins.push(plugin);
    }

    pub fn set_orientations(&mut self, states: Vec<RotationalState>) -> Result<(), SimulationError> {
        self.check_configurable("orientation data")?;
        self.world.dynamics.set_orientations(states);
        Ok(())
    }

    /// Gives every particle a random orientation and angular velocity at temperature `t_oi`.
    pub fn init_orientations(&mut self, t_oi: f64) -> Result<(), SimulationError> {
        self.check_configurable("orientation data")?;
        self.world.dynamics.init_orientations(&mut self.world.state, t_oi);
        Ok(())
    }

    /// Validates the configuration, prepares every event source and predicts
    /// the first events.
    pub fn initialise(&mut self) -> Result<(), SimulationError> {
        if self.status != SimulationStatus::Uninitialised {
            return Err(SimulationError::InvalidState("The simulation is already initialised".to_string()));
        }
        self.world.state.config.validate()?;
        self.world.initialise()?;
        self.scheduler.initialise(&mut self.world)?;

        let view = SimulationView::new(&self.world.state, &self.world.dynamics);
        for plugin in self.plugins.iter_mut() {
            plugin.initialise(&view);
        }
        self.status = SimulationStatus::Initialised;
        info!(
            "Simulation initialised: KE {}, U {}",
            self.world.dynamics.system_kinetic_energy(&self.world.state),
            self.world.state.internal_energy
        );
        Ok(())
    }

    /// Dispatches one event and notifies the plugins.
    pub fn run_next_event(&mut self) -> Result<(Event, EventOutcome), SimulationError> {
        match self.status {
            SimulationStatus::Uninitialised => {
                return Err(SimulationError::InvalidState("The simulation is not initialised".to_string()))
            }
            SimulationStatus::Halted => {
                return Err(SimulationError::InvalidState("The simulation has halted".to_string()))
            }
            _ => self.status = SimulationStatus::Running,
        }

        let (event, outcome) = self.scheduler.run_next_event(&mut self.world)?;

        let view = SimulationView::new(&self.world.state, &self.world.dynamics);
        let is_tick = event.source == EventSource::System && event.event_type == EventType::NonEvent;
        for plugin in self.plugins.iter_mut() {
            plugin.event_update(&event, &outcome.data, &view);
            if is_tick {
                plugin.ticker(&view);
            }
        }
        if event.event_type == EventType::Halt {
            self.status = SimulationStatus::Halted;
        }
        Ok((event, outcome))
    }

    /// Runs until `end_event_count` events have been dispatched in total or a
    /// halt event fires. Returns the number of events run by this call.
    pub fn run(&mut self, end_event_count: u64) -> Result<u64, SimulationError> {
        let start = self.event_count();
        while self.status != SimulationStatus::Halted && self.event_count() < end_event_count {
            self.run_next_event()?;
        }
        let ran = self.event_count() - start;
        debug!("Ran {} events, now at time {}", ran, self.system_time());
        Ok(ran)
    }

    /// Moves the clock forward by `dt`. Fails if an event would be skipped.
    pub fn stream(&mut self, dt: f64) -> Result<(), SimulationError> {
        if self.status == SimulationStatus::Uninitialised {
            return Err(SimulationError::InvalidState("The simulation is not initialised".to_string()));
        }
        self.scheduler.stream(&mut self.world, dt)
    }

    pub fn get_interaction(&self, p1: usize, p2: usize) -> Result<&Interaction, SimulationError> {
        self.world.get_interaction(p1, p2).map(|(_, interaction)| interaction)
    }

    /// Logs every overlap of the current configuration; returns how many were found.
    pub fn system_overlap_test(&mut self) -> usize {
        self.world.system_overlap_test()
    }

    pub fn check_interaction_coverage(&self) -> Result<(), SimulationError> {
        self.world.check_interaction_coverage()
    }

    pub fn kinetic_energy(&mut self) -> f64 {
        self.world.dynamics.update_all_particles(&mut self.world.state);
        self.world.dynamics.system_kinetic_energy(&self.world.state)
    }

    pub fn kt(&mut self) -> f64 {
        self.world.dynamics.update_all_particles(&mut self.world.state);
        self.world.dynamics.kt(&self.world.state)
    }

    pub fn internal_energy(&self) -> f64 {
        self.world.state.internal_energy
    }

    pub fn snapshot(&mut self) -> Snapshot {
        let kinetic_energy = self.kinetic_energy();
        Snapshot {
            system_time: self.system_time(),
            event_count: self.event_count(),
            kinetic_energy,
            internal_energy: self.internal_energy(),
            kt: self.world.dynamics.kt(&self.world.state),
            particles: self.world.state.particles.clone(),
        }
    }

    pub fn status(&self) -> SimulationStatus {
        self.status
    }

    pub fn system_time(&self) -> f64 {
        self.world.state.system_time()
    }

    pub fn event_count(&self) -> u64 {
        self.world.state.context.event_count
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn state(&self) -> &SystemState {
        &self.world.state
    }

    pub fn dynamics(&self) -> &Dynamics {
        &self.world.dynamics
    }

    /// Particles as of their last update, see [`Simulation::snapshot`] for current values.
    pub fn particles(&self) -> &[Particle] {
        &self.world.state.particles
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Absolute time of the next queued event.
    pub fn next_event_time(&mut self) -> Option<f64> {
        self.scheduler.peek().map(|(time, _)| time)
    }

    /// Next event time predicted from scratch, to check the scheduler against.
    pub fn brute_force_next_time(&self) -> Result<f64, SimulationError> {
        self.scheduler.brute_force_next_time(&self.world)
    }

    pub fn plugins(&self) -> &[Box<dyn OutputPlugin>] {
        &self.plugins
    }

    /// The first plugin of type `T`.
    pub fn plugin<T: OutputPlugin>(&self) -> Option<&T> {
        self.plugins.iter().find_map(|plugin| plugin.as_any().downcast_ref::<T>())
    }
}
