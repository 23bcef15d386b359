//! Pair interactions: the shape or potential acting on the particle pairs of
//! an [`IDPairRange`].
//!
//! Every interaction predicts the next event of a pair and runs it through
//! the [`Dynamics`] responses. Square wells and thin rods also remember which
//! pairs are currently inside their outer shell.

use std::collections::BTreeSet;
use log::debug;
use serde::Deserialize;
use crate::dynamics::{Dynamics, NEventData};
use crate::intersection::RootSearch;
use crate::models::IDPairRange;
use crate::scheduler::{Event, EventOutcome, EventSource, EventType};
use crate::simulation::SystemState;
use crate::utils::SimulationError;

fn elastic() -> f64 {
    1.0
}

/// Ordered key of a captured pair.
#[inline]
fn pair_key(p1: usize, p2: usize) -> (usize, usize) {
    (p1.min(p2), p1.max(p2))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum InteractionKind {
    /// Hard spheres, rough when `tangential_elasticity` is set.
    HardSphere {
        diameter: f64,
        #[serde(default = "elastic")]
        elasticity: f64,
        #[serde(default)]
        tangential_elasticity: Option<f64>,
    },
    /// Hard core of `diameter` inside an attractive well of `lambda * diameter`.
    SquareWell {
        diameter: f64,
        lambda: f64,
        well_depth: f64,
        #[serde(default = "elastic")]
        elasticity: f64,
        #[serde(skip)]
        captured: BTreeSet<(usize, usize)>,
    },
    /// Aligned cubes of side `width`.
    ParallelCubes {
        width: f64,
        #[serde(default = "elastic")]
        elasticity: f64,
    },
    /// Infinitely thin rods of `length`. Pairs closer than `length` are captured.
    Lines {
        length: f64,
        #[serde(default = "elastic")]
        elasticity: f64,
        #[serde(skip)]
        captured: BTreeSet<(usize, usize)>,
    },
    /// Claims its pairs without ever interacting.
    Null,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Interaction {
    pub name: String,
    pub range: IDPairRange,
    #[serde(flatten)]
    pub kind: InteractionKind,
}

impl Interaction {
    pub fn new(name: &str, range: IDPairRange, kind: InteractionKind) -> Self {
        Interaction { name: name.to_string(), range, kind }
    }

    pub fn hard_sphere(name: &str, range: IDPairRange, diameter: f64, elasticity: f64) -> Self {
        Interaction::new(name, range, InteractionKind::HardSphere { diameter, elasticity, tangential_elasticity: None })
    }

    pub fn rough_hard_sphere(name: &str, range: IDPairRange, diameter: f64, elasticity: f64, tangential_elasticity: f64) -> Self {
        Interaction::new(
            name,
            range,
            InteractionKind::HardSphere { diameter, elasticity, tangential_elasticity: Some(tangential_elasticity) },
        )
    }

    pub fn square_well(name: &str, range: IDPairRange, diameter: f64, lambda: f64, well_depth: f64, elasticity: f64) -> Self {
        Interaction::new(
            name,
            range,
            InteractionKind::SquareWell { diameter, lambda, well_depth, elasticity, captured: BTreeSet::new() },
        )
    }

    pub fn parallel_cubes(name: &str, range: IDPairRange, width: f64, elasticity: f64) -> Self {
        Interaction::new(name, range, InteractionKind::ParallelCubes { width, elasticity })
    }

    pub fn lines(name: &str, range: IDPairRange, length: f64, elasticity: f64) -> Self {
        Interaction::new(name, range, InteractionKind::Lines { length, elasticity, captured: BTreeSet::new() })
    }

    pub fn null(name: &str, range: IDPairRange) -> Self {
        Interaction::new(name, range, InteractionKind::Null)
    }

    /// Largest centre separation at which the interaction can produce an event.
    pub fn max_interaction_distance(&self) -> f64 {
        match &self.kind {
            InteractionKind::HardSphere { diameter, .. } => *diameter,
            InteractionKind::SquareWell { diameter, lambda, .. } => diameter * lambda,
            InteractionKind::ParallelCubes { width, .. } => width * 3f64.sqrt(),
            InteractionKind::Lines { length, .. } => *length,
            InteractionKind::Null => 0.0,
        }
    }

    /// Checks the parameters and rebuilds the capture map from the current
    /// positions. Expects every particle to be up to date.
    pub fn initialise(&mut self, dynamics: &Dynamics, state: &SystemState) -> Result<(), SimulationError> {
        self.check_parameters(dynamics)?;
        let n = state.n();
        let range = &self.range;
        match &mut self.kind {
            InteractionKind::SquareWell { diameter, lambda, captured, .. } => {
                let well = *diameter * *lambda;
                captured.clear();
                for p1 in 0..n {
                    for p2 in (p1 + 1)..n {
                        if range.contains_pair(p1, p2) && dynamics.sphere_overlap(state, p1, p2, well) > 0.0 {
                            captured.insert((p1, p2));
                        }
                    }
                }
                debug!("Square well \"{}\" starts with {} captured pairs", self.name, captured.len());
            }
            InteractionKind::Lines { length, captured, .. } => {
                captured.clear();
                for p1 in 0..n {
                    for p2 in (p1 + 1)..n {
                        if range.contains_pair(p1, p2) && dynamics.sphere_overlap(state, p1, p2, *length) > 0.0 {
                            captured.insert((p1, p2));
                        }
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn check_parameters(&self, dynamics: &Dynamics) -> Result<(), SimulationError> {
        let invalid = |what: &str| {
            Err(SimulationError::Configuration(format!("Interaction \"{}\" has an invalid {}", self.name, what)))
        };
        let elasticity = match &self.kind {
            InteractionKind::HardSphere { diameter, elasticity, tangential_elasticity } => {
                if !(*diameter > 0.0) {
                    return invalid("diameter");
                }
                if let Some(et) = tangential_elasticity {
                    if !(-1.0..=1.0).contains(et) {
                        return invalid("tangential elasticity");
                    }
                    if !dynamics.has_orientation_data() {
                        return Err(SimulationError::Configuration(format!(
                            "Rough hard spheres \"{}\" need orientation data", self.name
                        )));
                    }
                }
                *elasticity
            }
            InteractionKind::SquareWell { diameter, lambda, well_depth, elasticity, .. } => {
                if !(*diameter > 0.0) {
                    return invalid("diameter");
                }
                if !(*lambda > 1.0) {
                    return invalid("well width (lambda must exceed 1)");
                }
                if !well_depth.is_finite() {
                    return invalid("well depth");
                }
                *elasticity
            }
            InteractionKind::ParallelCubes { width, elasticity } => {
                if !(*width > 0.0) {
                    return invalid("width");
                }
                *elasticity
            }
            InteractionKind::Lines { length, elasticity, .. } => {
                if !(*length > 0.0) {
                    return invalid("length");
                }
                if !dynamics.has_orientation_data() {
                    return Err(SimulationError::Configuration(format!(
                        "Line interaction \"{}\" needs orientation data", self.name
                    )));
                }
                *elasticity
            }
            InteractionKind::Null => 1.0,
        };
        if !(0.0..=1.0).contains(&elasticity) {
            return invalid("elasticity");
        }
        Ok(())
    }

    pub fn is_captured(&self, p1: usize, p2: usize) -> bool {
        match &self.kind {
            InteractionKind::SquareWell { captured, .. } | InteractionKind::Lines { captured, .. } => {
                captured.contains(&pair_key(p1, p2))
            }
            _ => false,
        }
    }

    /// Configurational energy stored in the interaction.
    pub fn internal_energy(&self) -> f64 {
        match &self.kind {
            InteractionKind::SquareWell { well_depth, captured, .. } => -well_depth * captured.len() as f64,
            _ => 0.0,
        }
    }

    /// Next event of the pair. Both particles must be up to date.
    pub fn get_event(
        &self,
        dynamics: &Dynamics,
        state: &SystemState,
        p1: usize,
        p2: usize,
        id: usize,
    ) -> Result<Event, SimulationError> {
        let never = Event::none(p1, Some(p2), EventSource::Interaction, id);
        let event = |dt: f64, event_type: EventType| {
            if dt.is_infinite() {
                never
            } else {
                Event::interaction(dt, p1, p2, id, event_type)
            }
        };

        Ok(match &self.kind {
            InteractionKind::HardSphere { diameter, .. } => {
                event(dynamics.sphere_sphere_in_root(state, p1, p2, *diameter), EventType::Core)
            }
            InteractionKind::SquareWell { diameter, lambda, .. } => {
                if self.is_captured(p1, p2) {
                    let core = dynamics.sphere_sphere_in_root(state, p1, p2, *diameter);
                    let release = dynamics.sphere_sphere_out_root(state, p1, p2, diameter * lambda);
                    if core < release {
                        event(core, EventType::Core)
                    } else {
                        event(release, EventType::StepOut)
                    }
                } else {
                    event(dynamics.sphere_sphere_in_root(state, p1, p2, diameter * lambda), EventType::StepIn)
                }
            }
            InteractionKind::ParallelCubes { width, .. } => {
                event(dynamics.cube_cube_in_root(state, p1, p2, *width), EventType::Core)
            }
            InteractionKind::Lines { length, .. } => {
                if self.is_captured(p1, p2) {
                    let release = dynamics.sphere_sphere_out_root(state, p1, p2, *length);
                    match dynamics.line_line_collision(state, p1, p2, *length, release)? {
                        RootSearch::Found(t) => event(t, EventType::Core),
                        RootSearch::Recheck(t) => event(t, EventType::Recalculate),
                        RootSearch::Never => event(release, EventType::NbhoodOut),
                    }
                } else {
                    event(dynamics.sphere_sphere_in_root(state, p1, p2, *length), EventType::NbhoodIn)
                }
            }
            InteractionKind::Null => never,
        })
    }

    /// Applies the response of `event`, which this interaction predicted.
    pub fn run_event(
        &mut self,
        dynamics: &mut Dynamics,
        state: &mut SystemState,
        event: &Event,
    ) -> Result<EventOutcome, SimulationError> {
        let p1 = event.particle1;
        let p2 = event.particle2.ok_or_else(|| {
            SimulationError::InvalidState(format!("Interaction \"{}\" was handed a single-particle event", self.name))
        })?;
        let unexpected = || {
            Err(SimulationError::InvalidState(format!(
                "Interaction \"{}\" cannot run a {} event", self.name, event.event_type
            )))
        };

        match (&mut self.kind, event.event_type) {
            (InteractionKind::HardSphere { diameter, elasticity, tangential_elasticity }, EventType::Core) => {
                let data = match tangential_elasticity {
                    Some(et) => dynamics.rough_spheres_collision(state, p1, p2, *elasticity, *et, *diameter, *diameter, EventType::Core)?,
                    None => dynamics.smooth_spheres_collision(state, p1, p2, *elasticity, EventType::Core)?,
                };
                Ok(EventOutcome::new(NEventData::from_pair(data)))
            }
            (InteractionKind::SquareWell { elasticity, .. }, EventType::Core) => {
                let data = dynamics.smooth_spheres_collision(state, p1, p2, *elasticity, EventType::Core)?;
                Ok(EventOutcome::new(NEventData::from_pair(data)))
            }
            (InteractionKind::SquareWell { well_depth, captured, .. }, EventType::StepIn) => {
                let data = dynamics.sphere_well_event(state, p1, p2, *well_depth, EventType::StepIn)?;
                if data.event_type != EventType::Bounce {
                    captured.insert(pair_key(p1, p2));
                }
                Ok(EventOutcome::new(NEventData::from_pair(data)))
            }
            (InteractionKind::SquareWell { well_depth, captured, .. }, EventType::StepOut) => {
                let data = dynamics.sphere_well_event(state, p1, p2, -*well_depth, EventType::StepOut)?;
                if data.event_type != EventType::Bounce {
                    captured.remove(&pair_key(p1, p2));
                }
                Ok(EventOutcome::new(NEventData::from_pair(data)))
            }
            (InteractionKind::ParallelCubes { elasticity, .. }, EventType::Core) => {
                let data = dynamics.parallel_cube_collision(state, p1, p2, *elasticity, EventType::Core)?;
                Ok(EventOutcome::new(NEventData::from_pair(data)))
            }
            (InteractionKind::Lines { elasticity, .. }, EventType::Core) => {
                let data = dynamics.run_line_line_collision(state, p1, p2, *elasticity, EventType::Core)?;
                Ok(EventOutcome::new(NEventData::from_pair(data)))
            }
            (InteractionKind::Lines { captured, .. }, EventType::NbhoodIn) => {
                captured.insert(pair_key(p1, p2));
                Ok(EventOutcome::empty())
            }
            (InteractionKind::Lines { captured, .. }, EventType::NbhoodOut) => {
                captured.remove(&pair_key(p1, p2));
                Ok(EventOutcome::empty())
            }
            (InteractionKind::Lines { .. }, EventType::Recalculate) => Ok(EventOutcome::empty()),
            _ => unexpected(),
        }
    }

    /// Describes an inconsistency of the pair with this interaction, if any.
    pub fn validate_state(&self, dynamics: &Dynamics, state: &SystemState, p1: usize, p2: usize) -> Option<String> {
        let tolerance = state.config.overlap_tolerance;
        match &self.kind {
            InteractionKind::HardSphere { diameter, .. } => {
                let overlap = dynamics.sphere_overlap(state, p1, p2, *diameter);
                (overlap > tolerance * diameter).then(|| {
                    format!("Particles {} and {} overlap in \"{}\" by {}", p1, p2, self.name, overlap)
                })
            }
            InteractionKind::SquareWell { diameter, lambda, .. } => {
                let well = diameter * lambda;
                let overlap = dynamics.sphere_overlap(state, p1, p2, *diameter);
                let distance = dynamics.pair_state(state, p1, p2).rij.nrm();
                let captured = self.is_captured(p1, p2);
                if overlap > tolerance * diameter {
                    Some(format!("Particles {} and {} overlap the core of \"{}\" by {}", p1, p2, self.name, overlap))
                } else if captured && distance > well * (1.0 + tolerance) {
                    Some(format!(
                        "Particles {} and {} are captured by \"{}\" but {} apart", p1, p2, self.name, distance
                    ))
                } else if !captured && distance < well * (1.0 - tolerance) {
                    Some(format!(
                        "Particles {} and {} are inside the well of \"{}\" but not captured", p1, p2, self.name
                    ))
                } else {
                    None
                }
            }
            InteractionKind::ParallelCubes { width, .. } => {
                let overlap = dynamics.cube_overlap(state, p1, p2, *width);
                (overlap > tolerance * width).then(|| {
                    format!("Cubes {} and {} overlap in \"{}\" by {}", p1, p2, self.name, overlap)
                })
            }
            InteractionKind::Lines { length, .. } => {
                let distance = dynamics.pair_state(state, p1, p2).rij.nrm();
                (self.is_captured(p1, p2) && distance > length * (1.0 + tolerance)).then(|| {
                    format!("Rods {} and {} are captured by \"{}\" but {} apart", p1, p2, self.name, distance)
                })
            }
            InteractionKind::Null => None,
        }
    }
}
