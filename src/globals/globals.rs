//! Globals: single-particle event sources that act everywhere in the system.
//!
//! The neighbour cell list lets the scheduler test only nearby pairs, the
//! sentinels force a particle to be re-predicted before the minimum image
//! convention or a parabolic trajectory could hide one of its events.

use log::{debug, info};
use serde::Deserialize;
use crate::dynamics::{Dynamics, DynamicsKind};
use crate::models::{BoundaryCondition, IDRange, Vector3};
use crate::scheduler::{Event, EventOutcome, EventSource, EventType};
use crate::simulation::SystemState;
use crate::utils::{SimulationError, NDIM};

/// Cubic cells of the periodic box, each at least as wide as the longest
/// interaction distance.
///
/// Under Lees-Edwards boundaries the images above and below slide along `x`,
/// so a cell in the top or bottom layer neighbours the whole `x` row of the
/// opposite layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellList {
    dims: [usize; NDIM],
    width: Vector3,
    primary_cell: Vector3,
    shearing: bool,
    cell_of: Vec<usize>,
    members: Vec<Vec<usize>>,
}

impl CellList {
    fn build(boundary: &BoundaryCondition, max_distance: f64, n: usize) -> Result<Self, SimulationError> {
        let primary_cell = match boundary {
            BoundaryCondition::Periodic { primary_cell } | BoundaryCondition::LeesEdwards { primary_cell, .. } => {
                *primary_cell
            }
            BoundaryCondition::None => {
                return Err(SimulationError::Configuration(
                    "Neighbour cells need a periodic boundary".to_string(),
                ))
            }
        };
        if !(max_distance > 0.0) {
            return Err(SimulationError::Configuration(
                "Neighbour cells need a positive interaction distance".to_string(),
            ));
        }

        let mut dims = [0; NDIM];
        let mut width = Vector3::zero();
        for dim in 0..NDIM {
            let count = (primary_cell[dim] / max_distance).floor();
            if count < 3.0 {
                return Err(SimulationError::Configuration(format!(
                    "The box is too small for a cell list: {} cells along dimension {}",
                    count, dim
                )));
            }
            dims[dim] = count as usize;
            width[dim] = primary_cell[dim] / count;
        }

        let total = dims.iter().product();
        Ok(CellList {
            dims,
            width,
            primary_cell,
            shearing: boundary.is_shearing(),
            cell_of: vec![0; n],
            members: vec![Vec::new(); total],
        })
    }

    pub fn dims(&self) -> [usize; NDIM] {
        self.dims
    }

    pub fn width(&self) -> Vector3 {
        self.width
    }

    pub fn cell_count(&self) -> usize {
        self.members.len()
    }

    pub fn cell_of(&self, p: usize) -> Option<usize> {
        self.cell_of.get(p).copied()
    }

    pub fn coords(&self, cell: usize) -> [usize; NDIM] {
        let [nx, ny, _] = self.dims;
        [cell % nx, (cell / nx) % ny, cell / (nx * ny)]
    }

    fn index(&self, coords: [usize; NDIM]) -> usize {
        let [nx, ny, _] = self.dims;
        coords[0] + nx * (coords[1] + ny * coords[2])
    }

    /// Cell holding a position inside the primary image.
    fn locate(&self, position: &Vector3) -> usize {
        let mut coords = [0; NDIM];
        for dim in 0..NDIM {
            let offset = ((position[dim] + 0.5 * self.primary_cell[dim]) / self.width[dim]).floor();
            coords[dim] = (offset.max(0.0) as usize).min(self.dims[dim] - 1);
        }
        self.index(coords)
    }

    /// Lower corner of a cell.
    pub fn origin(&self, cell: usize) -> Vector3 {
        let coords = self.coords(cell);
        let mut origin = self.primary_cell * -0.5;
        for dim in 0..NDIM {
            origin[dim] += coords[dim] as f64 * self.width[dim];
        }
        origin
    }

    pub fn members(&self, cell: usize) -> &[usize] {
        &self.members[cell]
    }

    fn insert(&mut self, p: usize, cell: usize) {
        self.cell_of[p] = cell;
        self.members[cell].push(p);
    }

    fn remove(&mut self, p: usize) {
        let cell = self.cell_of[p];
        if let Some(slot) = self.members[cell].iter().position(|&q| q == p) {
            self.members[cell].swap_remove(slot);
        }
    }

    /// Particles in the 27 cells around the cell of `p`, ascending, without `p`.
    pub fn neighbours(&self, p: usize) -> Vec<usize> {
        let centre = self.coords(self.cell_of[p]);
        let mut result = Vec::new();
        for dz in 0..3 {
            for dy in 0..3 {
                for dx in 0..3 {
                    let shift = [dx, dy, dz];
                    let mut coords = [0; NDIM];
                    for dim in 0..NDIM {
                        coords[dim] = (centre[dim] + self.dims[dim] + shift[dim] - 1) % self.dims[dim];
                    }
                    result.extend(self.members[self.index(coords)].iter().copied().filter(|&q| q != p));
                }
            }
        }

        let [nx, ny, nz] = self.dims;
        if self.shearing && (centre[1] == 0 || centre[1] == ny - 1) {
            let y = if centre[1] == 0 { ny - 1 } else { 0 };
            for dz in 0..3 {
                let z = (centre[2] + nz + dz - 1) % nz;
                for x in 0..nx {
                    result.extend(self.members[self.index([x, y, z])].iter().copied().filter(|&q| q != p));
                }
            }
        }
        result.sort_unstable();
        result.dedup();
        result
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum GlobalKind {
    /// Re-predicts particles before they travel far enough for the minimum
    /// image of a pair to change.
    PbcSentinel {
        #[serde(skip)]
        max_distance: f64,
    },
    /// Stops particles at the apex of their parabola under gravity.
    ParabolaSentinel,
    /// Neighbour cell list, filled at initialisation.
    Cells {
        #[serde(skip)]
        list: CellList,
    },
}

fn all_particles() -> IDRange {
    IDRange::All
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Global {
    pub name: String,
    #[serde(default = "all_particles")]
    pub range: IDRange,
    #[serde(flatten)]
    pub kind: GlobalKind,
}

impl Global {
    pub fn new(name: &str, range: IDRange, kind: GlobalKind) -> Self {
        Global { name: name.to_string(), range, kind }
    }

    pub fn pbc_sentinel(name: &str) -> Self {
        Global::new(name, IDRange::All, GlobalKind::PbcSentinel { max_distance: 0.0 })
    }

    pub fn parabola_sentinel(name: &str) -> Self {
        Global::new(name, IDRange::All, GlobalKind::ParabolaSentinel)
    }

    pub fn cells(name: &str) -> Self {
        Global::new(name, IDRange::All, GlobalKind::Cells { list: CellList::default() })
    }

    /// Checks the global against the boundary and dynamics. The cell list also
    /// wraps every particle into the primary image and sorts it into a cell.
    pub fn initialise(
        &mut self,
        dynamics: &mut Dynamics,
        state: &mut SystemState,
        max_distance: f64,
    ) -> Result<(), SimulationError> {
        match &mut self.kind {
            GlobalKind::PbcSentinel { max_distance: stored } => {
                if let Some(cell) = state.boundary.primary_cell() {
                    if 0.5 * cell.min_element() - max_distance <= 0.0 {
                        return Err(SimulationError::Configuration(format!(
                            "Sentinel \"{}\": the box is too small for interaction distance {}",
                            self.name, max_distance
                        )));
                    }
                }
                *stored = max_distance;
            }
            GlobalKind::ParabolaSentinel => {
                if !matches!(dynamics.kind, DynamicsKind::NewtonianGravity { .. }) {
                    return Err(SimulationError::Configuration(format!(
                        "Parabola sentinel \"{}\" needs gravity dynamics, not {}",
                        self.name,
                        dynamics.kind.tag()
                    )));
                }
            }
            GlobalKind::Cells { list } => {
                let mut cells = CellList::build(&state.boundary, max_distance, state.n())?;
                let system_time = state.system_time();
                for particle in state.particles.iter_mut() {
                    dynamics.update_particle(particle, system_time);
                    state.boundary.apply_bc(&mut particle.position);
                    let cell = cells.locate(&particle.position);
                    cells.insert(particle.id, cell);
                }
                info!(
                    "Cell list \"{}\": {:?} cells of width {:?}",
                    self.name, cells.dims, cells.width
                );
                *list = cells;
            }
        }
        Ok(())
    }

    pub fn cell_list(&self) -> Option<&CellList> {
        match &self.kind {
            GlobalKind::Cells { list } => Some(list),
            _ => None,
        }
    }

    /// Next event of particle `p` with this global. The particle must be up to date.
    pub fn get_event(&self, dynamics: &Dynamics, state: &SystemState, p: usize, id: usize) -> Result<Event, SimulationError> {
        let (dt, event_type) = match &self.kind {
            GlobalKind::PbcSentinel { max_distance } => {
                (dynamics.pbc_sentinel_time(state, p, *max_distance), EventType::Virtual)
            }
            GlobalKind::ParabolaSentinel => (dynamics.parabola_sentinel_time(state, p), EventType::RecalculateParabola),
            GlobalKind::Cells { list } => {
                let cell = list.cell_of(p).ok_or(SimulationError::InvalidParticle(p))?;
                (
                    dynamics.square_cell_collision2(state, p, &list.origin(cell), &list.width),
                    EventType::Cell,
                )
            }
        };
        Ok(if dt.is_infinite() {
            Event::none(p, None, EventSource::Global, id)
        } else {
            Event::global(dt, p, id, event_type)
        })
    }

    /// Runs `event`, which this global predicted. None of the globals change
    /// the energy, the scheduler only re-predicts the particle.
    pub fn run_event(
        &mut self,
        dynamics: &mut Dynamics,
        state: &mut SystemState,
        event: &Event,
    ) -> Result<EventOutcome, SimulationError> {
        let p = event.particle1;
        dynamics.update_particle_id(state, p)?;
        match (&mut self.kind, event.event_type) {
            (GlobalKind::PbcSentinel { .. }, EventType::Virtual) => {}
            (GlobalKind::ParabolaSentinel, EventType::RecalculateParabola) => dynamics.enforce_parabola(state, p)?,
            (GlobalKind::Cells { list }, EventType::Cell) => {
                let cell = list.cell_of(p).ok_or(SimulationError::InvalidParticle(p))?;
                let face = dynamics.square_cell_collision3(state, p, &list.origin(cell), &list.width)?;
                let dim = (face.unsigned_abs() - 1) as usize;
                let direction = face.signum() as isize;

                let mut coords = list.coords(cell);
                let target = coords[dim] as isize + direction;
                let n = list.dims[dim] as isize;
                if target < 0 || target >= n {
                    let particle = &mut state.particles[p];
                    state.boundary.shift_image(&mut particle.position, &mut particle.velocity, dim, direction as f64);
                    if dim == 1 && state.boundary.is_shearing() {
                        // The sliding image lands the particle in another x cell
                        state.boundary.apply_bc(&mut particle.position);
                        coords[0] = list.coords(list.locate(&particle.position))[0];
                    }
                }
                coords[dim] = target.rem_euclid(n) as usize;

                let to = list.index(coords);
                list.remove(p);
                list.insert(p, to);
                debug!("Particle {} moved from cell {} to cell {}", p, cell, to);
            }
            (_, event_type) => {
                return Err(SimulationError::InvalidState(format!(
                    "Global \"{}\" cannot run a {} event",
                    self.name, event_type
                )))
            }
        }
        Ok(EventOutcome::empty())
    }
}
