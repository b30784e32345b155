use std::collections::HashMap;

use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::{
    Direction, EntityId, Position,
    map::{Grid, GridError},
};

/// Anything that can occupy a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Occupant {
    Robot(EntityId),
    BoxPile(EntityId),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error(transparent)]
    OutOfBounds(#[from] GridError),
    #[error("{0:?} is not placed on the grid")]
    NotPlaced(Occupant),
    #[error("{0:?} is already placed on the grid")]
    AlreadyPlaced(Occupant),
    #[error("Cannot place {needed} entities, only {available} free cells")]
    NotEnoughCells { needed: usize, available: usize },
    #[error("Cell {0} is already occupied")]
    CellOccupied(Position),
}

/// The spatial model: an M x N grid with a per-cell occupant set and the
/// reverse occupant-to-cell mapping. Both are always updated together.
///
/// Movement here only checks bounds; keeping two robots off the same cell
/// is the caller's job.
#[derive(Debug, Clone)]
pub struct GridWorld {
    cells: Grid<Vec<Occupant>>,
    positions: HashMap<Occupant, Position>,
}

impl GridWorld {
    pub fn new(rows: usize, cols: usize) -> Self {
        GridWorld {
            cells: Grid::new(rows, cols),
            positions: HashMap::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.cells.rows()
    }

    pub fn cols(&self) -> usize {
        self.cells.cols()
    }

    pub fn contains(&self, position: Position) -> bool {
        self.cells.contains(position)
    }

    /// Places `occupant` on an empty, in-bounds cell.
    pub fn place(&mut self, occupant: Occupant, position: Position) -> Result<(), WorldError> {
        self.cells.check(position)?;
        if self.positions.contains_key(&occupant) {
            return Err(WorldError::AlreadyPlaced(occupant));
        }
        if !self.cells[position].is_empty() {
            return Err(WorldError::CellOccupied(position));
        }
        self.cells[position].push(occupant);
        self.positions.insert(occupant, position);
        Ok(())
    }

    /// Places every occupant on its own distinct, currently empty cell.
    ///
    /// Either all of them are placed or none are.
    pub fn place_random<R: Rng + ?Sized>(
        &mut self,
        occupants: &[Occupant],
        rng: &mut R,
    ) -> Result<(), WorldError> {
        if let Some(placed) = occupants.iter().find(|o| self.positions.contains_key(o)) {
            return Err(WorldError::AlreadyPlaced(*placed));
        }
        let mut free: Vec<Position> = self
            .cells
            .enumerate()
            .filter(|(_, occupants)| occupants.is_empty())
            .map(|(position, _)| position)
            .collect();
        if free.len() < occupants.len() {
            return Err(WorldError::NotEnoughCells {
                needed: occupants.len(),
                available: free.len(),
            });
        }
        free.shuffle(rng);
        for (occupant, position) in occupants.iter().zip(free) {
            self.cells[position].push(*occupant);
            self.positions.insert(*occupant, position);
        }
        Ok(())
    }

    /// Moves `occupant` one cell in `direction`, returning the new cell.
    pub fn move_by(
        &mut self,
        occupant: Occupant,
        direction: Direction,
    ) -> Result<Position, WorldError> {
        let from = self.position_of(occupant)?;
        let to = from.step(direction);
        self.move_to(occupant, to)?;
        Ok(to)
    }

    /// Relocates `occupant` to an absolute cell. Only bounds are checked.
    pub fn move_to(&mut self, occupant: Occupant, to: Position) -> Result<(), WorldError> {
        self.cells.check(to)?;
        let from = self.position_of(occupant)?;
        if from == to {
            return Ok(());
        }
        self.cells[from].retain(|o| *o != occupant);
        self.cells[to].push(occupant);
        self.positions.insert(occupant, to);
        Ok(())
    }

    /// Occupants of a cell; empty for out-of-bounds cells.
    pub fn occupants_at(&self, position: Position) -> &[Occupant] {
        self.cells
            .get(position)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The box pile on a cell, if any.
    pub fn box_at(&self, position: Position) -> Option<EntityId> {
        self.occupants_at(position).iter().find_map(|o| match o {
            Occupant::BoxPile(id) => Some(*id),
            Occupant::Robot(_) => None,
        })
    }

    pub fn is_empty(&self, position: Position) -> bool {
        self.occupants_at(position).is_empty()
    }

    /// Takes `occupant` off the grid, returning the cell it was on.
    pub fn remove(&mut self, occupant: Occupant) -> Result<Position, WorldError> {
        let position = self
            .positions
            .remove(&occupant)
            .ok_or(WorldError::NotPlaced(occupant))?;
        self.cells[position].retain(|o| *o != occupant);
        Ok(position)
    }

    pub fn position_of(&self, occupant: Occupant) -> Result<Position, WorldError> {
        self.positions
            .get(&occupant)
            .copied()
            .ok_or(WorldError::NotPlaced(occupant))
    }

    /// Iterates over every non-empty cell.
    pub fn occupied_cells(&self) -> impl Iterator<Item = (Position, &[Occupant])> {
        self.cells
            .enumerate()
            .filter(|(_, occupants)| !occupants.is_empty())
            .map(|(position, occupants)| (position, occupants.as_slice()))
    }
}
