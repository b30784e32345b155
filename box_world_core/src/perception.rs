use serde::{Deserialize, Serialize};

use crate::{
    Direction, Position,
    world::{GridWorld, Occupant},
};

/// What a robot sees in one neighbouring cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    BoxPile,
    Robot,
    Empty,
    Border,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sensed {
    pub kind: CellKind,
    pub position: Position,
}

/// Classification of the four orthogonal neighbours, in N, E, S, W order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Perception([Sensed; 4]);

impl Perception {
    pub fn sensed(&self) -> &[Sensed; 4] {
        &self.0
    }

    pub fn in_direction(&self, direction: Direction) -> Sensed {
        let index = match direction {
            Direction::North => 0,
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
        };
        self.0[index]
    }

    /// First neighbouring box pile in N, E, S, W order.
    pub fn first_box(&self) -> Option<Sensed> {
        self.0.iter().copied().find(|s| s.kind == CellKind::BoxPile)
    }

    pub fn sees_box(&self) -> bool {
        self.first_box().is_some()
    }

    /// Neighbouring box piles in N, E, S, W order.
    pub fn boxes(&self) -> impl Iterator<Item = Sensed> + '_ {
        self.0.iter().copied().filter(|s| s.kind == CellKind::BoxPile)
    }
}

/// Computes the perception of whoever stands at `at`.
///
/// A pile wins over a robot when both share a cell.
pub fn perceive(world: &GridWorld, at: Position) -> Perception {
    Perception(Direction::ALL.map(|direction| {
        let position = at.step(direction);
        let kind = if !world.contains(position) {
            CellKind::Border
        } else {
            let occupants = world.occupants_at(position);
            if occupants.iter().any(|o| matches!(o, Occupant::BoxPile(_))) {
                CellKind::BoxPile
            } else if occupants.iter().any(|o| matches!(o, Occupant::Robot(_))) {
                CellKind::Robot
            } else {
                CellKind::Empty
            }
        };
        Sensed { kind, position }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corner_sees_two_borders() {
        let world = GridWorld::new(3, 3);
        let perception = perceive(&world, Position::new(0, 0));
        let kinds: Vec<CellKind> = perception.sensed().iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            [
                CellKind::Border,
                CellKind::Empty,
                CellKind::Empty,
                CellKind::Border
            ]
        );
        assert_eq!(perception.sensed()[0].position, Position::new(-1, 0));
    }

    #[test]
    fn classifies_neighbours_in_fixed_order() {
        let mut world = GridWorld::new(3, 3);
        let centre = Position::new(1, 1);
        world.place(Occupant::Robot(1), centre).unwrap();
        world.place(Occupant::BoxPile(1), Position::new(1, 2)).unwrap();
        world.place(Occupant::Robot(2), Position::new(1, 0)).unwrap();

        let perception = perceive(&world, centre);

        assert_eq!(perception.in_direction(Direction::North).kind, CellKind::Empty);
        assert_eq!(perception.in_direction(Direction::East).kind, CellKind::BoxPile);
        assert_eq!(perception.in_direction(Direction::South).kind, CellKind::Empty);
        assert_eq!(perception.in_direction(Direction::West).kind, CellKind::Robot);
        assert_eq!(perception.first_box().map(|s| s.position), Some(Position::new(1, 2)));
    }

    #[test]
    fn pile_wins_on_shared_cell() {
        let mut world = GridWorld::new(2, 2);
        world.place(Occupant::BoxPile(1), Position::new(0, 1)).unwrap();
        world.place(Occupant::Robot(2), Position::new(1, 1)).unwrap();
        world.move_to(Occupant::Robot(2), Position::new(0, 1)).unwrap();

        let perception = perceive(&world, Position::new(0, 0));
        assert_eq!(perception.in_direction(Direction::East).kind, CellKind::BoxPile);
    }
}
