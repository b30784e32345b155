use std::collections::BTreeMap;

use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    Direction, EntityId, Position,
    agent::{DecisionEngine, WorldView},
    config::{ConfigError, SimulationConfig},
    entity::{ActionLabel, BoxPile, Robot},
    snapshot::{BoxReport, BoxStatus, RobotReport, RobotTally, SimulationSummary, Snapshot},
    world::{GridWorld, Occupant, WorldError},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulationError {
    #[error("Robot not found")]
    RobotNotFound(EntityId),
    #[error(transparent)]
    World(#[from] WorldError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// External override of a robot's cell and/or facing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    pub position: Option<Position>,
    pub direction: Option<Direction>,
}

/// Owns the whole simulation: the grid, every robot and pile, the rule
/// table and the random source.
#[derive(Debug)]
pub struct Environment {
    world: GridWorld,
    /// In creation order, which is also turn order.
    robots: Vec<Robot>,
    boxes: BTreeMap<EntityId, BoxPile>,
    engine: DecisionEngine,
    rng: StdRng,
    seed: u64,
    tick: u64,
    next_robot_id: EntityId,
    next_box_id: EntityId,
}

impl Environment {
    /// Creates a new, empty environment.
    pub fn new(rows: usize, cols: usize, seed: u64) -> Self {
        Environment {
            world: GridWorld::new(rows, cols),
            robots: Vec::new(),
            boxes: BTreeMap::new(),
            engine: DecisionEngine::default(),
            rng: StdRng::seed_from_u64(seed),
            seed,
            tick: 0,
            next_robot_id: 1,
            next_box_id: 1,
        }
    }

    /// Builds a populated world: robots first, then box piles, each on its own random free cell.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(rand::random);
        let mut environment = Environment::new(config.rows, config.cols, seed);

        let robots: Vec<Robot> = (0..config.robots)
            .map(|_| {
                let id = environment.reserve_robot_id();
                Robot::new(id, &mut environment.rng)
            })
            .collect();
        let piles: Vec<BoxPile> = (0..config.boxes)
            .map(|_| BoxPile::new(environment.reserve_box_id()))
            .collect();

        let robot_occupants: Vec<Occupant> = robots.iter().map(Robot::occupant).collect();
        environment
            .world
            .place_random(&robot_occupants, &mut environment.rng)?;
        let pile_occupants: Vec<Occupant> =
            piles.iter().map(|p| Occupant::BoxPile(p.id)).collect();
        environment
            .world
            .place_random(&pile_occupants, &mut environment.rng)?;

        environment.robots = robots;
        environment.boxes = piles.into_iter().map(|p| (p.id, p)).collect();
        debug!(
            seed,
            robots = config.robots,
            boxes = config.boxes,
            "environment populated"
        );
        Ok(environment)
    }

    /// Replaces the rule table used for every robot.
    pub fn with_engine(mut self, engine: DecisionEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn reserve_robot_id(&mut self) -> EntityId {
        let id = self.next_robot_id;
        self.next_robot_id += 1;
        id
    }

    pub fn reserve_box_id(&mut self) -> EntityId {
        let id = self.next_box_id;
        self.next_box_id += 1;
        id
    }

    /// Adds a robot on an empty cell. It takes its turn after every existing robot.
    pub fn add_robot(
        &mut self,
        position: Position,
        direction: Direction,
    ) -> Result<EntityId, SimulationError> {
        let id = self.next_robot_id;
        self.world.place(Occupant::Robot(id), position)?;
        self.next_robot_id += 1;
        self.robots.push(Robot::new(id, &mut self.rng).facing(direction));
        Ok(id)
    }

    /// Adds a single box on an empty cell.
    pub fn add_box(&mut self, position: Position) -> Result<EntityId, SimulationError> {
        let id = self.next_box_id;
        self.world.place(Occupant::BoxPile(id), position)?;
        self.next_box_id += 1;
        self.boxes.insert(id, BoxPile::new(id));
        Ok(id)
    }

    /// Advances the world by one tick: every robot decides and acts once, in
    /// creation order, each seeing the moves made before it. Returns the new tick.
    pub fn process_turn(&mut self) -> u64 {
        let Environment {
            world,
            robots,
            boxes,
            engine,
            rng,
            ..
        } = self;
        let mut view = WorldView { world, boxes, rng };

        for robot in robots.iter_mut() {
            if let Err(err) = engine.step(robot, &mut view) {
                warn!(robot = robot.id, %err, "robot skipped its turn");
            }
            robot.perception = None;
        }

        self.tick += 1;
        self.tick
    }

    /// Overrides a robot's cell and/or facing, bypassing movement rules.
    ///
    /// Nothing changes if the robot is unknown or the cell is off the grid.
    pub fn apply_correction(
        &mut self,
        id: EntityId,
        correction: Correction,
    ) -> Result<(), SimulationError> {
        let robot = self
            .robots
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(SimulationError::RobotNotFound(id))?;
        if let Some(position) = correction.position {
            self.world.move_to(robot.occupant(), position)?;
        }
        if let Some(direction) = correction.direction {
            robot.direction = direction;
        }
        debug!(robot = id, ?correction, "applied correction");
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        let robot_actions = self
            .robots
            .iter()
            .filter_map(|robot| {
                let position = self.world.position_of(robot.occupant()).ok()?;
                Some(RobotReport {
                    id: robot.id,
                    action: robot.action,
                    position,
                    direction: robot.direction,
                    box_id: robot.grabbed_box,
                    stack_coord: robot
                        .stack_target
                        .filter(|_| robot.action == ActionLabel::Stack),
                })
            })
            .collect();
        let box_positions = self
            .boxes
            .values()
            .filter_map(|pile| {
                let position = self.world.position_of(Occupant::BoxPile(pile.id)).ok()?;
                Some(BoxReport {
                    id: pile.id,
                    position,
                    status: if pile.stacked {
                        BoxStatus::Stacked
                    } else {
                        BoxStatus::Idle
                    },
                    num_boxes: pile.height,
                })
            })
            .collect();
        Snapshot {
            robot_actions,
            box_positions,
        }
    }

    pub fn summary(&self) -> SimulationSummary {
        let stack_sizes: Vec<u32> = self
            .boxes
            .values()
            .filter(|p| p.height > 1)
            .map(|p| p.height)
            .collect();
        SimulationSummary {
            ticks: self.tick,
            robots: self
                .robots
                .iter()
                .map(|r| RobotTally {
                    id: r.id,
                    grabbed: r.boxes_grabbed,
                    stacked: r.boxes_stacked,
                })
                .collect(),
            boxes_in_stacks: stack_sizes.iter().sum(),
            stack_sizes,
            single_boxes: self.boxes.values().filter(|p| p.height == 1).count(),
        }
    }

    pub fn world(&self) -> &GridWorld {
        &self.world
    }
    pub fn robots(&self) -> &[Robot] {
        &self.robots
    }
    pub fn robot(&self, id: EntityId) -> Option<&Robot> {
        self.robots.iter().find(|r| r.id == id)
    }
    pub fn boxes(&self) -> &BTreeMap<EntityId, BoxPile> {
        &self.boxes
    }
    pub fn tick(&self) -> u64 {
        self.tick
    }
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(robots: usize, boxes: usize) -> SimulationConfig {
        SimulationConfig {
            rows: 6,
            cols: 6,
            robots,
            boxes,
            seed: Some(11),
        }
    }

    #[test]
    fn from_config_assigns_ids_and_distinct_cells() {
        let env = Environment::from_config(&config(3, 5)).unwrap();

        let ids: Vec<EntityId> = env.robots().iter().map(|r| r.id).collect();
        assert_eq!(ids, [1, 2, 3]);
        assert_eq!(env.boxes().keys().copied().collect::<Vec<_>>(), [1, 2, 3, 4, 5]);
        assert_eq!(env.world().occupied_cells().count(), 8);
        assert_eq!(env.seed(), 11);
    }

    #[test]
    fn from_config_rejects_overcrowding() {
        let err = Environment::from_config(&SimulationConfig {
            rows: 2,
            cols: 2,
            robots: 2,
            boxes: 3,
            seed: Some(1),
        })
        .unwrap_err();
        assert!(matches!(err, SimulationError::Config(_)));
    }

    #[test]
    fn initial_snapshot_reports_setup_state() {
        let env = Environment::from_config(&config(2, 3)).unwrap();
        let snapshot = env.snapshot();

        assert_eq!(snapshot.robot_actions.len(), 2);
        for report in &snapshot.robot_actions {
            assert_eq!(report.action, ActionLabel::Setup);
            assert_eq!(report.direction, Direction::West);
            assert_eq!(report.box_id, None);
            assert_eq!(report.stack_coord, None);
        }
        assert_eq!(snapshot.box_positions.len(), 3);
        assert!(
            snapshot
                .box_positions
                .iter()
                .all(|b| b.status == BoxStatus::Idle && b.num_boxes == 1)
        );
    }

    #[test]
    fn robots_act_in_creation_order_and_see_earlier_moves() {
        let mut env = Environment::new(1, 3, 5);
        let first = env.add_robot(Position::new(0, 1), Direction::East).unwrap();
        let second = env.add_robot(Position::new(0, 0), Direction::East).unwrap();

        assert_eq!(env.process_turn(), 1);

        let world = env.world();
        assert_eq!(world.position_of(Occupant::Robot(first)), Ok(Position::new(0, 2)));
        assert_eq!(world.position_of(Occupant::Robot(second)), Ok(Position::new(0, 1)));
    }

    #[test]
    fn two_ticks_produce_different_snapshots() {
        let mut env = Environment::from_config(&config(3, 4)).unwrap();
        let before = env.snapshot();
        env.process_turn();
        let after = env.snapshot();
        env.process_turn();

        assert_ne!(before, after);
        assert_eq!(env.tick(), 2);
    }

    #[test]
    fn correction_relocates_and_turns() {
        let mut env = Environment::new(4, 4, 1);
        let id = env.add_robot(Position::new(0, 0), Direction::West).unwrap();

        env.apply_correction(
            id,
            Correction {
                position: Some(Position::new(3, 2)),
                direction: Some(Direction::South),
            },
        )
        .unwrap();

        assert_eq!(env.world().position_of(Occupant::Robot(id)), Ok(Position::new(3, 2)));
        assert_eq!(env.robot(id).map(|r| r.direction), Some(Direction::South));
    }

    #[test]
    fn correction_for_unknown_robot_changes_nothing() {
        let mut env = Environment::from_config(&config(3, 2)).unwrap();
        let before = env.snapshot();

        let err = env
            .apply_correction(
                999,
                Correction {
                    position: Some(Position::new(0, 0)),
                    direction: None,
                },
            )
            .unwrap_err();

        assert_eq!(err, SimulationError::RobotNotFound(999));
        assert_eq!(err.to_string(), "Robot not found");
        assert_eq!(env.snapshot(), before);
        assert_eq!(env.tick(), 0);
    }

    #[test]
    fn correction_off_grid_leaves_robot_untouched() {
        let mut env = Environment::new(3, 3, 1);
        let id = env.add_robot(Position::new(1, 1), Direction::West).unwrap();

        let err = env
            .apply_correction(
                id,
                Correction {
                    position: Some(Position::new(5, 0)),
                    direction: Some(Direction::North),
                },
            )
            .unwrap_err();

        assert!(matches!(err, SimulationError::World(WorldError::OutOfBounds(_))));
        assert_eq!(env.world().position_of(Occupant::Robot(id)), Ok(Position::new(1, 1)));
        assert_eq!(env.robot(id).map(|r| r.direction), Some(Direction::West));
    }

    #[test]
    fn add_box_refuses_occupied_cell() {
        let mut env = Environment::new(2, 2, 1);
        env.add_robot(Position::new(0, 0), Direction::North).unwrap();
        let err = env.add_box(Position::new(0, 0)).unwrap_err();
        assert_eq!(
            err,
            SimulationError::World(WorldError::CellOccupied(Position::new(0, 0)))
        );
    }

    #[test]
    fn summary_counts_piles_and_robots() {
        let mut env = Environment::new(3, 3, 1);
        let robot = env.add_robot(Position::new(1, 1), Direction::North).unwrap();
        let low = env.add_box(Position::new(0, 0)).unwrap();
        env.add_box(Position::new(2, 2)).unwrap();
        if let Some(pile) = env.boxes.get_mut(&low) {
            pile.add_box();
        }
        env.robots[0].boxes_grabbed = 2;

        let summary = env.summary();

        assert_eq!(summary.stack_sizes, [2]);
        assert_eq!(summary.boxes_in_stacks, 2);
        assert_eq!(summary.single_boxes, 1);
        assert_eq!(summary.robots[0].id, robot);
        assert_eq!(summary.robots[0].grabbed, 2);
    }
}
