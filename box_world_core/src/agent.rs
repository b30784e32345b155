use std::{collections::BTreeMap, fmt};

use rand::{Rng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Direction, EntityId,
    entity::{ActionLabel, BoxPile, Robot, draw_turn_interval},
    perception::{Perception, perceive},
    world::{GridWorld, Occupant, WorldError},
};

/// Mutable access to the parts of the environment a robot acts on during its turn.
pub struct WorldView<'a> {
    pub world: &'a mut GridWorld,
    pub boxes: &'a mut BTreeMap<EntityId, BoxPile>,
    pub rng: &'a mut StdRng,
}

/// Every behaviour a robot can be arbitrated into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    MoveAndGrab,
    TurnAndStack,
    Turn,
    RandomTurn,
    MoveNorth,
    MoveEast,
    MoveSouth,
    MoveWest,
    StackBox,
}

/// Eligibility predicate evaluated against the robot and its fresh perception.
pub type Guard = fn(&Robot, &Perception) -> bool;

/// One entry of the priority table.
#[derive(Clone, Copy)]
pub struct Rule {
    pub action: Action,
    pub guard: Guard,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("action", &self.action).finish_non_exhaustive()
    }
}

pub fn always(_: &Robot, _: &Perception) -> bool {
    true
}

pub fn carrying_next_to_box(robot: &Robot, perception: &Perception) -> bool {
    robot.carrying_box && perception.sees_box()
}

pub fn turn_due(robot: &Robot, _: &Perception) -> bool {
    robot.steps_since_last_turn >= robot.turn_interval
}

pub fn empty_handed(robot: &Robot, _: &Perception) -> bool {
    !robot.carrying_box
}

/// Highest priority first. The order decides behaviour; do not reorder.
pub const DEFAULT_RULES: [Rule; 9] = [
    Rule {
        action: Action::MoveAndGrab,
        guard: always,
    },
    Rule {
        action: Action::TurnAndStack,
        guard: carrying_next_to_box,
    },
    Rule {
        action: Action::Turn,
        guard: always,
    },
    Rule {
        action: Action::RandomTurn,
        guard: turn_due,
    },
    Rule {
        action: Action::MoveNorth,
        guard: empty_handed,
    },
    Rule {
        action: Action::MoveEast,
        guard: empty_handed,
    },
    Rule {
        action: Action::MoveSouth,
        guard: empty_handed,
    },
    Rule {
        action: Action::MoveWest,
        guard: empty_handed,
    },
    Rule {
        action: Action::StackBox,
        guard: carrying_next_to_box,
    },
];

/// Picks and runs exactly one action per robot per step by scanning the
/// rule table top-down.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    rules: Vec<Rule>,
}

impl Default for DecisionEngine {
    fn default() -> Self {
        DecisionEngine {
            rules: DEFAULT_RULES.to_vec(),
        }
    }
}

impl DecisionEngine {
    pub fn with_rules(rules: Vec<Rule>) -> Self {
        DecisionEngine { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The first action whose guard holds, or a random turn if none does.
    pub fn select(&self, robot: &Robot, perception: &Perception) -> Action {
        self.rules
            .iter()
            .find(|rule| (rule.guard)(robot, perception))
            .map(|rule| rule.action)
            .unwrap_or(Action::RandomTurn)
    }

    /// Runs one decision cycle for `robot`.
    pub fn step(&self, robot: &mut Robot, view: &mut WorldView) -> Result<Action, WorldError> {
        if robot.just_stacked {
            robot.action = ActionLabel::Move;
            robot.just_stacked = false;
            robot.stack_target = None;
        }

        let at = view.world.position_of(robot.occupant())?;
        let perception = perceive(view.world, at);
        robot.perception = Some(perception);

        let action = self.select(robot, &perception);
        robot.execute(action, view)?;
        Ok(action)
    }
}

/// Result of trying to step forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Advance {
    Moved,
    Stacked,
    Turned,
}

impl Robot {
    pub fn execute(&mut self, action: Action, view: &mut WorldView) -> Result<(), WorldError> {
        match action {
            Action::MoveAndGrab => self.move_and_grab(view),
            Action::TurnAndStack => self.turn_and_stack(view),
            Action::Turn => {
                self.turn();
                Ok(())
            }
            Action::RandomTurn => {
                self.random_turn(view.rng);
                Ok(())
            }
            Action::MoveNorth => self.move_toward(Direction::North, view),
            Action::MoveEast => self.move_toward(Direction::East, view),
            Action::MoveSouth => self.move_toward(Direction::South, view),
            Action::MoveWest => self.move_toward(Direction::West, view),
            Action::StackBox => self.stack_box(view),
        }
    }

    fn move_and_grab(&mut self, view: &mut WorldView) -> Result<(), WorldError> {
        self.action = ActionLabel::Move;
        // The grab scan uses what the robot saw before moving, so the cell it
        // just left still counts as adjacent.
        let perception = self.current_perception(view)?;
        if self.advance(view)? == Advance::Moved {
            self.steps_since_last_turn += 1;
            if !self.carrying_box {
                self.grab_adjacent(&perception, view)?;
            }
        }
        Ok(())
    }

    fn turn_and_stack(&mut self, view: &mut WorldView) -> Result<(), WorldError> {
        let perception = self.current_perception(view)?;
        let at = view.world.position_of(self.occupant())?;
        let target = perception.first_box();
        let facing = target.and_then(|t| at.direction_to(t.position));
        let (Some(target), Some(facing)) = (target, facing) else {
            debug!(robot = self.id, "no pile to turn toward");
            self.random_turn(view.rng);
            return Ok(());
        };

        while self.direction != facing {
            self.turn();
        }
        if let Some(pile) = view.world.box_at(target.position) {
            self.stack_onto(pile, view);
        }
        Ok(())
    }

    fn turn(&mut self) {
        self.action = ActionLabel::Turn;
        self.direction = self.direction.clockwise();
        debug!(robot = self.id, direction = ?self.direction, "turned");
    }

    fn random_turn(&mut self, rng: &mut StdRng) {
        self.action = ActionLabel::RandomTurn;
        self.direction = Direction::ALL[rng.random_range(0..Direction::ALL.len())];
        self.steps_since_last_turn = 0;
        self.turn_interval = draw_turn_interval(rng);
        debug!(robot = self.id, direction = ?self.direction, "randomly turned");
    }

    fn move_toward(
        &mut self,
        direction: Direction,
        view: &mut WorldView,
    ) -> Result<(), WorldError> {
        self.direction = direction;
        self.action = ActionLabel::Move;
        self.advance(view)?;
        Ok(())
    }

    fn stack_box(&mut self, view: &mut WorldView) -> Result<(), WorldError> {
        self.action = ActionLabel::Stack;
        let perception = self.current_perception(view)?;
        for sensed in perception.boxes() {
            if let Some(pile) = view.world.box_at(sensed.position) {
                self.stack_onto(pile, view);
                return Ok(());
            }
        }
        debug!(robot = self.id, "no pile to stack on");
        Ok(())
    }

    /// Steps forward if the front cell is empty, stacks onto a pile in front
    /// when carrying, and turns randomly on any other obstruction.
    fn advance(&mut self, view: &mut WorldView) -> Result<Advance, WorldError> {
        let occupant = self.occupant();
        let front = view.world.position_of(occupant)?.step(self.direction);

        if !view.world.contains(front) {
            debug!(robot = self.id, %front, "border ahead");
            self.random_turn(view.rng);
            return Ok(Advance::Turned);
        }
        if view.world.is_empty(front) {
            view.world.move_by(occupant, self.direction)?;
            debug!(robot = self.id, to = %front, "moved");
            return Ok(Advance::Moved);
        }
        if self.carrying_box {
            if let Some(pile) = view.world.box_at(front) {
                self.stack_onto(pile, view);
                return Ok(Advance::Stacked);
            }
        }
        self.random_turn(view.rng);
        Ok(Advance::Turned)
    }

    /// Picks up the first neighbouring single box, taking it off the grid.
    fn grab_adjacent(
        &mut self,
        perception: &Perception,
        view: &mut WorldView,
    ) -> Result<bool, WorldError> {
        for sensed in perception.boxes() {
            let Some(pile) = view.world.box_at(sensed.position) else {
                continue;
            };
            if view.boxes.get(&pile).is_some_and(|p| p.height == 1) {
                view.world.remove(Occupant::BoxPile(pile))?;
                view.boxes.remove(&pile);
                self.carrying_box = true;
                self.grabbed_box = Some(pile);
                self.boxes_grabbed += 1;
                self.action = ActionLabel::Grab;
                debug!(
                    robot = self.id,
                    pile,
                    from = %sensed.position,
                    total = self.boxes_grabbed,
                    "grabbed box"
                );
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Drops the carried box onto `pile`. At capacity the box is spent without
    /// raising the pile.
    fn stack_onto(&mut self, pile: EntityId, view: &mut WorldView) {
        self.action = ActionLabel::Stack;
        let Some(target) = view.boxes.get_mut(&pile) else {
            debug!(robot = self.id, pile, "pile vanished before stacking");
            return;
        };
        target.add_box();
        self.carrying_box = false;
        self.grabbed_box = None;
        self.boxes_stacked += 1;
        self.stack_target = Some(pile);
        self.just_stacked = true;
        debug!(
            robot = self.id,
            pile,
            height = target.height,
            total = self.boxes_stacked,
            "stacked box"
        );
    }

    fn current_perception(&mut self, view: &WorldView) -> Result<Perception, WorldError> {
        match self.perception {
            Some(perception) => Ok(perception),
            None => {
                let perception = perceive(view.world, view.world.position_of(self.occupant())?);
                self.perception = Some(perception);
                Ok(perception)
            }
        }
    }
}
