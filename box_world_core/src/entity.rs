use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Direction, EntityId, perception::Perception, world::Occupant};

/// Bounds of the randomized interval between forced random turns.
pub const TURN_INTERVAL_MIN: u32 = 5;
pub const TURN_INTERVAL_MAX: u32 = 15;

/// Tallest a box pile can grow.
pub const PILE_CAPACITY: u32 = 3;

pub const STACK_MIN_HEIGHT: u32 = 2;
pub const STACK_CAPACITY: u32 = 5;

/// Label of the last action a robot executed, as reported to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionLabel {
    #[serde(rename = "setup")]
    Setup,
    #[serde(rename = "move")]
    Move,
    #[serde(rename = "grab")]
    Grab,
    #[serde(rename = "stack")]
    Stack,
    #[serde(rename = "turn 90")]
    Turn,
    #[serde(rename = "turn random")]
    RandomTurn,
}

/// Per-robot state. The robot's cell lives in the [`GridWorld`](crate::world::GridWorld).
#[derive(Debug, Clone)]
pub struct Robot {
    pub id: EntityId,
    pub direction: Direction,
    pub carrying_box: bool,
    /// Id of the box picked up; only set while carrying.
    pub grabbed_box: Option<EntityId>,
    /// Id of the pile stacked onto; only set while the label is `stack`.
    pub stack_target: Option<EntityId>,
    pub boxes_grabbed: u32,
    pub boxes_stacked: u32,
    pub turn_interval: u32,
    pub steps_since_last_turn: u32,
    pub action: ActionLabel,
    /// Set by a stack; the next step resets the label and clears `stack_target`.
    pub just_stacked: bool,
    /// Valid only during the robot's own step.
    pub perception: Option<Perception>,
}

impl Robot {
    pub fn new<R: Rng + ?Sized>(id: EntityId, rng: &mut R) -> Self {
        Robot {
            id,
            direction: Direction::West,
            carrying_box: false,
            grabbed_box: None,
            stack_target: None,
            boxes_grabbed: 0,
            boxes_stacked: 0,
            turn_interval: draw_turn_interval(rng),
            steps_since_last_turn: 0,
            action: ActionLabel::Setup,
            just_stacked: false,
            perception: None,
        }
    }

    pub fn occupant(&self) -> Occupant {
        Occupant::Robot(self.id)
    }

    pub fn facing(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }
}

pub fn draw_turn_interval<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    rng.random_range(TURN_INTERVAL_MIN..=TURN_INTERVAL_MAX)
}

/// A pile of one to [`PILE_CAPACITY`] boxes sitting on a single cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxPile {
    pub id: EntityId,
    pub height: u32,
    pub stacked: bool,
}

impl BoxPile {
    pub fn new(id: EntityId) -> Self {
        BoxPile {
            id,
            height: 1,
            stacked: false,
        }
    }

    /// Adds one box. Returns `false`, leaving the pile unchanged, once at capacity.
    pub fn add_box(&mut self) -> bool {
        if self.height < PILE_CAPACITY {
            self.height += 1;
            self.stacked = true;
            true
        } else {
            debug!(pile = self.id, height = self.height, "pile is full");
            false
        }
    }
}

/// Taller stack kind holding between [`STACK_MIN_HEIGHT`] and [`STACK_CAPACITY`] boxes.
///
/// Not produced by the default rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stack {
    pub id: EntityId,
    pub height: u32,
}

impl Stack {
    pub fn new(id: EntityId) -> Self {
        Stack {
            id,
            height: STACK_MIN_HEIGHT,
        }
    }

    pub fn add_box(&mut self) -> bool {
        if self.height < STACK_CAPACITY {
            self.height += 1;
            true
        } else {
            false
        }
    }

    pub fn remove_box(&mut self) -> bool {
        if self.height > STACK_MIN_HEIGHT {
            self.height -= 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn pile_caps_at_three() {
        let mut pile = BoxPile::new(1);
        assert!(!pile.stacked);
        assert!(pile.add_box());
        assert!(pile.stacked);
        assert!(pile.add_box());
        assert!(!pile.add_box());
        assert_eq!(pile.height, PILE_CAPACITY);
        assert!(pile.stacked);
    }

    #[test]
    fn stack_stays_within_bounds() {
        let mut stack = Stack::new(1);
        assert!(!stack.remove_box());
        for _ in 0..3 {
            assert!(stack.add_box());
        }
        assert!(!stack.add_box());
        assert_eq!(stack.height, STACK_CAPACITY);
        assert!(stack.remove_box());
        assert_eq!(stack.height, 4);
    }

    #[test]
    fn new_robot_starts_idle_facing_west() {
        let mut rng = StdRng::seed_from_u64(3);
        let robot = Robot::new(1, &mut rng);
        assert_eq!(robot.direction, Direction::West);
        assert_eq!(robot.action, ActionLabel::Setup);
        assert!(!robot.carrying_box);
        assert!((TURN_INTERVAL_MIN..=TURN_INTERVAL_MAX).contains(&robot.turn_interval));
    }

    #[test]
    fn action_labels_match_wire_names() {
        let json = serde_json::to_string(&[ActionLabel::Turn, ActionLabel::RandomTurn]).unwrap();
        assert_eq!(json, r#"["turn 90","turn random"]"#);
    }
}
