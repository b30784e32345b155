use serde::{Deserialize, Serialize};

use crate::{Direction, EntityId, Position, entity::ActionLabel};

/// World state as handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub robot_actions: Vec<RobotReport>,
    pub box_positions: Vec<BoxReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotReport {
    pub id: EntityId,
    pub action: ActionLabel,
    pub position: Position,
    pub direction: Direction,
    pub box_id: Option<EntityId>,
    /// Present only when `action` is `stack`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_coord: Option<EntityId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoxStatus {
    Stacked,
    Idle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxReport {
    pub id: EntityId,
    pub position: Position,
    pub status: BoxStatus,
    pub num_boxes: u32,
}

/// End-of-run tallies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub ticks: u64,
    pub robots: Vec<RobotTally>,
    /// Heights of every pile taller than one box.
    pub stack_sizes: Vec<u32>,
    pub boxes_in_stacks: u32,
    pub single_boxes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotTally {
    pub id: EntityId,
    pub grabbed: u32,
    pub stacked: u32,
}
