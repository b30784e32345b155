use box_world_core::{
    config::SimulationConfig,
    entity::PILE_CAPACITY,
    environment::Environment,
    world::Occupant,
};
use proptest::prelude::*;

fn config(seed: u64, robots: usize, boxes: usize) -> SimulationConfig {
    SimulationConfig {
        rows: 8,
        cols: 8,
        robots,
        boxes,
        seed: Some(seed),
    }
}

/// Boxes still on the grid plus the ones being carried.
fn boxes_in_play(env: &Environment) -> u32 {
    let on_grid: u32 = env.boxes().values().map(|p| p.height).sum();
    let carried = env.robots().iter().filter(|r| r.carrying_box).count() as u32;
    on_grid + carried
}

#[test]
fn default_sized_run_keeps_going_for_many_ticks() {
    let mut env = Environment::from_config(&SimulationConfig {
        seed: Some(2021),
        ..SimulationConfig::default()
    })
    .expect("default config is valid");

    for _ in 0..600 {
        env.process_turn();
    }

    assert_eq!(env.tick(), 600);
    assert_eq!(env.snapshot().robot_actions.len(), 5);
    let summary = env.summary();
    let grabbed: u32 = summary.robots.iter().map(|r| r.grabbed).sum();
    assert_eq!(grabbed as usize + env.boxes().len(), 15);
}

proptest! {
    #[test]
    fn invariants_hold_every_tick(
        seed in 0_u64..10_000,
        robots in 1_usize..6,
        boxes in 0_usize..20,
        ticks in 1_usize..80,
    ) {
        let mut env = Environment::from_config(&config(seed, robots, boxes)).unwrap();
        let initial = boxes_in_play(&env);

        for _ in 0..ticks {
            let before_grabs: u32 = env.robots().iter().map(|r| r.boxes_grabbed).sum();
            let piles_before = env.boxes().len();

            env.process_turn();

            for pile in env.boxes().values() {
                prop_assert!((1..=PILE_CAPACITY).contains(&pile.height));
                prop_assert_eq!(pile.stacked, pile.height > 1);
            }
            for (_, occupants) in env.world().occupied_cells() {
                prop_assert_eq!(occupants.len(), 1);
            }
            for robot in env.robots() {
                prop_assert_eq!(robot.grabbed_box.is_some(), robot.carrying_box);
                prop_assert!(env.world().position_of(robot.occupant()).is_ok());
            }
            for id in env.boxes().keys() {
                prop_assert!(env.world().position_of(Occupant::BoxPile(*id)).is_ok());
            }

            let after_grabs: u32 = env.robots().iter().map(|r| r.boxes_grabbed).sum();
            let grabs = (after_grabs - before_grabs) as usize;
            prop_assert_eq!(piles_before - env.boxes().len(), grabs);
            prop_assert!(boxes_in_play(&env) <= initial);
        }
    }

    #[test]
    fn same_seed_same_history(seed in 0_u64..10_000, ticks in 1_usize..40) {
        let mut a = Environment::from_config(&config(seed, 4, 10)).unwrap();
        let mut b = Environment::from_config(&config(seed, 4, 10)).unwrap();

        for _ in 0..ticks {
            prop_assert_eq!(a.snapshot(), b.snapshot());
            a.process_turn();
            b.process_turn();
        }
        prop_assert_eq!(a.summary(), b.summary());
    }
}
