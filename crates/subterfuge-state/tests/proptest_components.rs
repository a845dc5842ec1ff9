//! Property tests for component invariants.
//!
//! Random sequences of component mutations must never break the clamping
//! and capacity invariants, and relocations must always be reversible.

use proptest::prelude::*;
use subterfuge_state::prelude::*;

#[derive(Debug, Clone)]
enum ShieldOp {
    Set(i32),
    Add(i32),
    Remove(i32),
    Capacity(i32),
    Toggle,
}

fn shield_op_strategy() -> impl Strategy<Value = ShieldOp> {
    prop_oneof![
        (-50..150i32).prop_map(ShieldOp::Set),
        (-50..150i32).prop_map(ShieldOp::Add),
        (-50..150i32).prop_map(ShieldOp::Remove),
        (-10..100i32).prop_map(ShieldOp::Capacity),
        Just(ShieldOp::Toggle),
    ]
}

#[derive(Debug, Clone)]
enum RosterOp {
    Add(u32),
    Remove(u32),
}

fn roster_op_strategy() -> impl Strategy<Value = RosterOp> {
    prop_oneof![
        (0..10u32).prop_map(RosterOp::Add),
        (0..10u32).prop_map(RosterOp::Remove),
    ]
}

fn outpost_state(n: u64) -> GameState {
    let mut state = GameState::new();
    state.add_player(Player::new(PlayerId(1), "p1")).unwrap();
    for i in 0..n {
        state
            .add_outpost(Outpost::new(EntityId::new(i), Some(PlayerId(1))).with_drillers(5))
            .unwrap();
    }
    for i in 0..n {
        state
            .insert_sub(Sub::new(
                EntityId::new(100 + i),
                Some(PlayerId(1)),
                EntityId::new(0),
                EntityId::new(i),
                Tick::EPOCH,
            ))
            .unwrap();
    }
    state
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    /// Shields stay within `0..=capacity` no matter what is thrown at them.
    #[test]
    fn shields_always_clamped(ops in prop::collection::vec(shield_op_strategy(), 1..40)) {
        let mut shields = ShieldManager::new(20);
        for op in ops {
            match op {
                ShieldOp::Set(v) => shields.set_shields(v),
                ShieldOp::Add(v) => { shields.add_shields(v); }
                ShieldOp::Remove(v) => { shields.remove_shields(v); }
                ShieldOp::Capacity(c) => shields.set_capacity(c),
                ShieldOp::Toggle => shields.toggle(),
            }
            prop_assert!(shields.capacity() >= 0);
            prop_assert!(shields.shields() >= 0);
            prop_assert!(shields.shields() <= shields.capacity());
        }
    }

    /// Add/remove returns exactly the amount the shield value moved by.
    #[test]
    fn shield_deltas_are_exact(start in 0..30i32, amount in 0..60i32) {
        let mut shields = ShieldManager::with_shields(30, start);
        let added = shields.add_shields(amount);
        prop_assert_eq!(shields.remove_shields(added), added);
        prop_assert_eq!(shields.shields(), start);
    }

    /// A roster never grows past its capacity through the checked API.
    #[test]
    fn roster_never_exceeds_capacity(
        capacity in 0..6usize,
        ops in prop::collection::vec(roster_op_strategy(), 1..40),
    ) {
        let mut roster = SpecialistManager::new(capacity);
        for op in ops {
            match op {
                RosterOp::Add(id) => {
                    let _ = roster.add_specialist(Specialist::new(SpecialistId(id), "s", PlayerId(1), 1));
                }
                RosterOp::Remove(id) => { roster.remove_specialist(SpecialistId(id)); }
            }
            prop_assert!(roster.count() <= roster.capacity());
        }
    }

    /// Absorbing then reinstating any subset of subs restores the state.
    #[test]
    fn sub_relocations_reversible(picks in prop::collection::vec(0..8u64, 0..8)) {
        let mut state = outpost_state(8);
        let before = state.clone();
        let mut removed = Vec::new();
        for p in picks {
            let id = EntityId::new(100 + p);
            if state.remove_sub(id) {
                removed.push(id);
            }
        }
        for id in removed.into_iter().rev() {
            prop_assert!(state.add_sub(id));
        }
        prop_assert_eq!(state.state_hash(), before.state_hash());
        prop_assert_eq!(state, before);
    }
}
