//! Property tests for the time machine.
//!
//! Random event logs are scheduled against a small fixed map and the
//! machine is driven forward and back. The properties checked:
//!
//! - rewinding restores every intermediate state exactly,
//! - fresh machines fed the same log agree, whether the log is submitted up
//!   front or retroactively after the fact,
//! - for batches whose undo is purely delta-based, both undo orders agree.

use proptest::prelude::*;
use subterfuge_engine::command::{CommandMeta, CommandPayload, PlayerCommand};
use subterfuge_engine::prelude::*;

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

const HORIZON: u64 = 18;

fn outposts() -> [EntityId; 3] {
    [EntityId::new(1), EntityId::new(2), EntityId::new(3)]
}

fn combatants() -> [CombatantId; 7] {
    [
        CombatantId::Outpost(EntityId::new(1)),
        CombatantId::Outpost(EntityId::new(2)),
        CombatantId::Outpost(EntityId::new(3)),
        CombatantId::Sub(EntityId::new(10)),
        CombatantId::Sub(EntityId::new(11)),
        CombatantId::Sub(EntityId::new(12)),
        CombatantId::Sub(EntityId::new(100)),
    ]
}

fn specialist(id: u32, owner: PlayerId) -> Specialist {
    Specialist::new(SpecialistId(id), "agent", owner, 1 + id as i32 % 3)
}

fn initial_state() -> GameState {
    let p1 = PlayerId(1);
    let p2 = PlayerId(2);
    let [o1, o2, o3] = outposts();
    let mut state = GameState::new();
    state
        .add_player(Player::new(p1, "one").with_specialist_pool(SpecialistPool::new(vec![
            specialist(20, p1),
            specialist(21, p1),
        ])))
        .unwrap();
    state
        .add_player(Player::new(p2, "two").with_specialist_pool(SpecialistPool::new(vec![
            specialist(30, p2),
        ])))
        .unwrap();
    state
        .add_outpost(
            Outpost::new(o1, Some(p1))
                .with_drillers(20)
                .with_driller_capacity(60)
                .with_shields(10, 5)
                .with_specialists(SpecialistManager::from_parts(4, vec![specialist(1, p1)])),
        )
        .unwrap();
    state
        .add_outpost(
            Outpost::new(o2, Some(p2))
                .with_drillers(15)
                .with_driller_capacity(50)
                .with_shields(10, 3)
                .with_specialists(SpecialistManager::new(3)),
        )
        .unwrap();
    state
        .add_outpost(Outpost::new(o3, None).with_drillers(8).with_shields(5, 5))
        .unwrap();
    state
        .insert_sub(
            Sub::new(EntityId::new(10), Some(p1), o3, o1, Tick::EPOCH)
                .with_drillers(6)
                .with_specialists(3, vec![specialist(2, p1)]),
        )
        .unwrap();
    state
        .insert_sub(Sub::new(EntityId::new(11), Some(p2), o2, o1, Tick::EPOCH).with_drillers(9))
        .unwrap();
    state
        .insert_sub(Sub::new(EntityId::new(12), Some(p1), o1, o2, Tick::EPOCH).with_drillers(4))
        .unwrap();
    state
}

fn config(undo_order: UndoOrder) -> SimConfig {
    SimConfig {
        ticks_per_production: 4,
        base_production_amount: 5,
        ticks_per_shield_regeneration: 3,
        base_shield_regeneration: 2,
        sub_specialist_capacity: 2,
        undo_order,
    }
}

fn machine(undo_order: UndoOrder) -> TimeMachine {
    let mut tm = TimeMachine::new(initial_state(), config(undo_order)).unwrap();
    for outpost in outposts() {
        tm.add_driller_producer(outpost);
        tm.add_shield_producer(outpost);
    }
    tm
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Op {
    ShieldCombat(usize, usize),
    DrillerCombat(usize, usize),
    Destroy(usize),
    Arrive(usize, usize),
    Steal(usize, usize),
    Toggle(u32, usize),
    Hire(u32, usize, u32),
    Launch(u32, usize, usize, i32, bool),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..7usize, 0..7usize).prop_map(|(a, b)| Op::ShieldCombat(a, b)),
        (0..7usize, 0..7usize).prop_map(|(a, b)| Op::DrillerCombat(a, b)),
        (0..3usize).prop_map(Op::Destroy),
        (0..3usize, 0..3usize).prop_map(|(s, o)| Op::Arrive(s, o)),
        (0..7usize, 0..7usize).prop_map(|(a, b)| Op::Steal(a, b)),
        (1..=2u32, 0..3usize).prop_map(|(p, o)| Op::Toggle(p, o)),
        (1..=2u32, 0..7usize, 19..=31u32).prop_map(|(p, l, s)| Op::Hire(p, l, s)),
        (1..=2u32, 0..3usize, 0..3usize, -2..25i32, any::<bool>())
            .prop_map(|(p, src, dst, d, crew)| Op::Launch(p, src, dst, d, crew)),
    ]
}

fn log_strategy() -> impl Strategy<Value = Vec<(u64, Op)>> {
    prop::collection::vec((1..=HORIZON, op_strategy()), 0..24)
}

fn to_event(index: usize, tick: u64, op: &Op) -> GameEvent {
    let at = Tick::new(tick);
    let c = combatants();
    let o = outposts();
    let subs = [EntityId::new(10), EntityId::new(11), EntityId::new(12)];
    let command = |player: u32, payload: CommandPayload| {
        let meta = CommandMeta {
            command_id: format!("cmd-{index}"),
            issued_by: PlayerId(player),
            issued_at_unix_ms: index as u64,
            occurs_at: at,
        };
        GameEvent::player_command(PlayerCommand::from_payload(meta, &payload).unwrap())
    };
    match *op {
        Op::ShieldCombat(a, b) => GameEvent::shield_combat(at, c[a], c[b]),
        Op::DrillerCombat(a, b) => GameEvent::driller_combat(at, c[a], c[b]),
        Op::Destroy(i) => GameEvent::outpost_destruction(at, o[i]),
        Op::Arrive(s, i) => GameEvent::friendly_arrival(at, subs[s], o[i]),
        Op::Steal(a, b) => GameEvent::specialist_steal(at, c[a], c[b]),
        Op::Toggle(p, i) => command(p, CommandPayload::ToggleShield { outpost: o[i] }),
        Op::Hire(p, l, s) => command(
            p,
            CommandPayload::HireSpecialist {
                hire_location: c[l].entity_id(),
                specialist_id: SpecialistId(s),
            },
        ),
        Op::Launch(p, src, dst, drillers, crew) => command(
            p,
            CommandPayload::LaunchSub {
                source: o[src],
                sub_id: EntityId::new(100 + index as u64 % 2),
                destination: o[dst],
                drillers,
                specialists: if crew { vec![SpecialistId(1)] } else { vec![] },
            },
        ),
    }
}

fn schedule(tm: &mut TimeMachine, log: &[(u64, Op)]) {
    for (index, (tick, op)) in log.iter().enumerate() {
        tm.add_event(to_event(index, *tick, op)).unwrap();
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every state visited on the way forward is restored on the way back.
    #[test]
    fn rewinding_restores_every_tick(log in log_strategy()) {
        let mut tm = machine(UndoOrder::Reversed);
        schedule(&mut tm, &log);
        let initial = tm.state().clone();

        let mut hashes = vec![tm.state_hash()];
        for _ in 0..HORIZON {
            tm.advance(1);
            hashes.push(tm.state_hash());
        }
        for tick in (0..HORIZON as usize).rev() {
            tm.rewind(1);
            prop_assert_eq!(&tm.state_hash(), &hashes[tick]);
        }
        prop_assert_eq!(tm.state(), &initial);
    }

    /// Forward, back, and forward again lands on the same state.
    #[test]
    fn replaying_forward_is_stable(log in log_strategy(), midpoint in 0..HORIZON) {
        let mut tm = machine(UndoOrder::Reversed);
        schedule(&mut tm, &log);
        tm.goto(Tick::new(HORIZON));
        let end = tm.state_hash();
        tm.goto(Tick::new(midpoint));
        tm.goto(Tick::new(HORIZON));
        prop_assert_eq!(tm.state_hash(), end);
    }

    /// Two fresh machines fed the same log agree, and so does a machine that
    /// receives the whole log after already reaching the horizon.
    #[test]
    fn same_log_same_outcome(log in log_strategy()) {
        let mut first = machine(UndoOrder::Reversed);
        schedule(&mut first, &log);
        first.goto(Tick::new(HORIZON));

        let mut second = machine(UndoOrder::Reversed);
        schedule(&mut second, &log);
        second.goto(Tick::new(HORIZON));
        prop_assert_eq!(first.state_hash(), second.state_hash());

        let mut late = machine(UndoOrder::Reversed);
        late.goto(Tick::new(HORIZON));
        schedule(&mut late, &log);
        prop_assert_eq!(late.current_tick(), Tick::new(HORIZON));
        prop_assert_eq!(late.state(), first.state());
    }

    /// Productions undo by subtracting what they added, so the order they are
    /// reverted in does not matter.
    #[test]
    fn delta_batches_undo_in_either_order(
        batch in prop::collection::vec((1..=6u64, 0..3usize, any::<bool>(), 0..8i32), 0..20)
    ) {
        let build = |order| {
            let mut tm = TimeMachine::new(initial_state(), config(order)).unwrap();
            for (tick, outpost, shields, amount) in &batch {
                let resource = if *shields { Resource::Shields } else { Resource::Drillers };
                tm.add_event(GameEvent::new(
                    Tick::new(*tick),
                    Production::new(outposts()[*outpost], resource, *amount),
                ))
                .unwrap();
            }
            tm
        };
        let mut reversed = build(UndoOrder::Reversed);
        let mut literal = build(UndoOrder::SameAsForward);
        let initial = reversed.state().clone();

        reversed.goto(Tick::new(6));
        literal.goto(Tick::new(6));
        prop_assert_eq!(reversed.state(), literal.state());
        for _ in 0..6 {
            reversed.rewind(1);
            literal.rewind(1);
            prop_assert_eq!(reversed.state(), literal.state());
        }
        prop_assert_eq!(literal.state(), &initial);
    }
}
