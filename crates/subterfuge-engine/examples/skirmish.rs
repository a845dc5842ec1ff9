//! Headless skirmish -- two players, three outposts, a few ticks of combat,
//! production, and commands, then a rewind and a replay check.
//!
//! Run with:
//!   cargo run --example skirmish -p subterfuge-engine [-- config.json]
//!
//! Set `RUST_LOG=subterfuge_engine=debug` to see every settled tick.

use std::cell::RefCell;
use std::rc::Rc;

use subterfuge_engine::prelude::*;

// ---------------------------------------------------------------------------
// Scene setup
// ---------------------------------------------------------------------------

const ALICE: PlayerId = PlayerId(1);
const BOB: PlayerId = PlayerId(2);
const KEEP: EntityId = EntityId::new(1);
const HARBOR: EntityId = EntityId::new(2);
const RIDGE: EntityId = EntityId::new(3);
const RAIDERS: EntityId = EntityId::new(10);

fn initial_map() -> Result<GameState, StateError> {
    let mut state = GameState::new();
    state.add_player(Player::new(ALICE, "alice").with_specialist_pool(SpecialistPool::new(
        vec![
            Specialist::new(SpecialistId(100), "Navigator", ALICE, 2),
            Specialist::new(SpecialistId(101), "Helmsman", ALICE, 1),
        ],
    )))?;
    state.add_player(Player::new(BOB, "bob"))?;

    state.add_outpost(
        Outpost::new(KEEP, Some(ALICE))
            .with_name("Keep")
            .with_drillers(30)
            .with_driller_capacity(80)
            .with_shields(15, 10)
            .with_specialists(SpecialistManager::new(4)),
    )?;
    state.add_outpost(
        Outpost::new(HARBOR, Some(BOB))
            .with_name("Harbor")
            .with_drillers(25)
            .with_driller_capacity(80)
            .with_shields(10, 5),
    )?;
    state.add_outpost(Outpost::new(RIDGE, None).with_name("Ridge").with_drillers(12))?;
    state.insert_sub(Sub::new(RAIDERS, Some(BOB), HARBOR, KEEP, Tick::EPOCH).with_drillers(18))?;
    Ok(state)
}

fn command(id: &str, by: PlayerId, at: u64, payload: CommandPayload) -> anyhow::Result<GameEvent> {
    let meta = CommandMeta {
        command_id: id.to_owned(),
        issued_by: by,
        issued_at_unix_ms: 1_700_000_000_000 + at,
        occurs_at: Tick::new(at),
    };
    Ok(GameEvent::player_command(PlayerCommand::from_payload(
        meta, &payload,
    )?))
}

fn describe(state: &GameState) -> String {
    state
        .live_outposts()
        .map(|o| {
            format!(
                "{}={}d/{}s",
                o.name(),
                o.driller_carrier().drillers(),
                o.shield_manager().shields()
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => SimConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => SimConfig {
            ticks_per_production: 6,
            ticks_per_shield_regeneration: 4,
            ..SimConfig::default()
        },
    };

    let mut tm = TimeMachine::new(initial_map()?, config)?;
    for outpost in [KEEP, HARBOR] {
        tm.add_driller_producer(outpost);
        tm.add_shield_producer(outpost);
    }

    let timeline = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&timeline);
    tm.subscribe(move |e: &TickChanged<'_>| {
        sink.borrow_mut()
            .push(format!("{} {}: {}", e.direction, e.tick, describe(e.state)));
    });

    let mut recorder = ReplayRecorder::new(&tm);
    let raid = (CombatantId::Sub(RAIDERS), CombatantId::Outpost(KEEP));
    recorder.submit(&mut tm, GameEvent::shield_combat(Tick::new(5), raid.0, raid.1))?;
    recorder.submit(&mut tm, GameEvent::driller_combat(Tick::new(5), raid.0, raid.1))?;
    recorder.submit(
        &mut tm,
        command(
            "hire-navigator",
            ALICE,
            3,
            CommandPayload::HireSpecialist {
                hire_location: KEEP,
                specialist_id: SpecialistId(100),
            },
        )?,
    )?;
    recorder.submit(
        &mut tm,
        command(
            "counterattack",
            ALICE,
            7,
            CommandPayload::LaunchSub {
                source: KEEP,
                sub_id: EntityId::new(11),
                destination: RIDGE,
                drillers: 10,
                specialists: vec![SpecialistId(100)],
            },
        )?,
    )?;
    recorder.submit(
        &mut tm,
        command(
            "bluff",
            BOB,
            7,
            CommandPayload::ToggleShield { outpost: KEEP },
        )?,
    )?;

    tm.goto(Tick::new(6));
    let after_raid = tm.state_hash();
    let summary = tm.goto(Tick::new(12));
    recorder.record_checkpoint(&tm);
    println!(
        "advanced to tick {}: {} applied, {} failed, {} unsupported",
        summary.to, summary.applied, summary.failed, summary.unsupported
    );

    let summary = tm.rewind(6);
    println!(
        "rewound {} ticks, reverted {} events",
        summary.ticks_stepped, summary.reverted
    );
    anyhow::ensure!(
        tm.state_hash() == after_raid,
        "rewinding to tick 6 did not restore the state"
    );

    tm.goto(Tick::new(15));
    let log = recorder.finish(&tm);

    for line in timeline.borrow().iter() {
        println!("{line}");
    }

    let result = replay(&log)?;
    println!(
        "replay: {} entries, completed={}, state hash {}",
        result.entries_replayed, result.completed, log.final_hash
    );
    if let Some(divergence) = result.first_divergence {
        anyhow::bail!("replay diverged at tick {}", divergence.tick);
    }
    Ok(())
}
