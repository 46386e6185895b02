//! Headless battle runner
//!
//! Materializes the demo skirmish and lets the AI fight it out,
//! printing the battle log and the terminal state. Useful for
//! balancing passes and determinism spot checks.

use clap::Parser;

use grimfield::battle::{Engagement, Engine, GamePhase};
use grimfield::render::build_render_context;
use grimfield::scenario;

#[derive(Parser, Debug)]
#[command(name = "battle_runner", about = "Run an AI-vs-AI skirmish headless")]
struct Args {
    /// Session seed; identical seeds replay identical battles
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Safety cap on timeline activations
    #[arg(long, default_value_t = 400)]
    max_activations: u64,

    /// Print the final render context as JSON
    #[arg(long)]
    dump_context: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let plan = scenario::demo_skirmish();
    let state = scenario::materialize(&plan, args.seed)?;
    let mut engine = Engine::new(state);
    engine.start()?;

    let mut activations = 0u64;
    while activations < args.max_activations {
        match engine.advance()? {
            Engagement::BattleOver => break,
            Engagement::AwaitingInput(unit) => {
                // The demo roster is fully AI-driven; a human unit here
                // means the scenario was edited, so just stand it down.
                log::warn!("unit {:?} awaiting input in headless run; waiting it out", unit);
                engine.handle_input(grimfield::input::InputEvent::Confirm)?;
                engine.handle_input(grimfield::input::InputEvent::Confirm)?;
                engine.handle_input(grimfield::input::InputEvent::QuickWait)?;
            }
            _ => {}
        }
        activations += 1;
    }

    println!("== {} ==", engine.state.scenario_name);
    for line in engine.state.log.iter() {
        println!("[t{:>4}] {}", line.tick, line.text);
    }

    let outcome = match engine.state.phase {
        GamePhase::GameOver => "battle decided",
        _ => "activation cap reached",
    };
    println!(
        "-- {} after {} activations at tick {} --",
        outcome,
        activations,
        engine.state.now()
    );

    if args.dump_context {
        let context = build_render_context(&engine.state, 24, 12);
        println!("{}", serde_json::to_string_pretty(&context)?);
    }
    Ok(())
}
