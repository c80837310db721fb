//! Demo/simulation driver: loads a small embedded profile, replays a
//! scripted input sequence through the full pipeline, and prints every
//! execution event plus the synthesized output stream. Not a
//! profile-authoring CLI — just a harness for exercising the engine end
//! to end without a real OS hook.

use std::sync::Arc;

use conundrum_core::sim::{SimScript, SimulatedInput, SimulatedOutput};
use conundrum_core::{Engine, InputSource, MacroProfile};
use simplelog::{ColorChoice, CombinedLogger, Config, LevelFilter, TermLogger, TerminalMode};

const DEMO_PROFILE: &str = r#"
{
  "name": "demo",
  "description": "quadruple-tap F13 types \"hi\" with a brief human-like cadence",
  "gesture_timing_configuration": {
    "multi_press_window": 350,
    "long_press_min": 80,
    "long_press_max": 145,
    "super_long_min": 146,
    "super_long_max": 400,
    "cancel_threshold": 900,
    "debounce_delay": 5
  },
  "bindings": [
    {
      "name": "greet",
      "trigger": { "key": "F13", "gesture": "Single" },
      "sequence": [
        { "key": "H", "buffer_tier": "low", "echo_hits": 1 },
        { "key": "I", "buffer_tier": "low", "echo_hits": 1 }
      ]
    }
  ]
}
"#;

const DEMO_SCRIPT: &str = "\
0 down F13\n\
20 up F13\n\
";

fn main() -> anyhow::Result<()> {
    CombinedLogger::init(vec![TermLogger::new(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )])?;

    let profile = MacroProfile::from_json(DEMO_PROFILE)?;
    let output = Arc::new(SimulatedOutput::new());
    let engine = Engine::new(
        &profile,
        output.clone(),
        Box::new(|ev| log::info!("execution event: {ev:?}")),
    )?;

    let script = SimScript::parse(DEMO_SCRIPT)?;
    let mut input = SimulatedInput::new(script);
    let orchestrator = engine.orchestrator.clone();
    input.run(&mut |key, down| {
        if down {
            orchestrator.handle_key_down(key);
        } else {
            orchestrator.handle_key_up(key);
        }
    })?;

    // Give the detached executor thread time to finish the bound
    // sequence before the process inspects recorded output and exits.
    std::thread::sleep(std::time::Duration::from_millis(1500));

    for (ts, event) in output.events() {
        log::info!("t={ts}ms output: {event:?}");
    }

    engine.orchestrator.destroy();
    Ok(())
}
