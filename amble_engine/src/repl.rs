//! The read-eval-print loop front end. Owns nothing the `Engine` doesn't
//! already own; it only drives `Engine::process_input` against a concrete
//! `IoCollaborator` until the engine signals `Quit`.
//!
//! Grounded in the teacher's `run_repl` (repl.rs) for the loop shape --
//! build a prompt, read a line, dispatch, keep going until `ReplControl::Quit`
//! -- generalized from the teacher's inline `AmbleWorld`/`View` handling into
//! a loop over the engine façade's own `process_input`/`EngineControl`.

use log::info;

use crate::config::EngineConfig;
use crate::engine::{Engine, EngineControl, HandlerRegistry};
use crate::event::HookRegistry;
use crate::handlers::stock_handlers;
use crate::io::{CliIo, IoCollaborator, Style};
use crate::loader::load_world;
use crate::rng::{RngStream, StdRngStream};
use crate::turn::TimerRegistry;
use crate::vocab::stock_vocabulary;
use crate::world::GameState;

/// Assembles the default `Engine` a fresh run starts with: the stock verb
/// library, the stock vocabulary, empty hook/timer registries (content
/// authors register their own hooks/fuses/daemons after loading a world),
/// and an RNG stream seeded from `config` (or entropy, if none was given).
pub fn build_engine(state: GameState, config: &EngineConfig) -> Engine {
    let rng: Box<dyn RngStream> = match config.seed {
        Some(seed) => Box::new(StdRngStream::from_seed(seed)),
        None => Box::new(StdRngStream::from_entropy()),
    };
    Engine::new(state, stock_vocabulary(), stock_handlers(), HookRegistry::default(), TimerRegistry::default(), rng)
}

/// Builds a bare `Engine` around an already-assembled registry set, for
/// callers (tests, alternate front ends) that want their own handlers or
/// vocabulary instead of the stock library.
pub fn build_engine_with(
    state: GameState,
    vocab: crate::vocab::Vocabulary,
    handlers: HandlerRegistry,
    hooks: HookRegistry,
    timers: TimerRegistry,
    rng: Box<dyn RngStream>,
) -> Engine {
    Engine::new(state, vocab, handlers, hooks, timers, rng)
}

/// Runs the main read-eval-print loop until a handler signals `Quit` or
/// input is exhausted (end-of-input is treated the same as typing "quit").
pub fn run_repl(engine: &mut Engine, io: &mut dyn IoCollaborator) {
    info!("starting the game");
    loop {
        let prompt = build_prompt(engine);
        let Some(input) = io.read_line(&prompt) else {
            io.write("Goodbye.", Style::Normal);
            break;
        };
        match engine.process_input(&input, io) {
            EngineControl::Continue => {}
            EngineControl::Quit => break,
        }
        io.flush();
    }
}

fn build_prompt(engine: &Engine) -> String {
    format!("\n[Turn {} | Score: {}]>> ", engine.state.player.moves, engine.state.player.score)
}

/// Loads a `WorldDef` from `path` (or the path `config` carries) and builds
/// a ready-to-run `Engine` around it, using `amble_data`'s TOML deserializer
/// the same way the teacher's own loader reads static world content.
pub fn load_engine_from_path(path: &std::path::Path, config: &EngineConfig) -> anyhow::Result<Engine> {
    let contents = std::fs::read_to_string(path)?;
    let world_def: amble_data::WorldDef = toml::from_str(&contents)?;
    let state = load_world(&world_def)?;
    Ok(build_engine(state, config))
}

/// Opens the default `CliIo` front end (`rustyline` + `colored` + `textwrap`).
pub fn default_io() -> rustyline::Result<CliIo> {
    CliIo::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ScriptedIo;
    use crate::world::tests_support::empty_state;

    #[test]
    fn quit_ends_the_repl_loop() {
        let mut engine = build_engine(empty_state(), &EngineConfig { world: None, seed: Some(1), save_dir: None, dev_mode: false, view_mode: crate::config::ViewMode::Plain });
        let mut io = ScriptedIo::with_input(["look", "quit"]);
        run_repl(&mut engine, &mut io);
        assert!(io.output.iter().any(|(text, _)| text == "Goodbye."));
    }

    #[test]
    fn end_of_input_is_treated_like_quit() {
        let mut engine = build_engine(empty_state(), &EngineConfig { world: None, seed: Some(1), save_dir: None, dev_mode: false, view_mode: crate::config::ViewMode::Plain });
        let mut io = ScriptedIo::default();
        run_repl(&mut engine, &mut io);
        assert_eq!(io.output.last().unwrap().0, "Goodbye.");
    }
}
