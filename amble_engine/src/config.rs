//! Engine configuration: seed, save directory, dev-mode flag, view mode.
//!
//! Grounded in `xtask`'s existing use of `clap::Parser` within the same
//! workspace, plus the teacher's `save_files.rs` pattern of resolving a
//! per-user save directory lazily; `dirs` is the teacher's crate for
//! locating it.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ViewMode {
    Plain,
    Colored,
}

/// Command-line configuration for one engine run.
#[derive(Debug, Clone, Parser)]
#[command(name = "amble_engine", about = "A data-first interactive fiction engine.")]
pub struct EngineConfig {
    /// Path to a world definition file to load.
    #[arg(long)]
    pub world: Option<PathBuf>,

    /// Seed for the RNG stream; omit for an entropy-seeded run.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory save files are read from and written to.
    #[arg(long)]
    pub save_dir: Option<PathBuf>,

    /// Enables extra debug commands and verbose logging.
    #[arg(long, default_value_t = false)]
    pub dev_mode: bool,

    #[arg(long, value_enum, default_value_t = ViewMode::Colored)]
    pub view_mode: ViewMode,
}

impl EngineConfig {
    /// Resolves the effective save directory: the explicit flag, or the
    /// user's data directory (`dirs::data_dir`) under `amble/saves`,
    /// falling back to the current directory if neither is available.
    pub fn resolve_save_dir(&self) -> PathBuf {
        self.save_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("amble").join("saves"))
                .unwrap_or_else(|| PathBuf::from("."))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_save_dir_is_used_verbatim() {
        let cfg = EngineConfig { world: None, seed: None, save_dir: Some(PathBuf::from("/tmp/saves")), dev_mode: false, view_mode: ViewMode::Plain };
        assert_eq!(cfg.resolve_save_dir(), PathBuf::from("/tmp/saves"));
    }
}
