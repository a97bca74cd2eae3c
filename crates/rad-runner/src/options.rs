use std::path::PathBuf;

use clap::Parser;

/// Boot a simulated C64 through the RAD expansion, play the intro sound
/// over the SID volume register and hand off to the game engine.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Options {
    /// Controller configuration (TOML). Defaults apply when omitted.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Intro sound. A generated tone plays when omitted.
    #[arg(long, value_name = "PATH")]
    pub wav: Option<PathBuf>,

    /// Measured 256-byte DAC table.
    #[arg(long, value_name = "PATH")]
    pub dac_table: Option<PathBuf>,

    /// How long to play before fading out.
    #[arg(long, default_value_t = 500)]
    pub duration_ms: u64,

    /// Write the values the DAC received to a WAV file.
    #[arg(long, value_name = "PATH")]
    pub capture: Option<PathBuf>,

    /// Boots that hang before the vector fetch, to exercise the watchdog.
    #[arg(long, default_value_t = 0)]
    pub stall_boots: u32,

    /// Storage root searched for game data files.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub assets: PathBuf,

    /// Data file to start, by path or menu key, when several are present.
    #[arg(long)]
    pub asset: Option<String>,
}
