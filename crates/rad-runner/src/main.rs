//! Headless RAD expansion runner.
//!
//! Drives the full controller flow against `c64-sim`: boot injection, bus
//! takeover, intro sound through the DAC, fade-out and engine handoff.

mod options;

use std::error::Error;
use std::f64::consts::TAU;

use c64_sim::{BootingTarget, SimulatedC64};
use clap::Parser;
use rad_core::Observable;
use rad_expansion::{
    AssetCatalog, Controller, ControllerConfig, ControllerError, DacTable, GameEngine, wave,
};

use options::Options;

/// Tone played when no intro sound is given.
const TONE_HZ: f64 = 440.0;

/// Fade step per producer pass once the intro ends.
const FADE_STEP: u32 = 2;

/// Stands in for the game engine: logs what it would load.
struct LoggingEngine;

impl GameEngine for LoggingEngine {
    fn begin(&mut self, asset_path: &str) {
        log::info!("engine started with {asset_path}");
    }
}

fn tone(rate: u32) -> Vec<u8> {
    let period = ((f64::from(rate) / TONE_HZ).round() as u32).max(1);
    (0..period)
        .map(|i| {
            let phase = TAU * f64::from(i) / f64::from(period);
            (128.0 + 127.0 * phase.sin()).round() as u8
        })
        .collect()
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let options = Options::parse();

    let mut config = match &options.config {
        Some(path) => ControllerConfig::load(path)?,
        None => ControllerConfig::default(),
    };
    // The simulated port runs its own 32 MHz clock; board presets do not apply.
    config.timing_override = c64_sim::timing().into();
    let rate = config.audio.sample_rate;
    let lead_ms = u64::from(config.audio.lead_ms);

    let dac = match &options.dac_table {
        Some(path) => DacTable::load(path)?,
        None => DacTable::linear(),
    };
    let source = match &options.wav {
        Some(path) => wave::load_samples(path)?.at_rate(rate),
        None => tone(rate),
    };

    let mut c64 = SimulatedC64::new(BootingTarget::stalling(options.stall_boots));
    let clock = c64.clock();
    let mut controller = Controller::new(&mut c64, clock, config)?;

    let report = controller.boot()?;
    log::info!(
        "boot: {} iterations, {} watchdog resets",
        report.iterations,
        report.watchdog_resets
    );

    controller.start_playback(source, dac)?;
    controller.run_for(options.duration_ms * 1_000)?;
    controller.fade_out(FADE_STEP);
    while !controller.is_silent() {
        controller.run_for(1_000)?;
    }
    // Let the faded samples already in the ring play out.
    controller.run_for(lead_ms * 1_000)?;

    let catalog = AssetCatalog::scan(&options.assets);
    for entry in catalog.entries() {
        log::info!("{}) {} [{}]", entry.key, entry.title, entry.path);
    }
    match controller.hand_off(&catalog, options.asset.as_deref(), &mut LoggingEngine) {
        Ok(_) => {}
        Err(ControllerError::AssetChoiceRequired(choices)) => {
            eprintln!("Several game data files found; pass --asset with one of:");
            for choice in &choices {
                eprintln!("  {choice}");
            }
            return Err(ControllerError::AssetChoiceRequired(choices).into());
        }
        Err(e) => return Err(e.into()),
    }

    log::info!("injector: {}", controller.injector().describe());
    log::info!("channel: {}", controller.channel().describe());
    log::info!("player: {}", controller.player().describe());

    if let Some(path) = &options.capture {
        let values: Vec<u8> = c64.dac_samples().collect();
        wave::save_capture(&values, rate, path)?;
    }
    if !c64.violations().is_empty() {
        log::warn!("port reported {} protocol violations", c64.violations().len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_is_one_period_centred_on_silence() {
        let samples = tone(22_050);
        assert_eq!(samples.len(), 50);
        assert_eq!(samples[0], 128);
        assert!(samples.iter().any(|&s| s == 255));
        assert!(samples.iter().any(|&s| s <= 2));
    }

    #[test]
    fn options_parse() {
        let options = Options::parse_from([
            "rad-runner",
            "--duration-ms",
            "100",
            "--stall-boots",
            "1",
            "--asset",
            "B",
        ]);
        assert_eq!(options.duration_ms, 100);
        assert_eq!(options.stall_boots, 1);
        assert_eq!(options.asset.as_deref(), Some("B"));
        assert!(options.wav.is_none());
    }
}
