mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::io::Write;
use std::time::Instant;

use cli::Cli;
use vocal_runner::audio::decode;
use vocal_runner::audio::source::{FileSource, FrameSource, ToneSource};
use vocal_runner::config::{self, GameConfig};
use vocal_runner::{GameLoop, VocalLevel};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    if cli.list_devices {
        return list_devices();
    }

    let mut cfg = match cli.config.clone().or_else(config::discover_config_path) {
        Some(path) => {
            let cfg = config::load_config(&path)?;
            log::info!("Loaded config from {}", path.display());
            cfg
        }
        None => GameConfig::default(),
    };
    apply_overrides(&mut cfg, &cli);
    cfg.validate().context("Refusing to start")?;

    let mut source = open_source(&cli, &cfg)?;
    let mut game = GameLoop::new(&cfg)?;
    let dt = source.frame_duration();

    log::info!("vocal-runner - voice-controlled runner");
    log::info!(
        "Thresholds: {:.3} / {:.3} / {:.3}, window {} frames of {} samples ({:.1} ms)",
        cfg.classifier.min_voice,
        cfg.classifier.whisper_max,
        cfg.classifier.normal_max,
        cfg.classifier.history_window,
        cfg.audio.frame_size,
        dt.as_secs_f64() * 1000.0
    );

    let limit = cli.ticks.or_else(|| source.frames_hint().map(|n| n as u64));
    let pb = match limit {
        Some(total) if !cli.json => {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ticks {msg}")?
                    .progress_chars("=>-"),
            );
            Some(pb)
        }
        _ => None,
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut histogram: BTreeMap<VocalLevel, u64> = BTreeMap::new();
    let started = Instant::now();

    let result = (|| -> Result<()> {
        while cli.ticks.map_or(true, |max| game.ticks() < max) {
            let Some(frame) = source.next_frame()? else {
                break;
            };
            let state = game.tick(&frame, dt)?;
            *histogram.entry(state.level).or_insert(0) += 1;

            if cli.json {
                serde_json::to_writer(&mut out, &state)?;
                out.write_all(b"\n")?;
            }
            if let Some(ref pb) = pb {
                pb.set_position(state.tick);
                pb.set_message(format!("{:<7} {:>5.1}%", state.level.as_str(), state.volume_percent));
            }
            if cli.realtime {
                let target = dt * state.tick as u32;
                if let Some(wait) = target.checked_sub(started.elapsed()) {
                    std::thread::sleep(wait);
                }
            }
        }
        Ok(())
    })();

    if let Some(pb) = pb {
        pb.finish_with_message("done");
    }
    game.shutdown();
    if let Err(err) = result {
        log::error!("Game loop halted at tick {}: {:#}", game.ticks(), err);
        return Err(err);
    }

    let summary: Vec<String> = histogram
        .iter()
        .map(|(level, count)| format!("{}={}", level, count))
        .collect();
    log::info!("Levels: {}", summary.join(" "));
    Ok(())
}

fn apply_overrides(cfg: &mut GameConfig, cli: &Cli) {
    if let Some(frame_size) = cli.frame_size {
        cfg.audio.frame_size = frame_size;
    }
    if let Some(seed) = cli.seed {
        cfg.track.seed = Some(seed);
    }
    if cli.debug_level.is_some() {
        cfg.classifier.debug_level = cli.debug_level;
    }
}

fn open_source(cli: &Cli, cfg: &GameConfig) -> Result<Box<dyn FrameSource>> {
    let frame_size = cfg.audio.frame_size;

    if cli.mic {
        return open_mic(cli, frame_size);
    }
    if !cli.tone.is_empty() {
        log::info!("Source: synthetic tone, {} steps", cli.tone.len());
        return Ok(Box::new(ToneSource::new(cli.tone.clone(), frame_size)?));
    }

    let input = cli
        .input
        .as_ref()
        .context("An audio file, --tone schedule or --mic is required")?;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    log::info!("Source: {}", input.display());
    let audio = decode::decode_file(input)?;
    Ok(Box::new(FileSource::new(audio, frame_size)?))
}

#[cfg(feature = "mic")]
fn open_mic(cli: &Cli, frame_size: usize) -> Result<Box<dyn FrameSource>> {
    let mic = vocal_runner::audio::mic::MicSource::open(cli.device.as_deref(), frame_size)
        .context("Failed to open microphone")?;
    Ok(Box::new(mic))
}

#[cfg(not(feature = "mic"))]
fn open_mic(_cli: &Cli, _frame_size: usize) -> Result<Box<dyn FrameSource>> {
    anyhow::bail!(
        "Microphone support requires the 'mic' feature. \
         Rebuild with: cargo build --features mic"
    )
}

#[cfg(feature = "mic")]
fn list_devices() -> Result<()> {
    println!("Input devices:");
    for name in vocal_runner::audio::mic::list_devices()? {
        println!("  {}", name);
    }
    Ok(())
}

#[cfg(not(feature = "mic"))]
fn list_devices() -> Result<()> {
    anyhow::bail!("Device listing requires the 'mic' feature")
}
