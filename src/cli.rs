use clap::Parser;
use std::path::PathBuf;

use vocal_runner::audio::source::ToneStep;
use vocal_runner::VocalLevel;

#[derive(Parser, Debug)]
#[command(name = "vocal-runner", about = "Voice-controlled runner: loudness scrolls the track, shouting jumps")]
pub struct Cli {
    /// Audio file to replay as the microphone (WAV, MP3, FLAC, OGG)
    pub input: Option<PathBuf>,

    /// Synthetic tone schedule as rms:ticks steps, e.g. 0.0:60,0.2:30,0.08:120
    #[arg(long, value_delimiter = ',', conflicts_with = "input")]
    pub tone: Vec<ToneStep>,

    /// Capture from the microphone
    #[arg(long, conflicts_with_all = ["input", "tone"])]
    pub mic: bool,

    /// Input device name (with --mic)
    #[arg(long, requires = "mic")]
    pub device: Option<String>,

    /// List input devices and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Config file (defaults to ./vocal-runner.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Samples per analysis frame
    #[arg(long)]
    pub frame_size: Option<usize>,

    /// Stop after this many ticks
    #[arg(long)]
    pub ticks: Option<u64>,

    /// Seed for segment generation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Replace classification with a fixed level (silent, whisper, normal, shout)
    #[arg(long)]
    pub debug_level: Option<VocalLevel>,

    /// Print one JSON render snapshot per tick to stdout
    #[arg(long)]
    pub json: bool,

    /// Pace ticks at the audio frame rate instead of running flat out
    #[arg(long)]
    pub realtime: bool,
}
