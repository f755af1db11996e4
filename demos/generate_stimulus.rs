//! Example: Generate a trial stimulus
//!
//! Usage:
//!   cargo run --example generate_stimulus -- [--ear left|right] <out.wav> <info.json> <ioi_ms>...
//!
//! Writes the stimulus audio and its onset timing (JSON), which
//! `analyze_trial` needs to analyze the recording.

use std::env;
use std::fs::File;

use tapsync_dsp::io::wav::write_wav;
use tapsync_dsp::preprocessing::channel_mixer::route_to_ear;
use tapsync_dsp::{generate, Ear, IoiSequence, TrialConfig, Waveform};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let mut ear: Option<Ear> = None;
    if args.first().map(String::as_str) == Some("--ear") {
        args.remove(0);
        let side = args.first().ok_or("--ear requires left or right")?.clone();
        args.remove(0);
        ear = Some(match side.as_str() {
            "left" => Ear::Left,
            "right" => Ear::Right,
            other => return Err(format!("unknown ear '{other}'").into()),
        });
    }

    if args.len() < 3 {
        eprintln!("Usage: generate_stimulus [--ear left|right] <out.wav> <info.json> <ioi_ms>...");
        std::process::exit(2);
    }
    let wav_path = args[0].clone();
    let info_path = args[1].clone();
    let intervals = args[2..]
        .iter()
        .map(|s| s.parse::<f64>())
        .collect::<Result<Vec<_>, _>>()?;

    let config = TrialConfig::default();
    let ioi = IoiSequence::new(intervals)?;
    let stimulus = generate(&ioi, &config)?;

    let audio = match ear {
        Some(ear) => Waveform::new(
            route_to_ear(stimulus.waveform.samples(), ear),
            stimulus.waveform.sample_rate(),
            2,
        )?,
        None => stimulus.waveform.clone(),
    };
    write_wav(&wav_path, &audio)?;
    serde_json::to_writer_pretty(File::create(&info_path)?, &stimulus.info)?;

    println!("Stimulus:");
    println!("  Beats: {}", stimulus.info.stim_onsets.len());
    println!("  Markers: {}", stimulus.info.markers.len());
    println!("  Rhythm starts at: {:.1} ms", stimulus.info.rhythm_start_ms);
    println!("  Duration: {:.1} ms", stimulus.info.duration_ms);
    println!("  Wrote {} and {}", wav_path, info_path);

    Ok(())
}
