//! Example: Analyze a single trial recording
//!
//! Usage:
//!   cargo run --example analyze_trial -- [--json] <recording> <info.json>
//!
//! `info.json` is the stimulus timing written by `generate_stimulus`. The
//! recording can be any format Symphonia decodes.

use std::env;
use std::fs::File;

use tapsync_dsp::io::decoder::decode_audio;
use tapsync_dsp::{run_trial, StimulusInfo, TrialConfig, TrialOutcome};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let json = args.first().map(String::as_str) == Some("--json");
    if json {
        args.remove(0);
    }
    if args.len() != 2 {
        eprintln!("Usage: analyze_trial [--json] <recording> <info.json>");
        std::process::exit(2);
    }

    let recording = decode_audio(&args[0])?;
    let info: StimulusInfo = serde_json::from_reader(File::open(&args[1])?)?;
    let config = TrialConfig::default();

    let outcome = run_trial(&recording, &info, &config);

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    match &outcome {
        TrialOutcome::Completed(analysis) => {
            let r = &analysis.result;
            println!("Trial Results:");
            println!("  Stimuli: {} ({} detected)", r.total_stimuli, r.detected_stimuli);
            println!("  Responses: {} ({} aligned)", r.total_responses, r.aligned_responses);
            println!(
                "  Asynchrony: {:.2} ms (sd {:.2} ms)",
                r.mean_asynchrony_ms, r.sd_asynchrony_ms
            );
            println!("  Responses aligned: {:.1}%", r.percent_responses_aligned);
            println!("  Bad taps: {:.1}%", r.percent_bad_taps);
            println!(
                "  Markers: {}/{} (max error {:.2} ms)",
                r.markers_detected, r.num_markers, r.max_marker_error_ms
            );
            println!("  Processing time: {:.2} ms", analysis.metadata.processing_time_ms);
            for warning in &analysis.metadata.warnings {
                println!("  Warning: {}", warning);
            }
        }
        TrialOutcome::Failed { reason, message } => {
            println!("Trial failed ({}): {}", reason, message);
        }
    }

    Ok(())
}
