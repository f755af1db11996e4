//! Example: Analyze many trial recordings of the same stimulus in parallel
//!
//! Usage:
//!   cargo run --release --example analyze_batch -- [--jobs N] [--json] <info.json> <rec1> <rec2> ...
//!
//! Notes:
//! - Parallelism is across recordings. Each trial analysis is still single-threaded.
//! - Default workers: one per CPU thread.
//! - A failed trial (decode error, markers not detected) is reported and the batch continues.

use rayon::prelude::*;
use std::env;
use std::fs::File;
use std::time::Instant;
use tapsync_dsp::io::decoder::decode_audio;
use tapsync_dsp::{run_trial, StimulusInfo, TrialConfig, TrialOutcome};

fn usage() -> ! {
    eprintln!("Usage: analyze_batch [--jobs N] [--json] <info.json> <rec1> <rec2> ...");
    std::process::exit(2);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut json = false;
    let mut jobs = 0usize;
    let mut paths: Vec<String> = Vec::new();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--json" => json = true,
            "--jobs" => jobs = args.next().ok_or("--jobs requires a value")?.parse()?,
            "--help" | "-h" => usage(),
            _ => paths.push(arg),
        }
    }
    if paths.len() < 2 {
        usage();
    }
    let info: StimulusInfo = serde_json::from_reader(File::open(paths.remove(0))?)?;

    // 0 lets rayon pick one worker per core
    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;
    eprintln!(
        "Batch: {} recordings, {} workers",
        paths.len(),
        pool.current_num_threads()
    );

    let config = TrialConfig::default();

    let t0 = Instant::now();

    let outs: Vec<(String, TrialOutcome)> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| {
                let outcome = match decode_audio(path) {
                    Ok(recording) => run_trial(&recording, &info, &config),
                    Err(e) => TrialOutcome::Failed {
                        reason: e.reason().to_string(),
                        message: format!("decode failed: {e}"),
                    },
                };
                (path.clone(), outcome)
            })
            .collect()
    });

    for (idx, (path, outcome)) in outs.iter().enumerate() {
        if json {
            println!(
                "{{\"file\":{},\"outcome\":{}}}",
                serde_json::to_string(path)?,
                serde_json::to_string(outcome)?
            );
            continue;
        }
        match outcome {
            TrialOutcome::Completed(analysis) => {
                let r = &analysis.result;
                println!(
                    "[{}/{}] {}: aligned={:.1}% async={:.2}ms (sd={:.2}) bad={:.1}% markers={}/{}",
                    idx + 1,
                    outs.len(),
                    path,
                    r.percent_responses_aligned,
                    r.mean_asynchrony_ms,
                    r.sd_asynchrony_ms,
                    r.percent_bad_taps,
                    r.markers_detected,
                    r.num_markers
                );
            }
            TrialOutcome::Failed { reason, message } => {
                println!(
                    "[{}/{}] {}: FAILED ({}): {}",
                    idx + 1,
                    outs.len(),
                    path,
                    reason,
                    message
                );
            }
        }
    }

    let completed = outs.iter().filter(|(_, o)| !o.is_failed()).count();
    eprintln!(
        "Done: {}/{} trials completed in {:.0} ms",
        completed,
        outs.len(),
        t0.elapsed().as_secs_f64() * 1000.0
    );

    Ok(())
}
