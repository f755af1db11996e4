//! Peak detection on smoothed envelopes
//!
//! Finds local maxima that exceed an absolute height and are separated by a
//! minimum distance (the refractory period, in samples).

/// Find peaks in a signal
///
/// # Arguments
///
/// * `signal` - Signal to find peaks in
/// * `height` - Minimum peak height (absolute)
/// * `min_distance` - Minimum distance between accepted peaks (in samples)
///
/// # Returns
///
/// Vector of (index, value) pairs for detected peaks, sorted by index
///
/// # Algorithm
///
/// 1. Find all local maxima; a flat top counts once, at its middle sample.
///    The first and last samples are never peaks.
/// 2. Filter by height
/// 3. Enforce minimum distance: visit peaks from highest to lowest (equal
///    heights: earlier first) and drop any peak closer than `min_distance`
///    to one already kept
/// 4. Sort by index
///
/// # Example
///
/// ```
/// use tapsync_dsp::features::onset::peak_picking::find_peaks;
///
/// let signal = vec![0.0, 0.5, 1.0, 0.7, 0.3, 0.9, 0.2];
/// let peaks = find_peaks(&signal, 0.5, 2);
/// assert_eq!(peaks, vec![(2, 1.0), (5, 0.9)]);
/// ```
pub fn find_peaks(signal: &[f32], height: f32, min_distance: usize) -> Vec<(usize, f32)> {
    log::debug!(
        "Finding peaks in signal of length {}, height={:.4}, min_distance={}",
        signal.len(),
        height,
        min_distance
    );

    if signal.len() < 3 {
        // Need at least 3 points for local maximum detection
        return vec![];
    }

    let mut peaks = Vec::new();
    let last = signal.len() - 1;
    let mut i = 1;
    while i < last {
        if signal[i - 1] < signal[i] {
            // Walk across a possible plateau
            let mut ahead = i + 1;
            while ahead < last && signal[ahead] == signal[i] {
                ahead += 1;
            }
            if signal[ahead] < signal[i] {
                let centre = (i + ahead - 1) / 2;
                if signal[centre] >= height {
                    peaks.push((centre, signal[centre]));
                }
                i = ahead;
                continue;
            }
            i = ahead;
        } else {
            i += 1;
        }
    }

    if min_distance > 1 && peaks.len() > 1 {
        // Highest first; stable sort keeps equal heights in time order
        let mut by_height = peaks;
        by_height.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut kept: Vec<(usize, f32)> = Vec::new();
        for (idx, value) in by_height {
            let too_close = kept
                .iter()
                .any(|(existing, _)| idx.abs_diff(*existing) < min_distance);
            if !too_close {
                kept.push((idx, value));
            }
        }
        peaks = kept;
    }

    peaks.sort_by_key(|&(idx, _)| idx);

    log::debug!("Found {} peaks", peaks.len());

    peaks
}
