//! Channel mixing utilities (down-mix for detection, ear routing for playback)

use serde::{Deserialize, Serialize};

/// Which headphone channel a stimulus is presented to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ear {
    /// Left channel (index 0)
    Left,
    /// Right channel (index 1)
    Right,
}

impl Ear {
    /// The other ear
    pub fn opposite(self) -> Self {
        match self {
            Ear::Left => Ear::Right,
            Ear::Right => Ear::Left,
        }
    }

    fn channel_index(self) -> usize {
        match self {
            Ear::Left => 0,
            Ear::Right => 1,
        }
    }
}

/// Average interleaved channels down to mono
///
/// A trailing partial frame is ignored.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    log::debug!(
        "Down-mixing {} samples from {} channels",
        interleaved.len(),
        channels
    );
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Place a mono signal in one ear of an interleaved stereo buffer
///
/// The other channel is silent.
pub fn route_to_ear(mono: &[f32], ear: Ear) -> Vec<f32> {
    let mut stereo = vec![0.0f32; mono.len() * 2];
    let channel = ear.channel_index();
    for (frame, &sample) in stereo.chunks_exact_mut(2).zip(mono) {
        frame[channel] = sample;
    }
    stereo
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_stereo() {
        let mono = downmix(&[1.0, 0.0, 0.2, 0.4, -1.0, 1.0], 2);
        assert_eq!(mono.len(), 3);
        assert!((mono[0] - 0.5).abs() < 1e-6);
        assert!((mono[1] - 0.3).abs() < 1e-6);
        assert!(mono[2].abs() < 1e-6);
    }

    #[test]
    fn test_downmix_mono_is_copy() {
        assert_eq!(downmix(&[0.1, 0.2], 1), vec![0.1, 0.2]);
    }

    #[test]
    fn test_route_to_left_and_right() {
        let left = route_to_ear(&[0.5, -0.5], Ear::Left);
        assert_eq!(left, vec![0.5, 0.0, -0.5, 0.0]);

        let right = route_to_ear(&[0.5, -0.5], Ear::Right);
        assert_eq!(right, vec![0.0, 0.5, 0.0, -0.5]);
    }

    #[test]
    fn test_opposite_ear() {
        assert_eq!(Ear::Left.opposite(), Ear::Right);
        assert_eq!(Ear::Right.opposite(), Ear::Left);
    }
}
