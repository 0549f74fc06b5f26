/// Frequency-domain capture frames
use serde::{Deserialize, Serialize};

/// One FFT capture from the platform visualizer
///
/// `data` holds interleaved signed 8-bit real/imaginary pairs, one pair
/// per frequency bin. The FFT size used for bin-width math is the byte
/// length of the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FftFrame {
    /// Interleaved re/im bytes
    pub data: Vec<u8>,
    /// Capture sample rate in Hz
    pub sample_rate_hz: u32,
}

impl FftFrame {
    /// Create a frame from raw capture bytes
    pub fn new(data: Vec<u8>, sample_rate_hz: u32) -> Self {
        Self {
            data,
            sample_rate_hz,
        }
    }

    /// FFT size used to compute bin width
    pub fn fft_size(&self) -> usize {
        self.data.len()
    }

    /// Per-bin magnitudes, `hypot(re, im)` of each signed byte pair
    ///
    /// A trailing odd byte is ignored.
    pub fn magnitudes(&self) -> Vec<f32> {
        self.data
            .chunks_exact(2)
            .map(|pair| {
                let re = f32::from(pair[0] as i8);
                let im = f32::from(pair[1] as i8);
                re.hypot(im)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnitudes_from_signed_pairs() {
        // (3, 4) -> 5, (-3, -4) -> 5, (0, 0) -> 0
        let frame = FftFrame::new(vec![3, 4, (-3i8) as u8, (-4i8) as u8, 0, 0], 44_100);
        assert_eq!(frame.magnitudes(), vec![5.0, 5.0, 0.0]);
        assert_eq!(frame.fft_size(), 6);
    }

    #[test]
    fn odd_trailing_byte_ignored() {
        let frame = FftFrame::new(vec![0, 10, 7], 44_100);
        assert_eq!(frame.magnitudes(), vec![10.0]);
    }
}
