//! Random start selection for shuffle playback
//!
//! Shuffle playback picks one uniformly random starting track; ordering
//! after that is left to the player's own shuffle mode.

use rand::Rng;

/// Pick a uniformly random start index for a list of `len` tracks
///
/// Returns `None` for an empty list.
pub fn pick_start_index(len: usize) -> Option<usize> {
    pick_start_index_with(len, &mut rand::thread_rng())
}

/// [`pick_start_index`] with a caller-supplied RNG
pub fn pick_start_index_with<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(rng.gen_range(0..len))
}
