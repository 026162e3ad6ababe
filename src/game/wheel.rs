//! Role selection wheel
//!
//! Picks one active player to become the cat when a round starts. The
//! selection math is pure so a client-side spin animation can replay the
//! same angle and land on the same player.

use std::sync::atomic::{AtomicBool, Ordering};

use rand::Rng;

/// Minimum number of candidates for a spin to be meaningful
pub const MIN_PLAYERS: usize = 2;

const FULL_TURN_DEGREES: f64 = 360.0;
/// Spin range in degrees: 4 to 6 full turns
const MIN_SPIN_DEGREES: f64 = 1440.0;
const MAX_SPIN_DEGREES: f64 = 2160.0;

/// Wheel errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WheelError {
    #[error("at least {MIN_PLAYERS} active players are required to spin the wheel")]
    NotEnoughPlayers,

    #[error("a spin is already in progress")]
    SpinInProgress,
}

/// Draw a uniformly distributed spin angle in [1440, 2160) degrees
pub fn spin_angle<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen_range(MIN_SPIN_DEGREES..MAX_SPIN_DEGREES)
}

/// Map a spin angle to the winning candidate.
///
/// The angle is reduced modulo one turn, the circle is split into equal
/// arcs in list order, and the terminal angle selects an arc. The arc
/// index is then reversed (last arc maps to the first candidate) because
/// the wheel spins past a fixed indicator: segment 0 ends up under the
/// pointer when the list's last entry is on top.
///
/// Returns `None` when there are fewer than [`MIN_PLAYERS`] candidates.
pub fn choose_next<T>(candidates: &[T], spin_angle: f64) -> Option<&T> {
    if candidates.len() < MIN_PLAYERS {
        return None;
    }

    let n = candidates.len();
    let arc = FULL_TURN_DEGREES / n as f64;
    let terminal = spin_angle.rem_euclid(FULL_TURN_DEGREES);
    // Float division can round up to exactly n at the 360° boundary
    let segment = ((terminal / arc) as usize).min(n - 1);

    candidates.get(n - 1 - segment)
}

/// Guard against overlapping spins: only one selection may be in flight
/// at a time, a second attempt is refused until the first completes.
#[derive(Debug)]
pub struct Wheel {
    spinning: AtomicBool,
}

impl Wheel {
    pub fn new() -> Self {
        Self {
            spinning: AtomicBool::new(false),
        }
    }

    /// Claim the wheel for a spin. The claim is released when the returned
    /// guard drops.
    pub fn try_begin(&self) -> Result<SpinGuard<'_>, WheelError> {
        self.spinning
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| WheelError::SpinInProgress)?;
        Ok(SpinGuard { wheel: self })
    }
}

impl Default for Wheel {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive claim on the wheel for the duration of one selection
#[derive(Debug)]
pub struct SpinGuard<'a> {
    wheel: &'a Wheel,
}

impl Drop for SpinGuard<'_> {
    fn drop(&mut self) {
        self.wheel.spinning.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn refuses_fewer_than_two_candidates() {
        let one = ["alice"];
        assert!(choose_next(&one, 1500.0).is_none());
        assert!(choose_next::<&str>(&[], 1500.0).is_none());
    }

    #[test]
    fn terminal_angle_maps_to_reversed_arc() {
        let four = ["a", "b", "c", "d"];

        // 1440° reduces to 0°: first arc, reversed to the last candidate
        assert_eq!(choose_next(&four, 1440.0), Some(&"d"));
        // 1530° reduces to 90°: second arc -> third candidate
        assert_eq!(choose_next(&four, 1530.0), Some(&"c"));
        // 1710° reduces to 270°: last arc -> first candidate
        assert_eq!(choose_next(&four, 1710.0), Some(&"a"));
    }

    #[test]
    fn boundary_angle_stays_in_range() {
        let two = ["a", "b"];
        // Exactly on the 360° seam after reduction
        assert!(choose_next(&two, 1800.0).is_some());
        assert!(choose_next(&two, 2159.999_999).is_some());
    }

    #[test]
    fn spin_angle_is_between_four_and_six_turns() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..1000 {
            let angle = spin_angle(&mut rng);
            assert!((1440.0..2160.0).contains(&angle));
        }
    }

    #[test]
    fn two_candidates_win_roughly_evenly_over_many_spins() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let players = ["alice", "bob"];
        let mut wins = [0u32, 0u32];

        for _ in 0..1000 {
            let winner = choose_next(&players, spin_angle(&mut rng)).unwrap();
            match *winner {
                "alice" => wins[0] += 1,
                _ => wins[1] += 1,
            }
        }

        assert_eq!(wins[0] + wins[1], 1000);
        for count in wins {
            assert!((450..=550).contains(&count), "skewed wheel: {:?}", wins);
        }
    }

    #[test]
    fn only_one_spin_may_be_in_flight() {
        let wheel = Wheel::new();

        let guard = wheel.try_begin().unwrap();
        assert_eq!(wheel.try_begin().unwrap_err(), WheelError::SpinInProgress);

        drop(guard);
        assert!(wheel.try_begin().is_ok());
    }
}
