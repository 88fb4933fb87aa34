//! Initial particle state, computed CPU-side once at startup.
//!
//! Positions start at the origin, velocities get a random unit-sphere
//! direction with a speed in [0, 1.5], and birth times are staggered
//! linearly so the population doesn't pop in all at once.
use rand::Rng;

use crate::utils::mix;

/// per-particle attribute data uploaded into the seeded buffer set
pub struct SeedData {
    /// xyz triples, all zero
    pub positions: Vec<f32>,
    /// xyz triples, also the immutable initial-velocity reference
    pub velocities: Vec<f32>,
    /// one float per particle
    pub start_times: Vec<f32>,
}

pub fn seed_particles<R: Rng>(rng: &mut R, count: usize, start_rate: f32, max_speed: f32) -> SeedData {
    SeedData {
        positions: vec![0.0; count * 3],
        velocities: seed_velocities(rng, count, max_speed),
        start_times: seed_start_times(count, start_rate),
    }
}

pub fn seed_velocities<R: Rng>(rng: &mut R, count: usize, max_speed: f32) -> Vec<f32> {
    let mut velocities = Vec::with_capacity(count * 3);
    for _ in 0..count {
        let dir = random_unit_vector(rng);
        let speed = mix(0.0, max_speed, rng.gen::<f32>());
        velocities.push(dir[0] * speed);
        velocities.push(dir[1] * speed);
        velocities.push(dir[2] * speed);
    }
    velocities
}

pub fn seed_start_times(count: usize, rate: f32) -> Vec<f32> {
    let mut times = Vec::with_capacity(count);
    let mut time = 0.0f32;
    for _ in 0..count {
        times.push(time);
        time += rate;
    }
    times
}

/// uniform direction on the unit sphere via rejection sampling
fn random_unit_vector<R: Rng>(rng: &mut R) -> [f32; 3] {
    loop {
        let v = [
            rng.gen_range(-1.0f32..1.0),
            rng.gen_range(-1.0f32..1.0),
            rng.gen_range(-1.0f32..1.0),
        ];
        let len2 = v[0] * v[0] + v[1] * v[1] + v[2] * v[2];
        if len2 > 1e-6 && len2 <= 1.0 {
            let len = len2.sqrt();
            return [v[0] / len, v[1] / len, v[2] / len];
        }
    }
}

#[cfg(test)]
mod test_seed {
    use super::*;
    use crate::particles::{MAX_START_SPEED, PARTICLE_COUNT, START_TIME_RATE};
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn sizes_match_population() {
        let mut rng = StdRng::seed_from_u64(42);
        let seeds = seed_particles(&mut rng, PARTICLE_COUNT, START_TIME_RATE, MAX_START_SPEED);
        assert_eq!(seeds.positions.len(), PARTICLE_COUNT * 3);
        assert_eq!(seeds.velocities.len(), PARTICLE_COUNT * 3);
        assert_eq!(seeds.start_times.len(), PARTICLE_COUNT);
        assert!(seeds.positions.iter().all(|p| *p == 0.0));
    }

    #[test]
    fn start_times_stagger_linearly() {
        let times = seed_start_times(PARTICLE_COUNT, START_TIME_RATE);
        for (k, t) in times.iter().enumerate() {
            let expected = k as f32 * START_TIME_RATE;
            assert!(
                (t - expected).abs() < 1e-3,
                "particle {} start time {} expected {}",
                k,
                t,
                expected
            );
        }
    }

    #[test]
    fn speeds_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let velocities = seed_velocities(&mut rng, 1000, MAX_START_SPEED);
        for v in velocities.chunks(3) {
            let speed = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
            assert!(speed <= MAX_START_SPEED + 1e-4, "speed {} too big", speed);
        }
    }

    #[test]
    fn directions_spread_across_octants() {
        // a uniform sphere direction should land in every octant over a
        // big enough sample
        let mut rng = StdRng::seed_from_u64(1234);
        let velocities = seed_velocities(&mut rng, 4000, MAX_START_SPEED);
        let mut octants = [0usize; 8];
        for v in velocities.chunks(3) {
            let speed = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
            if speed < 1e-3 {
                continue; // too slow to trust the sign bits
            }
            let idx = ((v[0] > 0.0) as usize) | (((v[1] > 0.0) as usize) << 1) | (((v[2] > 0.0) as usize) << 2);
            octants[idx] += 1;
        }
        for (i, n) in octants.iter().enumerate() {
            assert!(*n > 100, "octant {} only saw {} directions", i, n);
        }
    }

    #[test]
    fn seeding_is_deterministic_for_a_seeded_rng() {
        let mut rng1 = StdRng::seed_from_u64(99);
        let mut rng2 = StdRng::seed_from_u64(99);
        assert_eq!(
            seed_velocities(&mut rng1, 16, MAX_START_SPEED),
            seed_velocities(&mut rng2, 16, MAX_START_SPEED)
        );
    }
}
