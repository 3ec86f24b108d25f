//! Fractal noise for coastline carving.
//!
//! Octave stack over the `noise` crate's Perlin: frequency doubles and
//! amplitude halves per octave, summed without normalization. Octave seeds
//! are drawn from the town RNG so the coastline is part of the seeded run.

use crate::random::Rng;
use noise::{NoiseFn, Perlin};

pub struct FractalNoise {
    octaves: Vec<(Perlin, f64, f64)>, // (noise, frequency, amplitude)
}

impl FractalNoise {
    pub fn new(octaves: usize, base_frequency: f64, persistence: f64, rng: &mut Rng) -> Self {
        let mut layers = Vec::with_capacity(octaves);
        let mut frequency = base_frequency;
        let mut amplitude = 1.0;
        for _ in 0..octaves {
            let seed = rng.int(0, i64::from(u32::MAX)) as u32;
            layers.push((Perlin::new(seed), frequency, amplitude));
            frequency *= 2.0;
            amplitude *= persistence;
        }
        FractalNoise { octaves: layers }
    }

    pub fn get(&self, x: f64, y: f64) -> f64 {
        self.octaves
            .iter()
            .map(|(p, f, a)| p.get([x * f, y * f]) * a)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_rng_state_same_field() {
        let mut r1 = Rng::new(5);
        let mut r2 = Rng::new(5);
        let n1 = FractalNoise::new(6, 1.0, 0.5, &mut r1);
        let n2 = FractalNoise::new(6, 1.0, 0.5, &mut r2);
        for i in 0..10 {
            let x = i as f64 * 0.13;
            assert_eq!(n1.get(x, 0.7).to_bits(), n2.get(x, 0.7).to_bits());
        }
    }

    #[test]
    fn output_is_bounded_by_amplitude_sum() {
        let mut rng = Rng::new(8);
        let n = FractalNoise::new(6, 1.0, 0.5, &mut rng);
        // Amplitudes sum to < 2; Perlin output is within [-1, 1] per octave.
        for i in 0..100 {
            let v = n.get(i as f64 * 0.31, i as f64 * 0.17);
            assert!(v.abs() < 2.0);
        }
    }
}
