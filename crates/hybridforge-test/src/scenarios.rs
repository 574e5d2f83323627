//! Measurement lists with known mode sequences.

/// Steps of the incremental scenario.
pub const INCREMENTAL_STEPS: usize = 15;

/// Positions of a robot that alternates between standing still and moving.
pub const INCREMENTAL_MEASUREMENTS: [f64; 21] = [
    0.0, 1.0, 2.0, 2.0, 2.0, 2.0, 3.0, 4.0, 5.0, 6.0, 6.0, 7.0, 8.0, 9.0, 9.0, 9.0, 10.0, 11.0,
    11.0, 11.0, 11.0,
];

/// Modes that explain [`INCREMENTAL_MEASUREMENTS`] exactly.
pub const INCREMENTAL_MODES: [usize; 20] = [1, 1, 0, 0, 0, 1, 1, 1, 1, 0, 1, 1, 1, 0, 0, 1, 1, 0, 0, 0];

/// Steps of the probability scenario.
pub const PROBABILITY_STEPS: usize = 4;

pub const PROBABILITY_MEASUREMENTS: [f64; 4] = [0.0, 1.0, 2.0, 2.0];

/// Modes whose positions differ by exactly the motion they select.
pub fn modes_of(measurements: &[f64]) -> Vec<usize> {
    measurements
        .windows(2)
        .map(|w| usize::from((w[1] - w[0]).abs() > 0.5))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incremental_modes_match_measurements() {
        assert_eq!(modes_of(&INCREMENTAL_MEASUREMENTS), INCREMENTAL_MODES.to_vec());
    }

    #[test]
    fn test_probability_modes() {
        assert_eq!(modes_of(&PROBABILITY_MEASUREMENTS), vec![1, 1, 0]);
    }
}
