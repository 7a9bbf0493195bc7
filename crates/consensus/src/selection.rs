// consensus/src/selection.rs

use crate::stake::Stake;
use rand::Rng;

/// Sum of staked amounts
pub fn total_stake(stakes: &[Stake]) -> f64 {
    stakes.iter().map(|s| s.amount).sum()
}

/// Pick the block creator: a uniform draw in [0, Σstake), walking the
/// cumulative sum until it exceeds the draw. Selection probability is
/// exactly proportional to stake.
///
/// A zero (or non-finite) total is undefined for the weighted draw and
/// yields `None` and the epoch is skipped.
pub fn select_creator<R: Rng>(stakes: &[Stake], rng: &mut R) -> Option<usize> {
    let total = total_stake(stakes);
    if stakes.is_empty() || !total.is_finite() || total <= 0.0 {
        return None;
    }

    let draw = rng.gen_range(0.0..total);
    let mut cumulative = 0.0;
    for (i, stake) in stakes.iter().enumerate() {
        cumulative += stake.amount;
        if draw < cumulative {
            return Some(i);
        }
    }
    // Floating-point accumulation can leave the draw unclaimed at the very
    // top of the range; treat it like a zero-stake epoch.
    None
}

/// Pick the approving validator: a second, independent draw over the same
/// distribution, normalized to [0, 1).
pub fn select_validator<R: Rng>(stakes: &[Stake], rng: &mut R) -> Option<usize> {
    let total = total_stake(stakes);
    if stakes.is_empty() || !total.is_finite() || total <= 0.0 {
        return None;
    }

    let draw: f64 = rng.gen();
    let mut threshold = 0.0;
    for (i, stake) in stakes.iter().enumerate() {
        threshold += stake.amount / total;
        if draw < threshold {
            return Some(i);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn stakes(amounts: &[f64]) -> Vec<Stake> {
        amounts
            .iter()
            .enumerate()
            .map(|(i, &amount)| Stake {
                address: format!("0x{i:02}"),
                amount,
                time_stamp: 0,
            })
            .collect()
    }

    #[test]
    fn test_selection_frequency_proportional_to_stake() {
        let stakes = stakes(&[10.0, 20.0, 70.0]);
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts = [0usize; 3];

        const DRAWS: usize = 100_000;
        for _ in 0..DRAWS {
            let i = select_creator(&stakes, &mut rng).unwrap();
            counts[i] += 1;
        }

        for (count, expected) in counts.iter().zip([0.10, 0.20, 0.70]) {
            let frequency = *count as f64 / DRAWS as f64;
            assert!(
                (frequency - expected).abs() < 0.02,
                "frequency {frequency} too far from {expected}"
            );
        }
    }

    #[test]
    fn test_zero_total_stake_selects_nobody() {
        let stakes = stakes(&[0.0, 0.0]);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(select_creator(&stakes, &mut rng), None);
        assert_eq!(select_validator(&stakes, &mut rng), None);
    }

    #[test]
    fn test_empty_stakes_select_nobody() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(select_creator(&[], &mut rng), None);
    }

    #[test]
    fn test_single_staker_always_selected() {
        let stakes = stakes(&[5.0]);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            assert_eq!(select_creator(&stakes, &mut rng), Some(0));
            assert_eq!(select_validator(&stakes, &mut rng), Some(0));
        }
    }

    #[test]
    fn test_validator_draw_matches_distribution() {
        let stakes = stakes(&[25.0, 75.0]);
        let mut rng = StdRng::seed_from_u64(9);
        let mut second = 0usize;

        const DRAWS: usize = 50_000;
        for _ in 0..DRAWS {
            if select_validator(&stakes, &mut rng) == Some(1) {
                second += 1;
            }
        }
        let frequency = second as f64 / DRAWS as f64;
        assert!((frequency - 0.75).abs() < 0.02);
    }
}
