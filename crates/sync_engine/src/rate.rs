//! Frame-rate detection from rate hints.

/// Hints closer than this (in fps) count as the same rate
const RATE_RESOLUTION: f64 = 1e-6;

fn rate_key(fps: f64) -> i64 {
    (fps / RATE_RESOLUTION).round() as i64
}

/// Most frequent rate among `hints`.
///
/// Ties resolve to the rate seen first. Returns `None` for an empty slice.
pub(crate) fn mode_rate(hints: &[f64]) -> Option<f64> {
    // (key, first index, count)
    let mut tally: Vec<(i64, usize, usize)> = Vec::new();
    for (i, &fps) in hints.iter().enumerate() {
        let key = rate_key(fps);
        match tally.iter_mut().find(|(k, _, _)| *k == key) {
            Some(entry) => entry.2 += 1,
            None => tally.push((key, i, 1)),
        }
    }

    tally
        .into_iter()
        .max_by(|a, b| a.2.cmp(&b.2).then(b.1.cmp(&a.1)))
        .map(|(_, first, _)| hints[first])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_majority_rate() {
        assert_eq!(mode_rate(&[4.0, 5.0, 4.0]), Some(4.0));
        assert_eq!(mode_rate(&[30.0, 25.0, 25.0, 30.0, 25.0]), Some(25.0));
    }

    #[test]
    fn test_tie_prefers_first_seen() {
        assert_eq!(mode_rate(&[5.0, 4.0, 6.0]), Some(5.0));
        assert_eq!(mode_rate(&[6.0, 4.0, 4.0, 6.0]), Some(6.0));
    }

    #[test]
    fn test_near_equal_rates_merge() {
        let ntsc = 30000.0 / 1001.0;
        assert_eq!(mode_rate(&[25.0, ntsc, ntsc + 1e-9]), Some(ntsc));
    }

    #[test]
    fn test_empty() {
        assert_eq!(mode_rate(&[]), None);
    }
}
