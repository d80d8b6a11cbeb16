/// Percentage returns over the whole window and over the last five sessions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowReturns {
    pub one_month: f64,
    pub one_week: f64,
}

impl WindowReturns {
    /// Sessions needed for the one-week return.
    pub const MIN_SESSIONS: usize = 6;

    /// `None` with fewer than six closes or a non-positive base price.
    pub fn from_closes(closes: &[f64]) -> Option<Self> {
        if closes.len() < Self::MIN_SESSIONS {
            return None;
        }
        if closes.iter().any(|c| !c.is_finite() || *c <= 0.0) {
            return None;
        }

        let last = closes[closes.len() - 1];
        let first = closes[0];
        let week_base = closes[closes.len() - 6];

        Some(Self {
            one_month: (last / first - 1.0) * 100.0,
            one_week: (last / week_base - 1.0) * 100.0,
        })
    }
}

/// Last session's volume as a percentage of the window mean.
pub fn relative_volume(volumes: &[f64]) -> f64 {
    let Some(last) = volumes.last() else { return 0.0 };
    let mean = volumes.iter().sum::<f64>() / volumes.len() as f64;
    let base = if mean > 0.0 { mean } else { 1.0 };
    last / base * 100.0
}

/// How many of the last five sessions closed above the session before.
pub fn trend_days(closes: &[f64]) -> u32 {
    let n = closes.len();
    (1..=5)
        .filter(|i| n > *i && closes[n - i] > closes[n - i - 1])
        .count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_use_first_and_sixth_from_last() {
        let closes = [100.0, 90.0, 95.0, 100.0, 105.0, 110.0, 115.0, 120.0];
        let returns = WindowReturns::from_closes(&closes).unwrap();
        assert!((returns.one_month - 20.0).abs() < 1e-9);
        // base is closes[2] = 95
        assert!((returns.one_week - (120.0 / 95.0 - 1.0) * 100.0).abs() < 1e-9);
    }

    #[test]
    fn returns_need_six_positive_closes() {
        assert!(WindowReturns::from_closes(&[1.0, 2.0, 3.0, 4.0, 5.0]).is_none());
        assert!(WindowReturns::from_closes(&[0.0, 2.0, 3.0, 4.0, 5.0, 6.0]).is_none());
    }

    #[test]
    fn relative_volume_against_mean() {
        assert_eq!(relative_volume(&[100.0, 100.0, 400.0]), 200.0);
        assert_eq!(relative_volume(&[0.0, 0.0, 0.0]), 0.0);
        assert_eq!(relative_volume(&[]), 0.0);
    }

    #[test]
    fn trend_counts_last_five_sessions_only() {
        // rises everywhere except between the 4th and 3rd from last
        let closes = [1.0, 2.0, 3.0, 4.0, 3.5, 4.0, 5.0, 6.0];
        assert_eq!(trend_days(&closes), 4);
        assert_eq!(trend_days(&[5.0, 4.0, 3.0, 2.0, 1.0, 0.5]), 0);
    }
}
