//! Peak detection with a dispersion-based prominence threshold.
//!
//! Local maxima are found on the cleaned series (flat tops resolve to the
//! plateau midpoint). A maximum's prominence is its height above the higher
//! of the two bases reached by walking outward until a strictly higher
//! sample or the series end. The minimum prominence defaults to half the
//! sample standard deviation and is dropped for constant or tiny series.

use crate::errors::PeakError;
use crate::models::{PeakRecord, Position};
use tracing::debug;

/// Minimum prominence = `factor` × sample standard deviation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProminenceRule {
    pub factor: f64,
}

impl Default for ProminenceRule {
    fn default() -> Self {
        Self { factor: 0.5 }
    }
}

impl ProminenceRule {
    pub fn new(factor: f64) -> Result<Self, PeakError> {
        if !factor.is_finite() || factor < 0.0 {
            return Err(PeakError::InvalidFactor(factor));
        }
        Ok(Self { factor })
    }

    /// `None` when fewer than two points or zero dispersion.
    pub fn threshold(&self, values: &[f64]) -> Option<f64> {
        let sd = sample_std(values)?;
        if sd == 0.0 {
            return None;
        }
        Some(self.factor * sd)
    }
}

/// Result of one peak scan.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakScan {
    pub threshold: Option<f64>,
    pub peaks: Vec<PeakRecord>,
}

impl PeakScan {
    /// No peaks is an informational outcome, not a failure.
    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }
}

pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(var.sqrt())
}

/// Find salient local maxima of `values`, reported at `positions`.
///
/// Missing entries (`None` or NaN) are removed together with their
/// positions before analysis.
pub fn find_peaks(
    values: &[Option<f64>],
    positions: &[Position],
    rule: ProminenceRule,
) -> Result<PeakScan, PeakError> {
    if values.len() != positions.len() {
        return Err(PeakError::LengthMismatch {
            values: values.len(),
            positions: positions.len(),
        });
    }
    if !rule.factor.is_finite() || rule.factor < 0.0 {
        return Err(PeakError::InvalidFactor(rule.factor));
    }

    let mut clean = Vec::with_capacity(values.len());
    let mut at = Vec::with_capacity(values.len());
    for (index, (value, position)) in values.iter().zip(positions).enumerate() {
        match value {
            Some(v) if v.is_nan() => continue,
            Some(v) if v.is_infinite() => {
                return Err(PeakError::NonFinite { index, value: *v });
            }
            Some(v) => {
                clean.push(*v);
                at.push(position);
            }
            None => continue,
        }
    }

    let threshold = rule.threshold(&clean);
    let peaks: Vec<PeakRecord> = local_maxima(&clean)
        .into_iter()
        .filter(|&p| threshold.is_none_or(|t| prominence(&clean, p) >= t))
        .map(|p| PeakRecord {
            position: at[p].clone(),
            value: clean[p],
        })
        .collect();

    debug!(
        "{} points, threshold {:?}, {} peaks",
        clean.len(),
        threshold,
        peaks.len()
    );
    Ok(PeakScan { threshold, peaks })
}

/// Indices of local maxima; a flat top counts once, at its midpoint.
fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut out = Vec::new();
    if x.len() < 3 {
        return out;
    }

    let last = x.len() - 1;
    let mut i = 1;
    while i < last {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < last && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                out.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    out
}

/// Height of `x[peak]` above the higher of its two bases.
fn prominence(x: &[f64], peak: usize) -> f64 {
    let top = x[peak];

    let mut left_min = top;
    for &v in x[..=peak].iter().rev() {
        if v > top {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = top;
    for &v in &x[peak..] {
        if v > top {
            break;
        }
        right_min = right_min.min(v);
    }

    top - left_min.max(right_min)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx(n: usize) -> Vec<Position> {
        (0..n).map(|i| Position::Number(i as f64)).collect()
    }

    fn some(v: &[f64]) -> Vec<Option<f64>> {
        v.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_two_equal_peaks() {
        let v = some(&[1.0, 2.0, 10.0, 2.0, 1.0, 1.0, 2.0, 10.0, 2.0, 1.0]);
        let scan = find_peaks(&v, &idx(10), ProminenceRule::default()).unwrap();
        assert_eq!(
            scan.peaks,
            vec![
                PeakRecord { position: Position::Number(2.0), value: 10.0 },
                PeakRecord { position: Position::Number(7.0), value: 10.0 },
            ]
        );
        let t = scan.threshold.unwrap();
        assert!((t - 0.5 * (117.6f64 / 9.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_rise_then_fall_has_one_peak() {
        let v = some(&[1.0, 3.0, 6.0, 8.0, 5.0, 2.0]);
        let scan = find_peaks(&v, &idx(6), ProminenceRule::default()).unwrap();
        assert_eq!(scan.peaks.len(), 1);
        assert_eq!(scan.peaks[0], PeakRecord { position: Position::Number(3.0), value: 8.0 });
    }

    #[test]
    fn test_constant_series() {
        let v = some(&[4.0; 6]);
        let scan = find_peaks(&v, &idx(6), ProminenceRule::default()).unwrap();
        assert!(scan.is_empty());
        assert_eq!(scan.threshold, None);
    }

    #[test]
    fn test_tiny_series_has_no_threshold() {
        let scan = find_peaks(&[Some(1.0)], &idx(1), ProminenceRule::default()).unwrap();
        assert!(scan.is_empty());
        assert_eq!(scan.threshold, None);
        let scan = find_peaks(&[], &[], ProminenceRule::default()).unwrap();
        assert!(scan.is_empty());
    }

    #[test]
    fn test_small_bumps_are_filtered() {
        // the 5.2 wiggle has prominence 0.2, far below half a std-dev
        let v = some(&[0.0, 5.0, 5.2, 5.0, 10.0, 0.0]);
        let scan = find_peaks(&v, &idx(6), ProminenceRule::default()).unwrap();
        let at: Vec<_> = scan.peaks.iter().map(|p| p.position.clone()).collect();
        assert_eq!(at, vec![Position::Number(4.0)]);

        let all = find_peaks(&v, &idx(6), ProminenceRule::new(0.0).unwrap()).unwrap();
        assert_eq!(all.peaks.len(), 2);
    }

    #[test]
    fn test_missing_values_drop_their_positions() {
        let v = vec![Some(1.0), None, Some(5.0), Some(f64::NAN), Some(1.0)];
        let pos: Vec<Position> = (10..15).map(|i| Position::Number(i as f64)).collect();
        let scan = find_peaks(&v, &pos, ProminenceRule::default()).unwrap();
        assert_eq!(scan.peaks, vec![PeakRecord { position: Position::Number(12.0), value: 5.0 }]);
    }

    #[test]
    fn test_plateau_reports_midpoint() {
        let v = some(&[0.0, 3.0, 3.0, 3.0, 0.0]);
        let scan = find_peaks(&v, &idx(5), ProminenceRule::default()).unwrap();
        assert_eq!(scan.peaks, vec![PeakRecord { position: Position::Number(2.0), value: 3.0 }]);
    }

    #[test]
    fn test_edges_are_not_peaks() {
        let v = some(&[9.0, 1.0, 2.0, 1.0, 9.0]);
        let scan = find_peaks(&v, &idx(5), ProminenceRule::new(0.0).unwrap()).unwrap();
        assert_eq!(scan.peaks, vec![PeakRecord { position: Position::Number(2.0), value: 2.0 }]);
    }

    #[test]
    fn test_prominence_uses_higher_base() {
        let x = [0.0, 10.0, 4.0, 6.0, 1.0];
        assert_eq!(prominence(&x, 1), 9.0);
        assert_eq!(prominence(&x, 3), 2.0);
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            find_peaks(&[Some(1.0)], &idx(2), ProminenceRule::default()).unwrap_err(),
            PeakError::LengthMismatch { values: 1, positions: 2 }
        );
        assert_eq!(
            find_peaks(&[Some(1.0), Some(f64::INFINITY)], &idx(2), ProminenceRule::default()).unwrap_err(),
            PeakError::NonFinite { index: 1, value: f64::INFINITY }
        );
        assert_eq!(ProminenceRule::new(-0.5).unwrap_err(), PeakError::InvalidFactor(-0.5));
    }
}
