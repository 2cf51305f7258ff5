use super::{Figure, Marker, MarkerRole, Trace, TraceStyle};
use crate::axes::AnalysisSeries;
use crate::models::{PeakRecord, Point, Position};
use tracing::debug;

/// Mark every row tied for the column maximum. Returns the marked rows.
pub fn highlight_maxima(figure: &mut Figure, series: &AnalysisSeries) -> Vec<PeakRecord> {
    let Some(max) = series.present().map(|(_, v)| v).reduce(f64::max) else {
        return Vec::new();
    };

    let maxima: Vec<PeakRecord> = series
        .present()
        .filter(|(_, v)| *v == max)
        .map(|(p, v)| PeakRecord { position: p.clone(), value: v })
        .collect();

    for m in &maxima {
        figure.markers.push(Marker {
            x: m.position.clone(),
            y: m.value,
            label: format!("max {}", m.value),
            role: MarkerRole::Maximum,
        });
    }
    debug!("{} rows at maximum {}", maxima.len(), max);
    maxima
}

pub fn annotate_peaks(figure: &mut Figure, peaks: &[PeakRecord]) {
    figure.markers.extend(peaks.iter().map(|p| Marker {
        x: p.position.clone(),
        y: p.value,
        label: format!("peak {}", p.value),
        role: MarkerRole::Peak,
    }));
}

/// Overlay a trailing rolling mean ("MA<n>") for each window shorter than
/// the series.
pub fn add_moving_averages(figure: &mut Figure, series: &AnalysisSeries, windows: &[usize]) {
    let present: Vec<(&Position, f64)> = series.present().collect();

    for &window in windows {
        if window == 0 || present.len() <= window {
            debug!("Skipping MA{}: {} points", window, present.len());
            continue;
        }

        let mut sum: f64 = present[..window].iter().map(|(_, v)| v).sum();
        let mut points = Vec::with_capacity(present.len() - window + 1);
        points.push(Point { x: present[window - 1].0.clone(), y: sum / window as f64 });
        for i in window..present.len() {
            sum += present[i].1 - present[i - window].1;
            points.push(Point { x: present[i].0.clone(), y: sum / window as f64 });
        }

        figure.traces.push(Trace {
            name: format!("MA{}", window),
            style: TraceStyle::Lines,
            points,
        });
    }
}
