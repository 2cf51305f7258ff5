use crate::models::PeakRecord;
use serde::Serialize;

/// One line of the textual report. Rounding is for display only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportLine {
    pub position: String,
    pub value: String,
}

impl std::fmt::Display for ReportLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.position, self.value)
    }
}

pub fn report_lines(records: &[PeakRecord], decimals: usize) -> Vec<ReportLine> {
    records
        .iter()
        .map(|r| ReportLine {
            position: r.position.to_string(),
            value: format!("{:.*}", decimals, r.value),
        })
        .collect()
}

/// "position: value" per record, in the order given.
pub fn format_records(records: &[PeakRecord], decimals: usize) -> Vec<String> {
    report_lines(records, decimals)
        .into_iter()
        .map(|l| l.to_string())
        .collect()
}
