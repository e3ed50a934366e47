//! Reporting over tracked requests: KPI summary and CSV export.

use crate::requests::{PaRequest, RequestStatus};
use crate::{PaError, PaResult};
use chrono::{DateTime, Duration, Utc};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::Serialize;
use std::collections::BTreeMap;

const CSV_HEADERS: [&str; 8] = [
    "Request ID",
    "Patient Name",
    "Procedure Code",
    "Procedure Name",
    "Payer",
    "Status",
    "Created Date",
    "Updated Date",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountEntry {
    pub key: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiReport {
    pub requests_this_week: usize,
    pub total_requests: usize,
    pub pending_requests: usize,
    pub approved_requests: usize,
    pub denied_requests: usize,
    /// Mean days from creation to the last update for approved or denied requests.
    pub avg_turnaround_days: f64,
    /// Percentage of decided requests that were approved.
    pub first_pass_clean_rate: f64,
    pub total_minutes_saved: u64,
    pub requests_by_payer: Vec<CountEntry>,
    pub requests_by_procedure: Vec<CountEntry>,
}

/// Compute the KPI summary as of `now`.
pub fn kpi_report(requests: &[PaRequest], now: DateTime<Utc>, baseline_minutes: u32) -> KpiReport {
    let week_ago = now - Duration::days(7);
    let count_status =
        |status: RequestStatus| requests.iter().filter(|r| r.status == status).count();

    let approved = count_status(RequestStatus::Approved);
    let denied = count_status(RequestStatus::Denied);
    let decided: Vec<&PaRequest> = requests
        .iter()
        .filter(|r| matches!(r.status, RequestStatus::Approved | RequestStatus::Denied))
        .collect();

    let avg_turnaround_days = if decided.is_empty() {
        0.0
    } else {
        let total_secs: i64 = decided
            .iter()
            .map(|r| (r.updated_at - r.created_at).num_seconds().max(0))
            .sum();
        round1(total_secs as f64 / 86_400.0 / decided.len() as f64)
    };

    let first_pass_clean_rate = if decided.is_empty() {
        0.0
    } else {
        round1(approved as f64 * 100.0 / decided.len() as f64)
    };

    KpiReport {
        requests_this_week: requests.iter().filter(|r| r.created_at >= week_ago).count(),
        total_requests: requests.len(),
        pending_requests: count_status(RequestStatus::Pending),
        approved_requests: approved,
        denied_requests: denied,
        avg_turnaround_days,
        first_pass_clean_rate,
        total_minutes_saved: requests.len() as u64 * u64::from(baseline_minutes),
        requests_by_payer: count_by(requests, |r| r.payer.as_str()),
        requests_by_procedure: count_by(requests, |r| r.procedure_code.as_str()),
    }
}

fn count_by<'a>(requests: &'a [PaRequest], key: impl Fn(&'a PaRequest) -> &'a str) -> Vec<CountEntry> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for request in requests {
        *counts.entry(key(request)).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(key, count)| CountEntry {
            key: key.to_string(),
            count,
        })
        .collect()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Render requests as CSV, newest first.
///
/// The header row is written plain; every data field is quoted.
pub fn export_csv(requests: &[PaRequest]) -> PaResult<String> {
    let mut sorted: Vec<&PaRequest> = requests.iter().collect();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut header = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    header.write_record(CSV_HEADERS).map_err(export_error)?;
    let buffer = header
        .into_inner()
        .map_err(|e| PaError::Export(e.to_string()))?;

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(buffer);

    for request in sorted {
        writer
            .write_record([
                request.id.to_string(),
                request.patient_name.clone().unwrap_or_default(),
                request.procedure_code.to_string(),
                request.procedure_name.clone().unwrap_or_default(),
                request.payer.to_string(),
                request.status.to_string(),
                request.created_at.format("%Y-%m-%d").to_string(),
                request.updated_at.format("%Y-%m-%d").to_string(),
            ])
            .map_err(export_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| PaError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| PaError::Export(e.to_string()))
}

fn export_error(err: csv::Error) -> PaError {
    PaError::Export(err.to_string())
}
