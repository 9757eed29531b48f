use crate::{
    entities::appointment_history::Model as HistoryModel,
    errors::ServiceError,
    services::{ai::AiClient, history::HistoryService},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// One archived job, compacted for the analyst prompt
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportJob {
    pub service: Option<String>,
    pub costing: Option<serde_json::Value>,
    pub vehicle: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub report: String,
    pub count: usize,
    pub period: String,
    /// Raw dataset so the dashboard can export it alongside the narrative
    pub data: Vec<ReportJob>,
}

/// Service that turns a month of archived jobs into an AI-written business
/// report
#[derive(Clone)]
pub struct ReportService {
    history: HistoryService,
    ai: Arc<AiClient>,
}

impl ReportService {
    /// Creates a new report service instance
    pub fn new(history: HistoryService, ai: Arc<AiClient>) -> Self {
        Self { history, ai }
    }

    /// Generates the monthly report for `month`/`year`.
    #[instrument(skip(self))]
    pub async fn monthly_report(
        &self,
        month: u32,
        year: i32,
    ) -> Result<MonthlyReport, ServiceError> {
        let (start, end) = month_window(month, year)?;

        let records = self.history.archived_between(start, end).await?;

        if records.is_empty() {
            return Err(ServiceError::NotFound(
                "No data found for the selected period".to_string(),
            ));
        }

        let data: Vec<ReportJob> = records.iter().map(report_job).collect();

        let data_string = serde_json::to_string_pretty(&data)
            .map_err(|e| ServiceError::SerializationError(e.to_string()))?;

        let report = self.ai.generate_report(&data_string).await?;

        info!(count = data.len(), month, year, "Monthly report generated");

        Ok(MonthlyReport {
            report,
            count: data.len(),
            period: format!("{month}/{year}"),
            data,
        })
    }
}

fn report_job(record: &HistoryModel) -> ReportJob {
    let vehicle = match (&record.vehicle_make, &record.vehicle_model) {
        (Some(make), Some(model)) => format!("{make} {model}"),
        (Some(make), None) => make.clone(),
        (None, Some(model)) => model.clone(),
        (None, None) => "Unknown vehicle".to_string(),
    };

    ReportJob {
        service: record.service.clone(),
        costing: record.costing.clone(),
        vehicle,
        date: record.archived_at,
    }
}

/// UTC window covering one calendar month: `[first of month, first of next)`
fn month_window(month: u32, year: i32) -> Result<(DateTime<Utc>, DateTime<Utc>), ServiceError> {
    if !(1..=12).contains(&month) {
        return Err(ServiceError::ValidationError(format!(
            "Month must be between 1 and 12, got {month}"
        )));
    }
    if !(2000..=2100).contains(&year) {
        return Err(ServiceError::ValidationError(format!(
            "Year {year} is out of range"
        )));
    }

    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| ServiceError::ValidationError("Invalid period".to_string()))?;

    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| ServiceError::ValidationError("Invalid period".to_string()))?;

    let start = start
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc();
    let end = end
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc();

    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn month_window_spans_exactly_one_month() {
        let (start, end) = month_window(8, 2026).unwrap();
        assert_eq!(start.to_rfc3339(), "2026-08-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2026-09-01T00:00:00+00:00");
    }

    #[test]
    fn december_rolls_into_the_next_year() {
        let (start, end) = month_window(12, 2026).unwrap();
        assert_eq!(start.to_rfc3339(), "2026-12-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2027-01-01T00:00:00+00:00");
    }

    #[test]
    fn out_of_range_periods_are_rejected() {
        assert_matches!(month_window(0, 2026), Err(ServiceError::ValidationError(_)));
        assert_matches!(month_window(13, 2026), Err(ServiceError::ValidationError(_)));
        assert_matches!(month_window(6, 1890), Err(ServiceError::ValidationError(_)));
    }
}
