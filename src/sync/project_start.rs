//! Resolution of the per-project collection-start timestamp.

use chrono::{DateTime, Datelike, Utc};
use tracing::debug;

use crate::ledger::models::Allocation;
use crate::ledger::LedgerClient;

/// Earliest allocation `start_date` for the project, with fractional
/// seconds stripped. `None` when the lookup fails, returns nothing, or the
/// first allocation has no start date — the caller falls back to the
/// fiscal-year default. Absence is not an error.
pub async fn resolve(client: &LedgerClient, resource: &str, project: &str) -> Option<String> {
    let results: Vec<Allocation> = client
        .single_get("allocations/", &[("project", project), ("resources", resource)])
        .await?;

    let Some(start_date) = results.first().and_then(|a| a.start_date.as_deref()) else {
        debug!("no allocation start for project {}", project);
        return None;
    };

    Some(normalize_start_date(start_date))
}

/// Drop fractional seconds: everything from the first '.' on.
pub fn normalize_start_date(raw: &str) -> String {
    raw.split('.').next().unwrap_or(raw).to_string()
}

/// Default collection start for projects with no allocation record:
/// June 1 of the current fiscal year. The fiscal year turns over in June,
/// so month >= 6 anchors to the current calendar year, earlier months to
/// the previous one. This gives new projects a full fiscal-year lookback.
pub fn fiscal_year_start(now: DateTime<Utc>) -> String {
    let year = if now.month() >= 6 {
        now.year()
    } else {
        now.year() - 1
    };
    format!("{}-06-01T00:00:00", year)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fiscal_year_after_june_uses_current_year() {
        let now = Utc.with_ymd_and_hms(2023, 8, 15, 12, 0, 0).unwrap();
        assert_eq!(fiscal_year_start(now), "2023-06-01T00:00:00");
    }

    #[test]
    fn test_fiscal_year_boundary_month_is_current_year() {
        let now = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(fiscal_year_start(now), "2023-06-01T00:00:00");
    }

    #[test]
    fn test_fiscal_year_before_june_uses_previous_year() {
        let now = Utc.with_ymd_and_hms(2023, 5, 31, 23, 59, 59).unwrap();
        assert_eq!(fiscal_year_start(now), "2022-06-01T00:00:00");
    }

    #[test]
    fn test_fractional_seconds_stripped() {
        assert_eq!(
            normalize_start_date("2022-06-01T00:00:00.123456"),
            "2022-06-01T00:00:00"
        );
        assert_eq!(normalize_start_date("2022-06-01T00:00:00"), "2022-06-01T00:00:00");
    }
}
