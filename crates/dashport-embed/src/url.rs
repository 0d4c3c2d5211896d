//! Helpers for the dashboard URLs admins paste into the catalog.

use reqwest::Url;

const POWERBI_APP_URL: &str = "https://app.powerbi.com";

/// Workspace and report ids parsed from a Power BI report URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerBiReportRef {
    pub workspace_id: String,
    pub report_id: String,
}

fn is_guid_like(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
}

/// The id following `key` in a list of path segments.
fn segment_after<'a>(segments: &[&'a str], key: &str) -> Option<&'a str> {
    segments
        .windows(2)
        .find(|pair| pair[0].eq_ignore_ascii_case(key))
        .map(|pair| pair[1])
}

/// Extract workspace and report ids from a URL such as
/// `https://app.powerbi.com/groups/{ws}/reports/{rep}/ReportSection`.
pub fn parse_powerbi_url(input: &str) -> Option<PowerBiReportRef> {
    let url = Url::parse(input.trim()).ok()?;
    let segments: Vec<&str> = url.path_segments()?.collect();
    let workspace_id = segment_after(&segments, "groups").filter(|s| is_guid_like(s))?;
    let report_id = segment_after(&segments, "reports").filter(|s| is_guid_like(s))?;
    Some(PowerBiReportRef {
        workspace_id: workspace_id.to_string(),
        report_id: report_id.to_string(),
    })
}

/// Browser URL of a report in the Power BI service.
pub fn powerbi_report_url(workspace_id: &str, report_id: &str) -> String {
    format!("{POWERBI_APP_URL}/groups/{workspace_id}/reports/{report_id}")
}

/// Numeric id of a Metabase dashboard, from either a bare id or a URL
/// like `/dashboard/12-sales-overview`. Question URLs are accepted as
/// a fallback.
pub fn extract_metabase_dashboard_id(input: &str) -> Option<String> {
    let input = input.trim();
    if !input.is_empty() && input.chars().all(|c| c.is_ascii_digit()) {
        return Some(input.to_string());
    }

    let path = input.split(['?', '#']).next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').collect();
    ["dashboard", "question"].iter().find_map(|key| {
        let digits: String = segment_after(&segments, key)?
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        (!digits.is_empty()).then_some(digits)
    })
}
