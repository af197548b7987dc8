//! Time-based alerts derived from sponsor deal dates.

use chrono::{Duration, NaiveDate};
use serde::Serialize;

const SCRIPT_DUE_WINDOW_DAYS: i64 = 3;
const CPM_PERIOD_DAYS: i64 = 30;
const CPM_WARNING_DAYS: i64 = 5;
const NEXT_ACTION_GRACE_DAYS: i64 = 7;

const SCRIPT_PENDING: [&str; 3] = ["brief_received", "script_writing", "script_submitted"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Red,
    Yellow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub severity: Severity,
    pub message: String,
    pub sponsor_id: i64,
    pub brand_name: String,
}

/// The subset of a sponsor row the alert rules read.
#[derive(Debug, Clone, Default)]
pub struct SponsorDates {
    pub id: i64,
    pub brand_name: String,
    pub stage: String,
    pub sub_status: Option<String>,
    pub deal_type: String,
    pub script_due: Option<String>,
    pub live_date: Option<String>,
    pub payment_due_date: Option<String>,
    pub payment_received_date: Option<String>,
    pub next_action_due: Option<String>,
}

/// Accepts `YYYY-MM-DD` or anything starting with it (ISO timestamps).
pub fn parse_day(value: Option<&str>) -> Option<NaiveDate> {
    let v = value?.trim();
    let head = v.get(..10).unwrap_or(v);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

fn plural(n: i64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Evaluates every rule against every deal that is not yet paid. The result
/// is stably ordered with red alerts first.
pub fn derive_alerts(sponsors: &[SponsorDates], today: NaiveDate) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for sp in sponsors.iter().filter(|s| s.stage != "paid") {
        let mut push = |id: String, severity: Severity, message: String| {
            alerts.push(Alert {
                id,
                severity,
                message,
                sponsor_id: sp.id,
                brand_name: sp.brand_name.clone(),
            })
        };

        if sp.payment_received_date.as_deref().map_or(true, str::is_empty) {
            if let Some(due) = parse_day(sp.payment_due_date.as_deref()) {
                let overdue = (today - due).num_days();
                if overdue > 0 {
                    push(
                        format!("payment-overdue-{}", sp.id),
                        Severity::Red,
                        format!(
                            "{} payment overdue by {} day{}",
                            sp.brand_name,
                            overdue,
                            plural(overdue)
                        ),
                    );
                }
            }
        }

        let script_pending = sp.stage == "content"
            && sp
                .sub_status
                .as_deref()
                .is_some_and(|s| SCRIPT_PENDING.contains(&s));
        if script_pending {
            if let Some(due) = parse_day(sp.script_due.as_deref()) {
                let until = (due - today).num_days();
                if (0..=SCRIPT_DUE_WINDOW_DAYS).contains(&until) {
                    let when = if until == 0 {
                        "today".to_string()
                    } else {
                        format!("in {} day{}", until, plural(until))
                    };
                    push(
                        format!("script-due-{}", sp.id),
                        Severity::Yellow,
                        format!("{}: script due {}", sp.brand_name, when),
                    );
                } else if until < 0 {
                    let late = -until;
                    push(
                        format!("script-overdue-{}", sp.id),
                        Severity::Red,
                        format!(
                            "{}: script overdue by {} day{}",
                            sp.brand_name,
                            late,
                            plural(late)
                        ),
                    );
                }
            }
        }

        if sp.deal_type == "cpm" && sp.stage == "published" {
            if let Some(live) = parse_day(sp.live_date.as_deref()) {
                let mark = live + Duration::days(CPM_PERIOD_DAYS);
                let until = (mark - today).num_days();
                if (0..=CPM_WARNING_DAYS).contains(&until) {
                    push(
                        format!("cpm-30day-{}", sp.id),
                        Severity::Yellow,
                        format!(
                            "{}: 30-day CPM period ends {} — prepare invoice",
                            sp.brand_name,
                            mark.format("%b %-d")
                        ),
                    );
                }
            }
        }

        if let Some(due) = parse_day(sp.next_action_due.as_deref()) {
            let overdue = (today - due).num_days();
            if (1..=NEXT_ACTION_GRACE_DAYS).contains(&overdue) {
                push(
                    format!("next-action-{}", sp.id),
                    Severity::Yellow,
                    format!(
                        "{}: next action overdue by {} day{}",
                        sp.brand_name,
                        overdue,
                        plural(overdue)
                    ),
                );
            }
        }
    }

    alerts.sort_by_key(|a| match a.severity {
        Severity::Red => 0,
        Severity::Yellow => 1,
    });
    alerts
}
