//! Sponsor deal pipeline: stages, sub-statuses and the fold from the older
//! flat stage list.

pub const STAGES: [&str; 6] = ["leads", "contracted", "content", "published", "invoiced", "paid"];

pub const LEAD_SUB_STATUSES: [&str; 2] = ["inquiry", "negotiation"];

pub const CONTENT_SUB_STATUSES: [&str; 6] = [
    "brief_received",
    "script_writing",
    "script_submitted",
    "script_approved",
    "filming",
    "brand_review",
];

pub const DEAL_TYPES: [&str; 3] = ["flat_rate", "cpm", "full_video"];

pub const SCRIPT_STATUSES: [&str; 7] = [
    "not_started",
    "drafting",
    "submitted",
    "revision_1",
    "revision_2",
    "revision_3",
    "approved",
];

/// Every sponsor column other than `stage` and `sub_status`.
pub const SPONSOR_REBUILD_COLUMNS: &[&str] = &[
    "id",
    "brand_name",
    "deal_type",
    "deal_value_gross",
    "deal_value_net",
    "cpm_rate",
    "cpm_cap",
    "mvg",
    "contact_name",
    "contact_email",
    "agency_name",
    "agency_contact",
    "offer_date",
    "contract_date",
    "brief_due",
    "brief_received_date",
    "script_due",
    "film_by",
    "rough_cut_due",
    "brand_review_due",
    "live_date",
    "invoice_date",
    "payment_due_date",
    "payment_received_date",
    "payment_terms_brand_days",
    "payment_terms_agency_days",
    "invoice_amount",
    "placement",
    "integration_length_seconds",
    "brief_text",
    "brief_link",
    "script_draft",
    "script_status",
    "has_tracking_link",
    "has_pinned_comment",
    "has_qr_code",
    "tracking_link",
    "promo_code",
    "youtube_video_id",
    "youtube_video_title",
    "views_at_30_days",
    "cpm_screenshot_taken",
    "cpm_invoice_generated",
    "mvg_met",
    "make_good_required",
    "make_good_video_id",
    "exclusivity_window_days",
    "exclusivity_category",
    "requires_product",
    "product_ordered_date",
    "product_ship_to",
    "product_received",
    "episode_id",
    "notes",
    "next_action",
    "next_action_due",
    "created_at",
    "updated_at",
];

/// Returns the sub-status a deal should carry in `stage`. Only `leads` and
/// `content` have sub-statuses; anything outside the allowed set falls back
/// to the first step of that stage.
pub fn normalize_sub_status(stage: &str, sub_status: Option<&str>) -> Option<String> {
    let (allowed, default): (&[&str], &str) = match stage {
        "leads" => (&LEAD_SUB_STATUSES[..], "inquiry"),
        "content" => (&CONTENT_SUB_STATUSES[..], "brief_received"),
        _ => return None,
    };
    let picked = sub_status
        .filter(|s| allowed.contains(s))
        .unwrap_or(default);
    Some(picked.to_string())
}

/// Maps a stage from the flat pre-pipeline list to `(stage, sub_status)`.
/// Current stages pass through untouched.
pub fn fold_legacy_stage(stage: &str) -> (&'static str, Option<&'static str>) {
    if let Some(s) = LEAD_SUB_STATUSES.iter().find(|s| **s == stage) {
        return ("leads", Some(*s));
    }
    if let Some(s) = CONTENT_SUB_STATUSES.iter().find(|s| **s == stage) {
        return ("content", Some(*s));
    }
    match stage {
        "contract" => ("contracted", None),
        "live" => ("published", None),
        other => match STAGES.iter().find(|s| **s == other) {
            Some(s) => (*s, None),
            None => ("leads", Some("inquiry")),
        },
    }
}

/// Stage names used by the older content-pipeline dashboard.
pub fn map_pipeline_stage(stage: &str) -> &str {
    match stage {
        "offer_received" => "inquiry",
        "qualified" => "negotiation",
        "contract_signed" => "contract",
        "brief_script" => "brief_received",
        "published" | "make_good" => "live",
        other => other,
    }
}

fn quoted(list: &[&str]) -> String {
    list.iter()
        .map(|s| format!("'{}'", s))
        .collect::<Vec<_>>()
        .join(", ")
}

/// SQL expression applying [`fold_legacy_stage`] to the `stage` column.
pub fn legacy_stage_sql() -> String {
    format!(
        "CASE \
            WHEN stage IN ({leads}) THEN 'leads' \
            WHEN stage = 'contract' THEN 'contracted' \
            WHEN stage IN ({content}) THEN 'content' \
            WHEN stage = 'live' THEN 'published' \
            WHEN stage IN ({stages}) THEN stage \
            ELSE 'leads' \
        END",
        leads = quoted(&LEAD_SUB_STATUSES),
        content = quoted(&CONTENT_SUB_STATUSES),
        stages = quoted(&STAGES),
    )
}

/// SQL expression for the sub-status matching [`legacy_stage_sql`].
/// `prior` is the existing sub-status column, or `NULL` when there is none.
pub fn legacy_sub_status_sql(prior: &str) -> String {
    format!(
        "CASE \
            WHEN stage IN ({leads}) THEN stage \
            WHEN stage IN ({content}) THEN stage \
            WHEN stage IN ('leads', 'content') THEN {prior} \
            WHEN stage IN ({stages}) THEN NULL \
            ELSE 'inquiry' \
        END",
        leads = quoted(&LEAD_SUB_STATUSES),
        content = quoted(&CONTENT_SUB_STATUSES),
        stages = quoted(&STAGES),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_status_defaults_per_stage() {
        assert_eq!(normalize_sub_status("leads", None).as_deref(), Some("inquiry"));
        assert_eq!(
            normalize_sub_status("leads", Some("negotiation")).as_deref(),
            Some("negotiation")
        );
        assert_eq!(
            normalize_sub_status("leads", Some("filming")).as_deref(),
            Some("inquiry")
        );
        assert_eq!(
            normalize_sub_status("content", Some("bogus")).as_deref(),
            Some("brief_received")
        );
        assert_eq!(
            normalize_sub_status("content", Some("brand_review")).as_deref(),
            Some("brand_review")
        );
        for stage in ["contracted", "published", "invoiced", "paid"] {
            assert_eq!(normalize_sub_status(stage, Some("inquiry")), None);
        }
    }

    #[test]
    fn legacy_stage_fold() {
        assert_eq!(fold_legacy_stage("negotiation"), ("leads", Some("negotiation")));
        assert_eq!(fold_legacy_stage("contract"), ("contracted", None));
        assert_eq!(fold_legacy_stage("filming"), ("content", Some("filming")));
        assert_eq!(fold_legacy_stage("live"), ("published", None));
        assert_eq!(fold_legacy_stage("invoiced"), ("invoiced", None));
        assert_eq!(fold_legacy_stage("???"), ("leads", Some("inquiry")));
    }

    #[test]
    fn pipeline_dashboard_stage_names() {
        assert_eq!(map_pipeline_stage("offer_received"), "inquiry");
        assert_eq!(map_pipeline_stage("make_good"), "live");
        assert_eq!(
            fold_legacy_stage(map_pipeline_stage("brief_script")),
            ("content", Some("brief_received"))
        );
        assert_eq!(map_pipeline_stage("paid"), "paid");
    }
}
