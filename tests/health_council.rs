mod test_support;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use test_support::spawn_server;

fn report(date: &str, score: i64, summary: &str) -> Value {
    json!({
        "date": date,
        "overall_score": score,
        "areas": [{
            "name": "Backups",
            "icon": "B",
            "status": "critical",
            "summary": summary,
            "details": ["last snapshot 3 days ago"],
            "agent": "sentinel",
        }],
        "recommendations": [{ "number": 1, "severity": "high", "text": "Rotate keys" }],
    })
}

#[test]
fn reports_upsert_by_day_and_feed_history() {
    let server = spawn_server("prodhubd-health");

    let empty = server.expect_status(server.get("/api/health-council/latest"), 200);
    assert_eq!(empty, json!({ "report": null, "previousScore": null }));

    let first = server.expect_status(
        server.post("/api/health-council/reports", report("2025-03-01", 70, "stale")),
        200,
    );
    assert_eq!(first["ok"], true);
    let again = server.expect_status(
        server.post("/api/health-council/reports", report("2025-03-01", 74, "stale")),
        200,
    );
    assert_eq!(again["id"], first["id"]);
    server.expect_status(
        server.post("/api/health-council/reports", report("2025-03-02", 81, "<b>fixed</b>")),
        200,
    );

    let latest = server.expect_status(server.get("/api/health-council/latest"), 200);
    assert_eq!(latest["report"]["date"], "2025-03-02");
    assert_eq!(latest["previousScore"], 74);

    let history = server.expect_status(server.get("/api/health-council/history?days=30"), 200);
    assert_eq!(
        history,
        json!({ "history": [
            { "date": "2025-03-01", "overall_score": 74 },
            { "date": "2025-03-02", "overall_score": 81 },
        ]})
    );
    let one = server.expect_status(server.get("/api/health-council/history?days=1"), 200);
    assert_eq!(one["history"].as_array().map(Vec::len), Some(1));

    let page = server.get("/health-council");
    assert_eq!(page.status, 200);
    assert!(page.body.contains("+7 vs previous"));
    assert!(page.body.contains("Rotate keys"));
    assert!(page.body.contains("&lt;b&gt;fixed&lt;/b&gt;"));
}

#[test]
fn malformed_reports_are_rejected() {
    let server = spawn_server("prodhubd-health-bad");
    let resp = server.post(
        "/api/health-council/reports",
        json!({ "date": "2025-03-01", "overall_score": "high" }),
    );
    assert_eq!(
        server.expect_status(resp, 400),
        json!({ "ok": false, "error": "Invalid report payload" })
    );
    let resp = server.request_with_headers(
        "POST",
        "/api/health-council/reports",
        None,
        &[("Content-Type", "application/json")],
    );
    assert_eq!(resp.status, 400);

    let page = server.get("/health-council");
    assert!(page.body.contains("No reports yet."));
}
