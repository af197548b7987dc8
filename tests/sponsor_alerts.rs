mod test_support;

use pretty_assertions::assert_eq;
use serde_json::json;
use test_support::spawn_server;

#[test]
fn alerts_follow_deal_dates_red_first() {
    let server = spawn_server("prodhubd-alerts");

    server.expect_status(
        server.post(
            "/api/sponsors",
            json!({
                "brand_name": "Scripted",
                "stage": "content",
                "sub_status": "script_writing",
                "script_due": "2025-03-12",
            }),
        ),
        201,
    );
    let late = server.expect_status(
        server.post("/api/sponsors", json!({ "brand_name": "Late Payer", "stage": "invoiced" })),
        201,
    );
    server.expect_status(
        server.put(
            &format!("/api/sponsors/{}", late["id"]),
            json!({ "payment_due_date": "2025-03-01" }),
        ),
        200,
    );
    let paid = server.expect_status(
        server.post("/api/sponsors", json!({ "brand_name": "Settled", "stage": "paid" })),
        201,
    );
    server.expect_status(
        server.put(
            &format!("/api/sponsors/{}", paid["id"]),
            json!({ "payment_due_date": "2025-01-01" }),
        ),
        200,
    );

    let alerts = server.expect_status(server.get("/api/sponsors/alerts?today=2025-03-10"), 200);
    let got: Vec<(&str, &str)> = alerts
        .as_array()
        .expect("alerts")
        .iter()
        .map(|a| {
            (
                a["severity"].as_str().unwrap_or_default(),
                a["message"].as_str().unwrap_or_default(),
            )
        })
        .collect();
    assert_eq!(
        got,
        vec![
            ("red", "Late Payer payment overdue by 9 days"),
            ("yellow", "Scripted: script due in 2 days"),
        ]
    );
    assert_eq!(alerts[0]["brandName"], "Late Payer");
    assert_eq!(alerts[0]["sponsorId"], late["id"]);
}

#[test]
fn alerts_reject_malformed_today() {
    let server = spawn_server("prodhubd-alerts-bad");
    let err = server.expect_status(server.get("/api/sponsors/alerts?today=tomorrow"), 400);
    assert_eq!(err["error"], "Invalid today: tomorrow");
    let empty = server.expect_status(server.get("/api/sponsors/alerts"), 200);
    assert_eq!(empty, json!([]));
}
