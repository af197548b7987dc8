mod test_support;

use pretty_assertions::assert_eq;
use serde_json::json;
use test_support::{spawn_server, spawn_server_with};

#[test]
fn sponsor_create_applies_pipeline_defaults() {
    let server = spawn_server("prodhubd-sponsors");

    let sponsor = server.expect_status(
        server.post(
            "/api/sponsors",
            json!({ "brand_name": "Acme VPN", "deal_value_gross": 5000 }),
        ),
        201,
    );
    assert_eq!(sponsor["stage"], "leads");
    assert_eq!(sponsor["sub_status"], "inquiry");
    assert_eq!(sponsor["deal_type"], "flat_rate");
    assert_eq!(sponsor["deal_value_net"].as_f64(), Some(4000.0));
    assert_eq!(sponsor["placement"], "first_5_min");
    assert_eq!(sponsor["integration_length_seconds"], 60);
    assert_eq!(sponsor["payment_terms_brand_days"], 30);
    assert_eq!(sponsor["payment_terms_agency_days"], 15);

    let err = server.expect_status(
        server.post("/api/sponsors", json!({ "brand_name": "X", "deal_type": "barter" })),
        400,
    );
    assert_eq!(err["error"], "Invalid deal_type: barter");
    server.expect_status(server.post("/api/sponsors", json!({})), 400);
}

#[test]
fn sponsor_stage_moves_normalize_sub_status() {
    let server = spawn_server("prodhubd-sponsors-stage");
    let sponsor = server.expect_status(
        server.post(
            "/api/sponsors",
            json!({ "brand_name": "Nomad Bags", "sub_status": "negotiation" }),
        ),
        201,
    );
    let id = sponsor["id"].as_i64().expect("id");
    assert_eq!(sponsor["sub_status"], "negotiation");

    let moved = server.expect_status(
        server.put(&format!("/api/sponsors/{}", id), json!({ "stage": "content" })),
        200,
    );
    assert_eq!(moved["stage"], "content");
    assert_eq!(moved["sub_status"], "brief_received");

    let moved = server.expect_status(
        server.put(
            &format!("/api/sponsors/{}", id),
            json!({ "sub_status": "filming" }),
        ),
        200,
    );
    assert_eq!(moved["sub_status"], "filming");

    let moved = server.expect_status(
        server.put(&format!("/api/sponsors/{}", id), json!({ "stage": "published" })),
        200,
    );
    assert!(moved["sub_status"].is_null());

    let filtered = server.expect_status(server.get("/api/sponsors?stage=published"), 200);
    assert_eq!(filtered.as_array().map(Vec::len), Some(1));
    let filtered = server.expect_status(server.get("/api/sponsors?stage=leads"), 200);
    assert_eq!(filtered.as_array().map(Vec::len), Some(0));

    server.expect_status(server.put(&format!("/api/sponsors/{}", id), json!({})), 400);
    server.expect_status(server.put("/api/sponsors/999", json!({ "notes": "x" })), 404);
    assert_eq!(
        server.expect_status(server.delete(&format!("/api/sponsors/{}", id)), 200),
        json!({ "ok": true })
    );
    server.expect_status(server.get(&format!("/api/sponsors/{}", id)), 404);
}

#[test]
fn sponsor_update_rejects_null_brand_and_stage() {
    let server = spawn_server("prodhubd-sponsors-null");
    let sponsor = server.expect_status(
        server.post("/api/sponsors", json!({ "brand_name": "Trail Co" })),
        201,
    );
    let path = format!("/api/sponsors/{}", sponsor["id"].as_i64().expect("id"));

    let err = server.expect_status(server.put(&path, json!({ "brand_name": null })), 400);
    assert_eq!(err["error"], "brand_name is required");
    let err = server.expect_status(server.put(&path, json!({ "stage": null })), 400);
    assert_eq!(err["error"], "stage is required");
    let err = server.expect_status(server.put(&path, json!({ "deal_type": null })), 400);
    assert_eq!(err["error"], "deal_type is required");

    let kept = server.expect_status(server.get(&path), 200);
    assert_eq!(kept["brand_name"], "Trail Co");
    assert_eq!(kept["stage"], "leads");
    assert_eq!(kept["sub_status"], "inquiry");
}

#[test]
fn sponsor_read_joins_linked_episode() {
    let server = spawn_server("prodhubd-sponsors-episode");
    let series = server.expect_status(server.post("/api/series", json!({ "title": "Balkans" })), 201);
    let episode = server.expect_status(
        server.post(
            "/api/episodes",
            json!({ "series_id": series["id"], "title": "Tirana at night" }),
        ),
        201,
    );
    let sponsor = server.expect_status(
        server.post(
            "/api/sponsors",
            json!({ "brand_name": "Acme", "episode_id": episode["id"] }),
        ),
        201,
    );
    let joined = server.expect_status(
        server.get(&format!("/api/sponsors/{}", sponsor["id"])),
        200,
    );
    assert_eq!(joined["episode_title"], "Tirana at night");
}

#[test]
fn invoice_page_renders_flat_fee_and_issuer() {
    let server = spawn_server_with(
        "prodhubd-invoice",
        &[
            ("PRODHUB_INVOICE_FROM", "Wander Films".to_string()),
            ("PRODHUB_INVOICE_EMAIL", "billing@wander.test".to_string()),
        ],
    );
    let sponsor = server.expect_status(
        server.post(
            "/api/sponsors",
            json!({
                "brand_name": "Acme <VPN>",
                "deal_value_gross": 2500,
                "agency_contact": "Dana Agent",
            }),
        ),
        201,
    );
    let id = sponsor["id"].as_i64().expect("id");

    let page = server.get(&format!("/api/sponsors/{}/invoice?today=2025-04-02", id));
    assert_eq!(page.status, 200);
    assert!(page
        .header("content-type")
        .is_some_and(|v| v.starts_with("text/html")));
    assert!(page.body.contains(&format!("SPO-2025-{:04}", id)));
    assert!(page.body.contains("Wander Films"));
    assert!(page.body.contains("billing@wander.test"));
    assert!(page.body.contains("Dana Agent"));
    assert!(page.body.contains("YouTube Sponsorship Integration (flat fee)"));
    assert!(page.body.contains("2,500.00"));
    assert!(!page.body.contains("Acme <VPN>"));

    server.expect_status(server.get("/api/sponsors/999/invoice"), 404);
}
