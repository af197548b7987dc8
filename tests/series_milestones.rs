mod test_support;

use pretty_assertions::assert_eq;
use serde_json::json;
use test_support::spawn_server;

#[test]
fn series_with_shoot_date_gets_pre_shoot_checklist() {
    let server = spawn_server("prodhubd-series");

    let series = server.expect_status(
        server.post(
            "/api/series",
            json!({ "title": "Georgia", "target_shoot_start": "2025-06-30" }),
        ),
        201,
    );
    let id = series["id"].as_i64().expect("id");
    assert_eq!(series["status"], "ideation");

    let milestones =
        server.expect_status(server.get(&format!("/api/series/{}/milestones", id)), 200);
    let rows = milestones.as_array().expect("milestones");
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[0]["week_number"], -5);
    assert_eq!(rows[0]["due_date"], "2025-05-26");
    assert_eq!(rows[9]["title"], "Final Confirmation Call");
    assert_eq!(rows[9]["due_date"], "2025-06-23");

    let first = rows[0]["id"].as_i64().expect("milestone id");
    let done = server.expect_status(
        server.put(
            &format!("/api/series/{}/milestones", id),
            json!({ "milestoneId": first, "completed": true }),
        ),
        200,
    );
    assert_eq!(done, json!({ "ok": true }));
    let reopened = server.expect_status(
        server.put(&format!("/api/milestones/{}", first), json!({ "completed": false })),
        200,
    );
    assert_eq!(reopened["completed"], 0);
    assert!(reopened["completed_at"].is_null());

    server.expect_status(
        server.put(
            &format!("/api/series/{}/milestones", id),
            json!({ "milestoneId": 9999, "completed": true }),
        ),
        404,
    );
}

#[test]
fn series_without_shoot_date_has_no_milestones() {
    let server = spawn_server("prodhubd-series-bare");
    let series = server.expect_status(server.post("/api/series", json!({ "title": "Peru" })), 201);
    let id = series["id"].as_i64().expect("id");
    let milestones =
        server.expect_status(server.get(&format!("/api/series/{}/milestones", id)), 200);
    assert_eq!(milestones, json!([]));

    let err = server.expect_status(
        server.post(
            "/api/series",
            json!({ "title": "Bad", "target_shoot_start": "next spring" }),
        ),
        400,
    );
    assert_eq!(err["error"], "Invalid target_shoot_start: next spring");
}

#[test]
fn series_episodes_and_travel_hang_off_the_series() {
    let server = spawn_server("prodhubd-series-children");
    let series = server.expect_status(server.post("/api/series", json!({ "title": "Japan" })), 201);
    let id = series["id"].as_i64().expect("id");

    server.expect_status(
        server.post(
            &format!("/api/series/{}/episodes", id),
            json!({ "title": "Osaka", "sort_order": 2 }),
        ),
        201,
    );
    server.expect_status(
        server.post(
            &format!("/api/series/{}/episodes", id),
            json!({ "title": "Tokyo", "sort_order": 1 }),
        ),
        201,
    );
    let episodes = server.expect_status(server.get(&format!("/api/series/{}/episodes", id)), 200);
    let titles: Vec<&str> = episodes
        .as_array()
        .expect("episodes")
        .iter()
        .filter_map(|e| e["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["Tokyo", "Osaka"]);

    let listed = server.expect_status(server.get("/api/series"), 200);
    assert_eq!(listed[0]["episode_count"], 2);

    let travel = server.expect_status(
        server.post(
            &format!("/api/series/{}/travel", id),
            json!({ "title": "Flight to Tokyo", "type": "flight", "booked": true }),
        ),
        201,
    );
    assert_eq!(travel["booked"], 1);
    assert_eq!(travel["currency"], "USD");
    let travel_id = travel["id"].as_i64().expect("travel id");
    let updated = server.expect_status(
        server.put(&format!("/api/travel/{}", travel_id), json!({ "cost": 840 })),
        200,
    );
    assert_eq!(updated["cost"].as_f64(), Some(840.0));
    server.expect_status(server.delete(&format!("/api/travel/{}", travel_id)), 200);

    server.expect_status(
        server.post("/api/series/999/episodes", json!({ "title": "Ghost" })),
        404,
    );
    server.expect_status(server.delete(&format!("/api/series/{}", id)), 200);
    let orphans = server.expect_status(server.get(&format!("/api/episodes?series_id={}", id)), 200);
    assert_eq!(orphans, json!([]));
}
