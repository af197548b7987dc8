mod test_support;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use test_support::{spawn_server, Server};

fn seed_episode(server: &Server) -> i64 {
    let series = server.expect_status(
        server.post("/api/series", json!({ "title": "Andes by Rail" })),
        201,
    );
    let episode = server.expect_status(
        server.post(
            "/api/episodes",
            json!({ "series_id": series["id"], "title": "Cusco arrival", "hook": "altitude" }),
        ),
        201,
    );
    episode["id"].as_i64().expect("episode id")
}

#[test]
fn episode_update_is_partial_and_delete_removes_row() {
    let server = spawn_server("prodhubd-episodes");
    let id = seed_episode(&server);
    let path = format!("/api/episodes/{}", id);

    let updated = server.expect_status(
        server.put(&path, json!({ "stage": "filming", "shoot_date": "2025-04-02" })),
        200,
    );
    assert_eq!(updated["stage"], "filming");
    assert_eq!(updated["shoot_date"], "2025-04-02");
    assert_eq!(updated["title"], "Cusco arrival");
    assert_eq!(updated["hook"], "altitude");

    let err = server.expect_status(server.put(&path, json!({ "stage": "shelved" })), 400);
    assert_eq!(err["error"], "Invalid stage: shelved");
    let err = server.expect_status(server.put(&path, json!({ "title": null })), 400);
    assert_eq!(err["error"], "title is required");
    let err = server.expect_status(server.put(&path, json!({})), 400);
    assert_eq!(err["error"], "No fields to update");

    let err = server.expect_status(server.put("/api/episodes/9999", json!({ "hook": "x" })), 404);
    assert_eq!(err["error"], "Episode not found");
    server.expect_status(server.get("/api/episodes/9999"), 404);

    assert_eq!(
        server.expect_status(server.delete(&path), 200),
        json!({ "ok": true })
    );
    server.expect_status(server.get(&path), 404);
    server.expect_status(server.delete(&path), 404);
}

#[test]
fn phase_end_date_defaults_and_patch_delete_work() {
    let server = spawn_server("prodhubd-phases");
    let episode_id = seed_episode(&server);
    let phases_path = format!("/api/episodes/{}/phases", episode_id);

    let phase = server.expect_status(
        server.post(&phases_path, json!({ "phase": "preprod", "start_date": "2025-03-03" })),
        201,
    );
    assert_eq!(phase["end_date"], "2025-03-03");
    assert_eq!(phase["status"], "planned");
    let phase_path = format!("/api/phases/{}", phase["id"]);

    let err = server.expect_status(
        server.post(&phases_path, json!({ "phase": "color", "start_date": "2025-03-03" })),
        400,
    );
    assert_eq!(err["error"], "Invalid phase: color");
    server.expect_status(
        server.post(
            "/api/episodes/9999/phases",
            json!({ "phase": "shoot", "start_date": "2025-03-03" }),
        ),
        404,
    );

    let patched = server.expect_status(
        server.patch(
            &phase_path,
            json!({ "end_date": "2025-03-07", "status": "in_progress" }),
        ),
        200,
    );
    assert_eq!(patched["start_date"], "2025-03-03");
    assert_eq!(patched["end_date"], "2025-03-07");
    assert_eq!(patched["status"], "in_progress");

    let err = server.expect_status(server.patch(&phase_path, json!({ "start_date": null })), 400);
    assert_eq!(err["error"], "start_date is required");
    server.expect_status(server.patch("/api/phases/9999", json!({ "status": "done" })), 404);

    let listed = server.expect_status(server.get(&phases_path), 200);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    server.expect_status(server.delete(&phase_path), 200);
    let listed = server.expect_status(server.get(&phases_path), 200);
    assert_eq!(listed, Value::Array(Vec::new()));
    server.expect_status(server.delete(&phase_path), 404);
}
