mod test_support;

use pretty_assertions::assert_eq;
use serde_json::json;
use test_support::spawn_server;

#[test]
fn mission_tasks_track_status_changes_in_the_feed() {
    let server = spawn_server("prodhubd-mission");

    let agent = server.expect_status(
        server.post(
            "/api/mission-control/agents",
            json!({ "name": "Scout", "role": "research" }),
        ),
        201,
    );
    assert_eq!(agent["status"], "idle");
    let agent_id = agent["id"].as_str().expect("agent id").to_string();
    assert_eq!(agent_id.len(), 36);

    let task = server.expect_status(
        server.post(
            "/api/mission-control/tasks",
            json!({
                "title": "Find fixers in Lima",
                "assignee_ids": [agent_id.clone()],
                "tags": ["peru"],
                "created_by": agent_id.clone(),
            }),
        ),
        201,
    );
    assert_eq!(task["status"], "inbox");
    assert_eq!(task["assignee_ids"], json!([agent_id.clone()]));
    assert_eq!(task["tags"], json!(["peru"]));
    let task_id = task["id"].as_i64().expect("task id");

    let moved = server.expect_status(
        server.patch(
            &format!("/api/mission-control/tasks/{}", task_id),
            json!({ "status": "in_progress" }),
        ),
        200,
    );
    assert_eq!(moved["status"], "in_progress");

    server.expect_status(
        server.post(
            "/api/mission-control/messages",
            json!({ "task_id": task_id, "content": "Two leads so far", "from_agent_id": agent_id.clone() }),
        ),
        201,
    );
    let thread = server.expect_status(
        server.get(&format!("/api/mission-control/messages?task_id={}", task_id)),
        200,
    );
    assert_eq!(thread[0]["agent_name"], "Scout");
    server.expect_status(server.get("/api/mission-control/messages"), 400);

    let feed = server.expect_status(server.get("/api/mission-control/activities?limit=2"), 200);
    let messages: Vec<&str> = feed
        .as_array()
        .expect("feed")
        .iter()
        .filter_map(|a| a["message"].as_str())
        .collect();
    assert_eq!(messages, vec!["commented on task", "moved to in_progress"]);
    assert_eq!(feed[1]["agent_name"], "Scout");
    assert_eq!(feed[1]["task_title"], "Find fixers in Lima");

    let mine = server.expect_status(
        server.get(&format!("/api/mission-control/tasks?assignee={}", agent_id)),
        200,
    );
    assert_eq!(mine.as_array().map(Vec::len), Some(1));
    let other = server.expect_status(server.get("/api/mission-control/tasks?assignee=nobody"), 200);
    assert_eq!(other, json!([]));

    server.expect_status(
        server.patch(
            &format!("/api/mission-control/agents/{}", agent_id),
            json!({ "status": "working", "current_task_id": task_id }),
        ),
        200,
    );
    let agents = server.expect_status(server.get("/api/mission-control/agents"), 200);
    assert_eq!(agents[0]["current_task_title"], "Find fixers in Lima");

    let stats = server.expect_status(server.get("/api/mission-control/stats"), 200);
    assert_eq!(
        stats,
        json!({ "agentsActive": 1, "tasksInQueue": 1, "totalTasks": 1 })
    );

    server.expect_status(
        server.patch("/api/mission-control/tasks/999", json!({ "status": "done" })),
        404,
    );
    server.expect_status(
        server.patch("/api/mission-control/agents/missing", json!({ "status": "idle" })),
        404,
    );
}

#[test]
fn documents_attach_to_tasks() {
    let server = spawn_server("prodhubd-mission-docs");
    let doc = server.expect_status(
        server.post(
            "/api/mission-control/documents",
            json!({ "title": "Fixer shortlist", "task_id": 7 }),
        ),
        201,
    );
    assert_eq!(doc["type"], "note");
    assert_eq!(doc["content"], "");

    let for_task = server.expect_status(server.get("/api/mission-control/documents?task_id=7"), 200);
    assert_eq!(for_task.as_array().map(Vec::len), Some(1));
    let none = server.expect_status(server.get("/api/mission-control/documents?task_id=8"), 200);
    assert_eq!(none, json!([]));
}
