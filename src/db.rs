use anyhow::Context;
use rusqlite::{types::ValueRef, Connection, OptionalExtension, Params, Row};
use serde_json::{json, Map, Value as JsonValue};
use std::path::Path;

/// Column body shared by the live `sponsors` table and the rebuild used when
/// migrating pre-pipeline stages.
const SPONSOR_COLUMNS: &str = "
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    brand_name TEXT NOT NULL,
    deal_type TEXT DEFAULT 'flat_rate' CHECK(deal_type IN ('flat_rate', 'cpm', 'full_video')),
    deal_value_gross REAL DEFAULT 0,
    deal_value_net REAL DEFAULT 0,
    cpm_rate REAL,
    cpm_cap REAL,
    mvg INTEGER,
    stage TEXT DEFAULT 'leads' CHECK(stage IN ('leads', 'contracted', 'content', 'published', 'invoiced', 'paid')),
    sub_status TEXT,
    contact_name TEXT DEFAULT '',
    contact_email TEXT DEFAULT '',
    agency_name TEXT DEFAULT '',
    agency_contact TEXT DEFAULT '',
    offer_date TEXT,
    contract_date TEXT,
    brief_due TEXT,
    brief_received_date TEXT,
    script_due TEXT,
    film_by TEXT,
    rough_cut_due TEXT,
    brand_review_due TEXT,
    live_date TEXT,
    invoice_date TEXT,
    payment_due_date TEXT,
    payment_received_date TEXT,
    payment_terms_brand_days INTEGER DEFAULT 30,
    payment_terms_agency_days INTEGER DEFAULT 15,
    invoice_amount REAL DEFAULT 0,
    placement TEXT DEFAULT 'first_5_min',
    integration_length_seconds INTEGER DEFAULT 60,
    brief_text TEXT DEFAULT '',
    brief_link TEXT DEFAULT '',
    script_draft TEXT DEFAULT '',
    script_status TEXT DEFAULT 'not_started' CHECK(script_status IN
        ('not_started', 'drafting', 'submitted', 'revision_1', 'revision_2', 'revision_3', 'approved')),
    has_tracking_link INTEGER DEFAULT 0,
    has_pinned_comment INTEGER DEFAULT 0,
    has_qr_code INTEGER DEFAULT 0,
    tracking_link TEXT DEFAULT '',
    promo_code TEXT DEFAULT '',
    youtube_video_id TEXT DEFAULT '',
    youtube_video_title TEXT DEFAULT '',
    views_at_30_days INTEGER DEFAULT 0,
    cpm_screenshot_taken INTEGER DEFAULT 0,
    cpm_invoice_generated INTEGER DEFAULT 0,
    mvg_met INTEGER,
    make_good_required INTEGER DEFAULT 0,
    make_good_video_id TEXT DEFAULT '',
    exclusivity_window_days INTEGER DEFAULT 0,
    exclusivity_category TEXT DEFAULT '',
    requires_product INTEGER DEFAULT 0,
    product_ordered_date TEXT,
    product_ship_to TEXT DEFAULT '',
    product_received INTEGER DEFAULT 0,
    episode_id INTEGER REFERENCES episodes(id) ON DELETE SET NULL,
    notes TEXT DEFAULT '',
    next_action TEXT DEFAULT '',
    next_action_due TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
";

pub fn open_db(path: &Path) -> anyhow::Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Same schema as `open_db`, backed by memory. Used by unit tests.
#[cfg(test)]
pub fn open_in_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS tasks(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT,
            stage TEXT DEFAULT 'backlog' CHECK(stage IN ('backlog','in_progress','review','done')),
            project TEXT,
            priority TEXT DEFAULT 'normal' CHECK(priority IN ('low','normal','high','urgent')),
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now')),
            completed_at TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS activity_log(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            action TEXT NOT NULL,
            task_id INTEGER,
            details TEXT,
            source TEXT DEFAULT 'monty',
            created_at TEXT DEFAULT (datetime('now'))
        )",
        [],
    )?;
    // Hiring writes activity against arbitrary entities, not just tasks.
    ensure_column(conn, "activity_log", "entity_type", "TEXT")?;
    ensure_column(conn, "activity_log", "entity_id", "INTEGER")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS people(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            role TEXT DEFAULT 'other' CHECK(role IN ('editor','fixer','producer','camera','other')),
            email TEXT DEFAULT '',
            phone TEXT DEFAULT '',
            rate_per_day REAL DEFAULT 0,
            currency TEXT DEFAULT 'USD',
            location TEXT DEFAULT '',
            instagram TEXT DEFAULT '',
            notes TEXT DEFAULT '',
            active INTEGER DEFAULT 1,
            created_at TEXT DEFAULT (datetime('now'))
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS series(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            location TEXT DEFAULT '',
            status TEXT DEFAULT 'ideation' CHECK(status IN
                ('ideation','pre_prod','shooting','post_prod','published','archived')),
            target_shoot_start TEXT,
            target_shoot_end TEXT,
            actual_shoot_start TEXT,
            actual_shoot_end TEXT,
            fixer_id INTEGER REFERENCES people(id),
            producer_id INTEGER REFERENCES people(id),
            camera_id INTEGER REFERENCES people(id),
            budget_target REAL DEFAULT 0,
            budget_actual REAL DEFAULT 0,
            notes TEXT DEFAULT '',
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now'))
        )",
        [],
    )?;
    ensure_column(conn, "series", "country", "TEXT DEFAULT ''")?;
    ensure_column(conn, "series", "target_publish_date", "TEXT")?;
    ensure_column(conn, "series", "editor", "TEXT")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS episodes(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            series_id INTEGER REFERENCES series(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            stage TEXT DEFAULT 'idea' CHECK(stage IN
                ('idea','outlined','confirmed','filming','editing','review','published')),
            sort_order INTEGER DEFAULT 0,
            episode_type TEXT DEFAULT 'cornerstone',
            shoot_date TEXT,
            rough_cut_due TEXT,
            publish_date TEXT,
            actual_publish_date TEXT,
            editor_id INTEGER REFERENCES people(id),
            youtube_url TEXT DEFAULT '',
            thumbnail_concept TEXT DEFAULT '',
            hook TEXT DEFAULT '',
            outline TEXT DEFAULT '',
            notes TEXT DEFAULT '',
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now'))
        )",
        [],
    )?;
    // Older databases predate the video tracking columns.
    ensure_column(conn, "episodes", "youtube_video_id", "TEXT DEFAULT ''")?;
    ensure_column(conn, "episodes", "view_count", "INTEGER DEFAULT 0")?;
    ensure_column(conn, "episodes", "view_count_updated_at", "TEXT")?;
    ensure_column(conn, "episodes", "thumbnail_url", "TEXT DEFAULT ''")?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_episodes_series ON episodes(series_id, sort_order)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS episode_phases(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            episode_id INTEGER NOT NULL REFERENCES episodes(id) ON DELETE CASCADE,
            phase TEXT NOT NULL CHECK(phase IN ('preprod','shoot','post','publish')),
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            status TEXT DEFAULT 'planned' CHECK(status IN ('planned','in_progress','done')),
            created_at TEXT DEFAULT (datetime('now'))
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_episode_phases_episode ON episode_phases(episode_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS milestones(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            series_id INTEGER NOT NULL REFERENCES series(id) ON DELETE CASCADE,
            week_number INTEGER NOT NULL,
            title TEXT NOT NULL,
            due_date TEXT,
            completed INTEGER DEFAULT 0,
            completed_at TEXT,
            notes TEXT DEFAULT ''
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_milestones_series ON milestones(series_id, week_number)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS travel(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            series_id INTEGER NOT NULL REFERENCES series(id) ON DELETE CASCADE,
            type TEXT NOT NULL CHECK(type IN ('flight','hotel','transport','permit','other')),
            title TEXT NOT NULL,
            details TEXT DEFAULT '',
            date_start TEXT,
            date_end TEXT,
            cost REAL DEFAULT 0,
            currency TEXT DEFAULT 'USD',
            booked INTEGER DEFAULT 0,
            confirmation_number TEXT DEFAULT '',
            notes TEXT DEFAULT '',
            created_at TEXT DEFAULT (datetime('now'))
        )",
        [],
    )?;

    conn.execute(
        &format!("CREATE TABLE IF NOT EXISTS sponsors({SPONSOR_COLUMNS})"),
        [],
    )?;
    migrate_sponsor_stages(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sponsors_stage ON sponsors(stage)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS media_kit_config(
            id INTEGER PRIMARY KEY DEFAULT 1,
            youtube_handle TEXT DEFAULT '@Andrew_Fraser',
            channel_name TEXT DEFAULT 'Andrew Fraser',
            subscriber_count INTEGER DEFAULT 190000,
            avg_views_per_video INTEGER DEFAULT 80000,
            avg_engagement_rate REAL DEFAULT 4.2,
            niche_description TEXT DEFAULT 'Extreme travel, street food & cultural documentaries from Southeast Asia and beyond.',
            content_pillars TEXT DEFAULT '[\"Extreme Food\",\"Travel Documentaries\",\"Street Culture\",\"Adventure Vlogs\"]',
            audience_age_range TEXT DEFAULT '18-34',
            audience_gender_split TEXT DEFAULT '{\"male\": 68, \"female\": 32}',
            audience_top_geos TEXT DEFAULT '[\"United States\",\"United Kingdom\",\"Australia\",\"Canada\",\"Vietnam\"]',
            posting_frequency TEXT DEFAULT '2-3 videos/month',
            channel_url TEXT DEFAULT 'https://youtube.com/@Andrew_Fraser',
            instagram_handle TEXT DEFAULT '@andrewfraser',
            tiktok_handle TEXT DEFAULT '',
            contact_email TEXT DEFAULT 'andrew@fraser.vn',
            updated_at TEXT DEFAULT (datetime('now'))
        )",
        [],
    )?;
    conn.execute("INSERT OR IGNORE INTO media_kit_config(id) VALUES (1)", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS field_contacts(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            destination TEXT NOT NULL,
            type TEXT NOT NULL DEFAULT 'other' CHECK(type IN ('fixer','hotel','creator','talent','other')),
            stage TEXT NOT NULL DEFAULT 'cold' CHECK(stage IN ('cold','contacted','responded','confirmed','passed')),
            wa TEXT,
            email TEXT,
            instagram TEXT,
            website TEXT,
            notes TEXT,
            source TEXT,
            priority INTEGER NOT NULL DEFAULT 2,
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now'))
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_field_contacts_destination ON field_contacts(destination)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS job_positions(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            role_type TEXT DEFAULT 'producer',
            status TEXT DEFAULT 'active',
            description TEXT DEFAULT '',
            requirements TEXT DEFAULT '',
            rate_range TEXT DEFAULT '',
            location_preference TEXT DEFAULT '',
            job_board_urls TEXT DEFAULT '',
            trial_task_doc_url TEXT DEFAULT '',
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now'))
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS applicants(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            position_id INTEGER NOT NULL REFERENCES job_positions(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            email TEXT DEFAULT '',
            phone TEXT DEFAULT '',
            source TEXT DEFAULT '',
            portfolio_url TEXT DEFAULT '',
            resume_url TEXT DEFAULT '',
            notes TEXT DEFAULT '',
            stage TEXT DEFAULT 'applied' CHECK(stage IN
                ('applied','contacted','trial_sent','evaluation','interview','hired','rejected')),
            trial_task_sent_at TEXT,
            interview_date TEXT,
            rejection_reason TEXT DEFAULT '',
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now'))
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_applicants_position ON applicants(position_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS mc_agents(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            codename TEXT,
            role TEXT,
            role_type TEXT,
            status TEXT DEFAULT 'idle',
            current_task_id INTEGER,
            session_key TEXT,
            last_heartbeat TEXT,
            avatar_color TEXT,
            avatar_icon TEXT,
            created_at TEXT DEFAULT (datetime('now'))
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS mc_tasks(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT,
            status TEXT DEFAULT 'inbox',
            priority TEXT DEFAULT 'normal',
            assignee_ids TEXT DEFAULT '[]',
            tags TEXT DEFAULT '[]',
            created_by TEXT,
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now'))
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS mc_messages(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            task_id INTEGER NOT NULL,
            from_agent_id TEXT,
            content TEXT NOT NULL,
            created_at TEXT DEFAULT (datetime('now'))
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS mc_activities(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            type TEXT NOT NULL,
            agent_id TEXT,
            message TEXT NOT NULL,
            task_id INTEGER,
            created_at TEXT DEFAULT (datetime('now'))
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS mc_documents(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            content TEXT DEFAULT '',
            type TEXT DEFAULT 'note',
            task_id INTEGER,
            agent_id TEXT,
            created_at TEXT DEFAULT (datetime('now'))
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_mc_messages_task ON mc_messages(task_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS health_reports(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL UNIQUE,
            overall_score INTEGER NOT NULL,
            report_json TEXT NOT NULL,
            created_at TEXT DEFAULT (datetime('now'))
        )",
        [],
    )?;

    Ok(())
}

/// Rebuilds `sponsors` when it still carries the flat pre-pipeline stage list,
/// folding each legacy stage into its pipeline stage and sub-status.
fn migrate_sponsor_stages(conn: &Connection) -> anyhow::Result<()> {
    let table_sql: Option<String> = conn
        .query_row(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = 'sponsors'",
            [],
            |r| r.get(0),
        )
        .optional()?;
    let Some(table_sql) = table_sql else {
        return Ok(());
    };

    let columns = table_columns(conn, "sponsors")?;
    let has_sub_status = columns.iter().any(|c| c == "sub_status");
    let has_pipeline_check = crate::pipeline::STAGES
        .iter()
        .all(|s| table_sql.contains(&format!("'{}'", s)));
    if has_sub_status && has_pipeline_check {
        return Ok(());
    }

    let kept = crate::pipeline::SPONSOR_REBUILD_COLUMNS
        .iter()
        .filter(|c| columns.iter().any(|existing| existing == *c))
        .map(|c| format!("\"{}\"", c))
        .collect::<Vec<_>>();
    let prior_sub_status = if has_sub_status { "sub_status" } else { "NULL" };
    let stage_expr = crate::pipeline::legacy_stage_sql();
    let sub_status_expr = crate::pipeline::legacy_sub_status_sql(prior_sub_status);

    let tx = conn.unchecked_transaction()?;
    tx.execute(&format!("CREATE TABLE sponsors_new({SPONSOR_COLUMNS})"), [])?;
    let mut insert_cols = vec!["stage".to_string(), "sub_status".to_string()];
    insert_cols.extend(kept.iter().cloned());
    let mut select_cols = vec![stage_expr, sub_status_expr];
    select_cols.extend(kept);
    tx.execute(
        &format!(
            "INSERT INTO sponsors_new({}) SELECT {} FROM sponsors",
            insert_cols.join(", "),
            select_cols.join(", ")
        ),
        [],
    )?;
    tx.execute("DROP TABLE sponsors", [])?;
    tx.execute("ALTER TABLE sponsors_new RENAME TO sponsors", [])?;
    tx.commit()?;
    tracing::info!("migrated sponsors table to pipeline stages");
    Ok(())
}

fn ensure_column(conn: &Connection, table: &str, column: &str, decl: &str) -> anyhow::Result<()> {
    if table_has_column(conn, table, column)? {
        return Ok(());
    }
    conn.execute(
        &format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, decl),
        [],
    )?;
    Ok(())
}

pub fn table_columns(conn: &Connection, table: &str) -> anyhow::Result<Vec<String>> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    Ok(table_columns(conn, table)?.iter().any(|c| c == column))
}

pub fn table_exists(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?",
        [name],
        |_| Ok(()),
    )
    .optional()
    .map(|v| v.is_some())
}

/// Converts the current row into a JSON object keyed by column name.
pub fn row_to_json(row: &Row<'_>) -> rusqlite::Result<JsonValue> {
    let stmt = row.as_ref();
    let mut obj = Map::with_capacity(stmt.column_count());
    for i in 0..stmt.column_count() {
        let name = stmt.column_name(i)?.to_string();
        let value = match row.get_ref(i)? {
            ValueRef::Null => JsonValue::Null,
            ValueRef::Integer(v) => json!(v),
            ValueRef::Real(v) => json!(v),
            ValueRef::Text(t) => JsonValue::String(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(_) => JsonValue::Null,
        };
        obj.insert(name, value);
    }
    Ok(JsonValue::Object(obj))
}

pub fn query_json<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> rusqlite::Result<Vec<JsonValue>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, row_to_json)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn query_one_json<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> rusqlite::Result<Option<JsonValue>> {
    conn.query_row(sql, params, row_to_json).optional()
}

pub fn count(conn: &Connection, sql: &str) -> rusqlite::Result<i64> {
    conn.query_row(sql, [], |r| r.get(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_idempotent() {
        let conn = open_in_memory().expect("open");
        init_schema(&conn).expect("second init");
        let n = count(&conn, "SELECT COUNT(*) FROM media_kit_config").expect("count");
        assert_eq!(n, 1);
    }

    #[test]
    fn legacy_sponsor_stages_fold_into_pipeline() {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute(
            "CREATE TABLE sponsors(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                brand_name TEXT NOT NULL,
                stage TEXT DEFAULT 'inquiry',
                deal_value_gross REAL DEFAULT 0
            )",
            [],
        )
        .expect("legacy table");
        for (brand, stage) in [
            ("A", "negotiation"),
            ("B", "contract"),
            ("C", "script_writing"),
            ("D", "live"),
            ("E", "paid"),
        ] {
            conn.execute(
                "INSERT INTO sponsors(brand_name, stage) VALUES (?, ?)",
                [brand, stage],
            )
            .expect("seed");
        }

        init_schema(&conn).expect("migrate");

        let rows: Vec<(String, String, Option<String>)> = conn
            .prepare("SELECT brand_name, stage, sub_status FROM sponsors ORDER BY brand_name")
            .expect("prepare")
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
            .expect("query")
            .collect::<Result<_, _>>()
            .expect("collect");
        assert_eq!(
            rows,
            vec![
                ("A".into(), "leads".into(), Some("negotiation".into())),
                ("B".into(), "contracted".into(), None),
                ("C".into(), "content".into(), Some("script_writing".into())),
                ("D".into(), "published".into(), None),
                ("E".into(), "paid".into(), None),
            ]
        );
        assert!(table_has_column(&conn, "sponsors", "promo_code").expect("pragma"));
    }

    #[test]
    fn row_to_json_maps_sqlite_types() {
        let conn = Connection::open_in_memory().expect("open");
        let row = query_one_json(&conn, "SELECT 1 AS a, 2.5 AS b, 'x' AS c, NULL AS d", [])
            .expect("query")
            .expect("row");
        assert_eq!(row, json!({ "a": 1, "b": 2.5, "c": "x", "d": null }));
    }
}
