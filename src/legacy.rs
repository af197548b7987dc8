//! One-shot import from the two databases that predate this service: the
//! production-hub store and the content-pipeline dashboard.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OpenFlags};
use serde_json::{json, Map, Value as JsonValue};
use tracing::{info, warn};

use crate::db::{table_columns, table_exists};
use crate::pipeline::{fold_legacy_stage, map_pipeline_stage};

/// Copied in this order so people exist before the rows that reference them.
const PRODUCTION_TABLES: [&str; 5] = ["people", "series", "episodes", "milestones", "travel"];
const PIPELINE_SPONSOR_TABLES: [&str; 2] = ["sponsors_v2", "sponsors"];
const NET_SHARE: f64 = 0.8;

type SourceRow = HashMap<String, Value>;

/// Production-hub keeps its file under `data/` next to the configured path.
fn resolve_source(path: &Path) -> Option<PathBuf> {
    let alt = path
        .file_name()
        .map(|name| path.parent().unwrap_or(Path::new("")).join("data").join(name));
    if let Some(alt) = alt.filter(|p| p.is_file()) {
        return Some(alt);
    }
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    None
}

fn open_source(path: &Path) -> anyhow::Result<Option<Connection>> {
    let Some(resolved) = resolve_source(path) else {
        warn!(path = %path.display(), "legacy database not found, skipping");
        return Ok(None);
    };
    info!(path = %resolved.display(), "opening legacy database");
    let conn = Connection::open_with_flags(&resolved, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("failed to open {}", resolved.display()))?;
    Ok(Some(conn))
}

fn read_rows(src: &Connection, table: &str) -> anyhow::Result<Vec<SourceRow>> {
    let mut stmt = src.prepare(&format!("SELECT * FROM \"{}\"", table))?;
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let rows = stmt
        .query_map([], |row| {
            let mut out = SourceRow::with_capacity(names.len());
            for (i, name) in names.iter().enumerate() {
                out.insert(name.clone(), row.get::<_, Value>(i)?);
            }
            Ok(out)
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// First of `keys` holding something other than NULL or an empty string.
fn pick(row: &SourceRow, keys: &[&str]) -> Value {
    keys.iter()
        .filter_map(|k| row.get(*k))
        .find(|v| match v {
            Value::Null => false,
            Value::Text(t) => !t.is_empty(),
            _ => true,
        })
        .cloned()
        .unwrap_or(Value::Null)
}

fn as_f64(v: &Value) -> f64 {
    match v {
        Value::Integer(i) => *i as f64,
        Value::Real(f) => *f,
        Value::Text(t) => t.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Inserts the columns of `row` that `table` also has. Returns 1 when a row
/// was written, 0 when it was ignored.
fn insert_row(
    conn: &Connection,
    table: &str,
    target_cols: &[String],
    row: &SourceRow,
) -> rusqlite::Result<usize> {
    let cols: Vec<&String> = target_cols.iter().filter(|c| row.contains_key(*c)).collect();
    if cols.is_empty() {
        return Ok(0);
    }
    let sql = format!(
        "INSERT OR IGNORE INTO {} ({}) VALUES ({})",
        table,
        cols.iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(", "),
        vec!["?"; cols.len()].join(", ")
    );
    conn.execute(&sql, params_from_iter(cols.iter().map(|c| &row[c.as_str()])))
}

fn copy_table(conn: &Connection, src: &Connection, table: &str) -> anyhow::Result<usize> {
    if !table_exists(src, table)? {
        return Ok(0);
    }
    let target_cols = table_columns(conn, table)?;
    let mut inserted = 0;
    for row in read_rows(src, table)? {
        inserted += insert_row(conn, table, &target_cols, &row)?;
    }
    Ok(inserted)
}

/// Ids are not carried over for sponsors, so a deal already present with the
/// same brand and creation time is treated as imported.
fn sponsor_exists(conn: &Connection, row: &SourceRow) -> rusqlite::Result<bool> {
    let brand = row.get("brand_name").cloned().unwrap_or(Value::Null);
    let created = row.get("created_at").cloned().unwrap_or(Value::Null);
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sponsors WHERE brand_name = ?1 AND created_at IS ?2)",
        [brand, created],
        |r| r.get(0),
    )
}

fn set_stage(row: &mut SourceRow, raw_stage: &str) {
    let (stage, sub_status) = fold_legacy_stage(raw_stage);
    row.insert("stage".into(), Value::Text(stage.into()));
    row.insert(
        "sub_status".into(),
        sub_status.map_or(Value::Null, |s| Value::Text(s.into())),
    );
}

fn stage_text(row: &SourceRow) -> String {
    match pick(row, &["stage"]) {
        Value::Text(t) => t,
        _ => "inquiry".into(),
    }
}

fn insert_sponsors(
    conn: &Connection,
    rows: Vec<SourceRow>,
    shape: impl Fn(SourceRow) -> SourceRow,
) -> anyhow::Result<usize> {
    let target_cols = table_columns(conn, "sponsors")?;
    let mut inserted = 0;
    for row in rows {
        let mut row = shape(row);
        row.remove("id");
        if sponsor_exists(conn, &row)? {
            continue;
        }
        inserted += insert_row(conn, "sponsors", &target_cols, &row)?;
    }
    Ok(inserted)
}

fn production_sponsor(mut row: SourceRow) -> SourceRow {
    let gross = as_f64(&pick(&row, &["deal_value", "deal_value_gross"]));
    row.insert("deal_value_gross".into(), Value::Real(gross));
    row.insert("deal_value_net".into(), Value::Real(gross * NET_SHARE));
    let stage = stage_text(&row);
    set_stage(&mut row, &stage);
    row
}

fn pipeline_sponsor(mut row: SourceRow) -> SourceRow {
    let gross = as_f64(&pick(&row, &["deal_value_gross"]));
    let net = match as_f64(&pick(&row, &["deal_value_net"])) {
        n if n != 0.0 => n,
        _ => gross * NET_SHARE,
    };
    let contact_name = pick(&row, &["agency_contact", "contact_name"]);
    let contact_email = pick(&row, &["agency_email", "contact_email"]);
    let script_due = pick(&row, &["script_due_date", "script_due"]);
    let live_date = pick(&row, &["publish_date", "live_date"]);
    row.insert("deal_value_gross".into(), Value::Real(gross));
    row.insert("deal_value_net".into(), Value::Real(net));
    row.insert("contact_name".into(), contact_name);
    row.insert("contact_email".into(), contact_email);
    row.insert("script_due".into(), script_due);
    row.insert("live_date".into(), live_date);
    let stage = stage_text(&row);
    set_stage(&mut row, map_pipeline_stage(&stage));
    row
}

fn import_production(conn: &Connection, src: &Connection) -> anyhow::Result<JsonValue> {
    let mut counts = Map::new();
    let tx = conn.unchecked_transaction()?;
    for table in PRODUCTION_TABLES {
        let n = copy_table(&tx, src, table).with_context(|| format!("importing {}", table))?;
        info!(table, rows = n, "imported production rows");
        counts.insert(table.to_string(), json!(n));
    }
    let sponsors = if table_exists(src, "sponsors")? {
        insert_sponsors(&tx, read_rows(src, "sponsors")?, production_sponsor)?
    } else {
        0
    };
    info!(rows = sponsors, "imported production sponsors");
    counts.insert("sponsors".into(), json!(sponsors));
    tx.commit()?;
    Ok(JsonValue::Object(counts))
}

fn import_pipeline(conn: &Connection, src: &Connection) -> anyhow::Result<JsonValue> {
    for table in PIPELINE_SPONSOR_TABLES {
        if !table_exists(src, table)? {
            continue;
        }
        let rows = read_rows(src, table)?;
        if rows.is_empty() {
            continue;
        }
        let tx = conn.unchecked_transaction()?;
        let n = insert_sponsors(&tx, rows, pipeline_sponsor)?;
        tx.commit()?;
        info!(table, rows = n, "imported pipeline sponsors");
        return Ok(json!({ "table": table, "sponsors": n }));
    }
    Ok(json!({ "table": null, "sponsors": 0 }))
}

/// Imports whichever sources are given and returns per-table insert counts.
/// Foreign keys are relaxed for the duration since legacy rows may point at
/// people that were never exported.
pub fn import(
    conn: &Connection,
    production_db: Option<&Path>,
    pipeline_db: Option<&Path>,
) -> anyhow::Result<JsonValue> {
    conn.pragma_update(None, "foreign_keys", false)?;
    let result = (|| -> anyhow::Result<JsonValue> {
        let production = match production_db.map(open_source).transpose()?.flatten() {
            Some(src) => import_production(conn, &src)?,
            None => JsonValue::Null,
        };
        let pipeline = match pipeline_db.map(open_source).transpose()?.flatten() {
            Some(src) => import_pipeline(conn, &src)?,
            None => JsonValue::Null,
        };
        Ok(json!({ "production": production, "pipeline": pipeline }))
    })();
    conn.pragma_update(None, "foreign_keys", true)?;
    result
}
