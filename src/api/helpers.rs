use std::collections::HashMap;

use axum::{http::StatusCode, Json};
use chrono::{Local, NaiveDate, Utc};
use rusqlite::{params_from_iter, types::Value as SqlValue, Connection};
use serde_json::{json, Map, Value};

use super::error::{ApiError, ApiResult};
use crate::db::query_one_json;

pub type Body = Map<String, Value>;
pub type Query = HashMap<String, String>;

/// An empty body reads as `{}`. Anything else must be a JSON object.
pub fn parse_body(bytes: &[u8]) -> ApiResult<Body> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Body::new());
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::bad_request("Request body must be a JSON object")),
        Err(_) => Err(ApiError::bad_request("Invalid JSON body")),
    }
}

pub fn opt_str(body: &Body, key: &str) -> Option<String> {
    match body.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Present and non-blank after trimming.
pub fn required_str(body: &Body, key: &str) -> ApiResult<String> {
    opt_str(body, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("{} is required", key)))
}

pub fn opt_i64(body: &Body, key: &str) -> Option<i64> {
    match body.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

pub fn required_i64(body: &Body, key: &str) -> ApiResult<i64> {
    opt_i64(body, key).ok_or_else(|| ApiError::bad_request(format!("{} is required", key)))
}

pub fn opt_f64(body: &Body, key: &str) -> Option<f64> {
    match body.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn opt_bool(body: &Body, key: &str) -> Option<bool> {
    match body.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => Some(matches!(s.as_str(), "true" | "1")),
        _ => None,
    }
}

pub fn check_one_of(field: &str, value: &str, allowed: &[&str]) -> ApiResult<()> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!("Invalid {}: {}", field, value)))
    }
}

/// Validates `key` when the body carries it. An explicit `null` is rejected.
pub fn check_opt_one_of(body: &Body, key: &str, allowed: &[&str]) -> ApiResult<()> {
    match body.get(key) {
        None => Ok(()),
        Some(Value::Null) => Err(ApiError::bad_request(format!("{} is required", key))),
        Some(raw) => match opt_str(body, key) {
            Some(v) => check_one_of(key, &v, allowed),
            None => Err(ApiError::bad_request(format!("Invalid {}: {}", key, raw))),
        },
    }
}

/// Columns that must keep a value: a present key may not be `null` or blank.
pub fn check_not_null(body: &Body, keys: &[&str]) -> ApiResult<()> {
    for key in keys {
        let blank = match body.get(*key) {
            Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            _ => false,
        };
        if blank {
            return Err(ApiError::bad_request(format!("{} is required", key)));
        }
    }
    Ok(())
}

/// Arrays and objects are stored as their JSON text.
pub fn to_sql(v: &Value) -> SqlValue {
    match v {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map_or(SqlValue::Null, SqlValue::Real),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(v.to_string()),
    }
}

/// Column assignments for a partial `UPDATE`.
#[derive(Debug, Default)]
pub struct Patch {
    assignments: Vec<String>,
    values: Vec<SqlValue>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes every whitelisted key the body carries, as-is.
    pub fn from_body(body: &Body, allowed: &[&str]) -> Self {
        let mut patch = Self::new();
        for key in allowed {
            if let Some(v) = body.get(*key) {
                patch.set(key, to_sql(v));
            }
        }
        patch
    }

    pub fn set(&mut self, column: &str, value: impl Into<SqlValue>) {
        if let Some(i) = self
            .assignments
            .iter()
            .position(|a| a == &format!("{} = ?", column))
        {
            self.values[i] = value.into();
            return;
        }
        self.assignments.push(format!("{} = ?", column));
        self.values.push(value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn require_fields(&self) -> ApiResult<()> {
        if self.is_empty() {
            Err(ApiError::bad_request("No fields to update"))
        } else {
            Ok(())
        }
    }

    /// Stamps `column` with the current UTC time.
    pub fn touch(&mut self, column: &str) {
        self.set(column, now_ts());
    }

    pub fn apply(
        mut self,
        conn: &Connection,
        table: &str,
        id: impl Into<SqlValue>,
    ) -> rusqlite::Result<usize> {
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?",
            table,
            self.assignments.join(", ")
        );
        self.values.push(id.into());
        conn.execute(&sql, params_from_iter(self.values.iter()))
    }
}

/// `WHERE` clauses for list endpoints with optional filters.
#[derive(Debug, Default)]
pub struct Filters {
    clauses: Vec<String>,
    values: Vec<SqlValue>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, clause: &str, value: impl Into<SqlValue>) {
        self.clauses.push(clause.to_string());
        self.values.push(value.into());
    }

    /// Adds `clause` when the query string has a non-empty `key`.
    pub fn from_query(&mut self, query: &Query, key: &str, clause: &str) {
        if let Some(v) = query.get(key).filter(|v| !v.is_empty()) {
            self.push(clause, v.clone());
        }
    }

    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn params(&self) -> impl rusqlite::Params + '_ {
        params_from_iter(self.values.iter())
    }
}

/// `YYYY-MM-DD HH:MM:SS`, matching SQLite `datetime('now')`.
pub fn now_ts() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn parse_date(field: &str, raw: &str) -> ApiResult<NaiveDate> {
    crate::alerts::parse_day(Some(raw))
        .ok_or_else(|| ApiError::bad_request(format!("Invalid {}: {}", field, raw)))
}

/// Local date unless the request pins one with `?today=YYYY-MM-DD`.
pub fn today(query: &Query) -> ApiResult<NaiveDate> {
    match query.get("today").filter(|v| !v.is_empty()) {
        Some(raw) => parse_date("today", raw),
        None => Ok(Local::now().date_naive()),
    }
}

pub fn created(v: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::CREATED, Json(v))
}

pub fn ok_true() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// Reads one row by id or fails with 404 naming `what`.
pub fn fetch_by_id(
    conn: &Connection,
    sql: &str,
    id: impl Into<SqlValue>,
    what: &str,
) -> ApiResult<Value> {
    query_one_json(conn, sql, [id.into()])?.ok_or_else(|| ApiError::not_found(what))
}

/// Applies `patch` to row `id` of `table` and reads the row back.
pub fn update_row(
    conn: &Connection,
    table: &str,
    id: impl Into<SqlValue>,
    patch: Patch,
    what: &str,
) -> ApiResult<Value> {
    let id = id.into();
    if patch.apply(conn, table, id.clone())? == 0 {
        return Err(ApiError::not_found(what));
    }
    fetch_by_id(conn, &format!("SELECT * FROM {} WHERE id = ?", table), id, what)
}

pub fn delete_row(
    conn: &Connection,
    table: &str,
    id: impl Into<SqlValue>,
    what: &str,
) -> ApiResult<()> {
    let sql = format!("DELETE FROM {} WHERE id = ?", table);
    if conn.execute(&sql, [id.into()])? == 0 {
        return Err(ApiError::not_found(what));
    }
    Ok(())
}

pub fn log_activity(
    conn: &Connection,
    action: &str,
    task_id: Option<i64>,
    details: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO activity_log(action, task_id, details) VALUES (?, ?, ?)",
        rusqlite::params![action, task_id, details],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn body(v: Value) -> Body {
        match v {
            Value::Object(m) => m,
            _ => panic!("object expected"),
        }
    }

    #[test]
    fn body_parsing() {
        assert!(parse_body(b"").expect("empty").is_empty());
        assert!(parse_body(b"  \n").expect("blank").is_empty());
        assert!(matches!(parse_body(b"[1]"), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_body(b"{oops"), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn field_readers() {
        let b = body(json!({
            "title": "  Hello ",
            "blank": "  ",
            "n": 4.6,
            "s": "12",
            "flag": 1,
        }));
        assert_eq!(required_str(&b, "title").expect("title"), "Hello");
        assert!(required_str(&b, "blank").is_err());
        assert_eq!(
            required_str(&b, "missing").map_err(|e| e.to_string()),
            Err("missing is required".to_string())
        );
        assert_eq!(opt_i64(&b, "n"), Some(5));
        assert_eq!(opt_i64(&b, "s"), Some(12));
        assert_eq!(opt_bool(&b, "flag"), Some(true));
        assert_eq!(opt_f64(&b, "n"), Some(4.6));
    }

    #[test]
    fn patch_applies_whitelisted_fields() {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute_batch(
            "CREATE TABLE t(id INTEGER PRIMARY KEY, a TEXT, b INTEGER, tags TEXT);
             INSERT INTO t(id, a, b) VALUES (1, 'x', 1);",
        )
        .expect("seed");
        let b = body(json!({ "a": "y", "b": true, "tags": ["p"], "nope": 1 }));
        let patch = Patch::from_body(&b, &["a", "b", "tags"]);
        assert_eq!(patch.assignments, vec!["a = ?", "b = ?", "tags = ?"]);
        assert_eq!(patch.apply(&conn, "t", 1).expect("update"), 1);
        let row: (String, i64, String) = conn
            .query_row("SELECT a, b, tags FROM t WHERE id = 1", [], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?))
            })
            .expect("row");
        assert_eq!(row, ("y".into(), 1, "[\"p\"]".into()));
    }

    #[test]
    fn null_and_blank_rejected_for_kept_columns() {
        let b = body(json!({ "title": null, "stage": null, "name": "  ", "notes": null }));
        let msg = |r: ApiResult<()>| r.map_err(|e| e.to_string());
        assert_eq!(
            msg(check_not_null(&b, &["title"])),
            Err("title is required".to_string())
        );
        assert_eq!(
            msg(check_not_null(&b, &["name"])),
            Err("name is required".to_string())
        );
        assert_eq!(msg(check_not_null(&b, &["missing"])), Ok(()));
        assert_eq!(
            msg(check_opt_one_of(&b, "stage", &["leads"])),
            Err("stage is required".to_string())
        );
        assert_eq!(msg(check_opt_one_of(&b, "missing", &["leads"])), Ok(()));
        let odd = body(json!({ "stage": true }));
        assert_eq!(
            msg(check_opt_one_of(&odd, "stage", &["leads"])),
            Err("Invalid stage: true".to_string())
        );
    }

    #[test]
    fn patch_set_overrides_earlier_value() {
        let mut patch = Patch::new();
        patch.set("a", 1);
        patch.set("a", 2);
        assert_eq!(patch.assignments.len(), 1);
        assert_eq!(patch.values, vec![SqlValue::Integer(2)]);
    }

    #[test]
    fn filters_build_where_clause() {
        let mut q = Query::new();
        q.insert("stage".into(), "leads".into());
        q.insert("empty".into(), String::new());
        let mut f = Filters::new();
        f.from_query(&q, "stage", "stage = ?");
        f.from_query(&q, "empty", "x = ?");
        assert_eq!(f.where_sql(), " WHERE stage = ?");
        assert_eq!(Filters::new().where_sql(), "");
    }

    #[test]
    fn today_override() {
        let mut q = Query::new();
        q.insert("today".into(), "2025-03-10".into());
        assert_eq!(
            today(&q).expect("today"),
            NaiveDate::from_ymd_opt(2025, 3, 10).expect("date")
        );
        q.insert("today".into(), "soon".into());
        assert!(today(&q).is_err());
    }
}
