use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use rusqlite::OptionalExtension;
use serde_json::json;
use tracing::warn;

fn handle_templates_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "templates": [] }));
    };

    let mut stmt = match conn.prepare("SELECT id, name, content FROM feedback_templates ORDER BY id")
    {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "template read failed; serving empty list");
            return ok(&req.id, json!({ "templates": [] }));
        }
    };
    let rows = stmt
        .query_map([], |row| {
            let id: i64 = row.get(0)?;
            let name: String = row.get(1)?;
            let content: String = row.get(2)?;
            Ok(json!({ "id": id, "name": name, "content": content }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(templates) => ok(&req.id, json!({ "templates": templates })),
        Err(e) => {
            warn!(error = %e, "template read failed; serving empty list");
            ok(&req.id, json!({ "templates": [] }))
        }
    }
}

/// Empty or missing name/content is rejected before anything touches the
/// store, on create and update alike.
fn validated_fields(req: &Request) -> Result<(String, String), serde_json::Value> {
    let name = req
        .params
        .get("name")
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .unwrap_or_default();
    let content = req
        .params
        .get("content")
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .unwrap_or_default();
    if name.is_empty() || content.is_empty() {
        return Err(err(
            &req.id,
            "validation_error",
            "name and content are required",
            None,
        ));
    }
    Ok((name, content))
}

fn handle_templates_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let (name, content) = match validated_fields(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    // Next id comes from the live maximum, not a counter, so ids stay
    // unique even after out-of-band deletions.
    let next_id: i64 = match conn.query_row(
        "SELECT COALESCE(MAX(id), 0) + 1 FROM feedback_templates",
        [],
        |r| r.get(0),
    ) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    if let Err(e) = conn.execute(
        "INSERT INTO feedback_templates(id, name, content) VALUES(?, ?, ?)",
        (next_id, &name, &content),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "feedback_templates" })),
        );
    }

    ok(
        &req.id,
        json!({ "template": { "id": next_id, "name": name, "content": content } }),
    )
}

fn template_id(req: &Request) -> Result<i64, serde_json::Value> {
    req.params
        .get("id")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| err(&req.id, "bad_params", "missing id", None))
}

fn template_exists(conn: &rusqlite::Connection, id: i64) -> Result<bool, rusqlite::Error> {
    conn.query_row("SELECT 1 FROM feedback_templates WHERE id = ?", [id], |r| {
        r.get::<_, i64>(0)
    })
    .optional()
    .map(|v| v.is_some())
}

fn handle_templates_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let id = match template_id(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let (name, content) = match validated_fields(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match template_exists(conn, id) {
        Ok(true) => {}
        Ok(false) => return err(&req.id, "not_found", "template not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }

    if let Err(e) = conn.execute(
        "UPDATE feedback_templates SET name = ?, content = ? WHERE id = ?",
        (&name, &content, id),
    ) {
        return err(
            &req.id,
            "db_update_failed",
            e.to_string(),
            Some(json!({ "table": "feedback_templates" })),
        );
    }

    ok(
        &req.id,
        json!({ "template": { "id": id, "name": name, "content": content } }),
    )
}

fn handle_templates_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let id = match template_id(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match template_exists(conn, id) {
        Ok(true) => {}
        Ok(false) => return err(&req.id, "not_found", "template not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }

    if let Err(e) = conn.execute("DELETE FROM feedback_templates WHERE id = ?", [id]) {
        return err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "feedback_templates" })),
        );
    }

    ok(&req.id, json!({ "deleted": id }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "templates.list" => Some(handle_templates_list(state, req)),
        "templates.create" => Some(handle_templates_create(state, req)),
        "templates.update" => Some(handle_templates_update(state, req)),
        "templates.delete" => Some(handle_templates_delete(state, req)),
        _ => None,
    }
}
