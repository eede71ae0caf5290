use crate::aggregate;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers;
use crate::ipc::types::{AppState, Request};
use crate::snapshot;
use serde_json::json;
use std::path::PathBuf;
use tracing::warn;
use uuid::Uuid;

fn handle_snapshot_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let path = match req.params.get("path").and_then(|v| v.as_str()) {
        Some(v) => PathBuf::from(v),
        None => return err(&req.id, "bad_params", "missing params.path", None),
    };

    let bytes = match std::fs::read(&path) {
        Ok(b) => b,
        Err(e) => {
            return err(
                &req.id,
                "snapshot_read_failed",
                e.to_string(),
                Some(json!({ "path": path.to_string_lossy() })),
            )
        }
    };
    let snap: snapshot::Snapshot = match serde_json::from_slice(&bytes) {
        Ok(s) => s,
        Err(e) => {
            return err(
                &req.id,
                "snapshot_parse_failed",
                e.to_string(),
                Some(json!({ "path": path.to_string_lossy() })),
            )
        }
    };

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };

    // Re-import replaces the previously imported roster and performance
    // rows. Templates live their own life and are not touched.
    for table in ["grades", "students", "classes", "performance_monthly", "class_comparison"] {
        if let Err(e) = tx.execute(&format!("DELETE FROM {}", table), []) {
            let _ = tx.rollback();
            return err(
                &req.id,
                "db_delete_failed",
                e.to_string(),
                Some(json!({ "table": table })),
            );
        }
    }

    let mut class_count = 0usize;
    let mut student_count = 0usize;
    let mut grade_count = 0usize;

    for (class_sort, class) in snap.classes.iter().enumerate() {
        let class_id = snapshot::id_as_string(&class.id).unwrap_or_else(|| Uuid::new_v4().to_string());
        let recent = serde_json::to_string(&class.recent_assignments).unwrap_or_else(|_| "[]".into());
        if let Err(e) = tx.execute(
            "INSERT INTO classes(id, name, average_grade, recent_assignments, sort_order)
             VALUES(?, ?, ?, ?, ?)",
            (
                &class_id,
                &class.name,
                class.average_grade,
                &recent,
                class_sort as i64,
            ),
        ) {
            let _ = tx.rollback();
            return err(
                &req.id,
                "db_insert_failed",
                e.to_string(),
                Some(json!({ "table": "classes" })),
            );
        }
        class_count += 1;

        for (student_sort, student) in class.students.iter().enumerate() {
            let student_id =
                snapshot::id_as_string(&student.id).unwrap_or_else(|| Uuid::new_v4().to_string());
            if let Err(e) = tx.execute(
                "INSERT INTO students(id, class_id, name, avatar, attendance, participation, sort_order)
                 VALUES(?, ?, ?, ?, ?, ?, ?)",
                (
                    &student_id,
                    &class_id,
                    &student.name,
                    &student.avatar,
                    student.attendance,
                    student.participation,
                    student_sort as i64,
                ),
            ) {
                let _ = tx.rollback();
                return err(
                    &req.id,
                    "db_insert_failed",
                    e.to_string(),
                    Some(json!({ "table": "students" })),
                );
            }
            student_count += 1;

            for (grade_sort, grade) in student.grades.iter().enumerate() {
                let gid = Uuid::new_v4().to_string();
                if let Err(e) = tx.execute(
                    "INSERT INTO grades(id, student_id, assignment, score, date, sort_order)
                     VALUES(?, ?, ?, ?, ?, ?)",
                    (
                        &gid,
                        &student_id,
                        &grade.assignment,
                        grade.score,
                        &grade.date,
                        grade_sort as i64,
                    ),
                ) {
                    let _ = tx.rollback();
                    return err(
                        &req.id,
                        "db_insert_failed",
                        e.to_string(),
                        Some(json!({ "table": "grades" })),
                    );
                }
                grade_count += 1;
            }
        }
    }

    for (sort, month) in snap.performance.monthly.iter().enumerate() {
        if let Err(e) = tx.execute(
            "INSERT INTO performance_monthly(month, average, sort_order) VALUES(?, ?, ?)",
            (&month.month, month.average, sort as i64),
        ) {
            let _ = tx.rollback();
            return err(
                &req.id,
                "db_insert_failed",
                e.to_string(),
                Some(json!({ "table": "performance_monthly" })),
            );
        }
    }
    for (sort, row) in snap.performance.class_comparison.iter().enumerate() {
        if let Err(e) = tx.execute(
            "INSERT INTO class_comparison(class_name, this_month, last_month, sort_order)
             VALUES(?, ?, ?, ?)",
            (&row.class_name, row.this_month, row.last_month, sort as i64),
        ) {
            let _ = tx.rollback();
            return err(
                &req.id,
                "db_insert_failed",
                e.to_string(),
                Some(json!({ "table": "class_comparison" })),
            );
        }
    }

    if let Err(e) = tx.commit() {
        return err(&req.id, "db_commit_failed", e.to_string(), None);
    }

    ok(
        &req.id,
        json!({
            "classCount": class_count,
            "studentCount": student_count,
            "gradeCount": grade_count
        }),
    )
}

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "classes": [] }));
    };

    let classes = match helpers::load_classes(conn) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "classes read failed; serving empty list");
            Vec::new()
        }
    };

    let rows: Vec<serde_json::Value> = classes
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "name": c.name,
                "averageGrade": c.average_grade,
                "studentCount": c.student_count,
                "recentAssignments": c.recent_assignments
            })
        })
        .collect();
    ok(&req.id, json!({ "classes": rows }))
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "students": [] }));
    };

    let class_id = req.params.get("classId").and_then(|v| v.as_str());
    let students = match helpers::load_students(conn, class_id) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "students read failed; serving empty list");
            Vec::new()
        }
    };

    let rows: Vec<serde_json::Value> = students
        .iter()
        .map(|s| {
            let grades: Vec<serde_json::Value> = s
                .grades
                .iter()
                .map(|g| {
                    json!({
                        "assignment": g.assignment,
                        "score": g.score,
                        "date": g.date
                    })
                })
                .collect();
            json!({
                "id": s.id,
                "name": s.name,
                "avatar": s.avatar,
                "attendance": s.attendance,
                "participation": s.participation,
                "grades": grades
            })
        })
        .collect();
    ok(&req.id, json!({ "students": rows }))
}

fn handle_performance_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let empty = json!({ "monthly": [], "classComparison": [], "delta": serde_json::Value::Null });
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, empty);
    };

    let monthly = load_monthly(conn).unwrap_or_else(|e| {
        warn!(error = %e, "performance read failed; serving empty structure");
        Vec::new()
    });
    let comparison = load_comparison(conn).unwrap_or_else(|e| {
        warn!(error = %e, "class comparison read failed; serving empty structure");
        Vec::new()
    });

    let delta = aggregate::monthly_delta(&monthly);
    let monthly_rows: Vec<serde_json::Value> = monthly
        .iter()
        .map(|m| json!({ "month": m.month, "average": m.average }))
        .collect();
    let comparison_rows: Vec<serde_json::Value> = comparison
        .iter()
        .map(|c| {
            json!({
                "class": c.class_name,
                "thisMonth": c.this_month,
                "lastMonth": c.last_month,
                "difference": c.this_month - c.last_month
            })
        })
        .collect();

    ok(
        &req.id,
        json!({
            "monthly": monthly_rows,
            "classComparison": comparison_rows,
            "delta": delta
        }),
    )
}

fn load_monthly(conn: &rusqlite::Connection) -> Result<Vec<snapshot::MonthlyAverage>, rusqlite::Error> {
    let mut stmt =
        conn.prepare("SELECT month, average FROM performance_monthly ORDER BY sort_order")?;
    stmt.query_map([], |row| {
        Ok(snapshot::MonthlyAverage {
            month: row.get(0)?,
            average: row.get(1)?,
        })
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
}

fn load_comparison(
    conn: &rusqlite::Connection,
) -> Result<Vec<snapshot::ClassComparison>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT class_name, this_month, last_month FROM class_comparison ORDER BY sort_order",
    )?;
    stmt.query_map([], |row| {
        Ok(snapshot::ClassComparison {
            class_name: row.get(0)?,
            this_month: row.get(1)?,
            last_month: row.get(2)?,
        })
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "snapshot.import" => Some(handle_snapshot_import(state, req)),
        "classes.list" => Some(handle_classes_list(state, req)),
        "students.list" => Some(handle_students_list(state, req)),
        "performance.get" => Some(handle_performance_get(state, req)),
        _ => None,
    }
}
