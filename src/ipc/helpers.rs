use crate::aggregate::{GradeRow, StudentRow};
use rusqlite::Connection;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct ClassRow {
    pub id: String,
    pub name: String,
    pub average_grade: f64,
    pub recent_assignments: Vec<String>,
    pub student_count: i64,
}

pub fn load_classes(conn: &Connection) -> Result<Vec<ClassRow>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT
           c.id,
           c.name,
           c.average_grade,
           c.recent_assignments,
           (SELECT COUNT(*) FROM students s WHERE s.class_id = c.id) AS student_count
         FROM classes c
         ORDER BY c.sort_order",
    )?;
    stmt.query_map([], |row| {
        let raw_recent: String = row.get(3)?;
        Ok(ClassRow {
            id: row.get(0)?,
            name: row.get(1)?,
            average_grade: row.get(2)?,
            recent_assignments: serde_json::from_str(&raw_recent).unwrap_or_default(),
            student_count: row.get(4)?,
        })
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
}

/// Students in storage order, each with their grades attached in storage
/// order. `class_id = None` flattens the whole roster.
pub fn load_students(
    conn: &Connection,
    class_id: Option<&str>,
) -> Result<Vec<StudentRow>, rusqlite::Error> {
    let mut students: Vec<(String, StudentRow)> = Vec::new();
    match class_id {
        Some(cid) => {
            let mut stmt = conn.prepare(
                "SELECT id, class_id, name, avatar, attendance, participation
                 FROM students
                 WHERE class_id = ?
                 ORDER BY sort_order",
            )?;
            let rows = stmt
                .query_map([cid], student_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            students.extend(rows);
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT s.id, s.class_id, s.name, s.avatar, s.attendance, s.participation
                 FROM students s
                 JOIN classes c ON c.id = s.class_id
                 ORDER BY c.sort_order, s.sort_order",
            )?;
            let rows = stmt
                .query_map([], student_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            students.extend(rows);
        }
    }

    let mut grades_by_student: HashMap<String, Vec<GradeRow>> = HashMap::new();
    let mut stmt = conn.prepare(
        "SELECT student_id, assignment, score, date
         FROM grades
         ORDER BY student_id, sort_order",
    )?;
    let rows = stmt
        .query_map([], |row| {
            let student_id: String = row.get(0)?;
            Ok((
                student_id,
                GradeRow {
                    assignment: row.get(1)?,
                    score: row.get(2)?,
                    date: row.get(3)?,
                },
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    for (student_id, grade) in rows {
        grades_by_student.entry(student_id).or_default().push(grade);
    }

    Ok(students
        .into_iter()
        .map(|(id, mut s)| {
            s.grades = grades_by_student.remove(&id).unwrap_or_default();
            s
        })
        .collect())
}

fn student_from_row(row: &rusqlite::Row<'_>) -> Result<(String, StudentRow), rusqlite::Error> {
    let id: String = row.get(0)?;
    Ok((
        id.clone(),
        StudentRow {
            id,
            name: row.get(2)?,
            avatar: row.get(3)?,
            attendance: row.get(4)?,
            participation: row.get(5)?,
            grades: Vec::new(),
        },
    ))
}

pub fn all_scores(conn: &Connection) -> Result<Vec<f64>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT score FROM grades ORDER BY student_id, sort_order")?;
    stmt.query_map([], |row| row.get::<_, f64>(0))
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
}
