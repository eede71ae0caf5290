use crate::aggregate::{self, Metric, StudentRow, TrendDirection};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::cmp::Ordering;
use tracing::warn;

fn handle_grade_distribution(state: &mut AppState, req: &Request) -> serde_json::Value {
    let scores = match state.db.as_ref() {
        Some(conn) => helpers::all_scores(conn).unwrap_or_else(|e| {
            warn!(error = %e, "grade read failed; serving empty distribution");
            Vec::new()
        }),
        None => Vec::new(),
    };

    let dist = aggregate::grade_distribution(&scores);
    ok(&req.id, json!(dist))
}

fn handle_class_averages(state: &mut AppState, req: &Request) -> serde_json::Value {
    let metric_raw = match req.params.get("metric").and_then(|v| v.as_str()) {
        Some(v) => v,
        None => return err(&req.id, "bad_params", "missing metric", None),
    };
    let Some(metric) = Metric::parse(metric_raw) else {
        return err(
            &req.id,
            "bad_params",
            "metric must be one of: attendance, participation",
            Some(json!({ "metric": metric_raw })),
        );
    };

    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "classes": [] }));
    };

    let classes = helpers::load_classes(conn).unwrap_or_else(|e| {
        warn!(error = %e, "classes read failed; serving empty averages");
        Vec::new()
    });

    let mut rows: Vec<serde_json::Value> = Vec::new();
    for class in &classes {
        let students = match helpers::load_students(conn, Some(class.id.as_str())) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, class_id = %class.id, "students read failed; skipping class");
                continue;
            }
        };
        let average = aggregate::metric_average(&students, metric);
        rows.push(json!({
            "classId": class.id,
            "name": class.name,
            "average": average,
            "noData": average.is_none(),
            "averageGrade": class.average_grade,
            "highestScore": aggregate::max_score(&students)
        }));
    }
    ok(&req.id, json!({ "metric": metric_raw.to_ascii_lowercase(), "classes": rows }))
}

fn handle_correlation(state: &mut AppState, req: &Request) -> serde_json::Value {
    let students = load_all_students(state);
    let points = aggregate::correlation_points(&students);
    ok(&req.id, json!({ "points": points }))
}

#[derive(Debug, Clone)]
struct ProgressQuery {
    search: Option<String>,
    sort_by: String,
    sort_dir: String,
    page: usize,
    page_size: usize,
}

fn parse_search(v: Option<&serde_json::Value>) -> Result<Option<String>, String> {
    let Some(value) = v else {
        return Ok(None);
    };
    if value.is_null() {
        return Ok(None);
    }
    let Some(raw) = value.as_str() else {
        return Err("query.search must be string or null".to_string());
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Ok(Some(trimmed.to_ascii_lowercase()))
}

fn parse_sort_by(
    v: Option<&serde_json::Value>,
    allowed: &[&str],
    default: &str,
) -> Result<String, String> {
    let Some(value) = v else {
        return Ok(default.to_string());
    };
    let Some(raw) = value.as_str() else {
        return Err("query.sortBy must be a string".to_string());
    };
    if allowed.iter().any(|a| *a == raw) {
        Ok(raw.to_string())
    } else {
        Err(format!("query.sortBy must be one of: {}", allowed.join(", ")))
    }
}

fn parse_sort_dir(v: Option<&serde_json::Value>) -> Result<String, String> {
    let Some(value) = v else {
        return Ok("asc".to_string());
    };
    let Some(raw) = value.as_str() else {
        return Err("query.sortDir must be a string".to_string());
    };
    if raw.eq_ignore_ascii_case("asc") {
        Ok("asc".to_string())
    } else if raw.eq_ignore_ascii_case("desc") {
        Ok("desc".to_string())
    } else {
        Err("query.sortDir must be one of: asc, desc".to_string())
    }
}

fn parse_page(v: Option<&serde_json::Value>) -> Result<usize, String> {
    let Some(value) = v else {
        return Ok(1);
    };
    let Some(page) = value.as_u64() else {
        return Err("query.page must be a positive integer".to_string());
    };
    if page == 0 {
        return Err("query.page must be >= 1".to_string());
    }
    Ok(page as usize)
}

fn parse_page_size(v: Option<&serde_json::Value>) -> Result<usize, String> {
    let Some(value) = v else {
        return Ok(50);
    };
    let Some(size) = value.as_u64() else {
        return Err("query.pageSize must be a positive integer".to_string());
    };
    if size == 0 || size > 500 {
        return Err("query.pageSize must be in range 1..=500".to_string());
    }
    Ok(size as usize)
}

fn parse_progress_query(req: &Request) -> Result<ProgressQuery, serde_json::Value> {
    let query = req
        .params
        .get("query")
        .and_then(|v| v.as_object())
        .cloned()
        .unwrap_or_default();

    let search = match parse_search(query.get("search")) {
        Ok(v) => v,
        Err(msg) => return Err(err(&req.id, "bad_params", msg, None)),
    };
    let sort_by = match parse_sort_by(
        query.get("sortBy"),
        &["sortOrder", "name", "average", "trend", "attendance"],
        "sortOrder",
    ) {
        Ok(v) => v,
        Err(msg) => return Err(err(&req.id, "bad_params", msg, None)),
    };
    let sort_dir = match parse_sort_dir(query.get("sortDir")) {
        Ok(v) => v,
        Err(msg) => return Err(err(&req.id, "bad_params", msg, None)),
    };
    let page = match parse_page(query.get("page")) {
        Ok(v) => v,
        Err(msg) => return Err(err(&req.id, "bad_params", msg, None)),
    };
    let page_size = match parse_page_size(query.get("pageSize")) {
        Ok(v) => v,
        Err(msg) => return Err(err(&req.id, "bad_params", msg, None)),
    };

    Ok(ProgressQuery {
        search,
        sort_by,
        sort_dir,
        page,
        page_size,
    })
}

struct ProgressRow {
    id: String,
    name: String,
    avatar: Option<String>,
    latest_score: Option<f64>,
    latest_assignment: Option<String>,
    average: Option<f64>,
    trend: f64,
    direction: TrendDirection,
    attendance: f64,
}

fn progress_rows(students: &[StudentRow]) -> Vec<ProgressRow> {
    students
        .iter()
        .map(|s| {
            let sorted = aggregate::sorted_recent_first(&s.grades);
            let latest = sorted.first();
            let trend = aggregate::student_trend(&s.grades);
            ProgressRow {
                id: s.id.clone(),
                name: s.name.clone(),
                avatar: s.avatar.clone(),
                latest_score: latest.map(|g| g.score),
                latest_assignment: latest.map(|g| g.assignment.clone()),
                average: aggregate::student_average(&s.grades),
                trend,
                direction: TrendDirection::from_delta(trend),
                attendance: s.attendance,
            }
        })
        .collect()
}

fn cmp_optional(a: Option<f64>, b: Option<f64>) -> Ordering {
    // Missing averages sort after every real value, regardless of direction.
    match (a, b) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn sort_rows(rows: &mut [ProgressRow], sort_by: &str, sort_dir: &str) {
    let desc = sort_dir == "desc";
    rows.sort_by(|a, b| {
        let ordering = match sort_by {
            "name" => a.name.to_ascii_lowercase().cmp(&b.name.to_ascii_lowercase()),
            "average" => cmp_optional(a.average, b.average),
            "trend" => a.trend.partial_cmp(&b.trend).unwrap_or(Ordering::Equal),
            "attendance" => a
                .attendance
                .partial_cmp(&b.attendance)
                .unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        };
        if desc {
            ordering.reverse()
        } else {
            ordering
        }
    });
}

fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Vec<T> {
    let start = (page.saturating_sub(1)) * page_size;
    if start >= items.len() {
        return Vec::new();
    }
    items
        .into_iter()
        .skip(start)
        .take(page_size)
        .collect()
}

fn handle_student_progress(state: &mut AppState, req: &Request) -> serde_json::Value {
    let query = match parse_progress_query(req) {
        Ok(q) => q,
        Err(resp) => return resp,
    };

    let students = load_all_students(state);
    let mut rows = progress_rows(&students);

    if let Some(search) = &query.search {
        rows.retain(|r| r.name.to_ascii_lowercase().contains(search));
    }
    let total = rows.len();
    sort_rows(&mut rows, &query.sort_by, &query.sort_dir);
    let page = paginate(rows, query.page, query.page_size);

    let out: Vec<serde_json::Value> = page
        .iter()
        .map(|r| {
            json!({
                "id": r.id,
                "name": r.name,
                "avatar": r.avatar,
                "latestScore": r.latest_score,
                "latestAssignment": r.latest_assignment,
                "average": r.average,
                "trend": r.trend,
                "direction": r.direction.as_str(),
                "attendance": r.attendance
            })
        })
        .collect();

    ok(
        &req.id,
        json!({
            "rows": out,
            "total": total,
            "page": query.page,
            "pageSize": query.page_size
        }),
    )
}

fn load_all_students(state: &AppState) -> Vec<StudentRow> {
    match state.db.as_ref() {
        Some(conn) => helpers::load_students(conn, None).unwrap_or_else(|e| {
            warn!(error = %e, "students read failed; serving empty roster");
            Vec::new()
        }),
        None => Vec::new(),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "analytics.gradeDistribution" => Some(handle_grade_distribution(state, req)),
        "analytics.classAverages" => Some(handle_class_averages(state, req)),
        "analytics.correlation" => Some(handle_correlation(state, req)),
        "analytics.studentProgress" => Some(handle_student_progress(state, req)),
        _ => None,
    }
}
