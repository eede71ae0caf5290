use serde::Deserialize;

/// Read-only snapshot document: `{ "classes": [...], "performance": {...} }`.
/// Several dashboard views are fed from this file instead of the live store,
/// so the field names follow the document, not the database.
#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub classes: Vec<SnapshotClass>,
    #[serde(default)]
    pub performance: SnapshotPerformance,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotClass {
    pub id: serde_json::Value,
    pub name: String,
    pub average_grade: f64,
    #[serde(default)]
    pub recent_assignments: Vec<String>,
    #[serde(default)]
    pub students: Vec<SnapshotStudent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotStudent {
    pub id: serde_json::Value,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub grades: Vec<SnapshotGrade>,
    pub attendance: f64,
    pub participation: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotGrade {
    pub assignment: String,
    pub score: f64,
    pub date: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPerformance {
    #[serde(default)]
    pub monthly: Vec<MonthlyAverage>,
    #[serde(default)]
    pub class_comparison: Vec<ClassComparison>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonthlyAverage {
    pub month: String,
    pub average: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassComparison {
    #[serde(rename = "class")]
    pub class_name: String,
    pub this_month: f64,
    pub last_month: f64,
}

/// Document ids may be numbers or strings; the store keys rows by text.
pub fn id_as_string(raw: &serde_json::Value) -> Option<String> {
    match raw {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
