use chrono::NaiveDate;
use serde::Serialize;

/// Roster rows as loaded from the workspace, in storage order.
#[derive(Debug, Clone)]
pub struct StudentRow {
    pub id: String,
    pub name: String,
    pub avatar: Option<String>,
    pub attendance: f64,
    pub participation: f64,
    pub grades: Vec<GradeRow>,
}

#[derive(Debug, Clone)]
pub struct GradeRow {
    pub assignment: String,
    pub score: f64,
    pub date: String,
}

/// Fixed letter bands in display order. Membership is decided by the lower
/// bound alone so the bands partition [0,100] exactly, fractional scores
/// included: a 100 is an A, a 0 is an F, nothing is dropped or counted twice.
pub const GRADE_BANDS: [(&str, &str, f64); 5] = [
    ("A", "A (90-100)", 90.0),
    ("B", "B (80-89)", 80.0),
    ("C", "C (70-79)", 70.0),
    ("D", "D (60-69)", 60.0),
    ("F", "F (<60)", 0.0),
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BandCount {
    pub band: &'static str,
    pub label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeDistribution {
    pub bands: Vec<BandCount>,
    pub total: usize,
}

fn band_index(score: f64) -> usize {
    GRADE_BANDS
        .iter()
        .position(|(_, _, lower)| score >= *lower)
        .unwrap_or(GRADE_BANDS.len() - 1)
}

pub fn grade_distribution(scores: &[f64]) -> GradeDistribution {
    let mut counts = [0usize; GRADE_BANDS.len()];
    for score in scores {
        counts[band_index(*score)] += 1;
    }
    let bands = GRADE_BANDS
        .iter()
        .zip(counts.iter())
        .map(|(&(band, label, _), &count)| BandCount { band, label, count })
        .collect();
    GradeDistribution {
        bands,
        total: scores.len(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Attendance,
    Participation,
}

impl Metric {
    pub fn parse(raw: &str) -> Option<Metric> {
        if raw.eq_ignore_ascii_case("attendance") {
            Some(Metric::Attendance)
        } else if raw.eq_ignore_ascii_case("participation") {
            Some(Metric::Participation)
        } else {
            None
        }
    }

    fn value_of(self, student: &StudentRow) -> f64 {
        match self {
            Metric::Attendance => student.attendance,
            Metric::Participation => student.participation,
        }
    }
}

/// Mean of the selected metric across a class. An empty class has no
/// average; callers must treat `None` as "no data", not zero.
pub fn metric_average(students: &[StudentRow], metric: Metric) -> Option<f64> {
    if students.is_empty() {
        return None;
    }
    let sum: f64 = students.iter().map(|s| metric.value_of(s)).sum();
    Some(sum / students.len() as f64)
}

/// Mean score across one student's grades; `None` when the student has
/// no grades at all.
pub fn student_average(grades: &[GradeRow]) -> Option<f64> {
    if grades.is_empty() {
        return None;
    }
    let sum: f64 = grades.iter().map(|g| g.score).sum();
    Some(sum / grades.len() as f64)
}

fn grade_date(grade: &GradeRow) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(grade.date.trim(), "%Y-%m-%d").ok()
}

/// Grades ordered most recent first. The sort is stable, so grades sharing
/// a date (or carrying an unparseable one, which sorts oldest) keep their
/// storage order.
pub fn sorted_recent_first(grades: &[GradeRow]) -> Vec<&GradeRow> {
    let mut sorted: Vec<&GradeRow> = grades.iter().collect();
    sorted.sort_by(|a, b| grade_date(b).cmp(&grade_date(a)));
    sorted
}

/// Signed delta between the two most recent scores; 0 when fewer than two
/// grades exist. "No change" and "no data" look the same here on purpose;
/// callers that care check the grade count.
pub fn student_trend(grades: &[GradeRow]) -> f64 {
    let sorted = sorted_recent_first(grades);
    match (sorted.first(), sorted.get(1)) {
        (Some(latest), Some(previous)) => latest.score - previous.score,
        _ => 0.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

impl TrendDirection {
    pub fn from_delta(delta: f64) -> TrendDirection {
        if delta > 0.0 {
            TrendDirection::Up
        } else if delta < 0.0 {
            TrendDirection::Down
        } else {
            TrendDirection::Flat
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TrendDirection::Up => "up",
            TrendDirection::Down => "down",
            TrendDirection::Flat => "flat",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationPoint {
    pub name: String,
    pub attendance: f64,
    pub grades: f64,
    pub participation: f64,
}

/// One scatter point per student with at least one grade. Students without
/// grades have no average and are excluded rather than plotted at 0.
pub fn correlation_points(students: &[StudentRow]) -> Vec<CorrelationPoint> {
    students
        .iter()
        .filter_map(|s| {
            let average = student_average(&s.grades)?;
            Some(CorrelationPoint {
                name: s.name.clone(),
                attendance: s.attendance,
                grades: average,
                participation: s.participation,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyDelta {
    pub difference: f64,
    pub percent_change: Option<f64>,
}

/// Change between the two most recent monthly averages, in input order.
/// Fewer than two months means there is nothing to compare; a zero
/// previous average has no meaningful percent change.
pub fn monthly_delta(monthly: &[crate::snapshot::MonthlyAverage]) -> Option<MonthlyDelta> {
    let n = monthly.len();
    if n < 2 {
        return None;
    }
    let latest = &monthly[n - 1];
    let previous = &monthly[n - 2];
    let difference = latest.average - previous.average;
    let percent_change = if previous.average != 0.0 {
        Some(100.0 * difference / previous.average)
    } else {
        None
    };
    Some(MonthlyDelta {
        difference,
        percent_change,
    })
}

/// Highest single score recorded in a class; `None` when no grades exist.
pub fn max_score(students: &[StudentRow]) -> Option<f64> {
    students
        .iter()
        .flat_map(|s| s.grades.iter().map(|g| g.score))
        .fold(None, |acc: Option<f64>, score| match acc {
            Some(best) if best >= score => Some(best),
            _ => Some(score),
        })
}
