
use serde_json::json;
use test_support::{request_ok, sample_snapshot, spawn_sidecar, temp_dir, write_snapshot};

fn band_counts(result: &serde_json::Value) -> Vec<(String, u64)> {
    result
        .get("bands")
        .and_then(|v| v.as_array())
        .expect("bands")
        .iter()
        .map(|b| {
            (
                b.get("band").and_then(|v| v.as_str()).expect("band").to_string(),
                b.get("count").and_then(|v| v.as_u64()).expect("count"),
            )
        })
        .collect()
}

#[test]
fn bands_partition_all_scores_in_fixed_order() {
    let workspace = temp_dir("edudash-distribution");
    let snapshot_path = write_snapshot(&workspace, &sample_snapshot());
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "snapshot.import",
        json!({ "path": snapshot_path.to_string_lossy() }),
    );

    let dist = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "analytics.gradeDistribution",
        json!({}),
    );
    let counts = band_counts(&dist);
    let order: Vec<&str> = counts.iter().map(|(band, _)| band.as_str()).collect();
    assert_eq!(order, vec!["A", "B", "C", "D", "F"]);

    // Sample scores: 70, 85, 95, 82, 65, 40.
    let by_band: Vec<u64> = counts.iter().map(|(_, c)| *c).collect();
    assert_eq!(by_band, vec![1, 2, 1, 1, 1]);

    let total = dist.get("total").and_then(|v| v.as_u64()).expect("total");
    assert_eq!(total, 6);
    assert_eq!(by_band.iter().sum::<u64>(), total);
}

#[test]
fn boundary_scores_land_in_their_band() {
    let workspace = temp_dir("edudash-distribution-boundaries");
    let snapshot = json!({
        "classes": [
            {
                "id": 1,
                "name": "Boundary",
                "averageGrade": 60,
                "recentAssignments": [],
                "students": [
                    {
                        "id": 11,
                        "name": "Edge Case",
                        "avatar": null,
                        "attendance": 100,
                        "participation": 100,
                        "grades": [
                            { "assignment": "q1", "score": 100, "date": "2025-01-01" },
                            { "assignment": "q2", "score": 90, "date": "2025-01-02" },
                            { "assignment": "q3", "score": 89, "date": "2025-01-03" },
                            { "assignment": "q4", "score": 60, "date": "2025-01-04" },
                            { "assignment": "q5", "score": 59, "date": "2025-01-05" },
                            { "assignment": "q6", "score": 0, "date": "2025-01-06" }
                        ]
                    }
                ]
            }
        ],
        "performance": { "monthly": [], "classComparison": [] }
    });
    let snapshot_path = write_snapshot(&workspace, &snapshot);
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "snapshot.import",
        json!({ "path": snapshot_path.to_string_lossy() }),
    );
    let dist = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "analytics.gradeDistribution",
        json!({}),
    );
    let by_band: Vec<u64> = band_counts(&dist).iter().map(|(_, c)| *c).collect();
    // 100 and 90 are A; 89 is B; 60 is D; 59 and 0 are F.
    assert_eq!(by_band, vec![2, 1, 0, 1, 2]);
    assert_eq!(dist.get("total").and_then(|v| v.as_u64()), Some(6));
}

#[test]
fn empty_store_yields_all_zero_counts() {
    let workspace = temp_dir("edudash-distribution-empty");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    // No workspace at all still answers with zeros, not an error.
    let dist = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "analytics.gradeDistribution",
        json!({}),
    );
    assert_eq!(dist.get("total").and_then(|v| v.as_u64()), Some(0));
    assert!(band_counts(&dist).iter().all(|(_, c)| *c == 0));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let dist = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "analytics.gradeDistribution",
        json!({}),
    );
    assert_eq!(dist.get("total").and_then(|v| v.as_u64()), Some(0));
    assert_eq!(band_counts(&dist).len(), 5);
}
