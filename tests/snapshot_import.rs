
use serde_json::json;
use test_support::{
    request_err, request_ok, sample_snapshot, spawn_sidecar, temp_dir, write_snapshot,
};

#[test]
fn import_loads_counts_and_reimport_replaces_roster() {
    let workspace = temp_dir("edudash-snapshot-import");
    let snapshot_path = write_snapshot(&workspace, &sample_snapshot());
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let first = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "snapshot.import",
        json!({ "path": snapshot_path.to_string_lossy() }),
    );
    assert_eq!(first.get("classCount").and_then(|v| v.as_u64()), Some(2));
    assert_eq!(first.get("studentCount").and_then(|v| v.as_u64()), Some(5));
    assert_eq!(first.get("gradeCount").and_then(|v| v.as_u64()), Some(6));

    // A template created between imports must survive the replace.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "templates.create",
        json!({ "name": "Keep", "content": "Survives re-import" }),
    );

    let smaller = json!({
        "classes": [
            {
                "id": 9,
                "name": "History 303",
                "averageGrade": 77,
                "recentAssignments": [],
                "students": [
                    {
                        "id": 901,
                        "name": "Ava Novak",
                        "avatar": null,
                        "attendance": 88,
                        "participation": 72,
                        "grades": [
                            { "assignment": "Essay", "score": 77, "date": "2025-03-01" }
                        ]
                    }
                ]
            }
        ],
        "performance": { "monthly": [], "classComparison": [] }
    });
    let smaller_path = write_snapshot(&temp_dir("edudash-snapshot-import-2"), &smaller);
    let second = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "snapshot.import",
        json!({ "path": smaller_path.to_string_lossy() }),
    );
    assert_eq!(second.get("classCount").and_then(|v| v.as_u64()), Some(1));

    let classes = request_ok(&mut stdin, &mut reader, "5", "classes.list", json!({}));
    let rows = classes
        .get("classes")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].get("name").and_then(|v| v.as_str()),
        Some("History 303")
    );

    let templates = request_ok(&mut stdin, &mut reader, "6", "templates.list", json!({}));
    assert_eq!(
        templates
            .get("templates")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(1)
    );
}

#[test]
fn import_failures_leave_store_unchanged() {
    let workspace = temp_dir("edudash-snapshot-import-errors");
    let snapshot_path = write_snapshot(&workspace, &sample_snapshot());
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "snapshot.import",
        json!({ "path": snapshot_path.to_string_lossy() }),
    );
    assert_eq!(code, "no_workspace");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "snapshot.import",
        json!({ "path": snapshot_path.to_string_lossy() }),
    );

    let missing = workspace.join("does-not-exist.json");
    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "snapshot.import",
        json!({ "path": missing.to_string_lossy() }),
    );
    assert_eq!(code, "snapshot_read_failed");

    let garbled = workspace.join("garbled.json");
    std::fs::write(&garbled, b"{ not json").expect("write garbled file");
    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "snapshot.import",
        json!({ "path": garbled.to_string_lossy() }),
    );
    assert_eq!(code, "snapshot_parse_failed");

    // Both failures left the previous import intact.
    let classes = request_ok(&mut stdin, &mut reader, "6", "classes.list", json!({}));
    assert_eq!(
        classes.get("classes").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(2)
    );
}
