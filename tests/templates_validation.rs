
use serde_json::json;
use test_support::{request_err, request_ok, spawn_sidecar, temp_dir};

fn template_count(
    stdin: &mut std::process::ChildStdin,
    reader: &mut std::io::BufReader<std::process::ChildStdout>,
    id: &str,
) -> usize {
    let listed = request_ok(stdin, reader, id, "templates.list", json!({}));
    listed
        .get("templates")
        .and_then(|v| v.as_array())
        .map(|a| a.len())
        .unwrap_or(0)
}

#[test]
fn create_and_update_reject_empty_fields() {
    let workspace = temp_dir("edudash-templates-validation");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    // Empty content fails no matter what the name is.
    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "templates.create",
        json!({ "name": "Has A Name", "content": "" }),
    );
    assert_eq!(code, "validation_error");

    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "templates.create",
        json!({ "name": "", "content": "Has content" }),
    );
    assert_eq!(code, "validation_error");

    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "templates.create",
        json!({ "name": "   ", "content": "Whitespace is not a name" }),
    );
    assert_eq!(code, "validation_error");

    let (code, _) = request_err(&mut stdin, &mut reader, "5", "templates.create", json!({}));
    assert_eq!(code, "validation_error");

    assert_eq!(template_count(&mut stdin, &mut reader, "6"), 0);

    // Same rules on update.
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "templates.create",
        json!({ "name": "Valid", "content": "Valid content" }),
    );
    let id = created
        .get("template")
        .and_then(|t| t.get("id"))
        .and_then(|v| v.as_i64())
        .expect("id");
    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "8",
        "templates.update",
        json!({ "id": id, "name": "Valid", "content": "" }),
    );
    assert_eq!(code, "validation_error");

    let listed = request_ok(&mut stdin, &mut reader, "9", "templates.list", json!({}));
    let content = listed
        .get("templates")
        .and_then(|v| v.as_array())
        .and_then(|a| a.first())
        .and_then(|t| t.get("content"))
        .and_then(|v| v.as_str())
        .expect("content");
    assert_eq!(content, "Valid content");
}

#[test]
fn missing_ids_fail_with_not_found_and_leave_collection_unchanged() {
    let workspace = temp_dir("edudash-templates-not-found");
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
        "templates.create",
        json!({ "name": "Only One", "content": "Still here" }),
    );

    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "templates.update",
        json!({ "id": 42, "name": "Ghost", "content": "Ghost content" }),
    );
    assert_eq!(code, "not_found");

    // Repeated deletes of the same missing id always fail the same way.
    for req_id in ["4", "5", "6"] {
        let (code, _) = request_err(
            &mut stdin,
            &mut reader,
            req_id,
            "templates.delete",
            json!({ "id": 42 }),
        );
        assert_eq!(code, "not_found");
    }

    assert_eq!(template_count(&mut stdin, &mut reader, "7"), 1);
}
