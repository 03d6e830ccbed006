use pretty_assertions::assert_eq;
use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_schoold");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn schoold");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(value["ok"], json!(true), "{} failed: {}", method, value);
    value["result"].clone()
}

fn error_code(v: &serde_json::Value) -> String {
    v["error"]["code"].as_str().unwrap_or_default().to_string()
}

fn login(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>, email: &str, password: &str) {
    let _ = request(stdin, reader, "logout", "session.logout", json!({}));
    request_ok(
        stdin,
        reader,
        "login",
        "session.login",
        json!({ "email": email, "password": password }),
    );
}

fn categories(list: &serde_json::Value) -> Vec<String> {
    list["categories"]
        .as_array()
        .expect("categories")
        .iter()
        .map(|c| c["value"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[test]
fn admin_sees_every_book_with_its_source() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    login(&mut stdin, &mut reader, "admin@rising-stars.edu", "admin123");

    let all = request_ok(&mut stdin, &mut reader, "1", "reports.list", json!({}));
    assert_eq!(
        categories(&all),
        vec!["report-card", "class-report", "departmental-report"]
    );
    assert_eq!(all["categories"][0]["label"], json!("Report Cards"));
    assert_eq!(all["stats"], json!({ "total": 6, "ready": 5, "processing": 1 }));
    assert_eq!(all["records"][0]["source"], json!("Admin"));
    assert_eq!(all["records"][5]["source"], json!("Department Head"));
    assert_eq!(all["records"][5]["userType"], json!("staff"));
    assert_eq!(all["revisions"]["admin_report_cards"], json!(0));

    let processing = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "reports.list",
        json!({ "status": "Processing" }),
    );
    assert_eq!(processing["matched"], json!(1));
    assert_eq!(processing["records"][0]["title"], json!("Monthly Budget Report"));
    assert_eq!(processing["stats"]["total"], json!(6));

    let _ = child.kill();
}

#[test]
fn class_teacher_generates_class_reports_only() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    login(&mut stdin, &mut reader, "jane.wilson@teacher.rising-stars.edu", "teacher123");

    let mine = request_ok(&mut stdin, &mut reader, "1", "reports.list", json!({}));
    assert_eq!(categories(&mine), vec!["class-report"]);
    assert_eq!(mine["stats"], json!({ "total": 2, "ready": 2, "processing": 0 }));

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "reports.create",
        json!({
            "category": "class-report",
            "record": {
                "title": "Weekly Class Report",
                "description": "Generated weekly summary report",
                "type": "Weekly",
                "iconName": "FileBarChart",
            },
        }),
    );
    assert_eq!(created["record"]["status"], json!("Processing"));
    assert_eq!(created["category"], json!("class-report"));
    let id = created["record"]["id"].as_str().expect("report id").to_string();
    assert!(!created["record"]["date"].as_str().unwrap_or_default().is_empty());

    let ready = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "reports.setStatus",
        json!({ "category": "class-report", "id": id, "status": "ready" }),
    );
    assert_eq!(ready["record"]["status"], json!("Ready"));
    assert_eq!(ready["revision"], json!(2));

    let after = request_ok(&mut stdin, &mut reader, "4", "reports.list", json!({}));
    assert_eq!(after["stats"], json!({ "total": 3, "ready": 3, "processing": 0 }));

    let not_mine = request(
        &mut stdin,
        &mut reader,
        "5",
        "reports.create",
        json!({ "category": "report-card", "record": { "title": "Term 3 Cards" } }),
    );
    assert_eq!(error_code(&not_mine), "forbidden");

    let unknown = request(
        &mut stdin,
        &mut reader,
        "6",
        "reports.delete",
        json!({ "category": "weekly", "id": id }),
    );
    assert_eq!(error_code(&unknown), "bad_params");

    let _ = child.kill();
}

#[test]
fn department_head_flag_set_by_admin_opens_departmental_reports() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    login(&mut stdin, &mut reader, "sarah.jones@staff.rising-stars.edu", "staff123");
    let none = request_ok(&mut stdin, &mut reader, "1", "reports.list", json!({}));
    assert!(categories(&none).is_empty());
    assert_eq!(none["stats"]["total"], json!(0));
    let self_grant = request(
        &mut stdin,
        &mut reader,
        "2",
        "profile.update",
        json!({ "patch": { "isDepartmentHead": true } }),
    );
    assert_eq!(error_code(&self_grant), "forbidden");

    login(&mut stdin, &mut reader, "admin@rising-stars.edu", "admin123");
    let granted = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "profile.update",
        json!({ "userId": "5", "patch": { "isDepartmentHead": "true" } }),
    );
    assert_eq!(granted["permissions"]["isDepartmentHead"], json!(true));

    login(&mut stdin, &mut reader, "sarah.jones@staff.rising-stars.edu", "staff123");
    let dept = request_ok(&mut stdin, &mut reader, "4", "reports.list", json!({}));
    assert_eq!(categories(&dept), vec!["departmental-report"]);
    assert_eq!(dept["stats"], json!({ "total": 2, "ready": 1, "processing": 1 }));

    let removed = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "reports.delete",
        json!({ "category": "departmental-report", "id": "7" }),
    );
    assert_eq!(removed["deleted"], json!("7"));

    let _ = child.kill();
}
