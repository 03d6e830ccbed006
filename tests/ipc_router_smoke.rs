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

fn read_line(reader: &mut BufReader<ChildStdout>) -> serde_json::Value {
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response");
    serde_json::from_str(line.trim()).expect("parse response json")
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

    let value = read_line(reader);
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    if value.get("ok").and_then(|v| v.as_bool()) == Some(false) {
        let code = value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        assert_ne!(
            code, "not_implemented",
            "unexpected unknown method for {}",
            method
        );
    }
    value
}

fn error_code(v: &serde_json::Value) -> Option<&str> {
    v.get("error")
        .and_then(|e| e.get("code"))
        .and_then(|c| c.as_str())
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["ok"], json!(true));
    assert_eq!(health["result"]["storage"], json!("memory"));
    assert_eq!(health["result"]["collections"].as_array().map(Vec::len), Some(14));

    let login = request(
        &mut stdin,
        &mut reader,
        "2",
        "session.login",
        json!({ "email": "admin@rising-stars.edu", "password": "admin123" }),
    );
    assert_eq!(login["ok"], json!(true));
    assert!(login["result"]["user"].get("password").is_none());

    let reads = [
        "students.list",
        "teachers.list",
        "staff.list",
        "attendance.list",
        "assignments.list",
        "facilities.list",
        "messages.list",
        "contacts.list",
        "notifications.list",
        "students.pending.list",
        "reports.list",
        "users.list",
        "profile.get",
        "session.get",
    ];
    for (i, method) in reads.iter().enumerate() {
        let id = format!("r{}", i);
        let resp = request(&mut stdin, &mut reader, &id, method, json!({}));
        assert_eq!(resp["ok"], json!(true), "{} failed: {}", method, resp);
    }

    let export = request(
        &mut stdin,
        &mut reader,
        "3",
        "facilities.export",
        json!({ "format": "csv" }),
    );
    assert_eq!(export["result"]["rows"], json!(3));
    assert_eq!(
        export["result"]["content"]
            .as_str()
            .map(|c| c.lines().count()),
        Some(4)
    );

    let _ = child.kill();
}

#[test]
fn unknown_methods_and_bad_lines_get_error_envelopes() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush");
    let bad = read_line(&mut reader);
    assert_eq!(bad["ok"], json!(false));
    assert_eq!(error_code(&bad), Some("bad_json"));

    writeln!(stdin, "{}", json!({ "id": "u1", "method": "grades.compute", "params": {} }))
        .expect("write unknown");
    stdin.flush().expect("flush");
    let unknown = read_line(&mut reader);
    assert_eq!(unknown["id"], json!("u1"));
    assert_eq!(error_code(&unknown), Some("not_implemented"));

    let anon = request(&mut stdin, &mut reader, "u2", "students.list", json!({}));
    assert_eq!(error_code(&anon), Some("unauthenticated"));

    let _ = child.kill();
}
