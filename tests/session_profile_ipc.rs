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

#[test]
fn login_distinguishes_bad_credentials_from_restricted_accounts() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let bad = request(
        &mut stdin,
        &mut reader,
        "1",
        "session.login",
        json!({ "email": "admin@rising-stars.edu", "password": "wrong" }),
    );
    assert_eq!(bad["error"]["code"], json!("invalid_credentials"));
    assert_eq!(bad["error"]["message"], json!("Invalid email or password"));

    let admin = request(
        &mut stdin,
        &mut reader,
        "2",
        "session.login",
        json!({ "email": "admin@rising-stars.edu", "password": "admin123" }),
    );
    assert_eq!(admin["ok"], json!(true));

    let suspended = request(
        &mut stdin,
        &mut reader,
        "3",
        "users.setStatus",
        json!({ "id": "1", "status": "suspended" }),
    );
    assert_eq!(suspended["result"]["user"]["accountStatus"], json!("suspended"));

    let _ = request(&mut stdin, &mut reader, "4", "session.logout", json!({}));
    let restricted = request(
        &mut stdin,
        &mut reader,
        "5",
        "session.login",
        json!({ "email": "john.doe@pupil.rising-stars.edu", "password": "pupil123" }),
    );
    assert_eq!(restricted["error"]["code"], json!("account_restricted"));
    assert_eq!(
        restricted["error"]["details"]["accountStatus"],
        json!("suspended")
    );

    let session = request(&mut stdin, &mut reader, "6", "session.get", json!({}));
    assert_eq!(session["result"]["user"], json!(null));

    let _ = child.kill();
}

#[test]
fn teachers_cannot_grant_themselves_class_teacher_rights() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let login = request(
        &mut stdin,
        &mut reader,
        "1",
        "session.login",
        json!({ "email": "robert.brown@teacher.rising-stars.edu", "password": "teacher123" }),
    );
    assert_eq!(login["result"]["permissions"]["isClassTeacher"], json!(false));
    assert_eq!(login["result"]["permissions"]["studentWrite"], json!("denied"));
    assert_eq!(login["result"]["profileRevision"], json!(0));

    let promote = request(
        &mut stdin,
        &mut reader,
        "2",
        "profile.update",
        json!({
            "patch": { "isClassTeacher": "true", "classesTaught": ["P.6A", "P.7A", "P.7B"] },
            "expectedRevision": 0,
        }),
    );
    assert_eq!(promote["error"]["code"], json!("forbidden"));

    let mark = request(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.mark",
        json!({ "studentId": "SS001", "status": "present" }),
    );
    assert_eq!(mark["error"]["code"], json!("forbidden"));

    let bio = request(
        &mut stdin,
        &mut reader,
        "4",
        "profile.update",
        json!({
            "patch": { "bio": "Science lead", "isClassTeacher": false },
            "expectedRevision": 0,
        }),
    );
    assert_eq!(bio["ok"], json!(true), "{}", bio);
    assert_eq!(bio["result"]["revision"], json!(1));
    assert_eq!(bio["result"]["permissions"]["studentWrite"], json!("denied"));
    assert_eq!(bio["result"]["profile"]["bio"], json!("Science lead"));

    let stale = request(
        &mut stdin,
        &mut reader,
        "5",
        "profile.update",
        json!({ "patch": { "bio": "late edit" }, "expectedRevision": 0 }),
    );
    assert_eq!(stale["error"]["code"], json!("conflict"));
    assert_eq!(stale["error"]["details"]["revision"], json!(1));

    let peek = request(
        &mut stdin,
        &mut reader,
        "6",
        "profile.get",
        json!({ "userId": "3" }),
    );
    assert_eq!(peek["error"]["code"], json!("forbidden"));

    let users = request(&mut stdin, &mut reader, "7", "users.list", json!({}));
    assert_eq!(users["error"]["code"], json!("forbidden"));

    let _ = child.kill();
}

#[test]
fn admin_grants_class_teacher_rights_through_the_users_profile() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request(
        &mut stdin,
        &mut reader,
        "1",
        "session.login",
        json!({ "email": "admin@rising-stars.edu", "password": "admin123" }),
    );
    let granted = request(
        &mut stdin,
        &mut reader,
        "2",
        "profile.update",
        json!({
            "userId": "4",
            "patch": { "isClassTeacher": "true" },
            "expectedRevision": 0,
        }),
    );
    assert_eq!(granted["ok"], json!(true), "{}", granted);
    assert_eq!(granted["result"]["userId"], json!("4"));
    assert_eq!(granted["result"]["revision"], json!(1));
    assert_eq!(granted["result"]["permissions"]["studentWrite"], json!("queued"));

    let own = request(&mut stdin, &mut reader, "3", "profile.get", json!({}));
    assert_eq!(own["result"]["userId"], json!("9"));
    assert_eq!(own["result"]["permissions"]["studentWrite"], json!("direct"));

    let missing = request(
        &mut stdin,
        &mut reader,
        "4",
        "profile.update",
        json!({ "userId": "404", "patch": { "bio": "x" } }),
    );
    assert_eq!(missing["error"]["code"], json!("not_found"));

    let _ = request(&mut stdin, &mut reader, "5", "session.logout", json!({}));
    let robert = request(
        &mut stdin,
        &mut reader,
        "6",
        "session.login",
        json!({ "email": "robert.brown@teacher.rising-stars.edu", "password": "teacher123" }),
    );
    assert_eq!(robert["result"]["profileRevision"], json!(1));
    assert_eq!(robert["result"]["permissions"]["isClassTeacher"], json!(true));
    assert_eq!(robert["result"]["permissions"]["studentWrite"], json!("queued"));

    let queued = request(
        &mut stdin,
        &mut reader,
        "7",
        "students.delete",
        json!({ "id": "SS004" }),
    );
    assert_eq!(queued["result"]["queued"], json!(true));

    let _ = child.kill();
}
