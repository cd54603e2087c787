//! Integration tests for the armistice binary.
//!
//! Spawns the driver, feeds it command lines on stdin, and checks the JSON
//! events it writes to stdout.

use std::io::{BufRead, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use serde_json::Value;

/// Sends `lines` to the driver and collects the JSON objects it prints.
fn run_engine(config: Option<&Path>, lines: &[&str]) -> Vec<Value> {
    let exe = env!("CARGO_BIN_EXE_armistice");
    let mut cmd = Command::new(exe);
    cmd.env_remove("ARMISTICE_CONFIG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    if let Some(path) = config {
        cmd.arg(path);
    }
    let mut child = cmd.spawn().expect("failed to start armistice");

    let mut stdin = child.stdin.take().unwrap();
    let stdout = child.stdout.take().unwrap();
    let reader = std::io::BufReader::new(stdout);

    for line in lines {
        writeln!(stdin, "{}", line).unwrap();
    }
    stdin.flush().unwrap();
    drop(stdin);

    let out: Vec<Value> = reader
        .lines()
        .map(|l| serde_json::from_str(&l.unwrap()).expect("stdout line is not JSON"))
        .collect();
    let status = child.wait().expect("failed to wait on child");
    assert!(status.success());
    out
}

fn events(out: &[Value]) -> Vec<&str> {
    out.iter().filter_map(|v| v["event"].as_str()).collect()
}

#[test]
fn new_game_and_join() {
    let out = run_engine(None, &["g1 alice newgame", "g1 bob join", "quit"]);
    assert_eq!(events(&out), vec!["game_created", "joined", "joined"]);
    assert!(out.iter().all(|v| v["session"] == "g1"));
    assert_eq!(out[2]["player"], "bob");
}

#[test]
fn errors_are_reported_and_the_driver_carries_on() {
    let out = run_engine(
        None,
        &[
            "nowhere alice join",
            "g1",
            "",
            "g1 alice newgame",
            "g1 alice ready",
            "g1 alice board",
        ],
    );
    assert_eq!(out.len(), 6);
    assert_eq!(out[0]["error"], "There is no game called 'nowhere'");
    assert!(out[1]["error"].as_str().unwrap().contains("<session>"));
    assert!(out[1]["session"].is_null());
    assert_eq!(out[4]["error"], "You can't use this command right now");
    assert_eq!(out[5]["event"], "snapshot");
    assert_eq!(out[5]["phase"], "new");
}

#[test]
fn quit_stops_reading() {
    let out = run_engine(None, &["g1 alice newgame", "quit", "g1 bob join"]);
    assert_eq!(events(&out), vec!["game_created", "joined"]);
}

#[test]
fn unreadable_input_is_logged_and_ends_the_driver() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_armistice"))
        .env_remove("ARMISTICE_CONFIG")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start armistice");
    let mut stdin = child.stdin.take().unwrap();
    stdin.write_all(b"g1 alice newgame\n\xff\xfe\ng1 bob join\n").unwrap();
    drop(stdin);

    let output = child.wait_with_output().expect("failed to wait on child");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let out: Vec<Value> = stdout.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(events(&out), vec!["game_created", "joined"]);
    assert!(String::from_utf8_lossy(&output.stderr).contains("reading stdin"));
}

#[test]
fn order_prompts_walk_through_fields() {
    let out = run_engine(
        None,
        &[
            "g alice newgame",
            "g bob join",
            "g alice start",
            // Only the player whose turn it is gets through; the rest are
            // refused, whatever the order.
            "g alice nation England",
            "g bob nation France",
            "g alice nation England",
            "g alice year 1901",
            "g alice new",
            "g alice move",
            "g alice Lon",
        ],
    );
    let prompts: Vec<&Value> = out.iter().filter(|v| v["event"] == "order_prompt").collect();
    assert_eq!(prompts.len(), 3);
    assert_eq!(prompts[0]["field"], "Kind");
    assert_eq!(prompts[1]["field"], "Terr");
    assert_eq!(prompts[2]["field"], "Targ");
    assert_eq!(prompts[2]["prompt"], "Where to?");
}

#[cfg(unix)]
#[test]
fn movement_is_adjudicated_by_the_configured_solver() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("armistice.json");
    let store = dir.path().join("sessions");
    let settings = serde_json::json!({
        "solver": {
            "program": "sh",
            "args": ["-c", "cat > /dev/null; echo"],
            "timeout_ms": 5000
        },
        "store_dir": store,
    });
    std::fs::write(&config, settings.to_string()).unwrap();

    let out = run_engine(
        Some(&config),
        &[
            "g alice newgame",
            "g bob join",
            "g alice start",
            "g alice nation random",
            "g bob nation random",
            "g alice nation random",
            "g alice year 1901",
            "g alice ready",
            "g bob ready",
        ],
    );
    let names = events(&out);
    assert!(names.contains(&"nations_assigned"));
    assert!(names.contains(&"resolved"));
    let last = out.last().unwrap();
    assert_eq!(last["event"], "awaiting_orders");
    assert_eq!(last["date"]["season"], "Autumn");
    assert!(store.join("g.json").exists());
}
