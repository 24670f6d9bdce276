//! Console binary tests
//!
//! Drives the `nestkv` executable over pipes, the way a terminal user would.

#![cfg(unix)]

use std::io::{BufRead, BufReader, Write};
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

const SIGINT: i32 = 2;

#[test]
fn test_sigint_ends_console_while_stdin_is_open() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_nestkv"))
        .arg("--quiet")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    // Keep the write end open for the whole test so no EOF reaches the binary
    let mut stdin = child.stdin.take().unwrap();
    let mut stdout = BufReader::new(child.stdout.take().unwrap());

    stdin.write_all(b"SET a foo\nGET a\n").unwrap();
    stdin.flush().unwrap();

    let mut line = String::new();
    stdout.read_line(&mut line).unwrap();
    assert_eq!(line, "foo\n");

    let status = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let deadline = Instant::now() + Duration::from_secs(5);
    let exit = loop {
        if let Some(exit) = child.try_wait().unwrap() {
            break exit;
        }
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("console still running 5s after SIGINT");
        }
        sleep(Duration::from_millis(50));
    };

    assert_eq!(exit.signal(), Some(SIGINT));
    drop(stdin);
}

#[test]
fn test_console_exits_on_end() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_nestkv"))
        .arg("--quiet")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let mut stdin = child.stdin.take().unwrap();
    stdin
        .write_all(b"SET a foo\nBEGIN\nSET a bar\nGET a\nROLLBACK\nCOUNT foo\nEND\n")
        .unwrap();
    drop(stdin);

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "bar\n1\n");
}
