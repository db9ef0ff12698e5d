#![cfg(unix)]

use nudgectl::{CommandLauncher, ViewerLauncher};
use std::path::Path;
use std::time::{Duration, Instant};

fn shell(script: &str) -> CommandLauncher {
    // The image path lands in $1 and is ignored
    CommandLauncher::new(
        "sh",
        vec!["-c".to_string(), script.to_string(), "viewer".to_string()],
    )
}

#[test]
fn long_running_viewer_is_terminated_promptly() {
    let process = shell("sleep 30").launch(Path::new("/tmp/frame.png")).unwrap();

    let started = Instant::now();
    process.terminate().unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn viewer_ignoring_sigterm_is_killed_after_grace() {
    let process = shell("trap '' TERM; while :; do sleep 1; done")
        .launch(Path::new("/tmp/frame.png"))
        .unwrap();
    std::thread::sleep(Duration::from_millis(100));

    let started = Instant::now();
    process.terminate().unwrap();
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(400));
    assert!(elapsed < Duration::from_secs(5));
}

#[test]
fn already_exited_viewer_is_a_no_op() {
    let process = shell("exit 0").launch(Path::new("/tmp/frame.png")).unwrap();
    std::thread::sleep(Duration::from_millis(300));
    assert!(process.terminate().is_ok());
}
