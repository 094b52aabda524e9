//! Stage runner integration tests: process-tree termination and output bounds

use jvmscope::config::types::{OutputIntegrity, StageOutcome};
use jvmscope::exec::runner::{StageCommand, StageRunner};
use jvmscope::kernel::process::is_alive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn runner(limit: usize) -> StageRunner {
    StageRunner::new(limit)
        .with_interrupt_flag(Arc::new(AtomicBool::new(false)))
        .with_term_grace(Duration::from_millis(100))
}

fn sh(script: &str, timeout: Duration) -> StageCommand {
    StageCommand::new(
        "it",
        vec!["/bin/sh".into(), "-c".into(), script.into()],
        std::env::temp_dir(),
        timeout,
    )
}

fn wait_dead(pid: u32) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while is_alive(pid) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }
    !is_alive(pid)
}

fn pidfile() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("jvmscope_pid_{}", uuid::Uuid::new_v4()))
}

fn read_pid(path: &std::path::Path) -> u32 {
    let pid = std::fs::read_to_string(path).unwrap().trim().parse().unwrap();
    std::fs::remove_file(path).unwrap();
    pid
}

#[test]
fn timeout_kills_grandchildren() {
    let path = pidfile();
    let script = format!("sleep 60 & echo $! > '{}'; wait", path.display());

    let outcome = runner(4096)
        .run(&sh(&script, Duration::from_millis(300)))
        .unwrap();
    assert!(matches!(outcome, StageOutcome::TimedOut { .. }));
    assert!(wait_dead(read_pid(&path)));
}

#[test]
fn background_descendant_is_swept_after_normal_exit() {
    let path = pidfile();
    // the descendant detaches its output so the stage can finish on its own
    let script = format!(
        "sleep 60 >/dev/null 2>&1 & echo $! > '{}'; echo done",
        path.display()
    );

    let outcome = runner(4096)
        .run(&sh(&script, Duration::from_secs(10)))
        .unwrap();
    assert!(outcome.succeeded());
    assert_eq!(outcome.output().map(str::trim), Some("done"));
    assert!(wait_dead(read_pid(&path)));
}

#[test]
fn output_beyond_the_cap_is_truncated_without_blocking() {
    let started = Instant::now();
    let outcome = runner(1024)
        .run(&sh(
            "head -c 1048576 /dev/zero | tr '\\0' 'a'; echo tail",
            Duration::from_secs(20),
        ))
        .unwrap();

    match outcome {
        StageOutcome::Completed {
            exit_code,
            output,
            integrity,
        } => {
            assert_eq!(exit_code, 0);
            assert_eq!(integrity, OutputIntegrity::TruncatedByLimit);
            assert!(output.len() <= 1024);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(started.elapsed() < Duration::from_secs(20));
}

#[test]
fn interrupt_during_wait_stops_the_stage() {
    let flag = Arc::new(AtomicBool::new(false));
    let runner = StageRunner::new(4096).with_interrupt_flag(Arc::clone(&flag));

    let raiser = {
        let flag = Arc::clone(&flag);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(200));
            flag.store(true, Ordering::SeqCst);
        })
    };

    let started = Instant::now();
    let result = runner.run(&sh("sleep 30", Duration::from_secs(30)));
    raiser.join().unwrap();

    assert!(matches!(
        result,
        Err(jvmscope::ScopeError::Interrupted(_))
    ));
    assert!(flag.load(Ordering::SeqCst));
    assert!(started.elapsed() < Duration::from_secs(10));
}
