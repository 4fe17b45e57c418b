//! Real child-process tests for the invoker and backend.
//!
//! Unix only: they rely on `sh`, `echo`, `cat`, and `sleep`.
#![cfg(unix)]

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use backend_gateway::backend::{
    Backend, BackendCommand, CommandResolver, InvocationPool, ProcessInvoker, PromptRunner,
    ResolverConfig, SystemInvoker, EMPTY_RESPONSE_PLACEHOLDER,
};
use backend_gateway::warmup::{WarmupConfig, WarmupSupervisor};
use backend_gateway::GatewayError;

fn sh(script: &str, stdin: &str) -> BackendCommand {
    BackendCommand::new("sh", ["-c", script], stdin)
}

fn process_alive(pid: i32) -> bool {
    // Signal 0 only checks that the pid exists
    unsafe { libc::kill(pid, 0) == 0 }
}

/// Like [`process_alive`], but a killed process waiting to be reaped by init
/// counts as gone.
fn process_running(pid: i32) -> bool {
    if !process_alive(pid) {
        return false;
    }
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        // The state field follows the parenthesized command name
        Ok(stat) => stat
            .rsplit_once(')')
            .map(|(_, rest)| rest.trim_start().chars().next() != Some('Z'))
            .unwrap_or(true),
        Err(_) => process_alive(pid),
    }
}

fn read_pid(path: &Path) -> i32 {
    std::fs::read_to_string(path)
        .unwrap()
        .trim()
        .parse()
        .unwrap()
}

#[tokio::test]
async fn trailing_whitespace_is_trimmed() {
    let text = SystemInvoker
        .invoke(&sh("printf 'hello  \\n\\n'", ""), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(text, "hello");
}

#[tokio::test]
async fn empty_stdout_yields_placeholder() {
    let text = SystemInvoker
        .invoke(&sh("true", ""), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(text, EMPTY_RESPONSE_PLACEHOLDER);
}

#[tokio::test]
async fn nonzero_exit_reports_code_and_stderr() {
    let err = SystemInvoker
        .invoke(&sh("echo 'model not loaded' >&2; exit 7", ""), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        GatewayError::BackendFailure {
            exit_code: Some(7),
            message: "model not loaded".to_string(),
        }
    );
}

#[tokio::test]
async fn child_that_ignores_stdin_still_succeeds() {
    let big_prompt = "x".repeat(256 * 1024);
    let text = SystemInvoker
        .invoke(&sh("echo done", &big_prompt), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(text, "done");
}

#[tokio::test]
async fn working_directory_is_applied() {
    let dir = tempfile::tempdir().unwrap();
    let cmd = sh("pwd", "").in_dir(dir.path());
    let text = SystemInvoker
        .invoke(&cmd, Duration::from_secs(5))
        .await
        .unwrap();
    let expected = dir.path().canonicalize().unwrap();
    assert_eq!(Path::new(&text).canonicalize().unwrap(), expected);
}

#[tokio::test]
async fn timeout_kills_the_child() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("pid");
    let script = format!("echo $$ > '{}'; exec sleep 30", pid_file.display());

    let started = Instant::now();
    let err = SystemInvoker
        .invoke(&sh(&script, ""), Duration::from_secs(1))
        .await
        .unwrap_err();

    assert_eq!(err, GatewayError::Timeout(Duration::from_secs(1)));
    assert!(started.elapsed() < Duration::from_secs(10));

    let pid = read_pid(&pid_file);
    assert!(!process_alive(pid), "backend pid {pid} outlived its timeout");
}

#[tokio::test]
async fn timeout_kills_processes_the_child_started() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("gpid");
    let script = format!("sleep 30 & echo $! > '{}'; wait", pid_file.display());

    let err = SystemInvoker
        .invoke(&sh(&script, ""), Duration::from_secs(1))
        .await
        .unwrap_err();
    assert_eq!(err, GatewayError::Timeout(Duration::from_secs(1)));

    let grandchild = read_pid(&pid_file);
    let deadline = Instant::now() + Duration::from_secs(5);
    while process_running(grandchild) && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(
        !process_running(grandchild),
        "grandchild pid {grandchild} outlived the timeout"
    );
}

#[tokio::test]
async fn exited_child_with_lingering_grandchild_times_out_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("gpid");
    // The grandchild inherits stdout, so the pipe stays open after sh exits
    let script = format!("sleep 30 & echo $! > '{}'; echo partial", pid_file.display());

    let started = Instant::now();
    let err = SystemInvoker
        .invoke(&sh(&script, ""), Duration::from_secs(1))
        .await
        .unwrap_err();
    assert_eq!(err, GatewayError::Timeout(Duration::from_secs(1)));
    assert!(started.elapsed() < Duration::from_secs(10));

    let grandchild = read_pid(&pid_file);
    let deadline = Instant::now() + Duration::from_secs(5);
    while process_running(grandchild) && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(!process_running(grandchild));
}

#[tokio::test]
async fn echo_override_scenario() {
    let resolver = CommandResolver::new(ResolverConfig {
        override_cmd: Some("echo".to_string()),
        ..ResolverConfig::default()
    });
    let command = resolver.resolve("hi").unwrap();
    assert_eq!(command.argv(), vec!["echo", "hi"]);

    let result = SystemInvoker
        .run(&command, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(result.exit_code, Some(0));
    assert_eq!(result.stdout, "hi\n");
    assert_eq!(result.into_response().unwrap(), "hi");
}

#[tokio::test]
async fn script_entry_point_receives_prompt() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("app.sh"),
        "read line\necho \"arg=$1 stdin=$line\"\n",
    )
    .unwrap();

    let backend = Backend::new(
        CommandResolver::new(ResolverConfig {
            root: dir.path().to_path_buf(),
            script: "app.sh".to_string(),
            interpreter: "sh".to_string(),
            ..ResolverConfig::default()
        }),
        InvocationPool::unbounded(),
    );

    let text = backend.run("hello", Duration::from_secs(5)).await.unwrap();
    assert_eq!(text, "arg=hello stdin=hello");
}

#[tokio::test]
async fn saturated_pool_times_out_instead_of_queueing() {
    let backend = Arc::new(Backend::new(
        CommandResolver::new(ResolverConfig {
            override_cmd: Some("sh -c 'sleep 2'".to_string()),
            ..ResolverConfig::default()
        }),
        InvocationPool::new(1),
    ));

    let first = {
        let backend = backend.clone();
        tokio::spawn(async move { backend.run("a", Duration::from_secs(10)).await })
    };
    while backend.pool().available() != Some(0) {
        tokio::task::yield_now().await;
    }

    let started = Instant::now();
    let err = backend
        .run("b", Duration::from_millis(200))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Timeout(_)));
    assert!(started.elapsed() < Duration::from_secs(2));

    assert!(first.await.unwrap().is_ok());
}

#[tokio::test]
async fn warmup_runs_bootstrap_prompt_through_real_backend() {
    let backend: Arc<dyn PromptRunner> = Arc::new(Backend::new(
        CommandResolver::new(ResolverConfig {
            override_cmd: Some("echo".to_string()),
            ..ResolverConfig::default()
        }),
        InvocationPool::unbounded(),
    ));
    let supervisor = Arc::new(WarmupSupervisor::new(
        backend,
        WarmupConfig {
            bootstrap_prompt: "ping".to_string(),
            timeout: Duration::from_secs(5),
        },
    ));

    supervisor.spawn().await.unwrap();
    let snapshot = supervisor.snapshot();
    assert!(snapshot.ready);
    assert!(snapshot.allow_send);
}
