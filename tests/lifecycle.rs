#![cfg(unix)]

mod common;

use std::time::Duration;

use common::*;
use rigvisor::{
    EventKind, OutputStream, RestartPolicy, RestartReason, StartOutcome, Supervisor,
    SupervisorError, WorkerSpec, WorkerState,
};

#[tokio::test]
async fn start_then_stop() {
    let sup = Supervisor::builder(test_config()).build();
    let mut rx = sup.subscribe();

    let outcome = sup.start(sh("exec sleep 30")).await.unwrap();
    let StartOutcome::Spawned { pid: Some(pid) } = outcome else {
        panic!("unexpected outcome: {outcome:?}");
    };
    wait_for(&mut rx, started(1)).await;

    let status = sup.status().await.unwrap();
    assert_eq!(status.state, WorkerState::Running);
    assert_eq!(status.pid, Some(pid));

    assert_eq!(
        sup.start(sh("exec sleep 30")).await.unwrap(),
        StartOutcome::AlreadyActive
    );

    sup.stop().await.unwrap();
    let stopped = wait_for(&mut rx, |e| e.kind == EventKind::WorkerStopped).await;
    assert_eq!(stopped.pid, Some(pid));
    assert_eq!(sup.status().await.unwrap().state, WorkerState::Stopped);
    assert!(process_gone(pid));

    sup.shutdown().await.unwrap();
}

#[tokio::test(flavor = "current_thread")]
async fn stop_while_starting_leaves_no_process() {
    let sup = Supervisor::builder(test_config()).build();

    let (started, stopped) = tokio::join!(sup.start(sh("exec sleep 30")), sup.stop());
    stopped.unwrap();
    let StartOutcome::Spawned { pid: Some(pid) } = started.unwrap() else {
        panic!("worker was not spawned");
    };

    let status = sup.status().await.unwrap();
    assert_eq!(status.state, WorkerState::Stopped);
    assert_eq!(status.pid, None);
    assert!(process_gone(pid));

    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn hashrate_record_is_reported_with_share_tag() {
    let sup = Supervisor::builder(test_config()).build();
    let mut rx = sup.subscribe();

    sup.start(sh("printf '12.34 Mh/s  [A1234]\\r\\n'; exec sleep 30"))
        .await
        .unwrap();

    let events = collect_until(&mut rx, |e| e.kind == EventKind::HashrateUpdated).await;
    let sample = events.last().unwrap();
    assert_eq!(sample.hashrate.as_deref(), Some("12.34 Mh/s [A1234]"));
    assert_eq!(sample.rate_mhs, Some(12.34));
    assert!(events.iter().any(|e| e.kind == EventKind::LogLine
        && e.stream == Some(OutputStream::Stderr)
        && e.line.as_deref() == Some("12.34 Mh/s  [A1234]")));

    let status = sup.status().await.unwrap();
    assert_eq!(status.last_hashrate.unwrap().to_string(), "12.34 Mh/s [A1234]");

    let rest = drain_for(&mut rx, Duration::from_millis(200)).await;
    assert_eq!(count(&events, EventKind::ErrorDetected), 0);
    assert_eq!(count(&rest, EventKind::ErrorDetected), 0);

    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn stdout_lines_are_forwarded() {
    let sup = Supervisor::builder(test_config()).build();
    let mut rx = sup.subscribe();

    sup.start(sh("echo 'connecting to pool'; echo; exec sleep 30"))
        .await
        .unwrap();

    let line = wait_for(&mut rx, |e| {
        e.kind == EventKind::LogLine && e.stream == Some(OutputStream::Stdout)
    })
    .await;
    assert_eq!(line.line.as_deref(), Some("connecting to pool"));

    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn worker_error_restarts_once() {
    let sup = Supervisor::builder(test_config()).build();
    let mut rx = sup.subscribe();

    let first = sup
        .start(sh(
            "printf '12.34 Mh/s\\r\\nError: connection refused\\r\\n'; exec sleep 30",
        ))
        .await
        .unwrap();

    let events = collect_until(&mut rx, started(2)).await;
    assert_eq!(count(&events, EventKind::ErrorDetected), 1);
    assert_eq!(count(&events, EventKind::RestartRequested), 1);
    assert_eq!(count(&events, EventKind::RestartScheduled), 1);

    let requested = events
        .iter()
        .find(|e| e.kind == EventKind::RestartRequested)
        .unwrap();
    assert_eq!(requested.restart, Some(RestartReason::WorkerError));
    assert_eq!(requested.generation, Some(1));

    let second = events.last().unwrap().pid;
    let StartOutcome::Spawned { pid: first } = first else {
        panic!("worker was not spawned");
    };
    assert_ne!(first, second);

    sup.set_auto_restart(false).await.unwrap();
    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn disabled_auto_restart_only_stops() {
    let cfg = rigvisor::Config {
        restart: RestartPolicy::Manual,
        ..test_config()
    };
    let sup = Supervisor::builder(cfg).build();
    let mut rx = sup.subscribe();

    sup.start(sh("printf 'Error: out of memory\\r\\n'; exec sleep 30"))
        .await
        .unwrap();

    let events = collect_until(&mut rx, |e| e.kind == EventKind::RestartSuppressed).await;
    assert_eq!(count(&events, EventKind::WorkerStopped), 1);
    assert_eq!(
        events.last().unwrap().restart,
        Some(RestartReason::WorkerError)
    );

    let later = drain_for(&mut rx, Duration::from_millis(300)).await;
    assert_eq!(count(&later, EventKind::WorkerStarting), 0);

    let status = sup.status().await.unwrap();
    assert_eq!(status.state, WorkerState::Stopped);
    assert!(!status.restart_pending);

    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn sustained_zero_hashrate_triggers_one_restart() {
    let cfg = rigvisor::Config {
        restart: RestartPolicy::Manual,
        max_zero_samples: 2,
        zero_output_grace: Duration::ZERO,
        ..test_config()
    };
    let sup = Supervisor::builder(cfg).build();
    let mut rx = sup.subscribe();

    sup.start(sh(
        "for i in 1 2 3 4 5 6; do printf '0.00 Mh/s\\r\\n'; sleep 0.05; done; exec sleep 30",
    ))
    .await
    .unwrap();

    let events = collect_until(&mut rx, |e| e.kind == EventKind::RestartSuppressed).await;
    let requests: Vec<_> = events
        .iter()
        .filter(|e| e.kind == EventKind::RestartRequested)
        .collect();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].restart,
        Some(RestartReason::SustainedZeroHashrate)
    );
    assert_eq!(count(&events, EventKind::HashrateUpdated), 3);
    let errors: Vec<_> = events
        .iter()
        .filter(|e| e.kind == EventKind::ErrorDetected)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].reason.as_deref(), Some("sustained zero hashrate"));

    let later = drain_for(&mut rx, Duration::from_millis(300)).await;
    assert_eq!(count(&later, EventKind::RestartRequested), 0);

    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn silent_worker_is_detected_as_stalled() {
    let cfg = rigvisor::Config {
        restart: RestartPolicy::Manual,
        stall_interval: Duration::from_millis(200),
        ..test_config()
    };
    let sup = Supervisor::builder(cfg).build();
    let mut rx = sup.subscribe();

    sup.start(sh("exec sleep 30")).await.unwrap();

    let events = collect_until(&mut rx, |e| e.kind == EventKind::RestartSuppressed).await;
    let error = events
        .iter()
        .find(|e| e.kind == EventKind::ErrorDetected)
        .unwrap();
    assert_eq!(error.reason.as_deref(), Some("no output activity"));
    assert_eq!(
        events.last().unwrap().restart,
        Some(RestartReason::NoOutputActivity)
    );

    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn immediately_exiting_worker_is_started_once() {
    let sup = Supervisor::builder(test_config()).build();
    let mut rx = sup.subscribe();

    sup.start(sh("echo 'bad arguments' >&2; exit 1")).await.unwrap();

    wait_for(&mut rx, |e| e.kind == EventKind::WorkerStopped).await;
    let later = drain_for(&mut rx, Duration::from_millis(500)).await;
    assert_eq!(count(&later, EventKind::WorkerStarting), 0);
    assert_eq!(count(&later, EventKind::RestartRequested), 0);

    let status = sup.status().await.unwrap();
    assert_eq!(status.state, WorkerState::Stopped);
    assert_eq!(status.generation, 1);
    assert!(!status.restart_pending);

    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn unexpected_exit_is_restarted_when_enabled() {
    let cfg = rigvisor::Config {
        restart_on_exit: true,
        ..test_config()
    };
    let sup = Supervisor::builder(cfg).build();
    let mut rx = sup.subscribe();

    sup.start(sh("sleep 0.1; exit 3")).await.unwrap();

    let events = collect_until(&mut rx, |e| {
        e.kind == EventKind::WorkerStarting && e.generation == Some(2)
    })
    .await;
    let stopped = events
        .iter()
        .find(|e| e.kind == EventKind::WorkerStopped)
        .unwrap();
    assert_eq!(stopped.generation, Some(1));
    let requested = events
        .iter()
        .find(|e| e.kind == EventKind::RestartRequested)
        .unwrap();
    assert_eq!(requested.restart, Some(RestartReason::UnexpectedExit));

    sup.stop().await.unwrap();
    sup.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_never_overlap_workers() {
    let sup = Supervisor::builder(test_config()).build();
    let mut rx = sup.subscribe();

    let callers: Vec<_> = (0..3)
        .map(|i| {
            let sup = sup.clone();
            tokio::spawn(async move {
                for round in 0..5 {
                    match (i + round) % 3 {
                        0 => {
                            sup.start(sh("exec sleep 30")).await.unwrap();
                        }
                        1 => sup.restart().await.unwrap(),
                        _ => sup.stop().await.unwrap(),
                    }
                }
            })
        })
        .collect();
    for caller in callers {
        caller.await.unwrap();
    }

    let mut events = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        events.push(ev);
    }
    let pids: Vec<u32> = events
        .iter()
        .filter(|e| e.kind == EventKind::WorkerStarting)
        .filter_map(|e| e.pid)
        .collect();
    assert!(!pids.is_empty());
    let alive = pids.iter().filter(|pid| !process_gone(**pid)).count();
    assert!(alive <= 1, "{alive} workers alive at once");

    sup.stop().await.unwrap();
    events.extend(drain_for(&mut rx, Duration::from_millis(200)).await);

    let mut running: Option<u64> = None;
    for ev in &events {
        match ev.kind {
            EventKind::WorkerStarting => {
                assert_eq!(
                    running, None,
                    "generation {:?} started over a live one",
                    ev.generation
                );
                running = ev.generation;
            }
            EventKind::WorkerStopped => {
                assert_eq!(running.take(), ev.generation);
            }
            _ => {}
        }
    }
    assert_eq!(running, None);
    assert!(pids.iter().all(|pid| process_gone(*pid)));

    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn stop_cancels_pending_restart() {
    let cfg = rigvisor::Config {
        restart_cooldown: Duration::from_secs(30),
        ..test_config()
    };
    let sup = Supervisor::builder(cfg).build();
    let mut rx = sup.subscribe();

    sup.start(sh("exec sleep 30")).await.unwrap();
    wait_for(&mut rx, started(1)).await;

    sup.restart().await.unwrap();
    let status = sup.status().await.unwrap();
    assert_eq!(status.state, WorkerState::Stopped);
    assert!(status.restart_pending);

    sup.stop().await.unwrap();
    assert!(!sup.status().await.unwrap().restart_pending);

    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn spawn_failure_is_reported_and_not_retried() {
    let sup = Supervisor::builder(test_config()).build();
    let mut rx = sup.subscribe();

    let err = sup
        .start(WorkerSpec::new("/nonexistent/rigvisor-worker", Vec::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, SupervisorError::Spawn { .. }));

    wait_for(&mut rx, |e| e.kind == EventKind::SpawnFailed).await;
    let later = drain_for(&mut rx, Duration::from_millis(200)).await;
    assert_eq!(count(&later, EventKind::WorkerStarting), 0);
    assert_eq!(sup.status().await.unwrap().state, WorkerState::Stopped);

    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn calls_after_shutdown_fail_closed() {
    let sup = Supervisor::builder(test_config()).build();
    sup.shutdown().await.unwrap();

    let err = sup.status().await.unwrap_err();
    assert!(matches!(err, SupervisorError::Closed));
}
