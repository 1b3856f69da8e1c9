#![allow(dead_code)]

use std::time::Duration;

use rigvisor::{Config, Event, EventKind, WorkerSpec};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::timeout;

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Fast cooldown, no stall detector, short stop timeout.
pub fn test_config() -> Config {
    Config {
        restart_cooldown: Duration::from_millis(50),
        stall_interval: Duration::ZERO,
        stop_timeout: Duration::from_secs(2),
        ..Config::default()
    }
}

/// `/bin/sh -c <script>`
pub fn sh(script: &str) -> WorkerSpec {
    WorkerSpec::new("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

/// Collects events up to and including the first one matching `pred`.
pub async fn collect_until(
    rx: &mut broadcast::Receiver<Event>,
    pred: impl Fn(&Event) -> bool,
) -> Vec<Event> {
    let fut = async {
        let mut seen = Vec::new();
        loop {
            match rx.recv().await {
                Ok(ev) => {
                    let done = pred(&ev);
                    seen.push(ev);
                    if done {
                        return seen;
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => panic!("bus closed"),
            }
        }
    };
    timeout(EVENT_TIMEOUT, fut)
        .await
        .expect("expected event not published in time")
}

/// Waits for the first event matching `pred`.
pub async fn wait_for(rx: &mut broadcast::Receiver<Event>, pred: impl Fn(&Event) -> bool) -> Event {
    collect_until(rx, pred)
        .await
        .pop()
        .expect("collect_until returns the matching event")
}

/// Events seen during `window`, without waiting for anything in particular.
pub async fn drain_for(rx: &mut broadcast::Receiver<Event>, window: Duration) -> Vec<Event> {
    let mut seen = Vec::new();
    let _ = timeout(window, async {
        while let Ok(ev) = rx.recv().await {
            seen.push(ev);
        }
    })
    .await;
    seen
}

pub fn count(events: &[Event], kind: EventKind) -> usize {
    events.iter().filter(|e| e.kind == kind).count()
}

pub fn started(generation: u64) -> impl Fn(&Event) -> bool {
    move |e| e.kind == EventKind::WorkerStarted && e.generation == Some(generation)
}

/// `true` once the OS no longer knows `pid` (Linux only; elsewhere assumed).
pub fn process_gone(pid: u32) -> bool {
    let proc_dir = std::path::Path::new("/proc");
    !proc_dir.exists() || !proc_dir.join(pid.to_string()).exists()
}
