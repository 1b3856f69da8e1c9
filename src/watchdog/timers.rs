//! Timer tasks bound to one worker lifetime.
//!
//! Both timers report back through the actor's signal channel, tagged with the
//! generation they were armed for. They end when the worker's lifetime token
//! is cancelled; a signal already in flight is discarded by the actor as stale.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::core::Signal;

/// One-shot zero-output grace timer.
pub(crate) fn spawn_grace(
    generation: u64,
    grace: Duration,
    token: CancellationToken,
    signals: mpsc::Sender<Signal>,
) {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = time::sleep(grace) => {
                let _ = signals.send(Signal::GraceElapsed { generation }).await;
            }
        }
    });
}

/// Fixed-period stall ticker. The first tick fires one full period after arming.
pub(crate) fn spawn_stall_ticker(
    generation: u64,
    period: Duration,
    token: CancellationToken,
    signals: mpsc::Sender<Signal>,
) {
    tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    if signals.send(Signal::StallTick { generation }).await.is_err() {
                        break;
                    }
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn grace_fires_once_with_generation() {
        let (tx, mut rx) = mpsc::channel(4);
        spawn_grace(7, Duration::from_secs(30), CancellationToken::new(), tx);

        time::advance(Duration::from_secs(31)).await;
        match rx.recv().await {
            Some(Signal::GraceElapsed { generation }) => assert_eq!(generation, 7),
            other => panic!("unexpected signal: {other:?}"),
        }
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_grace_never_fires() {
        let (tx, mut rx) = mpsc::channel(4);
        let token = CancellationToken::new();
        spawn_grace(1, Duration::from_secs(5), token.clone(), tx);
        token.cancel();

        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stall_ticker_repeats_until_cancelled() {
        let (tx, mut rx) = mpsc::channel(4);
        let token = CancellationToken::new();
        spawn_stall_ticker(3, Duration::from_secs(10), token.clone(), tx);

        for _ in 0..2 {
            match rx.recv().await {
                Some(Signal::StallTick { generation }) => assert_eq!(generation, 3),
                other => panic!("unexpected signal: {other:?}"),
            }
        }
        token.cancel();
        while rx.recv().await.is_some() {}
    }
}
