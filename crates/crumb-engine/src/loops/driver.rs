//! Repeats a loop's step until cancelled.

use std::sync::Arc;

use tokio::sync::watch;

use super::{EngineLoop, StepReport};
use crate::error::EngineResult;
use crate::events::{EngineEvent, EventBus};

/// Counters kept by the driver over a loop's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub steps: u64,
    pub successes: u64,
    pub failures: u64,
    pub enumeration_failures: u64,
}

impl LoopSummary {
    fn record(&mut self, report: &StepReport) {
        self.steps += 1;
        let successes = report.successes() as u64;
        self.successes += successes;
        self.failures += report.outcomes.len() as u64 - successes;
        if report.enumeration_failure.is_some() {
            self.enumeration_failures += 1;
        }
    }
}

/// Drive `engine_loop` until `cancel` turns true or a step fails.
///
/// Cancellation is checked between steps and while sleeping; a step already
/// in flight runs to completion.
pub async fn drive<L: EngineLoop>(
    mut engine_loop: L,
    mut cancel: watch::Receiver<bool>,
    events: Arc<EventBus>,
) -> EngineResult<LoopSummary> {
    let name = engine_loop.name();
    let mut summary = LoopSummary::default();
    events.emit(EngineEvent::LoopStarted {
        loop_name: name.to_string(),
    });
    tracing::debug!(loop_name = name, "loop started");

    loop {
        if *cancel.borrow() {
            break;
        }

        let report = match engine_loop.step().await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(loop_name = name, error = %e, "loop stopped");
                events.emit(EngineEvent::LoopStopped {
                    loop_name: name.to_string(),
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };
        summary.record(&report);

        match report.pause {
            Some(pause) if !pause.is_zero() => {
                tokio::select! {
                    changed = cancel.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(pause) => {}
                }
            }
            _ => tokio::task::yield_now().await,
        }
    }

    tracing::debug!(
        loop_name = name,
        steps = summary.steps,
        successes = summary.successes,
        failures = summary.failures,
        "loop cancelled"
    );
    events.emit(EngineEvent::LoopStopped {
        loop_name: name.to_string(),
        reason: "cancelled".to_string(),
    });
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::surface::ActionOutcome;
    use async_trait::async_trait;
    use std::time::Duration;

    struct Countdown {
        left: u32,
    }

    #[async_trait]
    impl EngineLoop for Countdown {
        fn name(&self) -> &'static str {
            "countdown"
        }

        async fn step(&mut self) -> EngineResult<StepReport> {
            if self.left == 0 {
                return Err(EngineError::SessionLost("tab closed".into()));
            }
            self.left -= 1;
            Ok(StepReport {
                outcomes: vec![ActionOutcome::Success, ActionOutcome::Stale],
                enumeration_failure: None,
                pause: Some(Duration::from_millis(1)),
            })
        }
    }

    struct Forever;

    #[async_trait]
    impl EngineLoop for Forever {
        fn name(&self) -> &'static str {
            "forever"
        }

        async fn step(&mut self) -> EngineResult<StepReport> {
            Ok(StepReport {
                pause: Some(Duration::from_secs(3600)),
                ..StepReport::default()
            })
        }
    }

    #[tokio::test]
    async fn test_drive_stops_on_session_loss() {
        let (_tx, rx) = watch::channel(false);
        let events = Arc::new(EventBus::default());
        let mut sub = events.subscribe();

        let err = drive(Countdown { left: 3 }, rx, events).await.unwrap_err();
        assert!(matches!(err, EngineError::SessionLost(_)));

        assert!(matches!(sub.try_recv().unwrap(), EngineEvent::LoopStarted { .. }));
        match sub.try_recv().unwrap() {
            EngineEvent::LoopStopped { loop_name, reason } => {
                assert_eq!(loop_name, "countdown");
                assert!(reason.contains("tab closed"));
            }
            other => panic!("wrong event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_interrupts_long_pause() {
        let (tx, rx) = watch::channel(false);
        let events = Arc::new(EventBus::default());
        let task = tokio::spawn(drive(Forever, rx, events));

        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(true).unwrap();

        let summary = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("driver ignored cancellation")
            .unwrap()
            .unwrap();
        assert_eq!(summary.steps, 1);
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = LoopSummary::default();
        summary.record(&StepReport {
            outcomes: vec![ActionOutcome::Success, ActionOutcome::TimedOut],
            enumeration_failure: Some(crate::error::SurfaceError::Stale),
            pause: None,
        });
        assert_eq!(summary.steps, 1);
        assert_eq!(summary.successes, 1);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.enumeration_failures, 1);
    }
}
