//! Phase timers.
//!
//! There is no cancellation: a timer always fires and delivers its command
//! through the session queue, where an epoch mismatch turns it into a no-op.
//! Timers hold only a weak sender, so a pending timer never keeps a finished
//! session alive.

use derive_new::new;
use tokio::sync::mpsc::WeakSender;
use tracing::{Instrument, debug, debug_span};

use crate::Pin;
use crate::actor::SessionCommand;
use crate::session::{Phase, PhaseTimer, RoundEndReason};

/// Schedules phase callbacks for one session.
#[derive(Debug, Clone, new)]
pub(crate) struct TimerScheduler {
    pin: Pin,
    commands: WeakSender<SessionCommand>,
}

impl TimerScheduler {
    /// Arms `timer`. An elapsed round becomes an end-round message; other
    /// phases report their window as elapsed.
    pub(crate) fn schedule(&self, timer: PhaseTimer) {
        let command = command_for(timer);
        let commands = self.commands.clone();
        let span = debug_span!("phase_timer", pin = %self.pin, epoch = timer.epoch, phase = %timer.phase);
        debug!(pin = %self.pin, epoch = timer.epoch, phase = %timer.phase, after_ms = timer.after.as_millis() as u64, "Scheduling phase timer");

        tokio::spawn(
            async move {
                tokio::time::sleep(timer.after).await;
                let Some(commands) = commands.upgrade() else {
                    debug!("Session gone before timer fired");
                    return;
                };
                if commands.send(command).await.is_err() {
                    debug!("Session stopped before timer was delivered");
                }
            }
            .instrument(span),
        );
    }
}

/// Command a timer delivers when it fires.
pub(crate) fn command_for(timer: PhaseTimer) -> SessionCommand {
    match timer.phase {
        Phase::Round => SessionCommand::EndRound {
            epoch: timer.epoch,
            reason: RoundEndReason::Deadline,
        },
        phase => SessionCommand::WindowElapsed {
            epoch: timer.epoch,
            phase,
        },
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn round_timers_end_the_round() {
        let timer = PhaseTimer {
            epoch: 4,
            phase: Phase::Round,
            after: Duration::from_secs(60),
        };
        assert!(matches!(
            command_for(timer),
            SessionCommand::EndRound {
                epoch: 4,
                reason: RoundEndReason::Deadline
            }
        ));
    }

    #[test]
    fn window_timers_report_their_phase() {
        let timer = PhaseTimer {
            epoch: 2,
            phase: Phase::Post,
            after: Duration::from_secs(5),
        };
        assert!(matches!(
            command_for(timer),
            SessionCommand::WindowElapsed {
                epoch: 2,
                phase: Phase::Post
            }
        ));
    }
}
