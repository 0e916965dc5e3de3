//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade as single pipe-separated lines.  A future MQTT or
//! webhook adapter would implement the same trait.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::recovery::RecoveryDecision;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { next_fire } => {
                info!("START | next_fire={}", next_fire);
            }
            AppEvent::FeedStarted {
                trigger,
                repetitions,
            } => {
                info!("FEED | start | trigger={:?} | repetitions={}", trigger, repetitions);
            }
            AppEvent::FeedCompleted {
                trigger,
                repetitions,
                total_count,
            } => {
                info!(
                    "FEED | done | trigger={:?} | repetitions={} | total={}",
                    trigger, repetitions, total_count
                );
            }
            AppEvent::FeedFailed {
                trigger,
                repetition,
                error: cause,
            } => {
                error!(
                    "FEED | failed | trigger={:?} | repetition={} | cause={}",
                    trigger, repetition, cause
                );
            }
            AppEvent::StateNotPersisted { error: cause } => {
                error!("FEED | state not persisted | cause={}", cause);
            }
            AppEvent::ScheduleRearmed { next_fire } => {
                info!("SCHED | next_fire={}", next_fire);
            }
            AppEvent::Recovery(decision) => match decision {
                RecoveryDecision::Recover { occurrence, delay } => info!(
                    "RECOVERY | feed | occurrence={} | late={}s",
                    occurrence,
                    delay.num_seconds()
                ),
                RecoveryDecision::Skip { occurrence, delay } => info!(
                    "RECOVERY | skip | occurrence={} | late={}s",
                    occurrence,
                    delay.num_seconds()
                ),
                RecoveryDecision::WindowElapsed { occurrence, delay } => warn!(
                    "RECOVERY | abandoned | occurrence={} | late={}s",
                    occurrence,
                    delay.num_seconds()
                ),
                other => info!("RECOVERY | {:?}", other),
            },
            AppEvent::Stopped { fires } => {
                info!("STOP | scheduled_fires={}", fires);
            }
        }
    }
}
