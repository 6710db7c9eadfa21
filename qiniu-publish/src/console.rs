//! Human-readable progress lines on stdout.

use qiniu_publish_core::contract::Reporter;
use qiniu_publish_core::report::{PhaseOutcome, PublishEvent, SkipReason};

/// Renders one event as a console line.
pub fn render(event: &PublishEvent) -> String {
    match event {
        PublishEvent::TaskStarted { bucket } => format!("Start bucket task [{bucket}]"),
        PublishEvent::TaskSucceeded { bucket } => format!("Bucket task [{bucket}] succeeded"),
        PublishEvent::TaskFailed { bucket } => format!("Bucket task [{bucket}] failed"),
        PublishEvent::Phase { phase, outcome } => match outcome {
            PhaseOutcome::Started => format!("{}...", phase.running_label()),
            PhaseOutcome::Succeeded { summary: None } => {
                format!("{} succeeded", phase.done_label())
            }
            PhaseOutcome::Succeeded {
                summary: Some(summary),
            } => format!("{} succeeded, {summary}", phase.done_label()),
            PhaseOutcome::Skipped {
                reason: SkipReason::NothingToDo,
            } => format!("{} skipped", phase.done_label()),
            PhaseOutcome::Skipped {
                reason: SkipReason::DisabledByCaller,
            } => format!("{} skipped by command", phase.done_label()),
            PhaseOutcome::Failed { label, detail } => format!("{label}: {detail}"),
        },
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn on_event(&self, event: &PublishEvent) {
        println!("{}", render(event));
    }
}
