//! Event filtering and queue admission.
use crate::{
    configuration::{Target, TargetType},
    event::Event,
    instance::QueueItem,
    Logger,
};

/// Whether `event` satisfies the trigger condition of `target`.
///
/// Keyboard targets require the key code to match; `key_alt` and `key_shift` must match exactly
/// when they are set and are ignored otherwise. Mouse events are filtered by the listener
/// category alone, so all of them pass.
pub(crate) fn accepts(target: &Target, event: &Event) -> bool {
    match target.kind {
        TargetType::Keyboard => {
            let key_matches = match (target.key, event.key_code()) {
                (Some(expected), Some(actual)) => u64::from(expected) == actual,
                _ => false,
            };
            key_matches
                && target.key_alt.map_or(true, |alt| alt == event.alt_key())
                && target.key_shift.map_or(true, |shift| shift == event.shift_key())
        }
        _ => true,
    }
}

impl Logger {
    /// Queue `event` for `target` if it passes the filter and the queue is not locked. Returns
    /// whether the event was queued.
    pub(crate) fn process_bound_event(&self, event: &Event, target: &Target) -> bool {
        if !accepts(target, event) {
            return false;
        }

        let admitted = self.instance.enqueue(QueueItem {
            instance: self.instance.id(),
            target: target.clone(),
            event: event.clone(),
        });
        if admitted {
            log::trace!(target: "frontlog",
                        instance = usize::from(self.instance.id()),
                        target_name:display = target.name;
                        "queued event");
        }
        admitted
    }
}
