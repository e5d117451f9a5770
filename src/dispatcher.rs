//! Single-flight delivery loop.
//!
//! One task per logger drains the event queue. The next item is only taken once the previous
//! item's delivery has completed, so records reach the collector in admission order and never
//! overlap. An empty queue is polled again after the idle interval.
use std::sync::Arc;

use crate::{instance::QueueItem, Logger};

impl Logger {
    pub(crate) fn spawn_dispatcher(self: &Arc<Self>) {
        let handle = self.runtime.spawn(Arc::clone(self).process_queue());

        if let Some(previous) = self.tasks().dispatcher.replace(handle.abort_handle()) {
            previous.abort();
        }
    }

    async fn process_queue(self: Arc<Self>) {
        log::debug!(target: "frontlog", instance = usize::from(self.id()); "dispatcher started");
        loop {
            match self.instance.dequeue() {
                Some(item) => self.track_event(item).await,
                None => tokio::time::sleep(self.settings.idle_interval).await,
            }
        }
    }

    /// Collect and forward one queued event. Completes when its delivery outcome has been
    /// handled.
    pub(crate) async fn track_event(&self, item: QueueItem) {
        let QueueItem { target, event, .. } = item;
        self.instance.message(format!(
            "begin processing triggered target \"{}\"",
            target.name
        ));

        let Some(profile) = target
            .information_id()
            .and_then(|id| self.instance.profile(id))
        else {
            self.instance.message(format!(
                "no information for logging the target \"{}\"",
                target.name
            ));
            return;
        };

        let record = self.collect_information(&target, &profile, &event);
        self.forward_information(&target, &profile, &event, record)
            .await;
    }
}
