//! Attaching listeners to targets: the initial pass, delayed retries, and lazy binding of gated
//! targets when their gate fires.
use std::sync::Arc;

use crate::{
    configuration::{Target, TargetType},
    event::Event,
    host::{Listener, ListenerContext},
    Logger,
};

impl Logger {
    /// Bind every target that is not bound yet and not gated by another target's dependency
    /// list.
    pub(crate) fn bind_events(self: &Arc<Self>) {
        let configuration = self.instance.configuration();
        let gated = configuration.gated_names();

        for (index, target) in configuration.targets.iter().enumerate() {
            if target.bound {
                continue;
            }
            if gated.contains(target.name.as_str()) {
                self.instance.message(format!(
                    "skip target \"{}\" because of dependency",
                    target.name
                ));
                continue;
            }

            match &target.kind {
                TargetType::Mouse | TargetType::Keyboard => self.bind_target(index, 0),
                TargetType::Other(kind) => self.instance.message(format!(
                    "target type \"{}\" in target \"{}\" is not defined",
                    kind, target.name
                )),
            }
        }
    }

    /// Attach the listener of the target at `index`.
    ///
    /// A delayed target whose selector matches nothing is retried after the binding delay.
    /// `attempt` counts the retries that led to this call.
    pub(crate) fn bind_target(self: &Arc<Self>, index: usize, attempt: u32) {
        let Some(target) = self.instance.target(index) else {
            return;
        };
        if target.bound {
            self.finish_retries(index, attempt);
            return;
        }

        if target.delayed && self.document.count(&target.selector) == 0 {
            self.schedule_retry(&target, index, attempt);
            return;
        }
        self.finish_retries(index, attempt);

        if !self.document.supports_category(&target.category) {
            self.instance.message(format!(
                "event category \"{}\" of target \"{}\" cannot be bound",
                target.category, target.name
            ));
            return;
        }

        // Flag first: a listener firing during attachment may try to bind the same target.
        if !self.instance.mark_bound(index) {
            return;
        }
        self.document
            .attach_listener(&target.selector, &target.category, self.listener(&target));
        self.instance
            .message(format!("bound event on target \"{}\"", target.name));
    }

    fn schedule_retry(self: &Arc<Self>, target: &Target, index: usize, attempt: u32) {
        let mut tasks = self.tasks();

        if tasks.stopped {
            return;
        }
        if attempt == 0 && tasks.bindings.contains_key(&index) {
            // A retry chain for this target is already waiting.
            return;
        }

        if matches!(self.settings.max_binding_retries, Some(max) if attempt >= max) {
            tasks.bindings.remove(&index);
            drop(tasks);
            self.instance.message(format!(
                "target \"{}\" did not become available after {} retries, giving up",
                target.name, attempt
            ));
            return;
        }

        let delay = self.settings.binding_delay;
        let this = Arc::clone(self);
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            this.bind_target(index, attempt + 1);
        });
        tasks.bindings.insert(index, handle.abort_handle());
        drop(tasks);

        self.instance.message(format!(
            "target \"{}\" is not available yet, try again in {}ms",
            target.name,
            delay.as_millis()
        ));
    }

    /// Forget the retry chain of a target that no longer needs one. A chain that is still
    /// sleeping is aborted; the chain that called us (`attempt > 0`) simply ends.
    fn finish_retries(&self, index: usize, attempt: u32) {
        if let Some(handle) = self.tasks().bindings.remove(&index) {
            if attempt == 0 {
                handle.abort();
            }
        }
    }

    fn listener(&self, target: &Target) -> Listener {
        let registry = self.registry.clone();
        let context = ListenerContext {
            instance: self.instance.id(),
            target: target.name.clone(),
        };

        Listener::new(context, move |context, event| {
            let Some(logger) = registry
                .upgrade()
                .and_then(|registry| registry.get(context.instance))
            else {
                return;
            };
            logger.handle_bound_event(&context.target, event);
        })
    }

    /// Body of every attached listener: bind the targets this one gates, then queue the event
    /// if the target collects information.
    pub(crate) fn handle_bound_event(self: &Arc<Self>, target_name: &str, event: &Event) {
        let Some(target) = self.instance.target_by_name(target_name) else {
            return;
        };

        for name in &target.targets {
            if let Some(index) = self.instance.find_unbound(name) {
                self.instance.message(format!(
                    "bind sub-events of target \"{}\"",
                    target.name
                ));
                self.bind_target(index, 0);
            }
        }

        if target.information_id().is_some() {
            self.process_bound_event(event, &target);
        }
    }
}
