use std::{collections::VecDeque, sync::Mutex};

use chrono::Local;

use crate::{
    configuration::{Configuration, InformationProfile, Target},
    event::Event,
    registry::InstanceId,
};

/// One captured event waiting to be collected and forwarded.
#[derive(Debug, Clone)]
pub(crate) struct QueueItem {
    pub instance: InstanceId,
    pub target: Target,
    pub event: Event,
}

/// State of one logger session.
pub(crate) struct Instance {
    id: InstanceId,
    state: Mutex<InstanceState>,
}

struct InstanceState {
    configuration: Configuration,
    log: Vec<String>,
    debug: bool,
    event_queue: VecDeque<QueueItem>,
    event_queue_lock: bool,
}

impl Instance {
    pub fn new(id: InstanceId, configuration: Configuration) -> Instance {
        Instance {
            id,
            state: Mutex::new(InstanceState {
                configuration,
                log: Vec::new(),
                debug: false,
                event_queue: VecDeque::new(),
                event_queue_lock: false,
            }),
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    fn state(&self) -> std::sync::MutexGuard<'_, InstanceState> {
        self.state
            .lock()
            .expect("thread holding instance lock should not panic")
    }

    /// Append a line to the instance log and pass it on to the `log` facade.
    pub fn message(&self, message: impl std::fmt::Display) {
        let (line, debug) = {
            let mut state = self.state();
            let console = state.configuration.debug.console;

            let mut prefix = String::new();
            if console.date {
                prefix.push_str(&format!("[{}] ", datetime_string()));
            }
            if console.class {
                prefix.push_str(&format!("Logger [instance {}]", self.id));
            }

            let line = format!("{prefix} : {message}");
            state.log.push(line.clone());
            (line, state.debug)
        };

        let instance = usize::from(self.id);
        if debug {
            log::info!(target: "frontlog", instance; "{}", line);
        } else {
            log::trace!(target: "frontlog", instance; "{}", line);
        }
    }

    pub fn log(&self) -> Vec<String> {
        self.state().log.clone()
    }

    pub fn is_debug(&self) -> bool {
        self.state().debug
    }

    /// Switch debug output on and replay what was logged so far.
    pub fn enable_debug(&self) {
        let replay = {
            let mut state = self.state();
            if state.debug {
                return;
            }
            state.debug = true;
            state.log.clone()
        };

        let instance = usize::from(self.id);
        for line in replay {
            log::info!(target: "frontlog", instance; "{}", line);
        }
    }

    pub fn configuration(&self) -> Configuration {
        self.state().configuration.clone()
    }

    pub fn target(&self, index: usize) -> Option<Target> {
        self.state().configuration.targets.get(index).cloned()
    }

    pub fn target_by_name(&self, name: &str) -> Option<Target> {
        self.state().configuration.target(name).cloned()
    }

    pub fn profile(&self, id: &str) -> Option<InformationProfile> {
        self.state().configuration.profile(id).cloned()
    }

    pub fn receiver_for(&self, target: &Target) -> Option<String> {
        self.state()
            .configuration
            .receiver_for(target)
            .map(str::to_owned)
    }

    /// Index of the first unbound target called `name`.
    pub fn find_unbound(&self, name: &str) -> Option<usize> {
        self.state()
            .configuration
            .targets
            .iter()
            .position(|target| !target.bound && target.name == name)
    }

    /// Flip the `bound` flag of a target. Returns `false` if it was already bound.
    pub fn mark_bound(&self, index: usize) -> bool {
        let mut state = self.state();
        match state.configuration.targets.get_mut(index) {
            Some(target) if !target.bound => {
                target.bound = true;
                true
            }
            _ => false,
        }
    }

    /// Append to the queue unless it is locked. Returns whether the item was admitted.
    pub fn enqueue(&self, item: QueueItem) -> bool {
        let mut state = self.state();
        if state.event_queue_lock {
            return false;
        }
        state.event_queue.push_back(item);
        true
    }

    pub fn dequeue(&self) -> Option<QueueItem> {
        self.state().event_queue.pop_front()
    }

    pub fn queue_len(&self) -> usize {
        self.state().event_queue.len()
    }

    pub fn lock_queue(&self) {
        self.state().event_queue_lock = true;
    }

    pub fn is_queue_locked(&self) -> bool {
        self.state().event_queue_lock
    }
}

/// Local time as `YYYY-MM-DD HH:MM:SS`.
pub(crate) fn datetime_string() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
