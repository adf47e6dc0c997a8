//! Unsolicited updates of parameter values to the connected peer.

use crate::log::{debug, trace, warning};
use crate::params::ParameterStore;
use crate::platform::{BlobStorage, Notifier};
use crate::value::ParameterValue;
use alloc::vec::Vec;

/// When to push a parameter: at most every `minimum_period_ms`, and only after a numeric value
/// moved by at least `minimum_delta`. Strings and byte arrays are pushed on any change.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NotificationConfig {
    pub parameter_id: u32,
    pub minimum_period_ms: u32,
    pub minimum_delta: f32,
}

struct Sent {
    at_ms: u32,
    value: ParameterValue,
}

/// Tracks the last pushed value of every configured parameter.
pub struct NotificationMonitor {
    configs: &'static [NotificationConfig],
    sent: Vec<Option<Sent>>,
}

impl NotificationMonitor {
    pub fn new(configs: &'static [NotificationConfig]) -> Self {
        Self {
            configs,
            sent: configs.iter().map(|_| None).collect(),
        }
    }

    pub fn configs(&self) -> &'static [NotificationConfig] {
        self.configs
    }

    /// Forgets all pushed values, e.g. after the peer disconnected. The next poll pushes every
    /// configured parameter again.
    pub fn clear(&mut self) {
        self.sent.iter_mut().for_each(|sent| *sent = None);
    }

    /// Reads every configured parameter and pushes those that changed enough. Returns the number
    /// of pushed values.
    pub fn poll<S: BlobStorage>(
        &mut self,
        store: &mut ParameterStore<S>,
        now_ms: u32,
        notifier: &mut impl Notifier,
    ) -> usize {
        let mut pushed = 0;
        for (config, sent) in self.configs.iter().zip(self.sent.iter_mut()) {
            let value = match store.read(config.parameter_id) {
                Ok(value) => value,
                Err(e) => {
                    warning!("notify: can't read {}: {:?}", config.parameter_id, e);
                    continue;
                }
            };

            if let Some(sent) = sent {
                if now_ms.wrapping_sub(sent.at_ms) < config.minimum_period_ms {
                    continue;
                }
                if !changed(&sent.value, value, config.minimum_delta) {
                    continue;
                }
            }

            trace!("notify: pushing {}", config.parameter_id);
            match notifier.notify(&value.to_record()) {
                Ok(()) => {
                    *sent = Some(Sent {
                        at_ms: now_ms,
                        value: value.clone(),
                    });
                    pushed += 1;
                }
                Err(e) => debug!("notify: push of {} failed: {:?}", config.parameter_id, e),
            }
        }
        pushed
    }
}

fn changed(old: &ParameterValue, new: &ParameterValue, minimum_delta: f32) -> bool {
    match (old.payload.as_f64(), new.payload.as_f64()) {
        (Some(old), Some(new)) => {
            let delta = if new > old { new - old } else { old - new };
            delta >= minimum_delta as f64
        }
        _ => old.payload != new.payload,
    }
}
