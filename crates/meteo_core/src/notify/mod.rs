//! Path-keyed change notification.
//!
//! # Responsibility
//! - Register observers against resource paths.
//! - Fan a change announcement out to every observer whose path overlaps it.
//!
//! # Invariants
//! - A change at `P` reaches observers registered at `P` and below `P`, and
//!   observers registered above `P` with `notify_for_descendants = true`.
//! - Query parameters are ignored when keying observers.
//! - Callbacks run after the registry lock is released, so a callback may
//!   register or drop subscriptions.

use crate::path::ResourcePath;
use log::debug;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Callback invoked with the path that was announced.
pub type ChangeCallback = Arc<dyn Fn(&ResourcePath) + Send + Sync>;

/// Registry key: authority followed by path segments.
type PathKey = Vec<String>;

/// Stable identifier of one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(u64);

struct ObserverEntry {
    id: ObserverId,
    notify_for_descendants: bool,
    callback: ChangeCallback,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    observers: BTreeMap<PathKey, Vec<ObserverEntry>>,
}

/// Shared publish/subscribe hub keyed by path prefix.
///
/// Clones share one registry.
#[derive(Clone, Default)]
pub struct ChangeNotifier {
    registry: Arc<Mutex<Registry>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for changes overlapping `path`.
    ///
    /// The registration lives as long as the returned [`Subscription`].
    pub fn register<F>(
        &self,
        path: &ResourcePath,
        notify_for_descendants: bool,
        callback: F,
    ) -> Subscription
    where
        F: Fn(&ResourcePath) + Send + Sync + 'static,
    {
        let key = path_key(path);
        let mut registry = lock(&self.registry);
        registry.next_id += 1;
        let id = ObserverId(registry.next_id);
        registry
            .observers
            .entry(key.clone())
            .or_default()
            .push(ObserverEntry {
                id,
                notify_for_descendants,
                callback: Arc::new(callback),
            });

        Subscription {
            id,
            key,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Announces that data under `path` may have changed.
    ///
    /// Returns the number of observers invoked.
    pub fn notify_change(&self, path: &ResourcePath) -> usize {
        let key = path_key(path);
        let callbacks = {
            let registry = lock(&self.registry);
            let mut callbacks: Vec<ChangeCallback> = Vec::new();

            // Strict ancestors, only when they asked for descendants.
            for depth in 1..key.len() {
                if let Some(entries) = registry.observers.get(&key[..depth]) {
                    callbacks.extend(
                        entries
                            .iter()
                            .filter(|entry| entry.notify_for_descendants)
                            .map(|entry| Arc::clone(&entry.callback)),
                    );
                }
            }

            // The path itself and everything below it.
            for (_, entries) in registry
                .observers
                .range(key.clone()..)
                .take_while(|(candidate, _)| candidate.starts_with(&key))
            {
                callbacks.extend(entries.iter().map(|entry| Arc::clone(&entry.callback)));
            }
            callbacks
        };

        debug!(
            "event=change_notify module=notify status=ok observers={}",
            callbacks.len()
        );
        for callback in &callbacks {
            callback(path);
        }
        callbacks.len()
    }

    /// Number of live registrations.
    pub fn observer_count(&self) -> usize {
        lock(&self.registry)
            .observers
            .values()
            .map(Vec::len)
            .sum()
    }
}

/// Live registration; unregisters on drop.
pub struct Subscription {
    id: ObserverId,
    key: PathKey,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Unregisters immediately.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut registry = lock(&registry);
        if let Some(entries) = registry.observers.get_mut(&self.key) {
            entries.retain(|entry| entry.id != self.id);
            if entries.is_empty() {
                registry.observers.remove(&self.key);
            }
        }
    }
}

fn path_key(path: &ResourcePath) -> PathKey {
    std::iter::once(path.authority().to_string())
        .chain(path.segments().iter().cloned())
        .collect()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::ChangeNotifier;
    use crate::path::ResourcePath;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn path(text: &str) -> ResourcePath {
        ResourcePath::parse(text).unwrap()
    }

    fn counter(notifier: &ChangeNotifier, at: &str, descendants: bool) -> (Arc<AtomicUsize>, super::Subscription) {
        let hits = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&hits);
        let subscription = notifier.register(&path(at), descendants, move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        });
        (hits, subscription)
    }

    #[test]
    fn sibling_paths_sharing_a_text_prefix_are_not_descendants() {
        let notifier = ChangeNotifier::new();
        let (hits, _sub) = counter(&notifier, "content://a/weather2", true);

        notifier.notify_change(&path("content://a/weather"));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn callback_may_drop_subscriptions_while_notified() {
        let notifier = ChangeNotifier::new();
        let inner = notifier.clone();
        let _sub = notifier.register(&path("content://a/weather"), true, move |_| {
            let nested = inner.register(&path("content://a/location"), false, |_| {});
            drop(nested);
        });

        assert_eq!(notifier.notify_change(&path("content://a/weather")), 1);
        assert_eq!(notifier.observer_count(), 1);
    }
}
