use std::sync::{Mutex, MutexGuard};

use asteroid_core::types::{Entry, State};

/// Append-only entry log shared by all nodes of one execution.
///
/// Each `append` takes the lock once, so a batch lands contiguously even when
/// several branches finish at the same time.
#[derive(Debug, Default)]
pub struct StateLog {
    entries: Mutex<Vec<Entry>>,
}

impl StateLog {
    pub fn new(initial: Vec<Entry>) -> Self {
        Self {
            entries: Mutex::new(initial),
        }
    }

    /// Append a batch to the tail, preserving its order.
    pub fn append(&self, batch: Vec<Entry>) {
        if batch.is_empty() {
            return;
        }
        self.lock().extend(batch);
    }

    /// Most recently appended entry matching `predicate`.
    pub fn find<P>(&self, predicate: P) -> Option<Entry>
    where
        P: Fn(&Entry) -> bool,
    {
        self.lock().iter().rev().find(|e| predicate(e)).cloned()
    }

    /// All entries matching `predicate`, in log order.
    pub fn filter<P>(&self, predicate: P) -> Vec<Entry>
    where
        P: Fn(&Entry) -> bool,
    {
        self.lock().iter().filter(|e| predicate(e)).cloned().collect()
    }

    /// Read-consistent copy of the log as of now.
    pub fn snapshot(&self) -> State {
        State::new(self.lock().clone())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave a half-written batch behind
    // (`extend` on a Vec of owned entries), so the data stays usable.
    fn lock(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use asteroid_core::types::attr;

    #[test]
    fn test_append_preserves_call_order() {
        let log = StateLog::new(vec![Entry::new("seed")]);
        log.append(vec![Entry::new("a"), Entry::new("b")]);
        log.append(vec![Entry::new("c")]);

        let contents: Vec<_> = log
            .snapshot()
            .entries()
            .iter()
            .map(|e| e.content().to_string())
            .collect();
        assert_eq!(contents, vec!["seed", "a", "b", "c"]);
    }

    #[test]
    fn test_find_and_filter() {
        let log = StateLog::default();
        log.append(vec![
            Entry::new("s1").with_flag(attr::IS_SOLUTION),
            Entry::new("p").with_flag(attr::IS_PROBLEM),
            Entry::new("s2").with_flag(attr::IS_SOLUTION),
        ]);

        let last = log.find(|e| e.has_flag(attr::IS_SOLUTION)).unwrap();
        assert_eq!(last.content(), "s2");
        assert_eq!(log.filter(|e| e.has_flag(attr::IS_SOLUTION)).len(), 2);
        assert!(log.find(|e| e.has_flag(attr::IS_EVALUATION)).is_none());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let log = StateLog::default();
        log.append(vec![Entry::new("one")]);
        let snapshot = log.snapshot();
        log.append(vec![Entry::new("two")]);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_empty_append_is_noop() {
        let log = StateLog::default();
        log.append(vec![]);
        assert!(log.is_empty());
    }

    #[test]
    fn test_concurrent_batches_stay_contiguous() {
        let log = Arc::new(StateLog::default());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let log = log.clone();
                std::thread::spawn(move || {
                    for round in 0..50 {
                        let batch = (0..4)
                            .map(|i| Entry::new(format!("{}-{}-{}", t, round, i)))
                            .collect();
                        log.append(batch);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), 8 * 50 * 4);
        for chunk in snapshot.entries().chunks(4) {
            let prefix: Vec<_> = chunk
                .iter()
                .map(|e| e.content().rsplit_once('-').unwrap().0.to_string())
                .collect();
            assert!(prefix.iter().all(|p| p == &prefix[0]), "interleaved batch: {:?}", prefix);
            let idx: Vec<_> = chunk
                .iter()
                .map(|e| e.content().rsplit_once('-').unwrap().1.to_string())
                .collect();
            assert_eq!(idx, vec!["0", "1", "2", "3"]);
        }
    }
}
