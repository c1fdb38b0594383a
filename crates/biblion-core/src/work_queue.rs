//! Lock-free work queue for distributing population jobs across workers

use std::sync::atomic::{AtomicUsize, Ordering};

/// Lock-free queue handing out items together with their position.
///
/// Workers call [`claim()`](WorkQueue::claim) until it returns `None`; the
/// position lets results be stored back in submission order.
pub struct WorkQueue<S> {
    items: Vec<S>,
    cursor: AtomicUsize,
}

impl<S> WorkQueue<S> {
    pub fn new(items: Vec<S>) -> Self {
        log::debug!("{} items in work queue", items.len());
        Self {
            items,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Claim the next item (lock-free)
    pub fn claim(&self) -> Option<(usize, &S)> {
        let i = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.items.get(i).map(|item| (i, item))
    }

    /// Total items in queue
    pub fn total(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_in_order() {
        let q = WorkQueue::new(vec!["a", "b"]);
        assert_eq!(q.total(), 2);
        assert_eq!(q.claim(), Some((0, &"a")));
        assert_eq!(q.claim(), Some((1, &"b")));
        assert_eq!(q.claim(), None);
        assert_eq!(q.claim(), None);
    }

    #[test]
    fn concurrent_claims_are_disjoint() {
        let q = WorkQueue::new((0..100).collect::<Vec<_>>());
        let claimed = std::sync::Mutex::new(Vec::new());
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    while let Some((i, _)) = q.claim() {
                        claimed.lock().unwrap().push(i);
                    }
                });
            }
        });
        let mut all = claimed.into_inner().unwrap();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn empty_queue() {
        let q: WorkQueue<i32> = WorkQueue::new(vec![]);
        assert_eq!(q.total(), 0);
        assert_eq!(q.claim(), None);
    }
}
