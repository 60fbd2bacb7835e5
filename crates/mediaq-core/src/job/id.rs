//! Time-based job id generator.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use super::JobId;

/// Hands out ids from the wall clock in milliseconds. When two ids are
/// requested within the same millisecond (or the clock steps back) the
/// previous id plus one is used, so ids never repeat within a process.
#[derive(Debug, Default)]
pub struct JobIdGen {
    last: AtomicU64,
}

impl JobIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> JobId {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let mut current = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(current + 1);
            match self.last.compare_exchange_weak(
                current,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return JobId(candidate),
                Err(actual) => current = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn ids_strictly_increase() {
        let gen = JobIdGen::new();
        let mut prev = gen.next();
        for _ in 0..1000 {
            let id = gen.next();
            assert!(id > prev);
            prev = id;
        }
    }

    #[test]
    fn ids_unique_across_threads() {
        let gen = Arc::new(JobIdGen::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let gen = Arc::clone(&gen);
                std::thread::spawn(move || (0..500).map(|_| gen.next()).collect::<Vec<_>>())
            })
            .collect();
        let mut seen = HashSet::new();
        for h in handles {
            for id in h.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 2000);
    }
}
