//! Progress notifications for a quarter run

use crate::models::DownloadResult;
use std::sync::Mutex;

/// Receives progress for a quarter run.
///
/// Calls are serialized: counts are always consistent with each other.
/// `last` is the row that just finished, or `None` for the initial call and
/// for calls made when a row is admitted.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(
        &self,
        completed: usize,
        total: usize,
        last: Option<&DownloadResult>,
        in_flight: usize,
    );
}

impl<F> ProgressObserver for F
where
    F: Fn(usize, usize, Option<&DownloadResult>, usize) + Send + Sync,
{
    fn on_progress(
        &self,
        completed: usize,
        total: usize,
        last: Option<&DownloadResult>,
        in_flight: usize,
    ) {
        self(completed, total, last, in_flight)
    }
}

#[derive(Debug, Default)]
struct Counters {
    completed: usize,
    in_flight: usize,
}

/// Shared counters for one quarter. The observer runs while the lock is held.
pub(crate) struct ProgressTracker<'a> {
    total: usize,
    observer: Option<&'a dyn ProgressObserver>,
    counters: Mutex<Counters>,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(total: usize, observer: Option<&'a dyn ProgressObserver>) -> Self {
        Self {
            total,
            observer,
            counters: Mutex::new(Counters::default()),
        }
    }

    pub(crate) fn start(&self) {
        if self.total == 0 {
            return;
        }
        let counters = self.lock();
        self.notify(&counters, None);
    }

    pub(crate) fn admitted(&self) {
        let mut counters = self.lock();
        counters.in_flight += 1;
        self.notify(&counters, None);
    }

    pub(crate) fn finished(&self, result: &DownloadResult) {
        let mut counters = self.lock();
        counters.in_flight = counters.in_flight.saturating_sub(1);
        counters.completed += 1;
        self.notify(&counters, Some(result));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify(&self, counters: &Counters, last: Option<&DownloadResult>) {
        if let Some(observer) = self.observer {
            observer.on_progress(counters.completed, self.total, last, counters.in_flight);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IndexRow, Outcome};
    use chrono::NaiveDate;

    #[test]
    fn test_tracker_sequence() {
        let calls = Mutex::new(Vec::new());
        let observer = |completed: usize,
                        total: usize,
                        last: Option<&DownloadResult>,
                        in_flight: usize| {
            calls
                .lock()
                .unwrap()
                .push((completed, total, last.map(|r| r.status().to_string()), in_flight));
        };

        let row = IndexRow {
            cik: "0000000001".to_string(),
            company_name: "X".to_string(),
            form_type: "10-Q".to_string(),
            date_filed: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            accession: "acc".to_string(),
        };
        let result = DownloadResult::new(&row, Outcome::Skipped);

        let tracker = ProgressTracker::new(1, Some(&observer));
        tracker.start();
        tracker.admitted();
        tracker.finished(&result);

        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                (0, 1, None, 0),
                (0, 1, None, 1),
                (1, 1, Some("skipped".to_string()), 0),
            ]
        );
    }

    #[test]
    fn test_no_initial_call_for_empty_run() {
        let calls = Mutex::new(0usize);
        let observer = |_: usize, _: usize, _: Option<&DownloadResult>, _: usize| {
            *calls.lock().unwrap() += 1;
        };
        ProgressTracker::new(0, Some(&observer)).start();
        assert_eq!(*calls.lock().unwrap(), 0);
    }
}
