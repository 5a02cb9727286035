//! Bounded, mutex-guarded buffer of samples awaiting flush to the server.

use std::collections::VecDeque;

use helios_core::model::MetricSample;
use parking_lot::Mutex;
use tracing::warn;

/// The buffer never grows past `batch_size * OVERFLOW_FACTOR`; beyond that,
/// oldest samples are dropped to make room for a failed batch being reprepended.
const OVERFLOW_FACTOR: usize = 10;

/// Shared sample buffer. All splice operations (append, take-prefix,
/// prepend-unsent, truncate-overflow) hold the lock only for the duration of the
/// `VecDeque` manipulation itself.
pub struct MetricsBuffer {
    batch_size: usize,
    queue: Mutex<VecDeque<MetricSample>>,
}

impl MetricsBuffer {
    #[must_use]
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Append freshly collected samples to the tail.
    pub fn append(&self, samples: Vec<MetricSample>) {
        let mut q = self.queue.lock();
        q.extend(samples);
    }

    /// Whether the buffer currently holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Remove and return up to `batch_size` samples from the head.
    #[must_use]
    pub fn take_batch(&self) -> Vec<MetricSample> {
        let mut q = self.queue.lock();
        let n = self.batch_size.min(q.len());
        q.drain(..n).collect()
    }

    /// Put an unsent batch back at the head after a failed flush, then enforce the
    /// overflow bound by dropping the oldest excess. Returns the number dropped.
    pub fn prepend_unsent(&self, batch: Vec<MetricSample>) -> usize {
        let mut q = self.queue.lock();
        for sample in batch.into_iter().rev() {
            q.push_front(sample);
        }
        let max_len = self.batch_size * OVERFLOW_FACTOR;
        let mut dropped = 0;
        while q.len() > max_len {
            q.pop_front();
            dropped += 1;
        }
        if dropped > 0 {
            warn!(dropped, "metrics buffer overflowed, dropped oldest samples");
        }
        dropped
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use helios_core::model::MetricType;

    use super::*;

    fn sample(name: &str) -> MetricSample {
        MetricSample {
            name: name.into(),
            value: 1.0,
            timestamp: Utc::now(),
            kind: MetricType::Gauge,
            labels: Default::default(),
            source: "test".into(),
        }
    }

    #[test]
    fn take_batch_respects_batch_size() {
        let buf = MetricsBuffer::new(2);
        buf.append((0..5).map(|i| sample(&format!("m{i}"))).collect());
        assert_eq!(buf.take_batch().len(), 2);
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn overflow_drops_oldest() {
        let buf = MetricsBuffer::new(2);
        // 22 samples already present.
        buf.append((0..22).map(|i| sample(&format!("m{i}"))).collect());
        let dropped = buf.prepend_unsent(vec![sample("retry")]);
        // batch_size * 10 = 20, we have 23 after prepend, so 3 dropped.
        assert_eq!(dropped, 3);
        assert_eq!(buf.len(), 20);
    }
}
