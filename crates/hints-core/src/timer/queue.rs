//! One-shot timers evaluated against a caller-driven clock.
//!
//! Nothing here sleeps. The owner advances its own clock and calls
//! [`TimerQueue::drain_due`] once per tick; entries whose deadline has been
//! reached come back in deadline order, ties in insertion order.
//!
//! Every entry is stamped with the queue's epoch when scheduled. Bumping the
//! epoch (on session reset) does not cancel anything, but stale entries are
//! discarded instead of delivered when they come due.

/// A pending one-shot timer.
#[derive(Debug, Clone)]
struct Pending<T> {
    deadline: f64,
    seq: u64,
    epoch: u64,
    payload: T,
}

/// Result of one drain pass.
#[derive(Debug)]
pub struct Due<T> {
    /// Payloads from the current epoch, in firing order.
    pub fired: Vec<T>,
    /// Entries that came due but belonged to an earlier epoch.
    pub stale: usize,
}

#[derive(Debug, Clone)]
pub struct TimerQueue<T> {
    pending: Vec<Pending<T>>,
    next_seq: u64,
    epoch: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            next_seq: 0,
            epoch: 0,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Schedules `payload` to fire once `now + delay_secs` is reached.
    ///
    /// Negative or NaN delays are treated as zero. Returns the deadline.
    pub fn after(&mut self, now: f64, delay_secs: f64, payload: T) -> f64 {
        let delay = if delay_secs.is_nan() { 0.0 } else { delay_secs.max(0.0) };
        let deadline = now + delay;
        self.pending.push(Pending {
            deadline,
            seq: self.next_seq,
            epoch: self.epoch,
            payload,
        });
        self.next_seq += 1;
        deadline
    }

    /// Starts a new generation. Returns the new epoch.
    pub fn advance_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    /// Entries scheduled in the current epoch that have not fired yet.
    pub fn live_len(&self) -> usize {
        self.pending.iter().filter(|p| p.epoch == self.epoch).count()
    }

    /// All entries still held, stale ones included.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Removes and returns every entry with `deadline <= now`.
    pub fn drain_due(&mut self, now: f64) -> Due<T> {
        let (mut due, rest): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|p| p.deadline <= now);
        self.pending = rest;

        due.sort_by(|a, b| a.deadline.total_cmp(&b.deadline).then(a.seq.cmp(&b.seq)));

        let mut stale = 0;
        let mut fired = Vec::with_capacity(due.len());
        for entry in due {
            if entry.epoch == self.epoch {
                fired.push(entry.payload);
            } else {
                stale += 1;
            }
        }
        Due { fired, stale }
    }
}
