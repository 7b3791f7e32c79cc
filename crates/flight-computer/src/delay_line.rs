//! Live-input delay line
//!
//! Raw control frames are held in a min-heap keyed by (due, sequence) and
//! released once their due instant passes. While an onboard autopilot is
//! engaged the attitude axes are applied at once and only the throttle
//! travels with the signal delay.

use crate::{ConnectionLossThrottle, ControlInput};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

#[derive(Debug, Clone)]
struct DelayedInput {
    due: f64,
    seq: u64,
    input: ControlInput,
}

impl DelayedInput {
    /// Earlier due first, then submission order.
    fn order(&self, other: &Self) -> Ordering {
        self.due
            .total_cmp(&other.due)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialEq for DelayedInput {
    fn eq(&self, other: &Self) -> bool {
        self.order(other) == Ordering::Equal
    }
}

impl Eq for DelayedInput {}

impl PartialOrd for DelayedInput {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedInput {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order(other)
    }
}

#[derive(Debug, Clone)]
pub struct DelayLine {
    queue: BinaryHeap<Reverse<DelayedInput>>,
    seq: u64,
    last: ControlInput,
    locked_throttle: f64,
    policy: ConnectionLossThrottle,
}

impl DelayLine {
    pub fn new(policy: ConnectionLossThrottle) -> Self {
        Self {
            queue: BinaryHeap::new(),
            seq: 0,
            last: ControlInput::default(),
            locked_throttle: 0.0,
            policy,
        }
    }

    fn push(&mut self, due: f64, input: ControlInput) {
        self.queue.push(Reverse(DelayedInput {
            due,
            seq: self.seq,
            input,
        }));
        self.seq += 1;
    }

    /// Queue a raw frame to take effect `delay` seconds after `now`.
    pub fn submit(&mut self, raw: ControlInput, now: f64, delay: f64, autopilot_engaged: bool) {
        let mut delayed = raw;
        if autopilot_engaged && delay > 0.0 {
            let mut immediate = raw;
            immediate.throttle = 0.0;
            self.push(now, immediate);
            delayed.zero_attitude_axes();
        }
        self.push(now + delay, delayed);
    }

    /// Release every due frame and produce the effective control state.
    ///
    /// Throttle is the maximum over the released frames so the undelayed
    /// autopilot copy cannot zero it. With nothing released, sticks go
    /// neutral and throttle holds. The connection-loss policy applies last.
    pub fn drain_due(&mut self, now: f64, connected: bool) -> ControlInput {
        let mut released: Option<ControlInput> = None;
        let mut max_throttle = f64::NEG_INFINITY;
        while self.queue.peek().map_or(false, |Reverse(e)| e.due <= now) {
            let Some(Reverse(entry)) = self.queue.pop() else {
                break;
            };
            max_throttle = max_throttle.max(entry.input.throttle);
            released = Some(entry.input);
        }

        self.last = match released {
            Some(mut input) => {
                input.throttle = max_throttle;
                input
            }
            None => ControlInput::with_throttle(self.last.throttle),
        };

        let mut output = self.last;
        if connected {
            self.locked_throttle = output.throttle;
        } else {
            match self.policy {
                ConnectionLossThrottle::Zero => output.throttle = 0.0,
                ConnectionLossThrottle::Hold => output.throttle = self.locked_throttle,
                ConnectionLossThrottle::Unmodified => {}
            }
        }
        output
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop every queued frame, e.g. when an operator takes local control.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
