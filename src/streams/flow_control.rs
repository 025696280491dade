//! Per-stream flow-control bookkeeping for the response body sink.
//!
//! Grounded on the teacher's `proto::streams::flow_control::FlowControl`
//! (`examples/carllerche-h2/src/proto/streams/flow_control.rs`), trimmed
//! to what a client consuming the response body needs: how much local
//! window has been granted to the peer vs. how much of it the consumer
//! has actually freed by reading the body.

pub(crate) type WindowSize = u32;

#[derive(Debug, Clone, Copy)]
pub(crate) struct FlowControl {
    /// The local window size as last advertised to the peer.
    window_size: WindowSize,

    /// Bytes received but not yet released back to the peer via
    /// WINDOW_UPDATE (i.e. not yet consumed by the response body reader).
    unreleased: WindowSize,

    /// Bytes the consumer has freed since the last WINDOW_UPDATE was sent,
    /// accumulated across calls that didn't individually cross the
    /// threshold below. Must be drained in full whenever a WINDOW_UPDATE
    /// goes out, or that earlier credit is lost forever and the peer's
    /// view of our window permanently lags reality.
    pending_credit: WindowSize,
}

impl FlowControl {
    pub fn new(initial: WindowSize) -> FlowControl {
        FlowControl {
            window_size: initial,
            unreleased: 0,
            pending_credit: 0,
        }
    }

    /// Called when a DATA frame of `len` bytes is received.
    pub fn recv_data(&mut self, len: WindowSize) {
        self.unreleased += len;
    }

    /// Called when the consumer has freed `len` bytes of the response
    /// body. Returns the WINDOW_UPDATE increment to send, if any is due.
    pub fn release_capacity(&mut self, len: WindowSize) -> Option<WindowSize> {
        self.unreleased = self.unreleased.saturating_sub(len);
        self.pending_credit += len;

        // Send a WINDOW_UPDATE once we've freed at least half the window,
        // the same threshold the teacher's stream-level flow control uses
        // to avoid a WINDOW_UPDATE storm of one frame per read. The whole
        // accumulated credit goes out at once, not just this call's `len`.
        if self.pending_credit > 0 && self.unreleased <= self.window_size / 2 {
            Some(std::mem::take(&mut self.pending_credit))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn releasing_from_empty_always_credits() {
        let mut fc = FlowControl::new(1024);
        fc.recv_data(10);
        assert_eq!(fc.release_capacity(10), Some(10));
    }

    #[test]
    fn no_update_while_unreleased_stays_above_half_window() {
        let mut fc = FlowControl::new(1024);
        fc.recv_data(900);
        // Releasing a small sliver still leaves > half the window
        // outstanding, so no WINDOW_UPDATE is due yet.
        assert_eq!(fc.release_capacity(50), None);
    }

    #[test]
    fn update_once_unreleased_drops_to_half_window() {
        let mut fc = FlowControl::new(1024);
        fc.recv_data(900);
        assert_eq!(fc.release_capacity(50), None); // unreleased: 850, still > 512
        // The whole 450 bytes freed across both calls is credited at once,
        // not just the 400 from this call -- otherwise the first release's
        // 50 bytes of credit would never reach the peer.
        assert_eq!(fc.release_capacity(400), Some(450)); // unreleased: 450 <= 512
    }

    #[test]
    fn accumulated_credit_survives_multiple_below_threshold_releases() {
        let mut fc = FlowControl::new(1024);
        fc.recv_data(1000);
        assert_eq!(fc.release_capacity(100), None); // unreleased: 900
        assert_eq!(fc.release_capacity(100), None); // unreleased: 800
        assert_eq!(fc.release_capacity(100), None); // unreleased: 700
        // Crossing the threshold now must credit all 400 bytes freed so
        // far, not just the last call's 100.
        assert_eq!(fc.release_capacity(200), Some(500)); // unreleased: 500 <= 512
    }

    #[test]
    fn releasing_zero_never_credits() {
        let mut fc = FlowControl::new(1024);
        fc.recv_data(10);
        assert_eq!(fc.release_capacity(0), None);
    }
}
