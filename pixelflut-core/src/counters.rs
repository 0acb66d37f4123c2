use std::sync::atomic::{AtomicU32, AtomicU64, Ordering::Relaxed};

// nr_pixels never resets, only accumulates. data_cnt is reset with a plain
// store once per telemetry tick; a byte or two can be lost to a race with an
// in-flight fetch_add, which is fine here.
#[derive(Default)]
pub struct Counters {
    nr_pixels: AtomicU64,
    data_cnt: AtomicU64,
    nr_clients: AtomicU32,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    // Called once per readable notification with the batch total, not once
    // per pixel.
    pub fn add_pixels(&self, n: u64) {
        if n > 0 {
            self.nr_pixels.fetch_add(n, Relaxed);
        }
    }

    pub fn nr_pixels(&self) -> u64 {
        self.nr_pixels.load(Relaxed)
    }

    pub fn add_bytes(&self, n: u64) {
        if n > 0 {
            self.data_cnt.fetch_add(n, Relaxed);
        }
    }

    // Called once per telemetry tick by the display loop. Plain store, not a
    // fetch-and-swap.
    pub fn take_bytes(&self) -> u64 {
        let n = self.data_cnt.load(Relaxed);
        self.data_cnt.store(0, Relaxed);
        n
    }

    // Returns the value before the increment; the acceptor also uses it as
    // the round-robin dispatch key for worker selection.
    pub fn client_connected(&self) -> u32 {
        self.nr_clients.fetch_add(1, Relaxed)
    }

    pub fn client_disconnected(&self) {
        self.nr_clients.fetch_sub(1, Relaxed);
    }

    pub fn nr_clients(&self) -> u32 {
        self.nr_clients.load(Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixels_accumulate_monotonically() {
        let c = Counters::new();
        c.add_pixels(3);
        c.add_pixels(5);
        assert_eq!(c.nr_pixels(), 8);
    }

    #[test]
    fn bytes_reset_on_take() {
        let c = Counters::new();
        c.add_bytes(100);
        assert_eq!(c.take_bytes(), 100);
        assert_eq!(c.take_bytes(), 0);
    }

    #[test]
    fn client_count_tracks_connect_and_disconnect() {
        let c = Counters::new();
        assert_eq!(c.client_connected(), 0);
        assert_eq!(c.client_connected(), 1);
        assert_eq!(c.nr_clients(), 2);
        c.client_disconnected();
        assert_eq!(c.nr_clients(), 1);
    }
}
