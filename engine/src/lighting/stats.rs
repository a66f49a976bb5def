//! Frame statistics helpers.

/// Fixed-window moving average for smoothing per-frame timings.
///
/// The window starts zero-filled, so the average ramps up over the first
/// `N` samples instead of jumping on the first one.
#[derive(Clone, Debug)]
pub struct MovingAverage<const N: usize> {
    buf: [f64; N],
    idx: usize,
    sum: f64,
}

impl<const N: usize> Default for MovingAverage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> MovingAverage<N> {
    pub fn new() -> Self {
        Self {
            buf: [0.0; N],
            idx: 0,
            sum: 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.buf = [0.0; N];
        self.idx = 0;
        self.sum = 0.0;
    }

    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.sum -= self.buf[self.idx];
        self.buf[self.idx] = value;
        self.idx = (self.idx + 1) % N;
    }

    pub fn get(&self) -> f64 {
        self.sum / N as f64
    }
}
