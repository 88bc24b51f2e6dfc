use crate::RawSample;

/// Average of the middle half of `buf`.
///
/// The buffer is sorted in place, `len / 4` entries are dropped from each end and the rest are
/// averaged with integer division. Trimming the tails rejects the electrical spikes a resistive
/// panel produces; averaging what is left reduces gaussian noise.
pub fn trimmed_mean(buf: &mut [u16]) -> u16 {
    if buf.is_empty() {
        return 0;
    }
    buf.sort_unstable();

    let cut = buf.len() / 4;
    let middle = &buf[cut..buf.len() - cut];
    // 10 and 12 bit samples, so even large batches cannot overflow u32
    let sum: u32 = middle.iter().map(|v| *v as u32).sum();
    (sum / middle.len() as u32) as u16
}

/// Batch filter over raw resistive samples
///
/// X and Y are buffered independently. Every `N`th sample completes a batch and yields one
/// trimmed-mean pair; the buffers then start over.
pub struct NoiseFilter<const N: usize> {
    xbuf: [u16; N],
    ybuf: [u16; N],
    index: usize,
    last: RawSample,
}

impl<const N: usize> NoiseFilter<N> {
    const NOT_EMPTY: () = assert!(N > 0, "filter depth must be at least one sample");

    pub const fn new() -> Self {
        let () = Self::NOT_EMPTY;
        Self {
            xbuf: [0; N],
            ybuf: [0; N],
            index: 0,
            last: RawSample::new(0, 0),
        }
    }

    /// Add one sample. Returns the filtered pair when this sample completes a batch.
    pub fn push(&mut self, sample: RawSample) -> Option<RawSample> {
        self.xbuf[self.index] = sample.x;
        self.ybuf[self.index] = sample.y;
        self.index += 1;

        if self.index < N {
            return None;
        }

        self.index = 0;
        self.last = RawSample::new(trimmed_mean(&mut self.xbuf), trimmed_mean(&mut self.ybuf));
        Some(self.last)
    }

    /// Drop a partially filled batch
    pub fn reset(&mut self) {
        self.index = 0;
    }

    /// Result of the most recent complete batch
    pub fn last(&self) -> RawSample {
        self.last
    }

    /// Samples collected toward the current batch
    pub fn pending(&self) -> usize {
        self.index
    }
}

impl<const N: usize> Default for NoiseFilter<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub mod test {
    use super::*;

    #[test]
    fn test_identical_samples() {
        let mut f = NoiseFilter::<16>::new();
        let s = RawSample::new(612, 388);

        for _ in 0..15 {
            assert!(f.push(s).is_none());
        }
        assert_eq!(f.push(s), Some(s));
        assert_eq!(f.pending(), 0);
        assert_eq!(f.last(), s);
    }

    #[test]
    fn test_outliers_in_tails_are_ignored() {
        // Four spikes below and four above the real signal land exactly in the trimmed quarters
        let mut spiky: [u16; 16] = [
            1021, 500, 0, 503, 502, 1023, 500, 2, 501, 1, 502, 1020, 503, 3, 501, 1022,
        ];
        let mut quiet: [u16; 16] = [
            504, 500, 499, 503, 502, 504, 500, 499, 501, 499, 502, 504, 503, 499, 501, 504,
        ];
        let signal: u32 = [500u32, 500, 501, 501, 502, 502, 503, 503].iter().sum();

        assert_eq!(trimmed_mean(&mut spiky) as u32, signal / 8);
        assert_eq!(trimmed_mean(&mut quiet) as u32, signal / 8);
    }

    #[test]
    fn test_axes_are_independent() {
        let mut f = NoiseFilter::<4>::new();
        f.push(RawSample::new(10, 900));
        f.push(RawSample::new(20, 800));
        f.push(RawSample::new(30, 700));
        let out = f.push(RawSample::new(1000, 0)).unwrap();
        // Each axis keeps its own middle two: x {20, 30}, y {700, 800}
        assert_eq!(out, RawSample::new(25, 750));
    }

    #[test]
    fn test_reset_discards_partial_batch() {
        let mut f = NoiseFilter::<4>::new();
        f.push(RawSample::new(1000, 1000));
        f.push(RawSample::new(1000, 1000));
        f.reset();
        assert_eq!(f.pending(), 0);

        let s = RawSample::new(7, 9);
        for _ in 0..3 {
            assert!(f.push(s).is_none());
        }
        assert_eq!(f.push(s), Some(s));
    }

    #[test]
    fn test_small_buffers() {
        let mut one = [42u16];
        assert_eq!(trimmed_mean(&mut one), 42);

        let mut three = [3u16, 1, 2];
        assert_eq!(trimmed_mean(&mut three), 2);

        assert_eq!(trimmed_mean(&mut []), 0);
    }

    #[test]
    fn test_depth_one_passes_every_sample() {
        // Evaluated at compile time, so a zero depth never builds
        const SINGLE: NoiseFilter<1> = NoiseFilter::new();
        let mut f = SINGLE;
        assert_eq!(f.push(RawSample::new(7, 9)), Some(RawSample::new(7, 9)));
        assert_eq!(f.push(RawSample::new(8, 1)), Some(RawSample::new(8, 1)));
    }
}
