//! Progressive accumulation buffer.

use rayon::prelude::*;

use crate::util::Vec4;

/// Per-pixel running radiance sums and the number of full passes they hold.
///
/// Every pixel always holds exactly `frame_count` contributions. Resizing
/// implies a reset.
#[derive(Debug, Clone)]
pub struct AccumulationBuffer {
    width: u32,
    height: u32,
    sums: Vec<Vec4>,
    frame_count: u32,
}

impl AccumulationBuffer {
    /// Zeroed buffer. Both dimensions must be non-zero.
    pub fn new(width: u32, height: u32) -> Self {
        assert_non_empty(width, height);
        Self {
            width,
            height,
            sums: vec![Vec4::ZERO; width as usize * height as usize],
            frame_count: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of full-image passes since the last reset.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Zero all sums and the counter.
    pub fn reset(&mut self) {
        self.sums.fill(Vec4::ZERO);
        self.frame_count = 0;
    }

    /// Change size and reset.
    pub fn resize(&mut self, width: u32, height: u32) {
        assert_non_empty(width, height);
        self.width = width;
        self.height = height;
        self.sums.clear();
        self.sums.resize(width as usize * height as usize, Vec4::ZERO);
        self.frame_count = 0;
    }

    /// Add one full pass. `shade(x, y)` is called once per pixel, rows in parallel.
    pub fn accumulate_par<F>(&mut self, shade: F)
    where
        F: Fn(u32, u32) -> Vec4 + Sync,
    {
        self.check_size();
        let width = self.width as usize;
        self.sums
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| add_row(row, y as u32, &shade));
        self.frame_count += 1;
    }

    /// Add one full pass on the calling thread, in scanline order.
    pub fn accumulate<F>(&mut self, shade: F)
    where
        F: Fn(u32, u32) -> Vec4,
    {
        self.check_size();
        let width = self.width as usize;
        for (y, row) in self.sums.chunks_mut(width).enumerate() {
            add_row(row, y as u32, &shade);
        }
        self.frame_count += 1;
    }

    /// Raw sum of pixel `(x, y)`.
    pub fn sum(&self, x: u32, y: u32) -> Vec4 {
        self.sums[y as usize * self.width as usize + x as usize]
    }

    /// Mean of pixel `(x, y)`; zero when nothing was accumulated.
    pub fn average(&self, x: u32, y: u32) -> Vec4 {
        self.average_at(y as usize * self.width as usize + x as usize)
    }

    /// All raw sums, row-major.
    pub fn sums(&self) -> &[Vec4] {
        &self.sums
    }

    /// Per-pixel means, row-major.
    pub fn averages(&self) -> impl ExactSizeIterator<Item = Vec4> + '_ {
        let inv = self.inv_count();
        self.sums.iter().map(move |&s| s * inv)
    }

    #[inline]
    fn average_at(&self, index: usize) -> Vec4 {
        self.sums[index] * self.inv_count()
    }

    #[inline]
    fn inv_count(&self) -> f32 {
        if self.frame_count == 0 { 0.0 } else { 1.0 / self.frame_count as f32 }
    }

    fn check_size(&self) {
        assert_eq!(
            self.sums.len(),
            self.width as usize * self.height as usize,
            "accumulation buffer does not match {}x{}",
            self.width,
            self.height
        );
    }
}

fn assert_non_empty(width: u32, height: u32) {
    assert!(
        width > 0 && height > 0,
        "accumulation buffer needs a non-empty image, got {width}x{height}"
    );
}

#[inline]
fn add_row<F>(row: &mut [Vec4], y: u32, shade: &F)
where
    F: Fn(u32, u32) -> Vec4,
{
    for (x, slot) in row.iter_mut().enumerate() {
        *slot += shade(x as u32, y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_empty() {
        let acc = AccumulationBuffer::new(4, 3);
        assert_eq!(acc.frame_count(), 0);
        assert_eq!(acc.sums().len(), 12);
        assert_eq!(acc.average(3, 2), Vec4::ZERO);
    }

    #[test]
    #[should_panic(expected = "non-empty image")]
    fn test_zero_width_rejected() {
        AccumulationBuffer::new(0, 4);
    }

    #[test]
    #[should_panic(expected = "non-empty image")]
    fn test_resize_to_zero_rejected() {
        AccumulationBuffer::new(2, 2).resize(3, 0);
    }

    #[test]
    fn test_accumulate_and_average() {
        let mut acc = AccumulationBuffer::new(3, 2);
        acc.accumulate(|x, y| Vec4::new(x as f32, y as f32, 1.0, 1.0));
        acc.accumulate_par(|x, y| Vec4::new(x as f32 + 2.0, y as f32, 3.0, 1.0));

        assert_eq!(acc.frame_count(), 2);
        assert_eq!(acc.sum(2, 1), Vec4::new(6.0, 2.0, 4.0, 2.0));
        assert_eq!(acc.average(2, 1), Vec4::new(3.0, 1.0, 2.0, 1.0));
        assert_eq!(acc.averages().len(), 6);
    }

    #[test]
    fn test_serial_matches_parallel() {
        let shade = |x: u32, y: u32| Vec4::new((x * 7 + y) as f32 * 0.1, 0.5, (y * 3) as f32, 1.0);
        let mut a = AccumulationBuffer::new(17, 9);
        let mut b = AccumulationBuffer::new(17, 9);
        for _ in 0..3 {
            a.accumulate(shade);
            b.accumulate_par(shade);
        }
        assert_eq!(a.sums(), b.sums());
    }

    #[test]
    fn test_reset_and_resize() {
        let mut acc = AccumulationBuffer::new(2, 2);
        acc.accumulate(|_, _| Vec4::ONE);
        acc.reset();
        assert_eq!(acc.frame_count(), 0);
        assert!(acc.sums().iter().all(|s| *s == Vec4::ZERO));

        acc.accumulate(|_, _| Vec4::ONE);
        acc.resize(5, 1);
        assert_eq!((acc.width(), acc.height(), acc.frame_count()), (5, 1, 0));
        assert_eq!(acc.sums().len(), 5);
        assert!(acc.sums().iter().all(|s| *s == Vec4::ZERO));
    }
}
