use rgb::RGBA;

use crate::histogram::{Bounds, CHANNEL_LEVELS, Histogram, RIGHT_SHIFT};

/// Color channel of a [`VBox`] axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Red = 0,
    Green = 1,
    Blue = 2,
}

/// An axis-aligned box over quantized RGB space.
///
/// Bounds are fixed at construction; population and volume are computed
/// once then. Narrowing a range always goes through [`VBox::new`] again, so
/// the cached values cannot drift from the bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VBox {
    bounds: Bounds,
    population: u32,
    volume: u32,
}

impl VBox {
    pub fn new(bounds: Bounds, hist: &Histogram) -> Self {
        debug_assert!(bounds.iter().all(|&(lo, hi)| lo <= hi));
        Self {
            bounds,
            population: population_in(&bounds, hist),
            volume: volume_of(&bounds),
        }
    }

    /// Root box spanning every populated bucket, `None` for an empty histogram.
    pub fn root(hist: &Histogram) -> Option<Self> {
        hist.bounds().map(|b| Self::new(b, hist))
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn population(&self) -> u32 {
        self.population
    }

    pub fn volume(&self) -> u32 {
        self.volume
    }

    /// Population × volume, the second-phase split priority.
    pub fn product(&self) -> u64 {
        self.population as u64 * self.volume as u64
    }

    /// Channel with the widest range. Ties go to red, then green.
    pub fn longest_axis(&self) -> Channel {
        let width = |c: Channel| {
            let (lo, hi) = self.bounds[c as usize];
            hi - lo
        };
        [Channel::Green, Channel::Blue]
            .into_iter()
            .fold(Channel::Red, |best, c| if width(c) > width(best) { c } else { best })
    }

    /// Split at the population median of the longest axis.
    ///
    /// A median at either extreme is moved inward to the nearest cut that
    /// leaves both halves populated. If the longest axis has no such cut the
    /// box is terminal and `None` is returned, even when a narrower axis
    /// could still separate its samples.
    pub fn split(&self, hist: &Histogram) -> Option<(VBox, VBox)> {
        if self.population == 0 || self.volume == 1 {
            return None;
        }
        let axis = self.longest_axis() as usize;
        let (lo, hi) = self.bounds[axis];

        // partial[i] = population of slices lo..=lo+i
        let mut partial = [0u64; CHANNEL_LEVELS];
        let mut total = 0u64;
        for level in lo..=hi {
            let mut slice = self.bounds;
            slice[axis] = (level, level);
            total += population_in(&slice, hist) as u64;
            partial[(level - lo) as usize] = total;
        }
        let cumulative = |level: u8| partial[(level - lo) as usize];

        // Valid cuts are contiguous since `partial` is non-decreasing.
        let first_valid = (lo..hi).find(|&d| cumulative(d) > 0)?;
        let last_valid = (lo..hi).rev().find(|&d| cumulative(d) < total)?;
        if first_valid > last_valid {
            return None;
        }

        let median = (lo..=hi)
            .find(|&d| cumulative(d) * 2 >= total)
            .unwrap_or(hi);
        let cut = median.clamp(first_valid, last_valid);

        let mut left = self.bounds;
        let mut right = self.bounds;
        left[axis].1 = cut;
        right[axis].0 = cut + 1;

        Some((VBox::new(left, hist), VBox::new(right, hist)))
    }

    /// Population-weighted average of the exact samples inside this box.
    ///
    /// An empty box yields the center of its bounds, fully opaque.
    pub fn average(&self, hist: &Histogram) -> RGBA<u8> {
        let mut count = 0u64;
        let mut sums = [0u64; 4];
        for_each_bucket(&self.bounds, |r, g, b| {
            let e = hist.entry(r, g, b);
            count += e.count as u64;
            sums[0] += e.r_sum;
            sums[1] += e.g_sum;
            sums[2] += e.b_sum;
            sums[3] += e.a_sum;
        });

        if count == 0 {
            let center = |(lo, hi): (u8, u8)| {
                let v = ((lo as u32 + hi as u32 + 1) << RIGHT_SHIFT) / 2;
                v.min(255) as u8
            };
            return RGBA {
                r: center(self.bounds[0]),
                g: center(self.bounds[1]),
                b: center(self.bounds[2]),
                a: 255,
            };
        }

        let avg = |sum: u64| ((sum + count / 2) / count).min(255) as u8;
        RGBA {
            r: avg(sums[0]),
            g: avg(sums[1]),
            b: avg(sums[2]),
            a: avg(sums[3]),
        }
    }
}

fn volume_of(bounds: &Bounds) -> u32 {
    bounds
        .iter()
        .map(|&(lo, hi)| (hi - lo) as u32 + 1)
        .product()
}

/// Saturates at `u32::MAX`.
fn population_in(bounds: &Bounds, hist: &Histogram) -> u32 {
    let mut sum = 0u32;
    for_each_bucket(bounds, |r, g, b| {
        sum = sum.saturating_add(hist.entry(r, g, b).count)
    });
    sum
}

#[inline]
fn for_each_bucket(bounds: &Bounds, mut f: impl FnMut(u8, u8, u8)) {
    let [(r0, r1), (g0, g1), (b0, b1)] = *bounds;
    for r in r0..=r1 {
        for g in g0..=g1 {
            for b in b0..=b1 {
                f(r, g, b);
            }
        }
    }
}
