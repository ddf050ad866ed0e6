use alloc::vec;
use alloc::vec::Vec;

use rgb::RGBA;

/// Significant bits kept per channel.
pub const SIGNAL_BITS: u32 = 5;
/// Right shift applied to an 8-bit channel to reach [`SIGNAL_BITS`].
pub const RIGHT_SHIFT: u32 = 8 - SIGNAL_BITS;
/// Number of quantized levels per channel.
pub const CHANNEL_LEVELS: usize = 1 << SIGNAL_BITS;
/// Total bucket count, 32³.
pub const HISTOGRAM_SIZE: usize = 1 << (3 * SIGNAL_BITS);

/// One histogram bucket: how many samples landed here and the exact channel
/// sums of those samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistEntry {
    pub count: u32,
    pub r_sum: u64,
    pub g_sum: u64,
    pub b_sum: u64,
    pub a_sum: u64,
}

/// Inclusive quantized bounds per channel, in R, G, B order.
pub type Bounds = [(u8, u8); 3];

/// Quantize an 8-bit channel to its 5-bit level.
#[inline]
pub fn quantize_channel(v: u8) -> u8 {
    v >> RIGHT_SHIFT
}

/// Bucket index for already-quantized channel levels.
#[inline]
pub fn bucket_index(r: u8, g: u8, b: u8) -> usize {
    ((r as usize) << (2 * SIGNAL_BITS)) | ((g as usize) << SIGNAL_BITS) | b as usize
}

/// Population histogram over quantized RGB space.
///
/// Dense: every one of the 32³ buckets has a slot, so range walks over a
/// [`VBox`](crate::vbox::VBox) are plain index arithmetic.
#[derive(Debug, Clone)]
pub struct Histogram {
    buckets: Vec<HistEntry>,
    total: u64,
    bounds: Option<Bounds>,
}

impl Histogram {
    /// Build from a sampled pixel stream.
    ///
    /// Bucket counts saturate at `u32::MAX`; channel sums and the total
    /// stay exact.
    pub fn from_samples(samples: &[RGBA<u8>]) -> Self {
        let mut buckets = vec![HistEntry::default(); HISTOGRAM_SIZE];
        let mut lo = [u8::MAX; 3];
        let mut hi = [0u8; 3];

        for px in samples {
            let q = [
                quantize_channel(px.r),
                quantize_channel(px.g),
                quantize_channel(px.b),
            ];
            for c in 0..3 {
                lo[c] = lo[c].min(q[c]);
                hi[c] = hi[c].max(q[c]);
            }

            let e = &mut buckets[bucket_index(q[0], q[1], q[2])];
            e.count = e.count.saturating_add(1);
            e.r_sum += px.r as u64;
            e.g_sum += px.g as u64;
            e.b_sum += px.b as u64;
            e.a_sum += px.a as u64;
        }

        let bounds = if samples.is_empty() {
            None
        } else {
            Some([(lo[0], hi[0]), (lo[1], hi[1]), (lo[2], hi[2])])
        };

        Self {
            buckets,
            total: samples.len() as u64,
            bounds,
        }
    }

    /// Number of samples the histogram was built from.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Tight per-channel bounds of all populated buckets, `None` when empty.
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// Count for a bucket index. Out-of-range indices count as 0.
    #[inline]
    pub fn count(&self, index: usize) -> u32 {
        self.buckets.get(index).map_or(0, |e| e.count)
    }

    /// Count for the bucket a full-precision color falls into.
    pub fn count_of(&self, r: u8, g: u8, b: u8) -> u32 {
        self.count(bucket_index(
            quantize_channel(r),
            quantize_channel(g),
            quantize_channel(b),
        ))
    }

    #[inline]
    pub(crate) fn entry(&self, r: u8, g: u8, b: u8) -> &HistEntry {
        &self.buckets[bucket_index(r, g, b)]
    }

    /// Iterate populated buckets as `(index, entry)`, in index order.
    pub fn populated(&self) -> impl Iterator<Item = (usize, &HistEntry)> + '_ {
        self.buckets
            .iter()
            .enumerate()
            .filter(|(_, e)| e.count > 0)
    }
}
