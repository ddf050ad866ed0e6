use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::error::QuantizeError;
use crate::histogram::Histogram;
use crate::vbox::VBox;

/// Default share of the target count split by population alone before
/// switching to population × volume.
pub const FRACTION_BY_POPULATION: f64 = 0.75;

/// Terminal boxes left after splitting, in working-set order.
#[derive(Debug, Clone, Default)]
pub struct ColorMap {
    boxes: Vec<VBox>,
}

impl ColorMap {
    pub fn boxes(&self) -> &[VBox] {
        &self.boxes
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn into_boxes(self) -> Vec<VBox> {
        self.boxes
    }
}

/// A box in the working set, with whether a cut has already failed on it.
#[derive(Debug)]
struct Slot {
    vbox: VBox,
    terminal: bool,
}

/// Iterative median-cut over a [`Histogram`].
///
/// Splits by population until the box count reaches
/// `ceil(fraction_by_population * max_colors)`, then by population × volume
/// until `max_colors` boxes exist or no box can be cut further.
pub struct ColorMapBuilder<'a> {
    hist: &'a Histogram,
    max_colors: usize,
    fraction_by_population: f64,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> ColorMapBuilder<'a> {
    pub fn new(hist: &'a Histogram, max_colors: usize) -> Self {
        Self {
            hist,
            max_colors,
            fraction_by_population: FRACTION_BY_POPULATION,
            cancel: None,
        }
    }

    pub fn fraction_by_population(mut self, fraction: f64) -> Self {
        self.fraction_by_population = fraction;
        self
    }

    /// Flag checked between split iterations.
    pub fn cancel_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Box count at which selection switches to population × volume.
    pub fn population_phase_target(&self) -> usize {
        let fraction = self.fraction_by_population.clamp(0.0, 1.0);
        let exact = fraction * self.max_colors as f64;
        let floor = exact as usize;
        if (floor as f64) < exact { floor + 1 } else { floor }
    }

    /// Run the splitting loop. An empty histogram gives an empty map.
    pub fn build(self) -> Result<ColorMap, QuantizeError> {
        let Some(root) = VBox::root(self.hist) else {
            return Ok(ColorMap::default());
        };
        if self.max_colors == 0 {
            return Ok(ColorMap::default());
        }

        let phase_target = self.population_phase_target();
        let mut slots = Vec::with_capacity(self.max_colors);
        slots.push(Slot {
            vbox: root,
            terminal: false,
        });

        while slots.len() < self.max_colors {
            if self.cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                return Err(QuantizeError::Cancelled);
            }

            let by_product = slots.len() >= phase_target;
            let Some(idx) = select(&slots, by_product) else {
                log::trace!("no splittable boxes left at {} colors", slots.len());
                break;
            };

            match slots[idx].vbox.split(self.hist) {
                Some((left, right)) => {
                    log::trace!(
                        "split box {idx} (pop {}) into {} + {}",
                        slots[idx].vbox.population(),
                        left.population(),
                        right.population()
                    );
                    slots[idx] = Slot {
                        vbox: left,
                        terminal: false,
                    };
                    slots.insert(
                        idx + 1,
                        Slot {
                            vbox: right,
                            terminal: false,
                        },
                    );
                }
                None => slots[idx].terminal = true,
            }
        }

        Ok(ColorMap {
            boxes: slots.into_iter().map(|s| s.vbox).collect(),
        })
    }
}

/// Highest-priority box still worth trying. Ties go to the larger volume,
/// then to the earlier slot.
fn select(slots: &[Slot], by_product: bool) -> Option<usize> {
    let key = |b: &VBox| {
        let primary = if by_product {
            b.product()
        } else {
            b.population() as u64
        };
        (primary, b.volume())
    };

    let mut best: Option<(usize, (u64, u32))> = None;
    for (i, slot) in slots.iter().enumerate() {
        if slot.terminal || slot.vbox.population() == 0 {
            continue;
        }
        let k = key(&slot.vbox);
        if best.is_none_or(|(_, bk)| k > bk) {
            best = Some((i, k));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgb::RGBA;

    fn px(r: u8, g: u8, b: u8) -> RGBA<u8> {
        RGBA { r, g, b, a: 255 }
    }

    fn gradient() -> Vec<RGBA<u8>> {
        let mut samples = Vec::new();
        for r in (0..=255u8).step_by(16) {
            for g in (0..=255u8).step_by(32) {
                samples.push(px(r, g, 128));
            }
        }
        samples
    }

    #[test]
    fn empty_histogram_gives_empty_map() {
        let hist = Histogram::from_samples(&[]);
        let map = ColorMapBuilder::new(&hist, 16).build().unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn produces_requested_count() {
        let hist = Histogram::from_samples(&gradient());
        let map = ColorMapBuilder::new(&hist, 8).build().unwrap();
        assert_eq!(map.len(), 8);
        let total: u32 = map.boxes().iter().map(|b| b.population()).sum();
        assert_eq!(total as u64, hist.total());
    }

    #[test]
    fn saturates_on_few_colors() {
        let samples = vec![px(0, 0, 0), px(255, 0, 0), px(0, 0, 255)];
        let hist = Histogram::from_samples(&samples);
        let map = ColorMapBuilder::new(&hist, 16).build().unwrap();
        assert_eq!(map.len(), 3);
        assert!(map.boxes().iter().all(|b| b.population() == 1));
    }

    #[test]
    fn phase_target_rounds_up() {
        let hist = Histogram::from_samples(&[]);
        assert_eq!(ColorMapBuilder::new(&hist, 16).population_phase_target(), 12);
        assert_eq!(ColorMapBuilder::new(&hist, 5).population_phase_target(), 4);
        assert_eq!(ColorMapBuilder::new(&hist, 1).population_phase_target(), 1);
        let all_product = ColorMapBuilder::new(&hist, 10).fraction_by_population(0.0);
        assert_eq!(all_product.population_phase_target(), 0);
    }

    /// Two dense red levels next to three sparse, widely spread samples.
    /// After the root cut the dense box has the larger population (40 vs 3)
    /// but the smaller population × volume (80 vs 90).
    fn dense_and_sparse() -> Histogram {
        let mut samples = vec![px(0, 0, 0); 20];
        samples.extend(vec![px(8, 0, 0); 20]);
        samples.extend([px(128, 0, 0), px(192, 0, 0), px(248, 0, 0)]);
        Histogram::from_samples(&samples)
    }

    fn red_ranges(map: &ColorMap) -> Vec<((u8, u8), u32)> {
        map.boxes()
            .iter()
            .map(|b| (b.bounds()[0], b.population()))
            .collect()
    }

    #[test]
    fn population_phase_splits_dense_box() {
        let hist = dense_and_sparse();
        let map = ColorMapBuilder::new(&hist, 3)
            .fraction_by_population(1.0)
            .build()
            .unwrap();
        assert_eq!(red_ranges(&map), vec![((0, 0), 20), ((1, 1), 20), ((2, 31), 3)]);
        assert_eq!(map.boxes()[2].bounds(), [(2, 31), (0, 0), (0, 0)]);
    }

    #[test]
    fn product_phase_splits_sparse_wide_box() {
        let hist = dense_and_sparse();
        let map = ColorMapBuilder::new(&hist, 3)
            .fraction_by_population(0.0)
            .build()
            .unwrap();
        assert_eq!(red_ranges(&map), vec![((0, 1), 40), ((2, 24), 2), ((25, 31), 1)]);
        assert_eq!(map.boxes()[1].volume(), 23);
    }

    #[test]
    fn phase_switches_at_rounded_up_fraction() {
        let hist = dense_and_sparse();
        let run = |k: usize, fraction: f64| {
            let map = ColorMapBuilder::new(&hist, k)
                .fraction_by_population(fraction)
                .build()
                .unwrap();
            red_ranges(&map)
        };

        // ceil(0.75 * 3) = 3: the second split is still by population.
        assert_eq!(run(3, 0.75), run(3, 1.0));
        // ceil(0.5 * 3) = 2: the second split is already by product.
        assert_eq!(run(3, 0.5), run(3, 0.0));

        // Default fraction, K = 4: root and dense box by population, then
        // the sparse box by product once three boxes exist.
        let map = ColorMapBuilder::new(&hist, 4).build().unwrap();
        assert_eq!(
            red_ranges(&map),
            vec![((0, 0), 20), ((1, 1), 20), ((2, 24), 2), ((25, 31), 1)]
        );
    }

    #[test]
    fn deterministic() {
        let hist = Histogram::from_samples(&gradient());
        let a = ColorMapBuilder::new(&hist, 12).build().unwrap();
        let b = ColorMapBuilder::new(&hist, 12).build().unwrap();
        assert_eq!(a.boxes(), b.boxes());
    }

    #[test]
    fn cancelled_before_first_split() {
        let hist = Histogram::from_samples(&gradient());
        let flag = AtomicBool::new(true);
        let result = ColorMapBuilder::new(&hist, 8).cancel_flag(&flag).build();
        assert_eq!(result.unwrap_err(), QuantizeError::Cancelled);
    }
}
