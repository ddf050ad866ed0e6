use alloc::vec::Vec;

use rgb::RGBA;

use crate::histogram::Histogram;
use crate::median_cut::ColorMap;

/// A palette color and the number of sampled pixels it stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantizedColor {
    pub color: RGBA<u8>,
    pub population: u32,
}

impl QuantizedColor {
    pub fn new(color: RGBA<u8>, population: u32) -> Self {
        Self { color, population }
    }
}

/// Ordering of palette entries by population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaletteOrder {
    /// Smallest population first.
    #[default]
    Ascending,
    /// Dominant color first.
    Descending,
}

/// Ordered palette produced by a quantization run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Palette {
    entries: Vec<QuantizedColor>,
}

impl Palette {
    /// Wrap entries as-is, without reordering.
    pub fn from_colors(entries: Vec<QuantizedColor>) -> Self {
        Self { entries }
    }

    /// One entry per terminal box: the box's weighted average color and
    /// its population. Sorting is stable, so equal populations keep
    /// color-map order.
    pub fn from_color_map(map: &ColorMap, hist: &Histogram, order: PaletteOrder) -> Self {
        let mut entries: Vec<QuantizedColor> = map
            .boxes()
            .iter()
            .map(|b| QuantizedColor::new(b.average(hist), b.population()))
            .collect();

        match order {
            PaletteOrder::Ascending => entries.sort_by_key(|c| c.population),
            PaletteOrder::Descending => entries.sort_by(|a, b| b.population.cmp(&a.population)),
        }

        Self { entries }
    }

    pub fn colors(&self) -> &[QuantizedColor] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, QuantizedColor> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<QuantizedColor> {
        self.entries
    }

    /// Sum of populations across all entries.
    pub fn total_population(&self) -> u64 {
        self.entries.iter().map(|c| c.population as u64).sum()
    }

    /// Entry with the largest population. The first such entry wins a tie.
    pub fn most_populous(&self) -> Option<QuantizedColor> {
        self.entries
            .iter()
            .copied()
            .reduce(|best, c| if c.population > best.population { c } else { best })
    }

    /// Plain mean of every channel and of the population across entries,
    /// each rounded half to even. `None` for an empty palette.
    ///
    /// Entries are not weighted by population; this only looks at the
    /// palette, never at the source pixels.
    pub fn average_color(&self) -> Option<QuantizedColor> {
        if self.entries.is_empty() {
            return None;
        }
        let n = self.entries.len() as u64;
        let mean = |f: fn(&QuantizedColor) -> u64| {
            round_half_even(self.entries.iter().map(f).sum(), n)
        };

        let channel = |f: fn(&QuantizedColor) -> u64| mean(f).min(255) as u8;
        Some(QuantizedColor {
            color: RGBA {
                r: channel(|c| c.color.r as u64),
                g: channel(|c| c.color.g as u64),
                b: channel(|c| c.color.b as u64),
                a: channel(|c| c.color.a as u64),
            },
            population: mean(|c| c.population as u64).min(u32::MAX as u64) as u32,
        })
    }
}

impl<'a> IntoIterator for &'a Palette {
    type Item = &'a QuantizedColor;
    type IntoIter = core::slice::Iter<'a, QuantizedColor>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for Palette {
    type Item = QuantizedColor;
    type IntoIter = alloc::vec::IntoIter<QuantizedColor>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// `sum / n` rounded to the nearest integer, ties to even.
fn round_half_even(sum: u64, n: u64) -> u64 {
    let q = sum / n;
    let r = sum % n;
    match (r * 2).cmp(&n) {
        core::cmp::Ordering::Less => q,
        core::cmp::Ordering::Greater => q + 1,
        core::cmp::Ordering::Equal => q + (q & 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::median_cut::ColorMapBuilder;

    fn qc(r: u8, g: u8, b: u8, population: u32) -> QuantizedColor {
        QuantizedColor::new(RGBA { r, g, b, a: 255 }, population)
    }

    #[test]
    fn round_half_even_ties() {
        assert_eq!(round_half_even(5, 2), 2);
        assert_eq!(round_half_even(7, 2), 4);
        assert_eq!(round_half_even(10, 4), 2);
        assert_eq!(round_half_even(11, 4), 3);
        assert_eq!(round_half_even(9, 3), 3);
    }

    #[test]
    fn average_color_of_palette() {
        let palette = Palette::from_colors(vec![qc(0, 10, 255, 3), qc(255, 20, 0, 4)]);
        let avg = palette.average_color().unwrap();
        assert_eq!(avg.color, RGBA { r: 128, g: 15, b: 128, a: 255 });
        assert_eq!(avg.population, 4);
    }

    #[test]
    fn average_color_of_empty_palette() {
        assert_eq!(Palette::default().average_color(), None);
    }

    #[test]
    fn most_populous_entry() {
        let palette = Palette::from_colors(vec![qc(1, 1, 1, 5), qc(2, 2, 2, 9), qc(3, 3, 3, 9)]);
        assert_eq!(palette.most_populous(), Some(qc(2, 2, 2, 9)));
    }

    #[test]
    fn sorted_by_population() {
        let mut samples = vec![RGBA { r: 0, g: 0, b: 0, a: 255 }; 3];
        samples.extend(vec![RGBA { r: 255, g: 0, b: 0, a: 255 }; 7]);
        samples.extend(vec![RGBA { r: 0, g: 255, b: 0, a: 255 }; 5]);
        let hist = Histogram::from_samples(&samples);
        let map = ColorMapBuilder::new(&hist, 8).build().unwrap();

        let asc = Palette::from_color_map(&map, &hist, PaletteOrder::Ascending);
        let pops: Vec<u32> = asc.iter().map(|c| c.population).collect();
        assert_eq!(pops, vec![3, 5, 7]);
        assert_eq!(asc.colors()[2].color, RGBA { r: 255, g: 0, b: 0, a: 255 });

        let desc = Palette::from_color_map(&map, &hist, PaletteOrder::Descending);
        let pops: Vec<u32> = desc.iter().map(|c| c.population).collect();
        assert_eq!(pops, vec![7, 5, 3]);
        assert_eq!(desc.total_population(), 15);
    }
}
