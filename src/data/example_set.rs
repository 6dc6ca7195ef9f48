use std::cell::{Ref, RefCell, RefMut};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::data::images::LabelledImages;
use crate::error::{NetError, Result};

/// How `ExampleSet::shuffle` treats modulator levels.
///
/// - `None`      — plain Fisher–Yates over individual examples.
/// - `Stride`    — blocks of `num_h_levels` consecutive examples move as one
///                 unit; order inside a block is kept.  The data must already
///                 be laid out so each block cycles through the levels.
/// - `Alternate` — individual shuffle, then a pass that makes consecutive
///                 examples' modulator buckets run `0, 1, .., n-1, 0, 1, ..`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShuffleMode {
    None,
    #[default]
    Stride,
    Alternate,
}

/// Backing buffer: owned by a top-level set, borrowed by its sub-views.
enum Storage<'a> {
    Owned(RefCell<Vec<f64>>),
    Shared(&'a RefCell<Vec<f64>>),
}

impl Storage<'_> {
    fn cell(&self) -> &RefCell<Vec<f64>> {
        match self {
            Storage::Owned(cell) => cell,
            Storage::Shared(cell) => *cell,
        }
    }
}

/// A set of examples, each holding `ninputs` inputs, `noutputs` outputs and
/// one modulator value `h`.
///
/// All example data lives in one flat buffer, `ninputs + noutputs + 1`
/// scalars per example.  Logical positions map to buffer slots through a
/// separate ordering array, so shuffling never moves example data.  A
/// sub-view (see [`ExampleSet::sub_view`]) shares its parent's buffer but
/// owns its ordering: writes go through to the parent, reordering does not.
pub struct ExampleSet<'a> {
    data: Storage<'a>,
    order: Vec<usize>,
    ninputs: usize,
    noutputs: usize,
    num_h_levels: usize,
    min_h: f64,
    max_h: f64,
}

impl ExampleSet<'static> {
    /// Allocates a zero-filled set of `count` examples.
    ///
    /// `num_h_levels` is the number of distinct modulator levels the data
    /// will hold; it is only consulted by [`ShuffleMode::Stride`] and
    /// [`ShuffleMode::Alternate`].
    pub fn new(
        count: usize,
        ninputs: usize,
        noutputs: usize,
        num_h_levels: usize,
    ) -> Result<ExampleSet<'static>> {
        if count == 0 || ninputs == 0 || noutputs == 0 || num_h_levels == 0 {
            return Err(NetError::Config(format!(
                "example set dimensions must be non-zero \
                 (count={}, inputs={}, outputs={}, h levels={})",
                count, ninputs, noutputs, num_h_levels
            )));
        }
        let stride = ninputs + noutputs + 1;
        Ok(ExampleSet {
            data: Storage::Owned(RefCell::new(vec![0.0; stride * count])),
            order: (0..count).collect(),
            ninputs,
            noutputs,
            num_h_levels,
            min_h: 0.0,
            max_h: 1.0,
        })
    }

    /// Builds a set from a labelled-image source: pixels scaled to [0, 1]
    /// as inputs, the label one-hot encoded over `max_label + 1` outputs,
    /// and every modulator fixed at 0 with a single level.
    pub fn from_images<S: LabelledImages + ?Sized>(src: &S) -> Result<ExampleSet<'static>> {
        let ninputs = src.rows() * src.cols();
        let noutputs = src.max_label() as usize + 1;
        let mut set = ExampleSet::new(src.count(), ninputs, noutputs, 1)?;

        for i in 0..src.count() {
            {
                let mut ins = set.inputs_mut(i);
                for (dst, &px) in ins.iter_mut().zip(src.pixels(i)) {
                    *dst = px as f64 / 255.0;
                }
            }
            {
                let mut outs = set.outputs_mut(i);
                outs.iter_mut().for_each(|o| *o = 0.0);
                outs[src.label(i) as usize] = 1.0;
            }
            set.set_h(i, 0.0);
        }
        Ok(set)
    }
}

impl<'a> ExampleSet<'a> {
    /// Creates a view of `length` examples of this set, starting at logical
    /// position `start`.  The view reads and writes this set's data but can
    /// be reordered independently of it.
    pub fn sub_view(&self, start: usize, length: usize) -> Result<ExampleSet<'_>> {
        let end = start.checked_add(length);
        if length < 1 || end.map_or(true, |e| e > self.count()) {
            return Err(NetError::Range(format!(
                "sub-view [{}, +{}) does not fit in a set of {} examples",
                start,
                length,
                self.count()
            )));
        }
        Ok(ExampleSet {
            data: Storage::Shared(self.data.cell()),
            order: self.order[start..start + length].to_vec(),
            ninputs: self.ninputs,
            noutputs: self.noutputs,
            num_h_levels: self.num_h_levels,
            min_h: self.min_h,
            max_h: self.max_h,
        })
    }

    pub fn count(&self) -> usize {
        self.order.len()
    }

    pub fn input_count(&self) -> usize {
        self.ninputs
    }

    pub fn output_count(&self) -> usize {
        self.noutputs
    }

    pub fn num_h_levels(&self) -> usize {
        self.num_h_levels
    }

    /// Sets the modulator domain used to bucket `h` for alternation.
    /// Stored `h` values are left alone.
    pub fn set_h_range(&mut self, min: f64, max: f64) {
        self.min_h = min;
        self.max_h = max;
    }

    pub fn h_range(&self) -> (f64, f64) {
        (self.min_h, self.max_h)
    }

    fn stride(&self) -> usize {
        self.ninputs + self.noutputs + 1
    }

    /// Buffer offset of the example at logical position `example`.
    fn base(&self, example: usize) -> usize {
        assert!(example < self.count(), "example {} out of range", example);
        self.order[example] * self.stride()
    }

    pub fn inputs(&self, example: usize) -> Ref<'_, [f64]> {
        let b = self.base(example);
        let n = self.ninputs;
        Ref::map(self.data.cell().borrow(), |d| &d[b..b + n])
    }

    pub fn inputs_mut(&mut self, example: usize) -> RefMut<'_, [f64]> {
        let b = self.base(example);
        let n = self.ninputs;
        RefMut::map(self.data.cell().borrow_mut(), |d| &mut d[b..b + n])
    }

    pub fn outputs(&self, example: usize) -> Ref<'_, [f64]> {
        let b = self.base(example) + self.ninputs;
        let n = self.noutputs;
        Ref::map(self.data.cell().borrow(), |d| &d[b..b + n])
    }

    pub fn outputs_mut(&mut self, example: usize) -> RefMut<'_, [f64]> {
        let b = self.base(example) + self.ninputs;
        let n = self.noutputs;
        RefMut::map(self.data.cell().borrow_mut(), |d| &mut d[b..b + n])
    }

    pub fn h(&self, example: usize) -> f64 {
        let at = self.base(example) + self.ninputs + self.noutputs;
        self.data.cell().borrow()[at]
    }

    pub fn set_h(&mut self, example: usize, h: f64) {
        let at = self.base(example) + self.ninputs + self.noutputs;
        self.data.cell().borrow_mut()[at] = h;
    }

    /// Writes a whole example at logical position `example`.
    pub fn set_example(&mut self, example: usize, inputs: &[f64], outputs: &[f64], h: f64) {
        self.inputs_mut(example).copy_from_slice(inputs);
        self.outputs_mut(example).copy_from_slice(outputs);
        self.set_h(example, h);
    }

    /// Modulator bucket of `h`: `floor((h − min)/(max − min) · (levels − 1))`.
    fn bucket_of(h: f64, min: f64, max: f64, levels: usize) -> usize {
        let b = ((h - min) / (max - min) * (levels - 1) as f64).floor();
        if b.is_finite() && b > 0.0 {
            b as usize
        } else {
            0
        }
    }

    /// Modulator bucket of the example at logical position `example`.
    pub fn h_bucket(&self, example: usize) -> usize {
        Self::bucket_of(self.h(example), self.min_h, self.max_h, self.num_h_levels)
    }

    /// Reorders the logical positions of this set.  Only the ordering array
    /// moves; neither the data buffer nor a parent's ordering is touched.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R, mode: ShuffleMode) {
        match mode {
            ShuffleMode::None => self.order.shuffle(rng),
            ShuffleMode::Stride => self.shuffle_blocks(rng),
            ShuffleMode::Alternate => {
                self.order.shuffle(rng);
                let h_at = self.ninputs + self.noutputs;
                let stride = self.stride();
                let (min, max, levels) = (self.min_h, self.max_h, self.num_h_levels);
                let data = self.data.cell().borrow();
                alternate(&mut self.order, levels, |&ex| {
                    Self::bucket_of(data[ex * stride + h_at], min, max, levels)
                });
            }
        }
    }

    /// Shuffles whole blocks of `num_h_levels` examples.  A trailing partial
    /// block, if the count is not a multiple of the level count, stays put.
    fn shuffle_blocks<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let k = self.num_h_levels;
        let nblocks = self.count() / k;
        let mut blocks: Vec<usize> = (0..nblocks).collect();
        blocks.shuffle(rng);

        let mut order = Vec::with_capacity(self.count());
        for b in blocks {
            order.extend_from_slice(&self.order[b * k..(b + 1) * k]);
        }
        order.extend_from_slice(&self.order[nblocks * k..]);
        self.order = order;
    }
}

/// Rearranges `items` in place so that `key` runs `0, 1, .., cycle-1, 0, ..`.
///
/// Scans left to right; a mismatching item is swapped with the first later
/// item carrying the wanted key.  When none is left the pass stops and the
/// rest of the slice is left as it is.
pub fn alternate<T, F>(items: &mut [T], cycle: usize, key: F)
where
    F: Fn(&T) -> usize,
{
    for i in 0..items.len() {
        let wanted = i % cycle;
        if key(&items[i]) == wanted {
            continue;
        }
        match (i + 1..items.len()).find(|&j| key(&items[j]) == wanted) {
            Some(j) => items.swap(i, j),
            None => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// 10 examples, 5 inputs, 2 outputs: input j of example i is i*10+j,
    /// output j is i*20+j and h is i*1000.
    fn numbered_set() -> ExampleSet<'static> {
        let mut e = ExampleSet::new(10, 5, 2, 2).unwrap();
        for i in 0..e.count() {
            let ins: Vec<f64> = (0..5).map(|j| (i * 10 + j) as f64).collect();
            let outs: Vec<f64> = (0..2).map(|j| (i * 20 + j) as f64).collect();
            e.set_example(i, &ins, &outs, (i * 1000) as f64);
        }
        e
    }

    #[test]
    fn values_read_back() {
        let e = numbered_set();
        for i in 0..e.count() {
            for (j, v) in e.inputs(i).iter().enumerate() {
                assert_eq!(*v, (i * 10 + j) as f64);
            }
            for (j, v) in e.outputs(i).iter().enumerate() {
                assert_eq!(*v, (i * 20 + j) as f64);
            }
            assert_eq!(e.h(i), (i * 1000) as f64);
        }
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(matches!(ExampleSet::new(0, 1, 1, 1), Err(NetError::Config(_))));
        assert!(matches!(ExampleSet::new(4, 1, 1, 0), Err(NetError::Config(_))));
    }

    #[test]
    fn sub_view_bounds() {
        let parent = numbered_set();
        assert!(matches!(parent.sub_view(5, 6), Err(NetError::Range(_))));
        assert!(matches!(parent.sub_view(11, 6), Err(NetError::Range(_))));
        assert!(matches!(parent.sub_view(0, 0), Err(NetError::Range(_))));
        assert!(matches!(parent.sub_view(usize::MAX, 2), Err(NetError::Range(_))));
        assert!(parent.sub_view(5, 5).is_ok());
    }

    #[test]
    fn sub_view_writes_reach_parent() {
        let parent = numbered_set();
        {
            let mut view = parent.sub_view(5, 5).unwrap();
            view.set_h(0, -1.0);
            view.outputs_mut(1)[0] = 42.0;
        }
        assert_eq!(parent.h(5), -1.0);
        assert_eq!(parent.outputs(6)[0], 42.0);
    }

    #[test]
    fn sub_view_shuffle_keeps_parent_order() {
        let parent = numbered_set();
        let mut view = parent.sub_view(0, 10).unwrap();
        view.shuffle(&mut StdRng::seed_from_u64(3), ShuffleMode::None);
        for i in 0..parent.count() {
            assert_eq!(parent.h(i), (i * 1000) as f64);
        }
    }

    #[test]
    fn alternate_odd_even() {
        let mut arr: Vec<usize> = (0..100).collect();
        arr.shuffle(&mut StdRng::seed_from_u64(10));
        alternate(&mut arr, 2, |v| v % 2);

        let mut seen = [false; 100];
        for (i, &n) in arr.iter().enumerate() {
            assert!(!seen[n]);
            seen[n] = true;
            assert_eq!(n % 2, i % 2);
        }
    }

    #[test]
    fn alternate_stops_when_a_bucket_runs_out() {
        // three 0s, one 1: positions 0..=2 can alternate, the rest cannot
        let mut arr = vec![0, 0, 0, 1];
        alternate(&mut arr, 2, |v| *v);
        assert_eq!(arr, vec![0, 1, 0, 0]);
    }

    #[test]
    fn bucket_uses_h_range() {
        let mut e = ExampleSet::new(3, 1, 1, 3).unwrap();
        assert_eq!(e.h_range(), (0.0, 1.0));
        e.set_h(0, 0.0);
        e.set_h(1, 5.0);
        e.set_h(2, 10.0);
        e.set_h_range(0.0, 10.0);
        assert_eq!(e.h_range(), (0.0, 10.0));
        assert_eq!(e.h_bucket(0), 0);
        assert_eq!(e.h_bucket(1), 1);
        assert_eq!(e.h_bucket(2), 2);
        assert_eq!(e.h(2), 10.0);
    }
}
