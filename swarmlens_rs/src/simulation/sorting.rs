//! Instrumented sorting references.
//!
//! Every comparison and every swap/write records a frame whose index sets
//! contain exactly the touched positions. The last frame marks the whole
//! range as sorted.

use std::collections::BTreeSet;

use super::{Algorithm, Frame, FrameRecorder, Halt, SortingFrame};

struct Sorter<'r, 'g> {
    rec: &'r mut FrameRecorder<'g>,
    a: Vec<i64>,
    sorted: BTreeSet<usize>,
}

impl Sorter<'_, '_> {
    fn frame(
        &mut self,
        comparing: &[usize],
        swapping: &[usize],
        message: String,
    ) -> Result<(), Halt> {
        let array = &self.a;
        let sorted = &self.sorted;
        self.rec.push(|step| {
            Frame::Sorting(SortingFrame {
                step,
                array: array.clone(),
                comparing: comparing.iter().copied().collect(),
                swapping: swapping.iter().copied().collect(),
                sorted: sorted.clone(),
                message,
            })
        })
    }

    /// Records the comparison and returns `a[i] > a[j]`.
    fn greater(&mut self, i: usize, j: usize) -> Result<bool, Halt> {
        let (x, y) = (self.a[i], self.a[j]);
        self.frame(&[i, j], &[], format!("Comparing {x} and {y}"))?;
        self.rec.counters.comparisons += 1;
        Ok(x > y)
    }

    fn swap(&mut self, i: usize, j: usize) -> Result<(), Halt> {
        self.a.swap(i, j);
        let (x, y) = (self.a[i], self.a[j]);
        self.frame(&[], &[i, j], format!("Swapped {y} and {x}"))?;
        self.rec.counters.swaps += 1;
        Ok(())
    }

    fn write(&mut self, k: usize, value: i64) -> Result<(), Halt> {
        self.a[k] = value;
        self.frame(&[], &[k], format!("Writing {value} at index {k}"))?;
        self.rec.counters.writes += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Halt> {
        self.sorted = (0..self.a.len()).collect();
        let array = &self.a;
        let sorted = &self.sorted;
        self.rec.push_final(|step| {
            Frame::Sorting(SortingFrame {
                step,
                array: array.clone(),
                comparing: BTreeSet::new(),
                swapping: BTreeSet::new(),
                sorted: sorted.clone(),
                message: "Array sorted".to_string(),
            })
        })
    }
}

pub(super) fn run(
    algorithm: Algorithm,
    rec: &mut FrameRecorder<'_>,
    input: Vec<i64>,
) -> Result<(), Halt> {
    let mut s = Sorter {
        rec,
        a: input,
        sorted: BTreeSet::new(),
    };
    match algorithm {
        Algorithm::BubbleSort => bubble(&mut s)?,
        Algorithm::SelectionSort => selection(&mut s)?,
        Algorithm::InsertionSort => insertion(&mut s)?,
        Algorithm::MergeSort => {
            let n = s.a.len();
            merge_sort(&mut s, 0, n)?;
        }
        Algorithm::QuickSort => {
            let n = s.a.len();
            quick(&mut s, 0, n as isize - 1)?;
        }
        Algorithm::HeapSort => heap(&mut s)?,
        _ => {}
    }
    s.finish()
}

/// Reference bubble sort without the early-exit optimisation.
fn bubble(s: &mut Sorter<'_, '_>) -> Result<(), Halt> {
    let n = s.a.len();
    for i in 0..n.saturating_sub(1) {
        for j in 0..n - 1 - i {
            if s.greater(j, j + 1)? {
                s.swap(j, j + 1)?;
            }
        }
        s.sorted.insert(n - 1 - i);
    }
    Ok(())
}

fn selection(s: &mut Sorter<'_, '_>) -> Result<(), Halt> {
    let n = s.a.len();
    for i in 0..n.saturating_sub(1) {
        let mut min = i;
        for j in i + 1..n {
            if s.greater(min, j)? {
                min = j;
            }
        }
        if min != i {
            s.swap(i, min)?;
        }
        s.sorted.insert(i);
    }
    Ok(())
}

fn insertion(s: &mut Sorter<'_, '_>) -> Result<(), Halt> {
    for i in 1..s.a.len() {
        let mut j = i;
        while j > 0 && s.greater(j - 1, j)? {
            s.swap(j - 1, j)?;
            j -= 1;
        }
    }
    Ok(())
}

/// Top-down merge sort over `[lo, hi)`, merging through an auxiliary buffer.
fn merge_sort(s: &mut Sorter<'_, '_>, lo: usize, hi: usize) -> Result<(), Halt> {
    if hi - lo < 2 {
        return Ok(());
    }
    let mid = lo + (hi - lo) / 2;
    merge_sort(s, lo, mid)?;
    merge_sort(s, mid, hi)?;

    let buffer: Vec<i64> = s.a[lo..hi].to_vec();
    s.rec.allocate(buffer.len());
    let (mut i, mut j, mut k) = (lo, mid, lo);
    while i < mid && j < hi {
        let (left, right) = (buffer[i - lo], buffer[j - lo]);
        s.frame(&[i, j], &[], format!("Comparing {left} and {right}"))?;
        s.rec.counters.comparisons += 1;
        if left <= right {
            s.write(k, left)?;
            i += 1;
        } else {
            s.write(k, right)?;
            j += 1;
        }
        k += 1;
    }
    for idx in i..mid {
        s.write(k, buffer[idx - lo])?;
        k += 1;
    }
    for idx in j..hi {
        s.write(k, buffer[idx - lo])?;
        k += 1;
    }
    s.rec.release(buffer.len());
    Ok(())
}

/// Lomuto partition quicksort over `[lo, hi]`.
fn quick(s: &mut Sorter<'_, '_>, lo: isize, hi: isize) -> Result<(), Halt> {
    if lo > hi {
        return Ok(());
    }
    let (lo_u, hi_u) = (lo as usize, hi as usize);
    if lo == hi {
        s.sorted.insert(lo_u);
        return Ok(());
    }
    let mut store = lo_u;
    for j in lo_u..hi_u {
        // a[j] < pivot  <=>  pivot > a[j]
        if s.greater(hi_u, j)? {
            if store != j {
                s.swap(store, j)?;
            }
            store += 1;
        }
    }
    if store != hi_u {
        s.swap(store, hi_u)?;
    }
    s.sorted.insert(store);
    let p = store as isize;
    quick(s, lo, p - 1)?;
    quick(s, p + 1, hi)
}

fn heap(s: &mut Sorter<'_, '_>) -> Result<(), Halt> {
    let n = s.a.len();
    for root in (0..n / 2).rev() {
        sift_down(s, root, n)?;
    }
    for end in (1..n).rev() {
        s.swap(0, end)?;
        s.sorted.insert(end);
        sift_down(s, 0, end)?;
    }
    Ok(())
}

fn sift_down(s: &mut Sorter<'_, '_>, mut root: usize, len: usize) -> Result<(), Halt> {
    loop {
        let mut child = 2 * root + 1;
        if child >= len {
            return Ok(());
        }
        if child + 1 < len && s.greater(child + 1, child)? {
            child += 1;
        }
        if !s.greater(child, root)? {
            return Ok(());
        }
        s.swap(root, child)?;
        root = child;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::simulation::{
        DEFAULT_SORT_INPUT, InputData, SimulationRequest, Unbounded, Visualization, simulate,
    };

    fn sort(alg: Algorithm, data: &[i64]) -> Visualization {
        let request = SimulationRequest::new(alg).with_input(InputData {
            data: Some(data.to_vec()),
            ..InputData::default()
        });
        simulate(&request, &SimulationConfig::default(), &Unbounded).expect("sorts")
    }

    fn last_sorting(vis: &Visualization) -> &SortingFrame {
        match vis.frames.last() {
            Some(Frame::Sorting(frame)) => frame,
            other => panic!("expected sorting frame, got {other:?}"),
        }
    }

    #[test]
    fn bubble_sort_reference_counts() {
        let vis = sort(Algorithm::BubbleSort, &DEFAULT_SORT_INPUT);
        assert_eq!(vis.metrics.comparisons, 21);
        assert_eq!(vis.metrics.swaps, Some(14));
        assert_eq!(vis.frames.len(), 21 + 14 + 1);

        let last = last_sorting(&vis);
        assert_eq!(last.array, vec![11, 12, 22, 25, 34, 64, 90]);
        assert_eq!(last.sorted, (0..7).collect());
    }

    #[test]
    fn frames_mark_only_touched_indices() {
        let vis = sort(Algorithm::BubbleSort, &DEFAULT_SORT_INPUT);
        let Frame::Sorting(first) = &vis.frames[0] else {
            panic!("sorting frame expected");
        };
        assert_eq!(first.comparing, BTreeSet::from([0, 1]));
        assert!(first.swapping.is_empty());

        let Frame::Sorting(second) = &vis.frames[1] else {
            panic!("sorting frame expected");
        };
        // 64 > 34, so the second frame is the swap
        assert_eq!(second.swapping, BTreeSet::from([0, 1]));
        assert_eq!(second.array[..2], [34, 64]);
    }

    #[test]
    fn every_sort_sorts() {
        let data = [5, -2, 9, 9, 0, 3, 7, 1];
        let mut expected = data.to_vec();
        expected.sort();
        for alg in [
            Algorithm::BubbleSort,
            Algorithm::SelectionSort,
            Algorithm::InsertionSort,
            Algorithm::MergeSort,
            Algorithm::QuickSort,
            Algorithm::HeapSort,
        ] {
            let vis = sort(alg, &data);
            assert_eq!(last_sorting(&vis).array, expected, "{alg} left input unsorted");
            assert!(vis.metrics.comparisons > 0, "{alg} counted no comparisons");
        }
    }

    #[test]
    fn merge_sort_counts_writes_not_swaps() {
        let vis = sort(Algorithm::MergeSort, &DEFAULT_SORT_INPUT);
        assert_eq!(vis.metrics.swaps, Some(0));
        assert!(vis.metrics.writes.is_some_and(|w| w > 0));
    }

    #[test]
    fn single_element_yields_only_final_frame() {
        let vis = sort(Algorithm::QuickSort, &[42]);
        assert_eq!(vis.frames.len(), 1);
        assert_eq!(last_sorting(&vis).sorted, BTreeSet::from([0]));
    }
}
