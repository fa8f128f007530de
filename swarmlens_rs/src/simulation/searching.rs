//! Instrumented searching references.

use crate::error::SimulationError;

use super::{
    Algorithm, DEFAULT_SEARCH_INPUT, DEFAULT_SEARCH_TARGET, Frame, FrameRecorder, Halt,
    SearchingFrame,
};

/// Pick the array and target. Binary search needs sorted input, so custom
/// data is sorted first. Without an explicit target, custom data is searched
/// for its middle element.
pub(super) fn resolve_input(
    data: Option<Vec<i64>>,
    target: Option<i64>,
) -> Result<(Vec<i64>, i64), SimulationError> {
    match data {
        None => Ok((
            DEFAULT_SEARCH_INPUT.to_vec(),
            target.unwrap_or(DEFAULT_SEARCH_TARGET),
        )),
        Some(values) if values.is_empty() => Err(SimulationError::InvalidInput(
            "searching needs at least one element".into(),
        )),
        Some(mut values) => {
            values.sort_unstable();
            let target = target.unwrap_or(values[values.len() / 2]);
            Ok((values, target))
        }
    }
}

struct Probe<'a> {
    array: &'a [i64],
    target: i64,
    left: i64,
    right: i64,
    mid: Option<usize>,
    found: Option<usize>,
}

impl Probe<'_> {
    fn frame(self, step: usize, message: String) -> Frame {
        Frame::Searching(SearchingFrame {
            step,
            array: self.array.to_vec(),
            left: self.left,
            right: self.right,
            mid: self.mid,
            found: self.found,
            target: self.target,
            message,
        })
    }
}

fn record(rec: &mut FrameRecorder<'_>, probe: Probe<'_>, message: String) -> Result<(), Halt> {
    rec.push(|step| probe.frame(step, message))
}

/// Hit or miss; always kept even when the frame cap was reached.
fn conclude(rec: &mut FrameRecorder<'_>, probe: Probe<'_>, message: String) -> Result<(), Halt> {
    rec.push_final(|step| probe.frame(step, message))
}

pub(super) fn run(
    algorithm: Algorithm,
    rec: &mut FrameRecorder<'_>,
    array: Vec<i64>,
    target: i64,
) -> Result<(), Halt> {
    match algorithm {
        Algorithm::BinarySearch => binary(rec, &array, target),
        _ => linear(rec, &array, target),
    }
}

fn linear(rec: &mut FrameRecorder<'_>, array: &[i64], target: i64) -> Result<(), Halt> {
    for (idx, value) in array.iter().enumerate() {
        let pos = idx as i64;
        let probe = Probe {
            array,
            target,
            left: pos,
            right: pos,
            mid: Some(idx),
            found: None,
        };
        record(rec, probe, format!("Checking element {value} at index {idx}"))?;
        rec.counters.comparisons += 1;
        if *value == target {
            let hit = Probe {
                array,
                target,
                left: pos,
                right: pos,
                mid: Some(idx),
                found: Some(idx),
            };
            return conclude(rec, hit, format!("Found target {target} at index {idx}"));
        }
    }
    let end = array.len() as i64;
    let miss = Probe {
        array,
        target,
        left: end,
        right: end - 1,
        mid: None,
        found: None,
    };
    conclude(rec, miss, format!("Target {target} not found"))
}

fn binary(rec: &mut FrameRecorder<'_>, array: &[i64], target: i64) -> Result<(), Halt> {
    let mut left: i64 = 0;
    let mut right: i64 = array.len() as i64 - 1;
    while left <= right {
        let mid = ((left + right) / 2) as usize;
        let value = array[mid];
        let probe = Probe {
            array,
            target,
            left,
            right,
            mid: Some(mid),
            found: None,
        };
        record(rec, probe, format!("Checking middle element: {value}"))?;
        rec.counters.comparisons += 1;
        if value == target {
            let hit = Probe {
                array,
                target,
                left,
                right,
                mid: Some(mid),
                found: Some(mid),
            };
            return conclude(rec, hit, format!("Found target {target} at index {mid}"));
        }
        if value < target {
            left = mid as i64 + 1;
        } else {
            right = mid as i64 - 1;
        }
    }
    let miss = Probe {
        array,
        target,
        left,
        right,
        mid: None,
        found: None,
    };
    conclude(rec, miss, format!("Target {target} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::simulation::{InputData, SimulationRequest, Unbounded, Visualization, simulate};

    fn search(alg: Algorithm, target: Option<i64>) -> Visualization {
        let request = SimulationRequest::new(alg).with_input(InputData {
            target,
            ..InputData::default()
        });
        simulate(&request, &SimulationConfig::default(), &Unbounded).expect("searches")
    }

    fn frames(vis: &Visualization) -> Vec<&SearchingFrame> {
        vis.frames
            .iter()
            .map(|f| match f {
                Frame::Searching(frame) => frame,
                other => panic!("expected searching frame, got {other:?}"),
            })
            .collect()
    }

    #[test]
    fn binary_search_finds_34_at_index_4() {
        let vis = search(Algorithm::BinarySearch, Some(34));
        let frames = frames(&vis);
        assert_eq!(frames.last().and_then(|f| f.found), Some(4));
        assert_eq!(vis.target, Some(34));

        for pair in frames.windows(2) {
            assert!(pair[1].left >= pair[0].left, "left moved backwards");
            assert!(pair[1].right <= pair[0].right, "right moved forwards");
        }
    }

    #[test]
    fn binary_search_default_target() {
        let vis = search(Algorithm::BinarySearch, None);
        let frames = frames(&vis);
        assert_eq!(vis.target, Some(25));
        assert_eq!(frames.last().and_then(|f| f.found), Some(3));
        assert_eq!(vis.metrics.comparisons, 1);
    }

    #[test]
    fn exhausted_search_leaves_found_unset() {
        let vis = search(Algorithm::BinarySearch, Some(13));
        let last = *frames(&vis).last().expect("terminal frame");
        assert_eq!(last.found, None);
        assert!(last.left > last.right);
        assert!(last.message.contains("not found"));
    }

    #[test]
    fn linear_search_probes_every_element_until_hit() {
        let vis = search(Algorithm::LinearSearch, Some(34));
        // five probes (indices 0..=4) plus the terminal frame
        assert_eq!(vis.frames.len(), 6);
        assert_eq!(vis.metrics.comparisons, 5);
        assert_eq!(frames(&vis).last().and_then(|f| f.found), Some(4));
    }

    #[test]
    fn custom_data_is_sorted_and_targets_middle() {
        let (data, target) = resolve_input(Some(vec![9, 1, 5]), None).expect("valid");
        assert_eq!(data, vec![1, 5, 9]);
        assert_eq!(target, 5);
        assert!(resolve_input(Some(Vec::new()), Some(1)).is_err());
    }

    #[test]
    fn capped_linear_search_still_ends_on_the_hit() {
        let limits = SimulationConfig {
            max_frames: 3,
            ..SimulationConfig::default()
        };
        let request = SimulationRequest::new(Algorithm::LinearSearch).with_input(InputData {
            target: Some(90),
            ..InputData::default()
        });
        let vis = simulate(&request, &limits, &Unbounded).expect("searches");
        let frames = frames(&vis);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2].step, 2);
        assert_eq!(frames[2].found, Some(6));
        assert_eq!(vis.metrics.comparisons, 7);
    }
}
