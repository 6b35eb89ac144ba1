//! Time → frame pair resolution.
//!
//! Given a playback time and a track's ascending timestamps, find the two
//! cached frames that bracket it and how far between them the time lies.
//!
//! Backward playback returns the same bracketing window with the pair
//! reversed and the factor inverted, so `lerp(frame_a, frame_b, factor)` is
//! correct in both directions without the caller branching on direction.

/// How many neighbouring intervals the cursor checks before falling back to
/// a binary search.
const MAX_SCAN_OFFSET: usize = 3;

/// Two frames and the interpolation factor between them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramePair {
    pub frame_a: usize,
    pub frame_b: usize,
    /// 0.0 => exactly at `frame_a`, 1.0 => exactly at `frame_b`
    pub factor: f32,
}

impl FramePair {
    #[inline]
    #[must_use]
    pub fn exact(frame: usize) -> Self {
        Self {
            frame_a: frame,
            frame_b: frame,
            factor: 0.0,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.frame_a == self.frame_b
    }

    /// The frame the factor is closer to; ties go to `frame_b`.
    #[inline]
    #[must_use]
    pub fn nearest(&self) -> usize {
        if self.factor < 0.5 {
            self.frame_a
        } else {
            self.frame_b
        }
    }

    #[must_use]
    fn reversed(self) -> Self {
        if self.is_exact() {
            return self;
        }
        Self {
            frame_a: self.frame_b,
            frame_b: self.frame_a,
            factor: 1.0 - self.factor,
        }
    }
}

/// Remembers where the last lookup landed, for O(1) steady playback.
#[derive(Debug, Clone, Default)]
pub struct FrameCursor {
    pub last_index: usize,
}

/// Reduces `time` into `[0, duration)` when looping; unchanged otherwise.
#[must_use]
pub fn wrap_time(time: f32, looping: bool, duration: f32) -> f32 {
    if !looping || duration <= 0.0 {
        return time;
    }
    let wrapped = time.rem_euclid(duration);
    // rem_euclid can round up to `duration` for tiny negative inputs
    if wrapped >= duration { 0.0 } else { wrapped }
}

/// Stateless resolution by binary search. Returns `None` for an empty table.
#[must_use]
pub fn resolve(time: f32, looping: bool, backward: bool, times: &[f32]) -> Option<FramePair> {
    let last = times.len().checked_sub(1)?;
    if last == 0 {
        return Some(FramePair::exact(0));
    }
    let t = wrap_time(time, looping, times[last]);
    let index = times.partition_point(|&x| x <= t).saturating_sub(1);
    Some(orient(bracket(times, t, index), backward))
}

/// Same result as [`resolve`], but scans a few intervals around the cursor
/// first and only binary-searches on large jumps.
pub fn resolve_with_cursor(
    time: f32,
    looping: bool,
    backward: bool,
    times: &[f32],
    cursor: &mut FrameCursor,
) -> Option<FramePair> {
    let last = times.len().checked_sub(1)?;
    if last == 0 {
        cursor.last_index = 0;
        return Some(FramePair::exact(0));
    }
    let t = wrap_time(time, looping, times[last]);

    let i = cursor.last_index.min(last);
    let found = if t >= times[i] {
        // Forward playback: check [i, i+1), [i+1, i+2) ...
        let mut res = None;
        for offset in 0..=MAX_SCAN_OFFSET {
            let idx = i + offset;
            if idx >= last {
                res = Some(last);
                break;
            }
            if t < times[idx + 1] {
                res = Some(idx);
                break;
            }
        }
        res
    } else {
        // Backward playback or loop wrap
        let mut res = None;
        for offset in 1..=MAX_SCAN_OFFSET {
            if i < offset {
                res = Some(0);
                break;
            }
            let idx = i - offset;
            if t >= times[idx] {
                res = Some(idx);
                break;
            }
        }
        res
    };

    let index =
        found.unwrap_or_else(|| times.partition_point(|&x| x <= t).saturating_sub(1));
    cursor.last_index = index;
    Some(orient(bracket(times, t, index), backward))
}

/// Forward pair for `t`, where `index` is the last timestamp `<= t` (or 0).
fn bracket(times: &[f32], t: f32, index: usize) -> FramePair {
    let last = times.len() - 1;
    if t <= times[0] {
        return FramePair::exact(0);
    }
    if t >= times[last] {
        if t == times[last] {
            return FramePair::exact(last);
        }
        return FramePair {
            frame_a: last,
            frame_b: last,
            factor: 1.0,
        };
    }

    let t0 = times[index];
    if t == t0 {
        return FramePair::exact(index);
    }
    let t1 = times[index + 1];
    let dt = t1 - t0;
    let factor = if dt > 1e-6 { (t - t0) / dt } else { 0.0 };
    FramePair {
        frame_a: index,
        frame_b: index + 1,
        factor: factor.clamp(0.0, 1.0),
    }
}

fn orient(pair: FramePair, backward: bool) -> FramePair {
    if backward { pair.reversed() } else { pair }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn empty_table_has_no_pair() {
        assert!(resolve(0.0, false, false, &[]).is_none());
        assert!(resolve_with_cursor(0.0, true, false, &[], &mut FrameCursor::default()).is_none());
    }

    #[test]
    fn single_sample_is_always_exact() {
        for t in [-1.0, 0.0, 0.5, 10.0] {
            for looping in [false, true] {
                for backward in [false, true] {
                    assert_eq!(
                        resolve(t, looping, backward, &[0.25]),
                        Some(FramePair::exact(0))
                    );
                }
            }
        }
    }

    #[test]
    fn forward_pair_interpolates_times() {
        let times = [0.0, 0.5, 1.25, 2.0];
        for step in 0..200 {
            let t = step as f32 * 0.01;
            let pair = resolve(t, false, false, &times).unwrap();
            assert!(pair.frame_a <= pair.frame_b);
            assert!((0.0..=1.0).contains(&pair.factor));
            let lerped =
                times[pair.frame_a] + (times[pair.frame_b] - times[pair.frame_a]) * pair.factor;
            assert!(approx(lerped, t), "t={t} pair={pair:?}");
        }
    }

    #[test]
    fn exact_hit_has_zero_factor() {
        let pair = resolve(1.0, false, false, &[0.0, 1.0, 2.0]).unwrap();
        assert_eq!(pair, FramePair::exact(1));
    }

    #[test]
    fn clamps_past_the_end_without_looping() {
        let pair = resolve(5.0, false, false, &[0.0, 1.0, 2.0]).unwrap();
        assert_eq!((pair.frame_a, pair.frame_b), (2, 2));
        assert!(approx(pair.factor, 1.0));

        let before = resolve(-3.0, false, false, &[0.0, 1.0, 2.0]).unwrap();
        assert_eq!(before, FramePair::exact(0));
    }

    #[test]
    fn looping_wraps_including_negative_times() {
        let times = [0.0, 1.0, 2.0];
        for t in [0.3_f32, 1.7, 2.5, 7.9, -0.5, -4.2] {
            let wrapped = t.rem_euclid(2.0);
            assert_eq!(
                resolve(t, true, false, &times),
                resolve(wrapped, true, false, &times),
                "t={t}"
            );
        }
        assert_eq!(resolve(2.0, true, false, &times), Some(FramePair::exact(0)));
    }

    #[test]
    fn backward_reverses_pair_and_inverts_factor() {
        let times = [0.0, 1.0, 2.0];
        let forward = resolve(1.25, false, false, &times).unwrap();
        let backward = resolve(1.25, false, true, &times).unwrap();
        assert_eq!((backward.frame_a, backward.frame_b), (2, 1));
        assert!(approx(backward.factor, 1.0 - forward.factor));

        let fwd_time = times[forward.frame_a]
            + (times[forward.frame_b] - times[forward.frame_a]) * forward.factor;
        let bwd_time = times[backward.frame_a]
            + (times[backward.frame_b] - times[backward.frame_a]) * backward.factor;
        assert!(approx(fwd_time, bwd_time));

        assert_eq!(resolve(1.0, false, true, &times), Some(FramePair::exact(1)));
    }

    #[test]
    fn cursor_agrees_with_binary_search() {
        let times: Vec<f32> = (0..32).map(|i| i as f32 / 24.0).collect();
        let duration = *times.last().unwrap();
        let mut cursor = FrameCursor::default();

        // Steady forward, steady backward, then large scrubs
        let mut probes: Vec<f32> = (0..400).map(|i| i as f32 * 0.003).collect();
        probes.extend((0..400).rev().map(|i| i as f32 * 0.003));
        probes.extend([1.2, 0.01, 0.9, -0.3, 3.7, duration, 0.5]);

        for looping in [false, true] {
            for backward in [false, true] {
                for &t in &probes {
                    let expected = resolve(t, looping, backward, &times);
                    let actual = resolve_with_cursor(t, looping, backward, &times, &mut cursor);
                    assert_eq!(expected, actual, "t={t} looping={looping} backward={backward}");
                }
            }
        }
    }

    #[test]
    fn nearest_prefers_closer_frame() {
        let blend = FramePair {
            frame_a: 1,
            frame_b: 2,
            factor: 0.25,
        };
        assert_eq!(blend.nearest(), 1);
        assert_eq!(FramePair { factor: 0.5, ..blend }.nearest(), 2);
    }
}
