use anyhow::{Result, bail};

/// Display interval for one slide, in seconds from the start of playback.
/// Half-open: a slide is active for `start <= t < end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlideInterval {
    pub start: f64,
    pub end: f64,
}

impl SlideInterval {
    pub fn width(&self) -> f64 {
        self.end - self.start
    }
}

/// Derived partition of the playback duration into per-image intervals.
///
/// Always recomputed wholesale when a better audio duration estimate
/// arrives; never patched incrementally.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    intervals: Vec<SlideInterval>,
    total_duration: f64,
}

impl Timeline {
    pub fn intervals(&self) -> &[SlideInterval] {
        &self.intervals
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn slide_count(&self) -> usize {
        self.intervals.len()
    }

    /// Index of the slide active at `position`, or `None` outside
    /// `[0, total_duration)`.
    pub fn slide_at(&self, position: f64) -> Option<usize> {
        if position < 0.0 || position >= self.total_duration {
            return None;
        }
        // Intervals are contiguous and sorted, so binary search on start.
        let idx = self
            .intervals
            .partition_point(|interval| interval.start <= position);
        idx.checked_sub(1)
    }
}

/// Partitions the narration timeline evenly across `image_count` slides.
///
/// With no usable audio duration every slide gets `min_slide_seconds`.
/// When the even share would fall under the floor, the floor wins and the
/// timeline outlasts the narration; the trailing dead air is expected and
/// playback treats it as normal.
pub fn compute_timeline(
    image_count: usize,
    audio_duration: Option<f64>,
    min_slide_seconds: f64,
) -> Result<Timeline> {
    if image_count == 0 {
        bail!("cannot compute a timeline for zero images");
    }
    if !min_slide_seconds.is_finite() || min_slide_seconds <= 0.0 {
        bail!("minimum slide duration must be positive");
    }

    let slide_width = match audio_duration {
        Some(duration) if duration.is_finite() && duration > 0.0 => {
            let naive = duration / image_count as f64;
            if naive >= min_slide_seconds {
                naive
            } else {
                min_slide_seconds
            }
        }
        _ => min_slide_seconds,
    };

    let intervals: Vec<SlideInterval> = (0..image_count)
        .map(|i| SlideInterval {
            start: i as f64 * slide_width,
            end: (i + 1) as f64 * slide_width,
        })
        .collect();
    let total_duration = image_count as f64 * slide_width;

    Ok(Timeline {
        intervals,
        total_duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLOOR: f64 = 2.0;

    fn assert_contiguous(timeline: &Timeline) {
        let intervals = timeline.intervals();
        assert!((intervals[0].start - 0.0).abs() < f64::EPSILON);
        for pair in intervals.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert!(pair[0].start < pair[1].start);
        }
        assert_eq!(
            intervals.last().unwrap().end,
            timeline.total_duration()
        );
    }

    #[test]
    fn even_partition_when_audio_is_long_enough() {
        let timeline = compute_timeline(5, Some(50.0), FLOOR).unwrap();
        assert_eq!(timeline.slide_count(), 5);
        assert_eq!(timeline.total_duration(), 50.0);
        for (i, interval) in timeline.intervals().iter().enumerate() {
            assert_eq!(interval.start, i as f64 * 10.0);
            assert_eq!(interval.end, (i + 1) as f64 * 10.0);
        }
        assert_contiguous(&timeline);
    }

    #[test]
    fn floor_applies_when_audio_is_short() {
        let timeline = compute_timeline(5, Some(4.0), FLOOR).unwrap();
        assert_eq!(timeline.slide_count(), 5);
        assert_eq!(timeline.total_duration(), 10.0);
        for interval in timeline.intervals() {
            assert_eq!(interval.width(), FLOOR);
        }
    }

    #[test]
    fn unknown_duration_falls_back_to_floor() {
        for duration in [None, Some(0.0), Some(f64::NAN)] {
            let timeline = compute_timeline(3, duration, FLOOR).unwrap();
            assert_eq!(timeline.total_duration(), 6.0);
            assert_contiguous(&timeline);
        }
    }

    #[test]
    fn single_image_spans_everything() {
        let timeline = compute_timeline(1, Some(37.5), FLOOR).unwrap();
        assert_eq!(timeline.slide_count(), 1);
        assert_eq!(timeline.intervals()[0], SlideInterval { start: 0.0, end: 37.5 });
    }

    #[test]
    fn every_width_respects_the_floor() {
        for count in 1..=12 {
            for duration in [0.5, 3.0, 17.0, 120.0] {
                let timeline = compute_timeline(count, Some(duration), FLOOR).unwrap();
                assert_eq!(timeline.slide_count(), count);
                for interval in timeline.intervals() {
                    assert!(interval.width() >= FLOOR);
                }
                assert_contiguous(&timeline);
            }
        }
    }

    #[test]
    fn recomputation_is_bit_identical() {
        let a = compute_timeline(7, Some(61.3), FLOOR).unwrap();
        let b = compute_timeline(7, Some(61.3), FLOOR).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn slide_lookup_uses_interval_bounds() {
        let timeline = compute_timeline(5, Some(50.0), FLOOR).unwrap();
        assert_eq!(timeline.slide_at(0.0), Some(0));
        assert_eq!(timeline.slide_at(9.999), Some(0));
        assert_eq!(timeline.slide_at(10.0), Some(1));
        assert_eq!(timeline.slide_at(35.0), Some(3));
        assert_eq!(timeline.slide_at(49.999), Some(4));
        assert_eq!(timeline.slide_at(50.0), None);
        assert_eq!(timeline.slide_at(-1.0), None);
    }

    #[test]
    fn zero_images_is_rejected() {
        assert!(compute_timeline(0, Some(10.0), FLOOR).is_err());
        assert!(compute_timeline(3, Some(10.0), 0.0).is_err());
    }
}
