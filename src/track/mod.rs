pub mod generator;
pub mod segment;

use std::collections::VecDeque;

use crate::config::TrackConfig;
use crate::error::{invalid_config, CoreResult};
use generator::SegmentGenerator;
use segment::{SegmentType, TrackSegment};

pub(crate) fn check_geometry(count: usize, width: f32) -> CoreResult<()> {
    if !width.is_finite() || width <= 0.0 {
        return Err(invalid_config(format!(
            "segment_width must be positive (got {})",
            width
        )));
    }
    if count == 0 {
        return Err(invalid_config("segment_count must be at least 1"));
    }
    Ok(())
}

/// Fixed-length scrolling track. Segments sit `width` apart in ascending
/// position order; the head is recycled to the tail once fully off-screen.
pub struct SegmentTrack {
    segments: VecDeque<TrackSegment>,
    width: f32,
    generator: SegmentGenerator,
    /// Type the next recycled slot will take, drawn one step ahead
    upcoming: SegmentType,
    recycled: u64,
}

impl SegmentTrack {
    pub fn from_config(config: &TrackConfig) -> CoreResult<Self> {
        let generator = SegmentGenerator::new(config)?;
        Self::populate(config.segment_count, config.segment_width, generator)
    }

    /// Lay out `count` segments at `index * width`.
    pub fn populate(count: usize, width: f32, mut generator: SegmentGenerator) -> CoreResult<Self> {
        check_geometry(count, width)?;

        let segments = generator
            .initial_types(count)
            .into_iter()
            .enumerate()
            .map(|(i, kind)| TrackSegment {
                kind,
                position: i as f32 * width,
            })
            .collect();
        let upcoming = generator.next_recycled();

        Ok(Self {
            segments,
            width,
            generator,
            upcoming,
            recycled: 0,
        })
    }

    /// Scroll every segment by `speed`. Recycles at most one segment per call
    /// and returns the one appended, if any.
    pub fn tick(&mut self, speed: f32) -> Option<TrackSegment> {
        for segment in self.segments.iter_mut() {
            segment.position -= speed;
        }

        if !self.head_off_screen(0.0) {
            return None;
        }

        self.segments.pop_front();
        let position = self
            .segments
            .back()
            .map_or(0.0, |tail| tail.position + self.width);
        let next = self.generator.next_recycled();
        let segment = TrackSegment {
            kind: std::mem::replace(&mut self.upcoming, next),
            position,
        };
        self.segments.push_back(segment);
        self.recycled += 1;
        log::debug!(
            "Recycled segment -> {:?} at {:.1}",
            segment.kind,
            segment.position
        );
        Some(segment)
    }

    /// Type that `tick(speed)` would append, without scrolling.
    pub fn pending_recycle(&self, speed: f32) -> Option<SegmentType> {
        self.head_off_screen(speed).then_some(self.upcoming)
    }

    fn head_off_screen(&self, speed: f32) -> bool {
        self.segments
            .front()
            .is_some_and(|head| head.position - speed < -self.width)
    }

    pub fn segments(&self) -> impl Iterator<Item = &TrackSegment> {
        self.segments.iter()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn recycled(&self) -> u64 {
        self.recycled
    }
}
