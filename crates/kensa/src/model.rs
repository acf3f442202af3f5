//! In-memory manifest graph.
//!
//! The graph is an arena: every entity lives in a flat vector owned by [`Manifest`] and
//! refers to its parent through a typed index. Downward links (period to adaptation sets,
//! adaptation set to representations) are index lists as well, so the only owner of any
//! entity is the manifest itself.
use chrono::{DateTime, TimeDelta, Utc};

use crate::time::{saturating_add, Timescale, Timestamp};

macro_rules! arena_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(usize);
        )*
    };
}

arena_id!(
    /// Position of a [`Period`] in document order.
    PeriodId,
    AdaptationSetId,
    RepresentationId,
    TemplateId,
);

#[derive(Debug, Clone)]
pub struct Manifest {
    /// `MPD@availabilityStartTime`, the zero point every period offset is relative to.
    pub availability_start_time: Timestamp,
    pub publish_time: Option<Timestamp>,
    /// `MPD@timeShiftBufferDepth`. Content must be continuously available from
    /// `now - playback_window_length` up to `now`.
    pub playback_window_length: TimeDelta,
    /// `MPD@minimumUpdatePeriod`.
    pub manifest_refresh_interval: Option<TimeDelta>,
    /// Value of the authoritative `urn:mpeg:dash:utc:http-iso:2014` UTCTiming element.
    pub time_sync_url: Option<String>,

    periods: Vec<Period>,
    adaptation_sets: Vec<AdaptationSet>,
    representations: Vec<Representation>,
    templates: Vec<(TemplateOwner, SegmentTemplate)>,
}

#[derive(Debug, Clone)]
pub struct Period {
    pub id: Option<String>,
    /// Offset of the period start from the availability start time.
    pub start_offset_from_ast: TimeDelta,
    /// Only the last period may be unbounded. For every other period the loader derives
    /// this from the start of the next period.
    pub duration: Option<TimeDelta>,

    adaptation_sets: Vec<AdaptationSetId>,
}

#[derive(Debug, Clone)]
pub struct AdaptationSet {
    pub mime_type: Option<String>,
    /// `AdaptationSet@segmentAlignment`
    pub aligned_segments: bool,

    period: PeriodId,
    template: Option<TemplateId>,
    representations: Vec<RepresentationId>,
}

#[derive(Debug, Clone)]
pub struct Representation {
    pub id: Option<String>,

    adaptation_set: AdaptationSetId,
    template: Option<TemplateId>,
}

/// The entity a [`SegmentTemplate`] was declared on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateOwner {
    AdaptationSet(AdaptationSetId),
    Representation(RepresentationId),
}

#[derive(Debug, Clone)]
pub struct SegmentTemplate {
    pub timescale: Timescale,
    /// Ticks on the sample timeline that correspond to the period start.
    pub presentation_time_offset_ticks: u64,
    pub initialization: Option<String>,
    pub media: Option<String>,

    segments: Vec<TimelineSegment>,
}

/// One media segment of an expanded `SegmentTimeline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineSegment {
    pub start_ticks: u64,
    pub duration_ticks: u64,
}

impl TimelineSegment {
    pub fn new(start_ticks: u64, duration_ticks: u64) -> Self {
        Self {
            start_ticks,
            duration_ticks,
        }
    }

    pub fn end_ticks(&self) -> u64 {
        self.start_ticks.saturating_add(self.duration_ticks)
    }
}

/// A single timeline to verify: the segments of one template together with the
/// entity that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeline {
    pub owner: TemplateOwner,
    pub template: TemplateId,
}

impl Period {
    pub fn new(id: Option<String>, start_offset_from_ast: TimeDelta) -> Self {
        Self {
            id,
            start_offset_from_ast,
            duration: None,
            adaptation_sets: Vec::new(),
        }
    }

    pub fn adaptation_sets(&self) -> &[AdaptationSetId] {
        &self.adaptation_sets
    }
}

impl AdaptationSet {
    pub fn period(&self) -> PeriodId {
        self.period
    }

    /// Template shared by every representation of this set.
    pub fn template(&self) -> Option<TemplateId> {
        self.template
    }

    pub fn representations(&self) -> &[RepresentationId] {
        &self.representations
    }
}

impl Representation {
    pub fn adaptation_set(&self) -> AdaptationSetId {
        self.adaptation_set
    }

    /// Template declared on the representation itself.
    pub fn template(&self) -> Option<TemplateId> {
        self.template
    }
}

impl SegmentTemplate {
    pub fn new(
        timescale: Timescale,
        presentation_time_offset_ticks: u64,
        segments: Vec<TimelineSegment>,
    ) -> Self {
        Self {
            timescale,
            presentation_time_offset_ticks,
            initialization: None,
            media: None,
            segments,
        }
    }

    pub fn segments(&self) -> &[TimelineSegment] {
        &self.segments
    }

    /// Offset of a segment start from the start of the owning period.
    ///
    /// `None` when the offset is too large for a [`TimeDelta`].
    pub fn start_offset_from_period_start(&self, segment: &TimelineSegment) -> Option<TimeDelta> {
        let ticks =
            i128::from(segment.start_ticks) - i128::from(self.presentation_time_offset_ticks);
        self.timescale.to_duration(ticks)
    }

    pub fn segment_duration(&self, segment: &TimelineSegment) -> Option<TimeDelta> {
        self.timescale
            .to_duration(i128::from(segment.duration_ticks))
    }
}

impl Manifest {
    pub fn new(availability_start_time: Timestamp, playback_window_length: TimeDelta) -> Self {
        Self {
            availability_start_time,
            publish_time: None,
            playback_window_length,
            manifest_refresh_interval: None,
            time_sync_url: None,
            periods: Vec::new(),
            adaptation_sets: Vec::new(),
            representations: Vec::new(),
            templates: Vec::new(),
        }
    }

    pub fn push_period(&mut self, period: Period) -> PeriodId {
        self.periods.push(period);
        PeriodId(self.periods.len() - 1)
    }

    pub fn push_adaptation_set(
        &mut self,
        period: PeriodId,
        mime_type: Option<String>,
        aligned_segments: bool,
    ) -> AdaptationSetId {
        let id = AdaptationSetId(self.adaptation_sets.len());
        self.adaptation_sets.push(AdaptationSet {
            mime_type,
            aligned_segments,
            period,
            template: None,
            representations: Vec::new(),
        });
        self.periods[period.0].adaptation_sets.push(id);
        id
    }

    pub fn push_representation(
        &mut self,
        adaptation_set: AdaptationSetId,
        id: Option<String>,
    ) -> RepresentationId {
        let representation = RepresentationId(self.representations.len());
        self.representations.push(Representation {
            id,
            adaptation_set,
            template: None,
        });
        self.adaptation_sets[adaptation_set.0]
            .representations
            .push(representation);
        representation
    }

    /// Attach a template to its owner, replacing any template the owner had.
    pub fn attach_template(&mut self, owner: TemplateOwner, template: SegmentTemplate) -> TemplateId {
        let id = TemplateId(self.templates.len());
        self.templates.push((owner, template));
        match owner {
            TemplateOwner::AdaptationSet(set) => self.adaptation_sets[set.0].template = Some(id),
            TemplateOwner::Representation(representation) => {
                self.representations[representation.0].template = Some(id)
            }
        }
        id
    }

    pub fn periods(&self) -> impl ExactSizeIterator<Item = (PeriodId, &Period)> + '_ {
        self.periods
            .iter()
            .enumerate()
            .map(|(index, period)| (PeriodId(index), period))
    }

    pub fn first_period(&self) -> Option<PeriodId> {
        (!self.periods.is_empty()).then_some(PeriodId(0))
    }

    pub fn last_period(&self) -> Option<PeriodId> {
        self.periods.len().checked_sub(1).map(PeriodId)
    }

    pub fn period(&self, id: PeriodId) -> &Period {
        &self.periods[id.0]
    }

    pub fn period_mut(&mut self, id: PeriodId) -> &mut Period {
        &mut self.periods[id.0]
    }

    pub fn adaptation_set(&self, id: AdaptationSetId) -> &AdaptationSet {
        &self.adaptation_sets[id.0]
    }

    pub fn representation(&self, id: RepresentationId) -> &Representation {
        &self.representations[id.0]
    }

    pub fn template(&self, id: TemplateId) -> &SegmentTemplate {
        &self.templates[id.0].1
    }

    pub fn template_owner(&self, id: TemplateId) -> TemplateOwner {
        self.templates[id.0].0
    }

    // The wall-clock accessors below clamp at the ends of the representable range. The
    // loader rejects manifests that would reach them.

    pub fn period_start(&self, id: PeriodId) -> Timestamp {
        saturating_add(
            self.availability_start_time,
            self.period(id).start_offset_from_ast,
        )
    }

    /// `None` for an open-ended period.
    pub fn period_end(&self, id: PeriodId) -> Option<Timestamp> {
        self.period(id)
            .duration
            .map(|duration| saturating_add(self.period_start(id), duration))
    }

    /// Resolve the period a template belongs to through its owner.
    pub fn template_period(&self, id: TemplateId) -> PeriodId {
        let adaptation_set = match self.template_owner(id) {
            TemplateOwner::AdaptationSet(set) => set,
            TemplateOwner::Representation(representation) => {
                self.representation(representation).adaptation_set
            }
        };
        self.adaptation_set(adaptation_set).period
    }

    pub fn segment_start(&self, template: TemplateId, segment: &TimelineSegment) -> Timestamp {
        let period_start = self.period_start(self.template_period(template));
        let template = self.template(template);
        match template.start_offset_from_period_start(segment) {
            Some(offset) => saturating_add(period_start, offset),
            None if segment.start_ticks < template.presentation_time_offset_ticks => {
                DateTime::<Utc>::MIN_UTC
            }
            None => DateTime::<Utc>::MAX_UTC,
        }
    }

    pub fn segment_end(&self, template: TemplateId, segment: &TimelineSegment) -> Timestamp {
        let start = self.segment_start(template, segment);
        match self.template(template).segment_duration(segment) {
            Some(duration) => saturating_add(start, duration),
            None => DateTime::<Utc>::MAX_UTC,
        }
    }

    /// Every distinct timeline of a period: one per adaptation set with a shared template,
    /// otherwise one per representation.
    pub fn timelines(&self, period: PeriodId) -> Vec<Timeline> {
        let mut timelines = Vec::new();
        for set_id in self.period(period).adaptation_sets() {
            let set = self.adaptation_set(*set_id);
            if let Some(template) = set.template {
                timelines.push(Timeline {
                    owner: TemplateOwner::AdaptationSet(*set_id),
                    template,
                });
                continue;
            }

            for representation_id in set.representations() {
                if let Some(template) = self.representation(*representation_id).template {
                    timelines.push(Timeline {
                        owner: TemplateOwner::Representation(*representation_id),
                        template,
                    });
                }
            }
        }
        timelines
    }

    /// Human readable label of a period, e.g. `period 'p1'` or `period #2`.
    pub fn describe_period(&self, id: PeriodId) -> String {
        match &self.period(id).id {
            Some(name) => format!("period '{name}'"),
            None => format!("period #{}", id.0),
        }
    }

    /// Human readable label of a timeline owner, including its period.
    pub fn describe_owner(&self, owner: TemplateOwner) -> String {
        let describe_set = |set_id: AdaptationSetId| {
            let set = self.adaptation_set(set_id);
            let position = self
                .period(set.period)
                .adaptation_sets()
                .iter()
                .position(|id| *id == set_id)
                .unwrap_or_default();
            match &set.mime_type {
                Some(mime_type) => format!("adaptation set #{position} ({mime_type})"),
                None => format!("adaptation set #{position}"),
            }
        };

        match owner {
            TemplateOwner::AdaptationSet(set_id) => format!(
                "{} of {}",
                describe_set(set_id),
                self.describe_period(self.adaptation_set(set_id).period)
            ),
            TemplateOwner::Representation(representation_id) => {
                let representation = self.representation(representation_id);
                let set_id = representation.adaptation_set;
                let name = match &representation.id {
                    Some(id) => format!("representation '{id}'"),
                    None => {
                        let position = self
                            .adaptation_set(set_id)
                            .representations()
                            .iter()
                            .position(|id| *id == representation_id)
                            .unwrap_or_default();
                        format!("representation #{position}")
                    }
                };
                format!(
                    "{name} in {} of {}",
                    describe_set(set_id),
                    self.describe_period(self.adaptation_set(set_id).period)
                )
            }
        }
    }
}
