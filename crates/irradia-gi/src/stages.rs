use irradia_core::FieldKind;

use crate::error::GiError;

/// One step of a probe update cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Fill the ray data from the scene.
    Trace,
    /// Fold ray data into both probe fields.
    Update,
    /// Make the fields visible to shading.
    Apply,
}

/// A resource a stage touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceId {
    AccelerationStructure,
    RayData,
    Field(FieldKind),
    PublishedFields,
}

impl Stage {
    pub const ORDER: [Stage; 3] = [Stage::Trace, Stage::Update, Stage::Apply];

    pub fn reads(self) -> &'static [ResourceId] {
        match self {
            // The previous irradiance field feeds the indirect bounce.
            Stage::Trace => &[
                ResourceId::AccelerationStructure,
                ResourceId::Field(FieldKind::Irradiance),
            ],
            Stage::Update => &[
                ResourceId::RayData,
                ResourceId::Field(FieldKind::Irradiance),
                ResourceId::Field(FieldKind::Distance),
            ],
            Stage::Apply => &[
                ResourceId::Field(FieldKind::Irradiance),
                ResourceId::Field(FieldKind::Distance),
            ],
        }
    }

    pub fn writes(self) -> &'static [ResourceId] {
        match self {
            Stage::Trace => &[ResourceId::RayData],
            Stage::Update => &[
                ResourceId::Field(FieldKind::Irradiance),
                ResourceId::Field(FieldKind::Distance),
            ],
            Stage::Apply => &[ResourceId::PublishedFields],
        }
    }

    fn next(self) -> Option<Stage> {
        match self {
            Stage::Trace => Some(Stage::Update),
            Stage::Update => Some(Stage::Apply),
            Stage::Apply => None,
        }
    }
}

/// Enforces trace -> update -> apply within one cycle.
///
/// A failed stage aborts the cycle; the next `begin(Stage::Trace)` starts a
/// fresh one.
#[derive(Debug, Clone, Default)]
pub struct StageSchedule {
    completed: Option<Stage>,
    cycle: u64,
}

impl StageSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage that must run next.
    pub fn expected(&self) -> Stage {
        self.completed.and_then(Stage::next).unwrap_or(Stage::Trace)
    }

    /// Number of fully completed cycles.
    pub fn completed_cycles(&self) -> u64 {
        self.cycle
    }

    /// Check that `stage` may start now. Starting `Trace` always resets the
    /// cycle, discarding a partially completed one.
    pub fn begin(&mut self, stage: Stage) -> Result<(), GiError> {
        if stage == Stage::Trace {
            self.completed = None;
            return Ok(());
        }
        let expected = self.expected();
        if stage != expected {
            return Err(GiError::StageOutOfOrder {
                expected,
                found: stage,
            });
        }
        Ok(())
    }

    pub fn complete(&mut self, stage: Stage) {
        self.completed = Some(stage);
        if stage == Stage::Apply {
            self.completed = None;
            self.cycle += 1;
        }
    }

    /// Drop a partially completed cycle.
    pub fn abort(&mut self) {
        self.completed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_read_is_written_earlier_or_persistent() {
        // Update only reads what trace wrote or what persists between cycles.
        for resource in Stage::Update.reads() {
            let written_by_trace = Stage::Trace.writes().contains(resource);
            let persistent = matches!(resource, ResourceId::Field(_));
            assert!(written_by_trace || persistent, "{resource:?}");
        }
        for resource in Stage::Apply.reads() {
            assert!(Stage::Update.writes().contains(resource), "{resource:?}");
        }
    }

    #[test]
    fn test_full_cycle_in_order() {
        let mut schedule = StageSchedule::new();
        for stage in Stage::ORDER {
            schedule.begin(stage).expect("in order");
            schedule.complete(stage);
        }
        assert_eq!(schedule.completed_cycles(), 1);
        assert_eq!(schedule.expected(), Stage::Trace);
    }

    #[test]
    fn test_update_before_trace_is_rejected() {
        let mut schedule = StageSchedule::new();
        assert_eq!(
            schedule.begin(Stage::Update),
            Err(GiError::StageOutOfOrder {
                expected: Stage::Trace,
                found: Stage::Update,
            })
        );
    }

    #[test]
    fn test_apply_cannot_skip_update() {
        let mut schedule = StageSchedule::new();
        schedule.begin(Stage::Trace).expect("trace first");
        schedule.complete(Stage::Trace);
        assert_eq!(
            schedule.begin(Stage::Apply),
            Err(GiError::StageOutOfOrder {
                expected: Stage::Update,
                found: Stage::Apply,
            })
        );
    }

    #[test]
    fn test_abort_restarts_at_trace() {
        let mut schedule = StageSchedule::new();
        schedule.begin(Stage::Trace).expect("trace first");
        schedule.complete(Stage::Trace);
        schedule.abort();
        assert_eq!(schedule.expected(), Stage::Trace);
        assert_eq!(schedule.completed_cycles(), 0);
    }
}
