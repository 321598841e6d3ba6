//! Fade Scheduler
//!
//! Fades are explicit resumable jobs rather than timers. Each job holds
//! `{phase, elapsed, from, to}` and is advanced once per coordinator tick.
//! The scheduler only produces interpolated *unscaled* values; the
//! coordinator pushes them through the mixer and onto the voice, so a
//! master or mute change during a fade is picked up on the next step.
//!
//! Invariant: at most one job per [`FadeTarget`]. [`FadeScheduler::start`]
//! removes the previous job for the same target before installing the new
//! one, so two jobs can never write the same volume in one tick.

use jb_core::FadeCurve;

/// Entity a fade writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FadeTarget {
    /// Music track index
    Track(usize),
    /// Sfx voice arena slot
    Voice(usize),
}

/// What the owner does once the fade reaches its end value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeCompletion {
    /// Keep playing at the final value
    Hold,
    /// Stop the track and clear its clip
    StopTrack,
    /// Stop the voice and return it to the pool
    ReleaseVoice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadePhase {
    /// Installed, not stepped yet
    Pending,
    Running,
    Complete,
}

/// Unique fade job identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FadeId(pub u64);

#[derive(Debug, Clone)]
pub struct FadeJob {
    id: FadeId,
    target: FadeTarget,
    from: f32,
    to: f32,
    elapsed_ms: u64,
    duration_ms: u32,
    curve: FadeCurve,
    completion: FadeCompletion,
    phase: FadePhase,
}

impl FadeJob {
    pub fn new(
        id: FadeId,
        target: FadeTarget,
        from: f32,
        to: f32,
        duration_ms: u32,
        curve: FadeCurve,
        completion: FadeCompletion,
    ) -> Self {
        Self {
            id,
            target,
            from,
            to,
            elapsed_ms: 0,
            duration_ms,
            curve,
            completion,
            phase: FadePhase::Pending,
        }
    }

    pub fn id(&self) -> FadeId {
        self.id
    }

    pub fn target(&self) -> FadeTarget {
        self.target
    }

    pub fn from(&self) -> f32 {
        self.from
    }

    pub fn to(&self) -> f32 {
        self.to
    }

    pub fn phase(&self) -> FadePhase {
        self.phase
    }

    pub fn completion(&self) -> FadeCompletion {
        self.completion
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Progress 0.0 - 1.0
    pub fn progress(&self) -> f32 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        (self.elapsed_ms as f32 / self.duration_ms as f32).min(1.0)
    }

    /// Current interpolated value. Exactly `to` once complete.
    pub fn value(&self) -> f32 {
        if self.elapsed_ms >= self.duration_ms as u64 {
            return self.to;
        }
        self.curve.interpolate(self.from, self.to, self.progress())
    }

    /// Advance by one tick and return the new value
    pub fn step(&mut self, delta_ms: u32) -> f32 {
        self.elapsed_ms += delta_ms as u64;
        self.phase = if self.elapsed_ms >= self.duration_ms as u64 {
            FadePhase::Complete
        } else {
            FadePhase::Running
        };
        self.value()
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.phase == FadePhase::Complete
    }
}

/// Output of one job for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeStep {
    pub id: FadeId,
    pub target: FadeTarget,
    /// Unscaled value to apply
    pub value: f32,
    /// Set on the job's final step
    pub completion: Option<FadeCompletion>,
}

pub struct FadeScheduler {
    jobs: Vec<FadeJob>,
    next_id: u64,
    duration_ms: u32,
    curve: FadeCurve,
}

impl FadeScheduler {
    pub fn new(duration_ms: u32, curve: FadeCurve) -> Self {
        Self {
            jobs: Vec::new(),
            next_id: 1,
            duration_ms,
            curve,
        }
    }

    /// Default duration for fades started with [`start`](Self::start)
    pub fn duration_ms(&self) -> u32 {
        self.duration_ms
    }

    /// Start a fade with the default duration, replacing any job on `target`
    pub fn start(
        &mut self,
        target: FadeTarget,
        from: f32,
        to: f32,
        completion: FadeCompletion,
    ) -> FadeId {
        self.start_with_duration(target, from, to, self.duration_ms, completion)
    }

    pub fn start_with_duration(
        &mut self,
        target: FadeTarget,
        from: f32,
        to: f32,
        duration_ms: u32,
        completion: FadeCompletion,
    ) -> FadeId {
        if let Some(old) = self.cancel(target) {
            log::trace!("[Fade] {:?} replaces {:?} on {:?}", FadeId(self.next_id), old.id, target);
        }

        let id = FadeId(self.next_id);
        self.next_id += 1;
        self.jobs.push(FadeJob::new(
            id,
            target,
            from,
            to,
            duration_ms,
            self.curve,
            completion,
        ));
        id
    }

    /// Remove the job on `target`, if any
    pub fn cancel(&mut self, target: FadeTarget) -> Option<FadeJob> {
        let index = self.jobs.iter().position(|j| j.target == target)?;
        Some(self.jobs.swap_remove(index))
    }

    pub fn get(&self, target: FadeTarget) -> Option<&FadeJob> {
        self.jobs.iter().find(|j| j.target == target)
    }

    pub fn is_fading(&self, target: FadeTarget) -> bool {
        self.get(target).is_some()
    }

    /// Step every job once. Completed jobs are removed and reported with
    /// their completion action.
    pub fn advance(&mut self, delta_ms: u32) -> Vec<FadeStep> {
        let mut steps = Vec::with_capacity(self.jobs.len());

        for job in &mut self.jobs {
            let value = job.step(delta_ms);
            steps.push(FadeStep {
                id: job.id,
                target: job.target,
                value,
                completion: job.is_complete().then_some(job.completion),
            });
        }

        self.jobs.retain(|j| !j.is_complete());
        steps
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn clear(&mut self) {
        self.jobs.clear();
    }
}
