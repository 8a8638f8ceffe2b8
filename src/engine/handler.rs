use crate::engine::Arbiter;

/// Called when two shapes start touching; returning false ignores the pair until it separates
pub type BeginFunc = Box<dyn FnMut(&mut Arbiter) -> bool>;

/// Called every step while shapes touch, before solving; returning false skips the pair for this step
pub type PreSolveFunc = Box<dyn FnMut(&mut Arbiter) -> bool>;

/// Called every step while shapes touch, after solving
pub type PostSolveFunc = Box<dyn FnMut(&mut Arbiter)>;

/// Called once when two shapes stop touching, or when one of them is removed
pub type SeparateFunc = Box<dyn FnMut(&mut Arbiter)>;

/// Set of callbacks for one pair of collision types
#[derive(Default)]
pub struct CollisionHandler {
    /// Called when a pair starts touching
    pub begin: Option<BeginFunc>,

    /// Called before the solver runs
    pub pre_solve: Option<PreSolveFunc>,

    /// Called after the solver runs
    pub post_solve: Option<PostSolveFunc>,

    /// Called when a pair stops touching
    pub separate: Option<SeparateFunc>,
}

impl CollisionHandler {
    /// Creates a handler with no callbacks; every pair collides normally
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn call_begin(&mut self, arbiter: &mut Arbiter) -> bool {
        self.begin.as_mut().map_or(true, |f| f(arbiter))
    }

    pub(crate) fn call_pre_solve(&mut self, arbiter: &mut Arbiter) -> bool {
        self.pre_solve.as_mut().map_or(true, |f| f(arbiter))
    }

    pub(crate) fn call_post_solve(&mut self, arbiter: &mut Arbiter) {
        if let Some(f) = self.post_solve.as_mut() {
            f(arbiter);
        }
    }

    pub(crate) fn call_separate(&mut self, arbiter: &mut Arbiter) {
        if let Some(f) = self.separate.as_mut() {
            f(arbiter);
        }
    }
}

impl std::fmt::Debug for CollisionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollisionHandler")
            .field("begin", &self.begin.is_some())
            .field("pre_solve", &self.pre_solve.is_some())
            .field("post_solve", &self.post_solve.is_some())
            .field("separate", &self.separate.is_some())
            .finish()
    }
}
