/// Tuning knobs of an [`Engine`](`crate::Engine`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
	/// Maximum nesting depth the diff engine descends into before failing with [`DiffError::DepthLimit`](`crate::DiffError::DepthLimit`).
	pub depth_limit: usize,

	/// Maximum number of nested widget re-render re-entries.
	///
	/// Widgets re-render until their state settles, so this only trips on widgets whose
	/// [`set_state`](`crate::Widget::set_state`) never reports convergence (or on absurdly deep widget nesting).
	pub max_rerender_depth: usize,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			depth_limit: 512,
			max_rerender_depth: 64,
		}
	}
}

impl EngineConfig {
	#[must_use]
	pub fn with_depth_limit(mut self, depth_limit: usize) -> Self {
		self.depth_limit = depth_limit;
		self
	}

	#[must_use]
	pub fn with_max_rerender_depth(mut self, max_rerender_depth: usize) -> Self {
		self.max_rerender_depth = max_rerender_depth;
		self
	}
}
