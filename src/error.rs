//! Error taxonomy.
//!
//! [`BuildError`]s are programming errors in render logic and are returned synchronously from [`build`](`crate::build`).
//! Everything that can go wrong during a mount cycle is folded into [`MountError`],
//! which is reported through the engine's [`ErrorReporter`](`crate::ErrorReporter`) instead of unwinding into the caller.

use crate::ElementId;
use thiserror::Error;

/// Returned by [`build`](`crate::build`) and friends when a node description is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum BuildError {
	#[error("the `props` property is no longer supported, pass widget data as `state` instead")]
	DeprecatedProps,

	#[error("`{name}` is reserved by the engine and can't be set")]
	ReservedName { name: String },

	#[error("not a valid node: expected a string or an object with a `type` field, but found {found}")]
	InvalidNode { found: &'static str },

	#[error("duplicate sibling key(s) under <{tag}>: {}", .keys.join(", "))]
	DuplicateKeys { tag: String, keys: Vec<String> },

	#[error("children of <{tag}> mix keyed and unkeyed elements")]
	MixedKeys { tag: String },

	#[error("`ref` on <{tag}> must be a callback, but found {found}")]
	RefNotCallable { tag: String, found: &'static str },

	#[error("event property `{name}` on <{tag}> must be a callback, but found {found}")]
	HandlerNotCallable { tag: String, name: String, found: &'static str },

	#[error("`{name}` on <{tag}> must be {expected}, but found {found}")]
	InvalidDirective {
		tag: String,
		name: &'static str,
		expected: &'static str,
		found: &'static str,
	},
}

/// A host platform operation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum HostError {
	#[error("could not create <{tag}>: {reason}")]
	CreateElement { tag: String, reason: String },

	#[error("{operation} failed: {reason}")]
	Operation { operation: &'static str, reason: String },
}

impl HostError {
	pub fn operation(operation: &'static str, reason: impl Into<String>) -> Self {
		Self::Operation {
			operation,
			reason: reason.into(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DiffError {
	#[error(transparent)]
	Host(#[from] HostError),

	#[error("depth limit of {limit} reached while diffing")]
	DepthLimit { limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ApplyError {
	#[error(transparent)]
	Host(#[from] HostError),

	#[error("element {id:?} is flagged as a widget, but the host exposes no widget for it")]
	NotAWidget { id: Option<ElementId> },
}

/// Everything that can fail a queued mount cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum MountError {
	#[error(transparent)]
	Build(#[from] BuildError),

	#[error(transparent)]
	Diff(#[from] DiffError),

	#[error(transparent)]
	Apply(#[from] ApplyError),

	/// A [deferred](`crate::Mountable::Deferred`) input resolved to an error.
	#[error("deferred mount input failed: {0}")]
	Input(String),

	#[error("widget {id} re-rendered more than {limit} levels deep")]
	RerenderDepth { id: ElementId, limit: usize },

	#[error("could not start the mount queue worker: {0}")]
	Spawn(String),

	/// The queue worker went away before the cycle completed.
	#[error("the mount cycle was dropped before it completed")]
	Dropped,
}

/// Coarse classification passed to [`ErrorReporter::report`](`crate::ErrorReporter::report`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
	Construction,
	Diff,
	Patch,
	Input,
	Scheduling,
}

impl MountError {
	#[must_use]
	pub fn category(&self) -> ErrorCategory {
		match self {
			Self::Build(_) => ErrorCategory::Construction,
			Self::Diff(_) => ErrorCategory::Diff,
			Self::Apply(_) => ErrorCategory::Patch,
			Self::Input(_) => ErrorCategory::Input,
			Self::RerenderDepth { .. } | Self::Spawn(_) | Self::Dropped => ErrorCategory::Scheduling,
		}
	}
}
