#![doc(html_root_url = "https://docs.rs/xylem-dom/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! A keyed virtual-tree reconciliation engine.
//!
//! Build [`VNode`]s with [`build`] (or the [`tags`] shorthands), then [mount](`Engine::mount`) them into a parent element of a [`HostTree`].
//! The engine diffs them against what's currently rendered, applies the resulting [`Patch`]es in order
//! and keeps event listeners bound exactly once per element and event type.
//!
//! All mounts into the same parent go through one queue, so they never interleave even when their input is [deferred](`Mountable::Deferred`).

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

mod apply;
mod config;
mod context;
mod diff;
mod error;
mod host;
pub mod memory;
mod mount;
mod node;
mod patch;
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
mod rc_hash_map;
mod registry;
pub mod reflect;
mod style;
pub mod tags;
mod trace;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::EngineConfig;
pub use context::ElementId;
pub use error::{ApplyError, BuildError, DiffError, ErrorCategory, HostError, MountError};
pub use host::{HostNode, HostTree, NodeKind, PropertyValue, Widget};
pub use memory::{MemoryDom, MemoryEvent, MemoryNode};
pub use mount::{Engine, ErrorReporter, MountHandle, MountReport, Mountable, TracingReporter};
pub use node::{
	build, classify, is_reserved_attribute, AttrValue, Attribute, Callback, Child, Children, Directive, ElementNode, EventProp, Prop, PropKind, Props, VNode,
	DIRECTIVE_NAMES, IDENTITY_ATTRIBUTE, WIDGET_PREFIX,
};
pub use patch::{Patch, PatchKind};
pub use reflect::reflect;
pub use registry::{BindingKey, EventRegistry};
