//! The capabilities the engine consumes from the platform that actually renders nodes.
//!
//! Two implementations ship with this crate: [`MemoryDom`](`crate::memory::MemoryDom`) everywhere
//! and `WebDom` (over [`web_sys`]) on `wasm32`.

use crate::{error::HostError, BuildError, Callback, ElementId, VNode};
use core::fmt::Debug;
use serde_json::Value;
use std::rc::Rc;

/// What a host node currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
	/// An element with its tag name, as reported by the host (which may be upper case).
	Element(String),
	/// A text node with its data.
	Text(String),
	/// Anything the engine doesn't reconcile, like comments or opaque markup.
	Other,
}

/// A live property value, as opposed to an attribute string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
	Text(String),
	Flag(bool),
}

/// A handle to a host node.
///
/// Handles are cheap to clone and compare equal iff they refer to the same node.
/// Each node carries two engine-owned fields that the engine writes and the host must keep for the node's lifetime.
pub trait HostNode: Clone + PartialEq + Debug + 'static {
	fn identity(&self) -> Option<ElementId>;

	/// Called at most once per node.
	fn set_identity(&self, id: ElementId);

	fn dom_key(&self) -> Option<String>;

	fn set_dom_key(&self, key: &str);
}

/// The host tree platform.
///
/// All operations are synchronous. Methods take `&self` because handlers and widgets may call back into the engine
/// while it is applying patches.
pub trait HostTree: 'static {
	type Node: HostNode;

	/// Returned by [`add_event_listener`](`HostTree::add_event_listener`) and needed to remove that listener again.
	type Listener: 'static;

	/// Creates a detached element.
	///
	/// # Errors
	///
	/// Iff the host rejects the tag name.
	fn create_element(&self, tag: &str) -> Result<Self::Node, HostError>;

	/// Creates a detached text node.
	fn create_text(&self, data: &str) -> Self::Node;

	fn kind(&self, node: &Self::Node) -> NodeKind;

	fn set_text(&self, node: &Self::Node, data: &str);

	fn child_nodes(&self, parent: &Self::Node) -> Vec<Self::Node>;

	/// Inserts (or moves) `child` before `reference`, or appends it if `reference` is [`None`].
	///
	/// # Errors
	///
	/// Iff the host rejects the insertion.
	fn insert_before(&self, parent: &Self::Node, child: &Self::Node, reference: Option<&Self::Node>) -> Result<(), HostError>;

	/// # Errors
	///
	/// Iff `child` isn't a child of `parent`.
	fn remove_child(&self, parent: &Self::Node, child: &Self::Node) -> Result<(), HostError>;

	/// # Errors
	///
	/// Iff `old_child` isn't a child of `parent`.
	fn replace_child(&self, parent: &Self::Node, new_child: &Self::Node, old_child: &Self::Node) -> Result<(), HostError>;

	fn attribute_names(&self, element: &Self::Node) -> Vec<String>;

	fn get_attribute(&self, element: &Self::Node, name: &str) -> Option<String>;

	/// # Errors
	///
	/// Iff the host rejects the attribute.
	fn set_attribute(&self, element: &Self::Node, name: &str, value: &str) -> Result<(), HostError>;

	/// # Errors
	///
	/// Iff the host rejects the removal.
	fn remove_attribute(&self, element: &Self::Node, name: &str) -> Result<(), HostError>;

	/// Assigns a live property, like an input's current `value`.
	///
	/// # Errors
	///
	/// Iff the host rejects the assignment.
	fn set_property(&self, element: &Self::Node, name: &str, value: &PropertyValue) -> Result<(), HostError>;

	fn inner_html(&self, element: &Self::Node) -> String;

	/// Replaces all children of `element` with opaque markup.
	///
	/// # Errors
	///
	/// Iff the host rejects the markup.
	fn set_inner_html(&self, element: &Self::Node, html: &str) -> Result<(), HostError>;

	/// # Errors
	///
	/// Iff the host can't subscribe to the event.
	fn add_event_listener(&self, element: &Self::Node, event_type: &str, callback: &Callback) -> Result<Self::Listener, HostError>;

	fn remove_event_listener(&self, element: &Self::Node, event_type: &str, listener: Self::Listener);

	/// The node that currently has input focus, if any.
	fn focused(&self) -> Option<Self::Node>;

	/// The widget object behind a widget element.
	fn widget(&self, element: &Self::Node) -> Option<Rc<dyn Widget>>;

	/// Called for each node of a subtree the engine removed or replaced, before it's detached.
	/// The engine never reinserts such nodes, so per-node host state (like widget instances) can be dropped here.
	fn release(&self, node: &Self::Node) {
		let _ = node;
	}
}

/// The lifecycle contract of custom elements whose tag starts with [`WIDGET_PREFIX`](`crate::WIDGET_PREFIX`).
///
/// Widgets own their subtree. The engine never diffs a widget's children itself,
/// it hands them over through [`set_children`](`Widget::set_children`) and mounts whatever [`render`](`Widget::render`) returns into the widget element.
pub trait Widget {
	/// Replaces the widget's state.
	///
	/// Returns whether the widget needs to re-render, which must be `false` if `next` equals the current state.
	/// That equality check is what terminates re-render chains.
	/// `trigger_update` is `false` during initialisation, where a first render always follows.
	fn set_state(&self, next: &Value, trigger_update: bool) -> bool;

	fn set_children(&self, children: &[VNode]) {
		let _ = children;
	}

	/// # Errors
	///
	/// Iff the widget's render logic builds an invalid node.
	fn render(&self) -> Result<VNode, BuildError>;
}
