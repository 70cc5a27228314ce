//! Patch records emitted by the diff engine.
//!
//! A [`Patch`] has no behavior of its own, see [`Engine::apply`](`crate::Engine::apply`).
//! The order of a patch list is significant: structural patches for a node always precede patches that depend on them.

use crate::{AttrValue, Callback, VNode};
use core::fmt;
use serde_json::Value;

/// The discriminant of a [`Patch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchKind {
	CreateNode,
	ReplaceNode,
	SortNode,
	CreateText,
	UpdateText,
	CreateAttr,
	UpdateAttr,
	RemoveAttr,
	MapEvent,
	RemoveEvent,
	SetInnerHtml,
	RemoveNode,
	RemoveNodeAtIndex,
	RemoveNodesFromIndex,
	InvokeReferenceCallback,
	InitialiseWidget,
	PropagateWidgetProps,
}

impl PatchKind {
	#[must_use]
	pub fn name(self) -> &'static str {
		match self {
			PatchKind::CreateNode => "CREATE_NODE",
			PatchKind::ReplaceNode => "REPLACE_NODE",
			PatchKind::SortNode => "SORT_NODE",
			PatchKind::CreateText => "CREATE_TEXT",
			PatchKind::UpdateText => "UPDATE_TEXT",
			PatchKind::CreateAttr => "CREATE_ATTR",
			PatchKind::UpdateAttr => "UPDATE_ATTR",
			PatchKind::RemoveAttr => "REMOVE_ATTR",
			PatchKind::MapEvent => "MAP_EVENT",
			PatchKind::RemoveEvent => "REMOVE_EVENT",
			PatchKind::SetInnerHtml => "SET_INNER_HTML",
			PatchKind::RemoveNode => "REMOVE_NODE",
			PatchKind::RemoveNodeAtIndex => "REMOVE_NODE_AT_INDEX",
			PatchKind::RemoveNodesFromIndex => "REMOVE_NODES_FROM_INDEX",
			PatchKind::InvokeReferenceCallback => "INVOKE_REFERENCE_CALLBACK",
			PatchKind::InitialiseWidget => "INITIALISE_WIDGET",
			PatchKind::PropagateWidgetProps => "PROPAGATE_WIDGET_PROPS",
		}
	}
}

impl fmt::Display for PatchKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// One described mutation of the host tree. `N` is the host's node handle type.
///
/// Nodes referenced by creating patches were created (detached) during the diff;
/// applying the patch attaches them.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch<N> {
	/// Inserts `element` into `parent` at `index`.
	CreateNode { parent: N, element: N, index: usize },
	ReplaceNode { parent: N, old: N, new: N },
	/// Moves `element` (already a child of `parent`) to `index`.
	SortNode { parent: N, element: N, index: usize },
	CreateText { parent: N, node: N, index: usize },
	UpdateText { node: N, text: String },
	CreateAttr { element: N, name: String, value: AttrValue },
	UpdateAttr { element: N, name: String, value: AttrValue },
	RemoveAttr { element: N, name: String },
	MapEvent { element: N, event_type: String, handler: Callback },
	RemoveEvent { element: N, event_type: String },
	SetInnerHtml { element: N, html: String },
	RemoveNode { parent: N, node: N },
	RemoveNodeAtIndex { parent: N, index: usize },
	RemoveNodesFromIndex { parent: N, index: usize },
	InvokeReferenceCallback { element: N, callback: Callback },
	InitialiseWidget { element: N, state: Option<Value>, children: Vec<VNode> },
	PropagateWidgetProps { element: N, state: Value, children: Vec<VNode> },
}

impl<N> Patch<N> {
	#[must_use]
	pub fn kind(&self) -> PatchKind {
		match self {
			Patch::CreateNode { .. } => PatchKind::CreateNode,
			Patch::ReplaceNode { .. } => PatchKind::ReplaceNode,
			Patch::SortNode { .. } => PatchKind::SortNode,
			Patch::CreateText { .. } => PatchKind::CreateText,
			Patch::UpdateText { .. } => PatchKind::UpdateText,
			Patch::CreateAttr { .. } => PatchKind::CreateAttr,
			Patch::UpdateAttr { .. } => PatchKind::UpdateAttr,
			Patch::RemoveAttr { .. } => PatchKind::RemoveAttr,
			Patch::MapEvent { .. } => PatchKind::MapEvent,
			Patch::RemoveEvent { .. } => PatchKind::RemoveEvent,
			Patch::SetInnerHtml { .. } => PatchKind::SetInnerHtml,
			Patch::RemoveNode { .. } => PatchKind::RemoveNode,
			Patch::RemoveNodeAtIndex { .. } => PatchKind::RemoveNodeAtIndex,
			Patch::RemoveNodesFromIndex { .. } => PatchKind::RemoveNodesFromIndex,
			Patch::InvokeReferenceCallback { .. } => PatchKind::InvokeReferenceCallback,
			Patch::InitialiseWidget { .. } => PatchKind::InitialiseWidget,
			Patch::PropagateWidgetProps { .. } => PatchKind::PropagateWidgetProps,
		}
	}
}

/// Trailing removal of live children beyond `declared`.
pub(crate) fn remove_trailing<N: Clone>(parent: &N, live: usize, declared: usize) -> Option<Patch<N>> {
	match live.checked_sub(declared) {
		None | Some(0) => None,
		Some(1) => Some(Patch::RemoveNodeAtIndex {
			parent: parent.clone(),
			index: declared,
		}),
		Some(_) => Some(Patch::RemoveNodesFromIndex {
			parent: parent.clone(),
			index: declared,
		}),
	}
}
