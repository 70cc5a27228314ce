use crate::{
	context::Context,
	error::ApplyError,
	host::{PropertyValue, Widget},
	patch::Patch,
	trace::content,
	AttrValue, HostNode, HostTree, NodeKind,
};
use core::any::Any;
use serde_json::Value;
use std::rc::Rc;
use tracing::{instrument, trace, trace_span, warn};

/// A widget that asked to be rendered again while patches were being applied.
///
/// These are collected instead of rendered on the spot, since rendering mounts into the widget element
/// and must go through that element's queue.
pub(crate) struct Rerender<N> {
	pub(crate) element: N,
	pub(crate) widget: Rc<dyn Widget>,
}

/// Applies one patch to the live tree, keeping the binding registry in sync.
///
/// Returns whether anything live changed.
#[instrument(level = "trace", skip(host, context, patch, rerenders), fields(kind = %patch.kind()))]
pub(crate) fn apply<H: HostTree>(host: &H, context: &Context<H>, patch: &Patch<H::Node>, rerenders: &mut Vec<Rerender<H::Node>>) -> Result<bool, ApplyError> {
	match patch {
		Patch::CreateNode { parent, element: node, index } | Patch::CreateText { parent, node, index } => {
			let reference = host.child_nodes(parent).get(*index).cloned();
			host.insert_before(parent, node, reference.as_ref())?;
			Ok(true)
		}

		Patch::ReplaceNode { parent, old, new } => {
			let purged = context.release_tree(host, old);
			trace!(purged, "Replacing node.");
			host.replace_child(parent, new, old)?;
			Ok(true)
		}

		Patch::SortNode { parent, element, index } => {
			let children = host.child_nodes(parent);
			if children.get(*index) == Some(element) {
				trace!("Already in place.");
				return Ok(false);
			}
			if !children.contains(element) {
				warn!(index, "Sorting a node that isn't a child of the given parent. Inserting it instead.");
			}
			let reference = children.iter().filter(|child| *child != element).nth(*index).cloned();
			host.insert_before(parent, element, reference.as_ref())?;
			Ok(true)
		}

		Patch::UpdateText { node, text } => match host.kind(node) {
			NodeKind::Text(data) if data == *text => {
				trace!("Text unchanged.");
				Ok(false)
			}
			NodeKind::Text(_) => {
				host.set_text(node, text);
				Ok(true)
			}
			NodeKind::Element(_) | NodeKind::Other => {
				warn!("Can't update the text of a non-text node.");
				Ok(false)
			}
		},

		Patch::CreateAttr { element, name, value } | Patch::UpdateAttr { element, name, value } => Ok(set_attribute(host, element, name, value)?),

		Patch::RemoveAttr { element, name } => Ok(remove_attribute(host, element, name)?),

		Patch::MapEvent { element, event_type, handler } => {
			let key = context.binding_key(element);
			Ok(context.registry.borrow_mut().bind(host, element, key, event_type, handler)?)
		}

		Patch::RemoveEvent { element, event_type } => Ok(match Context::<H>::existing_binding_key(element) {
			Some(key) => context.registry.borrow_mut().unbind(host, element, &key, Some(event_type)) > 0,
			None => false,
		}),

		Patch::SetInnerHtml { element, html } => {
			if host.inner_html(element) == *html {
				trace!("Raw HTML unchanged.");
				return Ok(false);
			}
			for child in host.child_nodes(element) {
				context.release_tree(host, &child);
			}
			host.set_inner_html(element, html)?;
			Ok(true)
		}

		Patch::RemoveNode { parent, node } => {
			remove(host, context, parent, node)?;
			Ok(true)
		}

		Patch::RemoveNodeAtIndex { parent, index } => match host.child_nodes(parent).get(*index) {
			Some(node) => {
				remove(host, context, parent, node)?;
				Ok(true)
			}
			None => {
				trace!(index, "Nothing to remove.");
				Ok(false)
			}
		},

		Patch::RemoveNodesFromIndex { parent, index } => {
			let children = host.child_nodes(parent);
			let excess = children.get(*index..).unwrap_or_default();
			for node in excess {
				remove(host, context, parent, node)?;
			}
			Ok(!excess.is_empty())
		}

		Patch::InvokeReferenceCallback { element, callback } => {
			let span = trace_span!("Invoking reference callback", ?callback);
			let _enter = span.enter();
			callback.call(element as &dyn Any);
			Ok(false)
		}

		Patch::InitialiseWidget { element, state, children } => {
			let widget = widget(host, element)?;
			widget.set_children(children);
			widget.set_state(state.as_ref().unwrap_or(&Value::Null), false);
			rerenders.push(Rerender {
				element: element.clone(),
				widget,
			});
			Ok(true)
		}

		Patch::PropagateWidgetProps { element, state, children } => {
			let widget = widget(host, element)?;
			widget.set_children(children);
			let changed = widget.set_state(state, true);
			if changed {
				rerenders.push(Rerender {
					element: element.clone(),
					widget,
				})
			} else {
				trace!("Widget state unchanged.")
			}
			Ok(changed)
		}
	}
}

fn widget<H: HostTree>(host: &H, element: &H::Node) -> Result<Rc<dyn Widget>, ApplyError> {
	host.widget(element).ok_or_else(|| ApplyError::NotAWidget { id: element.identity() })
}

/// Purges and releases `node`'s subtree and detaches it.
fn remove<H: HostTree>(host: &H, context: &Context<H>, parent: &H::Node, node: &H::Node) -> Result<(), ApplyError> {
	let purged = context.release_tree(host, node);
	trace!(purged, "Removing node.");
	host.remove_child(parent, node)?;
	Ok(())
}

fn set_attribute<H: HostTree>(host: &H, element: &H::Node, name: &str, value: &AttrValue) -> Result<bool, ApplyError> {
	let rendered = match value.rendered() {
		Some(rendered) => rendered,
		None => return remove_attribute(host, element, name),
	};

	let span = trace_span!("Setting attribute", name, value = content(rendered));
	let _enter = span.enter();

	let is_value = name.eq_ignore_ascii_case("value");
	if is_value && host.focused().as_ref() == Some(element) {
		trace!("Element is focused. Leaving its value alone.");
		return Ok(false);
	}

	if host.get_attribute(element, name).as_deref() == Some(rendered) {
		trace!("Attribute unchanged.");
		return Ok(false);
	}

	host.set_attribute(element, name, rendered)?;
	if is_value {
		host.set_property(element, "value", &PropertyValue::Text(rendered.to_owned()))?;
	} else if name.eq_ignore_ascii_case("checked") {
		host.set_property(element, "checked", &PropertyValue::Flag(true))?;
	}
	Ok(true)
}

fn remove_attribute<H: HostTree>(host: &H, element: &H::Node, name: &str) -> Result<bool, ApplyError> {
	if host.get_attribute(element, name).is_none() {
		trace!(name, "Attribute already absent.");
		return Ok(false);
	}

	host.remove_attribute(element, name)?;
	if name.eq_ignore_ascii_case("checked") {
		host.set_property(element, "checked", &PropertyValue::Flag(false))?;
	}
	Ok(true)
}
