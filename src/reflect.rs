//! Reflects already rendered host nodes back into [`VNode`]s, for taking over markup that was rendered without the engine.

use crate::{is_reserved_attribute, trace::content, AttrValue, Attribute, ElementNode, HostNode, HostTree, NodeKind, VNode};
use tracing::{instrument, trace, warn};

/// Reflects `node` as a [`VNode`].
///
/// Elements keep their non-reserved attributes as text and their mirrored key, if any.
/// Without `recurse`, elements are reflected without children.
/// With `strip_empty_text`, whitespace-only text children are skipped.
///
/// Returns [`None`] for nodes the engine doesn't reconcile, like comments.
#[must_use]
#[instrument(level = "trace", skip(host))]
pub fn reflect<H: HostTree>(host: &H, node: &H::Node, recurse: bool, strip_empty_text: bool) -> Option<VNode> {
	match host.kind(node) {
		NodeKind::Text(data) => Some(VNode::Text(data)),
		NodeKind::Element(tag) => Some(VNode::Element(ElementNode::reflected(
			tag.to_ascii_lowercase(),
			reflect_attributes(host, node),
			node.dom_key(),
			recurse.then(|| reflect_child_nodes(host, node, strip_empty_text)),
		))),
		NodeKind::Other => None,
	}
}

pub fn reflect_child_nodes<H: HostTree>(host: &H, parent: &H::Node, strip_empty_text: bool) -> Vec<VNode> {
	host.child_nodes(parent)
		.iter()
		.filter_map(|child| match host.kind(child) {
			NodeKind::Text(data) if strip_empty_text && data.trim().is_empty() => {
				trace!(text = content(&data), "Skipping empty text.");
				None
			}
			NodeKind::Other => {
				warn!(?child, "Unrecognised child node. Skipping it.");
				None
			}
			NodeKind::Text(_) | NodeKind::Element(_) => reflect(host, child, true, strip_empty_text),
		})
		.collect()
}

pub fn reflect_attributes<H: HostTree>(host: &H, element: &H::Node) -> Vec<Attribute> {
	host.attribute_names(element)
		.into_iter()
		.filter(|name| !is_reserved_attribute(name))
		.filter_map(|name| {
			let value = host.get_attribute(element, &name)?;
			Some(Attribute {
				name,
				value: AttrValue::Text(value),
			})
		})
		.collect()
}
