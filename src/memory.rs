//! A complete in-memory host tree.
//!
//! [`MemoryDom`] behaves like a (very) small browser DOM: it serializes to HTML, tracks focus and live properties separately from attributes,
//! instantiates widgets for registered custom tags and dispatches events synchronously to their listeners.
//! It's what the engine runs against outside of the browser, including in this crate's tests.

use crate::{
	error::HostError,
	host::{HostNode, HostTree, NodeKind, PropertyValue, Widget},
	Callback, ElementId, WIDGET_PREFIX,
};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug},
};
use hashbrown::HashMap;
use std::rc::{Rc, Weak};
use tracing::{trace, trace_span, warn};

const VOID_ELEMENTS: &[&str] = &["area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr"];

enum Kind {
	Element(String),
	Text(String),
	/// Opaque markup assigned through [`HostTree::set_inner_html`].
	Raw(String),
}

struct Listener {
	id: u64,
	event_type: String,
	callback: Callback,
}

struct NodeData {
	kind: Kind,
	parent: Weak<RefCell<NodeData>>,
	children: Vec<MemoryNode>,
	attributes: Vec<(String, String)>,
	properties: HashMap<String, PropertyValue>,
	listeners: Vec<Listener>,
	widget: Option<Rc<dyn Widget>>,
	identity: Option<ElementId>,
	dom_key: Option<String>,
}

/// A handle to a node of a [`MemoryDom`]. Handles compare equal iff they refer to the same node.
#[derive(Clone)]
pub struct MemoryNode(Rc<RefCell<NodeData>>);

impl PartialEq for MemoryNode {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl Eq for MemoryNode {}

impl Debug for MemoryNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let data = self.0.borrow();
		match &data.kind {
			Kind::Element(tag) => write!(f, "<{}>", tag)?,
			Kind::Text(_) => f.write_str("#text")?,
			Kind::Raw(_) => f.write_str("#raw")?,
		}
		if let Some(id) = data.identity {
			write!(f, " {}", id)?;
		}
		Ok(())
	}
}

/// What a [`MemoryNode`] passes to its listeners on [`dispatch`](`MemoryNode::dispatch`).
#[derive(Debug, Clone)]
pub struct MemoryEvent {
	pub event_type: String,
	pub target: MemoryNode,
}

impl MemoryNode {
	fn new(kind: Kind) -> Self {
		Self(Rc::new(RefCell::new(NodeData {
			kind,
			parent: Weak::new(),
			children: Vec::new(),
			attributes: Vec::new(),
			properties: HashMap::new(),
			listeners: Vec::new(),
			widget: None,
			identity: None,
			dom_key: None,
		})))
	}

	/// The element's (lowercase) tag name, or [`None`] for other nodes.
	#[must_use]
	pub fn tag(&self) -> Option<String> {
		match &self.0.borrow().kind {
			Kind::Element(tag) => Some(tag.clone()),
			Kind::Text(_) | Kind::Raw(_) => None,
		}
	}

	/// The text node's data, or [`None`] for other nodes.
	#[must_use]
	pub fn text(&self) -> Option<String> {
		match &self.0.borrow().kind {
			Kind::Text(data) => Some(data.clone()),
			Kind::Element(_) | Kind::Raw(_) => None,
		}
	}

	#[must_use]
	pub fn parent(&self) -> Option<MemoryNode> {
		self.0.borrow().parent.upgrade().map(MemoryNode)
	}

	#[must_use]
	pub fn children(&self) -> Vec<MemoryNode> {
		self.0.borrow().children.clone()
	}

	#[must_use]
	pub fn child(&self, index: usize) -> Option<MemoryNode> {
		self.0.borrow().children.get(index).cloned()
	}

	#[must_use]
	pub fn attribute(&self, name: &str) -> Option<String> {
		let name = name.to_ascii_lowercase();
		self.0.borrow().attributes.iter().find(|(n, _)| *n == name).map(|(_, value)| value.clone())
	}

	/// A live property, as set through [`HostTree::set_property`] or [`MemoryNode::set_property`].
	#[must_use]
	pub fn property(&self, name: &str) -> Option<PropertyValue> {
		self.0.borrow().properties.get(name).cloned()
	}

	/// Changes a live property directly, the way user input would.
	pub fn set_property(&self, name: &str, value: PropertyValue) {
		self.0.borrow_mut().properties.insert(name.to_owned(), value);
	}

	/// The number of listeners currently attached to this node.
	#[must_use]
	pub fn listener_count(&self) -> usize {
		self.0.borrow().listeners.len()
	}

	/// Calls this node's listeners for `event_type` in subscription order with a [`MemoryEvent`].
	///
	/// Returns how many were called. Events don't propagate.
	pub fn dispatch(&self, event_type: &str) -> usize {
		let span = trace_span!("Dispatching", event_type);
		let _enter = span.enter();

		// Listeners may (un)subscribe while being called.
		let callbacks: Vec<Callback> = self
			.0
			.borrow()
			.listeners
			.iter()
			.filter(|listener| listener.event_type == event_type)
			.map(|listener| listener.callback.clone())
			.collect();

		let event = MemoryEvent {
			event_type: event_type.to_owned(),
			target: self.clone(),
		};
		for callback in &callbacks {
			callback.call(&event);
		}
		callbacks.len()
	}

	/// The concatenated data of all descendant text nodes.
	#[must_use]
	pub fn text_content(&self) -> String {
		let mut text = String::new();
		self.write_text(&mut text);
		text
	}

	fn write_text(&self, out: &mut String) {
		let data = self.0.borrow();
		match &data.kind {
			Kind::Text(text) => out.push_str(text),
			Kind::Element(_) => data.children.iter().for_each(|child| child.write_text(out)),
			Kind::Raw(_) => (),
		}
	}

	#[must_use]
	pub fn inner_html(&self) -> String {
		let mut html = String::new();
		for child in &self.0.borrow().children {
			child.write_html(&mut html);
		}
		html
	}

	#[must_use]
	pub fn outer_html(&self) -> String {
		let mut html = String::new();
		self.write_html(&mut html);
		html
	}

	fn write_html(&self, out: &mut String) {
		let data = self.0.borrow();
		match &data.kind {
			Kind::Text(text) => escape(text, false, out),
			Kind::Raw(html) => out.push_str(html),
			Kind::Element(tag) => {
				out.push('<');
				out.push_str(tag);
				for (name, value) in &data.attributes {
					out.push(' ');
					out.push_str(name);
					out.push_str("=\"");
					escape(value, true, out);
					out.push('"');
				}
				out.push('>');
				if VOID_ELEMENTS.contains(&tag.as_str()) {
					return;
				}
				for child in &data.children {
					child.write_html(out);
				}
				out.push_str("</");
				out.push_str(tag);
				out.push('>');
			}
		}
	}

	fn position_in(&self, parent: &MemoryNode) -> Option<usize> {
		parent.0.borrow().children.iter().position(|child| child == self)
	}

	fn is_inclusive_ancestor_of(&self, node: &MemoryNode) -> bool {
		let mut current = Some(node.clone());
		while let Some(node) = current {
			if node == *self {
				return true;
			}
			current = node.parent();
		}
		false
	}

	fn detach(&self) {
		if let Some(parent) = self.parent() {
			parent.0.borrow_mut().children.retain(|child| child != self);
		}
		self.0.borrow_mut().parent = Weak::new();
	}
}

fn escape(text: &str, attribute: bool, out: &mut String) {
	for c in text.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' if attribute => out.push_str("&quot;"),
			c => out.push(c),
		}
	}
}

fn is_valid_name(name: &str) -> bool {
	!name.is_empty() && !name.chars().any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '<' | '>' | '/' | '=' | '\0'))
}

impl HostNode for MemoryNode {
	fn identity(&self) -> Option<ElementId> {
		self.0.borrow().identity
	}

	fn set_identity(&self, id: ElementId) {
		let mut data = self.0.borrow_mut();
		if data.identity.is_some() {
			warn!(%id, "Node already has an identity. Overwriting it.");
		}
		data.identity = Some(id);
	}

	fn dom_key(&self) -> Option<String> {
		self.0.borrow().dom_key.clone()
	}

	fn set_dom_key(&self, key: &str) {
		self.0.borrow_mut().dom_key = Some(key.to_owned());
	}
}

type WidgetFactory = Rc<dyn Fn() -> Rc<dyn Widget>>;

/// An in-memory host tree with a `<body>` root.
pub struct MemoryDom {
	root: MemoryNode,
	focused: RefCell<Option<MemoryNode>>,
	widgets: RefCell<HashMap<String, WidgetFactory>>,
	last_listener: Cell<u64>,
	rejected_attributes: RefCell<Vec<String>>,
}

impl Default for MemoryDom {
	fn default() -> Self {
		Self::new()
	}
}

impl Debug for MemoryDom {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MemoryDom")
			.field("root", &self.root)
			.field("focused", &self.focused.borrow())
			.field("widgets", &self.widgets.borrow().keys().collect::<Vec<_>>())
			.finish_non_exhaustive()
	}
}

impl MemoryDom {
	#[must_use]
	pub fn new() -> Self {
		Self {
			root: MemoryNode::new(Kind::Element("body".to_owned())),
			focused: RefCell::default(),
			widgets: RefCell::default(),
			last_listener: Cell::new(0),
			rejected_attributes: RefCell::default(),
		}
	}

	#[must_use]
	pub fn root(&self) -> MemoryNode {
		self.root.clone()
	}

	/// Registers the widget behind elements with tag `tag`. `factory` is called once for each such element as it's created.
	pub fn define_widget(&self, tag: &str, factory: impl Fn() -> Rc<dyn Widget> + 'static) {
		let tag = tag.to_ascii_lowercase();
		if !tag.starts_with(WIDGET_PREFIX) {
			warn!(tag = tag.as_str(), "Widget tags should start with `{}`. The engine won't treat these elements as widgets.", WIDGET_PREFIX);
		}
		self.widgets.borrow_mut().insert(tag, Rc::new(factory));
	}

	/// Moves input focus to `node`, or clears it.
	pub fn focus(&self, node: Option<&MemoryNode>) {
		*self.focused.borrow_mut() = node.cloned();
	}

	/// Makes [`set_attribute`](`HostTree::set_attribute`) fail for `name` from now on.
	pub fn reject_attribute(&self, name: &str) {
		self.rejected_attributes.borrow_mut().push(name.to_ascii_lowercase());
	}
}

impl HostTree for MemoryDom {
	type Node = MemoryNode;
	type Listener = u64;

	fn create_element(&self, tag: &str) -> Result<MemoryNode, HostError> {
		if !is_valid_name(tag) {
			return Err(HostError::CreateElement {
				tag: tag.to_owned(),
				reason: "invalid tag name".to_owned(),
			});
		}

		let tag = tag.to_ascii_lowercase();
		let factory = self.widgets.borrow().get(&tag).cloned();
		let element = MemoryNode::new(Kind::Element(tag));
		if let Some(factory) = factory {
			trace!("Instantiating widget.");
			element.0.borrow_mut().widget = Some(factory());
		}
		Ok(element)
	}

	fn create_text(&self, data: &str) -> MemoryNode {
		MemoryNode::new(Kind::Text(data.to_owned()))
	}

	fn kind(&self, node: &MemoryNode) -> NodeKind {
		match &node.0.borrow().kind {
			Kind::Element(tag) => NodeKind::Element(tag.clone()),
			Kind::Text(data) => NodeKind::Text(data.clone()),
			Kind::Raw(_) => NodeKind::Other,
		}
	}

	fn set_text(&self, node: &MemoryNode, data: &str) {
		match &mut node.0.borrow_mut().kind {
			Kind::Text(text) => *text = data.to_owned(),
			Kind::Element(_) | Kind::Raw(_) => warn!("Tried to set the text of a non-text node."),
		}
	}

	fn child_nodes(&self, parent: &MemoryNode) -> Vec<MemoryNode> {
		parent.children()
	}

	fn insert_before(&self, parent: &MemoryNode, child: &MemoryNode, reference: Option<&MemoryNode>) -> Result<(), HostError> {
		if child.is_inclusive_ancestor_of(parent) {
			return Err(HostError::operation("insertBefore", "the new child is an ancestor of the parent"));
		}
		if reference == Some(child) {
			return Ok(());
		}
		if let Some(reference) = reference {
			if reference.position_in(parent).is_none() {
				return Err(HostError::operation("insertBefore", "the reference node is not a child of the parent"));
			}
		}

		child.detach();
		let mut data = parent.0.borrow_mut();
		let index = match reference {
			Some(reference) => data.children.iter().position(|c| c == reference).unwrap_or(data.children.len()),
			None => data.children.len(),
		};
		data.children.insert(index, child.clone());
		child.0.borrow_mut().parent = Rc::downgrade(&parent.0);
		Ok(())
	}

	fn remove_child(&self, parent: &MemoryNode, child: &MemoryNode) -> Result<(), HostError> {
		if child.position_in(parent).is_none() {
			return Err(HostError::operation("removeChild", "the node is not a child of the parent"));
		}
		child.detach();
		Ok(())
	}

	fn replace_child(&self, parent: &MemoryNode, new_child: &MemoryNode, old_child: &MemoryNode) -> Result<(), HostError> {
		if old_child.position_in(parent).is_none() {
			return Err(HostError::operation("replaceChild", "the old node is not a child of the parent"));
		}
		if new_child == old_child {
			return Ok(());
		}
		if new_child.is_inclusive_ancestor_of(parent) {
			return Err(HostError::operation("replaceChild", "the new child is an ancestor of the parent"));
		}

		new_child.detach();
		let index = old_child.position_in(parent).unwrap_or_default();
		old_child.0.borrow_mut().parent = Weak::new();
		if let Some(slot) = parent.0.borrow_mut().children.get_mut(index) {
			*slot = new_child.clone();
		}
		new_child.0.borrow_mut().parent = Rc::downgrade(&parent.0);
		Ok(())
	}

	fn attribute_names(&self, element: &MemoryNode) -> Vec<String> {
		element.0.borrow().attributes.iter().map(|(name, _)| name.clone()).collect()
	}

	fn get_attribute(&self, element: &MemoryNode, name: &str) -> Option<String> {
		element.attribute(name)
	}

	fn set_attribute(&self, element: &MemoryNode, name: &str, value: &str) -> Result<(), HostError> {
		let name = name.to_ascii_lowercase();
		if !is_valid_name(&name) || self.rejected_attributes.borrow().contains(&name) {
			return Err(HostError::operation("setAttribute", format!("attribute name `{}` is not allowed", name)));
		}

		let mut data = element.0.borrow_mut();
		match data.attributes.iter_mut().find(|(n, _)| *n == name) {
			Some((_, current)) => *current = value.to_owned(),
			None => data.attributes.push((name, value.to_owned())),
		}
		Ok(())
	}

	fn remove_attribute(&self, element: &MemoryNode, name: &str) -> Result<(), HostError> {
		let name = name.to_ascii_lowercase();
		element.0.borrow_mut().attributes.retain(|(n, _)| *n != name);
		Ok(())
	}

	fn set_property(&self, element: &MemoryNode, name: &str, value: &PropertyValue) -> Result<(), HostError> {
		element.set_property(name, value.clone());
		Ok(())
	}

	fn inner_html(&self, element: &MemoryNode) -> String {
		element.inner_html()
	}

	fn set_inner_html(&self, element: &MemoryNode, html: &str) -> Result<(), HostError> {
		if !matches!(element.0.borrow().kind, Kind::Element(_)) {
			return Err(HostError::operation("innerHTML", "only elements have inner HTML"));
		}

		for child in element.children() {
			child.detach();
		}
		if !html.is_empty() {
			let raw = MemoryNode::new(Kind::Raw(html.to_owned()));
			raw.0.borrow_mut().parent = Rc::downgrade(&element.0);
			element.0.borrow_mut().children.push(raw);
		}
		Ok(())
	}

	fn add_event_listener(&self, element: &MemoryNode, event_type: &str, callback: &Callback) -> Result<u64, HostError> {
		if !matches!(element.0.borrow().kind, Kind::Element(_)) {
			return Err(HostError::operation("addEventListener", "only elements can have listeners"));
		}

		let id = self.last_listener.get() + 1;
		self.last_listener.set(id);
		element.0.borrow_mut().listeners.push(Listener {
			id,
			event_type: event_type.to_owned(),
			callback: callback.clone(),
		});
		Ok(id)
	}

	fn remove_event_listener(&self, element: &MemoryNode, event_type: &str, listener: u64) {
		let mut data = element.0.borrow_mut();
		let before = data.listeners.len();
		data.listeners.retain(|l| l.id != listener);
		if data.listeners.len() == before {
			warn!(event_type, listener, "Listener to remove not found.");
		}
	}

	fn focused(&self) -> Option<MemoryNode> {
		self.focused.borrow().clone()
	}

	fn widget(&self, element: &MemoryNode) -> Option<Rc<dyn Widget>> {
		element.0.borrow().widget.clone()
	}

	fn release(&self, node: &MemoryNode) {
		if node.0.borrow_mut().widget.take().is_some() {
			trace!(?node, "Released widget.");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn serializes_with_escaping() {
		let dom = MemoryDom::new();
		let root = dom.root();
		let p = dom.create_element("P").unwrap();
		dom.set_attribute(&p, "title", "\"quoted\" & more").unwrap();
		dom.insert_before(&root, &p, None).unwrap();
		dom.insert_before(&p, &dom.create_text("1 < 2"), None).unwrap();
		let br = dom.create_element("br").unwrap();
		dom.insert_before(&root, &br, None).unwrap();

		assert_eq!(root.inner_html(), r#"<p title="&quot;quoted&quot; &amp; more">1 &lt; 2</p><br>"#);
	}

	#[test]
	fn insertion_moves() {
		let dom = MemoryDom::new();
		let root = dom.root();
		let a = dom.create_text("a");
		let b = dom.create_text("b");
		dom.insert_before(&root, &a, None).unwrap();
		dom.insert_before(&root, &b, None).unwrap();
		dom.insert_before(&root, &b, Some(&a)).unwrap();

		assert_eq!(root.text_content(), "ba");
		assert_eq!(a.parent(), Some(root));
	}

	#[test]
	fn rejects_cycles() {
		let dom = MemoryDom::new();
		let outer = dom.create_element("div").unwrap();
		let inner = dom.create_element("div").unwrap();
		dom.insert_before(&outer, &inner, None).unwrap();

		assert!(dom.insert_before(&inner, &outer, None).is_err());
	}

	#[test]
	fn inner_html_is_opaque() {
		let dom = MemoryDom::new();
		let root = dom.root();
		dom.insert_before(&root, &dom.create_text("gone"), None).unwrap();
		dom.set_inner_html(&root, "<b>raw</b>").unwrap();

		assert_eq!(dom.inner_html(&root), "<b>raw</b>");
		assert_eq!(dom.kind(&root.child(0).unwrap()), NodeKind::Other);
	}
}
