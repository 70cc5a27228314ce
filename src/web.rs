//! The browser host, over [`web_sys`].
//!
//! Engine-owned node fields are stored as (non-enumerable by convention, prefixed) JavaScript properties on the DOM nodes themselves.
//! Event listeners are shared: each distinct [`Callback`] is wrapped into exactly one JavaScript closure,
//! reference counted across all elements and event types it's bound to.

use crate::{
	error::HostError,
	host::{HostNode, HostTree, NodeKind, PropertyValue, Widget},
	rc_hash_map::RcHashMap,
	Callback, ElementId,
};
use core::cell::{Cell, RefCell};
use futures::task::{LocalFutureObj, LocalSpawn, SpawnError};
use hashbrown::HashMap;
use js_sys::Reflect;
use std::rc::Rc;
use tracing::{error, trace, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{CharacterData, Document, Element, Node, Text};

const IDENTITY_PROPERTY: &str = "__xylemId";
const KEY_PROPERTY: &str = "__xylemKey";
const WIDGET_PROPERTY: &str = "__xylemWidget";

fn describe(error: &JsValue) -> String {
	error.as_string().unwrap_or_else(|| format!("{:?}", error))
}

fn get(node: &Node, property: &str) -> JsValue {
	Reflect::get(node, &JsValue::from_str(property)).unwrap_or(JsValue::UNDEFINED)
}

fn set(node: &Node, property: &str, value: &JsValue) {
	if let Err(error) = Reflect::set(node, &JsValue::from_str(property), value) {
		error!(property, error = describe(&error).as_str(), "Could not store engine field on node.");
	}
}

impl HostNode for Node {
	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
	fn identity(&self) -> Option<ElementId> {
		get(self, IDENTITY_PROPERTY).as_f64().map(|id| ElementId::from_raw(id as u64))
	}

	#[allow(clippy::cast_precision_loss)]
	fn set_identity(&self, id: ElementId) {
		set(self, IDENTITY_PROPERTY, &JsValue::from_f64(id.get() as f64))
	}

	fn dom_key(&self) -> Option<String> {
		get(self, KEY_PROPERTY).as_string()
	}

	fn set_dom_key(&self, key: &str) {
		set(self, KEY_PROPERTY, &JsValue::from_str(key))
	}
}

type SharedListener = (Callback, Closure<dyn Fn(web_sys::Event)>);

/// The DOM of one [`Document`].
pub struct WebDom {
	document: Document,
	listeners: RefCell<RcHashMap<usize, u16, SharedListener>>,
	widget_factories: RefCell<HashMap<String, Rc<dyn Fn() -> Rc<dyn Widget>>>>,
	/// Widget instances by the slot stored on their element. Slots are freed by [`HostTree::release`].
	widgets: RefCell<HashMap<u32, Rc<dyn Widget>>>,
	last_widget: Cell<u32>,
}

impl WebDom {
	#[must_use]
	pub fn new(document: Document) -> Self {
		Self {
			document,
			listeners: RefCell::default(),
			widget_factories: RefCell::default(),
			widgets: RefCell::default(),
			last_widget: Cell::new(0),
		}
	}

	/// The DOM of the current window's document, if there is one.
	#[must_use]
	pub fn for_window() -> Option<Self> {
		web_sys::window().and_then(|window| window.document()).map(Self::new)
	}

	#[must_use]
	pub fn document(&self) -> &Document {
		&self.document
	}

	/// Registers the widget behind custom elements with tag `tag`.
	pub fn define_widget(&self, tag: &str, factory: impl Fn() -> Rc<dyn Widget> + 'static) {
		self.widget_factories.borrow_mut().insert(tag.to_ascii_lowercase(), Rc::new(factory));
	}

	fn element<'a>(node: &'a Node, operation: &'static str) -> Result<&'a Element, HostError> {
		node.dyn_ref::<Element>().ok_or_else(|| HostError::operation(operation, "not an element"))
	}
}

impl HostTree for WebDom {
	type Node = Node;
	/// The callback address that keys the shared closure.
	type Listener = usize;

	fn create_element(&self, tag: &str) -> Result<Node, HostError> {
		let element: Node = self
			.document
			.create_element(tag)
			.map_err(|error| HostError::CreateElement {
				tag: tag.to_owned(),
				reason: describe(&error),
			})?
			.into();

		let factory = self.widget_factories.borrow().get(&tag.to_ascii_lowercase()).cloned();
		if let Some(factory) = factory {
			let slot = self.last_widget.get() + 1;
			self.last_widget.set(slot);
			self.widgets.borrow_mut().insert(slot, factory());
			set(&element, WIDGET_PROPERTY, &JsValue::from(slot));
		}
		Ok(element)
	}

	fn create_text(&self, data: &str) -> Node {
		self.document.create_text_node(data).into()
	}

	fn kind(&self, node: &Node) -> NodeKind {
		if let Some(element) = node.dyn_ref::<Element>() {
			NodeKind::Element(element.tag_name().to_ascii_lowercase())
		} else if let Some(text) = node.dyn_ref::<Text>() {
			NodeKind::Text(text.data())
		} else {
			NodeKind::Other
		}
	}

	fn set_text(&self, node: &Node, data: &str) {
		match node.dyn_ref::<CharacterData>() {
			Some(text) => text.set_data(data),
			None => warn!("Tried to set the text of a non-text node."),
		}
	}

	fn child_nodes(&self, parent: &Node) -> Vec<Node> {
		let child_nodes = parent.child_nodes();
		(0..child_nodes.length()).filter_map(|i| child_nodes.item(i)).collect()
	}

	fn insert_before(&self, parent: &Node, child: &Node, reference: Option<&Node>) -> Result<(), HostError> {
		parent.insert_before(child, reference).map(drop).map_err(|error| HostError::operation("insertBefore", describe(&error)))
	}

	fn remove_child(&self, parent: &Node, child: &Node) -> Result<(), HostError> {
		parent.remove_child(child).map(drop).map_err(|error| HostError::operation("removeChild", describe(&error)))
	}

	fn replace_child(&self, parent: &Node, new_child: &Node, old_child: &Node) -> Result<(), HostError> {
		parent
			.replace_child(new_child, old_child)
			.map(drop)
			.map_err(|error| HostError::operation("replaceChild", describe(&error)))
	}

	fn attribute_names(&self, element: &Node) -> Vec<String> {
		match element.dyn_ref::<Element>() {
			Some(element) => {
				let attributes = element.attributes();
				(0..attributes.length()).filter_map(|i| attributes.item(i)).map(|attribute| attribute.name()).collect()
			}
			None => Vec::new(),
		}
	}

	fn get_attribute(&self, element: &Node, name: &str) -> Option<String> {
		element.dyn_ref::<Element>()?.get_attribute(name)
	}

	fn set_attribute(&self, element: &Node, name: &str, value: &str) -> Result<(), HostError> {
		Self::element(element, "setAttribute")?
			.set_attribute(name, value)
			.map_err(|error| HostError::operation("setAttribute", describe(&error)))
	}

	fn remove_attribute(&self, element: &Node, name: &str) -> Result<(), HostError> {
		Self::element(element, "removeAttribute")?
			.remove_attribute(name)
			.map_err(|error| HostError::operation("removeAttribute", describe(&error)))
	}

	fn set_property(&self, element: &Node, name: &str, value: &PropertyValue) -> Result<(), HostError> {
		let value = match value {
			PropertyValue::Text(text) => JsValue::from_str(text),
			PropertyValue::Flag(flag) => JsValue::from_bool(*flag),
		};
		Reflect::set(element, &JsValue::from_str(name), &value)
			.map(drop)
			.map_err(|error| HostError::operation("property assignment", describe(&error)))
	}

	fn inner_html(&self, element: &Node) -> String {
		element.dyn_ref::<Element>().map(Element::inner_html).unwrap_or_default()
	}

	fn set_inner_html(&self, element: &Node, html: &str) -> Result<(), HostError> {
		Self::element(element, "innerHTML")?.set_inner_html(html);
		Ok(())
	}

	fn add_event_listener(&self, element: &Node, event_type: &str, callback: &Callback) -> Result<usize, HostError> {
		let address = callback.address();
		let mut listeners = self.listeners.borrow_mut();
		let (_, closure) = listeners
			.increment_or_insert_with(address, || {
				trace!(?callback, "Creating shared closure.");
				let handler = callback.clone();
				(
					callback.clone(),
					Closure::wrap(Box::new(move |event: web_sys::Event| handler.call(&event)) as Box<dyn Fn(web_sys::Event)>),
				)
			})
			.map_err(|_| HostError::operation("addEventListener", "too many (more than 65k) bindings of the same callback"))?;

		if let Err(error) = element.add_event_listener_with_callback(event_type, closure.as_ref().unchecked_ref()) {
			drop(listeners.weak_decrement(&address));
			listeners.drain_weak().for_each(drop);
			return Err(HostError::operation("addEventListener", describe(&error)));
		}
		Ok(address)
	}

	fn remove_event_listener(&self, element: &Node, event_type: &str, listener: usize) {
		let mut listeners = self.listeners.borrow_mut();
		match listeners.weak_decrement(&listener) {
			Ok(Some((_, closure))) => {
				if let Err(error) = element.remove_event_listener_with_callback(event_type, closure.as_ref().unchecked_ref()) {
					error!(event_type, error = describe(&error).as_str(), "Could not remove event listener.");
				}
			}
			Ok(None) => warn!(event_type, "Listener to remove not found."),
			Err(_) => error!("Listener reference count underflow."),
		}

		let freed = listeners.drain_weak().count();
		trace!(freed, remaining = listeners.len(), "Freed shared closures.");
	}

	fn focused(&self) -> Option<Node> {
		self.document.active_element().map(Into::into)
	}

	fn widget(&self, element: &Node) -> Option<Rc<dyn Widget>> {
		self.widgets.borrow().get(&widget_slot(element)?).cloned()
	}

	fn release(&self, node: &Node) {
		let slot = match widget_slot(node) {
			Some(slot) => slot,
			None => return,
		};
		if self.widgets.borrow_mut().remove(&slot).is_some() {
			trace!(slot, remaining = self.widgets.borrow().len(), "Released widget.");
		}
		if let Err(error) = Reflect::delete_property(node, &JsValue::from_str(WIDGET_PROPERTY)) {
			error!(error = describe(&error).as_str(), "Could not clear widget slot on node.");
		}
	}
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn widget_slot(node: &Node) -> Option<u32> {
	get(node, WIDGET_PROPERTY).as_f64().map(|slot| slot as u32)
}

/// Spawns mount queue workers onto the browser's microtask queue.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSpawner;

impl LocalSpawn for WebSpawner {
	fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
		wasm_bindgen_futures::spawn_local(future);
		Ok(())
	}
}
