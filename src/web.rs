//! The browser DOM, through [`web_sys`].
//!
//! Only meaningful on `wasm32` targets with a JavaScript host. Elsewhere, every call panics.

use crate::{
	dom::{DomEvent, EventBinding, EventOptions, NodeType},
	Dom, Error,
};
use core::any::Any;
use js_sys::{Array, Function, Object, Reflect};
use std::{cell::RefCell, rc::Rc};
use tracing::{error, instrument, trace};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{AddEventListenerOptions, Document, DomException, Element, Node};

/// Prefix of the property names under which bound listeners are remembered on their node.
const LISTENER_PROPERTY_PREFIX: &str = "__vnodeDomListener:";

/// A browser [***Document***](https://developer.mozilla.org/en-US/docs/Web/API/Document). Cloning shares it.
#[derive(Debug, Clone)]
pub struct WebDom {
	document: Document,
	event_listener_options_cache: Rc<RefCell<[Option<AddEventListenerOptions>; 8]>>,
}

impl WebDom {
	/// The current window's document.
	///
	/// # Errors
	///
	/// [`Error::NotSupported`] if there is no window or it has no document.
	pub fn new() -> Result<Self, Error> {
		let document = web_sys::window().and_then(|window| window.document()).ok_or(Error::NotSupported)?;
		Ok(Self::from_document(document))
	}

	#[must_use]
	pub fn from_document(document: Document) -> Self {
		Self {
			document,
			event_listener_options_cache: Rc::new(RefCell::new([None, None, None, None, None, None, None, None])),
		}
	}

	#[must_use]
	pub fn document(&self) -> &Document {
		&self.document
	}

	#[instrument(skip(self))]
	fn get_cached_add_event_listener_options(&self, options: EventOptions) -> AddEventListenerOptions {
		let mut cache = self.event_listener_options_cache.borrow_mut();
		let entry = &mut cache[options_index(options)];
		entry
			.get_or_insert_with(|| {
				let mut web_options = AddEventListenerOptions::new();
				#[allow(deprecated)]
				web_options.capture(options.capture).once(options.once).passive(options.passive);
				web_options
			})
			.clone()
	}
}

/// Distinct for each combination of flags, in `0..8`.
fn options_index(options: EventOptions) -> usize {
	usize::from(options.capture) + usize::from(options.once) * 2 + usize::from(options.passive) * 4
}

/// Identifies a bound handler by address. It can't be reused while the bound closure keeps it alive.
#[allow(clippy::cast_precision_loss)]
fn handler_id(binding: &EventBinding) -> JsValue {
	JsValue::from_f64(Rc::as_ptr(&binding.handler).cast::<()>() as usize as f64)
}

#[allow(clippy::cast_precision_loss)]
fn options_id(options: EventOptions) -> JsValue {
	JsValue::from_f64(options_index(options) as f64)
}

fn element(node: &Node) -> Result<&Element, Error> {
	node.dyn_ref::<Element>().ok_or(Error::NotSupported)
}

/// Maps thrown [***DOMException***](https://developer.mozilla.org/en-US/docs/Web/API/DOMException)s onto [`Error`].
fn dom_error(error: JsValue) -> Error {
	match error.dyn_ref::<DomException>().map(DomException::name).as_deref() {
		Some("NotFoundError") => Error::NodeNotFound,
		Some("HierarchyRequestError") => Error::NotSupported,
		_ => Error::Dom(format!("{:?}", error)),
	}
}

fn listener_property(name: &str) -> JsValue {
	JsValue::from_str(&format!("{}{}", LISTENER_PROPERTY_PREFIX, name))
}

impl Dom for WebDom {
	type Node = Node;

	fn create_element(&self, tag: &str) -> Result<Node, Error> {
		self.document.create_element(tag).map(Into::into).map_err(dom_error)
	}

	fn create_text_node(&self, text: &str) -> Node {
		self.document.create_text_node(text).into()
	}

	fn parent_node(&self, node: &Node) -> Option<Node> {
		node.parent_node()
	}

	fn next_sibling(&self, node: &Node) -> Option<Node> {
		node.next_sibling()
	}

	fn child_nodes(&self, node: &Node) -> Vec<Node> {
		let child_nodes = node.child_nodes();
		(0..child_nodes.length()).filter_map(|i| child_nodes.item(i)).collect()
	}

	fn first_child(&self, node: &Node) -> Option<Node> {
		node.first_child()
	}

	fn append_child(&self, parent: &Node, child: &Node) -> Result<(), Error> {
		parent.append_child(child).map(drop).map_err(dom_error)
	}

	fn remove_child(&self, parent: &Node, child: &Node) -> Result<(), Error> {
		parent.remove_child(child).map(drop).map_err(dom_error)
	}

	fn insert_before(&self, parent: &Node, node: &Node, reference: Option<&Node>) -> Result<(), Error> {
		parent.insert_before(node, reference).map(drop).map_err(dom_error)
	}

	fn node_name(&self, node: &Node) -> String {
		node.node_name()
	}

	fn node_type(&self, node: &Node) -> NodeType {
		NodeType::from_code(node.node_type())
	}

	fn set_attribute(&self, node: &Node, name: &str, value: &str) -> Result<(), Error> {
		element(node)?.set_attribute(name, value).map_err(dom_error)
	}

	fn get_attribute(&self, node: &Node, name: &str) -> Option<String> {
		node.dyn_ref::<Element>()?.get_attribute(name)
	}

	fn remove_attribute(&self, node: &Node, name: &str) -> Result<(), Error> {
		element(node)?.remove_attribute(name).map_err(dom_error)
	}

	fn attribute_names(&self, node: &Node) -> Vec<String> {
		match node.dyn_ref::<Element>() {
			Some(element) => element.get_attribute_names().iter().filter_map(|name| name.as_string()).collect(),
			None => Vec::new(),
		}
	}

	fn text_content(&self, node: &Node) -> String {
		node.text_content().unwrap_or_default()
	}

	fn set_text_content(&self, node: &Node, text: &str) -> Result<(), Error> {
		node.set_text_content(Some(text));
		Ok(())
	}

	#[instrument(skip(self, binding))]
	fn bind_event(&self, node: &Node, name: &str, binding: &EventBinding) -> Result<(), Error> {
		self.unbind_event(node, name)?;

		let handler = Rc::clone(&binding.handler);
		let event_name = name.to_owned();
		let function: Function = Closure::wrap(Box::new(move |event: web_sys::Event| {
			handler(&DomEvent {
				name: &event_name,
				native: Some(&event as &dyn Any),
			})
		}) as Box<dyn Fn(web_sys::Event)>)
		.into_js_value()
		.unchecked_into();

		let options = self.get_cached_add_event_listener_options(binding.options);
		node.add_event_listener_with_callback_and_add_event_listener_options(name, &function, &options)
			.map_err(dom_error)?;
		let stored = Array::of4(
			&function,
			&JsValue::from_bool(binding.options.capture),
			&handler_id(binding),
			&options_id(binding.options),
		);
		Reflect::set(node, &listener_property(name), &stored)
			.map(drop)
			.map_err(dom_error)
	}

	fn unbind_event(&self, node: &Node, name: &str) -> Result<(), Error> {
		let property = listener_property(name);
		let stored = Reflect::get(node, &property).map_err(dom_error)?;
		if stored.is_undefined() {
			return Ok(());
		}
		let stored: Array = match stored.dyn_into() {
			Ok(stored) => stored,
			Err(stored) => {
				error!(?stored, "Foreign value found in listener property. Leaving it alone.");
				return Ok(());
			}
		};

		trace!(name, "Unbinding event listener.");
		let function: Function = stored.get(0).unchecked_into();
		let capture = stored.get(1).as_bool().unwrap_or_default();
		node.remove_event_listener_with_callback_and_bool(name, &function, capture)
			.map_err(dom_error)?;
		Reflect::delete_property(node.unchecked_ref::<Object>(), &property)
			.map(drop)
			.map_err(dom_error)
	}

	fn bound_events(&self, node: &Node) -> Vec<String> {
		Object::keys(node.unchecked_ref::<Object>())
			.iter()
			.filter_map(|key| key.as_string())
			.filter_map(|key| key.strip_prefix(LISTENER_PROPERTY_PREFIX).map(str::to_owned))
			.collect()
	}

	fn is_bound(&self, node: &Node, name: &str, binding: &EventBinding) -> bool {
		match Reflect::get(node, &listener_property(name)).ok().and_then(|stored| stored.dyn_into::<Array>().ok()) {
			Some(stored) => stored.get(2) == handler_id(binding) && stored.get(3) == options_id(binding.options),
			None => false,
		}
	}
}
