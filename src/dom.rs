//! The DOM adapter boundary.
//!
//! Rendering and reconciliation only ever touch real nodes through [`Dom`],
//! which is implemented for the in-memory [`ServerDom`](`crate::server_dom::ServerDom`)
//! and the browser's document ([`WebDom`](`crate::web::WebDom`)).
//!
//! All operations are synchronous and must be reflected by subsequent calls immediately.

use crate::Error;
use core::{any::Any, fmt::Debug};
use std::rc::Rc;

/// Reserved attribute under which a [`Key`](`crate::Key`) is persisted on real elements.
///
/// Keys are recovered from here during patching and hydration, so no auxiliary state is kept.
pub const KEY_ATTRIBUTE: &str = "data-vnode-key";

/// The kind of a real node, as far as reconciliation cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
	Element,
	Text,
	Document,
	/// Comments, processing instructions and so on. Never patchable.
	Other(u16),
}

impl NodeType {
	/// Maps a [***nodeType***](https://developer.mozilla.org/en-US/docs/Web/API/Node/nodeType) constant.
	#[must_use]
	pub fn from_code(code: u16) -> Self {
		match code {
			1 => Self::Element,
			3 => Self::Text,
			9 => Self::Document,
			other => Self::Other(other),
		}
	}

	#[must_use]
	pub fn code(self) -> u16 {
		match self {
			Self::Element => 1,
			Self::Text => 3,
			Self::Document => 9,
			Self::Other(code) => code,
		}
	}
}

/// A DOM event as seen by a bound [`Callback`].
pub struct DomEvent<'a> {
	pub name: &'a str,
	/// The backend's own event object, if there is one (a [`web_sys::Event`] in the browser).
	pub native: Option<&'a dyn Any>,
}

/// Handler for DOM-level events bound through [`VNode::on`](`crate::VNode::on`).
pub type Callback = Rc<dyn Fn(&DomEvent<'_>)>;

/// Options for a DOM-level event binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EventOptions {
	pub capture: bool,
	pub once: bool,
	pub passive: bool,
}

impl EventOptions {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with_capture(mut self, capture: bool) -> Self {
		self.capture = capture;
		self
	}

	#[must_use]
	pub fn with_once(mut self, once: bool) -> Self {
		self.once = once;
		self
	}

	#[must_use]
	pub fn with_passive(mut self, passive: bool) -> Self {
		self.passive = passive;
		self
	}
}

/// A DOM-level event handler together with its options.
#[derive(Clone)]
pub struct EventBinding {
	pub handler: Callback,
	pub options: EventOptions,
}

impl EventBinding {
	/// Same handler (by identity) with the same options.
	#[must_use]
	pub fn same_as(&self, other: &Self) -> bool {
		Rc::as_ptr(&self.handler).cast::<()>() == Rc::as_ptr(&other.handler).cast::<()>() && self.options == other.options
	}
}

impl Debug for EventBinding {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("EventBinding")
			.field("handler", &Rc::as_ptr(&self.handler).cast::<()>())
			.field("options", &self.options)
			.finish()
	}
}

/// Primitive operations on real nodes.
///
/// Implementations are cheap handles (the renderer clones them into pending removals),
/// and `Node` is a handle as well: equality means identity.
pub trait Dom: Clone + 'static {
	type Node: Clone + PartialEq + Debug + 'static;

	/// # Errors
	///
	/// Iff `tag` is not a valid element name for this backend.
	fn create_element(&self, tag: &str) -> Result<Self::Node, Error>;
	fn create_text_node(&self, text: &str) -> Self::Node;

	fn parent_node(&self, node: &Self::Node) -> Option<Self::Node>;
	fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;
	fn child_nodes(&self, node: &Self::Node) -> Vec<Self::Node>;
	fn first_child(&self, node: &Self::Node) -> Option<Self::Node>;

	/// Appends `child` to `parent`, detaching it from its current parent first.
	///
	/// # Errors
	///
	/// [`Error::NotSupported`] if `parent` can't have children.
	fn append_child(&self, parent: &Self::Node, child: &Self::Node) -> Result<(), Error>;

	/// # Errors
	///
	/// [`Error::NodeNotFound`] if `child` isn't a child of `parent`.
	fn remove_child(&self, parent: &Self::Node, child: &Self::Node) -> Result<(), Error>;

	/// Inserts (or moves) `node` into `parent` right before `reference`, or at the end if that is [`None`].
	///
	/// # Errors
	///
	/// [`Error::NodeNotFound`] if `reference` isn't a child of `parent`,
	/// [`Error::NotSupported`] if `parent` can't have children.
	fn insert_before(&self, parent: &Self::Node, node: &Self::Node, reference: Option<&Self::Node>) -> Result<(), Error>;

	fn node_name(&self, node: &Self::Node) -> String;
	fn node_type(&self, node: &Self::Node) -> NodeType;

	/// # Errors
	///
	/// [`Error::NotSupported`] if `node` isn't an element.
	fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) -> Result<(), Error>;
	fn get_attribute(&self, node: &Self::Node, name: &str) -> Option<String>;
	/// # Errors
	///
	/// [`Error::NotSupported`] if `node` isn't an element.
	fn remove_attribute(&self, node: &Self::Node, name: &str) -> Result<(), Error>;
	/// Names of all attributes currently present on `node`, in document order.
	fn attribute_names(&self, node: &Self::Node) -> Vec<String>;

	fn text_content(&self, node: &Self::Node) -> String;
	/// # Errors
	///
	/// Backend-specific.
	fn set_text_content(&self, node: &Self::Node, text: &str) -> Result<(), Error>;

	/// Binds `binding` for events called `name`, replacing any binding made through this method before.
	///
	/// # Errors
	///
	/// Backend-specific.
	fn bind_event(&self, node: &Self::Node, name: &str, binding: &EventBinding) -> Result<(), Error>;
	/// # Errors
	///
	/// Backend-specific. Unbinding a name that isn't bound is not an error.
	fn unbind_event(&self, node: &Self::Node, name: &str) -> Result<(), Error>;
	/// Names of the events bound through [`Dom::bind_event`].
	fn bound_events(&self, node: &Self::Node) -> Vec<String>;
	/// Whether `binding` (see [`EventBinding::same_as`]) is what's currently bound for `name`.
	///
	/// Already fired [`once`](`EventOptions::once`) bindings still count, so patching doesn't re-arm them.
	fn is_bound(&self, node: &Self::Node, name: &str, binding: &EventBinding) -> bool;
}
