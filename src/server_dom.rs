//! An in-memory DOM, for rendering outside of browsers and for tests.
//!
//! Parents own their children. Nodes only hold weak references to their parent and document,
//! and siblings are looked up through the parent.

use crate::{
	dom::{DomEvent, EventBinding, NodeType},
	Dom, Error,
};
use core::fmt::{self, Debug};
use indexmap::IndexMap;
use std::{
	cell::RefCell,
	rc::{Rc, Weak},
};
use tracing::{instrument, trace};

/// An in-memory document. Cloning shares it.
#[derive(Debug, Clone)]
pub struct ServerDom {
	document: ServerNode,
}

impl ServerDom {
	#[must_use]
	pub fn new() -> Self {
		let document = ServerNode::new(NodeKind::Document, Weak::new());
		Self { document }
	}

	#[must_use]
	pub fn document(&self) -> &ServerNode {
		&self.document
	}

	/// Creates a detached element. `tag` is stored upper-cased, like the browser does for HTML.
	#[must_use]
	pub fn create_element(&self, tag: &str) -> ServerNode {
		ServerNode::new(
			NodeKind::Element {
				tag_name: tag.to_ascii_uppercase(),
				attributes: IndexMap::new(),
			},
			Rc::downgrade(&self.document.0),
		)
	}

	#[must_use]
	pub fn create_text_node(&self, text: &str) -> ServerNode {
		ServerNode::new(NodeKind::Text(text.to_owned()), Rc::downgrade(&self.document.0))
	}
}

impl Default for ServerDom {
	fn default() -> Self {
		Self::new()
	}
}

enum NodeKind {
	Document,
	Element { tag_name: String, attributes: IndexMap<String, String> },
	Text(String),
}

struct NodeData {
	kind: NodeKind,
	owner: Weak<RefCell<NodeData>>,
	parent: Weak<RefCell<NodeData>>,
	children: Vec<ServerNode>,
	listeners: IndexMap<String, Listener>,
}

struct Listener {
	binding: EventBinding,
	/// Set once a [`once`](`crate::dom::EventOptions::once`) binding has run. It stays bound but inert.
	spent: bool,
}

/// Handle to a node of a [`ServerDom`]. Equality is identity.
#[derive(Clone)]
pub struct ServerNode(Rc<RefCell<NodeData>>);

impl PartialEq for ServerNode {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
impl Eq for ServerNode {}

impl Debug for ServerNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let data = self.0.borrow();
		match &data.kind {
			NodeKind::Document => f.write_str("#document"),
			NodeKind::Element { tag_name, .. } => write!(f, "<{}> ({} children)", tag_name.to_ascii_lowercase(), data.children.len()),
			NodeKind::Text(text) => write!(f, "#text {:?}", crate::loggable(text)),
		}
	}
}

impl ServerNode {
	fn new(kind: NodeKind, owner: Weak<RefCell<NodeData>>) -> Self {
		Self(Rc::new(RefCell::new(NodeData {
			kind,
			owner,
			parent: Weak::new(),
			children: Vec::new(),
			listeners: IndexMap::new(),
		})))
	}

	#[must_use]
	pub fn node_type(&self) -> NodeType {
		match self.0.borrow().kind {
			NodeKind::Document => NodeType::Document,
			NodeKind::Element { .. } => NodeType::Element,
			NodeKind::Text(_) => NodeType::Text,
		}
	}

	/// `"#document"`, `"#text"` or the upper-case tag name.
	#[must_use]
	pub fn node_name(&self) -> String {
		match &self.0.borrow().kind {
			NodeKind::Document => "#document".to_owned(),
			NodeKind::Element { tag_name, .. } => tag_name.clone(),
			NodeKind::Text(_) => "#text".to_owned(),
		}
	}

	/// The upper-case tag name, for elements only.
	#[must_use]
	pub fn tag_name(&self) -> Option<String> {
		match &self.0.borrow().kind {
			NodeKind::Element { tag_name, .. } => Some(tag_name.clone()),
			NodeKind::Document | NodeKind::Text(_) => None,
		}
	}

	#[must_use]
	pub fn owner_document(&self) -> Option<ServerNode> {
		self.0.borrow().owner.upgrade().map(ServerNode)
	}

	#[must_use]
	pub fn parent_node(&self) -> Option<ServerNode> {
		self.0.borrow().parent.upgrade().map(ServerNode)
	}

	#[must_use]
	pub fn child_nodes(&self) -> Vec<ServerNode> {
		self.0.borrow().children.clone()
	}

	#[must_use]
	pub fn first_child(&self) -> Option<ServerNode> {
		self.0.borrow().children.first().cloned()
	}

	#[must_use]
	pub fn last_child(&self) -> Option<ServerNode> {
		self.0.borrow().children.last().cloned()
	}

	fn index_in_parent(&self) -> Option<(ServerNode, usize)> {
		let parent = self.parent_node()?;
		let index = parent.0.borrow().children.iter().position(|child| child == self)?;
		Some((parent, index))
	}

	#[must_use]
	pub fn next_sibling(&self) -> Option<ServerNode> {
		let (parent, index) = self.index_in_parent()?;
		let next = parent.0.borrow().children.get(index + 1).cloned();
		next
	}

	#[must_use]
	pub fn previous_sibling(&self) -> Option<ServerNode> {
		let (parent, index) = self.index_in_parent()?;
		let previous = parent.0.borrow().children.get(index.checked_sub(1)?).cloned();
		previous
	}

	fn is_inclusive_ancestor_of(&self, node: &ServerNode) -> bool {
		let mut current = Some(node.clone());
		while let Some(node) = current {
			if &node == self {
				return true;
			}
			current = node.parent_node();
		}
		false
	}

	/// Inserts `node` before `reference`, or at the end. `node` is detached from its current parent first.
	///
	/// Inserting a node before itself inserts it before its next sibling instead.
	///
	/// # Errors
	///
	/// - [`Error::NotSupported`] if `self` is a text node or `node` is an inclusive ancestor of `self`.
	/// - [`Error::NodeNotFound`] if `reference` isn't a child of `self`.
	///
	/// Nothing is changed if an error is returned.
	pub fn insert_before(&self, node: &ServerNode, reference: Option<&ServerNode>) -> Result<(), Error> {
		if matches!(self.0.borrow().kind, NodeKind::Text(_)) || node.is_inclusive_ancestor_of(self) {
			return Err(Error::NotSupported);
		}
		let reference = match reference {
			Some(reference) if reference.parent_node().as_ref() != Some(self) => return Err(Error::NodeNotFound),
			Some(reference) if reference == node => node.next_sibling(),
			Some(reference) => Some(reference.clone()),
			None => None,
		};

		node.detach();
		let mut data = self.0.borrow_mut();
		let index = match &reference {
			Some(reference) => data.children.iter().position(|child| child == reference).ok_or(Error::NodeNotFound)?,
			None => data.children.len(),
		};
		data.children.insert(index, node.clone());
		node.0.borrow_mut().parent = Rc::downgrade(&self.0);
		Ok(())
	}

	/// # Errors
	///
	/// See [`ServerNode::insert_before`].
	pub fn append_child(&self, node: &ServerNode) -> Result<(), Error> {
		self.insert_before(node, None)
	}

	/// # Errors
	///
	/// [`Error::NodeNotFound`] if `child` isn't a child of `self`.
	pub fn remove_child(&self, child: &ServerNode) -> Result<(), Error> {
		if child.parent_node().as_ref() != Some(self) {
			return Err(Error::NodeNotFound);
		}
		child.detach();
		Ok(())
	}

	fn detach(&self) {
		if let Some((parent, index)) = self.index_in_parent() {
			parent.0.borrow_mut().children.remove(index);
		}
		self.0.borrow_mut().parent = Weak::new();
	}

	#[must_use]
	pub fn get_attribute(&self, name: &str) -> Option<String> {
		match &self.0.borrow().kind {
			NodeKind::Element { attributes, .. } => attributes.get(name).cloned(),
			NodeKind::Document | NodeKind::Text(_) => None,
		}
	}

	/// # Errors
	///
	/// [`Error::NotSupported`] if `self` isn't an element.
	pub fn set_attribute(&self, name: &str, value: &str) -> Result<(), Error> {
		match &mut self.0.borrow_mut().kind {
			NodeKind::Element { attributes, .. } => {
				attributes.insert(name.to_owned(), value.to_owned());
				Ok(())
			}
			NodeKind::Document | NodeKind::Text(_) => Err(Error::NotSupported),
		}
	}

	/// # Errors
	///
	/// [`Error::NotSupported`] if `self` isn't an element.
	pub fn remove_attribute(&self, name: &str) -> Result<(), Error> {
		match &mut self.0.borrow_mut().kind {
			NodeKind::Element { attributes, .. } => {
				attributes.shift_remove(name);
				Ok(())
			}
			NodeKind::Document | NodeKind::Text(_) => Err(Error::NotSupported),
		}
	}

	#[must_use]
	pub fn attribute_names(&self) -> Vec<String> {
		match &self.0.borrow().kind {
			NodeKind::Element { attributes, .. } => attributes.keys().cloned().collect(),
			NodeKind::Document | NodeKind::Text(_) => Vec::new(),
		}
	}

	/// The text itself for text nodes, the concatenated descendant text otherwise.
	#[must_use]
	pub fn text_content(&self) -> String {
		let data = self.0.borrow();
		match &data.kind {
			NodeKind::Text(text) => text.clone(),
			NodeKind::Document | NodeKind::Element { .. } => data.children.iter().map(ServerNode::text_content).collect(),
		}
	}

	/// Replaces the text of a text node, or all children of anything else with a single text node.
	pub fn set_text_content(&self, text: &str) {
		let mut data = self.0.borrow_mut();
		if let NodeKind::Text(current) = &mut data.kind {
			*current = text.to_owned();
			return;
		}
		for child in data.children.drain(..) {
			child.0.borrow_mut().parent = Weak::new();
		}
		if !text.is_empty() {
			let child = ServerNode::new(NodeKind::Text(text.to_owned()), data.owner.clone());
			child.0.borrow_mut().parent = Rc::downgrade(&self.0);
			data.children.push(child);
		}
	}

	/// Serializes this node and its subtree, with lower-case tag names.
	#[must_use]
	pub fn outer_html(&self) -> String {
		let mut html = String::new();
		self.write_html(&mut html);
		html
	}

	#[must_use]
	pub fn inner_html(&self) -> String {
		let mut html = String::new();
		for child in &self.0.borrow().children {
			child.write_html(&mut html);
		}
		html
	}

	fn write_html(&self, html: &mut String) {
		let data = self.0.borrow();
		match &data.kind {
			NodeKind::Text(text) => html.push_str(text),
			NodeKind::Document => data.children.iter().for_each(|child| child.write_html(html)),
			NodeKind::Element { tag_name, attributes } => {
				let tag = tag_name.to_ascii_lowercase();
				html.push('<');
				html.push_str(&tag);
				for (name, value) in attributes {
					html.push_str(&format!(" {}=\"{}\"", name, value));
				}
				html.push('>');
				data.children.iter().for_each(|child| child.write_html(html));
				html.push_str(&format!("</{}>", tag));
			}
		}
	}

	/// Binds `binding` to events called `name`, replacing an earlier binding.
	pub fn add_event_listener(&self, name: &str, binding: EventBinding) {
		self.0.borrow_mut().listeners.insert(name.to_owned(), Listener { binding, spent: false });
	}

	pub fn remove_event_listener(&self, name: &str) {
		self.0.borrow_mut().listeners.shift_remove(name);
	}

	#[must_use]
	pub fn event_names(&self) -> Vec<String> {
		self.0.borrow().listeners.keys().cloned().collect()
	}

	/// The binding for `name`, including spent [`once`](`crate::dom::EventOptions::once`) bindings.
	#[must_use]
	pub fn event_binding(&self, name: &str) -> Option<EventBinding> {
		self.0.borrow().listeners.get(name).map(|listener| listener.binding.clone())
	}

	/// Calls the handler bound for `name`, if any, and returns whether there was one.
	///
	/// Handlers bound with [`once`](`crate::dom::EventOptions::once`) run only the first time,
	/// like in a browser. Binding them again re-arms them.
	#[instrument]
	pub fn dispatch_event(&self, name: &str) -> bool {
		let binding = {
			let mut data = self.0.borrow_mut();
			match data.listeners.get_mut(name) {
				Some(listener) if !listener.spent => {
					listener.spent = listener.binding.options.once;
					Some(listener.binding.clone())
				}
				Some(_) => {
					trace!("Skipping spent once-handler.");
					None
				}
				None => None,
			}
		};
		match binding {
			Some(binding) => {
				trace!("Calling handler.");
				(binding.handler)(&DomEvent { name, native: None });
				true
			}
			None => false,
		}
	}
}

fn validate_tag(tag: &str) -> Result<(), Error> {
	if tag.is_empty() || tag.contains(|c: char| c.is_whitespace() || c == '<' || c == '>' || c == '/') {
		Err(Error::Dom(format!("invalid tag name {:?}", tag)))
	} else {
		Ok(())
	}
}

impl Dom for ServerDom {
	type Node = ServerNode;

	fn create_element(&self, tag: &str) -> Result<ServerNode, Error> {
		validate_tag(tag)?;
		Ok(ServerDom::create_element(self, tag))
	}

	fn create_text_node(&self, text: &str) -> ServerNode {
		ServerDom::create_text_node(self, text)
	}

	fn parent_node(&self, node: &ServerNode) -> Option<ServerNode> {
		node.parent_node()
	}

	fn next_sibling(&self, node: &ServerNode) -> Option<ServerNode> {
		node.next_sibling()
	}

	fn child_nodes(&self, node: &ServerNode) -> Vec<ServerNode> {
		node.child_nodes()
	}

	fn first_child(&self, node: &ServerNode) -> Option<ServerNode> {
		node.first_child()
	}

	fn append_child(&self, parent: &ServerNode, child: &ServerNode) -> Result<(), Error> {
		parent.append_child(child)
	}

	fn remove_child(&self, parent: &ServerNode, child: &ServerNode) -> Result<(), Error> {
		parent.remove_child(child)
	}

	fn insert_before(&self, parent: &ServerNode, node: &ServerNode, reference: Option<&ServerNode>) -> Result<(), Error> {
		parent.insert_before(node, reference)
	}

	fn node_name(&self, node: &ServerNode) -> String {
		node.node_name()
	}

	fn node_type(&self, node: &ServerNode) -> NodeType {
		node.node_type()
	}

	fn set_attribute(&self, node: &ServerNode, name: &str, value: &str) -> Result<(), Error> {
		node.set_attribute(name, value)
	}

	fn get_attribute(&self, node: &ServerNode, name: &str) -> Option<String> {
		node.get_attribute(name)
	}

	fn remove_attribute(&self, node: &ServerNode, name: &str) -> Result<(), Error> {
		node.remove_attribute(name)
	}

	fn attribute_names(&self, node: &ServerNode) -> Vec<String> {
		node.attribute_names()
	}

	fn text_content(&self, node: &ServerNode) -> String {
		node.text_content()
	}

	fn set_text_content(&self, node: &ServerNode, text: &str) -> Result<(), Error> {
		node.set_text_content(text);
		Ok(())
	}

	fn bind_event(&self, node: &ServerNode, name: &str, binding: &EventBinding) -> Result<(), Error> {
		node.add_event_listener(name, binding.clone());
		Ok(())
	}

	fn unbind_event(&self, node: &ServerNode, name: &str) -> Result<(), Error> {
		node.remove_event_listener(name);
		Ok(())
	}

	fn bound_events(&self, node: &ServerNode) -> Vec<String> {
		node.event_names()
	}

	fn is_bound(&self, node: &ServerNode, name: &str, binding: &EventBinding) -> bool {
		node.event_binding(name).map_or(false, |bound| bound.same_as(binding))
	}
}
