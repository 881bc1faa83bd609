use crate::{
	dom::{DomEvent, EventBinding, EventOptions, KEY_ATTRIBUTE},
	events::{EventMap, Handler, NodeClass},
	Dom, Error,
};
use core::{
	any::Any,
	fmt::{self, Debug, Display},
};
use indexmap::{IndexMap, IndexSet};
use std::{borrow::Cow, rc::Rc};

/// Reserved tag of [`VText`], distinguishing it from elements.
pub const TEXT_TAG: &str = "text";

/// Caller-supplied identity of an element among its siblings.
///
/// Keys must be unique within one child list. Which nodes are reused for duplicates is unspecified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(String);

impl Key {
	#[must_use]
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl Display for Key {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for Key {
	fn from(key: &str) -> Self {
		Self(key.to_owned())
	}
}

impl From<String> for Key {
	fn from(key: String) -> Self {
		Self(key)
	}
}

macro_rules! key_from_integers {
	($($integer:ty),*) => {$(
		impl From<$integer> for Key {
			fn from(key: $integer) -> Self {
				Self(key.to_string())
			}
		}
	)*};
}
key_from_integers!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
	Str(String),
	/// `true` is an empty attribute that's present, `false` one that's absent.
	Bool(bool),
}

impl From<&str> for AttributeValue {
	fn from(value: &str) -> Self {
		Self::Str(value.to_owned())
	}
}

impl From<String> for AttributeValue {
	fn from(value: String) -> Self {
		Self::Str(value)
	}
}

impl From<bool> for AttributeValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl Display for AttributeValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Str(value) => f.write_str(value),
			Self::Bool(value) => Display::fmt(value, f),
		}
	}
}

#[derive(Clone)]
struct ElementData<D: Dom> {
	tag: String,
	key: Option<Key>,
	classes: IndexSet<String>,
	attributes: IndexMap<String, AttributeValue>,
	events: IndexMap<String, EventBinding>,
	children: Vec<VChild<D>>,
	class: Rc<NodeClass<D>>,
	listeners: Option<EventMap<D>>,
}

#[derive(Clone)]
struct TextData<D: Dom> {
	text: String,
	class: Rc<NodeClass<D>>,
	listeners: Option<EventMap<D>>,
}

/// Descriptor of an element to be rendered.
///
/// Cloning is cheap and shares the descriptor. Mutation through a shared handle copies it first,
/// so anything already handed to the renderer (for example a pending removal) keeps seeing the old state.
#[derive(Clone)]
pub struct VNode<D: Dom>(Rc<ElementData<D>>);

/// Descriptor of a text node.
#[derive(Clone)]
pub struct VText<D: Dom>(Rc<TextData<D>>);

/// Either kind of descriptor, as found in child lists.
#[derive(Clone)]
pub enum VChild<D: Dom> {
	Element(VNode<D>),
	Text(VText<D>),
}

impl<D: Dom> VNode<D> {
	#[must_use]
	pub fn new(tag: impl Into<String>) -> Self {
		Self(Rc::new(ElementData {
			tag: tag.into(),
			key: None,
			classes: IndexSet::new(),
			attributes: IndexMap::new(),
			events: IndexMap::new(),
			children: Vec::new(),
			class: NodeClass::element(),
			listeners: None,
		}))
	}

	fn data_mut(&mut self) -> &mut ElementData<D> {
		Rc::make_mut(&mut self.0)
	}

	#[must_use]
	pub fn tag(&self) -> &str {
		&self.0.tag
	}

	/// The tag as a DOM [***nodeName***](https://developer.mozilla.org/en-US/docs/Web/API/Node/nodeName) would report it.
	#[must_use]
	pub fn node_name(&self) -> String {
		self.0.tag.to_ascii_uppercase()
	}

	#[must_use]
	pub fn key(&self) -> Option<&Key> {
		self.0.key.as_ref()
	}

	#[must_use]
	pub fn classes(&self) -> &IndexSet<String> {
		&self.0.classes
	}

	#[must_use]
	pub fn attributes(&self) -> &IndexMap<String, AttributeValue> {
		&self.0.attributes
	}

	#[must_use]
	pub fn events(&self) -> &IndexMap<String, EventBinding> {
		&self.0.events
	}

	#[must_use]
	pub fn children(&self) -> &[VChild<D>] {
		&self.0.children
	}

	#[must_use]
	pub fn node_class(&self) -> &Rc<NodeClass<D>> {
		&self.0.class
	}

	/// The instance-level listener registry, if any listener was ever added.
	#[must_use]
	pub fn listeners(&self) -> Option<&EventMap<D>> {
		self.0.listeners.as_ref()
	}

	/// Whether both handles share the same descriptor.
	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	#[must_use]
	pub fn with_key(mut self, key: impl Into<Key>) -> Self {
		self.set_key(Some(key.into()));
		self
	}

	pub fn set_key(&mut self, key: Option<Key>) -> &mut Self {
		self.data_mut().key = key;
		self
	}

	/// Appends a child. Strings become [`VText`]s.
	pub fn add(&mut self, child: impl Into<VChild<D>>) -> &mut Self {
		self.data_mut().children.push(child.into());
		self
	}

	#[must_use]
	pub fn child(mut self, child: impl Into<VChild<D>>) -> Self {
		self.add(child);
		self
	}

	#[must_use]
	pub fn with_children<C: Into<VChild<D>>>(mut self, children: impl IntoIterator<Item = C>) -> Self {
		for child in children {
			self.add(child);
		}
		self
	}

	/// Appends a dynamically typed child, for producers that don't know their values' types statically.
	///
	/// Accepts [`VChild`], [`VNode`], [`VText`], [`String`] and `&'static str`.
	///
	/// # Errors
	///
	/// [`Error::UnexpectedChild`] for any other type. Nothing is appended in that case.
	pub fn add_any(&mut self, child: Box<dyn Any>) -> Result<&mut Self, Error> {
		let child = coerce_child(child)?;
		Ok(self.add(child))
	}

	/// Adds each whitespace-separated class name in `names`. Empty tokens and duplicates are ignored.
	pub fn add_class(&mut self, names: &str) -> &mut Self {
		let classes = &mut self.data_mut().classes;
		for name in names.split_whitespace() {
			classes.insert(name.to_owned());
		}
		self
	}

	#[must_use]
	pub fn with_class(mut self, names: &str) -> Self {
		self.add_class(names);
		self
	}

	/// Sets an attribute. `"class"` is routed to [`VNode::add_class`] and `"key"` to [`VNode::set_key`].
	pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> &mut Self {
		let name = name.into();
		let value = value.into();
		match name.as_str() {
			"class" => match value {
				AttributeValue::Str(names) => self.add_class(&names),
				AttributeValue::Bool(_) => self,
			},
			"key" => self.set_key(Some(Key(value.to_string()))),
			_ => {
				self.data_mut().attributes.insert(name, value);
				self
			}
		}
	}

	#[must_use]
	pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
		self.set_attribute(name, value);
		self
	}

	/// Binds a DOM event handler on the rendered element. A later binding for the same event replaces this one.
	#[must_use]
	pub fn on(mut self, event: impl Into<String>, handler: impl Fn(&DomEvent<'_>) + 'static, options: EventOptions) -> Self {
		self.bind(
			event,
			EventBinding {
				handler: Rc::new(handler),
				options,
			},
		);
		self
	}

	pub fn bind(&mut self, event: impl Into<String>, binding: EventBinding) -> &mut Self {
		self.data_mut().events.insert(event.into(), binding);
		self
	}

	/// Adds an instance-level lifecycle listener.
	#[must_use]
	pub fn listen(mut self, event: impl Into<Cow<'static, str>>, handler: Handler<D>) -> Self {
		self.add_listener(event, handler);
		self
	}

	pub fn add_listener(&mut self, event: impl Into<Cow<'static, str>>, handler: Handler<D>) -> &mut Self {
		self.data_mut().listeners.get_or_insert_with(EventMap::new).add(event, handler);
		self
	}

	pub fn unlisten(&mut self, event: &str, handler: &Handler<D>) -> bool {
		match &mut self.data_mut().listeners {
			Some(listeners) => listeners.remove(event, handler),
			None => false,
		}
	}

	/// Replaces the type-level registry, e.g. with a [`NodeClass::subclass`] of [`NodeClass::element`].
	#[must_use]
	pub fn with_node_class(mut self, class: Rc<NodeClass<D>>) -> Self {
		self.data_mut().class = class;
		self
	}

	#[must_use]
	pub fn to_html(&self) -> String {
		self.to_html_with(&HtmlOptions::default())
	}

	#[must_use]
	pub fn to_html_with(&self, options: &HtmlOptions<'_>) -> String {
		self.chunk().render(options)
	}

	fn chunk(&self) -> Chunk {
		let mut open_tag = format!("<{}", self.0.tag);
		if let Some(key) = &self.0.key {
			open_tag.push_str(&format!(" {}=\"{}\"", KEY_ATTRIBUTE, key));
		}
		if !self.0.classes.is_empty() {
			open_tag.push_str(&format!(" class=\"{}\"", self.0.classes.iter().map(String::as_str).collect::<Vec<_>>().join(" ")));
		}
		for (name, value) in &self.0.attributes {
			match value {
				AttributeValue::Str(value) => open_tag.push_str(&format!(" {}=\"{}\"", name, value)),
				AttributeValue::Bool(true) => open_tag.push_str(&format!(" {}", name)),
				AttributeValue::Bool(false) => (),
			}
		}
		open_tag.push('>');

		let mut chunks = Vec::with_capacity(self.0.children.len() + 2);
		chunks.push(Chunk::Line(open_tag));
		chunks.extend(self.0.children.iter().map(VChild::chunk));
		chunks.push(Chunk::Line(format!("</{}>", self.0.tag)));
		Chunk::Group(chunks)
	}
}

impl<D: Dom> VText<D> {
	#[must_use]
	pub fn new(text: impl Into<String>) -> Self {
		Self(Rc::new(TextData {
			text: text.into(),
			class: NodeClass::text(),
			listeners: None,
		}))
	}

	fn data_mut(&mut self) -> &mut TextData<D> {
		Rc::make_mut(&mut self.0)
	}

	#[must_use]
	pub fn text(&self) -> &str {
		&self.0.text
	}

	#[must_use]
	pub fn tag(&self) -> &'static str {
		TEXT_TAG
	}

	#[must_use]
	pub fn node_class(&self) -> &Rc<NodeClass<D>> {
		&self.0.class
	}

	#[must_use]
	pub fn listeners(&self) -> Option<&EventMap<D>> {
		self.0.listeners.as_ref()
	}

	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	#[must_use]
	pub fn listen(mut self, event: impl Into<Cow<'static, str>>, handler: Handler<D>) -> Self {
		self.add_listener(event, handler);
		self
	}

	pub fn add_listener(&mut self, event: impl Into<Cow<'static, str>>, handler: Handler<D>) -> &mut Self {
		self.data_mut().listeners.get_or_insert_with(EventMap::new).add(event, handler);
		self
	}

	pub fn unlisten(&mut self, event: &str, handler: &Handler<D>) -> bool {
		match &mut self.data_mut().listeners {
			Some(listeners) => listeners.remove(event, handler),
			None => false,
		}
	}

	#[must_use]
	pub fn with_node_class(mut self, class: Rc<NodeClass<D>>) -> Self {
		self.data_mut().class = class;
		self
	}

	#[must_use]
	pub fn to_html(&self) -> String {
		self.0.text.clone()
	}
}

impl<D: Dom> VChild<D> {
	#[must_use]
	pub fn tag(&self) -> &str {
		match self {
			Self::Element(element) => element.tag(),
			Self::Text(text) => text.tag(),
		}
	}

	/// Text nodes never have a key.
	#[must_use]
	pub fn key(&self) -> Option<&Key> {
		match self {
			Self::Element(element) => element.key(),
			Self::Text(_) => None,
		}
	}

	#[must_use]
	pub fn node_class(&self) -> &Rc<NodeClass<D>> {
		match self {
			Self::Element(element) => element.node_class(),
			Self::Text(text) => text.node_class(),
		}
	}

	#[must_use]
	pub fn listeners(&self) -> Option<&EventMap<D>> {
		match self {
			Self::Element(element) => element.listeners(),
			Self::Text(text) => text.listeners(),
		}
	}

	#[must_use]
	pub fn as_element(&self) -> Option<&VNode<D>> {
		match self {
			Self::Element(element) => Some(element),
			Self::Text(_) => None,
		}
	}

	#[must_use]
	pub fn as_text(&self) -> Option<&VText<D>> {
		match self {
			Self::Element(_) => None,
			Self::Text(text) => Some(text),
		}
	}

	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Element(a), Self::Element(b)) => a.ptr_eq(b),
			(Self::Text(a), Self::Text(b)) => a.ptr_eq(b),
			_ => false,
		}
	}

	#[must_use]
	pub fn to_html(&self) -> String {
		self.to_html_with(&HtmlOptions::default())
	}

	#[must_use]
	pub fn to_html_with(&self, options: &HtmlOptions<'_>) -> String {
		self.chunk().render(options)
	}

	fn chunk(&self) -> Chunk {
		match self {
			Self::Element(element) => element.chunk(),
			Self::Text(text) => Chunk::Group(vec![Chunk::Line(text.0.text.clone())]),
		}
	}
}

impl<D: Dom> From<VNode<D>> for VChild<D> {
	fn from(element: VNode<D>) -> Self {
		Self::Element(element)
	}
}

impl<D: Dom> From<VText<D>> for VChild<D> {
	fn from(text: VText<D>) -> Self {
		Self::Text(text)
	}
}

impl<D: Dom> From<&str> for VChild<D> {
	fn from(text: &str) -> Self {
		Self::Text(VText::new(text))
	}
}

impl<D: Dom> From<String> for VChild<D> {
	fn from(text: String) -> Self {
		Self::Text(VText::new(text))
	}
}

fn coerce_child<D: Dom>(value: Box<dyn Any>) -> Result<VChild<D>, Error> {
	let value = match value.downcast::<VChild<D>>() {
		Ok(child) => return Ok(*child),
		Err(value) => value,
	};
	let value = match value.downcast::<VNode<D>>() {
		Ok(element) => return Ok(VChild::Element(*element)),
		Err(value) => value,
	};
	let value = match value.downcast::<VText<D>>() {
		Ok(text) => return Ok(VChild::Text(*text)),
		Err(value) => value,
	};
	let value = match value.downcast::<String>() {
		Ok(text) => return Ok(VChild::from(*text)),
		Err(value) => value,
	};
	match value.downcast::<&'static str>() {
		Ok(text) => Ok(VChild::from(*text)),
		Err(_) => Err(Error::UnexpectedChild),
	}
}

impl<D: Dom> Debug for VNode<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("VNode")
			.field("tag", &self.0.tag)
			.field("key", &self.0.key)
			.field("classes", &self.0.classes)
			.field("attributes", &self.0.attributes)
			.field("events", &self.0.events.keys().collect::<Vec<_>>())
			.field("class", &self.0.class.name())
			.field("children", &self.0.children)
			.finish()
	}
}

impl<D: Dom> Debug for VText<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("VText").field(&crate::loggable(&self.0.text)).finish()
	}
}

impl<D: Dom> Debug for VChild<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Element(element) => Debug::fmt(element, f),
			Self::Text(text) => Debug::fmt(text, f),
		}
	}
}

/// How [`VNode::to_html_with`] lays out its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HtmlOptions<'a> {
	/// Puts every tag and text on its own line.
	pub pretty: bool,
	/// One level of indentation when pretty-printing.
	pub indent_with: &'a str,
	/// Indentation levels added in front of every line but the first.
	pub start_indent: usize,
}

impl Default for HtmlOptions<'_> {
	fn default() -> Self {
		Self {
			pretty: false,
			indent_with: "  ",
			start_indent: 0,
		}
	}
}

impl<'a> HtmlOptions<'a> {
	#[must_use]
	pub fn pretty() -> Self {
		Self {
			pretty: true,
			..Self::default()
		}
	}

	#[must_use]
	pub fn with_indent(self, indent_with: &'a str) -> Self {
		Self { indent_with, ..self }
	}

	#[must_use]
	pub fn with_start_indent(self, start_indent: usize) -> Self {
		Self { start_indent, ..self }
	}
}

/// Nested serialization buffer. Each group is one level deeper than its parent.
enum Chunk {
	Line(String),
	Group(Vec<Chunk>),
}

impl Chunk {
	fn render(&self, options: &HtmlOptions<'_>) -> String {
		let mut html = String::new();
		if options.pretty {
			self.pretty_print(&mut html, 0, options);
			html.trim_start().to_owned()
		} else {
			self.concat(&mut html);
			html
		}
	}

	fn concat(&self, html: &mut String) {
		match self {
			Self::Line(line) => html.push_str(line),
			Self::Group(chunks) => chunks.iter().for_each(|chunk| chunk.concat(html)),
		}
	}

	fn pretty_print(&self, html: &mut String, level: usize, options: &HtmlOptions<'_>) {
		match self {
			Self::Group(chunks) => {
				for chunk in chunks {
					chunk.pretty_print(html, level + 1, options)
				}
			}
			Self::Line(line) => {
				if level > 0 {
					for _ in 0..options.start_indent + level - 1 {
						html.push_str(options.indent_with)
					}
				}
				html.push_str(line);
				html.push('\n');
			}
		}
	}
}
