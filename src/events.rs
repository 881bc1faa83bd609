//! Lifecycle events.
//!
//! Listeners live in two tiers: the type-level registry of a node's [`NodeClass`],
//! which subclasses start out duplicating, and an optional per-instance [`EventMap`].
//! [`VChild::trigger`] runs them in this order:
//!
//! 1. class listeners on [`GLOBAL`],
//! 2. class listeners on the event itself,
//! 3. instance listeners on [`GLOBAL`],
//! 4. instance listeners on the event itself.
//!
//! Triggering from within a listener is not guarded against and its behaviour is unspecified.

use crate::{remove::Done, sync, Dom, Error, VChild};
use core::{
	any::{Any, TypeId},
	fmt::{self, Debug},
};
use hashbrown::HashMap;
use std::{borrow::Cow, cell::RefCell, rc::Rc};
use tracing::{trace, trace_span};

/// Reserved channel whose listeners receive every event.
pub const GLOBAL: &str = "all";

/// A node was just created, its children already attached.
pub const CREATE: &str = "create";
/// A node (and its whole subtree) was attached to a live parent.
pub const INSERT: &str = "insert";
/// A node is about to be removed. Listeners must eventually call [`Event::done`].
pub const REMOVE: &str = "remove";
/// A node was detached after all [`REMOVE`] listeners finished.
pub const DESTROY: &str = "destroy";
pub const PREPATCH: &str = "prepatch";
/// A node is being updated in place. Attribute, class and event binding sync happens here.
pub const PATCH: &str = "patch";
pub const POSTPATCH: &str = "postpatch";

/// Arguments of a single lifecycle event.
pub struct Event<'a, D: Dom> {
	/// The concrete event, also for listeners on [`GLOBAL`].
	pub name: &'a str,
	pub dom: &'a D,
	/// The real node the event is about.
	pub node: &'a D::Node,
	/// Completion callback, only present for [`REMOVE`].
	pub done: Option<&'a Done<D>>,
}

impl<'a, D: Dom> Debug for Event<'a, D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Event").field("name", &self.name).field("node", self.node).field("done", &self.done).finish()
	}
}

/// A method that can be referenced by name through [`Handler::Method`].
pub type Method<D> = fn(&VChild<D>, &Event<'_, D>) -> Result<(), Error>;

type Closure<D> = Rc<dyn Fn(&VChild<D>, &Event<'_, D>) -> Result<(), Error>>;

/// A lifecycle listener.
pub enum Handler<D: Dom> {
	/// Called with the emitting node.
	Closure(Closure<D>),
	/// Looked up by name in the emitting node's [`NodeClass`] when the event fires.
	Method(Cow<'static, str>),
}

impl<D: Dom> Handler<D> {
	pub fn closure(closure: impl Fn(&VChild<D>, &Event<'_, D>) -> Result<(), Error> + 'static) -> Self {
		Self::Closure(Rc::new(closure))
	}

	pub fn method(name: impl Into<Cow<'static, str>>) -> Self {
		Self::Method(name.into())
	}
}

impl<D: Dom> Clone for Handler<D> {
	fn clone(&self) -> Self {
		match self {
			Self::Closure(closure) => Self::Closure(Rc::clone(closure)),
			Self::Method(name) => Self::Method(name.clone()),
		}
	}
}

/// Closures compare by identity, methods by name.
impl<D: Dom> PartialEq for Handler<D> {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Closure(a), Self::Closure(b)) => Rc::as_ptr(a).cast::<()>() == Rc::as_ptr(b).cast::<()>(),
			(Self::Method(a), Self::Method(b)) => a == b,
			_ => false,
		}
	}
}

impl<D: Dom> Debug for Handler<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Closure(closure) => f.debug_tuple("Closure").field(&Rc::as_ptr(closure).cast::<()>()).finish(),
			Self::Method(name) => f.debug_tuple("Method").field(name).finish(),
		}
	}
}

/// Event name to ordered listeners.
pub struct EventMap<D: Dom>(HashMap<Cow<'static, str>, Vec<Handler<D>>>);

impl<D: Dom> EventMap<D> {
	#[must_use]
	pub fn new() -> Self {
		Self(HashMap::new())
	}

	#[must_use]
	pub fn handlers(&self, event: &str) -> &[Handler<D>] {
		self.0.get(event).map_or(&[], Vec::as_slice)
	}

	pub fn add(&mut self, event: impl Into<Cow<'static, str>>, handler: Handler<D>) {
		self.0.entry(event.into()).or_insert_with(Vec::new).push(handler);
	}

	/// Removes the first listener equal to `handler`. Returns whether one was found.
	pub fn remove(&mut self, event: &str, handler: &Handler<D>) -> bool {
		match self.0.get_mut(event) {
			Some(handlers) => match handlers.iter().position(|h| h == handler) {
				Some(index) => {
					handlers.remove(index);
					true
				}
				None => false,
			},
			None => false,
		}
	}

	#[must_use]
	pub fn count(&self, event: &str) -> usize {
		self.handlers(event).len()
	}
}

impl<D: Dom> Default for EventMap<D> {
	fn default() -> Self {
		Self::new()
	}
}

/// Duplicates the listener lists, sharing the handlers themselves.
impl<D: Dom> Clone for EventMap<D> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}

impl<D: Dom> Debug for EventMap<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.0.iter()).finish()
	}
}

/// A node type descriptor: type-level listeners plus the methods [`Handler::Method`] can name.
///
/// [`NodeClass::subclass`] copies both registries, so later changes to either class don't leak into the other.
pub struct NodeClass<D: Dom> {
	name: Cow<'static, str>,
	listeners: RefCell<EventMap<D>>,
	methods: RefCell<HashMap<Cow<'static, str>, Method<D>>>,
}

impl<D: Dom> NodeClass<D> {
	/// A class without any listeners or methods.
	#[must_use]
	pub fn new(name: impl Into<Cow<'static, str>>) -> Rc<Self> {
		Rc::new(Self {
			name: name.into(),
			listeners: RefCell::default(),
			methods: RefCell::default(),
		})
	}

	#[must_use]
	pub fn subclass(parent: &Self, name: impl Into<Cow<'static, str>>) -> Rc<Self> {
		let name = name.into();
		trace!("Subclassing node class {:?} as {:?}.", parent.name, name);
		Rc::new(Self {
			name,
			listeners: RefCell::new(parent.listeners.borrow().clone()),
			methods: RefCell::new(parent.methods.borrow().clone()),
		})
	}

	/// The class [`VNode`](`crate::VNode`)s of this backend use unless told otherwise.
	///
	/// It syncs classes, attributes and event bindings on [`CREATE`] and [`PATCH`].
	/// It is shared by all element descriptors for `D` on the current thread, so listeners added here apply to all of them.
	#[must_use]
	pub fn element() -> Rc<Self> {
		Rc::clone(&defaults::<D>().element)
	}

	/// Like [`NodeClass::element`], but for [`VText`](`crate::VText`). A subclass of it.
	#[must_use]
	pub fn text() -> Rc<Self> {
		Rc::clone(&defaults::<D>().text)
	}

	#[must_use]
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn listen(&self, event: impl Into<Cow<'static, str>>, handler: Handler<D>) -> &Self {
		self.listeners.borrow_mut().add(event, handler);
		self
	}

	pub fn unlisten(&self, event: &str, handler: &Handler<D>) -> bool {
		self.listeners.borrow_mut().remove(event, handler)
	}

	pub fn define_method(&self, name: impl Into<Cow<'static, str>>, method: Method<D>) -> &Self {
		self.methods.borrow_mut().insert(name.into(), method);
		self
	}

	#[must_use]
	pub fn method(&self, name: &str) -> Option<Method<D>> {
		self.methods.borrow().get(name).copied()
	}

	#[must_use]
	pub fn listener_count(&self, event: &str) -> usize {
		self.listeners.borrow().count(event)
	}

	/// Copies of the [`GLOBAL`] and `event` listener lists, so listeners may (un)register while they run.
	fn snapshot(&self, event: &str) -> (Vec<Handler<D>>, Vec<Handler<D>>) {
		let listeners = self.listeners.borrow();
		let specific = if event == GLOBAL { Vec::new() } else { listeners.handlers(event).to_vec() };
		(listeners.handlers(GLOBAL).to_vec(), specific)
	}
}

impl<D: Dom> Debug for NodeClass<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NodeClass")
			.field("name", &self.name)
			.field("listeners", &*self.listeners.borrow())
			.field("methods", &self.methods.borrow().keys().collect::<Vec<_>>())
			.finish()
	}
}

struct Defaults<D: Dom> {
	element: Rc<NodeClass<D>>,
	text: Rc<NodeClass<D>>,
}

impl<D: Dom> Defaults<D> {
	fn new() -> Self {
		let element = NodeClass::new("element");
		element
			.define_method(sync::PATCH_CLASSES, sync::patch_classes)
			.define_method(sync::PATCH_ATTRIBUTES, sync::patch_attributes)
			.define_method(sync::PATCH_EVENTS, sync::patch_events);
		for event in [CREATE, PATCH] {
			for method in [sync::PATCH_CLASSES, sync::PATCH_ATTRIBUTES, sync::PATCH_EVENTS] {
				element.listen(event, Handler::method(method));
			}
		}
		let text = NodeClass::subclass(&element, "text");
		Self { element, text }
	}
}

thread_local! {
	static DEFAULT_CLASSES: RefCell<HashMap<TypeId, Rc<dyn Any>>> = RefCell::new(HashMap::new());
}

fn defaults<D: Dom>() -> Rc<Defaults<D>> {
	DEFAULT_CLASSES.with(|classes| {
		let defaults = Rc::clone(
			classes
				.borrow_mut()
				.entry(TypeId::of::<D>())
				.or_insert_with(|| Rc::new(Defaults::<D>::new()) as Rc<dyn Any>),
		);
		defaults
			.downcast::<Defaults<D>>()
			.unwrap_or_else(|_| unreachable!("Default node classes are keyed by their backend's `TypeId`."))
	})
}

impl<D: Dom> VChild<D> {
	/// Fires `event` about the real `node` on this descriptor's listeners.
	///
	/// # Errors
	///
	/// Whatever the first failing listener returns, or [`Error::UnknownMethod`] for a dangling [`Handler::Method`].
	/// Later listeners don't run in that case.
	pub fn trigger(&self, dom: &D, event: &str, node: &D::Node) -> Result<(), Error> {
		self.emit(&Event { name: event, dom, node, done: None })
	}

	/// Number of listeners (type-level and instance-level) for `event`, not counting [`GLOBAL`] ones.
	#[must_use]
	pub fn count_listeners(&self, event: &str) -> usize {
		self.node_class().listener_count(event) + self.listeners().map_or(0, |listeners| listeners.count(event))
	}

	pub(crate) fn emit(&self, event: &Event<'_, D>) -> Result<(), Error> {
		let class = self.node_class();
		let span = trace_span!("Triggering", event = event.name, class = class.name(), tag = self.tag());
		let _enter = span.enter();

		let (global, specific) = class.snapshot(event.name);
		for handler in global.iter().chain(&specific) {
			self.call(class, handler, event)?;
		}

		if let Some(listeners) = self.listeners() {
			let specific: &[Handler<D>] = if event.name == GLOBAL { &[] } else { listeners.handlers(event.name) };
			for handler in listeners.handlers(GLOBAL).iter().chain(specific) {
				self.call(class, handler, event)?;
			}
		}
		Ok(())
	}

	fn call(&self, class: &NodeClass<D>, handler: &Handler<D>, event: &Event<'_, D>) -> Result<(), Error> {
		match handler {
			Handler::Closure(closure) => closure(self, event),
			Handler::Method(name) => match class.method(name) {
				Some(method) => method(self, event),
				None => Err(Error::UnknownMethod {
					method: name.to_string(),
					class: class.name().to_owned(),
				}),
			},
		}
	}
}
