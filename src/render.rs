//! Turning descriptors into real nodes.
//!
//! Creating a subtree and attaching it are separate steps: [`VChild::render`] builds the detached
//! subtree (firing [`CREATE`] post-order) and returns an [`InsertQueue`] in the same order,
//! which is flushed with [`INSERT`] once the subtree is connected.

use crate::{
	dom::KEY_ATTRIBUTE,
	events::{CREATE, INSERT},
	Dom, Error, VChild, VNode, VText,
};
use core::{
	fmt::{self, Debug},
	slice,
};
use tracing::{instrument, trace, trace_span};

/// Descriptors and the real nodes created for them, in creation order, awaiting [`INSERT`].
pub struct InsertQueue<D: Dom>(Vec<(VChild<D>, D::Node)>);

impl<D: Dom> InsertQueue<D> {
	#[must_use]
	pub fn new() -> Self {
		Self(Vec::new())
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> slice::Iter<'_, (VChild<D>, D::Node)> {
		self.0.iter()
	}

	pub fn push(&mut self, vnode: VChild<D>, node: D::Node) {
		self.0.push((vnode, node))
	}

	/// Moves all entries of `other` to the end of this queue.
	pub fn append(&mut self, other: &mut Self) {
		self.0.append(&mut other.0)
	}

	/// Fires [`INSERT`] for each entry, in order.
	///
	/// # Errors
	///
	/// Iff a listener fails. Remaining entries are dropped without notification in that case.
	#[instrument(skip(self, dom), fields(len = self.0.len()))]
	pub fn flush(self, dom: &D) -> Result<(), Error> {
		for (vnode, node) in self.0 {
			vnode.trigger(dom, INSERT, &node)?;
		}
		Ok(())
	}
}

impl<D: Dom> Default for InsertQueue<D> {
	fn default() -> Self {
		Self::new()
	}
}

impl<D: Dom> Debug for InsertQueue<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.0.iter().map(|(vnode, node)| (vnode.tag(), node))).finish()
	}
}

impl<'a, D: Dom> IntoIterator for &'a InsertQueue<D> {
	type Item = &'a (VChild<D>, D::Node);
	type IntoIter = slice::Iter<'a, (VChild<D>, D::Node)>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

impl<D: Dom> VChild<D> {
	/// Creates a detached real subtree for this descriptor.
	///
	/// # Errors
	///
	/// Iff the [`Dom`] or a [`CREATE`] listener fails.
	pub fn render(&self, dom: &D) -> Result<(D::Node, InsertQueue<D>), Error> {
		let mut queue = InsertQueue::new();
		let node = self.render_into(dom, &mut queue)?;
		Ok((node, queue))
	}

	/// Like [`VChild::render`], but collects into an existing `queue`.
	///
	/// # Errors
	///
	/// Iff the [`Dom`] or a [`CREATE`] listener fails.
	pub fn render_into(&self, dom: &D, queue: &mut InsertQueue<D>) -> Result<D::Node, Error> {
		match self {
			Self::Element(element) => {
				let span = trace_span!("Creating element", tag = element.tag(), key = ?element.key());
				let _enter = span.enter();

				let node = dom.create_element(element.tag())?;
				for child in element.children() {
					let child_node = child.render_into(dom, queue)?;
					dom.append_child(&node, &child_node)?;
				}
				if let Some(key) = element.key() {
					dom.set_attribute(&node, KEY_ATTRIBUTE, key.as_str())?;
				}
				queue.push(self.clone(), node.clone());
				self.trigger(dom, CREATE, &node)?;
				Ok(node)
			}
			Self::Text(text) => {
				let span = trace_span!("Creating text", text = crate::loggable(text.text()));
				let _enter = span.enter();

				let node = dom.create_text_node(text.text());
				queue.push(self.clone(), node.clone());
				self.trigger(dom, CREATE, &node)?;
				Ok(node)
			}
		}
	}

	/// Renders this descriptor and inserts the result right before `sibling`, then fires [`INSERT`].
	///
	/// # Errors
	///
	/// [`Error::NodeNotFound`] if `sibling` has no parent, otherwise iff the [`Dom`] or a listener fails.
	#[instrument(skip(self, dom))]
	pub fn insert_before(&self, dom: &D, sibling: &D::Node) -> Result<D::Node, Error> {
		let parent = dom.parent_node(sibling).ok_or(Error::NodeNotFound)?;
		let (node, queue) = self.render(dom)?;
		dom.insert_before(&parent, &node, Some(sibling))?;
		trace!("Attached. Flushing insert queue.");
		queue.flush(dom)?;
		Ok(node)
	}

	/// Renders this descriptor and appends the result to `parent`, then fires [`INSERT`].
	///
	/// # Errors
	///
	/// Iff the [`Dom`] or a listener fails.
	#[instrument(skip(self, dom))]
	pub fn append_to(&self, dom: &D, parent: &D::Node) -> Result<D::Node, Error> {
		let (node, queue) = self.render(dom)?;
		dom.append_child(parent, &node)?;
		trace!("Attached. Flushing insert queue.");
		queue.flush(dom)?;
		Ok(node)
	}
}

macro_rules! delegate_rendering {
	($($ty:ident => $variant:ident),*) => {$(
		impl<D: Dom> $ty<D> {
			/// See [`VChild::render`].
			///
			/// # Errors
			///
			/// See [`VChild::render`].
			pub fn render(&self, dom: &D) -> Result<(D::Node, InsertQueue<D>), Error> {
				VChild::$variant(self.clone()).render(dom)
			}

			/// See [`VChild::insert_before`].
			///
			/// # Errors
			///
			/// See [`VChild::insert_before`].
			pub fn insert_before(&self, dom: &D, sibling: &D::Node) -> Result<D::Node, Error> {
				VChild::$variant(self.clone()).insert_before(dom, sibling)
			}

			/// See [`VChild::append_to`].
			///
			/// # Errors
			///
			/// See [`VChild::append_to`].
			pub fn append_to(&self, dom: &D, parent: &D::Node) -> Result<D::Node, Error> {
				VChild::$variant(self.clone()).append_to(dom, parent)
			}
		}
	)*};
}
delegate_rendering!(VNode => Element, VText => Text);
