//! Deferred removal.
//!
//! [`VChild::remove`] fires [`REMOVE`] with a [`Done`] handle and only detaches the node once
//! every [`REMOVE`] listener as well as the coordinator itself called [`Done::call`].
//! [`DESTROY`] fires right after that, exactly once, whether or not the node still had a parent.
//!
//! There is no way to cancel a removal. A listener that never calls back keeps its node
//! (and everything the [`Done`] handle references) alive and attached indefinitely.
//! Making sure that doesn't happen is up to whoever registers [`REMOVE`] listeners.

use crate::{
	events::{Event, DESTROY, REMOVE},
	Dom, Error, VChild, VNode, VText,
};
use core::{
	cell::Cell,
	fmt::{self, Debug},
};
use std::rc::Rc;
use tracing::{error, instrument, trace, warn};

struct Removal<D: Dom> {
	pending: Cell<usize>,
	dom: D,
	node: D::Node,
	emitter: VChild<D>,
}

/// Completion callback of a pending removal. Clones share the same countdown.
pub struct Done<D: Dom>(Rc<Removal<D>>);

impl<D: Dom> Clone for Done<D> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

impl<D: Dom> Debug for Done<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Done")
			.field("pending", &self.0.pending.get())
			.field("node", &self.0.node)
			.finish()
	}
}

impl<D: Dom> Done<D> {
	/// Acknowledges one completion. The last one detaches the node and fires [`DESTROY`].
	///
	/// Calls after that are logged and otherwise ignored.
	///
	/// # Errors
	///
	/// Iff detaching the node or a [`DESTROY`] listener fails.
	pub fn call(&self) -> Result<(), Error> {
		let removal = &*self.0;
		let pending = match removal.pending.get() {
			0 => {
				warn!(node = ?removal.node, "Removal completion acknowledged after the node was already removed. Ignoring.");
				return Ok(());
			}
			pending => pending - 1,
		};
		removal.pending.set(pending);
		trace!(pending, "Removal completion acknowledged.");
		if pending > 0 {
			return Ok(());
		}

		match removal.dom.parent_node(&removal.node) {
			Some(parent) => {
				trace!(node = ?removal.node, "Detaching.");
				removal.dom.remove_child(&parent, &removal.node)?;
			}
			None => warn!(node = ?removal.node, "Removed node has no parent. Only firing DESTROY."),
		}
		removal.emitter.trigger(&removal.dom, DESTROY, &removal.node)
	}

	/// Outstanding acknowledgements.
	#[must_use]
	pub fn pending(&self) -> usize {
		self.0.pending.get()
	}

	#[must_use]
	pub fn is_done(&self) -> bool {
		self.pending() == 0
	}

	/// The node being removed.
	#[must_use]
	pub fn node(&self) -> &D::Node {
		&self.0.node
	}
}

impl<D: Dom> VChild<D> {
	/// Removes `node` from its parent once all [`REMOVE`] listeners of this descriptor acknowledged.
	///
	/// `self` is the descriptor whose listeners are asked, which need not be the one `node` was rendered from.
	/// Without listeners, the node is detached before this returns.
	///
	/// # Errors
	///
	/// Iff a [`REMOVE`] listener fails or the synchronous part of the removal does.
	/// Acknowledgements already collected are kept in that case.
	#[instrument(skip(self, dom))]
	pub fn remove(&self, dom: &D, node: &D::Node) -> Result<Done<D>, Error> {
		let listeners = self.count_listeners(REMOVE);
		let done = Done(Rc::new(Removal {
			pending: Cell::new(listeners + 1),
			dom: dom.clone(),
			node: node.clone(),
			emitter: self.clone(),
		}));

		if let Err(e) = self.emit(&Event {
			name: REMOVE,
			dom,
			node,
			done: Some(&done),
		}) {
			error!("REMOVE listener failed: {}", e);
			return Err(e);
		}
		done.call()?;
		Ok(done)
	}
}

impl<D: Dom> VNode<D> {
	/// See [`VChild::remove`].
	///
	/// # Errors
	///
	/// See [`VChild::remove`].
	pub fn remove(&self, dom: &D, node: &D::Node) -> Result<Done<D>, Error> {
		VChild::Element(self.clone()).remove(dom, node)
	}
}

impl<D: Dom> VText<D> {
	/// See [`VChild::remove`].
	///
	/// # Errors
	///
	/// See [`VChild::remove`].
	pub fn remove(&self, dom: &D, node: &D::Node) -> Result<Done<D>, Error> {
		VChild::Text(self.clone()).remove(dom, node)
	}
}
