//! Reconciliation of an existing real subtree with a new descriptor.
//!
//! A real node is *patchable* by a descriptor if both are text, or both are elements with the same
//! tag (case-insensitively) and the same key (as recorded in [`KEY_ATTRIBUTE`], absent on both counts).
//! Patchable nodes are updated in place, all others are replaced.
//!
//! Child lists are diffed with four pointers, two into the current real children and two into
//! the new descriptors. Per step, the first of the following that applies wins:
//!
//! 1. skip a consumed slot on the old left,
//! 2. skip a consumed slot on the old right,
//! 3. new left patches old left,
//! 4. new right patches old right,
//! 5. new right patches old left, which moves to behind old right,
//! 6. new left patches old right, which moves to before old left,
//! 7. new left's key is found among the remaining old nodes, which is patched and moved before old left,
//!    otherwise new left is created and inserted before old left.
//!
//! The key lookup table for 7 is built at most once per child list.
//!
//! Emptying a child list doesn't clear the parent outright: every old child goes through
//! [`VChild::remove`] with the parent descriptor as emitter, so [`REMOVE`](`crate::events::REMOVE`)
//! listeners may keep children attached until they acknowledge.

use crate::{
	dom::{NodeType, KEY_ATTRIBUTE},
	events::{PATCH, POSTPATCH, PREPATCH},
	render::InsertQueue,
	Dom, Error, VChild, VNode, VText,
};
use hashbrown::HashMap;
use tracing::{instrument, trace, trace_span, warn};

/// Whether `vnode` can update `node` in place.
pub fn patchable<D: Dom>(dom: &D, node: &D::Node, vnode: &VChild<D>) -> bool {
	match vnode {
		VChild::Text(_) => dom.node_type(node) == NodeType::Text,
		VChild::Element(element) => {
			dom.node_type(node) == NodeType::Element
				&& dom.node_name(node).eq_ignore_ascii_case(element.tag())
				&& dom.get_attribute(node, KEY_ATTRIBUTE).as_deref() == element.key().map(|key| key.as_str())
		}
	}
}

impl<D: Dom> VChild<D> {
	/// Updates `old` to match this descriptor, or replaces it with a freshly rendered node.
	///
	/// Returns the node that now represents this descriptor.
	/// [`INSERT`](`crate::events::INSERT`) fires for all nodes created along the way once everything else is done.
	///
	/// # Errors
	///
	/// Iff the [`Dom`] or a lifecycle listener fails. The DOM is left as it is at that point.
	#[instrument(skip(self, dom))]
	pub fn patch(&self, dom: &D, old: &D::Node) -> Result<D::Node, Error> {
		let mut queue = InsertQueue::new();
		let node = self.patch_into(dom, old, &mut queue)?;
		trace!("Flushing {} queued insert(s).", queue.len());
		queue.flush(dom)?;
		Ok(node)
	}

	/// Like [`VChild::patch`], but collects created nodes into `queue` instead of notifying them.
	///
	/// # Errors
	///
	/// Iff the [`Dom`] or a lifecycle listener fails.
	pub fn patch_into(&self, dom: &D, old: &D::Node, queue: &mut InsertQueue<D>) -> Result<D::Node, Error> {
		if patchable(dom, old, self) {
			self.patch_in_place(dom, old, queue)?;
			Ok(old.clone())
		} else {
			self.replace(dom, old, queue)
		}
	}

	fn patch_in_place(&self, dom: &D, node: &D::Node, queue: &mut InsertQueue<D>) -> Result<(), Error> {
		match self {
			Self::Element(element) => {
				let span = trace_span!("Patching element", tag = element.tag(), key = ?element.key());
				let _enter = span.enter();

				self.trigger(dom, PREPATCH, node)?;
				self.trigger(dom, PATCH, node)?;
				element.patch_children(dom, node, queue)?;
				self.trigger(dom, POSTPATCH, node)
			}
			Self::Text(text) => {
				if dom.text_content(node) != text.text() {
					trace!(text = crate::loggable(text.text()), "Updating text.");
					dom.set_text_content(node, text.text())?;
				}
				Ok(())
			}
		}
	}

	/// Renders this descriptor in place of `old`, which is handed to [`VChild::remove`] with this descriptor's listeners.
	fn replace(&self, dom: &D, old: &D::Node, queue: &mut InsertQueue<D>) -> Result<D::Node, Error> {
		let span = trace_span!("Replacing", tag = self.tag(), old = ?old);
		let _enter = span.enter();

		let node = self.render_into(dom, queue)?;
		match dom.parent_node(old) {
			Some(parent) => {
				let next_sibling = dom.next_sibling(old);
				dom.insert_before(&parent, &node, next_sibling.as_ref())?;
			}
			None => warn!("Replacing a node without parent. The replacement remains detached."),
		}
		self.remove(dom, old)?;
		Ok(node)
	}
}

/// The real children being diffed. Consumed slots are [`None`].
struct OldChildren<N> {
	slots: Vec<Option<N>>,
	start: usize,
	end: usize,
}

impl<N: Clone> OldChildren<N> {
	fn new(nodes: Vec<N>) -> Self {
		let end = nodes.len();
		Self {
			slots: nodes.into_iter().map(Some).collect(),
			start: 0,
			end,
		}
	}

	fn is_empty(&self) -> bool {
		self.start >= self.end
	}

	fn left(&self) -> Option<&N> {
		self.slots[self.start].as_ref()
	}

	fn right(&self) -> Option<&N> {
		self.slots[self.end - 1].as_ref()
	}
}

impl<D: Dom> VNode<D> {
	/// See [`VChild::patch`].
	///
	/// # Errors
	///
	/// See [`VChild::patch`].
	pub fn patch(&self, dom: &D, old: &D::Node) -> Result<D::Node, Error> {
		VChild::Element(self.clone()).patch(dom, old)
	}

	/// Reconciles the real children of `parent` with this descriptor's children.
	///
	/// # Errors
	///
	/// Iff the [`Dom`] or a lifecycle listener fails.
	#[allow(clippy::too_many_lines)]
	#[instrument(skip(self, dom, queue))]
	pub fn patch_children(&self, dom: &D, parent: &D::Node, queue: &mut InsertQueue<D>) -> Result<(), Error> {
		let new = self.children();
		let old = dom.child_nodes(parent);

		match (old.is_empty(), new.is_empty()) {
			(true, true) => return Ok(()),
			(true, false) => {
				trace!("No old children. Appending {} new one(s).", new.len());
				for child in new {
					let node = child.render_into(dom, queue)?;
					dom.append_child(parent, &node)?;
				}
				return Ok(());
			}
			(false, true) => {
				trace!("No new children. Removing {} old one(s).", old.len());
				let emitter = VChild::Element(self.clone());
				for node in &old {
					emitter.remove(dom, node)?;
				}
				return Ok(());
			}
			(false, false) => (),
		}

		let mut old = OldChildren::new(old);
		let mut placed: Vec<Option<D::Node>> = vec![None; new.len()];
		let (mut new_start, mut new_end) = (0, new.len());
		let mut key_map: Option<HashMap<String, usize>> = None;

		while !old.is_empty() && new_start < new_end {
			let (old_left, old_right) = match (old.left(), old.right()) {
				(None, _) => {
					old.start += 1;
					continue;
				}
				(_, None) => {
					old.end -= 1;
					continue;
				}
				(Some(left), Some(right)) => (left.clone(), right.clone()),
			};
			let (new_left, new_right) = (&new[new_start], &new[new_end - 1]);

			if patchable(dom, &old_left, new_left) {
				trace!(old = old.start, new = new_start, "Left matches left.");
				new_left.patch_in_place(dom, &old_left, queue)?;
				placed[new_start] = Some(old_left);
				old.start += 1;
				new_start += 1;
			} else if patchable(dom, &old_right, new_right) {
				trace!(old = old.end - 1, new = new_end - 1, "Right matches right.");
				new_right.patch_in_place(dom, &old_right, queue)?;
				placed[new_end - 1] = Some(old_right);
				old.end -= 1;
				new_end -= 1;
			} else if patchable(dom, &old_left, new_right) {
				trace!(old = old.start, new = new_end - 1, "Old left moved to the right.");
				new_right.patch_in_place(dom, &old_left, queue)?;
				let reference = dom.next_sibling(&old_right);
				dom.insert_before(parent, &old_left, reference.as_ref())?;
				placed[new_end - 1] = Some(old_left);
				old.start += 1;
				new_end -= 1;
			} else if patchable(dom, &old_right, new_left) {
				trace!(old = old.end - 1, new = new_start, "Old right moved to the left.");
				new_left.patch_in_place(dom, &old_right, queue)?;
				dom.insert_before(parent, &old_right, Some(&old_left))?;
				placed[new_start] = Some(old_right);
				old.end -= 1;
				new_start += 1;
			} else {
				let key_map = key_map.get_or_insert_with(|| {
					let map = map_keys(dom, &old);
					trace!("Mapped {} old key(s).", map.len());
					map
				});

				let found = new_left
					.key()
					.and_then(|key| key_map.get(key.as_str()).copied())
					.filter(|index| (old.start..old.end).contains(index))
					.and_then(|index| old.slots[index].take().map(|moved| (index, moved)));

				match found {
					Some((index, moved)) => {
						trace!(old = index, new = new_start, key = ?new_left.key(), "Found key among old children.");
						let node = new_left.patch_into(dom, &moved, queue)?;
						if index != old.start {
							dom.insert_before(parent, &node, Some(&old_left))?;
						}
						placed[new_start] = Some(node);
					}
					None => {
						trace!(new = new_start, "No match. Creating.");
						let node = new_left.render_into(dom, queue)?;
						dom.insert_before(parent, &node, Some(&old_left))?;
						placed[new_start] = Some(node);
					}
				}
				new_start += 1;
			}
		}

		if old.is_empty() {
			let reference = placed.get(new_end).cloned().flatten();
			for child in &new[new_start..new_end] {
				let node = child.render_into(dom, queue)?;
				dom.insert_before(parent, &node, reference.as_ref())?;
			}
		} else if new_start >= new_end {
			let emitter = VChild::Element(self.clone());
			for slot in &mut old.slots[old.start..old.end] {
				if let Some(node) = slot.take() {
					emitter.remove(dom, &node)?;
				}
			}
		}
		Ok(())
	}
}

/// Keys of the keyed elements among the unconsumed old children, to their slot.
fn map_keys<D: Dom>(dom: &D, old: &OldChildren<D::Node>) -> HashMap<String, usize> {
	let mut map = HashMap::new();
	for index in old.start..old.end {
		if let Some(node) = &old.slots[index] {
			if dom.node_type(node) == NodeType::Element {
				if let Some(key) = dom.get_attribute(node, KEY_ATTRIBUTE) {
					map.insert(key, index);
				}
			}
		}
	}
	map
}

impl<D: Dom> VText<D> {
	/// See [`VChild::patch`].
	///
	/// # Errors
	///
	/// See [`VChild::patch`].
	pub fn patch(&self, dom: &D, old: &D::Node) -> Result<D::Node, Error> {
		VChild::Text(self.clone()).patch(dom, old)
	}
}
