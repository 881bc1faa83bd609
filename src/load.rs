//! Rebuilding descriptors from an existing real DOM, e.g. one that was rendered on a server.
//!
//! The result describes the structure only: lifecycle listeners and event bindings can't be recovered.

use crate::{
	dom::{NodeType, KEY_ATTRIBUTE},
	Dom, Error, VChild, VNode, VText,
};
use tracing::{instrument, warn};

/// Loads an element or text node.
///
/// # Errors
///
/// [`Error::NotSupported`] for documents and any other kind of node.
pub fn load_node<D: Dom>(dom: &D, node: &D::Node) -> Result<VChild<D>, Error> {
	match dom.node_type(node) {
		NodeType::Element => Ok(load_element(dom, node).into()),
		NodeType::Text => Ok(VText::new(dom.text_content(node)).into()),
		NodeType::Document | NodeType::Other(_) => Err(Error::NotSupported),
	}
}

/// Loads `element` and its subtree. The tag is lower-cased and the key restored from the marker attribute.
#[instrument(skip(dom))]
pub fn load_element<D: Dom>(dom: &D, element: &D::Node) -> VNode<D> {
	let mut vnode = VNode::new(dom.node_name(element).to_ascii_lowercase());
	load_attributes(dom, element, &mut vnode);
	for child in load_child_nodes(dom, element) {
		vnode.add(child);
	}
	vnode
}

/// Loads the element and text children of `parent`. Other nodes (like comments) are skipped.
pub fn load_child_nodes<D: Dom>(dom: &D, parent: &D::Node) -> Vec<VChild<D>> {
	dom.child_nodes(parent)
		.iter()
		.filter_map(|child| match dom.node_type(child) {
			NodeType::Element => Some(load_element(dom, child).into()),
			NodeType::Text => Some(VText::new(dom.text_content(child)).into()),
			other => {
				warn!(node = ?child, node_type = ?other, "Skipping unrecognised child node.");
				None
			}
		})
		.collect()
}

/// Copies the attributes of `element` onto `vnode`, routing `class` into its class set.
pub fn load_attributes<D: Dom>(dom: &D, element: &D::Node, vnode: &mut VNode<D>) {
	for name in dom.attribute_names(element) {
		let value = match dom.get_attribute(element, &name) {
			Some(value) => value,
			None => continue,
		};
		match name.as_str() {
			KEY_ATTRIBUTE => {
				vnode.set_key(Some(value.into()));
			}
			"class" => {
				vnode.add_class(&value);
			}
			_ => {
				vnode.set_attribute(name, value);
			}
		}
	}
}
