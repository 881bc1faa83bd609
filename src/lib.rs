#![doc(html_root_url = "https://docs.rs/vnode-dom/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! A keyed virtual DOM: descriptors ([`VNode`], [`VText`]) are rendered into a real DOM
//! and later reconciled against it with minimal mutation, with lifecycle hooks along the way.
//!
//! The real DOM is abstracted by [`Dom`], implemented for an in-memory [`ServerDom`]
//! and the browser ([`WebDom`]).
//!
//! Everything is synchronous and single-threaded. Callers must not patch overlapping subtrees reentrantly.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod dom;
mod error;
pub mod events;
pub mod load;
pub mod patch;
pub mod remove;
pub mod render;
pub mod server_dom;
pub mod sync;
pub mod vnode;
pub mod web;

pub use dom::{Dom, EventOptions, NodeType, KEY_ATTRIBUTE};
pub use error::Error;
pub use events::{Event, EventMap, Handler, NodeClass};
pub use remove::Done;
pub use render::InsertQueue;
pub use server_dom::{ServerDom, ServerNode};
pub use vnode::{AttributeValue, HtmlOptions, Key, VChild, VNode, VText, TEXT_TAG};
pub use web::WebDom;

/// Element factory, the entry point for template output.
///
/// `"class"` attributes are split into the class set and `"key"` becomes the key.
#[must_use]
pub fn vnode<D: Dom>(tag: &str, attributes: &[(&str, AttributeValue)], children: impl IntoIterator<Item = VChild<D>>) -> VNode<D> {
	let mut vnode = VNode::new(tag);
	for (name, value) in attributes {
		vnode.set_attribute(*name, value.clone());
	}
	for child in children {
		vnode.add(child);
	}
	vnode
}

/// Text factory.
#[must_use]
pub fn vtext<D: Dom>(text: impl Into<String>) -> VText<D> {
	VText::new(text)
}

/// Text and attribute values as they may appear in logs.
#[cfg(feature = "dangerous-logging")]
pub(crate) fn loggable(text: &str) -> &str {
	text
}

#[cfg(not(feature = "dangerous-logging"))]
pub(crate) fn loggable(_text: &str) -> &str {
	"(redacted)"
}
