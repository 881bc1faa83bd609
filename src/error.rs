use thiserror::Error;

/// Errors raised while building descriptors, dispatching lifecycle events or mutating a DOM.
///
/// All of these are local to the operation that raised them. Nothing is rolled back,
/// so a failed [`patch`](`crate::VNode::patch`) may leave the DOM partially updated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
	/// A child value was neither a node descriptor nor a string.
	#[error("expected a VNode, VText or string child but got a value of another type")]
	UnexpectedChild,

	/// A [`Handler::Method`](`crate::events::Handler::Method`) named a method its node class doesn't define.
	#[error("unrecognized lifecycle handler: node class {class:?} has no method {method:?}")]
	UnknownMethod { method: String, class: String },

	/// The operation isn't supported on this kind of node, e.g. appending children to a text node.
	#[error("operation not supported on this node")]
	NotSupported,

	/// A node wasn't found among the children of the parent it was used with.
	#[error("node not found among the children of the given parent")]
	NodeNotFound,

	/// Any other failure reported by a DOM backend.
	#[error("DOM error: {0}")]
	Dom(String),
}
