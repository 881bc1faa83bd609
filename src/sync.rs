//! Built-in [`CREATE`](`crate::events::CREATE`)/[`PATCH`](`crate::events::PATCH`) hooks
//! that bring a real element's classes, attributes and event bindings in line with its descriptor.
//!
//! They are registered by name on [`NodeClass::element`](`crate::NodeClass::element`),
//! so a subclass can swap any of them out with [`NodeClass::define_method`](`crate::NodeClass::define_method`).
//! All three ignore text nodes.

use crate::{
	dom::KEY_ATTRIBUTE,
	events::Event,
	vnode::{AttributeValue, VChild},
	Dom, Error,
};
use tracing::{instrument, trace};

pub const PATCH_CLASSES: &str = "patch_classes";
pub const PATCH_ATTRIBUTES: &str = "patch_attributes";
pub const PATCH_EVENTS: &str = "patch_events";

/// Writes the class set into the `class` attribute, or removes it if the set is empty.
///
/// # Errors
///
/// Iff the [`Dom`] fails to update the attribute.
#[instrument(skip(vnode, event), fields(node = ?event.node))]
pub fn patch_classes<D: Dom>(vnode: &VChild<D>, event: &Event<'_, D>) -> Result<(), Error> {
	let element = match vnode {
		VChild::Element(element) => element,
		VChild::Text(_) => return Ok(()),
	};
	let (dom, node) = (event.dom, event.node);

	if element.classes().is_empty() {
		if dom.get_attribute(node, "class").is_some() {
			trace!("Removing class attribute.");
			dom.remove_attribute(node, "class")?;
		}
	} else {
		let class = element.classes().iter().map(String::as_str).collect::<Vec<_>>().join(" ");
		if dom.get_attribute(node, "class").as_deref() != Some(class.as_str()) {
			trace!(class = crate::loggable(&class), "Setting class attribute.");
			dom.set_attribute(node, "class", &class)?;
		}
	}
	Ok(())
}

/// Removes stale attributes and sets changed ones.
///
/// `class` and the key marker attribute are left alone, as they're managed elsewhere.
///
/// # Errors
///
/// Iff the [`Dom`] fails to update an attribute.
#[instrument(skip(vnode, event), fields(node = ?event.node))]
pub fn patch_attributes<D: Dom>(vnode: &VChild<D>, event: &Event<'_, D>) -> Result<(), Error> {
	let element = match vnode {
		VChild::Element(element) => element,
		VChild::Text(_) => return Ok(()),
	};
	let (dom, node) = (event.dom, event.node);
	let attributes = element.attributes();

	for name in dom.attribute_names(node) {
		if name == "class" || name == KEY_ATTRIBUTE {
			continue;
		}
		let keep = matches!(attributes.get(&name), Some(AttributeValue::Str(_) | AttributeValue::Bool(true)));
		if !keep {
			trace!(name = %name, "Removing attribute.");
			dom.remove_attribute(node, &name)?;
		}
	}

	for (name, value) in attributes {
		let current = dom.get_attribute(node, name);
		match value {
			AttributeValue::Str(value) => {
				if current.as_deref() != Some(value.as_str()) {
					trace!(name = %name, value = crate::loggable(value), "Setting attribute.");
					dom.set_attribute(node, name, value)?;
				}
			}
			AttributeValue::Bool(true) => {
				if current.is_none() {
					trace!(name = %name, "Setting boolean attribute.");
					dom.set_attribute(node, name, "")?;
				}
			}
			AttributeValue::Bool(false) => {
				if current.is_some() {
					dom.remove_attribute(node, name)?;
				}
			}
		}
	}
	Ok(())
}

/// Unbinds events the descriptor no longer has and (re)binds changed ones.
///
/// A binding with the same handler and options is left alone, so a spent `once` binding stays spent.
///
/// # Errors
///
/// Iff the [`Dom`] fails to (un)bind a handler.
#[instrument(skip(vnode, event), fields(node = ?event.node))]
pub fn patch_events<D: Dom>(vnode: &VChild<D>, event: &Event<'_, D>) -> Result<(), Error> {
	let element = match vnode {
		VChild::Element(element) => element,
		VChild::Text(_) => return Ok(()),
	};
	let (dom, node) = (event.dom, event.node);
	let events = element.events();

	for name in dom.bound_events(node) {
		if !events.contains_key(&name) {
			trace!(name = %name, "Unbinding event.");
			dom.unbind_event(node, &name)?;
		}
	}
	for (name, binding) in events {
		if dom.is_bound(node, name, binding) {
			trace!(name = %name, "Binding unchanged.");
			continue;
		}
		dom.bind_event(node, name, binding)?;
	}
	Ok(())
}
