use std::{cell::RefCell, rc::Rc};
use vnode_dom::{
	events::{Event, GLOBAL, INSERT, PATCH, POSTPATCH, PREPATCH, REMOVE},
	Error, Handler, NodeClass, ServerDom, VChild, VNode, VText,
};

use server_log_::{events, init_logging, logged_class, EventLog};

type Calls = Rc<RefCell<Vec<String>>>;

fn recorder(calls: &Calls, name: &'static str) -> Handler<ServerDom> {
	let calls = Rc::clone(calls);
	Handler::closure(move |_, event| {
		calls.borrow_mut().push(format!("{} {}", name, event.name));
		Ok(())
	})
}

#[test]
fn triggers_in_class_then_instance_order() {
	init_logging();
	let dom = ServerDom::new();
	let node = dom.create_element("div");
	let calls = Calls::default();

	let class = NodeClass::<ServerDom>::new("ordered");
	class.listen("custom", recorder(&calls, "class specific"));
	class.listen(GLOBAL, recorder(&calls, "class global"));
	let vnode = VChild::from(
		VNode::<ServerDom>::new("div")
			.with_node_class(class)
			.listen("custom", recorder(&calls, "instance specific"))
			.listen(GLOBAL, recorder(&calls, "instance global")),
	);

	vnode.trigger(&dom, "custom", &node).unwrap();

	assert_eq!(
		*calls.borrow(),
		vec![
			"class global custom",
			"class specific custom",
			"instance global custom",
			"instance specific custom",
		]
	);
}

#[test]
fn triggering_the_global_channel_runs_its_listeners_once() {
	init_logging();
	let dom = ServerDom::new();
	let node = dom.create_text_node("text");
	let calls = Calls::default();

	let vnode = VChild::from(VText::new("text").listen(GLOBAL, recorder(&calls, "global")));
	vnode.trigger(&dom, GLOBAL, &node).unwrap();

	assert_eq!(*calls.borrow(), vec!["global all"]);
}

#[test]
fn subclasses_copy_their_parent_registry() {
	let calls = Calls::default();
	let parent = NodeClass::<ServerDom>::new("parent");
	parent.listen("custom", recorder(&calls, "inherited"));

	let child = NodeClass::subclass(&parent, "child");
	child.listen("custom", recorder(&calls, "child only"));
	parent.listen("custom", recorder(&calls, "parent only"));

	assert_eq!(parent.listener_count("custom"), 2);
	assert_eq!(child.listener_count("custom"), 2);
	assert_eq!(child.name(), "child");

	let dom = ServerDom::new();
	let node = dom.create_element("i");
	VChild::from(VNode::new("i").with_node_class(child)).trigger(&dom, "custom", &node).unwrap();
	assert_eq!(*calls.borrow(), vec!["inherited custom", "child only custom"]);
}

fn mark(vnode: &VChild<ServerDom>, event: &Event<'_, ServerDom>) -> Result<(), Error> {
	event.node.set_attribute("data-marked", vnode.tag())
}

#[test]
fn dispatches_named_methods() {
	init_logging();
	let dom = ServerDom::new();
	let node = dom.create_element("div");

	let class = NodeClass::<ServerDom>::new("marking");
	class.define_method("mark", mark);
	class.listen("custom", Handler::method("mark"));
	assert!(class.method("mark").is_some());

	VChild::from(VNode::new("div").with_node_class(class)).trigger(&dom, "custom", &node).unwrap();
	assert_eq!(node.get_attribute("data-marked").as_deref(), Some("div"));
}

#[test]
fn unknown_methods_are_an_error() {
	init_logging();
	let dom = ServerDom::new();
	let node = dom.create_element("div");
	let calls = Calls::default();

	let vnode = VChild::from(
		VNode::<ServerDom>::new("div")
			.listen("custom", Handler::method("missing"))
			.listen("custom", recorder(&calls, "later")),
	);

	assert_eq!(
		vnode.trigger(&dom, "custom", &node),
		Err(Error::UnknownMethod {
			method: "missing".to_owned(),
			class: "element".to_owned(),
		})
	);
	assert!(calls.borrow().is_empty());
}

#[test]
fn counts_class_and_instance_listeners() {
	let calls = Calls::default();
	let class = NodeClass::<ServerDom>::new("counted");
	class.listen(REMOVE, recorder(&calls, "a"));
	class.listen(GLOBAL, recorder(&calls, "b"));

	let handler = recorder(&calls, "c");
	let mut vnode = VNode::new("div").with_node_class(class).listen(REMOVE, handler.clone());
	let child = VChild::from(vnode.clone());
	assert_eq!(child.count_listeners(REMOVE), 2);
	assert_eq!(child.count_listeners(INSERT), 0);

	assert!(vnode.unlisten(REMOVE, &handler));
	assert!(!vnode.unlisten(REMOVE, &handler));
	assert_eq!(VChild::from(vnode).count_listeners(REMOVE), 1);
	// Copy-on-write: the earlier handle still sees its own listener.
	assert_eq!(child.count_listeners(REMOVE), 2);
}

#[test]
fn patching_fires_pre_and_post_hooks_around_children() {
	init_logging();
	let dom = ServerDom::new();
	let container = dom.create_element("div");
	let log = EventLog::default();

	let tree = |log: &EventLog<_>| {
		VNode::<ServerDom>::new("ul")
			.with_key("list")
			.with_node_class(logged_class(log))
			.child(VNode::<ServerDom>::new("li").with_key("item").with_node_class(logged_class(log)))
	};

	let element = tree(&log).append_to(&dom, &container).unwrap();
	log.borrow_mut().clear();
	tree(&log).patch(&dom, &element).unwrap();

	let ev = |event: &str, label: &str| (event.to_owned(), label.to_owned());
	assert_eq!(
		events(&log),
		vec![
			ev(PREPATCH, "list"),
			ev(PATCH, "list"),
			ev(PREPATCH, "item"),
			ev(PATCH, "item"),
			ev(POSTPATCH, "item"),
			ev(POSTPATCH, "list"),
		]
	);
}

#[test]
fn nodes_created_while_patching_are_inserted_last() {
	init_logging();
	let dom = ServerDom::new();
	let container = dom.create_element("div");
	let log = EventLog::default();

	let element = VNode::<ServerDom>::new("ul").with_key("list").append_to(&dom, &container).unwrap();
	VNode::<ServerDom>::new("ul")
		.with_key("list")
		.with_node_class(logged_class(&log))
		.child(VNode::<ServerDom>::new("li").with_key("new").with_node_class(logged_class(&log)))
		.patch(&dom, &element)
		.unwrap();

	let ev = |event: &str, label: &str| (event.to_owned(), label.to_owned());
	let log = events(&log);
	assert_eq!(log.first(), Some(&ev(PREPATCH, "list")));
	assert_eq!(log.last(), Some(&ev(INSERT, "new")));
	assert_eq!(log[log.len() - 2], ev(POSTPATCH, "list"));
}

#[test]
fn listener_errors_abort_patching() {
	init_logging();
	let dom = ServerDom::new();
	let container = dom.create_element("div");
	let element = VNode::<ServerDom>::new("div").append_to(&dom, &container).unwrap();

	let result = VNode::<ServerDom>::new("div")
		.listen(PREPATCH, Handler::closure(|_, _| Err(Error::Dom("refused".to_owned()))))
		.child("never rendered")
		.patch(&dom, &element);

	assert_eq!(result, Err(Error::Dom("refused".to_owned())));
	assert_eq!(element.inner_html(), "");
}
