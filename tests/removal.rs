use std::{cell::RefCell, rc::Rc};
use vnode_dom::{
	events::{DESTROY, REMOVE},
	Done, Handler, NodeClass, ServerDom, VNode,
};

use server_log_::{events, init_logging, logged_class, CountingDom, EventLog, Op};

type Pending = Rc<RefCell<Vec<Done<ServerDom>>>>;

/// A [`REMOVE`] listener that holds on to the completion callback instead of calling it.
fn deferring(pending: &Pending) -> Handler<ServerDom> {
	let pending = Rc::clone(pending);
	Handler::closure(move |_, event| {
		pending.borrow_mut().push(event.done.expect("REMOVE always comes with a completion callback").clone());
		Ok(())
	})
}

#[test]
fn removes_synchronously_without_listeners() {
	init_logging();
	let dom = ServerDom::new();
	let container = dom.create_element("div");
	let node = VNode::<ServerDom>::new("p").append_to(&dom, &container).unwrap();

	let done = VNode::<ServerDom>::new("p").remove(&dom, &node).unwrap();

	assert!(done.is_done());
	assert_eq!(done.node(), &node);
	assert!(container.child_nodes().is_empty());
	assert!(node.parent_node().is_none());
}

#[test]
fn waits_for_all_remove_listeners() {
	init_logging();
	let dom = ServerDom::new();
	let container = dom.create_element("div");
	let log = EventLog::default();
	let pending = Pending::default();

	let vnode = VNode::<ServerDom>::new("p")
		.with_node_class(logged_class(&log))
		.listen(REMOVE, deferring(&pending))
		.listen(REMOVE, deferring(&pending));
	let node = vnode.append_to(&dom, &container).unwrap();
	log.borrow_mut().clear();

	let done = vnode.remove(&dom, &node).unwrap();
	assert_eq!(done.pending(), 2);
	assert_eq!(pending.borrow().len(), 2);
	assert_eq!(container.child_nodes(), vec![node.clone()]);

	pending.borrow()[0].call().unwrap();
	assert_eq!(done.pending(), 1);
	assert_eq!(container.child_nodes(), vec![node.clone()]);
	assert!(!events(&log).iter().any(|(event, _)| event == DESTROY));

	pending.borrow()[1].call().unwrap();
	assert!(done.is_done());
	assert!(container.child_nodes().is_empty());

	// Late acknowledgements are ignored.
	done.call().unwrap();

	let ev = |event: &str| (event.to_owned(), "p".to_owned());
	assert_eq!(events(&log), vec![ev(REMOVE), ev(DESTROY)]);
}

#[test]
fn class_listeners_count_towards_pending_removals() {
	init_logging();
	let dom = ServerDom::new();
	let container = dom.create_element("div");
	let pending = Pending::default();

	let class = NodeClass::subclass(&NodeClass::<ServerDom>::element(), "fading");
	class.listen(REMOVE, deferring(&pending));
	let vnode = VNode::<ServerDom>::new("p").with_node_class(class);
	let node = vnode.append_to(&dom, &container).unwrap();

	let done = vnode.remove(&dom, &node).unwrap();
	assert_eq!(done.pending(), 1);
	assert_eq!(container.child_nodes().len(), 1);

	pending.borrow_mut().pop().unwrap().call().unwrap();
	assert!(container.child_nodes().is_empty());
}

#[test]
fn destroys_nodes_without_parent() {
	init_logging();
	let dom = ServerDom::new();
	let log = EventLog::default();
	let vnode = VNode::<ServerDom>::new("p").with_node_class(logged_class(&log));
	let (node, _) = vnode.render(&dom).unwrap();
	log.borrow_mut().clear();

	let done = vnode.remove(&dom, &node).unwrap();

	assert!(done.is_done());
	let ev = |event: &str| (event.to_owned(), "p".to_owned());
	assert_eq!(events(&log), vec![ev(REMOVE), ev(DESTROY)]);
}

#[test]
fn full_replace_removes_every_child_through_the_coordinator() {
	init_logging();
	let dom = CountingDom::new();
	let container = dom.inner.create_element("div");
	let log = EventLog::default();

	let list = |keys: &[u32]| {
		VNode::<CountingDom>::new("ul")
			.with_node_class(logged_class(&log))
			.with_children(keys.iter().map(|key| VNode::<CountingDom>::new("li").with_key(*key)))
	};

	let element = list(&[1, 2, 3]).append_to(&dom, &container).unwrap();
	log.borrow_mut().clear();
	dom.clear();

	list(&[]).patch(&dom, &element).unwrap();

	assert!(element.child_nodes().is_empty());
	assert_eq!(dom.count_in(&element, Op::Remove), 3);
	assert_eq!(dom.count_in(&element, Op::Insert), 0);
	let destroyed: Vec<_> = log.borrow().iter().filter(|(event, _, _)| event == DESTROY).map(|(_, _, node)| node.clone()).collect();
	assert_eq!(destroyed.len(), 3);
}

#[test]
fn deferred_removals_keep_the_old_node_in_place_while_patching() {
	init_logging();
	let dom = ServerDom::new();
	let container = dom.create_element("div");
	let pending = Pending::default();

	let list = |keys: &[u32]| {
		VNode::<ServerDom>::new("ul")
			.listen(REMOVE, deferring(&pending))
			.with_children(keys.iter().map(|key| VNode::<ServerDom>::new("li").with_key(*key).child(key.to_string())))
	};

	let element = list(&[1, 2]).append_to(&dom, &container).unwrap();
	list(&[2]).patch(&dom, &element).unwrap();

	assert_eq!(element.inner_html(), r#"<li data-vnode-key="1">1</li><li data-vnode-key="2">2</li>"#);
	assert_eq!(pending.borrow().len(), 1);

	pending.borrow_mut().pop().unwrap().call().unwrap();
	assert_eq!(element.inner_html(), r#"<li data-vnode-key="2">2</li>"#);
}

#[test]
fn emptying_a_child_list_waits_for_remove_listeners() {
	init_logging();
	let dom = ServerDom::new();
	let container = dom.create_element("div");
	let pending = Pending::default();

	let list = |keys: &[u32]| {
		VNode::<ServerDom>::new("ul")
			.listen(REMOVE, deferring(&pending))
			.with_children(keys.iter().map(|key| VNode::<ServerDom>::new("li").with_key(*key)))
	};

	let element = list(&[1, 2, 3]).append_to(&dom, &container).unwrap();
	list(&[]).patch(&dom, &element).unwrap();

	assert_eq!(element.child_nodes().len(), 3);
	assert_eq!(pending.borrow().len(), 3);

	for done in pending.borrow_mut().drain(..) {
		done.call().unwrap();
	}
	assert!(element.child_nodes().is_empty());
}
