use vnode_dom::{ServerDom, ServerNode, VChild, VNode};

use server_log_::{init_logging, CountingDom, Op};

/// A `span` containing `n`. Numbers become keys, anything else is unkeyed.
fn span<D: vnode_dom::Dom>(n: &str) -> VChild<D> {
	let span = VNode::<D>::new("span").child(n);
	match n.parse::<u32>() {
		Ok(key) => span.with_key(key).into(),
		Err(_) => span.into(),
	}
}

fn spans<D: vnode_dom::Dom>(children: &[&str]) -> VNode<D> {
	VNode::<D>::new("span").with_children(children.iter().map(|n| span::<D>(n)))
}

fn assert_children_updated(before: &[&str], after: &[&str]) {
	init_logging();
	let dom = ServerDom::new();
	let container = dom.create_element("div");

	let element = spans::<ServerDom>(before).append_to(&dom, &container).unwrap();
	let element = spans::<ServerDom>(after).patch(&dom, &element).unwrap();

	let actual: Vec<String> = element.child_nodes().iter().map(ServerNode::inner_html).collect();
	assert_eq!(actual, after, "children not updated correctly");
	assert_eq!(container.child_nodes(), vec![element]);
}

#[test]
fn appends_elements() {
	assert_children_updated(&["1"], &["1", "2", "3"]);
}

#[test]
fn prepends_elements() {
	assert_children_updated(&["4", "5"], &["1", "2", "3", "4", "5"]);
}

#[test]
fn adds_elements_in_the_middle() {
	assert_children_updated(&["1", "2", "4", "5"], &["1", "2", "3", "4", "5"]);
}

#[test]
fn adds_elements_at_begin_and_end() {
	assert_children_updated(&["2", "3", "4"], &["1", "2", "3", "4", "5"]);
}

#[test]
fn adds_children_to_parent_with_no_children() {
	assert_children_updated(&[], &["1", "2", "3"]);
}

#[test]
fn removes_all_children_from_parent() {
	assert_children_updated(&["1", "2", "3"], &[]);
}

#[test]
fn removes_elements_from_the_beginning() {
	assert_children_updated(&["1", "2", "3", "4", "5"], &["3", "4", "5"]);
}

#[test]
fn removes_elements_from_the_end() {
	assert_children_updated(&["1", "2", "3", "4", "5"], &["1", "2", "3"]);
}

#[test]
fn removes_elements_from_the_middle() {
	assert_children_updated(&["1", "2", "3", "4", "5"], &["1", "2", "4", "5"]);
}

#[test]
fn moves_element_forward() {
	assert_children_updated(&["1", "2", "3", "4"], &["2", "3", "1", "4"]);
}

#[test]
fn moves_element_to_end() {
	assert_children_updated(&["1", "2", "3"], &["2", "3", "1"]);
}

#[test]
fn moves_element_backwards() {
	assert_children_updated(&["1", "2", "3", "4", "5"], &["1", "4", "2", "3"]);
}

#[test]
fn swaps_first_and_last() {
	assert_children_updated(&["1", "2", "3", "4"], &["4", "2", "3", "1"]);
}

#[test]
fn moves_to_left_and_replaces() {
	assert_children_updated(&["1", "2", "3", "4", "5"], &["4", "1", "2", "3", "6"]);
}

#[test]
fn moves_to_left_and_leaves_hole() {
	assert_children_updated(&["1", "4", "5"], &["4", "6"]);
}

#[test]
fn handles_moved_and_set_to_undefined_element_at_end() {
	assert_children_updated(&["2", "4", "5"], &["4", "5", "3"]);
}

#[test]
fn moves_a_key_in_non_keyed_nodes_with_a_size_up() {
	assert_children_updated(&["1", "a", "b", "c"], &["d", "a", "b", "c", "1", "e"]);
}

#[test]
fn reverses_elements() {
	assert_children_updated(&["1", "2", "3", "4", "5", "6", "7", "8"], &["8", "7", "6", "5", "4", "3", "2", "1"]);
}

#[test]
fn random() {
	assert_children_updated(&["0", "1", "2", "3", "4", "5"], &["4", "3", "2", "1", "5", "0"]);
}

#[test]
fn keeps_node_identities_when_reordering() {
	init_logging();
	let dom = CountingDom::new();
	let container = dom.inner.create_element("div");

	let element = spans::<CountingDom>(&["1", "2", "3"]).append_to(&dom, &container).unwrap();
	let before = element.child_nodes();
	dom.clear();

	let element = spans::<CountingDom>(&["3", "1", "2"]).patch(&dom, &element).unwrap();

	assert_eq!(element.child_nodes(), vec![before[2].clone(), before[0].clone(), before[1].clone()]);
	assert_eq!(dom.ops_in(&element), vec![Op::Move]);
}

#[test]
fn append_only_growth_inserts_exactly_the_new_nodes() {
	init_logging();
	let dom = CountingDom::new();
	let container = dom.inner.create_element("div");

	let element = spans::<CountingDom>(&["1"]).append_to(&dom, &container).unwrap();
	let first = element.first_child().unwrap();
	dom.clear();

	let element = spans::<CountingDom>(&["1", "2", "3"]).patch(&dom, &element).unwrap();

	assert_eq!(element.first_child(), Some(first));
	assert_eq!(dom.count_in(&element, Op::Insert), 2);
	assert_eq!(dom.count_in(&element, Op::Move), 0);
	assert_eq!(dom.count_in(&element, Op::Remove), 0);
}

#[test]
fn patching_with_an_identical_descriptor_is_structurally_idempotent() {
	init_logging();
	let dom = CountingDom::new();
	let container = dom.inner.create_element("div");
	let tree = || {
		VNode::<CountingDom>::new("section")
			.with_class("list")
			.child(spans::<CountingDom>(&["1", "a", "2"]))
			.child("trailing text")
	};

	let element = tree().append_to(&dom, &container).unwrap();
	let html = container.inner_html();
	dom.clear();

	let patched = tree().patch(&dom, &element).unwrap();

	assert_eq!(patched, element);
	assert_eq!(dom.total(), 0);
	assert_eq!(container.inner_html(), html);
}

#[test]
fn replaces_a_keyed_element_whose_tag_changed() {
	init_logging();
	let dom = ServerDom::new();
	let container = dom.create_element("div");

	let element = spans::<ServerDom>(&["1", "2", "3"]).append_to(&dom, &container).unwrap();
	let before = element.child_nodes();

	let after = VNode::<ServerDom>::new("span")
		.child(VNode::<ServerDom>::new("div").with_key(3_u32).child("3"))
		.child(span::<ServerDom>("1"))
		.child(span::<ServerDom>("2"));
	let element = after.patch(&dom, &element).unwrap();

	let children = element.child_nodes();
	assert_eq!(
		element.inner_html(),
		r#"<div data-vnode-key="3">3</div><span data-vnode-key="1">1</span><span data-vnode-key="2">2</span>"#
	);
	assert_ne!(children[0], before[2]);
	assert_eq!(children[1..], before[..2]);
	assert!(before[2].parent_node().is_none());
}

#[test]
fn replaces_the_root_if_its_key_changed() {
	init_logging();
	let dom = ServerDom::new();
	let container = dom.create_element("div");

	let old = VNode::<ServerDom>::new("p").with_key("a").append_to(&dom, &container).unwrap();
	let new = VNode::<ServerDom>::new("p").with_key("b").patch(&dom, &old).unwrap();

	assert_ne!(new, old);
	assert_eq!(container.child_nodes(), vec![new]);
	assert_eq!(container.inner_html(), r#"<p data-vnode-key="b"></p>"#);
}

#[test]
fn moving_old_left_behind_old_right_wins_over_the_opposite_move() {
	init_logging();
	let dom = CountingDom::new();
	let container = dom.inner.create_element("div");

	let element = spans::<CountingDom>(&["1", "2"]).append_to(&dom, &container).unwrap();
	let before = element.child_nodes();
	dom.clear();

	let element = spans::<CountingDom>(&["2", "1"]).patch(&dom, &element).unwrap();

	assert_eq!(element.child_nodes(), vec![before[1].clone(), before[0].clone()]);
	assert_eq!(dom.ops_in(&element), vec![Op::Move]);
	assert_eq!(dom.nodes_in(&element, Op::Move), vec![before[0].clone()]);
}

#[test]
fn matching_left_to_left_wins_over_moving_old_left() {
	init_logging();
	let dom = CountingDom::new();
	let container = dom.inner.create_element("div");

	let element = spans::<CountingDom>(&["a", "b"]).append_to(&dom, &container).unwrap();
	let before = element.child_nodes();
	dom.clear();

	let element = spans::<CountingDom>(&["c", "d"]).patch(&dom, &element).unwrap();

	assert_eq!(element.child_nodes(), before);
	assert_eq!(element.inner_html(), "<span>c</span><span>d</span>");
	assert_eq!(dom.total(), 0);
}
