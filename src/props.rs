use crate::node::{Element, PropValue};
use hashbrown::HashMap;
use tracing::{instrument, trace};

/// Properties to assign onto a live node so that it reflects the newer of two [`Element`]s.
///
/// A [`None`] value means the property was removed and should be cleared.
pub type PropDiff<'a> = HashMap<&'a str, Option<&'a PropValue>>;

/// Shallowly diffs the properties of two elements with the same tag.
///
/// Returns [`None`] if nothing changed. Otherwise the result contains every property that differs between `a` and `b`,
/// every property only present on `b` (with its value from `b`) and every property only present on `a` (as [`None`]).
///
/// Runs in *O*(|`a.props`| + |`b.props`|).
#[instrument(skip(a, b), fields(tag = %a.tag, a_len = a.props.len(), b_len = b.props.len()))]
pub fn diff_props<'a>(a: &'a Element, b: &'a Element) -> Option<PropDiff<'a>> {
	debug_assert_eq!(a.tag, b.tag);

	let mut diff = PropDiff::new();

	// Changed or removed.
	for (name, value) in &a.props {
		let next = b.props.get(name);
		if next != Some(value) {
			diff.insert(name.as_str(), next);
		}
	}

	// Added.
	for (name, value) in &b.props {
		if !a.props.contains_key(name) {
			diff.insert(name.as_str(), Some(value));
		}
	}

	if diff.is_empty() {
		trace!("No property changes.");
		None
	} else {
		trace!(changed = diff.len());
		Some(diff)
	}
}
