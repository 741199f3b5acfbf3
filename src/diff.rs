use crate::{
	create::materialize,
	host::Host,
	node::{Element, PropValue, VirtualNode},
	props::diff_props,
};
use tracing::{error, info, instrument, level_filters::STATIC_MAX_LEVEL, trace, trace_span, warn, Level};

/// How a position in the live tree was treated during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
	/// There was no previous node. A new live subtree was appended.
	Added,
	/// There is no next node. The live node was removed.
	Removed,
	/// The text, node kind or tag changed. A new live subtree took the old one's place.
	Replaced,
	/// Same tag. Changed properties were assigned in place and children were reconciled.
	Updated,
	/// Identical text. Nothing was touched.
	Unchanged,
}

/// Classifies a `(previous, next)` pair. Returns [`None`] only if both are absent.
///
/// The cases are mutually exclusive and total.
#[must_use]
pub fn classify(previous: Option<&VirtualNode>, next: Option<&VirtualNode>) -> Option<Classification> {
	Some(match (previous, next) {
		(None, None) => return None,
		(None, Some(_)) => Classification::Added,
		(Some(_), None) => Classification::Removed,
		(Some(VirtualNode::Text(a)), Some(VirtualNode::Text(b))) => {
			if a == b {
				Classification::Unchanged
			} else {
				Classification::Replaced
			}
		}
		(Some(VirtualNode::Element(a)), Some(VirtualNode::Element(b))) if a.tag == b.tag => Classification::Updated,
		(Some(_), Some(_)) => Classification::Replaced,
	})
}

/// One classified position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change {
	/// Nesting below the live parent passed to [`Differ::reconcile`].
	pub depth: usize,
	/// Position among the live parent's children.
	pub index: usize,
	pub kind: Classification,
	/// Number of properties assigned or cleared in place. Only ever non-zero for [`Classification::Updated`].
	pub properties: usize,
}

/// Everything a reconciliation did, in visiting order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
	changes: Vec<Change>,
}
impl Report {
	#[must_use]
	pub fn changes(&self) -> &[Change] {
		&self.changes
	}

	#[must_use]
	pub fn count(&self, kind: Classification) -> usize {
		self.changes.iter().filter(|change| change.kind == kind).count()
	}

	/// Whether no live mutation was requested.
	#[must_use]
	pub fn is_noop(&self) -> bool {
		self.changes.iter().all(|change| match change.kind {
			Classification::Unchanged => true,
			Classification::Updated => change.properties == 0,
			Classification::Added | Classification::Removed | Classification::Replaced => false,
		})
	}

	fn push(&mut self, depth: usize, index: usize, kind: Classification, properties: usize) {
		self.changes.push(Change { depth, index, kind, properties })
	}
}

/// Positional VDOM reconciler.
///
/// Brings one live child of a parent into agreement with a new virtual tree, given the virtual tree it currently reflects.
/// Children are matched strictly by index: reordering an unkeyed list results in per-position updates and replacements.
///
/// # Correct Use
///
/// The live tree below the given position must reflect `previous` exactly, which is the case if it was only ever
/// modified through the same [`Differ`] (or [`reconcile`]).
/// Mismatches are logged as errors and patched over as well as possible, but may cause further errors down the line.
///
/// Reconciliation never fails. Host errors are logged and the affected position is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Differ {
	depth_limit: usize,
}
impl Default for Differ {
	fn default() -> Self {
		Self::new()
	}
}

impl Differ {
	pub const DEFAULT_DEPTH_LIMIT: usize = 1024;

	#[must_use]
	pub fn new() -> Self {
		Self {
			depth_limit: Self::DEFAULT_DEPTH_LIMIT,
		}
	}

	/// Sets how many levels below the live parent are reconciled before giving up with an error.
	#[must_use]
	pub fn with_depth_limit(self, depth_limit: usize) -> Self {
		Self { depth_limit }
	}

	#[must_use]
	pub fn depth_limit(&self) -> usize {
		self.depth_limit
	}

	/// Reconciles the live child of `parent` at `index` from `previous` to `next`.
	///
	/// - No previous node: `next` is materialized and appended to `parent`.
	/// - No next node: the live node at `index` is removed.
	/// - Changed text, node kind or tag: `next` is materialized and replaces the live node at `index`.
	/// - Same tag: changed properties are assigned in place, then children are reconciled by position.
	/// - Identical text: nothing happens.
	///
	/// [`Host::flush`] is called once afterwards.
	///
	/// Added nodes are always appended, whatever `index` is. Adding and then removing at the same `index` therefore
	/// only restores the live child list if `index` was its length before the addition.
	#[instrument(skip(self, host, previous, next))]
	pub fn reconcile<H: Host>(&self, host: &mut H, previous: Option<&VirtualNode>, next: Option<&VirtualNode>, parent: &H::Node, index: usize) -> Report {
		let mut walk = Walk::default();
		self.reconcile_at(host, previous, next, parent, index, 0, &mut walk);
		host.flush();

		let report = walk.report;
		info!(
			added = report.count(Classification::Added),
			removed = report.count(Classification::Removed),
			replaced = report.count(Classification::Replaced),
			updated = report.count(Classification::Updated),
			unchanged = report.count(Classification::Unchanged),
			"Reconciled."
		);
		report
	}

	#[allow(clippy::too_many_arguments)]
	fn reconcile_at<H: Host>(&self, host: &mut H, previous: Option<&VirtualNode>, next: Option<&VirtualNode>, parent: &H::Node, index: usize, depth: usize, walk: &mut Walk) {
		if depth > self.depth_limit {
			return error!("Depth limit reached");
		}

		#[cfg(feature = "log-paths")]
		walk.path.push(index);
		#[cfg(feature = "log-paths")]
		let span = trace_span!("Reconciling", depth, index, path = ?walk.path);
		#[cfg(not(feature = "log-paths"))]
		let span = trace_span!("Reconciling", depth, index);
		let enter = span.enter();

		self.apply(host, previous, next, parent, index, depth, walk);

		drop(enter);
		#[cfg(feature = "log-paths")]
		walk.path.pop();
	}

	#[allow(clippy::too_many_arguments)]
	#[allow(clippy::too_many_lines)]
	fn apply<H: Host>(&self, host: &mut H, previous: Option<&VirtualNode>, next: Option<&VirtualNode>, parent: &H::Node, index: usize, depth: usize, walk: &mut Walk) {
		match (classify(previous, next), previous, next) {
			(None, _, _) => trace!("Nothing to reconcile."),

			(Some(Classification::Added), _, Some(next)) => {
				let span = trace_span!("Adding", tag = next.tag());
				let _enter = span.enter();
				if append(host, parent, next) {
					walk.report.push(depth, index, Classification::Added, 0);
				}
			}

			(Some(Classification::Removed), Some(previous), _) => {
				let span = trace_span!("Removing", tag = previous.tag());
				let _enter = span.enter();
				match host.child_at(parent, index) {
					None => error!("Expected to remove node beyond end of live child list. Ignoring."),
					Some(live) => match host.remove_child(&live) {
						Err(error) => error!("Failed to remove live node {:?}: {:?}", live, error),
						Ok(()) => {
							let released = release_callbacks(host, previous);
							trace!("Released {} callback(s).", released);
							walk.report.push(depth, index, Classification::Removed, 0);
						}
					},
				}
			}

			(Some(Classification::Unchanged), _, _) => {
				trace!("Text unchanged.");
				walk.report.push(depth, index, Classification::Unchanged, 0);
			}

			(Some(Classification::Updated), Some(VirtualNode::Element(e_1)), Some(VirtualNode::Element(e_2))) => {
				let span = trace_span!("Updating element", tag = %e_2.tag);
				let _enter = span.enter();
				let live = match host.child_at(parent, index) {
					Some(live) => live,
					None => {
						error!("Expected <{}> beyond end of live child list. Switching to insertion.", e_1.tag);
						if next.map_or(false, |next| append(host, parent, next)) {
							walk.report.push(depth, index, Classification::Added, 0);
						}
						return;
					}
				};

				let properties = update_properties(host, e_1, e_2, &live);
				walk.report.push(depth, index, Classification::Updated, properties);

				self.reconcile_children(host, &e_1.children, &e_2.children, &live, depth + 1, walk);
			}

			// Mismatching nodes: Destroy and rebuild.
			(Some(Classification::Replaced), Some(previous), Some(next)) => {
				let span = trace_span!("Replacing mismatching");
				let _enter = span.enter();

				if STATIC_MAX_LEVEL >= Level::WARN {
					if let (VirtualNode::Element(e_1), VirtualNode::Element(e_2)) = (previous, next) {
						if e_1.tag.eq_ignore_ascii_case(&e_2.tag) {
							warn!("Recreating element due to different tag name casing: {:?} -> {:?}", e_1.tag, e_2.tag);
						}
					}
				}
				if cfg!(feature = "dangerous-logging") {
					if let (VirtualNode::Text(t_1), VirtualNode::Text(t_2)) = (previous, next) {
						trace!("Text changed: {:?} -> {:?}", t_1, t_2);
					}
				}

				let old = match host.child_at(parent, index) {
					Some(old) => old,
					None => {
						error!("Expected to replace node beyond end of live child list. Switching to insertion.");
						if append(host, parent, next) {
							walk.report.push(depth, index, Classification::Added, 0);
						}
						return;
					}
				};

				let new = match materialize(host, next) {
					Ok(new) => new,
					Err(error) => return error!("Failed to materialize replacement: {:?}", error),
				};
				if let Err(error) = host.replace_child(&old, &new) {
					error!("Failed to replace live node {:?}: {:?}", old, error);
					release_callbacks(host, next);
					return;
				}
				let released = release_callbacks(host, previous);
				trace!("Released {} callback(s).", released);
				walk.report.push(depth, index, Classification::Replaced, 0);
			}

			(Some(kind), _, _) => error!("Classified as {:?}, but the nodes don't fit that.", kind),
		}
	}

	/// Reconciles `c_1` to `c_2` below `live`, position by position.
	///
	/// Surplus old children are removed last to first, so that the live index of every visited child equals its virtual index.
	fn reconcile_children<H: Host>(&self, host: &mut H, c_1: &[VirtualNode], c_2: &[VirtualNode], live: &H::Node, depth: usize, walk: &mut Walk) {
		let span = trace_span!("Reconciling children", "c_1.len()" = c_1.len(), "c_2.len()" = c_2.len());
		let _enter = span.enter();

		let common = c_1.len().min(c_2.len());
		for (i, (a, b)) in c_1.iter().zip(c_2).enumerate() {
			self.reconcile_at(host, Some(a), Some(b), live, i, depth, walk);
		}
		for (i, removed) in c_1.iter().enumerate().skip(common).rev() {
			self.reconcile_at(host, Some(removed), None, live, i, depth, walk);
		}
		for (i, added) in c_2.iter().enumerate().skip(common) {
			self.reconcile_at(host, None, Some(added), live, i, depth, walk);
		}
	}
}

/// Reconciles with a default [`Differ`]. See [`Differ::reconcile`].
pub fn reconcile<H: Host>(host: &mut H, previous: Option<&VirtualNode>, next: Option<&VirtualNode>, parent: &H::Node, index: usize) -> Report {
	Differ::new().reconcile(host, previous, next, parent, index)
}

#[derive(Default)]
struct Walk {
	report: Report,
	#[cfg(feature = "log-paths")]
	path: Vec<usize>,
}

/// Materializes `node` and appends it to `parent`. Returns whether that worked.
fn append<H: Host>(host: &mut H, parent: &H::Node, node: &VirtualNode) -> bool {
	let live = match materialize(host, node) {
		Ok(live) => live,
		Err(error) => {
			error!("Failed to materialize node: {:?}", error);
			return false;
		}
	};
	match host.append_child(parent, &live) {
		Ok(()) => true,
		Err(error) => {
			error!("Failed to append live node {:?}: {:?}", live, error);
			release_callbacks(host, node);
			false
		}
	}
}

/// Assigns changed properties onto `live` in place. Returns how many were assigned or cleared.
fn update_properties<H: Host>(host: &mut H, e_1: &Element, e_2: &Element, live: &H::Node) -> usize {
	let diff = match diff_props(e_1, e_2) {
		Some(diff) => diff,
		None => return 0,
	};

	let mut assigned = 0;
	for (name, value) in diff {
		if cfg!(feature = "dangerous-logging") {
			trace!("Assigning {} = {:?}", name, value);
		} else {
			trace!("Assigning {}", name);
		}
		if let Err(error) = host.set_property(live, name, value) {
			error!("Failed to assign property {:?}: {:?}", name, error);
			continue;
		}
		if let Some(PropValue::Callback(callback)) = e_1.props.get(name) {
			host.release_callback(callback);
		}
		assigned += 1;
	}
	assigned
}

/// Releases every callback in a subtree that just left the live tree.
/// Returns the number of releases.
fn release_callbacks<H: Host>(host: &mut H, node: &VirtualNode) -> usize {
	let mut released = 0;
	for callback in node.callbacks() {
		host.release_callback(callback);
		released += 1;
	}
	released
}
