use core::{
	borrow::Borrow,
	fmt::{self, Debug, Formatter},
	hash::{BuildHasher, Hash},
};
use hashbrown::{
	hash_map::{DefaultHashBuilder, Entry},
	HashMap,
};
use num_traits::{CheckedAdd, CheckedSub, One, Zero};

/// A map of values that are kept around while at least one reference is counted for their key.
///
/// Entries whose count drops to zero are *weak*: they stay available for reuse until [`RcHashMap::drain_weak`] is called.
pub struct RcHashMap<K, C, V, S = DefaultHashBuilder>(HashMap<K, (C, V), S>)
where
	K: Hash + Eq,
	C: CheckedAdd + CheckedSub + One + Zero,
	S: BuildHasher;
impl<K, C, V, S> Default for RcHashMap<K, C, V, S>
where
	K: Hash + Eq,
	C: CheckedAdd + CheckedSub + One + Zero,
	S: Default + BuildHasher,
{
	fn default() -> Self {
		Self::new()
	}
}
impl<K, C, V, S> Debug for RcHashMap<K, C, V, S>
where
	K: Hash + Eq + Debug,
	C: CheckedAdd + CheckedSub + One + Zero + Debug,
	V: Debug,
	S: BuildHasher,
{
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.0.iter()).finish()
	}
}
impl<K, C, V, S> RcHashMap<K, C, V, S>
where
	K: Hash + Eq,
	C: CheckedAdd + CheckedSub + One + Zero,
	S: BuildHasher,
{
	#[must_use]
	pub fn new() -> Self
	where
		S: Default,
	{
		Self(HashMap::with_hasher(S::default()))
	}

	pub fn increment_or_insert_with<F: FnOnce() -> V>(&mut self, k: K, v: F) -> Result<&mut V, CountSaturatedError> {
		match self.0.entry(k) {
			Entry::Occupied(occupied) => {
				let (c, v) = occupied.into_mut();
				*c = c.checked_add(&C::one()).ok_or(CountSaturatedError)?;
				Ok(v)
			}
			Entry::Vacant(vacant) => {
				let (_, v) = vacant.insert((C::one(), v()));
				Ok(v)
			}
		}
	}

	/// Decrements the count for `k` without dropping its value.
	///
	/// Returns `Ok(None)` if there is no entry for `k`.
	///
	/// # Errors
	///
	/// Iff the count for `k` is already zero.
	pub fn weak_decrement<Q: ?Sized>(&mut self, k: &Q) -> Result<Option<&mut V>, CountSaturatedError>
	where
		K: Borrow<Q>,
		Q: Eq + Hash,
	{
		match self.0.get_mut(k) {
			Some((c, v)) => {
				*c = c.checked_sub(&C::one()).ok_or(CountSaturatedError)?;
				Ok(Some(v))
			}
			None => Ok(None),
		}
	}

	pub fn count<Q: ?Sized>(&self, k: &Q) -> Option<&C>
	where
		K: Borrow<Q>,
		Q: Eq + Hash,
	{
		self.0.get(k).map(|(c, _)| c)
	}

	/// Removes and yields all entries with a count of zero.
	pub fn drain_weak(&mut self) -> impl Iterator<Item = (K, V)> + '_ {
		self.0.extract_if(|_, (c, _)| c.is_zero()).map(|(k, (_, v))| (k, v))
	}

	/// Number of entries, including weak ones that weren't drained yet.
	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[cfg(target_arch = "wasm32")]
	#[must_use]
	pub fn capacity(&self) -> usize {
		self.0.capacity()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountSaturatedError;
