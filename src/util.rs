/// Wall clock in milliseconds since the Unix epoch.
pub fn now_millis() -> f64 {
	#[cfg(target_arch = "wasm32")]
	{
		js_sys::Date::now()
	}
	#[cfg(not(target_arch = "wasm32"))]
	{
		std::time::SystemTime::now()
			.duration_since(std::time::UNIX_EPOCH)
			.map(|elapsed| elapsed.as_secs_f64() * 1000.0)
			.unwrap_or(0.0)
	}
}

/// 64-bit FNV-1a. Fixed width, so wasm32 and native hosts agree.
fn fnv1a(bytes: &[u8]) -> u64 {
	const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
	const PRIME: u64 = 0x0000_0100_0000_01b3;
	bytes
		.iter()
		.fold(OFFSET, |hash, &byte| (hash ^ u64::from(byte)).wrapping_mul(PRIME))
}

/// Deterministic pseudo-random sequence (SplitMix64).
#[derive(Clone, Debug)]
pub struct SeededRng {
	state: u64,
}

impl SeededRng {
	pub fn new(seed: u64) -> Self {
		Self { state: seed }
	}

	/// Generator keyed by a node id, identical across runs, toolchains and targets.
	pub fn for_id(id: &str) -> Self {
		Self::new(fnv1a(id.as_bytes()))
	}

	pub fn next_u64(&mut self) -> u64 {
		self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
		let mut z = self.state;
		z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
		z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
		z ^ (z >> 31)
	}

	/// Uniform value in `[0, 1)`.
	pub fn next_f64(&mut self) -> f64 {
		(self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
	}

	/// Uniform value in `[low, high)`.
	pub fn range(&mut self, low: f64, high: f64) -> f64 {
		low + (high - low) * self.next_f64()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn same_id_same_sequence() {
		let mut a = SeededRng::for_id("peer-7");
		let mut b = SeededRng::for_id("peer-7");
		for _ in 0..8 {
			assert_eq!(a.next_u64(), b.next_u64());
		}
		assert_ne!(
			SeededRng::for_id("peer-7").next_u64(),
			SeededRng::for_id("peer-8").next_u64()
		);
	}

	#[test]
	fn id_seed_is_a_fixed_hash_of_the_bytes() {
		assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
		assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
		assert_eq!(fnv1a(b"foobar"), 0x8594_4171_f739_67e8);
		assert_eq!(
			SeededRng::for_id("foobar").next_u64(),
			SeededRng::new(0x8594_4171_f739_67e8).next_u64()
		);
	}

	#[test]
	fn range_stays_in_bounds() {
		let mut rng = SeededRng::new(42);
		for _ in 0..1000 {
			let value = rng.range(2.0, 6.0);
			assert!((2.0..6.0).contains(&value));
		}
	}
}
