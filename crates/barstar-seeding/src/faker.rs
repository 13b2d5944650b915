//! Fake data provider.
//!
//! The generator only needs a random source plus a handful of plausible
//! scalars; [`FakerProvider`] supplies them through the `fake` crate.

use fake::Fake;
use fake::faker::internet::en::SafeEmail;
use fake::faker::lorem::en::Sentence;
use fake::faker::name::en::Name;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Source of random and domain-plausible values.
pub trait FakeDataProvider: Send {
	/// Random number generator backing every choice.
	fn rng(&mut self) -> &mut dyn RngCore;

	/// A synthetic email address.
	fn email(&mut self) -> String {
		SafeEmail().fake_with_rng(self.rng())
	}

	/// A synthetic person name.
	fn person_name(&mut self) -> String {
		Name().fake_with_rng(self.rng())
	}

	/// A short synthetic sentence.
	fn sentence(&mut self) -> String {
		Sentence(3..8).fake_with_rng(self.rng())
	}
}

/// [`FakeDataProvider`] backed by a [`StdRng`].
#[derive(Debug, Clone)]
pub struct FakerProvider {
	rng: StdRng,
}

impl FakerProvider {
	/// Creates a provider seeded from the operating system.
	pub fn new() -> Self {
		Self {
			rng: StdRng::from_entropy(),
		}
	}

	/// Creates a provider with a fixed seed.
	pub fn with_seed(seed: u64) -> Self {
		Self {
			rng: StdRng::seed_from_u64(seed),
		}
	}
}

impl Default for FakerProvider {
	fn default() -> Self {
		Self::new()
	}
}

impl FakeDataProvider for FakerProvider {
	fn rng(&mut self) -> &mut dyn RngCore {
		&mut self.rng
	}
}
