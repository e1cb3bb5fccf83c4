//! Process-level seeded RNG. Dropout masks draw from here, so a single
//! [set_seed] call at the program boundary makes a whole run reproducible.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::RefCell;

thread_local! {
    static RNG: RefCell<Option<StdRng>> = RefCell::new(None);
}

/// Seed the thread-local generator. Call before forward passes that
/// contain dropout to get reproducible masks.
pub fn set_seed(seed: u64) {
    RNG.with(|rng| {
        *rng.borrow_mut() = Some(StdRng::seed_from_u64(seed));
    });
}

/// Run a closure with the thread-local RNG (seeded from 0 if never set).
pub fn with_rng<F, T>(f: F) -> T
where
    F: FnOnce(&mut StdRng) -> T,
{
    RNG.with(|rng| {
        let mut opt = rng.borrow_mut();
        if opt.is_none() {
            *opt = Some(StdRng::seed_from_u64(0));
        }
        f(opt.as_mut().unwrap())
    })
}
