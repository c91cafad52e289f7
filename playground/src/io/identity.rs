//! Random identifiers for anonymous visitors and editor sessions.

use rand::{Rng, distributions::Alphanumeric};

/// Length of generated identifiers.
pub const ID_LEN: usize = 21;

/// Generate a random alphanumeric identifier.
///
/// Ids carry no meaning and are not persisted anywhere; a visitor who loses
/// theirs simply gets a new one.
pub fn random_id() -> String {
    let mut rng = rand::thread_rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(char::from)
        .take(ID_LEN)
        .collect()
}
