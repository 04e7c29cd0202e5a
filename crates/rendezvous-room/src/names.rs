//! Player-name de-duplication within a room.
//!
//! A join never fails because of a name clash; the joiner gets a
//! suffixed name instead and is told about it.

use rand::Rng;

/// Numbered suffixes tried (`_1` through `_100`) before falling back to
/// a random token.
pub const MAX_SUFFIX_ATTEMPTS: u32 = 100;

/// The outcome of [`resolve_name`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    /// A name not present in the roster.
    pub name: String,
    /// `true` if `name` differs from what was requested.
    pub changed: bool,
}

/// Resolves `requested` against `taken` using the thread-local RNG for
/// the fallback token.
pub fn resolve_name(requested: &str, taken: &[String]) -> ResolvedName {
    resolve_name_with(requested, taken, &mut rand::rng())
}

/// Resolves `requested` against `taken`.
///
/// 1. `requested` itself, if free.
/// 2. `requested_1` … `requested_100`.
/// 3. `requested_xxxx` with `xxxx` four random hex digits.
/// 4. If even that collides, `requested_101`, `requested_102`, … until
///    one is free. `taken` is finite, so this ends.
pub fn resolve_name_with<R: Rng>(
    requested: &str,
    taken: &[String],
    rng: &mut R,
) -> ResolvedName {
    let is_taken = |candidate: &str| taken.iter().any(|t| t == candidate);

    if !is_taken(requested) {
        return ResolvedName {
            name: requested.to_string(),
            changed: false,
        };
    }

    for suffix in 1..=MAX_SUFFIX_ATTEMPTS {
        let candidate = format!("{requested}_{suffix}");
        if !is_taken(&candidate) {
            return renamed(candidate);
        }
    }

    let token: u16 = rng.random();
    let candidate = format!("{requested}_{token:04x}");
    if !is_taken(&candidate) {
        return renamed(candidate);
    }

    let mut suffix = MAX_SUFFIX_ATTEMPTS + 1;
    loop {
        let candidate = format!("{requested}_{suffix}");
        if !is_taken(&candidate) {
            return renamed(candidate);
        }
        suffix += 1;
    }
}

fn renamed(name: String) -> ResolvedName {
    ResolvedName {
        name,
        changed: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn roster(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_free_name_is_returned_unchanged() {
        let resolved = resolve_name("Bob", &roster(&["Alice"]));
        assert_eq!(resolved.name, "Bob");
        assert!(!resolved.changed);
    }

    #[test]
    fn test_empty_roster_keeps_name() {
        let resolved = resolve_name("Alice", &[]);
        assert_eq!(resolved.name, "Alice");
        assert!(!resolved.changed);
    }

    #[test]
    fn test_clash_gets_first_suffix() {
        let resolved = resolve_name("Alice", &roster(&["Alice"]));
        assert_eq!(resolved.name, "Alice_1");
        assert!(resolved.changed);
    }

    #[test]
    fn test_suffixes_skip_taken_ones() {
        let resolved =
            resolve_name("Alice", &roster(&["Alice", "Alice_1", "Alice_2"]));
        assert_eq!(resolved.name, "Alice_3");
    }

    #[test]
    fn test_requesting_a_suffixed_name_that_is_free() {
        let resolved = resolve_name("Alice_1", &roster(&["Alice"]));
        assert_eq!(resolved.name, "Alice_1");
        assert!(!resolved.changed);
    }

    #[test]
    fn test_falls_back_to_random_token_after_all_suffixes() {
        let mut taken = roster(&["Al"]);
        taken.extend((1..=MAX_SUFFIX_ATTEMPTS).map(|i| format!("Al_{i}")));

        let mut rng = StdRng::seed_from_u64(7);
        let resolved = resolve_name_with("Al", &taken, &mut rng);

        assert!(resolved.changed);
        assert!(!taken.contains(&resolved.name));
        let token = resolved.name.strip_prefix("Al_").unwrap();
        assert_eq!(token.len(), 4);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_random_token_collision_still_terminates_with_free_name() {
        let mut taken = roster(&["Al"]);
        taken.extend((1..=MAX_SUFFIX_ATTEMPTS).map(|i| format!("Al_{i}")));

        // Occupy whatever token this seed is about to produce.
        let token: u16 = StdRng::seed_from_u64(42).random();
        taken.push(format!("Al_{token:04x}"));

        let mut rng = StdRng::seed_from_u64(42);
        let resolved = resolve_name_with("Al", &taken, &mut rng);

        assert!(resolved.changed);
        assert!(!taken.contains(&resolved.name));
        assert_eq!(resolved.name, "Al_101");
    }

    #[test]
    fn test_never_returns_a_taken_name_for_small_rosters() {
        let mut taken = Vec::new();
        for _ in 0..99 {
            let resolved = resolve_name("P", &taken);
            assert!(!taken.contains(&resolved.name));
            assert_eq!(resolved.changed, !taken.is_empty());
            taken.push(resolved.name);
        }
    }
}
