//! Teammate name allocation (§9 Open Question (a)): when the caller doesn't
//! supply a name, hand out one from a short memorable pool, falling back to
//! a deterministic `agent{n}` once the pool is exhausted.

const NAME_POOL: &[&str] = &[
    "nova", "atlas", "quill", "juno", "orbit", "flux", "ember", "cobalt",
];

/// Picks the first name in `NAME_POOL` not present in `taken`, or
/// `agent{n}` for the smallest `n >= 1` not present in `taken` once the
/// whole pool is in use.
pub fn next_available_name(taken: &[String]) -> String {
    for candidate in NAME_POOL {
        if !taken.iter().any(|name| name == candidate) {
            return (*candidate).to_string();
        }
    }
    let mut n: u32 = 1;
    loop {
        let candidate = format!("agent{n}");
        if !taken.iter().any(|name| name == &candidate) {
            return candidate;
        }
        n += 1;
    }
}
