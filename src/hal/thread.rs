//! Cooperative scheduling hooks.

/// Hands the processor over to other activity of equal priority. Called by
/// cooperative loops after each unit of work so a saturated loop doesn't
/// starve its peers.
pub trait Yield: Send + Sync {
    fn yield_now(&self);
}
