//! Identifier generation for content items and preview images.

use rand::Rng;
use web_time::{SystemTime, UNIX_EPOCH};

use crate::types::ItemId;

const SUFFIX_LEN: usize = 9;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Produce a fresh identifier of the form `item-<unix-millis>-<base36 suffix>`.
///
/// The random suffix carries the uniqueness; the timestamp only makes ids
/// roughly sortable when eyeballing logs.
pub fn next_id() -> ItemId {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();

    let mut rng = rand::rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();

    ItemId::from(format!("item-{millis}-{suffix}"))
}

/// Source of identifiers.
///
/// Implemented for any `FnMut() -> ItemId`, so tests can hand in a counter
/// closure where deterministic ids are wanted.
pub trait IdSource {
    fn next_id(&mut self) -> ItemId;
}

impl<F> IdSource for F
where
    F: FnMut() -> ItemId,
{
    fn next_id(&mut self) -> ItemId {
        self()
    }
}

/// The default id source, backed by [`next_id`].
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn next_id(&mut self) -> ItemId {
        next_id()
    }
}
