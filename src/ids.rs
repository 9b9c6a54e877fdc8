use std::sync::atomic::{AtomicI64, Ordering};

use crate::model::EntityId;

/// Surrogate-key source for one entity kind.
///
/// Strictly increasing; two concurrent callers never observe the same id.
/// Stores construct one generator per kind, starting past their seed rows,
/// so isolated store instances hand out ids independently.
#[derive(Debug)]
pub struct SequenceGenerator {
    next: AtomicI64,
}

impl SequenceGenerator {
    pub fn starting_at(first: EntityId) -> Self {
        Self {
            next: AtomicI64::new(first),
        }
    }

    pub fn next_id(&self) -> EntityId {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_ids_increase_from_start() {
        let generator = SequenceGenerator::starting_at(7);

        assert_eq!(generator.next_id(), 7);
        assert_eq!(generator.next_id(), 8);
        assert_eq!(generator.next_id(), 9);
    }

    #[test]
    fn test_concurrent_callers_never_share_an_id() {
        let generator = Arc::new(SequenceGenerator::starting_at(1));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let generator = Arc::clone(&generator);
                std::thread::spawn(move || {
                    (0..200).map(|_| generator.next_id()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "id {} handed out twice", id);
            }
        }
        assert_eq!(seen.len(), 8 * 200);
    }
}
