//! Correlation id generation.

use uuid::Uuid;

use crate::ids::CorrelationId;

/// Produces a fresh correlation id on demand.
///
/// Implementations must return an effectively unique id on every call. There
/// is no fallible variant: a generator that cannot produce ids is a
/// configuration problem and should be rejected before the server starts.
pub trait IdGenerator: Send + Sync {
    /// Generate a new id.
    fn generate(&self) -> CorrelationId;
}

/// Default generator: random (v4) UUIDs in canonical hyphenated form.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> CorrelationId {
        CorrelationId::from_uuid(Uuid::new_v4())
    }
}

impl<F> IdGenerator for F
where
    F: Fn() -> CorrelationId + Send + Sync,
{
    fn generate(&self) -> CorrelationId {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn uuid_generator_produces_unique_ids() {
        let generator = UuidGenerator;
        let ids: HashSet<_> = (0..1000).map(|_| generator.generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn uuid_generator_format() {
        let id = UuidGenerator.generate();
        let parsed = Uuid::parse_str(id.as_str()).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn closures_are_generators() {
        let generator = || CorrelationId::new("fixed").unwrap();
        assert_eq!(generator.generate(), "fixed");
    }
}
