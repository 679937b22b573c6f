//! Unit tests for fleet-core primitives.

#[cfg(test)]
mod ids {
    use crate::{JobId, NodeId, ObstacleId, TransactionId};

    #[test]
    fn index_roundtrip() {
        let id = NodeId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(NodeId::try_from(42usize).unwrap(), id);
    }

    #[test]
    fn ordering() {
        assert!(NodeId(0) < NodeId(1));
        assert!(JobId(100) > JobId(99));
    }

    #[test]
    fn invalid_sentinels_are_max() {
        assert_eq!(NodeId::INVALID.0, u32::MAX);
        assert_eq!(ObstacleId::INVALID.0, u32::MAX);
        assert_eq!(TransactionId::INVALID.0, u64::MAX);
        assert_eq!(NodeId::default(), NodeId::INVALID);
    }

    #[test]
    fn next_is_sequential() {
        assert_eq!(TransactionId(7).next(), TransactionId(8));
    }

    #[test]
    fn display() {
        assert_eq!(JobId(7).to_string(), "JobId(7)");
    }
}

#[cfg(test)]
mod config {
    use crate::{CoreError, PlannerConfig};

    #[test]
    fn default_is_valid() {
        assert_eq!(PlannerConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_tiny_buffer_polygon() {
        let cfg = PlannerConfig { buffer_segments: 2, ..PlannerConfig::default() };
        assert!(matches!(cfg.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn rejects_negative_margin() {
        let cfg = PlannerConfig { horizon_margin_secs: -1.0, ..PlannerConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_start_candidates() {
        let cfg = PlannerConfig { max_start_candidates: 0, ..PlannerConfig::default() };
        assert!(cfg.validate().is_err());
    }
}
