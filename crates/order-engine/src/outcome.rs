use execution_core::{PlacedOrder, Strategy};
use std::fmt;

/// What happened to the protective OCO of a placement.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtectionStatus {
    /// The strategy places no OCO.
    NotRequested,
    Placed {
        order_list_id: i64,
        legs: Vec<PlacedOrder>,
    },
    /// The entry order stands but the OCO was not placed. Not retried.
    Failed { reason: String },
}

/// Non-fatal problems with a placement that did reach the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementWarning {
    /// The exchange accepted the order but writing the record failed.
    NotPersisted { order_id: i64, error: String },
}

impl fmt::Display for PlacementWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPersisted { order_id, error } => {
                write!(f, "order {} was placed but not persisted: {}", order_id, error)
            }
        }
    }
}

/// Result of a placement that reached the exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementOutcome {
    pub strategy: Strategy,
    /// The entry order; for OCO-only strategies the take-profit leg.
    pub order: PlacedOrder,
    pub protection: ProtectionStatus,
    pub warnings: Vec<PlacementWarning>,
}

impl PlacementOutcome {
    /// Entry placed, protection requested but missing.
    pub fn is_partial(&self) -> bool {
        matches!(self.protection, ProtectionStatus::Failed { .. })
    }

    pub fn is_fully_persisted(&self) -> bool {
        self.warnings.is_empty()
    }
}
