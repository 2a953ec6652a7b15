//! Security assessment of declared skill permissions.

mod assessor;

pub use assessor::{PermissionAssessment, RiskLevel, assess_permissions};
