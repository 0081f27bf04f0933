//! Domain types and pure logic for the Clearance access-control engine.

#![forbid(unsafe_code)]

mod access;
mod audit;
mod claims;
mod matrix;
mod permission;
mod role;
mod user;

pub use access::{AccessLevel, FeatureAccess, ResolvedPermission, map_to_features};
pub use audit::AuditAction;
pub use claims::Claims;
pub use matrix::{
    ColumnState, MatrixValidation, PermissionMatrix, ResourceSelection, SelectedAction,
};
pub use permission::{Action, Permission, PermissionId};
pub use role::{Role, RoleId};
pub use user::{Department, DepartmentId, EmailAddress, User, UserId, UserStatus};
