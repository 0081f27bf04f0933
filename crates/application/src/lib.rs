//! Application services and ports for the Clearance access-control engine.

#![forbid(unsafe_code)]

mod audit;
mod authorization_service;
mod claims_extractor;
mod role_admin_service;
mod session_service;

pub use audit::{AuditEvent, AuditRepository};
pub use authorization_service::{
    AccessDecision, AuthorizationConfig, AuthorizationService, GuardMode, RoleRepository, Subject,
    union_permissions,
};
pub use claims_extractor::ClaimsExtractor;
pub use role_admin_service::{
    CreateRoleInput, RoleAdminRepository, RoleAdminService, UpdateRoleInput,
};
pub use session_service::{Session, SessionConfig, SessionService, UserRepository};
