/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated modules.
/// Access control is applied explicitly at the module level (via Axum layers):
/// every mutating route passes the CSRF origin check first, and the admin
/// routes additionally require a verified session. This ordering is part of
/// the contract — a cross-site request is rejected with 403 before any
/// cookie is inspected.

/// Routes accessible to all clients (anonymous, read-only).
pub mod public;

/// Session endpoints (login/logout/session probe) and the admin-gated
/// content-management routes.
pub mod admin;
