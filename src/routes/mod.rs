/// Router Module Index
///
/// Routes are grouped by the privilege they demand. The check itself happens in the
/// service layer on every call, so each group is a plain router with no auth layer.

/// Unauthenticated routes: health and the two login endpoints, plus logout.
pub mod public;

/// Account management, restricted to the superadmin.
pub mod accounts;

/// The seven taxonomy levels, restricted to admins.
pub mod taxonomy;
