// =============================================================================
// ROLE CONSTANTS
// =============================================================================

/// Admin role - can create, edit and delete map locations
pub const ROLE_ADMIN: &str = "admin";

/// Super admin role - everything an admin can do
pub const ROLE_SUPER_ADMIN: &str = "super_admin";

// =============================================================================
// REALTIME EVENT NAMES
// =============================================================================

/// Liveness frame sent once when a stream opens
pub const EVENT_PING: &str = "ping";

/// Frame carrying a location create/update/delete
pub const EVENT_LOCATIONS_UPDATE: &str = "locations:update";
