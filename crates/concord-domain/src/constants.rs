//! Domain-level constants
//!
//! Values that are part of the stored data layout (key prefixes, id format)
//! and therefore must agree across every instance sharing the store.

// ============================================================================
// RATE LIMIT KEY LAYOUT
// ============================================================================

/// Prefix of every rate-limit counter key
pub const RATE_LIMIT_KEY_PREFIX: &str = "rate_limit";

/// Separator between key segments
pub const KEY_SEPARATOR: &str = ":";

/// User agents longer than this are truncated before fingerprinting
pub const USER_AGENT_MAX_LEN: usize = 100;

/// Number of hex characters kept from the user-agent digest
pub const USER_AGENT_FINGERPRINT_LEN: usize = 16;

// ============================================================================
// REQUEST HEADERS
// ============================================================================

/// Proxy chain header; the first entry is the originating client
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Single client address header set by some reverse proxies
pub const REAL_IP_HEADER: &str = "x-real-ip";

/// User agent header
pub const USER_AGENT_HEADER: &str = "user-agent";

// ============================================================================
// LOCK DEFAULTS
// ============================================================================

/// Lower bound of the jittered acquire retry delay (milliseconds)
pub const LOCK_RETRY_MIN_MS: u64 = 20;

/// Upper bound of the jittered acquire retry delay (milliseconds)
pub const LOCK_RETRY_MAX_MS: u64 = 100;

/// Smallest heartbeat interval the renewer will schedule (milliseconds)
pub const HEARTBEAT_MIN_INTERVAL_MS: u64 = 10;

// ============================================================================
// IDENTIFIER LAYOUT
// ============================================================================

/// Sub-identifier used when the caller passes an empty one
pub const DEFAULT_ID_SUB: &str = "src";

/// Width of the sub-identifier segment
pub const ID_SUB_WIDTH: usize = 3;

/// Minimum accepted length of the port string
pub const ID_PORT_MIN_LEN: usize = 4;

/// Number of port characters embedded in an id
pub const ID_PORT_PREFIX_LEN: usize = 2;

/// Version marker appended to every id
pub const ID_VERSION_SUFFIX: char = '2';

/// Mask keeping the millisecond timestamp within 11 hex digits
pub const ID_TIMESTAMP_MASK: u64 = 0xfff_ffff_ffff;
