//! Provider Constants
//!
//! Constants specific to provider implementations. Domain constants live in
//! concord-domain.

// ============================================================================
// MEMORY KEY STORE CONSTANTS
// ============================================================================

/// Operations between two sweeps of expired entries
pub const MEMORY_SWEEP_EVERY: u64 = 1_024;

// ============================================================================
// REDIS KEY STORE CONSTANTS
// ============================================================================

/// Connection URL used when none is configured
pub const REDIS_DEFAULT_URL: &str = "redis://127.0.0.1:6379";

/// Per-command timeout when none is configured (milliseconds)
pub const REDIS_DEFAULT_TIMEOUT_MS: u64 = 2_000;

/// Delete `KEYS[1]` only if it holds `ARGV[1]`
pub const LUA_COMPARE_AND_DELETE: &str = r"
if redis.call('get', KEYS[1]) == ARGV[1] then
    return redis.call('del', KEYS[1])
else
    return 0
end
";

/// Set the TTL of `KEYS[1]` to `ARGV[2]` ms only if it holds `ARGV[1]`
pub const LUA_COMPARE_AND_EXTEND: &str = r"
if redis.call('get', KEYS[1]) == ARGV[1] then
    return redis.call('pexpire', KEYS[1], ARGV[2])
else
    return 0
end
";

/// Increment `KEYS[1]`; the first increment sets a TTL of `ARGV[1]` ms
pub const LUA_INCREMENT_WITH_EXPIRY: &str = r"
local count = redis.call('incr', KEYS[1])
if count == 1 then
    redis.call('pexpire', KEYS[1], ARGV[1])
end
return count
";

/// Join the read-write lock `KEYS[1]` in mode `ARGV[1]` as member `ARGV[2]`,
/// keeping the key alive for at least `ARGV[3]` ms
pub const LUA_ACQUIRE_MODE: &str = r"
if redis.call('exists', KEYS[1]) == 0 then
    redis.call('hset', KEYS[1], 'mode', ARGV[1], ARGV[2], 1)
    redis.call('pexpire', KEYS[1], ARGV[3])
    return 1
end
if redis.call('type', KEYS[1]).ok ~= 'hash' then
    return 0
end
if ARGV[1] == 'read' and redis.call('hget', KEYS[1], 'mode') == 'read' then
    redis.call('hset', KEYS[1], ARGV[2], 1)
    if redis.call('pttl', KEYS[1]) < tonumber(ARGV[3]) then
        redis.call('pexpire', KEYS[1], ARGV[3])
    end
    return 1
end
return 0
";

/// Remove member `ARGV[1]` from `KEYS[1]`; the last member deletes the key
pub const LUA_RELEASE_MEMBER: &str = r"
if redis.call('type', KEYS[1]).ok ~= 'hash' then
    return 0
end
if redis.call('hdel', KEYS[1], ARGV[1]) == 0 then
    return 0
end
if redis.call('hlen', KEYS[1]) <= 1 then
    redis.call('del', KEYS[1])
end
return 1
";

/// Keep `KEYS[1]` alive for at least `ARGV[2]` ms if `ARGV[1]` is a member
pub const LUA_EXTEND_MEMBER: &str = r"
if redis.call('type', KEYS[1]).ok ~= 'hash' then
    return 0
end
if redis.call('hexists', KEYS[1], ARGV[1]) == 0 then
    return 0
end
if redis.call('pttl', KEYS[1]) < tonumber(ARGV[2]) then
    redis.call('pexpire', KEYS[1], ARGV[2])
end
return 1
";
