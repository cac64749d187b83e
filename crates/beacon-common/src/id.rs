use parking_lot::{const_mutex, Mutex};
use snowflake::SnowflakeIdBucket;

static ID_GENERATOR: Mutex<Option<SnowflakeIdBucket>> = const_mutex(None);

/// Initialize the Snowflake id generator.
///
/// `machine_id`: machine identifier (0-31)
/// `node_id`: node identifier (0-31)
pub fn init(machine_id: i32, node_id: i32) {
    let mut gen = ID_GENERATOR.lock();
    *gen = Some(SnowflakeIdBucket::new(machine_id, node_id));
}

/// Generate a Snowflake id as a string. Falls back to machine/node `1/1`
/// when [`init`] was never called.
pub fn next_id() -> String {
    let mut gen = ID_GENERATOR.lock();
    let bucket = gen.get_or_insert_with(|| SnowflakeIdBucket::new(1, 1));
    bucket.get_id().to_string()
}

/// Generate an id carrying a short kind prefix, e.g. `alert-7186...`.
pub fn next_prefixed_id(prefix: &str) -> String {
    format!("{prefix}-{}", next_id())
}
