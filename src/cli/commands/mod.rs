mod hash_password;
mod purge;

pub use hash_password::cmd_hash_password;
pub use purge::cmd_purge;
