//! Credential helper for operators seeding accounts by hand

use crate::config::Config;
use crate::services::CredentialHasher;

pub fn cmd_hash_password(config: &Config, password: &str) -> anyhow::Result<()> {
    if password.chars().count() < config.auth.min_password_length {
        anyhow::bail!(
            "Password must be at least {} characters",
            config.auth.min_password_length
        );
    }

    let hasher = CredentialHasher::new(config.auth.pbkdf2_iterations);
    println!("{}", hasher.hash(password));
    Ok(())
}
