pub mod block;
pub mod init;
pub mod journal;
pub mod owner;
pub mod project;

use anyhow::{anyhow, bail, Result};

use tessera_core::Identity;

/// Resolve the acting identity from `--as` / `$TESSERA_IDENTITY`.
///
/// The empty identity is reserved, so blank values are rejected here before
/// anything reaches the registry.
pub fn require_caller(identity: Option<String>) -> Result<Identity> {
    let Some(caller) = identity.as_deref().and_then(normalize) else {
        bail!("no caller identity; pass --as <IDENTITY> or set TESSERA_IDENTITY");
    };
    tracing::debug!(caller = %caller, "resolved caller identity");
    Ok(caller)
}

/// Normalise an identity given as an argument the same way as the caller.
pub fn parse_identity(raw: &str) -> Result<Identity> {
    normalize(raw).ok_or_else(|| anyhow!("identity must not be blank"))
}

fn normalize(raw: &str) -> Option<Identity> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| Identity::from(trimmed))
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn status_label(active: bool) -> &'static str {
    if active {
        "active"
    } else {
        "inactive"
    }
}
