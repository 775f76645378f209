use bff_slo::{errors, Result};

use super::KeySet;

const PEM_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const PEM_END: &str = "-----END CERTIFICATE-----";

/// Wraps the first certificate of the first record named `kid` in PEM
/// delimiters. Later records sharing the identifier are ignored.
pub fn resolve_certificate(keys: &KeySet, kid: &str) -> Result<String> {
    let cert = keys
        .find(kid)
        .and_then(|record| record.x5c.first())
        .ok_or_else(|| errors::key_not_found(kid))?;
    Ok(format!("{PEM_BEGIN}\n{cert}\n{PEM_END}"))
}
