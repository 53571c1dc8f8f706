//! Decoding of a stashed Basic-auth credential into an NTLM identity
//!
//! Clients that cannot speak NTLM answer the proxy's Basic challenge with
//! `base64(user:password)`, optionally writing the user as `DOMAIN\user`.

use crate::auth::identity::AuthIdentity;
use crate::error::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use zeroize::Zeroizing;

/// Decode a base64 Basic credential into an identity.
///
/// The user/password split happens at the first `:`. A `DOMAIN\user` prefix is
/// honoured when the backslash is neither the first nor the last character of
/// the user name; otherwise `default_domain` is used.
pub fn decode_basic(encoded: &str, default_domain: &str) -> Result<AuthIdentity> {
    let raw = Zeroizing::new(
        STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::BasicCredentialError(format!("invalid base64: {}", e)))?,
    );
    let text = std::str::from_utf8(&raw)
        .map_err(|e| Error::BasicCredentialError(format!("invalid UTF-8: {}", e)))?;

    let (user, password) = text
        .split_once(':')
        .ok_or_else(|| Error::BasicCredentialError("missing ':' separator".into()))?;

    let (domain, user) = split_domain_user(user, default_domain);
    Ok(AuthIdentity::new(domain, user, password))
}

fn split_domain_user<'a>(user: &'a str, default_domain: &'a str) -> (&'a str, &'a str) {
    match user.find('\\') {
        Some(separator) if separator > 0 && separator < user.len() - 1 => {
            (&user[..separator], &user[separator + 1..])
        }
        _ => (default_domain, user),
    }
}
