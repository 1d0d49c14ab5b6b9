//! Remote node identifiers.
//!
//! The service hands out ids as standard base64 of `<Kind>:<number>`, e.g.
//! `R3JvdXA6MQ==` for `Group:1`. Only group and service account ids may
//! appear in an access list.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalIdKind {
    Group,
    ServiceAccount,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unable to parse global ID {id:?}")]
pub struct GlobalIdError {
    pub id: String,
}

/// Decode `id` and report which principal kind it names.
pub fn check_global_id(id: &str) -> Result<GlobalIdKind, GlobalIdError> {
    let wrong = || GlobalIdError { id: id.to_string() };
    let decoded = STANDARD.decode(id).map_err(|_| wrong())?;
    let text = String::from_utf8_lossy(&decoded);

    let mut tokens = text.split(':');
    match (tokens.next(), tokens.next(), tokens.next()) {
        (Some("Group"), Some(_), None) => Ok(GlobalIdKind::Group),
        (Some("ServiceAccount"), Some(_), None) => Ok(GlobalIdKind::ServiceAccount),
        _ => Err(wrong()),
    }
}
