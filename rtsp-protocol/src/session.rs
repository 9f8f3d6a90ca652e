use std::fmt;
use std::str::FromStr;

use super::Error;

/// Value of a `Session` header: `session-id [";" parameter]*`.
///
/// Only the `timeout` parameter is understood. Other parameters are dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionHeader {
    id: String,
    timeout: Option<u64>,
}

impl SessionHeader {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub const fn timeout(&self) -> Option<u64> {
        self.timeout
    }

    pub fn into_id(self) -> String {
        self.id
    }
}

impl fmt::Display for SessionHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.id)?;
        if let Some(timeout) = self.timeout {
            write!(f, ";timeout={timeout}")?;
        }
        Ok(())
    }
}

impl FromStr for SessionHeader {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(';');
        let id = parts.next().unwrap_or_default().trim();
        if id.is_empty() {
            return Err(Error::SessionMalformed {
                value: s.to_string(),
            });
        }

        let mut timeout = None;
        for parameter in parts {
            if let Some((var, val)) = parameter.split_once('=') {
                if var.trim().eq_ignore_ascii_case("timeout") {
                    timeout = Some(val.trim().parse().map_err(|_| Error::SessionMalformed {
                        value: s.to_string(),
                    })?);
                }
            }
        }

        Ok(Self {
            id: id.to_string(),
            timeout,
        })
    }
}
