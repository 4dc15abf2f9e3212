/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the ftpmill authors
 */

use thiserror::Error;

const USERNAME_MAX_LENGTH: usize = u8::MAX as usize;
const PASSWORD_MAX_LENGTH: usize = u8::MAX as usize;

#[derive(Debug, Error)]
pub enum FtpUserInfoError {
    #[error("too long string")]
    TooLong,
    #[error("control character is not allowed")]
    ControlCharacter,
}

/// A username as sent in the USER command.
///
/// Control characters are rejected as they would corrupt the command line.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Username {
    inner: String,
}

impl Username {
    pub fn empty() -> Self {
        Username {
            inner: String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn from_original(s: &str) -> Result<Self, FtpUserInfoError> {
        if s.len() > USERNAME_MAX_LENGTH {
            return Err(FtpUserInfoError::TooLong);
        }
        if s.chars().any(|c| c.is_ascii_control()) {
            return Err(FtpUserInfoError::ControlCharacter);
        }
        Ok(Username {
            inner: s.to_string(),
        })
    }

    pub fn as_original(&self) -> &str {
        &self.inner
    }
}

/// A password as sent in the PASS command.
#[derive(Clone, Eq, PartialEq)]
pub struct Password {
    inner: String,
}

impl Password {
    pub fn empty() -> Self {
        Password {
            inner: String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn from_original(s: &str) -> Result<Self, FtpUserInfoError> {
        if s.len() > PASSWORD_MAX_LENGTH {
            return Err(FtpUserInfoError::TooLong);
        }
        if s.chars().any(|c| c.is_ascii_control()) {
            return Err(FtpUserInfoError::ControlCharacter);
        }
        Ok(Password {
            inner: s.to_string(),
        })
    }

    pub fn as_original(&self) -> &str {
        &self.inner
    }
}

impl std::fmt::Debug for Password {
    // never leak the password through Debug formatting
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(***)")
    }
}
