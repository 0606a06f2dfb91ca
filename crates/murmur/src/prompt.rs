// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Password acquisition via TTY prompt or the MURMUR_PASSWORD environment variable.

use murmur_core::MurmurError;
use secrecy::SecretString;

/// The environment variable consulted before prompting.
pub const PASSWORD_ENV_VAR: &str = "MURMUR_PASSWORD";

/// Get the new account's password.
///
/// Priority:
/// 1. `MURMUR_PASSWORD` environment variable (scripts, containers)
/// 2. Interactive TTY prompt via `rpassword`, asked twice
pub fn get_new_password() -> Result<SecretString, MurmurError> {
    if let Some(password) = password_from_env() {
        return Ok(password);
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        eprint!("Password: ");
        let first = read_password()?;
        eprint!("Confirm password: ");
        let second = read_password()?;

        if first != second {
            return Err(MurmurError::Validation("passwords do not match".to_string()));
        }
        if first.is_empty() {
            return Err(MurmurError::Validation("empty password not allowed".to_string()));
        }
        return Ok(SecretString::from(first));
    }

    Err(MurmurError::Validation(format!(
        "No password provided. Set {PASSWORD_ENV_VAR} or run interactively."
    )))
}

fn password_from_env() -> Option<SecretString> {
    std::env::var(PASSWORD_ENV_VAR)
        .ok()
        .filter(|p| !p.is_empty())
        .map(SecretString::from)
}

fn read_password() -> Result<String, MurmurError> {
    rpassword::read_password()
        .map_err(|e| MurmurError::Validation(format!("failed to read password: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;

    #[test]
    #[serial]
    fn env_password_wins() {
        // SAFETY: serialized with every other test touching this variable.
        unsafe { std::env::set_var(PASSWORD_ENV_VAR, "from-the-env") };
        let password = get_new_password().unwrap();
        assert_eq!(password.expose_secret(), "from-the-env");
        unsafe { std::env::remove_var(PASSWORD_ENV_VAR) };
    }

    #[test]
    #[serial]
    fn empty_env_password_is_ignored() {
        // SAFETY: serialized with every other test touching this variable.
        unsafe { std::env::set_var(PASSWORD_ENV_VAR, "") };
        assert!(password_from_env().is_none());
        unsafe { std::env::remove_var(PASSWORD_ENV_VAR) };
    }
}
