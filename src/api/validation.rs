use crate::api::errors::ApiError;

pub(crate) const MIN_PASSWORD_LEN: usize = 8;
const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 50;

pub(crate) fn validate_username(username: &str) -> Result<(), ApiError> {
    let length = username.chars().count();
    let valid = (MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&length)
        && username.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "Username must be {MIN_USERNAME_LEN}-{MAX_USERNAME_LEN} characters of letters, digits, '.', '_' or '-'"
        )))
    }
}

pub(crate) fn validate_password_len(password: &str) -> Result<(), ApiError> {
    if password.chars().count() >= MIN_PASSWORD_LEN {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_allow_npm_and_dotted_names() {
        assert!(validate_username("2010631170001").is_ok());
        assert!(validate_username("siti.aminah").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(validate_password_len("1234567").is_err());
        assert!(validate_password_len("12345678").is_ok());
    }
}
