use thiserror::Error;

use crate::models::{AccountStatus, User};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Credentials matched but the account may not sign in.
    #[error("account is {}", .status.as_str())]
    AccountRestricted { status: AccountStatus },
}

/// Case-insensitive email match, exact password match.
pub fn authenticate<'a>(users: &'a [User], email: &str, password: &str) -> Result<&'a User, AuthError> {
    let email = email.trim();
    let user = users
        .iter()
        .find(|u| u.email.eq_ignore_ascii_case(email) && u.password == password)
        .ok_or(AuthError::InvalidCredentials)?;
    if user.account_status != AccountStatus::Active {
        return Err(AuthError::AccountRestricted {
            status: user.account_status,
        });
    }
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Entity;

    #[test]
    fn seeded_admin_signs_in() {
        let users = User::defaults();
        let u = authenticate(&users, " Admin@Rising-Stars.edu ", "admin123").expect("login");
        assert_eq!(u.name, "Dr. Patricia Anderson");
    }

    #[test]
    fn wrong_password_and_unknown_email_look_the_same() {
        let users = User::defaults();
        assert_eq!(
            authenticate(&users, "admin@rising-stars.edu", "nope"),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            authenticate(&users, "ghost@rising-stars.edu", "admin123"),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid email or password"
        );
    }

    #[test]
    fn suspended_account_is_distinguished() {
        let mut users = User::defaults();
        users[0].account_status = AccountStatus::Suspended;
        let e = authenticate(&users, "john.doe@pupil.rising-stars.edu", "pupil123").unwrap_err();
        assert_eq!(
            e,
            AuthError::AccountRestricted {
                status: AccountStatus::Suspended
            }
        );
    }
}
