//! User registration and lookup.

use crate::environment::BookingEnvironment;
use crate::metrics;
use booking_core::{
    BookingError, Constraint, NewUser, Result, StoreError, User, UserId, UserRole,
};

const USERNAME_MIN_CHARS: usize = 3;
const USERNAME_MAX_CHARS: usize = 20;

/// Validate a registration request.
///
/// # Errors
///
/// Returns [`BookingError::InvalidInput`] if the username is outside 3-20 characters
/// or the email lacks a local part or a domain.
pub fn validate_registration(request: &NewUser) -> Result<()> {
    let username = request.username.trim();
    let chars = username.chars().count();
    if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&chars) {
        return Err(BookingError::invalid_input(
            "username",
            format!("must be {USERNAME_MIN_CHARS}-{USERNAME_MAX_CHARS} characters, got {chars}"),
        ));
    }

    let email = request.email.trim();
    let well_formed = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.is_empty()
            && !domain.contains('@')
            && domain.split('.').all(|label| !label.is_empty())
            && !email.contains(char::is_whitespace)
    });
    if !well_formed {
        return Err(BookingError::invalid_input(
            "email",
            format!("'{email}' is not a valid address"),
        ));
    }

    Ok(())
}

/// Registers and resolves users.
#[derive(Clone, Debug)]
pub struct UserRegistry {
    env: BookingEnvironment,
}

impl UserRegistry {
    /// Creates the registry
    #[must_use]
    pub const fn new(env: BookingEnvironment) -> Self {
        Self { env }
    }

    /// Register a new attendee or organizer.
    ///
    /// # Errors
    ///
    /// - [`BookingError::RoleNotPermitted`] if the requested role is Administrator
    /// - [`BookingError::InvalidInput`] if the username or email is malformed
    /// - [`BookingError::UserAlreadyExists`] if the email is taken
    /// - [`BookingError::UsernameTaken`] if the username is taken
    /// - [`BookingError::Storage`] if the store fails
    pub async fn register_user(&self, request: NewUser) -> Result<User> {
        tracing::debug!(username = %request.username, role = %request.role, "Registering user");

        if request.role == UserRole::Administrator {
            tracing::warn!(username = %request.username, "Refused self-registration as administrator");
            return Err(BookingError::RoleNotPermitted {
                role: UserRole::Administrator,
                action: "self-register",
            });
        }
        validate_registration(&request)?;

        let email = request.email.trim().to_string();
        if self.env.users.find_user_by_email(&email).await?.is_some() {
            return Err(BookingError::UserAlreadyExists(email));
        }

        let username = request.username.trim().to_string();
        let user = User::new(
            UserId::new(),
            username.clone(),
            email.clone(),
            request.role,
            self.env.clock.now(),
        );
        let user = self
            .env
            .users
            .insert_user(user)
            .await
            .map_err(|error| match error {
                StoreError::UniqueViolation {
                    constraint: Constraint::UserEmail,
                } => BookingError::UserAlreadyExists(email),
                StoreError::UniqueViolation {
                    constraint: Constraint::Username,
                } => {
                    tracing::debug!(username = %username, "Username already registered");
                    BookingError::UsernameTaken(username)
                }
                other => BookingError::Storage(other),
            })?;

        metrics::record_user_registered();
        tracing::info!(user_id = %user.id, role = %user.role, "User registered");
        Ok(user)
    }

    /// Look up a user.
    ///
    /// # Errors
    ///
    /// - [`BookingError::ActorNotFound`] if the user does not exist
    /// - [`BookingError::Storage`] if the store fails
    pub async fn find_user(&self, user_id: UserId) -> Result<User> {
        self.env
            .users
            .find_user(user_id)
            .await?
            .ok_or(BookingError::ActorNotFound(user_id))
    }

    /// Look up a user by email, ignoring ASCII case.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Storage`] if the store fails.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.env.users.find_user_by_email(email.trim()).await?)
    }

    /// All registered users.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Storage`] if the store fails.
    pub async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.env.users.list_users().await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::Harness;
    use booking_core::ErrorKind;
    use booking_testing::helpers::{attendee, organizer};

    #[tokio::test]
    async fn registers_attendees_and_organizers() {
        let h = Harness::new().await;
        let registry = UserRegistry::new(h.env.clone());

        let alice = registry.register_user(attendee("alice")).await.unwrap();
        let olga = registry.register_user(organizer("olga")).await.unwrap();

        assert_eq!(alice.role, UserRole::Attendee);
        assert_eq!(olga.role, UserRole::Organizer);
        assert_eq!(alice.registered_at, h.now());
        assert_eq!(registry.find_user(alice.id).await.unwrap(), alice);
        assert_eq!(
            registry.find_user_by_email("ALICE@example.com").await.unwrap(),
            Some(alice)
        );
        // The harness organizer plus the two above.
        assert_eq!(registry.list_users().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn administrators_cannot_self_register() {
        let h = Harness::new().await;
        let registry = UserRegistry::new(h.env.clone());

        let err = registry
            .register_user(NewUser::new("root", "root@example.com", UserRole::Administrator))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotPermitted);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let h = Harness::new().await;
        let registry = UserRegistry::new(h.env.clone());

        registry.register_user(attendee("alice")).await.unwrap();
        let err = registry
            .register_user(NewUser::new("alice2", "Alice@Example.com", UserRole::Attendee))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let h = Harness::new().await;
        let registry = UserRegistry::new(h.env.clone());

        registry
            .register_user(NewUser::new("alice", "a1@example.com", UserRole::Attendee))
            .await
            .unwrap();
        let err = registry
            .register_user(NewUser::new(" alice ", "a2@example.com", UserRole::Organizer))
            .await
            .unwrap_err();

        assert_eq!(err, BookingError::UsernameTaken("alice".to_string()));
        assert_eq!(registry.find_user_by_email("a2@example.com").await.unwrap(), None);
    }

    #[test]
    fn registration_field_rules() {
        for email in ["alice@example.com", "alice@localhost"] {
            let ok = NewUser::new("alice", email, UserRole::Attendee);
            assert!(validate_registration(&ok).is_ok(), "{email} should be accepted");
        }

        for (username, email) in [
            ("al", "al@example.com"),
            ("a_very_long_username_indeed", "long@example.com"),
            ("alice", "alice.example.com"),
            ("alice", "@example.com"),
            ("alice", "alice@"),
            ("alice", "alice@.com"),
            ("alice", "alice@example..com"),
            ("alice", "alice@a@b.com"),
            ("alice", "ali ce@example.com"),
        ] {
            let request = NewUser::new(username, email, UserRole::Attendee);
            assert!(
                validate_registration(&request).is_err(),
                "{username} / {email} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn unknown_user_is_actor_not_found() {
        let h = Harness::new().await;
        let registry = UserRegistry::new(h.env.clone());
        let missing = UserId::new();

        assert_eq!(
            registry.find_user(missing).await.unwrap_err(),
            BookingError::ActorNotFound(missing)
        );
        assert_eq!(registry.find_user_by_email("nobody@example.com").await.unwrap(), None);
    }
}
