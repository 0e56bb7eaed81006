//! Central storage-key namespace.
//!
//! The only place storage keys are spelled. Every key is scoped to a user
//! and a logical purpose, so components sharing one store cannot clobber
//! each other. Only [`crate::KeyPackageStore`] and
//! [`crate::EncryptionSettingsStore`] may write the encryption-related
//! keys.

use lockmark_types::UserId;

/// Per-user encryption settings (`{enabled, auto_encrypt, password_hint}`).
pub fn encryption_settings(user: &UserId) -> String {
    format!("lockmark/{user}/encryption_settings")
}

/// Per-user key package (`{salt, encrypted_validation_token}`).
pub fn key_package(user: &UserId) -> String {
    format!("lockmark/{user}/key_package")
}

/// Per-user local collection record (plain list or cipher blob).
pub fn collection(user: &UserId) -> String {
    format!("lockmark/{user}/collection")
}

/// Per-user sync statistics.
pub fn sync_stats(user: &UserId) -> String {
    format!("lockmark/{user}/sync_stats")
}

/// Per-user sync options.
pub fn sync_options(user: &UserId) -> String {
    format!("lockmark/{user}/sync_options")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_distinct_per_purpose() {
        let user = UserId::new("u1");
        let keys = [
            encryption_settings(&user),
            key_package(&user),
            collection(&user),
            sync_stats(&user),
            sync_options(&user),
        ];
        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
    }

    #[test]
    fn keys_are_distinct_per_user() {
        assert_ne!(
            collection(&UserId::new("u1")),
            collection(&UserId::new("u2"))
        );
    }
}
