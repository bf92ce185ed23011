//! Administrator authentication

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::{info, instrument, warn};

use crate::error::{Error, Result};
use crate::models::Admin;
use crate::storage::AdminRepository;

const MIN_PASSWORD_LEN: usize = 6;

pub fn hash_password(password: &str) -> Result<String> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(Error::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| Error::Validation(format!("failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Check credentials. Unknown email and wrong password fail the same way.
#[instrument(skip(repo, password))]
pub fn sign_in<R>(repo: &R, email: &str, password: &str) -> Result<Admin>
where
    R: AdminRepository + ?Sized,
{
    let Some(admin) = repo.find_admin_by_email(email)? else {
        warn!("Sign-in rejected");
        return Err(Error::InvalidCredentials);
    };
    if !verify_password(password, &admin.password_hash) {
        warn!("Sign-in rejected");
        return Err(Error::InvalidCredentials);
    }

    repo.update_admin_last_login(admin.id)?;
    info!(admin_id = %admin.id, "Administrator signed in");
    Ok(admin)
}

/// Create an administrator account
pub fn register_admin<R>(repo: &R, email: &str, password: &str) -> Result<Admin>
where
    R: AdminRepository + ?Sized,
{
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(Error::Validation("a valid email is required".into()));
    }
    if repo.find_admin_by_email(email)?.is_some() {
        return Err(Error::Validation(format!("{} is already registered", email)));
    }
    let admin = Admin::new(email.to_string(), hash_password(password)?);
    repo.create_admin(&admin)?;
    Ok(admin)
}

/// Create the first administrator when none exists yet
pub fn bootstrap_admin<R>(repo: &R, email: &str, password: &str) -> Result<Option<Admin>>
where
    R: AdminRepository + ?Sized,
{
    if repo.count_admins()? > 0 {
        return Ok(None);
    }
    let admin = register_admin(repo, email, password)?;
    info!(email = %admin.email, "Bootstrap administrator created");
    Ok(Some(admin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    #[test]
    fn test_sign_in() {
        let db = Database::open_in_memory().unwrap();
        register_admin(&db, "Admin@Colegio.cl", "secreto123").unwrap();

        let admin = sign_in(&db, "admin@colegio.cl", "secreto123").unwrap();
        assert_eq!(admin.email, "admin@colegio.cl");
        assert!(db
            .find_admin_by_email("admin@colegio.cl")
            .unwrap()
            .unwrap()
            .last_login
            .is_some());
    }

    #[test]
    fn test_failures_are_indistinguishable() {
        let db = Database::open_in_memory().unwrap();
        register_admin(&db, "admin@colegio.cl", "secreto123").unwrap();

        let wrong_password = sign_in(&db, "admin@colegio.cl", "otra-clave");
        let unknown_email = sign_in(&db, "nadie@colegio.cl", "secreto123");
        assert!(matches!(wrong_password, Err(Error::InvalidCredentials)));
        assert!(matches!(unknown_email, Err(Error::InvalidCredentials)));
    }

    #[test]
    fn test_bootstrap_only_once() {
        let db = Database::open_in_memory().unwrap();
        assert!(bootstrap_admin(&db, "admin@colegio.cl", "secreto123").unwrap().is_some());
        assert!(bootstrap_admin(&db, "otro@colegio.cl", "secreto123").unwrap().is_none());
        assert_eq!(db.count_admins().unwrap(), 1);
    }

    #[test]
    fn test_short_password_rejected() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            register_admin(&db, "admin@colegio.cl", "123"),
            Err(Error::Validation(_))
        ));
    }
}
