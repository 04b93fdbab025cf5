use anyhow::Result;
use tracing::info;

use rollcall_types::models::{AccountStatus, Role, User};

use crate::password::{hash_password, is_hashed};
use crate::{Dataset, Store};

/// Start-up upgrades applied to whatever the data directory holds.
pub fn run(store: &Store) -> Result<()> {
    let upgraded = store.write(upgrade_credentials)?;
    if upgraded > 0 {
        info!("Re-hashed {} plaintext passwords", upgraded);
    }

    info!("Data migrations complete");
    Ok(())
}

/// Replace plaintext passwords with argon2 hashes.
///
/// Blank passwords are left blank; they never verify, so those accounts
/// stay locked until an admin resets them.
pub fn upgrade_credentials(data: &mut Dataset) -> Result<usize> {
    let legacy: Vec<usize> = data
        .users
        .iter()
        .enumerate()
        .filter(|(_, u)| !u.password.is_empty() && !is_hashed(&u.password))
        .map(|(i, _)| i)
        .collect();

    if legacy.is_empty() {
        return Ok(0);
    }

    let users = data.users_mut();
    for &i in &legacy {
        users[i].password = hash_password(&users[i].password)?;
    }

    Ok(legacy.len())
}

/// Bootstrap admin account taken from configuration.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
    pub name: String,
}

/// Create the configured admin unless the username already exists.
pub fn seed_admin(store: &Store, seed: &AdminSeed) -> Result<bool> {
    let created = store.write(|data| {
        if data.user_by_username(&seed.username).is_some() {
            return Ok::<_, anyhow::Error>(false);
        }

        let admin = User {
            id: data.next_user_id(),
            student_id: None,
            name: seed.name.clone(),
            username: seed.username.clone(),
            email: None,
            password: hash_password(&seed.password)?,
            role: Role::Admin,
            status: AccountStatus::Verified,
            position: Some("Administrator".into()),
        };
        data.users_mut().push(admin);
        Ok(true)
    })?;

    if created {
        info!("Seeded admin account '{}'", seed.username);
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::USERS_FILE;
    use crate::password::verify_password;
    use tempfile::tempdir;

    const LEGACY_USERS: &str = r#"[
  {"id":1,"name":"Grace Admin","username":"admin","password":"admin123","role":"admin","status":"verified","position":"Adviser"},
  {"id":2,"name":"Juan Dela Cruz","username":"juan","email":"juan@example.edu","password":"pass1234","role":"student","status":"pending","studentId":"2023-002"},
  {"id":3,"name":"No Password","username":"ghost","role":"student","status":"pending","studentId":"2023-003"}
]"#;

    #[test]
    fn test_plaintext_passwords_are_upgraded() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(USERS_FILE), LEGACY_USERS).unwrap();

        let store = Store::open(dir.path()).unwrap();
        let users = store.read(|d| d.users().to_vec()).unwrap();

        assert!(is_hashed(&users[0].password));
        assert!(verify_password("admin123", &users[0].password));
        assert!(verify_password("pass1234", &users[1].password));
        assert_eq!(users[2].password, "");

        let raw = std::fs::read_to_string(dir.path().join(USERS_FILE)).unwrap();
        assert!(!raw.contains("pass1234"));
    }

    #[test]
    fn test_upgrade_is_a_no_op_when_hashed() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(USERS_FILE), LEGACY_USERS).unwrap();
        Store::open(dir.path()).unwrap();
        let first = std::fs::read_to_string(dir.path().join(USERS_FILE)).unwrap();

        Store::open(dir.path()).unwrap();
        let second = std::fs::read_to_string(dir.path().join(USERS_FILE)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_seed_admin_once() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let seed = AdminSeed {
            username: "root".into(),
            password: "s3cret-pass".into(),
            name: "Registrar".into(),
        };

        assert!(seed_admin(&store, &seed).unwrap());
        assert!(!seed_admin(&store, &seed).unwrap());

        let admins = store
            .read(|d| d.users().iter().filter(|u| u.role == Role::Admin).count())
            .unwrap();
        assert_eq!(admins, 1);
    }
}
