//! Integration tests for the vault session state machine and key escrow.

use std::fs;
use std::sync::Arc;
use std::thread;

use absconditus::config::Settings;
use absconditus::crypto::DerivedKey;
use absconditus::errors::{Result, VaultError};
use absconditus::escrow::{FileEscrow, KeyEscrow, KeyProtector, NoEscrow};
use absconditus::gateway::AccessGateway;
use absconditus::session::{VaultSession, VaultStatus};
use tempfile::TempDir;
use zeroize::Zeroizing;

/// Stand-in for the OS primitive: XOR with a fixed pad.  Enough to prove
/// the file holds something other than the raw key.
#[derive(Debug)]
struct PadProtector;

const PAD: u8 = 0xA5;

impl KeyProtector for PadProtector {
    fn protect(&self, secret: &[u8]) -> Result<Vec<u8>> {
        Ok(secret.iter().map(|b| b ^ PAD).collect())
    }

    fn unprotect(&self, sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new(sealed.iter().map(|b| b ^ PAD).collect()))
    }
}

fn escrow_for(settings: &Settings) -> Box<dyn KeyEscrow> {
    Box::new(FileEscrow::new(settings.escrow_path(), PadProtector))
}

fn open(dir: &TempDir) -> (Settings, Arc<VaultSession>) {
    let settings = Settings::for_data_dir(dir.path());
    let session = VaultSession::with_escrow(&settings, escrow_for(&settings)).unwrap();
    (settings, Arc::new(session))
}

fn bearer(session: &VaultSession) -> String {
    format!("Bearer {}", session.request_token().unwrap().as_str())
}

// ---------------------------------------------------------------------------
// Unlock / lock
// ---------------------------------------------------------------------------

#[test]
fn first_unlock_accepts_any_password_and_issues_token() {
    let dir = TempDir::new().unwrap();
    let (_settings, session) = open(&dir);

    assert!(matches!(session.request_token(), Err(VaultError::VaultLocked)));

    session.unlock("first password").unwrap();

    assert_eq!(session.status(), VaultStatus::Unlocked);
    assert!(session.request_token().is_ok());
}

#[test]
fn correct_password_unlocks_existing_store_with_fresh_token() {
    let dir = TempDir::new().unwrap();
    let (_settings, session) = open(&dir);
    let gateway = AccessGateway::new(Arc::clone(&session));

    session.unlock("master").unwrap();
    let first = bearer(&session);
    gateway
        .upsert_record(Some(first.as_str()), "site", "s3cr3t")
        .unwrap();

    session.lock().unwrap();
    session.unlock("master").unwrap();
    let second = bearer(&session);

    assert_ne!(first, second, "unlock must rotate the token");
    let records = gateway.all_records(Some(second.as_str())).unwrap();
    assert_eq!(records.get("site").map(String::as_str), Some("s3cr3t"));
}

#[test]
fn wrong_password_leaves_session_locked() {
    let dir = TempDir::new().unwrap();
    let (_settings, session) = open(&dir);
    let gateway = AccessGateway::new(Arc::clone(&session));

    session.unlock("right").unwrap();
    let auth = bearer(&session);
    gateway.upsert_record(Some(auth.as_str()), "a", "b").unwrap();
    session.lock().unwrap();

    let err = session.unlock("wrong").unwrap_err();
    assert!(matches!(err, VaultError::DecryptionFailed));
    assert_eq!(session.status(), VaultStatus::Locked);
    assert!(matches!(session.request_token(), Err(VaultError::VaultLocked)));
}

#[test]
fn failed_unlock_while_unlocked_drops_the_old_token() {
    let dir = TempDir::new().unwrap();
    let (_settings, session) = open(&dir);
    let gateway = AccessGateway::new(Arc::clone(&session));

    session.unlock("right").unwrap();
    let auth = bearer(&session);
    gateway.upsert_record(Some(auth.as_str()), "a", "b").unwrap();

    assert!(session.unlock("wrong").is_err());

    assert_eq!(session.status(), VaultStatus::Locked);
    assert!(matches!(
        gateway.all_records(Some(auth.as_str())),
        Err(VaultError::VaultLocked)
    ));
}

#[test]
fn token_is_rejected_after_lock() {
    let dir = TempDir::new().unwrap();
    let (_settings, session) = open(&dir);
    let gateway = AccessGateway::new(Arc::clone(&session));

    session.unlock("pw").unwrap();
    let stale = bearer(&session);
    session.lock().unwrap();

    assert!(matches!(
        gateway.all_records(Some(stale.as_str())),
        Err(VaultError::VaultLocked)
    ));
    assert!(gateway
        .upsert_record(Some(stale.as_str()), "x", "y")
        .is_err());

    // Still rejected once a new session has started.
    session.unlock("pw").unwrap();
    assert!(matches!(
        gateway.all_records(Some(stale.as_str())),
        Err(VaultError::Unauthorized)
    ));
}

#[test]
fn restart_never_carries_a_token_over() {
    let dir = TempDir::new().unwrap();
    let settings = Settings::for_data_dir(dir.path());

    let before = VaultSession::with_escrow(&settings, Box::new(NoEscrow)).unwrap();
    before.unlock("pw").unwrap();
    drop(before);

    let after = VaultSession::with_escrow(&settings, Box::new(NoEscrow)).unwrap();
    assert_eq!(after.status(), VaultStatus::Locked);
    assert!(!after.auto_unlock_on_startup());
}

// ---------------------------------------------------------------------------
// Escrow and auto-unlock
// ---------------------------------------------------------------------------

#[test]
fn escrow_roundtrip_and_discard() {
    let dir = TempDir::new().unwrap();
    let settings = Settings::for_data_dir(dir.path());
    let escrow = FileEscrow::new(settings.escrow_path(), PadProtector);
    let key = DerivedKey::from_array([0x3Cu8; 32]);

    escrow.escrow(&key).unwrap();
    let on_disk = fs::read(settings.escrow_path()).unwrap();
    assert_ne!(on_disk.as_slice(), key.as_bytes().as_slice());
    assert_eq!(escrow.recover(), Some(key));

    escrow.discard().unwrap();
    assert!(escrow.recover().is_none());
    escrow.discard().unwrap();
}

#[test]
fn unlock_escrows_and_lock_discards() {
    let dir = TempDir::new().unwrap();
    let (settings, session) = open(&dir);

    session.unlock("pw").unwrap();
    assert!(settings.escrow_path().exists());

    session.lock().unwrap();
    assert!(!settings.escrow_path().exists());
}

#[test]
fn restart_auto_unlocks_from_escrow() {
    let dir = TempDir::new().unwrap();
    let (settings, session) = open(&dir);
    let gateway = AccessGateway::new(Arc::clone(&session));

    session.unlock("pw").unwrap();
    let auth = bearer(&session);
    gateway
        .upsert_record(Some(auth.as_str()), "site", "secret")
        .unwrap();
    drop(gateway);
    drop(session);

    let restarted = Arc::new(VaultSession::with_escrow(&settings, escrow_for(&settings)).unwrap());
    assert_eq!(restarted.status(), VaultStatus::Locked);
    assert!(restarted.auto_unlock_on_startup());
    assert_eq!(restarted.status(), VaultStatus::Unlocked);

    let fresh = bearer(&restarted);
    assert_ne!(fresh, auth);
    let records = AccessGateway::new(Arc::clone(&restarted))
        .all_records(Some(fresh.as_str()))
        .unwrap();
    assert_eq!(records.get("site").map(String::as_str), Some("secret"));
}

#[test]
fn no_escrow_file_stays_locked() {
    let dir = TempDir::new().unwrap();
    let (settings, session) = open(&dir);

    assert!(!settings.escrow_path().exists());
    assert!(!session.auto_unlock_on_startup());
    assert_eq!(session.status(), VaultStatus::Locked);
}

#[test]
fn stale_escrowed_key_is_discarded() {
    let dir = TempDir::new().unwrap();
    let (settings, session) = open(&dir);
    let gateway = AccessGateway::new(Arc::clone(&session));

    session.unlock("pw").unwrap();
    let auth = bearer(&session);
    gateway.upsert_record(Some(auth.as_str()), "a", "b").unwrap();
    drop(gateway);
    drop(session);

    // Replace the escrowed key with one that does not open the vault.
    let escrow = FileEscrow::new(settings.escrow_path(), PadProtector);
    escrow.escrow(&DerivedKey::from_array([0u8; 32])).unwrap();

    let restarted = VaultSession::with_escrow(&settings, escrow_for(&settings)).unwrap();
    assert!(!restarted.auto_unlock_on_startup());
    assert_eq!(restarted.status(), VaultStatus::Locked);
    assert!(!settings.escrow_path().exists());
}

#[test]
fn corrupt_escrow_file_stays_locked() {
    let dir = TempDir::new().unwrap();
    let (settings, session) = open(&dir);
    fs::write(settings.escrow_path(), b"garbage").unwrap();

    assert!(!session.auto_unlock_on_startup());
    assert_eq!(session.status(), VaultStatus::Locked);
}

#[test]
fn disabled_auto_unlock_uses_no_escrow() {
    let dir = TempDir::new().unwrap();
    let mut settings = Settings::for_data_dir(dir.path());
    settings.auto_unlock = false;

    let session = VaultSession::open(&settings).unwrap();
    session.unlock("pw").unwrap();

    assert!(!settings.escrow_path().exists());
}

// ---------------------------------------------------------------------------
// Concurrent transitions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Transition {
    UnlockRight,
    UnlockWrong,
    Lock,
}

/// Key, token and escrow file must always agree.
fn assert_consistent(session: &VaultSession, settings: &Settings) {
    match session.status() {
        VaultStatus::Unlocked => {
            assert!(session.request_token().is_ok());
            // The last transition was a good unlock, which escrowed the key.
            assert!(settings.escrow_path().exists());
        }
        VaultStatus::Locked => {
            assert!(matches!(session.request_token(), Err(VaultError::VaultLocked)));
        }
    }
}

#[test]
fn racing_unlocks_and_locks_leave_a_consistent_session() {
    let dir = TempDir::new().unwrap();
    let (settings, session) = open(&dir);

    // Give the vault a blob so a wrong password is actually rejected.
    session.unlock("right").unwrap();
    let auth = bearer(&session);
    AccessGateway::new(Arc::clone(&session))
        .upsert_record(Some(auth.as_str()), "site", "secret")
        .unwrap();

    let schedules = [
        [Transition::UnlockRight, Transition::Lock, Transition::UnlockWrong],
        [Transition::UnlockWrong, Transition::UnlockRight, Transition::Lock],
        [Transition::Lock, Transition::UnlockWrong, Transition::UnlockRight],
        [Transition::UnlockRight, Transition::UnlockRight, Transition::Lock],
    ];

    for round in 0..2 {
        let handles: Vec<_> = schedules
            .iter()
            .map(|schedule| {
                let session = Arc::clone(&session);
                let schedule = *schedule;
                thread::spawn(move || {
                    for step in schedule {
                        match step {
                            Transition::UnlockRight => session.unlock("right").unwrap(),
                            Transition::UnlockWrong => {
                                assert!(matches!(
                                    session.unlock("wrong"),
                                    Err(VaultError::DecryptionFailed)
                                ));
                            }
                            Transition::Lock => session.lock().unwrap(),
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_consistent(&session, &settings);

        // Whichever thread won, a final lock always clears everything.
        session.lock().unwrap();
        assert_eq!(session.status(), VaultStatus::Locked, "round {round}");
        assert!(!settings.escrow_path().exists());
        assert_consistent(&session, &settings);

        // And a final good unlock always yields a working token.
        session.unlock("right").unwrap();
        assert_consistent(&session, &settings);
        let records = AccessGateway::new(Arc::clone(&session))
            .all_records(Some(bearer(&session).as_str()))
            .unwrap();
        assert_eq!(records.get("site").map(String::as_str), Some("secret"));
    }
}
