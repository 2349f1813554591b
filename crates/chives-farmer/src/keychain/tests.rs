use crate::keychain::{FileKeychain, Keychain, KeychainError, MasterKey};
use tempfile::TempDir;

#[test]
fn derivation_is_deterministic() {
    let master_key = MasterKey::from_entropy(&[1; 32]).unwrap();
    let same_master_key = MasterKey::from_entropy(&[1; 32]).unwrap();
    let other_master_key = MasterKey::from_entropy(&[2; 32]).unwrap();

    assert_eq!(
        master_key.farmer_public_key(),
        same_master_key.farmer_public_key()
    );
    assert_eq!(
        master_key.wallet_puzzle_hash(7),
        same_master_key.wallet_puzzle_hash(7)
    );
    assert_ne!(
        master_key.farmer_public_key(),
        other_master_key.farmer_public_key()
    );
}

#[test]
fn derived_keys_are_distinct() {
    let master_key = MasterKey::from_entropy(&[1; 32]).unwrap();

    assert_ne!(
        master_key.farmer_keypair().public,
        master_key.pool_keypair().public
    );
    assert_ne!(
        master_key.wallet_puzzle_hash(0),
        master_key.wallet_puzzle_hash(1)
    );
}

#[test]
fn invalid_entropy_length() {
    assert!(matches!(
        MasterKey::from_entropy(&[1; 16]),
        Err(KeychainError::InvalidEntropyLength(16))
    ));
}

#[test]
fn file_keychain_persists_keys() {
    let directory = TempDir::new().unwrap();

    let mut keychain = FileKeychain::open(directory.path()).unwrap();
    assert!(keychain.master_keys().is_empty());

    let first = keychain.generate_key().unwrap();
    let second = keychain.generate_key().unwrap();

    let reopened = FileKeychain::open(directory.path()).unwrap();
    let master_keys = reopened.master_keys();
    assert_eq!(master_keys.len(), 2);
    assert_eq!(master_keys[0].entropy(), first.entropy());
    assert_eq!(master_keys[1].entropy(), second.entropy());
    assert!(!directory.path().join("keys.bin.tmp").exists());
}
