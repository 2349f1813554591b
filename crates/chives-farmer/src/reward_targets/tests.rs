use crate::config::ConfigStore;
use crate::keychain::Keychain;
use crate::protocol::Bytes32;
use crate::reward_targets::{AddressError, RewardTargetError, RewardTargetManager, decode_address};
use crate::test_utils::{address, address_prefix, config, config_store, master_key};
use crate::utils::bech32m::{Bech32mError, encode_puzzle_hash, parse_prefix};
use bech32::Bech32m;
use std::sync::Arc;

fn keychain() -> Arc<dyn Keychain> {
    Arc::new(vec![master_key(1), master_key(2)])
}

fn short_address() -> String {
    bech32::encode::<Bech32m>(address_prefix(), &[0; 20]).unwrap()
}

#[test]
fn decode_address_checks_length() {
    let puzzle_hash = Bytes32::from([7; 32]);
    assert_eq!(
        decode_address(&address(&puzzle_hash), address_prefix()).unwrap(),
        puzzle_hash
    );

    assert!(matches!(
        decode_address(&short_address(), address_prefix()),
        Err(RewardTargetError::InvalidAddress {
            error: AddressError::WrongLength {
                expected: 32,
                actual: 20
            },
            ..
        })
    ));

    assert!(matches!(
        decode_address("not an address", address_prefix()),
        Err(RewardTargetError::InvalidAddress {
            error: AddressError::Bech32m(Bech32mError::Decoding(_)),
            ..
        })
    ));
}

#[test]
fn construction_fails_on_invalid_address() {
    let mut config = config(&Bytes32::from([1; 32]), &Bytes32::from([2; 32]));
    config.pool.xcc_target_address = "xcc1invalid".to_string();
    let (_directory, store) = config_store(&config);

    assert!(matches!(
        RewardTargetManager::new(&config, keychain(), store),
        Err(RewardTargetError::InvalidAddress { address, .. }) if address == "xcc1invalid"
    ));
}

#[test]
fn set_then_get() {
    let farmer_target = Bytes32::from([1; 32]);
    let pool_target = Bytes32::from([2; 32]);
    let config = config(&farmer_target, &pool_target);
    let (_directory, store) = config_store(&config);
    let manager = RewardTargetManager::new(&config, keychain(), store.clone()).unwrap();

    let info = manager.reward_targets(false);
    assert_eq!(info.farmer_target, address(&farmer_target));
    assert_eq!(info.pool_target, address(&pool_target));
    assert_eq!(info.have_farmer_sk, None);
    assert_eq!(info.have_pool_sk, None);
    assert_eq!(manager.pool_reward_target(), pool_target);

    let new_pool_target = Bytes32::from([3; 32]);
    manager
        .set_reward_targets(None, Some(&address(&new_pool_target)))
        .unwrap();

    assert_eq!(manager.farmer_target(), farmer_target);
    assert_eq!(manager.pool_target(), new_pool_target);
    assert_eq!(
        manager.reward_targets(false).pool_target,
        address(&new_pool_target)
    );

    let persisted = store.load().unwrap();
    assert_eq!(persisted.farmer.xcc_target_address, address(&farmer_target));
    assert_eq!(persisted.pool.xcc_target_address, address(&new_pool_target));
}

#[test]
fn invalid_address_changes_nothing() {
    let farmer_target = Bytes32::from([1; 32]);
    let pool_target = Bytes32::from([2; 32]);
    let config = config(&farmer_target, &pool_target);
    let (_directory, store) = config_store(&config);
    let manager = RewardTargetManager::new(&config, keychain(), store.clone()).unwrap();
    let before = manager.targets();

    let result = manager.set_reward_targets(
        Some(&address(&Bytes32::from([9; 32]))),
        Some(&short_address()),
    );

    assert!(matches!(result, Err(RewardTargetError::InvalidAddress { .. })));
    assert_eq!(manager.targets(), before);
    assert_eq!(store.load().unwrap(), config);
}

#[test]
fn address_of_other_network_is_rejected() {
    let farmer_target = Bytes32::from([1; 32]);
    let pool_target = Bytes32::from([2; 32]);
    let config = config(&farmer_target, &pool_target);
    let (_directory, store) = config_store(&config);
    let manager = RewardTargetManager::new(&config, keychain(), store.clone()).unwrap();
    let testnet_address =
        encode_puzzle_hash(&Bytes32::from([9; 32]), parse_prefix("txcc").unwrap());

    assert!(matches!(
        manager.set_reward_targets(Some(&testnet_address), None),
        Err(RewardTargetError::InvalidAddress {
            error: AddressError::Bech32m(Bech32mError::WrongPrefix { .. }),
            ..
        })
    ));
    assert_eq!(manager.farmer_target(), farmer_target);
    assert_eq!(store.load().unwrap(), config);

    let mut testnet_config = config.clone();
    testnet_config.farmer.xcc_target_address = testnet_address;
    assert!(matches!(
        RewardTargetManager::new(&testnet_config, keychain(), store),
        Err(RewardTargetError::InvalidAddress { .. })
    ));
}

#[test]
fn addresses_stored_in_canonical_form() {
    let pool_target = Bytes32::from([2; 32]);
    let config = config(&Bytes32::from([1; 32]), &pool_target);
    let (_directory, store) = config_store(&config);
    let manager = RewardTargetManager::new(&config, keychain(), store.clone()).unwrap();
    let farmer_target = Bytes32::from([5; 32]);

    manager
        .set_reward_targets(Some(&address(&farmer_target).to_uppercase()), None)
        .unwrap();

    let targets = manager.targets();
    assert_eq!(targets.farmer_target, farmer_target);
    assert_eq!(
        targets.farmer_target_encoded,
        manager.encode(&targets.farmer_target)
    );
    assert_eq!(targets.farmer_target_encoded, address(&farmer_target));
    assert_eq!(
        targets.pool_target_encoded,
        manager.encode(&targets.pool_target)
    );
    assert_eq!(
        store.load().unwrap().farmer.xcc_target_address,
        address(&farmer_target)
    );
}

#[test]
fn search_for_private_keys() {
    let owned_key = master_key(2);
    let farmer_target = owned_key.wallet_puzzle_hash(3);
    let pool_target = Bytes32::from([2; 32]);
    let mut config = config(&farmer_target, &pool_target);
    config.farmer.wallet_key_search_depth = 5;
    let (_directory, store) = config_store(&config);
    let manager = RewardTargetManager::new(&config, keychain(), store).unwrap();

    let info = manager.reward_targets(true);
    assert_eq!(info.have_farmer_sk, Some(true));
    assert_eq!(info.have_pool_sk, Some(false));

    let serialized = serde_json::to_value(manager.reward_targets(false)).unwrap();
    assert!(serialized.get("have_farmer_sk").is_none());
}

#[test]
fn search_is_bounded_by_depth() {
    let owned_key = master_key(1);
    let farmer_target = owned_key.wallet_puzzle_hash(10);
    let pool_target = owned_key.wallet_puzzle_hash(0);
    let mut config = config(&farmer_target, &pool_target);
    config.farmer.wallet_key_search_depth = 10;
    let (_directory, store) = config_store(&config);
    let manager = RewardTargetManager::new(&config, keychain(), store).unwrap();

    let info = manager.reward_targets(true);
    assert_eq!(info.have_farmer_sk, Some(false));
    assert_eq!(info.have_pool_sk, Some(true));
}
