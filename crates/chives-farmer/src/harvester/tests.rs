use crate::harvester::{HarvesterCoordinator, NodeType, StateChange, StateChangeNotifier};
use crate::protocol::{HarvesterMessage, PublicKey};
use crate::test_utils::MockPeer;
use event_listener_primitives::HandlerId;
use parking_lot::Mutex;
use std::sync::Arc;

fn public_key(byte: u8) -> PublicKey {
    PublicKey::from([byte; PublicKey::SIZE])
}

fn recorded_changes(notifier: &StateChangeNotifier) -> (Arc<Mutex<Vec<String>>>, HandlerId) {
    let changes = Arc::new(Mutex::new(Vec::new()));
    let handler_id = notifier.on_state_change(Arc::new({
        let changes = Arc::clone(&changes);
        move |state_change: &StateChange| {
            changes.lock().push(state_change.change.clone());
        }
    }));
    (changes, handler_id)
}

#[tokio::test]
async fn handshake_sent_to_harvester_with_every_key_once() {
    let notifier = Arc::new(StateChangeNotifier::default());
    let (changes, _handler_id) = recorded_changes(&notifier);
    let coordinator = HarvesterCoordinator::new(
        vec![public_key(1), public_key(2), public_key(1), public_key(3)],
        vec![public_key(9)],
        Arc::clone(&notifier),
    );

    let harvester = MockPeer::new(NodeType::Harvester);
    coordinator.on_connect(&harvester).await.unwrap();

    let sent = harvester.sent.lock();
    assert_eq!(sent.len(), 1);
    let HarvesterMessage::HarvesterHandshake(handshake) = &sent[0];
    assert_eq!(
        handshake.farmer_public_keys,
        vec![public_key(1), public_key(2), public_key(3)]
    );
    assert_eq!(handshake.pool_public_keys, vec![public_key(9)]);
    assert_eq!(*changes.lock(), vec!["add_connection".to_string()]);
}

#[tokio::test]
async fn no_handshake_for_non_harvester() {
    let notifier = Arc::new(StateChangeNotifier::default());
    let (changes, _handler_id) = recorded_changes(&notifier);
    let coordinator =
        HarvesterCoordinator::new(vec![public_key(1)], vec![], Arc::clone(&notifier));

    for node_type in [NodeType::FullNode, NodeType::Wallet, NodeType::Farmer] {
        let peer = MockPeer::new(node_type);
        coordinator.on_connect(&peer).await.unwrap();
        assert!(peer.sent.lock().is_empty());
    }

    assert_eq!(changes.lock().len(), 3);
}

#[test]
fn disconnect_notifies() {
    let notifier = Arc::new(StateChangeNotifier::default());
    let (changes, handler_id) = recorded_changes(&notifier);
    let coordinator = HarvesterCoordinator::new(vec![], vec![], Arc::clone(&notifier));

    coordinator.on_disconnect(&MockPeer::new(NodeType::Harvester));
    assert_eq!(*changes.lock(), vec!["close_connection".to_string()]);

    // Dropped handler no longer receives notifications
    drop(handler_id);
    coordinator.on_disconnect(&MockPeer::new(NodeType::Harvester));
    assert_eq!(changes.lock().len(), 1);
}
