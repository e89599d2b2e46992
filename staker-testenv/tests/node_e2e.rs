//! Full boot cycle against a real node binary. Requires the binary on `PATH`
//! (override with `STAKER_NODE_BIN`), so it is ignored by default.

use std::time::Duration;

use staker_offchain::data::{RawTransaction, TxState};
use staker_offchain::tracker::TxTracker;
use staker_testenv::node::{NodeConfig, NodeHandler};

fn e2e_config() -> NodeConfig {
    NodeConfig {
        node_bin: std::env::var("STAKER_NODE_BIN").unwrap_or_else(|_| "staked".into()),
        chain_id: "chain-test".into(),
        covenant_quorum: 2,
        covenant_pks: vec!["aa".repeat(32), "bb".repeat(32), "cc".repeat(32)],
        slashing_addr: "bcrt1qtest".into(),
        base_header: "00".repeat(80),
        btc_confirmation_depth: 2,
        btc_finalization_timeout: 4,
        epoch_interval: 5,
    }
}

#[tokio::test]
#[ignore]
async fn boot_node_and_track_staking_tx() {
    let conf = e2e_config();
    let mut node = NodeHandler::init(&conf).await.unwrap();
    node.start().await.unwrap();
    assert!(node.node_data_dir().exists());

    // Give the node a moment to come up before driving the workflow.
    tokio::time::sleep(Duration::from_secs(2)).await;

    let tracker = TxTracker::new();
    let staking_tx = RawTransaction::new(vec![0x42; 128]);
    let id = staking_tx.id();
    tracker.add(staking_tx, vec![0x51]).unwrap();
    tracker.set_state(&id, TxState::Confirmed).unwrap();
    assert_eq!(tracker.get(&id).unwrap().state, TxState::Confirmed);

    let data_dir = node.node_data_dir().to_path_buf();
    node.shutdown().await.unwrap();
    assert!(!data_dir.exists());
}
