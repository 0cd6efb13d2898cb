//! JSON-RPC client and end-to-end submission tests against mock HTTP nodes.

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use alloy::consensus::{Transaction, TxEnvelope};
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{address, keccak256, Address, TxHash, U256};
use chain_client::blockchain::{ChainRpc, RpcClient};
use chain_client::config::ChainConfig;
use chain_client::{BaseTx, BroadcastMode, ChainClient, ClientConfig, SdkError, TxMsg};
use serde_json::{json, Value};

mod common;
use common::{quantity, start_http_node, start_unavailable_node, RpcReply, TEST_MNEMONIC, TEST_PASSWORD};

const RECIPIENT: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");

/// Answers like a healthy dev node on chain 31337.
fn healthy(method: &str, params: &Value) -> RpcReply {
    match method {
        "eth_chainId" => Ok(quantity(31337)),
        "eth_blockNumber" => Ok(quantity(42)),
        "eth_getBalance" => Ok(json!("0xde0b6b3a7640000")),
        "eth_getTransactionCount" => Ok(quantity(5)),
        "eth_gasPrice" => Ok(quantity(1_000_000_000)),
        "eth_sendRawTransaction" => {
            let raw = params[0].as_str().unwrap_or_default();
            let bytes = alloy::hex::decode(raw).map_err(|e| (-32602, e.to_string()))?;
            Ok(json!(keccak256(bytes).to_string()))
        }
        "eth_getTransactionReceipt" | "eth_getTransactionByHash" => Ok(Value::Null),
        other => Err((-32601, format!("method {} not found", other))),
    }
}

fn chain_config(rpc_url: String) -> ChainConfig {
    ChainConfig {
        rpc_url,
        ws_url: "ws://127.0.0.1:1".to_string(),
        failover_urls: Vec::new(),
        chain_id: 31337,
        rpc_timeout_secs: 2,
        verify_chain_id: true,
    }
}

#[tokio::test]
async fn test_failover_to_second_node() {
    let primary = start_unavailable_node().await;
    let backup = start_http_node(healthy).await;

    let mut config = chain_config(primary.url());
    config.failover_urls.push(backup.url());
    let rpc = RpcClient::new(config).unwrap();

    assert_eq!(rpc.verify_chain_id().await.unwrap(), 31337);
    assert_eq!(rpc.block_number().await.unwrap(), 42);
    assert!(rpc.is_healthy().await);
    assert!(!primary.calls().is_empty());
    assert_eq!(backup.count("eth_chainId"), 1);
}

#[tokio::test]
async fn test_all_nodes_failing() {
    let primary = start_unavailable_node().await;
    let backup = start_unavailable_node().await;

    let mut config = chain_config(primary.url());
    config.failover_urls.push(backup.url());
    let rpc = RpcClient::new(config).unwrap();

    let err = rpc.gas_price().await.unwrap_err();
    assert!(matches!(err, SdkError::Rpc(ref msg) if msg.contains("eth_gasPrice")));
    assert!(err.is_retryable());
    assert!(!rpc.is_healthy().await);
}

#[tokio::test]
async fn test_chain_id_mismatch() {
    let node = start_http_node(|method, params| match method {
        "eth_chainId" => Ok(quantity(1)),
        _ => healthy(method, params),
    })
    .await;

    let rpc = RpcClient::new(chain_config(node.url())).unwrap();
    let err = rpc.verify_chain_id().await.unwrap_err();
    assert!(matches!(err, SdkError::ChainMismatch { expected: 31337, actual: 1 }));

    // The facade only warns about it.
    let client = ChainClient::new(ClientConfig::new(node.url(), "ws://127.0.0.1:1", 31337)).await;
    assert!(client.is_ok());
}

#[tokio::test]
async fn test_rejection_is_not_retried_elsewhere() {
    let primary = start_http_node(|method, params| match method {
        "eth_sendRawTransaction" => Err((-32000, "nonce too low".to_string())),
        _ => healthy(method, params),
    })
    .await;
    let backup = start_http_node(healthy).await;

    let mut config = chain_config(primary.url());
    config.failover_urls.push(backup.url());
    let rpc = RpcClient::new(config).unwrap();

    let err = rpc.send_raw_transaction(&[0xc0]).await.unwrap_err();
    assert!(matches!(err, SdkError::Broadcast(ref reason) if reason.contains("nonce too low")));
    assert_eq!(backup.count("eth_sendRawTransaction"), 0);
}

#[tokio::test]
async fn test_submit_and_query_through_client() {
    let node = start_http_node(healthy).await;
    let client = ChainClient::new(ClientConfig::new(node.url(), "ws://127.0.0.1:1", 31337))
        .await
        .unwrap();

    let sender = client.keys().recover("mykey", TEST_PASSWORD, TEST_MNEMONIC).unwrap();
    let account = client.query_account(sender).await.unwrap();
    assert_eq!(account.balance.amount, U256::from(10u64).pow(U256::from(18u64)));
    assert_eq!(account.nonce, 5);

    let base = BaseTx::new("mykey", TEST_PASSWORD).with_memo("hello");
    let first = client
        .send_tx(TxMsg::Transfer { to: RECIPIENT, amount: U256::from(1u64) }, &base)
        .await
        .unwrap();
    let second = client
        .send_tx(
            TxMsg::Transfer { to: RECIPIENT, amount: U256::from(2u64) },
            &base.clone().with_mode(BroadcastMode::Async),
        )
        .await
        .unwrap();

    assert_eq!(first.mode, BroadcastMode::Sync);
    assert_eq!(second.mode, BroadcastMode::Async);
    assert_ne!(first.hash, second.hash);
    assert_eq!(node.count("eth_sendRawTransaction"), 2);
    // One nonce read for the account query, one for the first send; the second is cached.
    assert_eq!(node.count("eth_getTransactionCount"), 2);

    let err = client.query_tx(first.hash).await.unwrap_err();
    assert!(matches!(err, SdkError::TxNotFound(hash) if hash == first.hash));
}

#[tokio::test]
async fn test_hash_mismatch_detected() {
    let node = start_http_node(|method, params| match method {
        "eth_sendRawTransaction" => Ok(json!(TxHash::ZERO.to_string())),
        _ => healthy(method, params),
    })
    .await;
    let client = ChainClient::with_rpc(
        ClientConfig::new(node.url(), "ws://127.0.0.1:1", 31337),
        Arc::new(RpcClient::new(chain_config(node.url())).unwrap()),
    )
    .unwrap();
    client.keys().recover("mykey", TEST_PASSWORD, TEST_MNEMONIC).unwrap();

    let base = BaseTx::new("mykey", TEST_PASSWORD);
    let msg = TxMsg::Transfer { to: RECIPIENT, amount: U256::from(1u64) };
    let err = client.send_tx(msg.clone(), &base).await.unwrap_err();
    assert!(matches!(err, SdkError::HashMismatch { returned, .. } if returned == TxHash::ZERO));

    // Async mode trusts the locally computed hash.
    let result = client
        .send_tx(msg, &base.with_mode(BroadcastMode::Async))
        .await
        .unwrap();
    assert_ne!(result.hash, TxHash::ZERO);
}

#[tokio::test]
async fn test_fee_below_network_price() {
    let node = start_http_node(healthy).await;
    let client = ChainClient::new(ClientConfig::new(node.url(), "ws://127.0.0.1:1", 31337))
        .await
        .unwrap();
    client.keys().recover("mykey", TEST_PASSWORD, TEST_MNEMONIC).unwrap();

    // 21000 wei over 21000 gas is 1 wei per gas, below the 1 gwei network price.
    let base = BaseTx::new("mykey", TEST_PASSWORD)
        .with_gas(21_000)
        .with_fee(chain_client::Coin::from_str("21000wei").unwrap());
    let err = client
        .send_tx(TxMsg::Transfer { to: RECIPIENT, amount: U256::from(1u64) }, &base)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SdkError::InsufficientFee { required: 1_000_000_000, offered: 1 }
    ));
    assert_eq!(node.count("eth_sendRawTransaction"), 0);
}

#[tokio::test]
async fn test_nonce_counts_pending_transactions() {
    let pool: Arc<Mutex<Vec<Vec<u8>>>> = Arc::new(Mutex::new(Vec::new()));
    let seen = pool.clone();
    let node = start_http_node(move |method, params| match method {
        // Nothing is ever mined, so the latest count stays at zero.
        "eth_getTransactionCount" if params[1] == "latest" => Ok(quantity(0)),
        "eth_getTransactionCount" => Ok(quantity(seen.lock().unwrap().len() as u64)),
        "eth_sendRawTransaction" => {
            let raw = params[0].as_str().unwrap_or_default();
            let bytes = alloy::hex::decode(raw).map_err(|e| (-32602, e.to_string()))?;
            let hash = keccak256(&bytes);
            seen.lock().unwrap().push(bytes);
            Ok(json!(hash.to_string()))
        }
        _ => healthy(method, params),
    })
    .await;

    let config = ClientConfig::new(node.url(), "ws://127.0.0.1:1", 31337).with_cached(false);
    let client = ChainClient::new(config).await.unwrap();
    client.keys().recover("mykey", TEST_PASSWORD, TEST_MNEMONIC).unwrap();

    let base = BaseTx::new("mykey", TEST_PASSWORD);
    for amount in 1..=2u64 {
        client
            .send_tx(TxMsg::Transfer { to: RECIPIENT, amount: U256::from(amount) }, &base)
            .await
            .unwrap();
    }

    let nonces: Vec<u64> = pool
        .lock()
        .unwrap()
        .iter()
        .map(|raw| TxEnvelope::decode_2718(&mut raw.as_slice()).unwrap().nonce())
        .collect();
    assert_eq!(nonces, vec![0, 1]);
    assert_eq!(node.count("eth_getTransactionCount"), 2);
}
