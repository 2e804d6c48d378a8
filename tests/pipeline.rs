use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use mockito::{Matcher, Mock, ServerGuard};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use wallet_activity::{
    AddrActivity, Address, DedupPolicy, Pipeline, PipelineSettings, RpcClient, TokenBucket,
};

const TOKEN_A: &str = "0xdac17f958d2ee523a2206206994597c13d831ec7";
const TOKEN_B: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
const ALICE: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";
const BOB: &str = "0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc";
const CAROL: &str = "0x90f79bf6eb2c4f870365e785982e1f101e93b906";

const TRANSFER_INPUT: &str = "0xa9059cbb0000000000000000000000003c44cdddb6a900fa2b585dd299e03d12fa4293bc00000000000000000000000000000000000000000000000000000000000003e8";

fn transfer(from: &str, to: &str) -> Value {
    json!({"hash": "0x00", "from": from, "to": to, "input": TRANSFER_INPUT})
}

fn plain_call(from: &str, to: &str) -> Value {
    json!({"hash": "0x00", "from": from, "to": to, "input": "0x12345678"})
}

async fn mock_head(server: &mut ServerGuard, head: &str) -> Mock {
    server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({"method": "eth_blockNumber"})))
        .with_status(200)
        .with_body(json!({"jsonrpc": "2.0", "id": 1, "result": head}).to_string())
        .expect(1)
        .create_async()
        .await
}

async fn mock_block(server: &mut ServerGuard, tag: &str, transactions: Vec<Value>) -> Mock {
    server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({
            "method": "eth_getBlockByNumber",
            "params": [tag, true]
        })))
        .with_status(200)
        .with_body(
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {"number": tag, "transactions": transactions}
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await
}

fn pipeline(url: String, n_blocks: u64, top: usize, save_path: &Path) -> Pipeline {
    let rpc = RpcClient::new(
        url,
        Arc::new(TokenBucket::new(1000.0, 100)),
        Duration::from_secs(5),
    )
    .unwrap();
    Pipeline::new(
        Arc::new(rpc),
        PipelineSettings {
            n_blocks,
            n_top_wallets: top,
            save_path: save_path.to_path_buf(),
            dedup: DedupPolicy::PerTransaction,
        },
    )
}

fn read_report(path: &Path) -> Vec<AddrActivity> {
    let bytes = std::fs::read(path).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn row(address: &str, activity: u64) -> AddrActivity {
    AddrActivity {
        address: Address::from(address),
        activity,
    }
}

#[tokio::test]
async fn writes_ranked_report() {
    let mut server = mockito::Server::new_async().await;
    let head = mock_head(&mut server, "0x64").await;
    let b100 = mock_block(
        &mut server,
        "0x64",
        vec![
            transfer(ALICE, TOKEN_A),
            transfer(BOB, TOKEN_A),
            plain_call(CAROL, TOKEN_B),
        ],
    )
    .await;
    let b99 = mock_block(&mut server, "0x63", vec![transfer(ALICE, TOKEN_B)]).await;
    let b98 = mock_block(&mut server, "0x62", vec![]).await;

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("top.json");
    let summary = pipeline(server.url(), 3, 3, &out)
        .run(&CancellationToken::new())
        .await
        .unwrap();

    head.assert_async().await;
    b100.assert_async().await;
    b99.assert_async().await;
    b98.assert_async().await;

    assert_eq!(summary.head, 100);
    assert_eq!(summary.stats.requested, 3);
    assert_eq!(summary.stats.failed, 0);
    assert_eq!(summary.stats.empty, 1);

    // ALICE and TOKEN_A tie at 2, BOB and TOKEN_B at 1; ties go by address.
    let expected = vec![row(ALICE, 2), row(TOKEN_A, 2), row(BOB, 1)];
    assert_eq!(summary.top, expected);
    assert_eq!(read_report(&out), expected);

    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("[\n    {\n        \"address\": "));
}

#[tokio::test]
async fn failed_block_does_not_abort_run() {
    let mut server = mockito::Server::new_async().await;
    let _head = mock_head(&mut server, "0xa").await;
    let _b10 = mock_block(&mut server, "0xa", vec![transfer(ALICE, TOKEN_A)]).await;
    let _b9 = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({
            "method": "eth_getBlockByNumber",
            "params": ["0x9", true]
        })))
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("top.json");
    let summary = pipeline(server.url(), 2, 10, &out)
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.stats.failed, 1);
    assert_eq!(summary.stats.succeeded, 1);
    assert_eq!(read_report(&out), vec![row(ALICE, 1), row(TOKEN_A, 1)]);
}

#[tokio::test]
async fn head_failure_aborts_without_writing() {
    let mut server = mockito::Server::new_async().await;
    let _head = server
        .mock("POST", "/")
        .with_status(502)
        .with_body("bad gateway")
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("top.json");
    let result = pipeline(server.url(), 3, 3, &out)
        .run(&CancellationToken::new())
        .await;

    assert!(result.is_err());
    assert!(!out.exists());
}

#[tokio::test]
async fn write_failure_aborts_run() {
    let mut server = mockito::Server::new_async().await;
    let _head = mock_head(&mut server, "0x1").await;
    let _b1 = mock_block(&mut server, "0x1", vec![transfer(ALICE, TOKEN_A)]).await;

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("no-such-dir").join("top.json");
    let result = pipeline(server.url(), 1, 3, &out)
        .run(&CancellationToken::new())
        .await;

    assert!(result.is_err());
    assert!(!out.exists());
}

#[tokio::test]
async fn zero_top_wallets_writes_empty_array() {
    let mut server = mockito::Server::new_async().await;
    let _head = mock_head(&mut server, "0x1").await;
    let _b1 = mock_block(&mut server, "0x1", vec![transfer(ALICE, TOKEN_A)]).await;

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("top.json");
    let summary = pipeline(server.url(), 1, 0, &out)
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert!(summary.top.is_empty());
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "[]");
}
