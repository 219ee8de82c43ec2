//! End-to-end HTTP tests against the real router with in-process chains.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use relay_chain::mock::{MockChainClient, SentTx};
use relay_chain::ChainClient;
use relay_crypto::{sign_request, BridgeMessage};
use relay_notify::recording::RecordingNotifier;
use relay_server::{build_state, create_router, Collaborators, Ctx};
use relay_store::{MemoryAuditLog, MemoryNonceRegistry};
use relay_types::{bytes_to_hex, TypedDataDomain};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

const TOKEN: &str = "0x1111111111111111111111111111111111111111";

const CONFIG: &str = r#"
[chain_a]
rpc_url = "http://localhost:8545"
chain_id = 1
asset_symbol = "ETH"

[chain_b]
rpc_url = "http://localhost:9545"
chain_id = 20250511
asset_symbol = "PGirls"
token_address = "0x1111111111111111111111111111111111111111"
bridge_contract = "0x2222222222222222222222222222222222222222"

[domains.a_to_b]
name = "PGirlsBridge"
version = "1"
chain_id = 20250511
verifying_contract = "0x2222222222222222222222222222222222222222"

[domains.b_to_a]
name = "PGirlsBridge"
version = "1"
chain_id = 20250511
verifying_contract = "0x2222222222222222222222222222222222222222"
"#;

const SECRETS: &str = r#"
chain_a_payout_key = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d"
chain_b_minter_key = "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a"
"#;

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    ctx: Ctx,
    chain_a: Arc<MockChainClient>,
    chain_b: Arc<MockChainClient>,
    notifier: Arc<RecordingNotifier>,
    handle: JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let ctx = Ctx::from_toml(CONFIG, SECRETS).unwrap();
        let token: Address = TOKEN.parse().unwrap();
        let chain_a = Arc::new(MockChainClient::new(1));
        let chain_b = Arc::new(MockChainClient::new(20250511).with_token(token, 18));
        let notifier = Arc::new(RecordingNotifier::new());

        let state = build_state(
            &ctx,
            Collaborators {
                chain_a: chain_a.clone(),
                chain_b: chain_b.clone(),
                registry: Arc::new(MemoryNonceRegistry::new()),
                audit: Arc::new(MemoryAuditLog::new()),
                notifier: notifier.clone(),
            },
        );
        let app = create_router().with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{}", addr),
            client: reqwest::Client::new(),
            ctx,
            chain_a,
            chain_b,
            notifier,
            handle,
        }
    }

    async fn post(&self, path: &str, body: &Value) -> (u16, Value) {
        let resp = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(format!("{}{}", self.base_url, path)).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn signed_body(signer: &PrivateKeySigner, domain: &TypedDataDomain, amount: u128, nonce: u64) -> Value {
    let amount = U256::from(amount);
    let message = BridgeMessage { user: signer.address(), amount, nonce: U256::from(nonce) };
    let signature = sign_request(domain, &message, signer).unwrap();
    json!({
        "user": signer.address().to_string(),
        "amount": amount.to_string(),
        "nonce": nonce.to_string(),
        "signature": bytes_to_hex(&signature.as_bytes()),
    })
}

const ONE: u128 = 1_000_000_000_000_000_000;

#[tokio::test]
async fn test_health() {
    let server = TestServer::spawn().await;
    let (status, body) = server.get("/health").await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"status": "ok", "chainA": 1, "chainB": 20250511}));
}

#[tokio::test]
async fn test_a_to_b_success_then_replay() {
    let server = TestServer::spawn().await;
    let user = PrivateKeySigner::random();
    let mut body = signed_body(&user, &server.ctx.a_to_b_domain, ONE, 1);
    body["sourceTxHash"] = json!(format!("0x{}", "ab".repeat(32)));

    let (status, first) = server.post("/bridge/a-to-b", &body).await;
    assert_eq!(status, 200, "{first}");
    assert_eq!(first["success"], true);
    assert_eq!(first["sourceTxHash"], body["sourceTxHash"]);
    let tx_hash = first["destinationTxHash"].as_str().unwrap().to_string();
    assert_eq!(server.chain_b.sent().len(), 1);

    let (status, replay) = server.post("/bridge/a-to-b", &body).await;
    assert_eq!(status, 409);
    assert_eq!(replay["success"], false);
    assert_eq!(replay["error"], "NONCE_REUSED");
    assert_eq!(replay["message"], "already processed");
    assert_eq!(replay["destinationTxHash"], tx_hash.as_str());
    assert!(replay["timestamp"].as_i64().unwrap() > 0);
    assert_eq!(server.chain_b.sent().len(), 1);
}

#[tokio::test]
async fn test_b_to_a_payout() {
    let server = TestServer::spawn().await;
    server.chain_a.set_native_balance(server.chain_a.signer_address(), U256::from(ONE));
    let user = PrivateKeySigner::random();
    let mut body = signed_body(&user, &server.ctx.b_to_a_domain, ONE, 1);
    body["chainId"] = json!(20250511);

    let (status, resp) = server.post("/bridge/b-to-a", &body).await;
    assert_eq!(status, 200, "{resp}");
    assert_eq!(resp["payoutAmount"], "18000000000000000");
    assert_eq!(resp["to"].as_str().unwrap().to_lowercase(), user.address().to_string().to_lowercase());

    match &server.chain_a.sent()[..] {
        [SentTx::Native { value, .. }] => assert_eq!(*value, U256::from(18_000_000_000_000_000u64)),
        other => panic!("unexpected txs {:?}", other),
    }
    let completed = server.notifier.wait_for(1, Duration::from_secs(2)).await;
    assert!(!completed[0].is_failure());
}

#[tokio::test]
async fn test_b_to_a_status_taxonomy() {
    let server = TestServer::spawn().await;
    server.chain_a.set_native_balance(server.chain_a.signer_address(), U256::from(10));
    let user = PrivateKeySigner::random();
    let domain = server.ctx.b_to_a_domain.clone();

    let (status, resp) = server.post("/bridge/b-to-a", &signed_body(&user, &domain, 612, 1)).await;
    assert_eq!(status, 402);
    assert_eq!(resp["error"], "INSUFFICIENT_RESERVES");

    let (status, resp) = server.post("/bridge/b-to-a", &signed_body(&user, &domain, 55, 2)).await;
    assert_eq!(status, 400);
    assert_eq!(resp["error"], "AMOUNT_TOO_SMALL");

    let mut wrong_chain = signed_body(&user, &domain, 612, 3);
    wrong_chain["chainId"] = json!(1);
    let (status, resp) = server.post("/bridge/b-to-a", &wrong_chain).await;
    assert_eq!(status, 401);
    assert_eq!(resp["error"], "BAD_SIGNATURE");

    // Signed for chain A, so recovery yields some other address.
    let chain_a_domain = TypedDataDomain { chain_id: 1, ..domain.clone() };
    let cross = signed_body(&user, &chain_a_domain, 612, 4);
    let (status, _) = server.post("/bridge/b-to-a", &cross).await;
    assert_eq!(status, 401);

    assert!(server.chain_a.sent().is_empty());
}

#[tokio::test]
async fn test_malformed_bodies() {
    let server = TestServer::spawn().await;

    let (status, resp) = server
        .post("/bridge/a-to-b", &json!({"user": "0x12", "amount": "1", "nonce": "1", "signature": "0x00"}))
        .await;
    assert_eq!(status, 400);
    assert_eq!(resp["message"], "invalid user address");

    let (status, _) = server.post("/bridge/a-to-b", &json!({"amount": "1"})).await;
    assert_eq!(status, 400);

    let resp = server
        .client
        .post(format!("{}/bridge/a-to-b", server.base_url))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_execution_failure_is_500() {
    let server = TestServer::spawn().await;
    server.chain_b.set_fail_writes(true);
    let user = PrivateKeySigner::random();
    let body = signed_body(&user, &server.ctx.a_to_b_domain, ONE, 1);

    let (status, resp) = server.post("/bridge/a-to-b", &body).await;
    assert_eq!(status, 500);
    assert_eq!(resp["error"], "CHAIN_ERROR");

    server.chain_b.set_fail_writes(false);
    let (status, resp) = server.post("/bridge/a-to-b", &body).await;
    assert_eq!(status, 409);
    assert_eq!(resp["message"], "nonce already used");
    assert!(resp.get("destinationTxHash").is_none());
}

#[tokio::test]
async fn test_balance_lookup() {
    let server = TestServer::spawn().await;
    let holder = Address::repeat_byte(0x42);
    let token: Address = TOKEN.parse().unwrap();
    server.chain_a.set_native_balance(holder, U256::from(ONE));
    server.chain_b.set_token_balance(token, holder, U256::from(5u64));

    let (status, body) = server.get(&format!("/balance/eth/{}", holder)).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"balance": "1000000000000000000", "decimals": 18}));

    let (status, body) = server.get(&format!("/balance/PGIRLS/{}", holder)).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"balance": "5", "decimals": 18}));

    let (status, body) = server.get("/balance/eth/0xnotanaddress").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "BAD_REQUEST");

    let (status, body) = server.get(&format!("/balance/doge/{}", holder)).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "UNKNOWN_ASSET");
}

#[tokio::test]
async fn test_request_id_propagated() {
    let server = TestServer::spawn().await;
    let resp = server
        .client
        .get(format!("{}/health", server.base_url))
        .header("x-request-id", "trace-me")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers().get("x-request-id").unwrap(), "trace-me");
}
