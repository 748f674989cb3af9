//! # REST + WebSocket API
//!
//! Builds the axum router that exposes the deployed token over HTTP.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                          | Description                        |
//! |--------|-------------------------------|------------------------------------|
//! | GET    | `/health`                     | Liveness probe                     |
//! | GET    | `/status`                     | Token and supply summary           |
//! | GET    | `/accounts/:address`          | Balance, held tokens, exemption    |
//! | GET    | `/tokens/:id`                 | Owner and approval of one token    |
//! | GET    | `/allowances/:owner/:spender` | Fungible allowance                 |
//! | GET    | `/audit`                      | Cross-view invariant check         |
//! | POST   | `/operations`                 | Apply one [`Operation`]            |
//! | GET    | `/ws`                         | WebSocket stream of ledger events  |
//!
//! Amounts and token ids are `u128` and are rendered as JSON numbers.
//!
//! The API is for devnets only and has no authentication. Every
//! [`Operation`] names its own caller and the node takes that at its word,
//! so anyone who can reach the port can act as any account, the owner
//! included. Bind it to a trusted interface.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use ngu_contracts::{ContractError, NumberGoUp};
use ngu_ledger::{audit, Address, LedgerError, LedgerEvent, Shared, TokenId};

use crate::metrics::SharedMetrics;
use crate::ops::{self, Operation};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone: the token sits behind [`Shared`], the rest is `Arc`s.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// Network label from the deployment config.
    pub network: String,
    /// The deployed token.
    pub ngu: Shared<NumberGoUp>,
    /// Events recorded by applied operations, fanned out to `/ws`.
    pub event_tx: broadcast::Sender<LedgerEvent>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

impl AppState {
    /// Applies `op` under the write lock, records metrics, and broadcasts
    /// the events it produced.
    pub fn execute(&self, op: &Operation) -> Result<OperationResponse, ContractError> {
        let started = Instant::now();
        let (result, events) = self.ngu.write(|ngu| {
            let result = ops::apply(ngu, op);
            let events = ngu.take_events();
            self.metrics.observe(ngu.ledger());
            (result, events)
        });
        let elapsed = started.elapsed();

        match result {
            Ok(summary) => {
                self.metrics.record_applied(&summary, elapsed);
                let event_count = events.len();
                for event in events {
                    // No subscribers is fine.
                    let _ = self.event_tx.send(event);
                }
                tracing::debug!(kind = op.kind(), events = event_count, "operation applied");
                Ok(OperationResponse {
                    kind: op.kind().to_string(),
                    minted: summary.minted,
                    burned: summary.burned,
                    reassigned: summary.reassigned,
                    events: event_count,
                })
            }
            Err(e) => {
                self.metrics.record_rejected(elapsed);
                tracing::warn!(kind = op.kind(), error = %e, "operation rejected");
                Err(e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/accounts/:address", get(account_handler))
        .route("/tokens/:id", get(token_handler))
        .route("/allowances/:owner/:spender", get(allowance_handler))
        .route("/audit", get(audit_handler))
        .route("/operations", post(operation_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub network: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// The token's own address.
    pub address: Address,
    pub owner: Address,
    pub erc20_total_supply: u128,
    pub max_total_supply: u128,
    pub erc721_total_supply: u128,
    /// Fresh ids issued so far.
    pub minted: u128,
    pub erc721_queue_length: usize,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Response payload for `GET /accounts/:address`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub address: Address,
    /// Fungible balance in base units.
    pub balance: u128,
    pub erc721_balance: usize,
    /// Held tokens, oldest acquisition first.
    pub owned: Vec<TokenId>,
    pub erc721_transfer_exempt: bool,
}

/// Response payload for `GET /tokens/:id`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub id: TokenId,
    pub owner: Address,
    pub approved: Option<Address>,
}

/// Response payload for `GET /allowances/:owner/:spender`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AllowanceResponse {
    pub owner: Address,
    pub spender: Address,
    pub amount: u128,
}

/// Response payload for `GET /audit`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuditResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation: Option<String>,
}

/// Response payload for a successful `POST /operations`.
#[derive(Debug, Serialize, Deserialize)]
pub struct OperationResponse {
    pub kind: String,
    pub minted: u128,
    pub burned: u128,
    pub reassigned: u128,
    /// Number of ledger events broadcast for this operation.
    pub events: usize,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

fn parse_address(raw: &str) -> Result<Address, Response> {
    raw.parse()
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, format!("invalid address {raw}: {e}")))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the node is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status` — token configuration and supply counters.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let resp = state.ngu.read(|ngu| {
        let ledger = ngu.ledger();
        StatusResponse {
            version: state.version.clone(),
            network: state.network.clone(),
            name: ledger.config().name.clone(),
            symbol: ledger.config().symbol.clone(),
            decimals: ledger.config().decimals,
            address: ngu.address(),
            owner: ngu.owner(),
            erc20_total_supply: ledger.erc20_total_supply(),
            max_total_supply: ledger.max_total_supply(),
            erc721_total_supply: ledger.erc721_total_supply(),
            minted: ledger.minted(),
            erc721_queue_length: ledger.erc721_queue_length(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    });
    Json(resp)
}

/// `GET /accounts/:address` — balances and holdings.
///
/// Unknown addresses return a zeroed account, not a 404.
async fn account_handler(Path(address): Path<String>, State(state): State<AppState>) -> Response {
    let address = match parse_address(&address) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let account = state.ngu.read(|ngu| {
        let ledger = ngu.ledger();
        AccountResponse {
            address,
            balance: ledger.balance_of(&address),
            erc721_balance: ledger.erc721_balance_of(&address),
            owned: ledger.owned(&address).to_vec(),
            erc721_transfer_exempt: ledger.erc721_transfer_exempt(&address),
        }
    });
    Json(account).into_response()
}

/// `GET /tokens/:id` — owner of one token. 404 for ids that are unowned or
/// outside the encoded range.
async fn token_handler(Path(id): Path<String>, State(state): State<AppState>) -> Response {
    let id: TokenId = match id.parse() {
        Ok(id) => id,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("invalid token id {id}: {e}")),
    };
    let result = state.ngu.read(|ngu| -> Result<TokenResponse, LedgerError> {
        let ledger = ngu.ledger();
        Ok(TokenResponse {
            id,
            owner: ledger.owner_of(id)?,
            approved: ledger.get_approved(id)?,
        })
    });
    match result {
        Ok(token) => Json(token).into_response(),
        Err(e) => error_response(StatusCode::NOT_FOUND, e),
    }
}

/// `GET /allowances/:owner/:spender` — literal base-unit allowance.
async fn allowance_handler(
    Path((owner, spender)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Response {
    let (owner, spender) = match (parse_address(&owner), parse_address(&spender)) {
        (Ok(o), Ok(s)) => (o, s),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    let amount = state.ngu.read(|ngu| ngu.ledger().allowance(&owner, &spender));
    Json(AllowanceResponse { owner, spender, amount }).into_response()
}

/// `GET /audit` — runs the full invariant audit. 500 if any rule is broken.
async fn audit_handler(State(state): State<AppState>) -> Response {
    match state.ngu.read(|ngu| audit(ngu.ledger())) {
        Ok(()) => Json(AuditResponse {
            ok: true,
            violation: None,
        })
        .into_response(),
        Err(violation) => {
            tracing::error!(%violation, "ledger audit failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AuditResponse {
                    ok: false,
                    violation: Some(violation.to_string()),
                }),
            )
                .into_response()
        }
    }
}

/// `POST /operations` — applies one operation.
///
/// Rejections by the owner gate return 403; every other rejection returns
/// 422 with the ledger's message. Nothing is applied on rejection.
async fn operation_handler(State(state): State<AppState>, Json(op): Json<Operation>) -> Response {
    match state.execute(&op) {
        Ok(resp) => Json(resp).into_response(),
        Err(e @ ContractError::Unauthorized { .. }) => error_response(StatusCode::FORBIDDEN, e),
        Err(e) => error_response(StatusCode::UNPROCESSABLE_ENTITY, e),
    }
}

/// `GET /ws` — WebSocket upgrade for live event streaming.
///
/// Clients receive JSON-encoded [`LedgerEvent`] messages for every applied
/// operation. Client messages are ignored.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

/// Drives a single WebSocket connection, forwarding broadcast events
/// until the client disconnects or the channel is closed.
async fn handle_ws_connection(mut socket: WebSocket, state: AppState) {
    let mut rx = state.event_tx.subscribe();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(ev) => {
                        let payload = match serde_json::to_string(&ev) {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!("failed to serialize ws event: {}", e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("ws subscriber lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeploymentConfig;
    use crate::metrics::LedgerMetrics;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use ngu_ledger::ID_ENCODING_PREFIX;
    use std::sync::Arc;
    use tower::ServiceExt;

    const UNITS: u128 = 1_000_000_000_000_000_000;

    /// Creates a test AppState around a freshly deployed devnet token.
    fn test_app_state() -> AppState {
        test_app_state_with(DeploymentConfig::default())
    }

    fn test_app_state_with(config: DeploymentConfig) -> AppState {
        let mut ngu = config.deploy().expect("deploy");
        ngu.take_events();
        let (event_tx, _) = broadcast::channel(64);
        AppState {
            version: "0.1.0-test".into(),
            network: config.network,
            ngu: Shared::new(ngu),
            event_tx,
            metrics: Arc::new(LedgerMetrics::new().expect("metrics")),
        }
    }

    fn owner() -> Address {
        DeploymentConfig::default().deployment.initial_owner
    }

    /// Sends a GET request and returns the (status, body_bytes).
    async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, body)
    }

    /// Posts an operation and returns (status, body_bytes).
    async fn post_op(router: &Router, op: &Operation) -> (StatusCode, Vec<u8>) {
        let req = Request::builder()
            .method("POST")
            .uri("/operations")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(op).unwrap()))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, body)
    }

    // -- 1. Health ------------------------------------------------------------

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    // -- 2. Status reports the deployment -------------------------------------

    #[tokio::test]
    async fn status_reports_supplies() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/status").await;

        assert_eq!(status, StatusCode::OK);
        let resp: StatusResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.symbol, "NGU");
        assert_eq!(resp.erc20_total_supply, 100 * UNITS);
        assert_eq!(resp.erc721_total_supply, 0);
        assert_eq!(resp.owner, owner());
        assert_eq!(resp.network, "devnet");
    }

    // -- 3. Transfer through the API mints tokens -----------------------------

    #[tokio::test]
    async fn transfer_operation_mints_and_broadcasts() {
        let state = test_app_state();
        let mut rx = state.event_tx.subscribe();
        let router = create_router(state.clone());
        let alice = Address::derive("alice");

        let op = Operation::Transfer {
            from: owner(),
            to: alice,
            amount: 5 * UNITS,
        };
        let (status, body) = post_op(&router, &op).await;
        assert_eq!(status, StatusCode::OK);
        let resp: OperationResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.minted, 5);
        assert_eq!(resp.events, 6);

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, LedgerEvent::Erc20Transfer { amount, .. } if amount == 5 * UNITS));
        assert!(rx.recv().await.unwrap().is_erc721_mint());

        let (status, body) = get(&router, &format!("/accounts/{alice}")).await;
        assert_eq!(status, StatusCode::OK);
        let account: AccountResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(account.balance, 5 * UNITS);
        assert_eq!(account.erc721_balance, 5);
        assert_eq!(account.owned[0], TokenId::new(ID_ENCODING_PREFIX + 1));
        assert!(!account.erc721_transfer_exempt);

        assert_eq!(state.metrics.erc721_mints_total.get(), 5);
        assert_eq!(state.metrics.erc721_total_supply.get(), 5);
    }

    // -- 4. Token lookup ------------------------------------------------------

    #[tokio::test]
    async fn token_endpoint_returns_owner_and_404_below_range() {
        let state = test_app_state();
        let router = create_router(state.clone());
        let alice = Address::derive("alice");
        state
            .execute(&Operation::Transfer {
                from: owner(),
                to: alice,
                amount: UNITS,
            })
            .unwrap();

        let first = ID_ENCODING_PREFIX + 1;
        let (status, body) = get(&router, &format!("/tokens/{first}")).await;
        assert_eq!(status, StatusCode::OK);
        let token: TokenResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(token.owner, alice);
        assert_eq!(token.approved, None);

        let (status, body) = get(&router, &format!("/tokens/{ID_ENCODING_PREFIX}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(err.error.contains("invalid token id"));

        let (status, _) = get(&router, "/tokens/not-a-number").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    // -- 5. Rejections --------------------------------------------------------

    #[tokio::test]
    async fn insufficient_balance_is_unprocessable_and_counted() {
        let state = test_app_state();
        let router = create_router(state.clone());
        let op = Operation::Transfer {
            from: Address::derive("nobody"),
            to: Address::derive("alice"),
            amount: 1,
        };
        let (status, body) = post_op(&router, &op).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(err.error.contains("insufficient balance"));
        assert_eq!(state.metrics.operations_rejected_total.get(), 1);
    }

    #[tokio::test]
    async fn non_owner_exemption_is_forbidden() {
        let router = create_router(test_app_state());
        let stranger = Address::derive("stranger");
        let op = Operation::SetErc721TransferExempt {
            caller: stranger,
            target: stranger,
            state: true,
        };
        let (status, _) = post_op(&router, &op).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn oversized_resync_is_unprocessable() {
        let mut config = DeploymentConfig::default();
        config.deployment.config.max_resync_mint = Some(10);
        let state = test_app_state_with(config);
        let router = create_router(state.clone());

        // The owner's 100 whole units exceed the limit.
        let op = Operation::SetSelfErc721TransferExempt {
            caller: owner(),
            state: false,
        };
        let (status, body) = post_op(&router, &op).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(err.error.contains("would mint 100 tokens"));
        assert!(state.ngu.read(|ngu| ngu.ledger().erc721_transfer_exempt(&owner())));
    }

    // -- 6. Allowances --------------------------------------------------------

    #[tokio::test]
    async fn allowance_endpoint_reports_literal_amount() {
        let state = test_app_state();
        let router = create_router(state.clone());
        let spender = Address::derive("spender");
        state
            .execute(&Operation::Approve {
                owner: owner(),
                spender,
                amount: 100_000,
            })
            .unwrap();

        let (status, body) = get(&router, &format!("/allowances/{}/{spender}", owner())).await;
        assert_eq!(status, StatusCode::OK);
        let resp: AllowanceResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.amount, 100_000);

        let (status, _) = get(&router, &format!("/allowances/zz/{spender}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    // -- 7. Audit -------------------------------------------------------------

    #[tokio::test]
    async fn audit_passes_after_mixed_operations() {
        let state = test_app_state();
        let router = create_router(state.clone());
        let alice = Address::derive("alice");
        let bob = Address::derive("bob");
        for op in [
            Operation::Transfer {
                from: owner(),
                to: alice,
                amount: 3 * UNITS + UNITS / 2,
            },
            Operation::Transfer {
                from: alice,
                to: bob,
                amount: 7 * UNITS / 10,
            },
            Operation::SetSelfErc721TransferExempt {
                caller: bob,
                state: true,
            },
        ] {
            state.execute(&op).unwrap();
        }

        let (status, body) = get(&router, "/audit").await;
        assert_eq!(status, StatusCode::OK);
        let resp: AuditResponse = serde_json::from_slice(&body).unwrap();
        assert!(resp.ok);
        assert!(resp.violation.is_none());
    }
}
