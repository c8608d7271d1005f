//! Transport and authentication kernel.
//!
//! Exchange-agnostic plumbing shared by the REST and WebSocket clients:
//!
//! - `signer`: payload envelope, single canonical encode step, HMAC-SHA384 headers
//! - `nonce`: pluggable nonce sources
//! - `codec`: V2 control messages out, JSON frames in
//! - `transport`: the socket seam and its `tokio-tungstenite` implementation
//! - `registry`: named sockets, their state machine and the event relay
//! - `rest`: the HTTP seam and its `reqwest` implementation
//!
//! # Signing a request
//! ```rust
//! use gemini_api::core::kernel::{sign, encode_payload, Payload};
//!
//! # fn example() -> Result<(), gemini_api::GeminiError> {
//! let payload = Payload::new("/v1/balances", 1_700_000_000_000, ());
//! let encoded = encode_payload(&payload)?;
//! let headers = sign("account-key", "account-secret", &encoded)?;
//! assert_eq!(headers.payload, encoded);
//! # Ok(())
//! # }
//! ```
pub mod codec;
pub mod nonce;
pub mod registry;
pub mod rest;
pub mod signer;
pub mod transport;

pub use codec::{decode_frame, encode_control};
pub use nonce::{EpochMillis, EpochSeconds, NonceProvider};
pub use registry::{SocketRegistry, SocketState};
pub use rest::{ReqwestRest, RestClient, RestClientConfig};
pub use signer::{encode_payload, sign, sign_payload, AuthHeaders, HmacSigner, Payload, Signer};
pub use transport::{Outbound, SocketHandle, TransportEvent, TungsteniteTransport, WsConfig, WsTransport};
