use crate::core::kernel::rest::{ReqwestRest, RestClient};
use crate::core::kernel::transport::{TungsteniteTransport, WsTransport};
use crate::gemini::rest::GeminiRest;
use crate::gemini::websocket::GeminiWs;

/// REST and WebSocket halves of one account.
///
/// Build through [`GeminiBuilder`](crate::gemini::GeminiBuilder) so both halves
/// draw nonces from the same source.
pub struct GeminiClient<R: RestClient = ReqwestRest, T: WsTransport = TungsteniteTransport> {
    pub rest: GeminiRest<R>,
    pub ws: GeminiWs<T>,
}

impl<R: RestClient, T: WsTransport> GeminiClient<R, T> {
    pub fn new(rest: GeminiRest<R>, ws: GeminiWs<T>) -> Self {
        Self { rest, ws }
    }

    pub fn rest(&self) -> &GeminiRest<R> {
        &self.rest
    }

    pub fn ws(&self) -> &GeminiWs<T> {
        &self.ws
    }
}
