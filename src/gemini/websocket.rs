use crate::core::config::GeminiConfig;
use crate::core::errors::GeminiError;
use crate::core::kernel::nonce::{EpochMillis, NonceProvider};
use crate::core::kernel::registry::{SocketRegistry, SocketState};
use crate::core::kernel::signer::{sign_payload, AuthHeaders, Payload};
use crate::core::kernel::transport::{TungsteniteTransport, WsTransport};
use crate::core::kernel::codec::encode_control;
use crate::core::types::{ChannelEvent, ControlType, Subscription};
use crate::gemini::channel::{Channel, ORDERS_CHANNEL, ORDER_EVENTS_PATH, V2_CHANNEL};
use crate::gemini::types::{MarketDataParams, OrderEventsParams, OrderEventsPayload};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::instrument;

/// WebSocket side of the client.
///
/// Market, order-event and V2 sockets live side by side in one registry; each
/// is opened, closed and observed independently. Events from all of them
/// arrive on [`GeminiWs::events`], tagged with the channel name.
pub struct GeminiWs<T: WsTransport = TungsteniteTransport> {
    config: GeminiConfig,
    nonce: Arc<dyn NonceProvider>,
    registry: SocketRegistry<T>,
}

impl GeminiWs<TungsteniteTransport> {
    pub fn new(config: GeminiConfig) -> Self {
        Self::with_transport(config, TungsteniteTransport::new())
    }
}

impl<T: WsTransport> GeminiWs<T> {
    pub fn with_transport(config: GeminiConfig, transport: T) -> Self {
        Self {
            config,
            nonce: Arc::new(EpochMillis),
            registry: SocketRegistry::new(transport),
        }
    }

    /// Replace the nonce source used for the order events handshake
    pub fn with_nonce_provider(mut self, provider: impl NonceProvider + 'static) -> Self {
        self.nonce = Arc::new(provider);
        self
    }

    pub(crate) fn with_shared_nonce(mut self, provider: Arc<dyn NonceProvider>) -> Self {
        self.nonce = provider;
        self
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Receiver for `open`/`close`/`message`/`error` events of every channel.
    ///
    /// Events emitted while nobody is subscribed are dropped.
    pub fn events(&self) -> broadcast::Receiver<ChannelEvent> {
        self.registry.subscribe_events()
    }

    pub fn state(&self, channel: &Channel) -> SocketState {
        self.registry.state(channel.name())
    }

    pub fn open_channels(&self) -> Vec<String> {
        self.registry.open_channels()
    }

    /// Market channel for `symbol`, refusing names owned by the fixed channels
    fn market_channel(&self, symbol: Option<&str>) -> Result<Channel, GeminiError> {
        let symbol = symbol.unwrap_or(&self.config.default_symbol);
        if symbol == ORDERS_CHANNEL || symbol == V2_CHANNEL {
            return Err(GeminiError::InvalidParameters(format!(
                "'{}' is reserved and cannot be used as a market symbol",
                symbol
            )));
        }
        Ok(Channel::market(symbol))
    }

    /// Open the v1 market data socket for `symbol` (or the configured default)
    #[instrument(skip(self, params))]
    pub async fn connect_market(
        &self,
        symbol: Option<&str>,
        params: &MarketDataParams,
    ) -> Result<(), GeminiError> {
        let channel = self.market_channel(symbol)?;
        let url = channel.url(self.config.websocket_url(), &params.query_pairs())?;
        self.registry.connect(channel.name(), &url, &[]).await
    }

    pub async fn disconnect_market(&self, symbol: Option<&str>) -> Result<(), GeminiError> {
        let channel = self.market_channel(symbol)?;
        self.registry.disconnect(channel.name()).await
    }

    /// Signed handshake headers for the order events socket.
    ///
    /// Fails without touching the nonce provider when key or secret is missing.
    pub fn order_events_headers(&self, params: &OrderEventsParams) -> Result<AuthHeaders, GeminiError> {
        if let Some(missing) = self.config.missing_credential() {
            return Err(GeminiError::MissingCredentials(format!(
                "{} required for the order events channel",
                missing
            )));
        }

        let account = params.account.as_deref().or(self.config.account.as_deref());
        let payload = Payload::new(
            ORDER_EVENTS_PATH,
            self.nonce.nonce(),
            OrderEventsPayload { account },
        );
        sign_payload(self.config.api_key(), self.config.secret_key(), &payload)
    }

    /// Open the private order events socket, authenticated at the handshake
    #[instrument(skip(self, params))]
    pub async fn connect_orders(&self, params: &OrderEventsParams) -> Result<(), GeminiError> {
        let headers = self.order_events_headers(params)?;
        let channel = Channel::Orders;
        let url = channel.url(self.config.websocket_url(), &params.query_pairs())?;
        self.registry
            .connect(channel.name(), &url, &headers.to_pairs())
            .await
    }

    pub async fn disconnect_orders(&self) -> Result<(), GeminiError> {
        self.registry.disconnect(Channel::Orders.name()).await
    }

    /// Open the shared V2 market data socket
    #[instrument(skip(self))]
    pub async fn connect_v2(&self) -> Result<(), GeminiError> {
        let channel = Channel::V2;
        let url = channel.url(self.config.websocket_url(), &[])?;
        self.registry.connect(channel.name(), &url, &[]).await
    }

    pub async fn disconnect_v2(&self) -> Result<(), GeminiError> {
        self.registry.disconnect(Channel::V2.name()).await
    }

    /// Close any channel by identity
    pub async fn disconnect(&self, channel: &Channel) -> Result<(), GeminiError> {
        self.registry.disconnect(channel.name()).await
    }

    /// Send one JSON message on an open channel
    pub fn send_json<M: Serialize>(&self, channel: &Channel, message: &M) -> Result<(), GeminiError> {
        let text = serde_json::to_string(message)?;
        self.registry.send(channel.name(), text)
    }

    /// Send a `subscribe` control message on the V2 socket.
    ///
    /// The list is sent as given; composing the desired full subscription set
    /// is up to the caller.
    ///
    /// `Ok` means the frame was queued on the socket. Fails with
    /// [`GeminiError::NotConnected`] unless the V2 socket is open, and with
    /// [`GeminiError::Transport`] if its socket task has already stopped. A
    /// write that fails after queueing is reported as an `error` event on the
    /// `v2` channel.
    #[instrument(skip(self), fields(count = subscriptions.len()))]
    pub fn subscribe(&self, subscriptions: &[Subscription]) -> Result<(), GeminiError> {
        self.send_control(ControlType::Subscribe, subscriptions)
    }

    #[instrument(skip(self), fields(count = subscriptions.len()))]
    pub fn unsubscribe(&self, subscriptions: &[Subscription]) -> Result<(), GeminiError> {
        self.send_control(ControlType::Unsubscribe, subscriptions)
    }

    fn send_control(&self, kind: ControlType, subscriptions: &[Subscription]) -> Result<(), GeminiError> {
        let channel = Channel::V2;
        if self.registry.state(channel.name()) != SocketState::Open {
            return Err(GeminiError::NotConnected(format!(
                "{} socket is not open",
                channel.name()
            )));
        }
        let text = encode_control(kind, subscriptions)?;
        self.registry.send(channel.name(), text)
    }
}
