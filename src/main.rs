use gemini_api::gemini::MarketDataParams;
use gemini_api::{Channel, ChannelEvent, GeminiBuilder, GeminiConfig};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Credentials are optional here; market data is public
    let config = GeminiConfig::from_env("GEMINI").unwrap_or_else(|_| GeminiConfig::read_only());
    let symbol = config.default_symbol.clone();
    let client = GeminiBuilder::new().with_config(config).build()?;

    match client.rest.ticker(&symbol).await {
        Ok(ticker) => println!("{} bid {} ask {} last {}", symbol, ticker.bid, ticker.ask, ticker.last),
        Err(e) => println!("Error fetching ticker: {}", e),
    }

    let mut events = client.ws.events();
    let params = MarketDataParams {
        heartbeat: Some(true),
        top_of_book: Some(true),
        ..Default::default()
    };
    client.ws.connect_market(None, &params).await?;
    println!("{} is {}", symbol, client.ws.state(&Channel::market(&symbol)));

    let mut received = 0;
    while received < 5 {
        match tokio::time::timeout(Duration::from_secs(10), events.recv()).await {
            Ok(Ok(ChannelEvent::Message { channel, payload })) => {
                println!("[{}] {}", channel, payload);
                received += 1;
            }
            Ok(Ok(ChannelEvent::Error { channel, error })) => println!("[{}] error: {}", channel, error),
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                println!("Event stream lagged or closed: {}", e);
                break;
            }
            Err(_) => {
                println!("No market data within 10s");
                break;
            }
        }
    }

    client.ws.disconnect_market(None).await?;
    println!("{} is {}", symbol, client.ws.state(&Channel::market(&symbol)));

    Ok(())
}
