use rustls::crypto::ring::default_provider;
use std::error::Error;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use url::Url;
use venue_socket::{ClientConfig, ClientEvent, TradingSocketClient};

const DEFAULT_SYMBOLS: &str = "R_10";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging
    init_logging();

    let _ = default_provider().install_default();

    let config = config_from_env()?;
    let token = std::env::var("VENUE_API_TOKEN")
        .map_err(|_| "VENUE_API_TOKEN must be set to authorize with the venue")?;
    let symbols = std::env::var("VENUE_SYMBOLS")
        .unwrap_or_else(|_| DEFAULT_SYMBOLS.to_string())
        .split(',')
        .map(str::trim)
        .filter(|symbol| !symbol.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();

    info!(endpoint = %config.endpoint, app_id = config.app_id, ?symbols, "starting venue socket monitor");

    let client = TradingSocketClient::new(config);
    let mut events = client.subscribe_events();
    client.connect(&token).await?;

    for symbol in &symbols {
        if let Err(error) = client.subscribe_ticks(symbol) {
            warn!(%symbol, %error, "failed to subscribe to ticks");
        }
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("received ctrl-c, disconnecting");
                client.disconnect();
                break;
            }
            event = events.recv() => match event {
                Ok(event) => {
                    if !log_event(event) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "monitor lagged behind the event stream");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    let status = client.status();
    info!(
        connected = status.connected,
        subscriptions = status.active_subscription_count,
        contracts = status.active_contract_count,
        "monitor stopped"
    );
    Ok(())
}

/// Log one client event. Returns `false` once the client has given up reconnecting.
fn log_event(event: ClientEvent) -> bool {
    match event {
        ClientEvent::ConnectionChanged(connected) => info!(connected, "connection changed"),
        ClientEvent::AuthorizationChanged(authorized) => {
            info!(authorized, "authorization changed")
        }
        ClientEvent::AccountChanged(account) => info!(
            login_id = %account.login_id,
            currency = %account.currency,
            is_virtual = account.is_virtual,
            "account"
        ),
        ClientEvent::BalanceUpdate(balance) => {
            info!(balance = balance.balance, currency = %balance.currency, "balance")
        }
        ClientEvent::Tick(tick) => info!(
            symbol = %tick.symbol,
            quote = tick.quote,
            epoch = %tick.epoch,
            "tick"
        ),
        ClientEvent::TradeResult(result) => info!(
            contract_id = result.contract_id,
            buy_price = result.buy_price,
            "trade"
        ),
        ClientEvent::ContractUpdate(update) => info!(
            contract_id = update.contract_id,
            status = ?update.status,
            profit = ?update.profit,
            "contract update"
        ),
        ClientEvent::Reconnecting { attempt, delay } => {
            warn!(attempt, ?delay, "reconnecting")
        }
        ClientEvent::Error(error) if error.is_terminal() => {
            error!(%error, "client gave up");
            return false;
        }
        ClientEvent::Error(error) if error.is_transport() => warn!(%error, "transport error"),
        ClientEvent::Error(error) => error!(%error, "venue error"),
    }
    true
}

/// Build the client config from `VENUE_*` environment variables, falling back to defaults.
fn config_from_env() -> Result<ClientConfig, Box<dyn Error>> {
    let defaults = ClientConfig::default();

    let endpoint = match std::env::var("VENUE_WS_URL") {
        Ok(url) => Url::parse(&url)?,
        Err(_) => defaults.endpoint.clone(),
    };
    let app_id = std::env::var("VENUE_APP_ID")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(defaults.app_id);
    let debug = std::env::var("VENUE_DEBUG")
        .ok()
        .map(|s| matches!(s.as_str(), "1" | "true"))
        .unwrap_or(false);

    Ok(ClientConfig::new(endpoint, app_id).with_debug(debug))
}

/// Initialise logging. `LOG_FORMAT=json` switches to JSON lines.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
