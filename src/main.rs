use anyhow::{bail, Context};
use rust_decimal::Decimal;
use spotline::core::config::ConfigError;
use spotline::exchanges::binance::converters::convert_binance_market;
use spotline::exchanges::binance::create_binance_transport;
use spotline::utils::{format_millis, init_tracing};
use spotline::{
    BinanceTransport, ClientConfig, Environment, LoggingTickerHandler, OrderEngine, SessionConfig,
    TickerSession, Valuation,
};
use std::time::Duration;
use tracing::{info, warn};

const USAGE: &str = "usage:
  spotline info  [SYMBOL]
  spotline buy   SYMBOL QUOTE_QTY
  spotline sell  SYMBOL BASE_QTY
  spotline watch SYMBOL SECONDS QUOTE_QTY TARGET_QTY";

fn load_config() -> anyhow::Result<ClientConfig> {
    #[cfg(feature = "env-file")]
    let loaded = ClientConfig::from_env_file(".env");
    #[cfg(not(feature = "env-file"))]
    let loaded = ClientConfig::from_env();

    match loaded {
        Ok(config) => Ok(config),
        Err(ConfigError::MissingEnvironmentVariable(var)) => {
            let environment = Environment::from_name(&std::env::var("ENV").unwrap_or_default());
            warn!(missing = %var, %environment, "No credentials, running read-only");
            Ok(ClientConfig::read_only(environment))
        }
        Err(e) => Err(e.into()),
    }
}

fn decimal_arg(args: &[String], index: usize, name: &str) -> anyhow::Result<Decimal> {
    let raw = args
        .get(index)
        .with_context(|| format!("missing {}\n{}", name, USAGE))?;
    raw.parse::<Decimal>()
        .with_context(|| format!("{} must be a decimal, got '{}'", name, raw))
}

fn symbol_arg(args: &[String], index: usize) -> anyhow::Result<String> {
    args.get(index)
        .map(|s| s.to_uppercase())
        .with_context(|| format!("missing SYMBOL\n{}", USAGE))
}

async fn info(transport: &BinanceTransport, symbol: Option<&str>) -> anyhow::Result<()> {
    let rest = transport.rest();

    rest.ping().await.context("exchange unreachable")?;
    let time = rest.server_time().await?;
    info!(server_time = %format_millis(time.server_time), "Connection OK");

    let exchange_info = rest.exchange_info(symbol).await?;
    for market in exchange_info.symbols.into_iter().take(10) {
        let market = convert_binance_market(market);
        info!(
            symbol = %market.symbol,
            status = %market.status,
            base = %market.base_asset,
            quote = %market.quote_asset,
            quote_order_qty_market = market.quote_order_qty_market_allowed,
            "Market"
        );
    }

    if let Some(symbol) = symbol {
        let ticker = rest.price_ticker(symbol).await?;
        info!(symbol = %ticker.symbol, price = %ticker.price, "Price");
    }

    match rest.account_status().await {
        Ok(status) => info!(status = %status.data, "Account"),
        Err(e) => warn!(error = %e, "Account status unavailable"),
    }

    Ok(())
}

async fn watch(
    transport: BinanceTransport,
    symbol: String,
    seconds: u64,
    valuation: Valuation,
) -> anyhow::Result<()> {
    let session = TickerSession::new(
        transport,
        SessionConfig {
            symbols: vec![symbol],
            lifetime: Duration::from_secs(seconds),
            valuation,
        },
    );

    let stop = session.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping stream");
            stop.cancel();
        }
    });

    let report = session.run(&mut LoggingTickerHandler).await?;
    info!(
        end_reason = ?report.end_reason,
        updates = report.updates_handled,
        errors = report.errors_reported,
        "Stream finished"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info,spotline=debug");

    let config = load_config()?;
    info!(
        environment = %config.environment,
        rest = %config.rest_base_url,
        stream = %config.stream_base_url,
        "Starting"
    );

    let transport = create_binance_transport(&config)?;
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        None | Some("info") => {
            let symbol = args.get(1).map(|s| s.to_uppercase());
            info(&transport, symbol.as_deref()).await
        }
        Some("buy") => {
            let symbol = symbol_arg(&args, 1)?;
            let quote = decimal_arg(&args, 2, "QUOTE_QTY")?;
            let fill = OrderEngine::new(transport)
                .buy(&symbol, quote, Decimal::ZERO)
                .await?;
            info!(
                received = %fill.buy_received_quantity(),
                price = %fill.fill_price,
                commission = %fill.commission,
                commission_asset = %fill.commission_asset,
                "Bought"
            );
            Ok(())
        }
        Some("sell") => {
            let symbol = symbol_arg(&args, 1)?;
            let base = decimal_arg(&args, 2, "BASE_QTY")?;
            let fill = OrderEngine::new(transport)
                .sell(&symbol, Decimal::ZERO, base)
                .await?;
            info!(
                proceeds = %fill.sell_proceeds(),
                commission = %fill.sell_commission(),
                commission_asset = %fill.commission_asset,
                "Sold"
            );
            Ok(())
        }
        Some("watch") => {
            let symbol = symbol_arg(&args, 1)?;
            let seconds = args
                .get(2)
                .map(|s| s.parse::<u64>())
                .transpose()
                .context("SECONDS must be a whole number")?
                .unwrap_or(20);
            let quote = decimal_arg(&args, 3, "QUOTE_QTY")?;
            let target = decimal_arg(&args, 4, "TARGET_QTY")?;
            watch(transport, symbol, seconds, Valuation::new(quote, target)).await
        }
        Some(other) => bail!("unknown command '{}'\n{}", other, USAGE),
    }
}
