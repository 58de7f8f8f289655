//! Ladder Preview Binary
//!
//! Loads a market maker config, validates it and prints the entry ladder and
//! per-order quantity the strategy would quote at a given price and balance.
//! Nothing is sent to an exchange.
//!
//! ```bash
//! cargo run --bin ladder_preview -- maker.toml 65000 0.05
//! ```

use std::process;

use log::{error, info, warn};

use grid_market_maker::maker::{
    compute_ladder, compute_quantity, init_logging, side_for_price, step_interval,
};
use grid_market_maker::Settings;

fn usage() -> ! {
    eprintln!("Usage: ladder_preview <config.toml> <reference_price> <balance>");
    process::exit(2);
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        usage();
    }

    let (Ok(reference_price), Ok(balance)) = (args[2].parse::<f64>(), args[3].parse::<f64>())
    else {
        usage();
    };

    let settings = match Settings::new(&args[1]) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load config '{}': {}", args[1], e);
            process::exit(1);
        }
    };
    init_logging(&settings.log.level);

    let strategy = &settings.strategy;
    info!(
        "{} on {:?} (rest {}, stream {}), balance in {}",
        strategy.symbol,
        strategy.endpoint,
        strategy.endpoint.rest_url(),
        strategy.endpoint.ws_url(),
        strategy.balance_coin()
    );
    if strategy.endpoint.is_mainnet() {
        warn!("Config targets mainnet; these orders would trade real funds");
    }

    let ladder = match compute_ladder(reference_price, strategy.spread, strategy.order_count) {
        Ok(ladder) => ladder,
        Err(e) => {
            error!("Cannot build ladder: {}", e);
            process::exit(1);
        }
    };
    let quantity = compute_quantity(
        balance,
        reference_price,
        strategy.margin_fraction,
        strategy.order_count,
    );

    println!(
        "step={} quantity={} reset={}s",
        step_interval(strategy.spread, strategy.order_count),
        quantity,
        strategy.order_reset_secs
    );
    for price in ladder.iter() {
        println!("{:>4} {}", side_for_price(price, reference_price).as_str(), price);
    }
}
