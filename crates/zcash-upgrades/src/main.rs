//! Prints the network upgrade status of a chain height.

use clap::Parser;
use serde::Serialize;
use tracing::{debug, info, subscriber::set_global_default};
use tracing_subscriber::filter::EnvFilter;

use zcash_upgrades::{
    blocks_until_next_upgrade, current_epoch, current_equihash_params,
    is_activation_height_for_any_upgrade, network_upgrade_state, next_activation_height,
    next_epoch, seconds_left_to_next_epoch, EquihashParams, Network, UpgradeIndex, UpgradeState,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Network to resolve upgrades for (mainnet, testnet, regtest)
    #[arg(long, env = "NETWORK", default_value = "mainnet")]
    network: Network,
    /// Chain height to inspect
    #[arg(long, allow_negative_numbers = true)]
    height: i32,
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
    /// Logging level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Serialize)]
struct UpgradeStatus {
    name: &'static str,
    branch_id: String,
    activation_height: Option<u32>,
    state: UpgradeState,
}

#[derive(Serialize)]
struct StatusReport {
    network: Network,
    height: i32,
    current_epoch: &'static str,
    branch_id: String,
    equihash: EquihashParams,
    activation_block: bool,
    next_upgrade: Option<&'static str>,
    next_activation_height: Option<u32>,
    blocks_until_next_upgrade: Option<u32>,
    seconds_until_next_upgrade: Option<i64>,
    upgrades: Vec<UpgradeStatus>,
}

fn init_tracing(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber_builder =
        tracing_subscriber::fmt::Subscriber::builder().with_env_filter(env_filter);

    let subscriber = subscriber_builder.with_writer(std::io::stderr).finish();
    set_global_default(subscriber).expect("Failed to set subscriber");
}

fn branch_id_hex(branch_id: u32) -> String {
    format!("{branch_id:#010x}")
}

fn build_report(network: Network, height: i32) -> StatusReport {
    let schedule = network.activation_schedule();
    let epoch = current_epoch(height, schedule);
    let next = next_epoch(height, schedule);

    let upgrades = UpgradeIndex::ALL
        .iter()
        .map(|&idx| UpgradeStatus {
            name: idx.info().name,
            branch_id: branch_id_hex(idx.branch_id()),
            activation_height: schedule.activation_height(idx.as_usize()),
            state: network_upgrade_state(height, schedule, idx),
        })
        .collect();

    StatusReport {
        network,
        height,
        current_epoch: epoch.info().name,
        branch_id: branch_id_hex(epoch.branch_id()),
        equihash: current_equihash_params(height, schedule),
        activation_block: is_activation_height_for_any_upgrade(height, schedule),
        next_upgrade: next.map(|idx| idx.info().name),
        next_activation_height: next_activation_height(height, schedule),
        blocks_until_next_upgrade: blocks_until_next_upgrade(height, schedule),
        seconds_until_next_upgrade: seconds_left_to_next_epoch(height, schedule),
        upgrades,
    }
}

fn print_report(report: &StatusReport) {
    println!("Network:        {}", report.network);
    println!("Height:         {}", report.height);
    println!(
        "Current epoch:  {} (branch id {})",
        report.current_epoch, report.branch_id
    );
    println!(
        "Equihash:       n={}, k={}",
        report.equihash.n, report.equihash.k
    );
    if report.activation_block {
        println!("This block activates {}", report.current_epoch);
    }
    match (
        report.next_upgrade,
        report.next_activation_height,
        report.blocks_until_next_upgrade,
    ) {
        (Some(name), Some(height), Some(blocks)) => println!(
            "Next upgrade:   {name} at height {height} ({blocks} blocks, ~{}s)",
            report.seconds_until_next_upgrade.unwrap_or_default()
        ),
        _ => println!("Next upgrade:   none scheduled"),
    }
    println!();
    for upgrade in &report.upgrades {
        let height = upgrade
            .activation_height
            .map(|height| height.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<12} {}  {:>10}  {}",
            upgrade.name, upgrade.branch_id, height, upgrade.state
        );
    }
}

fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    if cli.height < 0 {
        anyhow::bail!("Height must be non-negative, got {}", cli.height);
    }

    info!("Resolving upgrades for {} at height {}", cli.network, cli.height);
    let report = build_report(cli.network, cli.height);
    debug!("Current epoch is {}", report.current_epoch);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_before_ycash() {
        let report = build_report(Network::Mainnet, 419_200);
        assert_eq!(report.current_epoch, "Sapling");
        assert_eq!(report.branch_id, "0x76b809bb");
        assert!(report.activation_block);
        assert_eq!(report.next_upgrade, Some("Ycash"));
        assert_eq!(report.blocks_until_next_upgrade, Some(150_800));
        assert_eq!(report.seconds_until_next_upgrade, Some(150_800 * 150));
        assert_eq!(report.equihash, EquihashParams::DEFAULT);
        assert_eq!(report.upgrades.len(), UpgradeIndex::ALL.len());
    }

    #[test]
    fn test_report_json() {
        let report = build_report(Network::Regtest, 10);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["network"], "regtest");
        assert_eq!(json["current_epoch"], "Sprout");
        assert_eq!(json["upgrades"][1]["state"], "disabled");
        assert!(json["next_upgrade"].is_null());
    }

    #[test]
    fn test_cli_parses_network() {
        let cli = Cli::try_parse_from(["upgrade-status", "--network", "testnet", "--height", "5"])
            .unwrap();
        assert_eq!(cli.network, Network::Testnet);
        assert_eq!(cli.height, 5);
    }
}
