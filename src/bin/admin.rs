use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::{Address, B256};
use sqlx::postgres::PgPoolOptions;

use registry_revealer::crypto::compute_mirror_key;
use registry_revealer::infra::{PgDisputeIndex, PgRunLease, PgVoteMirror};
use registry_revealer::ledger::{EvmArbitratorGateway, GatewayConfig};
use registry_revealer::metrics::MetricsRegistry;
use registry_revealer::worker::{RevealWorker, RevealWorkerConfig};

fn print_help() {
    eprintln!(
        "\
revealer-admin

USAGE:
  revealer-admin <command> [options]

COMMANDS:
  migrate        Run database migrations
  run-reveal     Execute one reveal pass and print the summary
  mirror-key     Derive the vote-mirror key for a committed vote

COMMON OPTIONS:
  --database-url <postgres_url>    (defaults to env DATABASE_URL)

mirror-key OPTIONS:
  --arbitrator <0x address>       (required)
  --dispute-id <n>                (required)
  --voter <0x address>            (required)
  --commit-hash <0x hex32>        (required)

ENV (run-reveal):
  REVEALER_RPC_URL, REVEALER_PRIVATE_KEY, CHAIN_ID, MIRROR_ENCRYPTION_KEY
"
    );
}

fn require_database_url(database_url: Option<String>) -> anyhow::Result<String> {
    database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required (or pass --database-url)"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args: VecDeque<String> = std::env::args().skip(1).collect();
    let Some(command) = args.pop_front() else {
        print_help();
        return Ok(());
    };

    if matches!(command.as_str(), "-h" | "--help" | "help") {
        print_help();
        return Ok(());
    }

    match command.as_str() {
        "migrate" => {
            let mut database_url: Option<String> = None;
            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--database-url" => {
                        database_url =
                            Some(args.pop_front().ok_or_else(|| {
                                anyhow::anyhow!("missing value for --database-url")
                            })?);
                    }
                    "-h" | "--help" => {
                        print_help();
                        return Ok(());
                    }
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            let database_url = require_database_url(database_url)?;
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&database_url)
                .await?;
            registry_revealer::migrations::run_postgres(&pool).await?;
            println!("ok: migrations applied");
            Ok(())
        }
        "run-reveal" => {
            let mut database_url: Option<String> = None;
            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--database-url" => {
                        database_url =
                            Some(args.pop_front().ok_or_else(|| {
                                anyhow::anyhow!("missing value for --database-url")
                            })?);
                    }
                    "-h" | "--help" => {
                        print_help();
                        return Ok(());
                    }
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            let database_url = require_database_url(database_url)?;
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&database_url)
                .await?;
            registry_revealer::migrations::run_postgres(&pool).await?;

            let gateway_config = GatewayConfig::from_env()
                .ok_or_else(|| anyhow::anyhow!("set REVEALER_RPC_URL and REVEALER_PRIVATE_KEY"))?;
            let gateway = Arc::new(EvmArbitratorGateway::new(gateway_config)?);

            let config = RevealWorkerConfig::from_env().with_chain_id(gateway.chain_id());
            let worker = RevealWorker::new(
                config,
                Arc::new(PgDisputeIndex::new(pool.clone())),
                Arc::new(PgVoteMirror::from_env(pool.clone())?),
                gateway,
                Arc::new(PgRunLease::new(pool)),
                Arc::new(MetricsRegistry::new()),
            );

            let summary = worker.run_once().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        "mirror-key" => {
            let mut arbitrator: Option<Address> = None;
            let mut dispute_id: Option<u64> = None;
            let mut voter: Option<Address> = None;
            let mut commit_hash: Option<B256> = None;

            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--arbitrator" => {
                        let raw = args
                            .pop_front()
                            .ok_or_else(|| anyhow::anyhow!("missing value for --arbitrator"))?;
                        arbitrator = Some(Address::from_str(&raw)?);
                    }
                    "--dispute-id" => {
                        let raw = args
                            .pop_front()
                            .ok_or_else(|| anyhow::anyhow!("missing value for --dispute-id"))?;
                        dispute_id = Some(raw.parse()?);
                    }
                    "--voter" => {
                        let raw = args
                            .pop_front()
                            .ok_or_else(|| anyhow::anyhow!("missing value for --voter"))?;
                        voter = Some(Address::from_str(&raw)?);
                    }
                    "--commit-hash" => {
                        let raw = args
                            .pop_front()
                            .ok_or_else(|| anyhow::anyhow!("missing value for --commit-hash"))?;
                        commit_hash = Some(B256::from_str(&raw)?);
                    }
                    "-h" | "--help" => {
                        print_help();
                        return Ok(());
                    }
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            let arbitrator = arbitrator.ok_or_else(|| anyhow::anyhow!("--arbitrator required"))?;
            let dispute_id = dispute_id.ok_or_else(|| anyhow::anyhow!("--dispute-id required"))?;
            let voter = voter.ok_or_else(|| anyhow::anyhow!("--voter required"))?;
            let commit_hash =
                commit_hash.ok_or_else(|| anyhow::anyhow!("--commit-hash required"))?;

            let key = compute_mirror_key(&arbitrator, dispute_id, &voter, &commit_hash);
            println!("{}", hex::encode(key));
            Ok(())
        }
        other => {
            print_help();
            anyhow::bail!("unknown command: {other}")
        }
    }
}
