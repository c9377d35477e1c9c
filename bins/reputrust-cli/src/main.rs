//! reputrust-cli: command-line client for the reputation & trust core's
//! JSON-RPC surface.
//!
//! Talks to a running `reputrust-node` over HTTP JSON-RPC. Unlike the
//! server side, the CLI does not depend on the generated `#[rpc(server)]`
//! trait; it issues untyped `request` calls through a plain
//! `jsonrpsee::http_client::HttpClient` and prints the JSON response,
//! which keeps this binary decoupled from the node's internal crate.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use serde_json::Value;

/// Reputrust command-line RPC client.
#[derive(Parser)]
#[command(name = "reputrust-cli")]
#[command(version, about = "CLI client for the reputrust JSON-RPC surface")]
struct Cli {
    /// RPC endpoint URL.
    #[arg(long, default_value = "http://127.0.0.1:8645")]
    rpc_endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up a single agent by address.
    GetAgent(AddressArgs),
    /// Search agents by filters.
    SearchAgents(SearchAgentsArgs),
    /// Find the shortest trust path between two agents.
    TrustPath(PairArgs),
    /// Compute the blended direct/transitive trust score between two agents.
    TransitiveTrust(PairArgs),
    /// Top agents by normalized authority (PageRank).
    TopByAuthority(LimitArgs),
    /// Agents whose Sybil risk score meets a threshold.
    SybilRisk(SybilRiskArgs),
    /// Alerts raised since an optional timestamp.
    RecentAlerts(RecentAlertsArgs),
    /// Observe a payment event (for local testing against a dev node).
    ObservePayment(ObservePaymentArgs),
    /// Submit a payment-gated vote.
    SubmitVote(SubmitVoteArgs),
    /// Submit a free endorsement.
    SubmitEndorsement(SubmitEndorsementArgs),
    /// Per-task last-tick/last-success health of the periodic scheduler.
    SchedulerHealth,
}

#[derive(Args)]
struct AddressArgs {
    address: String,
}

#[derive(Args)]
struct PairArgs {
    from_address: String,
    to_address: String,
}

#[derive(Args)]
struct LimitArgs {
    #[arg(long, default_value_t = 20)]
    limit: usize,
}

#[derive(Args)]
struct SybilRiskArgs {
    #[arg(long, default_value_t = 50.0)]
    min_risk: f64,
    #[arg(long, default_value_t = 20)]
    limit: usize,
}

#[derive(Args)]
struct RecentAlertsArgs {
    /// RFC3339 timestamp; alerts before this are omitted.
    #[arg(long)]
    since: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Args)]
struct SearchAgentsArgs {
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    min_score: Option<u32>,
    #[arg(long)]
    tier: Option<String>,
    #[arg(long)]
    search: Option<String>,
    #[arg(long, default_value_t = 50)]
    limit: usize,
    #[arg(long, default_value_t = 0)]
    offset: usize,
}

#[derive(Args)]
struct ObservePaymentArgs {
    signature: String,
    payer_address: String,
    payee_address: String,
    amount_micros: i64,
    #[arg(long, default_value = "USDC")]
    currency: String,
    #[arg(long, default_value = "base")]
    network: String,
    #[arg(long, default_value = "coinbase")]
    facilitator: String,
    #[arg(long, default_value = "confirmed")]
    status: String,
}

#[derive(Args)]
struct SubmitVoteArgs {
    receipt_id: String,
    voter_address: String,
    subject_address: String,
    #[arg(long, default_value = "up")]
    polarity: String,
    #[arg(long, default_value_t = 90.0)]
    response_quality: f64,
    #[arg(long, default_value_t = 90.0)]
    response_speed: f64,
    #[arg(long, default_value_t = 90.0)]
    accuracy: f64,
    #[arg(long, default_value_t = 90.0)]
    professionalism: f64,
}

#[derive(Args)]
struct SubmitEndorsementArgs {
    issuer_address: String,
    subject_address: String,
    endorsement_type: String,
    claim: String,
    #[arg(long, default_value_t = 80.0)]
    confidence: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let client = HttpClientBuilder::default()
        .build(&cli.rpc_endpoint)
        .context("failed to build RPC client")?;

    let result = dispatch(&client, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn dispatch(client: &HttpClient, command: Commands) -> Result<Value> {
    match command {
        Commands::GetAgent(args) => {
            Ok(client.request("getAgent", rpc_params![args.address]).await?)
        }
        Commands::SearchAgents(args) => Ok(client
            .request(
                "searchAgents",
                rpc_params![
                    args.category,
                    args.min_score,
                    args.tier,
                    Option::<Vec<String>>::None,
                    args.search,
                    Option::<String>::None,
                    Option::<String>::None,
                    Some(args.limit),
                    Some(args.offset)
                ],
            )
            .await?),
        Commands::TrustPath(args) => Ok(client
            .request("trustPath", rpc_params![args.from_address, args.to_address])
            .await?),
        Commands::TransitiveTrust(args) => Ok(client
            .request("transitiveTrust", rpc_params![args.from_address, args.to_address])
            .await?),
        Commands::TopByAuthority(args) => Ok(client
            .request("topByAuthority", rpc_params![args.limit])
            .await?),
        Commands::SybilRisk(args) => Ok(client
            .request("sybilRisk", rpc_params![args.min_risk, args.limit])
            .await?),
        Commands::RecentAlerts(args) => Ok(client
            .request("recentAlerts", rpc_params![args.since])
            .await?),
        Commands::ObservePayment(args) => Ok(client
            .request(
                "observePayment",
                rpc_params![
                    args.signature,
                    args.payer_address,
                    args.payee_address,
                    args.amount_micros,
                    args.currency,
                    args.network,
                    args.facilitator,
                    args.status,
                    chrono::Utc::now(),
                    Option::<String>::None
                ],
            )
            .await?),
        Commands::SubmitVote(args) => Ok(client
            .request(
                "submitVote",
                rpc_params![
                    args.receipt_id,
                    args.voter_address,
                    args.subject_address,
                    args.polarity,
                    args.response_quality,
                    args.response_speed,
                    args.accuracy,
                    args.professionalism,
                    Option::<String>::None
                ],
            )
            .await?),
        Commands::SubmitEndorsement(args) => Ok(client
            .request(
                "submitEndorsement",
                rpc_params![
                    args.issuer_address,
                    args.subject_address,
                    args.endorsement_type,
                    args.claim,
                    args.confidence,
                    Option::<String>::None
                ],
            )
            .await?),
        Commands::SchedulerHealth => Ok(client.request("schedulerHealth", rpc_params![]).await?),
    }
}
