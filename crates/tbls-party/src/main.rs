//! TBLS Party CLI
//!
//! Committee member tools for threshold BLS key generation:
//! - simulate a full DKG epoch across an in-process committee
//! - inspect persisted epoch summaries

use anyhow::Result;
use clap::{Parser, Subcommand};
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::path::PathBuf;
use tbls_dkg::{backend, CryptoBackend, Dkg, DkgConfig, PartyId, VvecMessage};
use tbls_store::{FileStore, SummaryStore};
use tracing::{info, Level};

/// TBLS Party - committee member node tools
#[derive(Parser)]
#[command(name = "tbls-party")]
#[command(about = "Threshold BLS DKG committee tools")]
#[command(version)]
struct Cli {
    /// Data directory for epoch summaries
    #[arg(short, long, env = "TBLS_DATA_DIR", default_value = "./data")]
    dest: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full DKG epoch across an in-process committee
    Simulate {
        /// Threshold (t-of-n)
        #[arg(short, long)]
        t: usize,

        /// Committee size
        #[arg(short, long)]
        n: usize,

        /// Epoch identifier (magic block number)
        #[arg(short, long)]
        epoch: i64,

        /// RNG seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print a persisted epoch summary
    Show {
        /// Epoch identifier (magic block number)
        #[arg(short, long)]
        epoch: i64,

        /// Committee member whose summary to read
        #[arg(short, long, default_value_t = 0)]
        member: usize,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate { t, n, epoch, seed } => {
            run_simulate(&cli, t, n, epoch, seed)?;
        }
        Commands::Show { epoch, member } => {
            run_show(&cli, epoch, member)?;
        }
    }

    Ok(())
}

fn run_simulate(cli: &Cli, t: usize, n: usize, epoch: i64, seed: Option<u64>) -> Result<()> {
    let seed = seed.unwrap_or_else(rand::random);
    info!(t, n, epoch, seed, "starting DKG epoch simulation");

    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let crypto = CryptoBackend::new();
    let committee = PartyId::committee(n)?;

    let mut members = Vec::with_capacity(n);
    for index in 0..n {
        let config = DkgConfig::new(t, n, epoch, index)?;
        members.push(Dkg::new(&crypto, config, &mut rng)?);
    }

    // Round 1: every member publishes its verification vector
    let vvec_msgs: Vec<VvecMessage> = members
        .iter()
        .map(|m| VvecMessage::new(m.id(), m.vvec()))
        .collect();
    for member in members.iter_mut() {
        for msg in &vvec_msgs {
            member.receive_vvec(msg.sender, msg.decode()?)?;
        }
    }
    info!("verification vectors exchanged");

    // Round 2: pairwise share distribution, verified on receipt
    for member in members.iter_mut() {
        for id in &committee {
            member.compute_share_for(id)?;
        }
    }
    for recipient in 0..n {
        let recipient_id = committee[recipient];
        let mut inbound = Vec::with_capacity(n);
        for sender in &members {
            inbound.push((sender.id(), sender.share_for(&recipient_id)?));
        }
        for (sender, msg) in inbound {
            members[recipient].verify_share(&sender, &msg.share)?;
            members[recipient].receive_share(sender, msg.share)?;
        }
    }
    info!("secret shares exchanged and verified");

    // Round 3: aggregate, then cross-check the assembled group key
    for member in members.iter_mut() {
        member.aggregate()?;
    }
    let group_key = members[0].group_public_key()?;
    for member in &members {
        anyhow::ensure!(
            member.group_public_key()? == group_key,
            "group public key mismatch across committee members"
        );
    }

    // Persist one summary per member data directory
    let random_seed_vc = rng.next_u64() as i64;
    for (index, member) in members.iter_mut().enumerate() {
        member.set_random_seed_vc(random_seed_vc)?;
        let summary = member.summarize()?;
        let store = FileStore::new(cli.dest.join(format!("member-{index}")));
        store.write(&summary)?;
    }

    info!(
        epoch,
        group_public_key = backend::g2_to_hex(&group_key),
        "DKG epoch complete, summaries saved"
    );

    println!("Group Public Key: {}", backend::g2_to_hex(&group_key));

    Ok(())
}

fn run_show(cli: &Cli, epoch: i64, member: usize) -> Result<()> {
    let store = FileStore::new(cli.dest.join(format!("member-{member}")));
    let summary = store.read(epoch)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
