//! Local two-player arena match.
//!
//! Wires a host and a joiner against one in-memory chain and plays a whole
//! match: handshake, stakes, draft, battle and settlement. Each player runs
//! in its own task with its own context and store. The host's view of the
//! match is printed as JSON on stdout; logs go to stderr.
//!
//! ```bash
//! RUST_LOG=arena_protocol=debug ARENA_SIM_SEED=7 cargo run -p arena-sim
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::info;

use arena_engine::pack::unpack_champion_state;
use arena_engine::{Battle, Draft, MatchResult, Mvp, Role, Side, TurnAction, TurnRecord, TEAM_SIZE};
use arena_protocol::mock::InMemoryChain;
use arena_protocol::{
    open_match, AccountId, ArenaConfig, ArenaContext, BattleSession, DraftSession, MemoryStore,
    Ports, STAKE_AMOUNT,
};

const DEFAULT_SEED: u64 = 42;
/// Starting balance of each player.
const FUNDING: u64 = 5 * STAKE_AMOUNT;

#[derive(Debug, Serialize)]
struct MatchReport {
    role: Role,
    result: MatchResult,
    total_rounds: u32,
    mvp: Option<Mvp>,
    payout: u64,
    /// Champion ids per side, in team order.
    teams: [[u8; TEAM_SIZE]; 2],
    /// Packed final champion states per side, in team order.
    state_words: [[[u64; 4]; TEAM_SIZE]; 2],
    log: Vec<TurnRecord>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // fast local blocks unless overridden
    let config = ArenaConfig::from_env_over(
        ArenaConfig::default()
            .with_poll_interval(Duration::from_millis(25))
            .with_recall_blocks(300),
    );
    let seed = std::env::var("ARENA_SIM_SEED")
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(DEFAULT_SEED);
    info!(?config, seed, "starting local match");

    let chain = Arc::new(InMemoryChain::new());
    let host_id = AccountId::new("host");
    let joiner_id = AccountId::new("joiner");
    chain.fund(&host_id, &config.faucet_id, FUNDING);
    chain.fund(&joiner_id, &config.faucet_id, FUNDING);

    let host = context(&chain, host_id.clone(), config.clone()).await?;
    let joiner = context(&chain, joiner_id.clone(), config.clone()).await?;

    let host_task = tokio::spawn(play(host.clone(), Role::Host, joiner_id, seed));
    let joiner_task = tokio::spawn(play(joiner.clone(), Role::Joiner, host_id, seed.wrapping_add(1)));

    let host_report = host_task.await.context("host task panicked")??;
    let joiner_report = joiner_task.await.context("joiner task panicked")??;
    host.dispose();
    joiner.dispose();

    if host_report.result != joiner_report.result {
        anyhow::bail!(
            "players disagree on the result: host {:?}, joiner {:?}",
            host_report.result,
            joiner_report.result
        );
    }
    check_final_state(&host_report, &joiner_report)?;
    info!(
        result = ?host_report.result,
        rounds = host_report.total_rounds,
        host_payout = host_report.payout,
        joiner_payout = joiner_report.payout,
        "match finished"
    );

    println!("{}", serde_json::to_string_pretty(&host_report)?);
    Ok(())
}

async fn context(chain: &Arc<InMemoryChain>, account: AccountId, config: ArenaConfig) -> Result<Arc<ArenaContext>> {
    let ports = Ports::from_chain(chain.clone(), Arc::new(MemoryStore::new()));
    ArenaContext::init(account.clone(), ports, config)
        .await
        .with_context(|| format!("failed to initialise context for {account}"))
}

/// Lobby, draft, battle and settlement for one player.
async fn play(ctx: Arc<ArenaContext>, role: Role, opponent: AccountId, seed: u64) -> Result<MatchReport> {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut lobby = open_match(&ctx, role, &opponent).await?;

    let mut draft = DraftSession::open(ctx.clone(), role, opponent.clone(), lobby.handled.clone())?;
    let teams = draft.run(|d| pick_champion(d, &mut rng)).await?;

    let mut ignore: HashSet<_> = lobby.handled.clone();
    ignore.extend(draft.processed().iter().cloned());
    let mut battle = BattleSession::start(ctx.clone(), role, opponent, teams, ignore).await?;
    let outcome = battle
        .run(|b, side| choose_action(b, side, &mut rng))
        .await?;

    lobby.settlement.finish(outcome.result)?;
    let vault = AccountId::new(format!("{}-vault", ctx.account()));
    let payout = lobby.settlement.settle(&ctx, &vault).await?;

    let ended = battle.battle();
    Ok(MatchReport {
        role,
        result: outcome.result,
        total_rounds: outcome.total_rounds,
        mvp: outcome.mvp,
        payout,
        teams: [Side::A, Side::B].map(|side| {
            let team = ended.team(side);
            std::array::from_fn(|slot| team[slot].id)
        }),
        state_words: [ended.state_words(Side::A)?, ended.state_words(Side::B)?],
        log: ended.log().to_vec(),
    })
}

/// Both players must end with the same packed state for every champion.
fn check_final_state(host: &MatchReport, joiner: &MatchReport) -> Result<()> {
    if host.teams != joiner.teams {
        anyhow::bail!("players disagree on the teams: host {:?}, joiner {:?}", host.teams, joiner.teams);
    }
    for side in [Side::A, Side::B] {
        let i = side.index();
        for slot in 0..TEAM_SIZE {
            let (ours, theirs) = (host.state_words[i][slot], joiner.state_words[i][slot]);
            if ours == theirs {
                continue;
            }
            let champion_id = host.teams[i][slot];
            let ours = unpack_champion_state(ours, champion_id)?;
            let theirs = unpack_champion_state(theirs, champion_id)?;
            anyhow::bail!(
                "players disagree on {side:?} champion {champion_id}: host {ours:?}, joiner {theirs:?}"
            );
        }
    }
    Ok(())
}

fn pick_champion(draft: &Draft, rng: &mut StdRng) -> u8 {
    draft.pool().choose(rng).copied().unwrap_or_default()
}

/// Random ability of the fielded champion.
fn choose_action(battle: &Battle, side: Side, rng: &mut StdRng) -> TurnAction {
    let champion_id = battle
        .active_champion(side)
        .map(|c| c.id)
        .unwrap_or_default();
    TurnAction {
        champion_id,
        ability_index: rng.gen_range(0..2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(role: Role, battle: &Battle) -> MatchReport {
        MatchReport {
            role,
            result: MatchResult::Draw,
            total_rounds: battle.round() - 1,
            mvp: battle.mvp(),
            payout: 0,
            teams: [[0, 1, 2], [3, 4, 5]],
            state_words: [battle.state_words(Side::A).unwrap(), battle.state_words(Side::B).unwrap()],
            log: battle.log().to_vec(),
        }
    }

    fn opener(battle: &Battle, side: Side) -> arena_engine::Submission {
        arena_engine::Submission::Action(choose_action(battle, side, &mut StdRng::seed_from_u64(0)))
    }

    #[test]
    fn replayed_battles_agree_on_final_state() {
        let mut host = Battle::new([0, 1, 2], [3, 4, 5]).unwrap();
        let mut joiner = Battle::new([0, 1, 2], [3, 4, 5]).unwrap();
        for battle in [&mut host, &mut joiner] {
            let (a, b) = (opener(battle, Side::A), opener(battle, Side::B));
            battle.resolve_round(a, b).unwrap();
        }
        check_final_state(&report(Role::Host, &host), &report(Role::Joiner, &joiner)).unwrap();
    }

    #[test]
    fn diverged_state_is_reported_per_champion() {
        let host = Battle::new([0, 1, 2], [3, 4, 5]).unwrap();
        let mut joiner = Battle::new([0, 1, 2], [3, 4, 5]).unwrap();
        let (a, b) = (opener(&joiner, Side::A), opener(&joiner, Side::B));
        joiner.resolve_round(a, b).unwrap();

        let err = check_final_state(&report(Role::Host, &host), &report(Role::Joiner, &joiner)).unwrap_err();
        assert!(err.to_string().contains("champion 0"), "{err}");
    }
}
