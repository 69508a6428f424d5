use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use arena_engine::{ForfeitReason, MatchResult, Role, Side, Submission, TurnAction};
use arena_protocol::commitment::{commit_parts, hash_reveal};
use arena_protocol::mock::InMemoryChain;
use arena_protocol::wire::commit_amount;
use arena_protocol::{
    create_commitment, first_standing_attack, open_match, AccountId, ArenaConfig, ArenaContext,
    BattleSession, DraftSession, GuardState, MemoryStore, Ports, ProtocolError, RoundProgress,
    Settlement, StakeState, TransferRequest, TransferSubmitter, STAKE_AMOUNT,
};

fn config() -> ArenaConfig {
    ArenaConfig::default()
        .with_poll_interval(Duration::from_millis(10))
        .with_retry(2, Duration::from_millis(5))
        .with_recall_blocks(500)
}

async fn player(chain: &InMemoryChain, name: &str, config: ArenaConfig) -> Arc<ArenaContext> {
    let account = AccountId::new(name);
    chain.fund(&account, &config.faucet_id, 3 * STAKE_AMOUNT);
    let ports = Ports::from_chain(Arc::new(chain.clone()), Arc::new(MemoryStore::new()));
    ArenaContext::init(account, ports, config).await.unwrap()
}

struct Finished {
    result: MatchResult,
    rounds: u32,
    payout: u64,
}

async fn play(ctx: Arc<ArenaContext>, role: Role, opponent: AccountId, vault: AccountId) -> Finished {
    let mut lobby = open_match(&ctx, role, &opponent).await.unwrap();

    let mut draft = DraftSession::open(ctx.clone(), role, opponent.clone(), lobby.handled.clone()).unwrap();
    let teams = draft.run(|d| d.pool()[0]).await.unwrap();

    let mut ignore: HashSet<_> = lobby.handled.clone();
    ignore.extend(draft.processed().iter().cloned());
    let mut battle = BattleSession::start(ctx.clone(), role, opponent, teams, ignore)
        .await
        .unwrap();
    let outcome = battle.run(first_standing_attack).await.unwrap();

    lobby.settlement.finish(outcome.result).unwrap();
    let payout = lobby.settlement.settle(&ctx, &vault).await.unwrap();
    assert_eq!(lobby.settlement.state(), StakeState::Withdrawn);
    Finished {
        result: outcome.result,
        rounds: outcome.total_rounds,
        payout,
    }
}

#[tokio::test(start_paused = true)]
async fn full_match_settles_consistently() {
    let chain = InMemoryChain::new();
    let host = player(&chain, "host", config()).await;
    let joiner = player(&chain, "joiner", config()).await;
    let host_vault = AccountId::new("host-vault");
    let joiner_vault = AccountId::new("joiner-vault");

    let (a, b) = tokio::join!(
        play(host.clone(), Role::Host, joiner.account().clone(), host_vault.clone()),
        play(joiner.clone(), Role::Joiner, host.account().clone(), joiner_vault.clone()),
    );

    assert_eq!(a.result, b.result);
    assert_eq!(a.rounds, b.rounds);
    assert!(a.rounds >= 1);
    assert_eq!(a.payout + b.payout, 2 * STAKE_AMOUNT);
    match a.result {
        MatchResult::Winner(Side::A) => assert_eq!(a.payout, 2 * STAKE_AMOUNT),
        MatchResult::Winner(Side::B) => assert_eq!(b.payout, 2 * STAKE_AMOUNT),
        MatchResult::Draw => assert_eq!(a.payout, STAKE_AMOUNT),
    }

    let faucet = config().faucet_id;
    assert_eq!(chain.balance(&host_vault, &faucet), a.payout);
    assert_eq!(chain.balance(&joiner_vault, &faucet), b.payout);
}

/// A local host battling a scripted opponent account.
async fn scripted_battle(chain: &InMemoryChain, config: ArenaConfig) -> (BattleSession, AccountId) {
    let host = player(chain, "host", config.clone()).await;
    let rival = AccountId::new("rival");
    chain.fund(&rival, &config.faucet_id, STAKE_AMOUNT);
    let session = BattleSession::start(host, Role::Host, rival.clone(), ([0, 1, 2], [3, 4, 5]), HashSet::new())
        .await
        .unwrap();
    (session, rival)
}

async fn send_from(chain: &InMemoryChain, from: &AccountId, amounts: &[u64]) {
    let faucet = ArenaConfig::default().faucet_id;
    for &amount in amounts {
        chain
            .submit(TransferRequest::new(from.clone(), AccountId::new("host"), faucet.clone(), amount))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn tampered_reveal_forfeits_the_round() {
    let chain = InMemoryChain::new();
    let (mut session, rival) = scripted_battle(&chain, config()).await;
    let mut choose = first_standing_attack;

    assert!(session.step(&mut choose).await.unwrap());
    assert_eq!(session.my_progress(), RoundProgress::Committed);

    let commit = create_commitment(7).unwrap();
    let parts = [commit_amount(commit.part1).unwrap(), commit_amount(commit.part2).unwrap()];
    send_from(&chain, &rival, &parts).await;
    // reveals a different move than the one committed
    send_from(&chain, &rival, &[8, commit.nonce_part1, commit.nonce_part2]).await;

    assert!(session.step(&mut choose).await.unwrap());
    let record = &session.battle().log()[0];
    assert_eq!(record.action_b, Submission::Forfeit(ForfeitReason::CommitmentMismatch));
    assert!(matches!(record.action_a, Submission::Action(_)));
    assert_eq!(session.battle().round(), 2);
    assert_eq!(session.my_progress(), RoundProgress::None);
}

#[tokio::test]
async fn matching_reveal_of_an_illegal_move_forfeits() {
    let chain = InMemoryChain::new();
    let (mut session, rival) = scripted_battle(&chain, config()).await;
    let mut choose = first_standing_attack;
    session.step(&mut choose).await.unwrap();

    let (n1, n2) = (1_234, 4_321);
    let (p1, p2) = commit_parts(&hash_reveal(25, n1, n2));
    send_from(&chain, &rival, &[commit_amount(p1).unwrap(), commit_amount(p2).unwrap()]).await;
    send_from(&chain, &rival, &[25, n1, n2]).await;

    session.step(&mut choose).await.unwrap();
    assert_eq!(
        session.battle().log()[0].action_b,
        Submission::Forfeit(ForfeitReason::InvalidMove)
    );
}

#[tokio::test]
async fn redelivered_notes_do_not_resolve_twice() {
    let chain = InMemoryChain::new();
    let (mut session, rival) = scripted_battle(&chain, config()).await;
    let mut choose = first_standing_attack;
    session.step(&mut choose).await.unwrap();

    let commit = create_commitment(7).unwrap();
    send_from(&chain, &rival, &[commit_amount(commit.part1).unwrap(), commit_amount(commit.part2).unwrap()]).await;
    send_from(&chain, &rival, &[commit.move_value, commit.nonce_part1, commit.nonce_part2]).await;
    session.step(&mut choose).await.unwrap();
    assert_eq!(session.battle().log().len(), 1);
    assert_eq!(
        session.battle().log()[0].action_b,
        Submission::Action(TurnAction { champion_id: 3, ability_index: 0 })
    );

    // the same notes are still in the inbox; round two only commits
    session.step(&mut choose).await.unwrap();
    session.step(&mut choose).await.unwrap();
    assert_eq!(session.battle().log().len(), 1);
    assert_eq!(session.opponent_progress(), RoundProgress::None);
}

#[tokio::test(start_paused = true)]
async fn sync_failure_after_resolution_does_not_replay_the_round() {
    let chain = InMemoryChain::new();
    let (mut session, rival) = scripted_battle(&chain, config()).await;
    let mut choose = first_standing_attack;
    session.step(&mut choose).await.unwrap();

    let commit = create_commitment(7).unwrap();
    send_from(&chain, &rival, &[commit_amount(commit.part1).unwrap(), commit_amount(commit.part2).unwrap()]).await;
    send_from(&chain, &rival, &[commit.move_value, commit.nonce_part1, commit.nonce_part2]).await;
    assert!(session.ingest().await.unwrap());
    assert!(session.submit_pending().await.unwrap());

    // outlasts every retry of the post-resolution sync
    chain.fail_syncs(10);
    assert!(session.try_resolve().await.unwrap());
    assert_eq!(session.battle().log().len(), 1);
    assert_eq!(session.my_progress(), RoundProgress::None);
    assert_eq!(session.opponent_progress(), RoundProgress::None);

    chain.fail_syncs(0);
    session.step(&mut choose).await.unwrap();
    session.step(&mut choose).await.unwrap();
    assert_eq!(session.battle().log().len(), 1);
    assert_eq!(session.battle().round(), 2);
    assert_eq!(session.my_progress(), RoundProgress::Committed);
}

#[tokio::test(start_paused = true)]
async fn stalled_opponent_loses_by_timeout() {
    let chain = InMemoryChain::new();
    let (mut session, _rival) = scripted_battle(&chain, config().with_recall_blocks(5)).await;

    let err = session.claim_timeout().await.unwrap_err();
    assert!(matches!(err, ProtocolError::TimeoutNotReached { .. }));

    let outcome = session.run(first_standing_attack).await.unwrap();
    assert_eq!(outcome.result, MatchResult::Winner(Side::A));
    assert_eq!(outcome.total_rounds, 0);
    assert_eq!(session.my_progress(), RoundProgress::Committed);
}

#[tokio::test(start_paused = true)]
async fn failed_consumption_rolls_the_guard_back() {
    let chain = InMemoryChain::new();
    let cfg = config().with_recall_blocks(3);
    let host = player(&chain, "host", cfg.clone()).await;
    let joiner = player(&chain, "joiner", cfg).await;

    let mut winner = Settlement::new(Side::A);
    let mut loser = Settlement::new(Side::B);
    winner.lock(&host, joiner.account()).await.unwrap();
    let theirs = loser.lock(&joiner, host.account()).await.unwrap();
    winner.observe_opponent_stake(theirs.clone()).unwrap();
    assert_eq!(winner.state(), StakeState::BothStaked);

    winner.finish(MatchResult::Winner(Side::A)).unwrap();
    let vault = AccountId::new("vault");

    // more failures than the retry budget
    chain.fail_consumes(5);
    let err = winner.settle(&host, &vault).await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(winner.guard().state(&theirs), GuardState::Idle);
    assert_eq!(chain.is_consumed(&theirs), Some(false));

    chain.fail_consumes(0);
    let payout = winner.settle(&host, &vault).await.unwrap();
    assert_eq!(payout, 2 * STAKE_AMOUNT);
    assert_eq!(winner.guard().state(&theirs), GuardState::Done);
    assert_eq!(chain.balance(&vault, &ArenaConfig::default().faucet_id), 2 * STAKE_AMOUNT);

    // the loser has nothing to collect
    loser.finish(MatchResult::Winner(Side::A)).unwrap();
    assert_eq!(loser.settle(&joiner, &AccountId::new("loser-vault")).await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn draw_returns_each_stake_after_recall() {
    let chain = InMemoryChain::new();
    let cfg = config().with_recall_blocks(4);
    let host = player(&chain, "host", cfg.clone()).await;
    let joiner = player(&chain, "joiner", cfg).await;

    let mut a = Settlement::new(Side::A);
    let mut b = Settlement::new(Side::B);
    let stake_a = a.lock(&host, joiner.account()).await.unwrap();
    let stake_b = b.lock(&joiner, host.account()).await.unwrap();
    a.observe_opponent_stake(stake_b).unwrap();
    b.observe_opponent_stake(stake_a.clone()).unwrap();

    a.finish(MatchResult::Draw).unwrap();
    b.finish(MatchResult::Draw).unwrap();
    let vault_a = AccountId::new("vault-a");
    let vault_b = AccountId::new("vault-b");
    let (pa, pb) = tokio::join!(
        a.settle(&host, &vault_a),
        b.settle(&joiner, &vault_b),
    );
    assert_eq!(pa.unwrap(), STAKE_AMOUNT);
    assert_eq!(pb.unwrap(), STAKE_AMOUNT);
    assert_eq!(chain.is_consumed(&stake_a), Some(true));
}
