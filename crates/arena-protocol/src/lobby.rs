//! Join/accept handshake and stake lock.

use std::collections::HashSet;

use tracing::info;

use arena_engine::Role;

use crate::classifier::{decode_for_phase, DecodedNote, MatchPhase, Signal};
use crate::context::ArenaContext;
use crate::error::Result;
use crate::poller::{poll_until, Step};
use crate::ports::{AccountId, NoteId};
use crate::settlement::Settlement;
use crate::wire::{ACCEPT_AMOUNT, JOIN_AMOUNT};

/// A matched pair with both stakes locked.
#[derive(Debug)]
pub struct Lobby {
    pub role: Role,
    pub opponent: AccountId,
    pub settlement: Settlement,
    /// Opponent notes acted on here; later phases must not reinterpret them.
    pub handled: HashSet<NoteId>,
}

/// Run the handshake as `role` against `opponent`, then lock stakes.
///
/// The joiner announces itself and waits for the host's accept; the host
/// waits for the join before accepting.
pub async fn open_match(ctx: &ArenaContext, role: Role, opponent: &AccountId) -> Result<Lobby> {
    let mut handled = HashSet::new();

    match role {
        Role::Joiner => {
            ctx.send(opponent, JOIN_AMOUNT, None).await?;
            info!(host = %opponent, "join sent");
            let accept = wait_for_signal(ctx, opponent, Signal::Accept).await?;
            info!(note = %accept.note_id, "host accepted");
            handled.insert(accept.note_id);
        }
        Role::Host => {
            let join = wait_for_signal(ctx, opponent, Signal::Join).await?;
            info!(note = %join.note_id, joiner = %opponent, "join received");
            handled.insert(join.note_id);
            ctx.send(opponent, ACCEPT_AMOUNT, None).await?;
            info!("accept sent");
        }
    }

    let mut settlement = Settlement::new(role.side());
    settlement.lock(ctx, opponent).await?;
    let stake = wait_for_signal(ctx, opponent, Signal::Stake).await?;
    settlement.observe_opponent_stake(stake.note_id.clone())?;
    handled.insert(stake.note_id);

    Ok(Lobby {
        role,
        opponent: opponent.clone(),
        settlement,
        handled,
    })
}

/// Poll until the first lobby note carrying `signal` arrives from `opponent`.
async fn wait_for_signal(
    ctx: &ArenaContext,
    opponent: &AccountId,
    signal: Signal,
) -> Result<DecodedNote> {
    let pacer = ctx.pacer();
    poll_until(&pacer, || async move {
        let (_, inbox) = ctx.inbox().await?;
        let found = decode_for_phase(&inbox, opponent, MatchPhase::Lobby)
            .into_iter()
            .find(|(s, _)| *s == signal)
            .map(|(_, note)| note);
        Ok(match found {
            Some(note) => Step::Done(note),
            None => Step::Pending,
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::config::ArenaConfig;
    use crate::context::Ports;
    use crate::mock::InMemoryChain;
    use crate::persistence::MemoryStore;
    use crate::ports::AssetId;
    use crate::settlement::StakeState;
    use crate::wire::STAKE_AMOUNT;

    async fn player(chain: &InMemoryChain, name: &str) -> Arc<ArenaContext> {
        let config = ArenaConfig::default().with_poll_interval(Duration::from_millis(10));
        chain.fund(&AccountId::new(name), &config.faucet_id, 2 * STAKE_AMOUNT);
        let ports = Ports::from_chain(Arc::new(chain.clone()), Arc::new(MemoryStore::new()));
        ArenaContext::init(AccountId::new(name), ports, config).await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn handshake_locks_both_stakes() {
        let chain = InMemoryChain::new();
        let host = player(&chain, "host").await;
        let joiner = player(&chain, "joiner").await;

        let (hosted, joined) = tokio::join!(
            open_match(&host, Role::Host, joiner.account()),
            open_match(&joiner, Role::Joiner, host.account()),
        );
        let hosted = hosted.unwrap();
        let joined = joined.unwrap();

        assert_eq!(hosted.settlement.state(), StakeState::BothStaked);
        assert_eq!(joined.settlement.state(), StakeState::BothStaked);
        // join + stake on the host side, accept + stake on the joiner side
        assert_eq!(hosted.handled.len(), 2);
        assert_eq!(joined.handled.len(), 2);
        assert_eq!(
            hosted.settlement.opponent_stake_note(),
            joined.settlement.own_stake_note()
        );

        let faucet = AssetId::new("arena-faucet");
        let spent = STAKE_AMOUNT + JOIN_AMOUNT;
        assert_eq!(chain.balance(joiner.account(), &faucet), 2 * STAKE_AMOUNT - spent);
        let stakes: Vec<_> = chain
            .submitted()
            .into_iter()
            .filter(|r| r.amount == STAKE_AMOUNT)
            .collect();
        assert_eq!(stakes.len(), 2);
        assert!(stakes.iter().all(|r| r.recall_height.is_some()));
    }
}
