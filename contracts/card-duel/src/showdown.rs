//! Showdown comparator.
//!
//! `card = suit * 13 + rank`. Higher rank wins; equal ranks fall back to the
//! higher suit. Two distinct cards never tie.

use soroban_sdk::Address;

use crate::cipher::{EncryptedOps, Rhs};

pub const CARDS_PER_SUIT: u64 = 13;

/// Encrypted "`card0` beats `card1`".
pub fn first_beats_second<F: EncryptedOps>(
    fhe: &F,
    card0: &F::Handle,
    card1: &F::Handle,
) -> F::Handle {
    let rank0 = fhe.rem(card0, CARDS_PER_SUIT);
    let rank1 = fhe.rem(card1, CARDS_PER_SUIT);
    let suit0 = fhe.div(card0, CARDS_PER_SUIT);
    let suit1 = fhe.div(card1, CARDS_PER_SUIT);

    let higher_rank = fhe.gt(&rank0, Rhs::Enc(&rank1));
    let same_rank = fhe.eq(&rank0, Rhs::Enc(&rank1));
    let higher_suit = fhe.gt(&suit0, Rhs::Enc(&suit1));
    let suit_breaks_tie = fhe.and(&same_rank, Rhs::Enc(&higher_suit));

    fhe.or(&higher_rank, Rhs::Enc(&suit_breaks_tie))
}

/// Compare the two played cards and publish the outcome: both players are
/// granted the result and anyone may decrypt it.
pub fn settle<F: EncryptedOps>(
    fhe: &F,
    card0: &F::Handle,
    card1: &F::Handle,
    player0: &Address,
    player1: &Address,
) -> F::Handle {
    let player0_wins = first_beats_second(fhe, card0, card1);
    fhe.allow_this(&player0_wins);
    fhe.allow(&player0_wins, player0);
    fhe.allow(&player0_wins, player1);
    fhe.make_public(&player0_wins);
    player0_wins
}
