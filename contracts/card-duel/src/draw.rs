//! Unique-draw engine.
//!
//! Picks a deck slot that the encrypted used-mask does not mark yet and marks
//! it, in a fixed sequence of coprocessor operations that never depends on
//! the mask contents. Every branch is computed and merged with an encrypted
//! `select`.
//!
//! Bits 52..63 of the 64-bit mask are sentinels that always read as used, so
//! a drawn index can never fall outside the deck.
//!
//! Two modes:
//! - [`DRAW_ROTATING`]: rotate the mask by a random offset and binary-search
//!   the lowest zero bit. Cheap, but the pick is the first free slot after a
//!   random ring position, so a free slot sitting just above a long used run
//!   (the sentinels included) is picked more often.
//! - [`DRAW_RANKED`]: draw a uniform rank among the free slots and
//!   binary-search for the free bit of that rank using per-block popcounts.
//!   Exactly uniform over the free slots.
//!
//! Ranked is the default mode because it is the only one of the two that
//! gives every undealt card the same chance.

use crate::cipher::{EncryptedOps, Rhs, KIND_U64, KIND_U8};

pub const DECK_SIZE: u32 = 52;

/// Bits 52..63.
pub const SENTINEL_MASK: u64 = !((1u64 << DECK_SIZE) - 1);

pub const DRAW_ROTATING: u32 = 1;
pub const DRAW_RANKED: u32 = 2;

/// Window halves for the lowest-zero search over 64 bits. The last 2-bit
/// window is resolved separately.
const SEARCH_HALVES: [u64; 5] = [32, 16, 8, 4, 2];

/// Entropy for the rank draw; the modulo bias against at most 52 free slots
/// is below 2^-57.
const RANK_ENTROPY: u64 = 1 << 63;

const PAIR_MASK: u64 = 0x5555_5555_5555_5555;
const NIBBLE_MASK: u64 = 0x3333_3333_3333_3333;
const BYTE_MASK: u64 = 0x0f0f_0f0f_0f0f_0f0f;
const HALF_WORD_MASK: u64 = 0x00ff_00ff_00ff_00ff;
const WORD_MASK: u64 = 0x0000_ffff_0000_ffff;

pub struct Drawn<H> {
    /// Encrypted `U8` card value in `0..52`.
    pub card: H,
    /// `used` with the card's bit set, already allowed to this contract.
    pub mask: H,
}

/// Draw one unused card against `used`.
///
/// `free_slots` is the number of unset deck bits in `used`. It is public: it
/// only depends on how many cards the session has dealt so far.
pub fn draw_card<F: EncryptedOps>(
    fhe: &F,
    used: &F::Handle,
    mode: u32,
    free_slots: u32,
) -> Drawn<F::Handle> {
    let card = if mode == DRAW_ROTATING {
        rotating_index(fhe, used)
    } else {
        ranked_index(fhe, used, free_slots)
    };

    let one = fhe.constant(1, KIND_U64);
    let bit = fhe.shl(&one, Rhs::Enc(&card));
    let mask = fhe.or(used, Rhs::Enc(&bit));
    fhe.allow_this(&mask);

    Drawn { card, mask }
}

/// First zero bit of `used | sentinels` at or after a uniform random ring
/// offset.
fn rotating_index<F: EncryptedOps>(fhe: &F, used: &F::Handle) -> F::Handle {
    let start = fhe.random(KIND_U8, 64);
    let occupied = fhe.or(used, Rhs::Clear(SENTINEL_MASK));
    let mut window = fhe.rotr(&occupied, Rhs::Enc(&start));
    let mut pos = fhe.constant(0, KIND_U8);

    for half in SEARCH_HALVES {
        let low_ones = (1u64 << half) - 1;
        let low = fhe.and(&window, Rhs::Clear(low_ones));
        let low_full = fhe.eq(&low, Rhs::Clear(low_ones));
        let shifted = fhe.shr(&window, Rhs::Clear(half));
        let advanced = fhe.add(&pos, Rhs::Clear(half));
        window = fhe.select(&low_full, &shifted, &window);
        pos = fhe.select(&low_full, &advanced, &pos);
    }

    // Two bits remain and at least one is zero.
    let low_bit = fhe.and(&window, Rhs::Clear(1));
    let low_used = fhe.eq(&low_bit, Rhs::Clear(1));
    let advanced = fhe.add(&pos, Rhs::Clear(1));
    pos = fhe.select(&low_used, &advanced, &pos);

    let unrotated = fhe.add(&pos, Rhs::Enc(&start));
    fhe.and(&unrotated, Rhs::Clear(63))
}

/// Position of the free bit of uniform random rank.
fn ranked_index<F: EncryptedOps>(fhe: &F, used: &F::Handle, free_slots: u32) -> F::Handle {
    let occupied = fhe.or(used, Rhs::Clear(SENTINEL_MASK));
    let free = fhe.not(&occupied);

    let entropy = fhe.random(KIND_U64, RANK_ENTROPY);
    let mut rank = fhe.rem(&entropy, free_slots as u64);

    // Popcounts of every aligned 2-, 4-, 8-, 16- and 32-bit block of `free`.
    let pairs = {
        let odd = fhe.shr(&free, Rhs::Clear(1));
        let odd = fhe.and(&odd, Rhs::Clear(PAIR_MASK));
        fhe.sub(&free, Rhs::Enc(&odd))
    };
    let nibbles = {
        let low = fhe.and(&pairs, Rhs::Clear(NIBBLE_MASK));
        let high = fhe.shr(&pairs, Rhs::Clear(2));
        let high = fhe.and(&high, Rhs::Clear(NIBBLE_MASK));
        fhe.add(&low, Rhs::Enc(&high))
    };
    let bytes = fold_counts(fhe, &nibbles, 4, BYTE_MASK);
    let half_words = fold_counts(fhe, &bytes, 8, HALF_WORD_MASK);
    let words = fold_counts(fhe, &half_words, 16, WORD_MASK);

    let levels = [
        (words, 32u64),
        (half_words, 16),
        (bytes, 8),
        (nibbles, 4),
        (pairs, 2),
        (free, 1),
    ];

    let mut pos = fhe.constant(0, KIND_U64);
    for (counts, half) in levels.iter() {
        // Free slots in the lower half of the current window.
        let aligned = fhe.shr(counts, Rhs::Enc(&pos));
        let below = fhe.and(&aligned, Rhs::Clear((1u64 << *half) - 1));

        let stay = fhe.gt(&below, Rhs::Enc(&rank));
        let rank_up = fhe.sub(&rank, Rhs::Enc(&below));
        let pos_up = fhe.add(&pos, Rhs::Clear(*half));
        rank = fhe.select(&stay, &rank, &rank_up);
        pos = fhe.select(&stay, &pos, &pos_up);
    }

    fhe.cast(&pos, KIND_U8)
}

fn fold_counts<F: EncryptedOps>(fhe: &F, counts: &F::Handle, shift: u64, mask: u64) -> F::Handle {
    let shifted = fhe.shr(counts, Rhs::Clear(shift));
    let summed = fhe.add(counts, Rhs::Enc(&shifted));
    fhe.and(&summed, Rhs::Clear(mask))
}
