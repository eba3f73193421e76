#![no_std]

//! # Card Duel
//!
//! A two-player high-card duel dealt from a 52-card deck whose cards stay
//! encrypted end to end. Nobody, the contract included, learns a card unless
//! its owner decrypts it through the coprocessor.
//!
//! ## Game flow
//! 1. `create` opens a session and lists it in the open-session directory.
//! 2. A second player `join`s; the session leaves the directory.
//! 3. Either player `start`s it, which initialises an encrypted empty
//!    used-mask.
//! 4. `deal_round` is called `HAND_SIZE` times. Each call draws one card per
//!    player against the same evolving mask, so all twelve cards are
//!    distinct. Each card is granted to its owner only.
//! 5. Each player `play`s a hand index. The second play runs the showdown and
//!    publishes an encrypted "player 0 wins" that anyone may decrypt.
//!
//! ## Card encoding
//! `card = suit * 13 + rank` where suit ∈ [0,3] and rank ∈ [0,12].
//! Higher rank wins; equal ranks are broken by the higher suit.

use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, log, Address, BytesN,
    Env, Vec,
};

mod cipher;
mod draw;
mod lobby;
mod showdown;

use cipher::{Coprocessor, EncryptedOps, KIND_U64};
use draw::{DECK_SIZE, DRAW_RANKED, DRAW_ROTATING};

// ═══════════════════════════════════════════════════════════════════════════════
//  Contract Events
// ═══════════════════════════════════════════════════════════════════════════════

#[contractevent]
pub struct EvSessionCreated {
    pub session_id: u32,
    pub player: Address,
}

#[contractevent]
pub struct EvSessionJoined {
    pub session_id: u32,
    pub player: Address,
}

#[contractevent]
pub struct EvSessionStarted {
    pub session_id: u32,
    pub started_by: Address,
}

/// Emitted after each round; `deal_index` is the number of rounds dealt.
#[contractevent]
pub struct EvRoundDealt {
    pub session_id: u32,
    pub deal_index: u32,
}

/// Emitted when a player commits a hand index (the card stays encrypted).
#[contractevent]
pub struct EvCardPlayed {
    pub session_id: u32,
    pub player: Address,
    pub hand_index: u32,
}

#[contractevent]
pub struct EvSessionFinished {
    pub session_id: u32,
    pub result: BytesN<32>,
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Errors
// ═══════════════════════════════════════════════════════════════════════════════

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum DuelError {
    NotFound = 1,
    Full = 2,
    AlreadyStarted = 3,
    AlreadyFinished = 4,
    NotReady = 5,
    HandsNotDealt = 6,
    HandsAlreadyDealt = 7,
    AlreadyPlayed = 8,
    NotAParticipant = 9,
    InvalidIndex = 10,
    SelfJoin = 11,
    AdminNotSet = 12,
    CoprocessorNotSet = 13,
    InvalidDrawMode = 14,
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Session state & storage keys
// ═══════════════════════════════════════════════════════════════════════════════

/// One duel. Hands grow by exactly one card per dealt round and plays are
/// set once; `result` is present exactly when `finished` is true.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DuelSession {
    pub player0: Address,
    pub player1: Option<Address>,
    pub started: bool,
    pub finished: bool,
    /// Encrypted 64-bit mask of dealt cards (present once started).
    pub used_mask: Option<BytesN<32>>,
    pub deal_index: u32,
    pub hand0: Vec<BytesN<32>>,
    pub hand1: Vec<BytesN<32>>,
    pub played0: Option<u32>,
    pub played1: Option<u32>,
    /// Encrypted bool: player 0 wins.
    pub result: Option<BytesN<32>>,
}

/// Public view of a session, without encrypted handles.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionSummary {
    pub player0: Address,
    pub player1: Option<Address>,
    pub started: bool,
    pub finished: bool,
    pub deal_index: u32,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlayIndices {
    pub played0: Option<u32>,
    pub played1: Option<u32>,
}

#[contracttype]
#[derive(Clone)]
pub(crate) enum StorageKey {
    Admin,
    Coprocessor,
    DrawMode,
    NextSessionId,
    Session(u32),
    OpenSessions,
    OpenPosition(u32),
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Constants
// ═══════════════════════════════════════════════════════════════════════════════

pub const HAND_SIZE: u32 = 6;

// Player slots
const SLOT_0: u32 = 0;
const SLOT_1: u32 = 1;

// Ledger rate is approximately 5 seconds per ledger on Stellar
const LEDGER_RATE_SECS: u32 = 5;

// TTL expressed in human-readable time units (30 days)
const TTL_SECONDS: u32 = 30 * 24 * 60 * 60;

/// TTL for session storage in ledgers: 30 * 24 * 60 * 60 / 5 = 518,400 ledgers
pub(crate) const SESSION_TTL_LEDGERS: u32 = TTL_SECONDS / LEDGER_RATE_SECS;

// ═══════════════════════════════════════════════════════════════════════════════
//  Contract
// ═══════════════════════════════════════════════════════════════════════════════

#[contract]
pub struct CardDuelContract;

#[contractimpl]
impl CardDuelContract {
    // ───────────────────────────────────────────────────────────────────────────
    //  Public: Constructor & Lifecycle
    // ───────────────────────────────────────────────────────────────────────────

    pub fn __constructor(env: Env, admin: Address, coprocessor: Address) {
        env.storage().instance().set(&StorageKey::Admin, &admin);
        env.storage()
            .instance()
            .set(&StorageKey::Coprocessor, &coprocessor);
        env.storage()
            .instance()
            .set(&StorageKey::DrawMode, &DRAW_RANKED);
    }

    /// Open a new session with `by` in slot 0. Ids start at 0 and are never
    /// reused.
    pub fn create(env: Env, by: Address) -> u32 {
        by.require_auth();

        let session_id: u32 = env
            .storage()
            .instance()
            .get(&StorageKey::NextSessionId)
            .unwrap_or(0);
        env.storage()
            .instance()
            .set(&StorageKey::NextSessionId, &(session_id + 1));

        let session = DuelSession {
            player0: by.clone(),
            player1: None,
            started: false,
            finished: false,
            used_mask: None,
            deal_index: 0,
            hand0: Vec::new(&env),
            hand1: Vec::new(&env),
            played0: None,
            played1: None,
            result: None,
        };
        Self::write_session(&env, session_id, &session);
        lobby::add(&env, session_id);

        EvSessionCreated {
            session_id,
            player: by,
        }
        .publish(&env);

        session_id
    }

    pub fn join(env: Env, session_id: u32, by: Address) -> Result<(), DuelError> {
        by.require_auth();

        let mut session = Self::read_session(&env, session_id)?;
        if session.started {
            return Err(DuelError::AlreadyStarted);
        }
        if session.player1.is_some() {
            return Err(DuelError::Full);
        }
        if by == session.player0 {
            return Err(DuelError::SelfJoin);
        }

        session.player1 = Some(by.clone());
        lobby::remove(&env, session_id);

        EvSessionJoined {
            session_id,
            player: by,
        }
        .publish(&env);

        Self::write_session(&env, session_id, &session);
        Ok(())
    }

    /// Start a full session: the used-mask begins as an encrypted zero.
    pub fn start(env: Env, session_id: u32, by: Address) -> Result<(), DuelError> {
        by.require_auth();

        let mut session = Self::read_session(&env, session_id)?;
        if session.started {
            return Err(DuelError::AlreadyStarted);
        }
        let player1 = session.player1.clone().ok_or(DuelError::NotReady)?;
        if by != session.player0 && by != player1 {
            return Err(DuelError::NotAParticipant);
        }

        let coprocessor = Self::load_coprocessor(&env)?;
        let fhe = Coprocessor::new(&env, &coprocessor);
        let mask = fhe.constant(0, KIND_U64);
        fhe.allow_this(&mask);

        session.used_mask = Some(mask);
        session.deal_index = 0;
        session.started = true;

        EvSessionStarted {
            session_id,
            started_by: by,
        }
        .publish(&env);

        Self::write_session(&env, session_id, &session);
        Ok(())
    }

    // ───────────────────────────────────────────────────────────────────────────
    //  Public: Dealing
    // ───────────────────────────────────────────────────────────────────────────

    /// Deal one card to each player. Anyone may advance dealing: no private
    /// input is involved. Returns the new `deal_index`.
    pub fn deal_round(env: Env, session_id: u32) -> Result<u32, DuelError> {
        let mut session = Self::read_session(&env, session_id)?;
        if session.finished {
            return Err(DuelError::AlreadyFinished);
        }
        if !session.started {
            return Err(DuelError::NotReady);
        }
        if session.deal_index >= HAND_SIZE {
            return Err(DuelError::HandsAlreadyDealt);
        }
        let used = session.used_mask.clone().ok_or(DuelError::NotReady)?;
        let player1 = session.player1.clone().ok_or(DuelError::NotReady)?;

        let coprocessor = Self::load_coprocessor(&env)?;
        let fhe = Coprocessor::new(&env, &coprocessor);
        let mode = Self::load_draw_mode(&env);

        // Both draws read the mask the previous draw produced.
        let free_slots = DECK_SIZE - 2 * session.deal_index;
        let first = draw::draw_card(&fhe, &used, mode, free_slots);
        Self::hand_out(&fhe, &first.card, &session.player0);
        let second = draw::draw_card(&fhe, &first.mask, mode, free_slots - 1);
        Self::hand_out(&fhe, &second.card, &player1);

        session.hand0.push_back(first.card);
        session.hand1.push_back(second.card);
        session.used_mask = Some(second.mask);
        session.deal_index += 1;

        log!(&env, "round dealt", session_id, session.deal_index, mode);

        EvRoundDealt {
            session_id,
            deal_index: session.deal_index,
        }
        .publish(&env);

        Self::write_session(&env, session_id, &session);
        Ok(session.deal_index)
    }

    // ───────────────────────────────────────────────────────────────────────────
    //  Public: Play & Showdown
    // ───────────────────────────────────────────────────────────────────────────

    /// Commit the card at `hand_index`. The second play settles the duel.
    pub fn play(env: Env, session_id: u32, by: Address, hand_index: u32) -> Result<(), DuelError> {
        by.require_auth();

        let mut session = Self::read_session(&env, session_id)?;
        if session.deal_index < HAND_SIZE {
            return Err(DuelError::HandsNotDealt);
        }
        if hand_index >= HAND_SIZE {
            return Err(DuelError::InvalidIndex);
        }

        let played = match Self::resolve_slot(&session, &by)? {
            SLOT_0 => &mut session.played0,
            _ => &mut session.played1,
        };
        if played.is_some() {
            return Err(DuelError::AlreadyPlayed);
        }
        *played = Some(hand_index);

        EvCardPlayed {
            session_id,
            player: by,
            hand_index,
        }
        .publish(&env);

        if let (Some(index0), Some(index1)) = (session.played0, session.played1) {
            Self::run_showdown(&env, session_id, &mut session, index0, index1)?;
        }

        Self::write_session(&env, session_id, &session);
        Ok(())
    }

    // ───────────────────────────────────────────────────────────────────────────
    //  Public: Read
    // ───────────────────────────────────────────────────────────────────────────

    pub fn get_open_sessions(env: Env) -> Vec<u32> {
        lobby::list(&env)
    }

    pub fn get_session(env: Env, session_id: u32) -> Result<SessionSummary, DuelError> {
        let session = Self::read_session(&env, session_id)?;
        Ok(SessionSummary {
            player0: session.player0,
            player1: session.player1,
            started: session.started,
            finished: session.finished,
            deal_index: session.deal_index,
        })
    }

    /// Encrypted hand of a participant, in deal order. Only `player` holds a
    /// grant to decrypt it.
    pub fn get_hand(
        env: Env,
        session_id: u32,
        player: Address,
    ) -> Result<Vec<BytesN<32>>, DuelError> {
        let session = Self::read_session(&env, session_id)?;
        match Self::resolve_slot(&session, &player)? {
            SLOT_0 => Ok(session.hand0),
            _ => Ok(session.hand1),
        }
    }

    pub fn get_plays(env: Env, session_id: u32) -> Result<PlayIndices, DuelError> {
        let session = Self::read_session(&env, session_id)?;
        Ok(PlayIndices {
            played0: session.played0,
            played1: session.played1,
        })
    }

    /// Publicly decryptable "player 0 wins" handle, once finished.
    pub fn get_result(env: Env, session_id: u32) -> Result<Option<BytesN<32>>, DuelError> {
        Ok(Self::read_session(&env, session_id)?.result)
    }

    pub fn session_count(env: Env) -> u32 {
        env.storage()
            .instance()
            .get(&StorageKey::NextSessionId)
            .unwrap_or(0)
    }

    // ───────────────────────────────────────────────────────────────────────────
    //  Public: Admin
    // ───────────────────────────────────────────────────────────────────────────

    pub fn get_admin(env: Env) -> Result<Address, DuelError> {
        Self::load_admin(&env)
    }

    pub fn set_admin(env: Env, new_admin: Address) -> Result<(), DuelError> {
        let admin = Self::load_admin(&env)?;
        admin.require_auth();
        env.storage()
            .instance()
            .set(&StorageKey::Admin, &new_admin);
        Ok(())
    }

    pub fn get_coprocessor(env: Env) -> Result<Address, DuelError> {
        Self::load_coprocessor(&env)
    }

    /// Point the contract at another coprocessor. Handles already stored in
    /// sessions belong to the previous one.
    pub fn set_coprocessor(env: Env, new_coprocessor: Address) -> Result<(), DuelError> {
        let admin = Self::load_admin(&env)?;
        admin.require_auth();
        env.storage()
            .instance()
            .set(&StorageKey::Coprocessor, &new_coprocessor);
        Ok(())
    }

    pub fn get_draw_mode(env: Env) -> u32 {
        Self::load_draw_mode(&env)
    }

    /// Select `DRAW_ROTATING` (1) or `DRAW_RANKED` (2) for future rounds.
    pub fn set_draw_mode(env: Env, mode: u32) -> Result<(), DuelError> {
        let admin = Self::load_admin(&env)?;
        admin.require_auth();
        if mode != DRAW_ROTATING && mode != DRAW_RANKED {
            return Err(DuelError::InvalidDrawMode);
        }
        env.storage().instance().set(&StorageKey::DrawMode, &mode);
        Ok(())
    }

    pub fn upgrade(env: Env, new_wasm_hash: BytesN<32>) -> Result<(), DuelError> {
        let admin = Self::load_admin(&env)?;
        admin.require_auth();
        env.deployer().update_current_contract_wasm(new_wasm_hash);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    //  Internal: Showdown
    // ═══════════════════════════════════════════════════════════════════════════

    fn run_showdown(
        env: &Env,
        session_id: u32,
        session: &mut DuelSession,
        index0: u32,
        index1: u32,
    ) -> Result<(), DuelError> {
        let player1 = session.player1.clone().ok_or(DuelError::NotReady)?;
        let card0 = session.hand0.get(index0).ok_or(DuelError::InvalidIndex)?;
        let card1 = session.hand1.get(index1).ok_or(DuelError::InvalidIndex)?;

        let coprocessor = Self::load_coprocessor(env)?;
        let fhe = Coprocessor::new(env, &coprocessor);
        let result = showdown::settle(&fhe, &card0, &card1, &session.player0, &player1);

        session.result = Some(result.clone());
        session.finished = true;

        EvSessionFinished { session_id, result }.publish(env);
        Ok(())
    }

    /// The contract keeps its own grant so the showdown can read the card.
    fn hand_out(fhe: &Coprocessor<'_>, card: &BytesN<32>, owner: &Address) {
        fhe.allow_this(card);
        fhe.allow(card, owner);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    //  Internal: Guards & Storage
    // ═══════════════════════════════════════════════════════════════════════════

    fn resolve_slot(session: &DuelSession, player: &Address) -> Result<u32, DuelError> {
        if *player == session.player0 {
            Ok(SLOT_0)
        } else if session.player1.as_ref() == Some(player) {
            Ok(SLOT_1)
        } else {
            Err(DuelError::NotAParticipant)
        }
    }

    fn read_session(env: &Env, session_id: u32) -> Result<DuelSession, DuelError> {
        env.storage()
            .persistent()
            .get(&StorageKey::Session(session_id))
            .ok_or(DuelError::NotFound)
    }

    fn write_session(env: &Env, session_id: u32, session: &DuelSession) {
        let key = StorageKey::Session(session_id);
        env.storage().persistent().set(&key, session);
        env.storage()
            .persistent()
            .extend_ttl(&key, SESSION_TTL_LEDGERS, SESSION_TTL_LEDGERS);
        // Keep instance storage (admin, coprocessor, counters) alive
        env.storage()
            .instance()
            .extend_ttl(SESSION_TTL_LEDGERS, SESSION_TTL_LEDGERS);
    }

    fn load_admin(env: &Env) -> Result<Address, DuelError> {
        env.storage()
            .instance()
            .get(&StorageKey::Admin)
            .ok_or(DuelError::AdminNotSet)
    }

    fn load_coprocessor(env: &Env) -> Result<Address, DuelError> {
        env.storage()
            .instance()
            .get(&StorageKey::Coprocessor)
            .ok_or(DuelError::CoprocessorNotSet)
    }

    fn load_draw_mode(env: &Env) -> u32 {
        env.storage()
            .instance()
            .get(&StorageKey::DrawMode)
            .unwrap_or(DRAW_RANKED)
    }
}
