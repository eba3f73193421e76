#![no_std]

//! # Mock FHE Coprocessor
//!
//! A plaintext stand-in for an encrypted-integer coprocessor. Values travel
//! inside opaque 32-byte handles, masked and authenticated with a key only
//! this contract holds, and are never returned by any operation; only
//! `decrypt` reveals them, and only to an account holding a grant (or to
//! anyone once the handle is public).
//!
//! Operations write no per-value storage, so a long chain of intermediate
//! results fits in one transaction. Only grants and public marks persist.
//!
//! ## Handle layout
//! | bytes  | field                                        |
//! |--------|----------------------------------------------|
//! | 0..4   | serial (unique per handle)                   |
//! | 4      | kind                                         |
//! | 5..9   | ledger the handle was produced in            |
//! | 9..17  | value XOR keyed pad of the serial            |
//! | 17..24 | keyed tag of the producing account           |
//! | 24..32 | keyed MAC over bytes 0..24                   |
//!
//! This hides values from casual inspection only: the key sits in instance
//! storage. It is not encryption.
//!
//! ## Access model
//! - A fresh result is usable by the account that produced it during the
//!   ledger it was produced in (transient allowance).
//! - `allow` attaches a persistent, append-only grant for another account
//!   (or for the caller itself, to keep operating on the value later).
//! - `make_publicly_decryptable` lets anyone decrypt; it does not let anyone
//!   operate on the value.
//!
//! ## Kinds
//! `KIND_BOOL` (1 bit), `KIND_U8`, `KIND_U64`. See [`arith`] for the exact
//! wrapping and shift laws.

use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, Address, Bytes, BytesN,
    Env,
};

pub mod arith;

use arith::KIND_BOOL;

// ═══════════════════════════════════════════════════════════════════════════════
//  Events
// ═══════════════════════════════════════════════════════════════════════════════

#[contractevent]
pub struct EvAccessGranted {
    pub handle: BytesN<32>,
    pub account: Address,
}

#[contractevent]
pub struct EvMadePublic {
    pub handle: BytesN<32>,
}

#[contractevent]
pub struct EvDecryptRequested {
    pub handle: BytesN<32>,
    pub requester: Address,
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Errors & types
// ═══════════════════════════════════════════════════════════════════════════════

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum CoprocessorError {
    UnknownHandle = 1,
    AccessDenied = 2,
    KindMismatch = 3,
    UnknownKind = 4,
    InvalidBound = 5,
    DivisionByZero = 6,
    KeyNotSet = 7,
}

/// Right-hand operand: another ciphertext or a plaintext scalar.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Operand {
    Enc(BytesN<32>),
    Clear(u64),
}

/// An opened handle.
#[derive(Clone, Debug, Eq, PartialEq)]
struct Ciphertext {
    kind: u32,
    value: u64,
    /// Ledger in which the producing account may use the value without a
    /// grant.
    ledger: u32,
    owner: [u8; OWNER_LEN],
}

#[contracttype]
#[derive(Clone)]
enum StorageKey {
    SealKey,
    Serial,
    Grant(BytesN<32>, Address),
    Public(BytesN<32>),
}

const BODY_LEN: usize = 24;
const OWNER_LEN: usize = 7;

const PAD_DOMAIN: &[u8] = b"mock-fhe/pad";
const OWNER_DOMAIN: &[u8] = b"mock-fhe/owner";
const MAC_DOMAIN: &[u8] = b"mock-fhe/mac";

// Ledger rate is approximately 5 seconds per ledger on Stellar
const LEDGER_RATE_SECS: u32 = 5;

// 30 days
const TTL_SECONDS: u32 = 30 * 24 * 60 * 60;
const TTL_LEDGERS: u32 = TTL_SECONDS / LEDGER_RATE_SECS;

// ═══════════════════════════════════════════════════════════════════════════════
//  Contract
// ═══════════════════════════════════════════════════════════════════════════════

#[contract]
pub struct MockFhe;

#[contractimpl]
impl MockFhe {
    pub fn __constructor(env: Env) {
        let key: BytesN<32> = env.prng().gen();
        env.storage().instance().set(&StorageKey::SealKey, &key);
    }

    // ───────────────────────────────────────────────────────────────────────────
    //  Public: Value creation
    // ───────────────────────────────────────────────────────────────────────────

    /// Trivially encrypt a public constant.
    pub fn trivial(
        env: Env,
        caller: Address,
        value: u64,
        kind: u32,
    ) -> Result<BytesN<32>, CoprocessorError> {
        caller.require_auth();
        let value = arith::truncate(kind, value)?;
        Self::store(&env, &caller, kind, value)
    }

    /// Uniform random value in `0..upper_bound`.
    pub fn random(
        env: Env,
        caller: Address,
        kind: u32,
        upper_bound: u64,
    ) -> Result<BytesN<32>, CoprocessorError> {
        caller.require_auth();
        let bound = arith::check_bound(kind, upper_bound)?;
        let value = env.prng().gen_range::<u64>(0..=(bound - 1));
        Self::store(&env, &caller, kind, value)
    }

    // ───────────────────────────────────────────────────────────────────────────
    //  Public: Arithmetic & bitwise
    // ───────────────────────────────────────────────────────────────────────────

    pub fn add(
        env: Env,
        caller: Address,
        lhs: BytesN<32>,
        rhs: Operand,
    ) -> Result<BytesN<32>, CoprocessorError> {
        caller.require_auth();
        let (kind, a, b) = Self::load_operands(&env, &caller, &lhs, &rhs)?;
        let value = arith::add(kind, a, b)?;
        Self::store(&env, &caller, kind, value)
    }

    pub fn sub(
        env: Env,
        caller: Address,
        lhs: BytesN<32>,
        rhs: Operand,
    ) -> Result<BytesN<32>, CoprocessorError> {
        caller.require_auth();
        let (kind, a, b) = Self::load_operands(&env, &caller, &lhs, &rhs)?;
        let value = arith::sub(kind, a, b)?;
        Self::store(&env, &caller, kind, value)
    }

    pub fn and(
        env: Env,
        caller: Address,
        lhs: BytesN<32>,
        rhs: Operand,
    ) -> Result<BytesN<32>, CoprocessorError> {
        caller.require_auth();
        let (kind, a, b) = Self::load_operands(&env, &caller, &lhs, &rhs)?;
        let value = arith::and(kind, a, b)?;
        Self::store(&env, &caller, kind, value)
    }

    pub fn or(
        env: Env,
        caller: Address,
        lhs: BytesN<32>,
        rhs: Operand,
    ) -> Result<BytesN<32>, CoprocessorError> {
        caller.require_auth();
        let (kind, a, b) = Self::load_operands(&env, &caller, &lhs, &rhs)?;
        let value = arith::or(kind, a, b)?;
        Self::store(&env, &caller, kind, value)
    }

    pub fn not(env: Env, caller: Address, value: BytesN<32>) -> Result<BytesN<32>, CoprocessorError> {
        caller.require_auth();
        let ct = Self::load(&env, &caller, &value)?;
        let result = arith::not(ct.kind, ct.value)?;
        Self::store(&env, &caller, ct.kind, result)
    }

    pub fn shl(
        env: Env,
        caller: Address,
        value: BytesN<32>,
        amount: Operand,
    ) -> Result<BytesN<32>, CoprocessorError> {
        caller.require_auth();
        let ct = Self::load(&env, &caller, &value)?;
        let amount = Self::load_amount(&env, &caller, &amount)?;
        let result = arith::shl(ct.kind, ct.value, amount)?;
        Self::store(&env, &caller, ct.kind, result)
    }

    pub fn shr(
        env: Env,
        caller: Address,
        value: BytesN<32>,
        amount: Operand,
    ) -> Result<BytesN<32>, CoprocessorError> {
        caller.require_auth();
        let ct = Self::load(&env, &caller, &value)?;
        let amount = Self::load_amount(&env, &caller, &amount)?;
        let result = arith::shr(ct.kind, ct.value, amount)?;
        Self::store(&env, &caller, ct.kind, result)
    }

    pub fn rotr(
        env: Env,
        caller: Address,
        value: BytesN<32>,
        amount: Operand,
    ) -> Result<BytesN<32>, CoprocessorError> {
        caller.require_auth();
        let ct = Self::load(&env, &caller, &value)?;
        let amount = Self::load_amount(&env, &caller, &amount)?;
        let result = arith::rotr(ct.kind, ct.value, amount)?;
        Self::store(&env, &caller, ct.kind, result)
    }

    /// Division by a plaintext divisor.
    pub fn div(
        env: Env,
        caller: Address,
        value: BytesN<32>,
        divisor: u64,
    ) -> Result<BytesN<32>, CoprocessorError> {
        caller.require_auth();
        let ct = Self::load(&env, &caller, &value)?;
        let result = arith::div(ct.kind, ct.value, divisor)?;
        Self::store(&env, &caller, ct.kind, result)
    }

    /// Remainder by a plaintext divisor.
    pub fn rem(
        env: Env,
        caller: Address,
        value: BytesN<32>,
        divisor: u64,
    ) -> Result<BytesN<32>, CoprocessorError> {
        caller.require_auth();
        let ct = Self::load(&env, &caller, &value)?;
        let result = arith::rem(ct.kind, ct.value, divisor)?;
        Self::store(&env, &caller, ct.kind, result)
    }

    pub fn cast(
        env: Env,
        caller: Address,
        value: BytesN<32>,
        kind: u32,
    ) -> Result<BytesN<32>, CoprocessorError> {
        caller.require_auth();
        let ct = Self::load(&env, &caller, &value)?;
        let result = arith::truncate(kind, ct.value)?;
        Self::store(&env, &caller, kind, result)
    }

    // ───────────────────────────────────────────────────────────────────────────
    //  Public: Comparison & selection
    // ───────────────────────────────────────────────────────────────────────────

    pub fn eq(
        env: Env,
        caller: Address,
        lhs: BytesN<32>,
        rhs: Operand,
    ) -> Result<BytesN<32>, CoprocessorError> {
        caller.require_auth();
        let (_, a, b) = Self::load_operands(&env, &caller, &lhs, &rhs)?;
        Self::store(&env, &caller, KIND_BOOL, arith::eq(a, b))
    }

    pub fn gt(
        env: Env,
        caller: Address,
        lhs: BytesN<32>,
        rhs: Operand,
    ) -> Result<BytesN<32>, CoprocessorError> {
        caller.require_auth();
        let (_, a, b) = Self::load_operands(&env, &caller, &lhs, &rhs)?;
        Self::store(&env, &caller, KIND_BOOL, arith::gt(a, b))
    }

    pub fn select(
        env: Env,
        caller: Address,
        cond: BytesN<32>,
        if_true: BytesN<32>,
        if_false: BytesN<32>,
    ) -> Result<BytesN<32>, CoprocessorError> {
        caller.require_auth();
        let cond = Self::load(&env, &caller, &cond)?;
        if cond.kind != KIND_BOOL {
            return Err(CoprocessorError::KindMismatch);
        }
        let a = Self::load(&env, &caller, &if_true)?;
        let b = Self::load(&env, &caller, &if_false)?;
        if a.kind != b.kind {
            return Err(CoprocessorError::KindMismatch);
        }
        let result = arith::select(cond.value, a.value, b.value);
        Self::store(&env, &caller, a.kind, result)
    }

    // ───────────────────────────────────────────────────────────────────────────
    //  Public: Capability grants & reveal
    // ───────────────────────────────────────────────────────────────────────────

    /// Grant `account` the right to operate on and decrypt `handle`.
    /// The caller must itself be allowed on the handle.
    pub fn allow(
        env: Env,
        caller: Address,
        handle: BytesN<32>,
        account: Address,
    ) -> Result<(), CoprocessorError> {
        caller.require_auth();
        Self::load(&env, &caller, &handle)?;

        let key = StorageKey::Grant(handle.clone(), account.clone());
        env.storage().persistent().set(&key, &true);
        env.storage()
            .persistent()
            .extend_ttl(&key, TTL_LEDGERS, TTL_LEDGERS);
        env.storage().instance().extend_ttl(TTL_LEDGERS, TTL_LEDGERS);

        EvAccessGranted { handle, account }.publish(&env);
        Ok(())
    }

    pub fn make_publicly_decryptable(
        env: Env,
        caller: Address,
        handle: BytesN<32>,
    ) -> Result<(), CoprocessorError> {
        caller.require_auth();
        Self::load(&env, &caller, &handle)?;

        let key = StorageKey::Public(handle.clone());
        env.storage().persistent().set(&key, &true);
        env.storage()
            .persistent()
            .extend_ttl(&key, TTL_LEDGERS, TTL_LEDGERS);

        EvMadePublic { handle }.publish(&env);
        Ok(())
    }

    pub fn is_allowed(env: Env, handle: BytesN<32>, account: Address) -> bool {
        env.storage()
            .persistent()
            .has(&StorageKey::Grant(handle, account))
    }

    pub fn is_publicly_decryptable(env: Env, handle: BytesN<32>) -> bool {
        env.storage().persistent().has(&StorageKey::Public(handle))
    }

    /// Kind tag of a handle. Kinds are public metadata, values are not.
    pub fn kind_of(env: Env, handle: BytesN<32>) -> Result<u32, CoprocessorError> {
        Self::open(&env, &handle).map(|ct| ct.kind)
    }

    /// Reveal a value to a grantee, or to anyone if the handle is public.
    /// Transient allowance never suffices here.
    pub fn decrypt(
        env: Env,
        requester: Address,
        handle: BytesN<32>,
    ) -> Result<u64, CoprocessorError> {
        requester.require_auth();
        let ct = Self::open(&env, &handle)?;

        let storage = env.storage().persistent();
        let public = storage.has(&StorageKey::Public(handle.clone()));
        let granted = storage.has(&StorageKey::Grant(handle.clone(), requester.clone()));
        if !public && !granted {
            return Err(CoprocessorError::AccessDenied);
        }

        EvDecryptRequested { handle, requester }.publish(&env);
        Ok(ct.value)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    //  Internal: Storage & access checks
    // ═══════════════════════════════════════════════════════════════════════════

    fn seal_key(env: &Env) -> Result<BytesN<32>, CoprocessorError> {
        env.storage()
            .instance()
            .get(&StorageKey::SealKey)
            .ok_or(CoprocessorError::KeyNotSet)
    }

    fn keyed_digest(env: &Env, key: &BytesN<32>, domain: &[u8], data: &Bytes) -> [u8; 32] {
        let mut preimage = Bytes::from_array(env, &key.to_array());
        preimage.append(&Bytes::from_slice(env, domain));
        preimage.append(data);
        let digest: BytesN<32> = env.crypto().sha256(&preimage).into();
        digest.to_array()
    }

    fn pad(env: &Env, key: &BytesN<32>, serial: &[u8]) -> u64 {
        let digest = Self::keyed_digest(env, key, PAD_DOMAIN, &Bytes::from_slice(env, serial));
        let mut pad = [0u8; 8];
        pad.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(pad)
    }

    fn owner_tag(env: &Env, key: &BytesN<32>, account: &Address) -> [u8; OWNER_LEN] {
        let digest = Self::keyed_digest(env, key, OWNER_DOMAIN, &account.to_string().to_bytes());
        let mut tag = [0u8; OWNER_LEN];
        tag.copy_from_slice(&digest[..OWNER_LEN]);
        tag
    }

    fn mac(env: &Env, key: &BytesN<32>, body: &[u8]) -> [u8; 32] {
        Self::keyed_digest(env, key, MAC_DOMAIN, &Bytes::from_slice(env, body))
    }

    /// Verify and unmask a handle. Anything this contract did not produce is
    /// an unknown handle.
    fn open(env: &Env, handle: &BytesN<32>) -> Result<Ciphertext, CoprocessorError> {
        let key = Self::seal_key(env)?;
        let raw = handle.to_array();
        let mac = Self::mac(env, &key, &raw[..BODY_LEN]);
        if raw[BODY_LEN..] != mac[..32 - BODY_LEN] {
            return Err(CoprocessorError::UnknownHandle);
        }

        let mut ledger = [0u8; 4];
        ledger.copy_from_slice(&raw[5..9]);
        let mut masked = [0u8; 8];
        masked.copy_from_slice(&raw[9..17]);
        let mut owner = [0u8; OWNER_LEN];
        owner.copy_from_slice(&raw[17..BODY_LEN]);

        Ok(Ciphertext {
            kind: raw[4] as u32,
            value: u64::from_be_bytes(masked) ^ Self::pad(env, &key, &raw[..4]),
            ledger: u32::from_be_bytes(ledger),
            owner,
        })
    }

    fn load(
        env: &Env,
        caller: &Address,
        handle: &BytesN<32>,
    ) -> Result<Ciphertext, CoprocessorError> {
        let ct = Self::open(env, handle)?;
        let transient = ct.ledger == env.ledger().sequence()
            && ct.owner == Self::owner_tag(env, &Self::seal_key(env)?, caller);
        let allowed = transient
            || env
                .storage()
                .persistent()
                .has(&StorageKey::Grant(handle.clone(), caller.clone()));
        if !allowed {
            return Err(CoprocessorError::AccessDenied);
        }
        Ok(ct)
    }

    /// Load a same-kind operand pair. A clear rhs is truncated to the lhs kind.
    fn load_operands(
        env: &Env,
        caller: &Address,
        lhs: &BytesN<32>,
        rhs: &Operand,
    ) -> Result<(u32, u64, u64), CoprocessorError> {
        let a = Self::load(env, caller, lhs)?;
        let b = match rhs {
            Operand::Enc(handle) => {
                let b = Self::load(env, caller, handle)?;
                if b.kind != a.kind {
                    return Err(CoprocessorError::KindMismatch);
                }
                b.value
            }
            Operand::Clear(value) => arith::truncate(a.kind, *value)?,
        };
        Ok((a.kind, a.value, b))
    }

    /// Shift amounts may come from any kind.
    fn load_amount(env: &Env, caller: &Address, amount: &Operand) -> Result<u64, CoprocessorError> {
        match amount {
            Operand::Enc(handle) => Ok(Self::load(env, caller, handle)?.value),
            Operand::Clear(value) => Ok(*value),
        }
    }

    fn store(
        env: &Env,
        caller: &Address,
        kind: u32,
        value: u64,
    ) -> Result<BytesN<32>, CoprocessorError> {
        let key = Self::seal_key(env)?;
        let serial: u32 = env
            .storage()
            .instance()
            .get(&StorageKey::Serial)
            .unwrap_or(0);
        env.storage()
            .instance()
            .set(&StorageKey::Serial, &serial.wrapping_add(1));

        let serial = serial.to_be_bytes();
        let mut raw = [0u8; 32];
        raw[..4].copy_from_slice(&serial);
        raw[4] = kind as u8;
        raw[5..9].copy_from_slice(&env.ledger().sequence().to_be_bytes());
        raw[9..17].copy_from_slice(&(value ^ Self::pad(env, &key, &serial)).to_be_bytes());
        raw[17..BODY_LEN].copy_from_slice(&Self::owner_tag(env, &key, caller));
        let mac = Self::mac(env, &key, &raw[..BODY_LEN]);
        raw[BODY_LEN..].copy_from_slice(&mac[..32 - BODY_LEN]);

        Ok(BytesN::from_array(env, &raw))
    }
}
