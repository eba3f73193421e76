//! Open-session directory: ids still waiting for a second player.
//!
//! Kept as a dense list plus a per-id position index, so removal from the
//! middle is a swap with the last entry.

use soroban_sdk::{Env, Vec};

use crate::{StorageKey, SESSION_TTL_LEDGERS};

pub fn list(env: &Env) -> Vec<u32> {
    env.storage()
        .persistent()
        .get(&StorageKey::OpenSessions)
        .unwrap_or_else(|| Vec::new(env))
}

pub fn add(env: &Env, session_id: u32) {
    if position(env, session_id).is_some() {
        return;
    }
    let mut ids = list(env);
    ids.push_back(session_id);
    set_position(env, session_id, ids.len() - 1);
    write(env, &ids);
}

/// Removing an id that is not listed is a no-op.
pub fn remove(env: &Env, session_id: u32) {
    let Some(pos) = position(env, session_id) else {
        return;
    };
    let mut ids = list(env);
    if let Some(last) = ids.pop_back() {
        if last != session_id {
            ids.set(pos, last);
            set_position(env, last, pos);
        }
    }
    env.storage()
        .persistent()
        .remove(&StorageKey::OpenPosition(session_id));
    write(env, &ids);
}

fn position(env: &Env, session_id: u32) -> Option<u32> {
    env.storage()
        .persistent()
        .get(&StorageKey::OpenPosition(session_id))
}

fn set_position(env: &Env, session_id: u32, pos: u32) {
    let key = StorageKey::OpenPosition(session_id);
    env.storage().persistent().set(&key, &pos);
    env.storage()
        .persistent()
        .extend_ttl(&key, SESSION_TTL_LEDGERS, SESSION_TTL_LEDGERS);
}

fn write(env: &Env, ids: &Vec<u32>) {
    let key = StorageKey::OpenSessions;
    env.storage().persistent().set(&key, ids);
    env.storage()
        .persistent()
        .extend_ttl(&key, SESSION_TTL_LEDGERS, SESSION_TTL_LEDGERS);
}
