//! Seam to the encrypted-integer coprocessor.
//!
//! The dealing and showdown algorithms are written against [`EncryptedOps`]
//! so that they run unchanged over the deployed coprocessor contract
//! ([`Coprocessor`]) and over an in-memory plaintext backend in tests.

use soroban_sdk::{contractclient, contracttype, Address, BytesN, Env};

pub const KIND_BOOL: u32 = 0;
pub const KIND_U8: u32 = 1;
pub const KIND_U64: u32 = 2;

/// Wire form of a right-hand operand.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Operand {
    Enc(BytesN<32>),
    Clear(u64),
}

/// Coprocessor interface. Every call operates on behalf of `caller`, which
/// must be allowed on all input handles; results are transiently allowed to
/// `caller` only.
#[contractclient(name = "CoprocessorClient")]
pub trait EncryptedIntegers {
    fn trivial(env: Env, caller: Address, value: u64, kind: u32) -> BytesN<32>;
    fn random(env: Env, caller: Address, kind: u32, upper_bound: u64) -> BytesN<32>;
    fn add(env: Env, caller: Address, lhs: BytesN<32>, rhs: Operand) -> BytesN<32>;
    fn sub(env: Env, caller: Address, lhs: BytesN<32>, rhs: Operand) -> BytesN<32>;
    fn and(env: Env, caller: Address, lhs: BytesN<32>, rhs: Operand) -> BytesN<32>;
    fn or(env: Env, caller: Address, lhs: BytesN<32>, rhs: Operand) -> BytesN<32>;
    fn not(env: Env, caller: Address, value: BytesN<32>) -> BytesN<32>;
    fn shl(env: Env, caller: Address, value: BytesN<32>, amount: Operand) -> BytesN<32>;
    fn shr(env: Env, caller: Address, value: BytesN<32>, amount: Operand) -> BytesN<32>;
    fn rotr(env: Env, caller: Address, value: BytesN<32>, amount: Operand) -> BytesN<32>;
    fn div(env: Env, caller: Address, value: BytesN<32>, divisor: u64) -> BytesN<32>;
    fn rem(env: Env, caller: Address, value: BytesN<32>, divisor: u64) -> BytesN<32>;
    fn cast(env: Env, caller: Address, value: BytesN<32>, kind: u32) -> BytesN<32>;
    fn eq(env: Env, caller: Address, lhs: BytesN<32>, rhs: Operand) -> BytesN<32>;
    fn gt(env: Env, caller: Address, lhs: BytesN<32>, rhs: Operand) -> BytesN<32>;
    fn select(
        env: Env,
        caller: Address,
        cond: BytesN<32>,
        if_true: BytesN<32>,
        if_false: BytesN<32>,
    ) -> BytesN<32>;
    fn allow(env: Env, caller: Address, handle: BytesN<32>, account: Address);
    fn make_publicly_decryptable(env: Env, caller: Address, handle: BytesN<32>);
}

/// Right-hand operand borrowed from the caller.
pub enum Rhs<'a, H> {
    Enc(&'a H),
    Clear(u64),
}

/// Homomorphic operations the core composes. No method reveals plaintext.
pub trait EncryptedOps {
    type Handle: Clone;

    fn constant(&self, value: u64, kind: u32) -> Self::Handle;
    /// Uniform in `0..upper_bound`; the bound must be a power of two.
    fn random(&self, kind: u32, upper_bound: u64) -> Self::Handle;

    fn add(&self, lhs: &Self::Handle, rhs: Rhs<'_, Self::Handle>) -> Self::Handle;
    fn sub(&self, lhs: &Self::Handle, rhs: Rhs<'_, Self::Handle>) -> Self::Handle;
    fn and(&self, lhs: &Self::Handle, rhs: Rhs<'_, Self::Handle>) -> Self::Handle;
    fn or(&self, lhs: &Self::Handle, rhs: Rhs<'_, Self::Handle>) -> Self::Handle;
    fn not(&self, value: &Self::Handle) -> Self::Handle;
    fn shl(&self, value: &Self::Handle, amount: Rhs<'_, Self::Handle>) -> Self::Handle;
    fn shr(&self, value: &Self::Handle, amount: Rhs<'_, Self::Handle>) -> Self::Handle;
    fn rotr(&self, value: &Self::Handle, amount: Rhs<'_, Self::Handle>) -> Self::Handle;
    fn div(&self, value: &Self::Handle, divisor: u64) -> Self::Handle;
    fn rem(&self, value: &Self::Handle, divisor: u64) -> Self::Handle;
    fn cast(&self, value: &Self::Handle, kind: u32) -> Self::Handle;

    fn eq(&self, lhs: &Self::Handle, rhs: Rhs<'_, Self::Handle>) -> Self::Handle;
    fn gt(&self, lhs: &Self::Handle, rhs: Rhs<'_, Self::Handle>) -> Self::Handle;
    fn select(
        &self,
        cond: &Self::Handle,
        if_true: &Self::Handle,
        if_false: &Self::Handle,
    ) -> Self::Handle;

    fn allow(&self, handle: &Self::Handle, account: &Address);
    /// Keep `handle` operable by this contract in later invocations.
    fn allow_this(&self, handle: &Self::Handle);
    fn make_public(&self, handle: &Self::Handle);
}

/// [`EncryptedOps`] over the configured coprocessor contract, acting as the
/// current contract.
pub struct Coprocessor<'a> {
    client: CoprocessorClient<'a>,
    this: Address,
}

impl<'a> Coprocessor<'a> {
    pub fn new(env: &'a Env, address: &Address) -> Self {
        Self {
            client: CoprocessorClient::new(env, address),
            this: env.current_contract_address(),
        }
    }

    fn operand(rhs: Rhs<'_, BytesN<32>>) -> Operand {
        match rhs {
            Rhs::Enc(handle) => Operand::Enc(handle.clone()),
            Rhs::Clear(value) => Operand::Clear(value),
        }
    }
}

impl EncryptedOps for Coprocessor<'_> {
    type Handle = BytesN<32>;

    fn constant(&self, value: u64, kind: u32) -> BytesN<32> {
        self.client.trivial(&self.this, &value, &kind)
    }

    fn random(&self, kind: u32, upper_bound: u64) -> BytesN<32> {
        self.client.random(&self.this, &kind, &upper_bound)
    }

    fn add(&self, lhs: &BytesN<32>, rhs: Rhs<'_, BytesN<32>>) -> BytesN<32> {
        self.client.add(&self.this, lhs, &Self::operand(rhs))
    }

    fn sub(&self, lhs: &BytesN<32>, rhs: Rhs<'_, BytesN<32>>) -> BytesN<32> {
        self.client.sub(&self.this, lhs, &Self::operand(rhs))
    }

    fn and(&self, lhs: &BytesN<32>, rhs: Rhs<'_, BytesN<32>>) -> BytesN<32> {
        self.client.and(&self.this, lhs, &Self::operand(rhs))
    }

    fn or(&self, lhs: &BytesN<32>, rhs: Rhs<'_, BytesN<32>>) -> BytesN<32> {
        self.client.or(&self.this, lhs, &Self::operand(rhs))
    }

    fn not(&self, value: &BytesN<32>) -> BytesN<32> {
        self.client.not(&self.this, value)
    }

    fn shl(&self, value: &BytesN<32>, amount: Rhs<'_, BytesN<32>>) -> BytesN<32> {
        self.client.shl(&self.this, value, &Self::operand(amount))
    }

    fn shr(&self, value: &BytesN<32>, amount: Rhs<'_, BytesN<32>>) -> BytesN<32> {
        self.client.shr(&self.this, value, &Self::operand(amount))
    }

    fn rotr(&self, value: &BytesN<32>, amount: Rhs<'_, BytesN<32>>) -> BytesN<32> {
        self.client.rotr(&self.this, value, &Self::operand(amount))
    }

    fn div(&self, value: &BytesN<32>, divisor: u64) -> BytesN<32> {
        self.client.div(&self.this, value, &divisor)
    }

    fn rem(&self, value: &BytesN<32>, divisor: u64) -> BytesN<32> {
        self.client.rem(&self.this, value, &divisor)
    }

    fn cast(&self, value: &BytesN<32>, kind: u32) -> BytesN<32> {
        self.client.cast(&self.this, value, &kind)
    }

    fn eq(&self, lhs: &BytesN<32>, rhs: Rhs<'_, BytesN<32>>) -> BytesN<32> {
        self.client.eq(&self.this, lhs, &Self::operand(rhs))
    }

    fn gt(&self, lhs: &BytesN<32>, rhs: Rhs<'_, BytesN<32>>) -> BytesN<32> {
        self.client.gt(&self.this, lhs, &Self::operand(rhs))
    }

    fn select(&self, cond: &BytesN<32>, if_true: &BytesN<32>, if_false: &BytesN<32>) -> BytesN<32> {
        self.client.select(&self.this, cond, if_true, if_false)
    }

    fn allow(&self, handle: &BytesN<32>, account: &Address) {
        self.client.allow(&self.this, handle, account);
    }

    fn allow_this(&self, handle: &BytesN<32>) {
        self.client.allow(&self.this, handle, &self.this);
    }

    fn make_public(&self, handle: &BytesN<32>) {
        self.client.make_publicly_decryptable(&self.this, handle);
    }
}
