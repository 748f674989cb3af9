//! # Pool Addressing
//!
//! Exchange pools live at addresses derived from the factory, the token
//! pair and the fee tier. Knowing the address ahead of time lets a token
//! exempt its pools at deployment, before anyone creates them.

use ngu_ledger::Address;

/// Domain separator mixed into every pool derivation.
const POOL_DOMAIN: &[u8] = b"ngu-pool-v1";

/// Derives the pool address for `(token_a, token_b, fee)` under `factory`.
///
/// The two tokens are sorted first, so the result does not depend on the
/// order they are passed in.
pub fn compute_pool_address(factory: Address, token_a: Address, token_b: Address, fee: u32) -> Address {
    let (token0, token1) = if token_a <= token_b {
        (token_a, token_b)
    } else {
        (token_b, token_a)
    };

    let mut hasher = blake3::Hasher::new();
    hasher.update(POOL_DOMAIN);
    hasher.update(factory.as_bytes());
    hasher.update(token0.as_bytes());
    hasher.update(token1.as_bytes());
    hasher.update(&fee.to_be_bytes());
    Address::from_digest(hasher.finalize().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> Address {
        Address::derive("factory")
    }

    #[test]
    fn token_order_does_not_matter() {
        let a = Address::derive("token");
        let b = Address::derive("weth");
        assert_eq!(
            compute_pool_address(factory(), a, b, 3_000),
            compute_pool_address(factory(), b, a, 3_000)
        );
    }

    #[test]
    fn fee_and_factory_separate_pools() {
        let a = Address::derive("token");
        let b = Address::derive("weth");
        let p500 = compute_pool_address(factory(), a, b, 500);
        assert_ne!(p500, compute_pool_address(factory(), a, b, 3_000));
        assert_ne!(p500, compute_pool_address(Address::derive("other"), a, b, 500));
        assert!(!p500.is_zero());
    }
}
