//! The fixed SRP-6a safe prime group this client speaks.
//!
//! The client does not negotiate a group; it validates that the server's
//! advertised `N`/`g` match this constant pair (see
//! [`crate::auth::ClientAuthenticator`]'s `ReadServerKeyExchange` step). This
//! is the 1024-bit demonstration group from RFC 5054 Appendix B, the same
//! constant widely reused by SRP client implementations for interop testing.

use std::sync::OnceLock;

use num_bigint::BigUint;

const N_1024_HEX: &str = "\
EEAF0AB9ADB38DD69C33F80AFA8FC5E860726187755FF3C0B9EA2314C9C256576D674DF\
7496EA81D3383B4813D692C6E0E0D5D8E250B98BE48E495C1D6089DAD15DC7D7B46154D\
6B6CE8EF4AD69B15D4982559B297BCF1885C529F566660E57EC68EDBC3C05726CC02FD4\
CBF4976EAA9AFD5138FE8376435B9FC61D2FC0EB06E3";

/// Generator `g` for the RFC 5054 1024-bit group.
pub const G: u8 = 2;

/// The safe prime `N`.
pub fn safe_prime() -> &'static BigUint {
    static N: OnceLock<BigUint> = OnceLock::new();
    N.get_or_init(|| {
        BigUint::parse_bytes(N_1024_HEX.as_bytes(), 16).expect("embedded safe prime must parse")
    })
}

/// The generator `g`, as a `BigUint`, for use in modular exponentiation.
pub fn generator() -> BigUint {
    BigUint::from(G)
}

/// Byte length of `N`, used to left-pad values for the `PAD()` operation in
/// the `k`/`u` derivations.
pub fn padded_len() -> usize {
    safe_prime().to_bytes_be().len()
}
