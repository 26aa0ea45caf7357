//! SRP-6a scratch state: the handful of big integers the handshake carries
//! between `ReadServerKeyExchange` and `SendClientKeyExchange`, destroyed at
//! handshake completion.

use num_bigint::BigUint;
use zeroize::Zeroize;

use crate::codec::ServerKeyExchange;
use crate::crypto::{bigint, group, hash};

/// `N`, `g`, `s`, `B`, `a`, `A`, plus the password-derived exponent `x`,
/// computed once from the server's salt. Zeroed by [`SrpState::zeroize`],
/// called from [`crate::auth::ClientAuthenticator`]'s `Drop`.
pub struct SrpState {
    n: BigUint,
    g: BigUint,
    s: Vec<u8>,
    b: BigUint,
    a: BigUint,
    capital_a: BigUint,
    x: BigUint,
}

impl SrpState {
    /// Validates the server's `ServerKeyExchange` against the fixed group,
    /// draws the client's ephemeral exponent, computes `A`, and derives `x`
    /// from `username`/`password`/the server-provided salt.
    ///
    /// Returns `Err(())` on any validation failure; the caller maps this to
    /// `AuthErrorCode::KeyExchangeFailure`.
    pub fn from_server_key_exchange(
        ske: &ServerKeyExchange,
        username: &str,
        password: &str,
    ) -> Result<Self, ()> {
        let n = bigint::bytes_to_bigint(&ske.n);
        let g = bigint::bytes_to_bigint(&ske.g);
        if n != *group::safe_prime() || g != group::generator() {
            return Err(());
        }

        let b = bigint::bytes_to_bigint(&ske.b);
        if b == BigUint::from(0u8) || &b % &n == BigUint::from(0u8) {
            return Err(());
        }

        let a = bigint::random_exponent(&n);
        let capital_a = bigint::modexp(&g, &a, &n);
        if capital_a == BigUint::from(0u8) {
            return Err(());
        }

        let inner = hash::hash(&[username.as_bytes(), b":", password.as_bytes()]);
        let x_bytes = hash::hash(&[&ske.s, &inner]);
        let x = bigint::bytes_to_bigint(&x_bytes);

        Ok(Self {
            n,
            g,
            s: ske.s.clone(),
            b,
            a,
            capital_a,
            x,
        })
    }

    pub fn public_value_bytes(&self) -> Vec<u8> {
        bigint::bigint_to_padded_bytes(&self.capital_a, group::padded_len())
    }

    /// Computes the shared secret `K = H(S)` where
    /// `S = (B − k·g^x)^(a + u·x) mod N`, `k = H(N ‖ PAD(g))`, and
    /// `u = H(PAD(A) ‖ PAD(B))`.
    pub fn shared_secret_hash(&self) -> [u8; 32] {
        let len = group::padded_len();
        let k_bytes = hash::hash(&[
            &bigint::bigint_to_padded_bytes(&self.n, len),
            &bigint::bigint_to_padded_bytes(&self.g, len),
        ]);
        let k = bigint::bytes_to_bigint(&k_bytes);

        let u_bytes = hash::hash(&[
            &bigint::bigint_to_padded_bytes(&self.capital_a, len),
            &bigint::bigint_to_padded_bytes(&self.b, len),
        ]);
        let u = bigint::bytes_to_bigint(&u_bytes);

        let g_x = bigint::modexp(&self.g, &self.x, &self.n);
        let k_g_x = bigint::mulmod(&k, &g_x, &self.n);
        // `B − k·g^x mod N`, computed without underflow: `k_g_x < N ≤ B + N`.
        let base = bigint::sub(&(&self.b + &self.n), &k_g_x) % &self.n;
        let exponent = &self.a + bigint::mulmod(&u, &self.x, &self.n);
        let shared = bigint::modexp(&base, &exponent, &self.n);

        hash::hash(&[&shared.to_bytes_be()])
    }
}

impl Zeroize for SrpState {
    fn zeroize(&mut self) {
        self.n.zeroize_owned();
        self.g.zeroize_owned();
        self.s.zeroize();
        self.b.zeroize_owned();
        self.a.zeroize_owned();
        self.capital_a.zeroize_owned();
        self.x.zeroize_owned();
    }
}

trait ZeroizeOwnedBigUint {
    fn zeroize_owned(&mut self);
}

impl ZeroizeOwnedBigUint for BigUint {
    fn zeroize_owned(&mut self) {
        *self = BigUint::from(0u8);
    }
}

impl Drop for SrpState {
    fn drop(&mut self) {
        self.zeroize();
    }
}
