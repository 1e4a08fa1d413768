//! BCH(31,21,5) Error Correction for FLEX
//!
//! Every 32-bit word on the air carries 21 message bits protected by a
//! (31,21) binary BCH code with designed distance 5, able to correct up to
//! two bit errors.
//!
//! **Code parameters**:
//! - m = 5 (field order, GF(2^5))
//! - n = 31 (code length, 2^5 - 1)
//! - k = 21 (data bits)
//! - t = 2 (error correcting capability)
//! - primitive polynomial x^5 + x^2 + 1
//!
//! **Decoding**: syndromes S1..S4 are computed over GF(2^5) in index form.
//! A single error satisfies S3 = 3*S1 and is flipped directly. Two errors
//! are located with the closed-form degree-2 error-locator polynomial and a
//! Chien search; at t=2 no Berlekamp-Massey iteration is needed.
//!
//! **Word layout**: the high 31 bits of a received word are the codeword,
//! MSB-first, so bit 30 is the coefficient of x^0. The 10 parity bits land
//! in bits 30..21 and the 21 message bits in bits 20..0, which is why the
//! frame path masks corrected words with `0x1FFFFF`.

use bitvec::prelude::*;
use snafu::Snafu;
use tracing::{debug, trace};

/// Primitive polynomial coefficients for GF(2^5): x^5 + x^2 + 1
pub const FLEX_BCH_POLY: [u8; 6] = [1, 0, 1, 0, 0, 1];

/// Mask selecting the 21 message bits of a corrected word
pub const MESSAGE_BITS_MASK: u32 = 0x1F_FFFF;

#[derive(Debug, Snafu)]
pub enum BchError {
    /// Data length must be strictly smaller than the code length
    #[snafu(display("invalid BCH parameters: k={k} must be less than n={n}"))]
    InvalidParameters { n: usize, k: usize },

    /// The primitive polynomial needs exactly m+1 coefficients
    #[snafu(display("primitive polynomial must have {expected} coefficients, got {actual}"))]
    InvalidPolynomial { expected: usize, actual: usize },
}

/// Binary BCH codec over GF(2^m) with precomputed field tables.
///
/// The decode path implements the closed-form t=2 corrector; constructing a
/// codec with a different `t` is rejected.
pub struct Bch3121 {
    n: usize,
    k: usize,
    /// Log table: power index -> field element
    alpha_to: Vec<i32>,
    /// Antilog table: field element -> power index, -1 for zero
    index_of: Vec<i32>,
    /// Generator polynomial coefficients g[0..=n-k]
    generator: Vec<i32>,
}

impl Bch3121 {
    /// Build a codec from the primitive polynomial and code parameters.
    ///
    /// # Arguments
    /// * `poly` - primitive polynomial coefficients, constant term first (m+1 entries)
    /// * `m` - field order
    /// * `n` - code length (2^m - 1)
    /// * `k` - data length
    /// * `t` - error correcting capability (must be 2)
    pub fn new(poly: &[u8], m: usize, n: usize, k: usize, t: usize) -> Result<Self, BchError> {
        if k >= n || t != 2 {
            return Err(BchError::InvalidParameters { n, k });
        }
        if poly.len() != m + 1 {
            return Err(BchError::InvalidPolynomial {
                expected: m + 1,
                actual: poly.len(),
            });
        }

        let (alpha_to, index_of) = generate_field(poly, m, n);
        let generator = generate_polynomial(&alpha_to, &index_of, n, 2 * t);

        Ok(Self {
            n,
            k,
            alpha_to,
            index_of,
            generator,
        })
    }

    /// Codec with the fixed FLEX parameters: BCH(31,21,5), x^5 + x^2 + 1.
    pub fn flex() -> Result<Self, BchError> {
        Self::new(&FLEX_BCH_POLY, 5, 31, 21, 2)
    }

    /// Encode 21 data bits into a 31-bit codeword.
    ///
    /// Parity is the remainder of x^(n-k) * d(x) divided by the generator
    /// polynomial (LFSR division). The returned word carries parity in bits
    /// 30..21 and the data untouched in bits 20..0.
    pub fn encode(&self, data: u32) -> u32 {
        let data = data & MESSAGE_BITS_MASK;
        let parity_len = self.n - self.k;
        let mut parity = vec![0u8; parity_len];

        // Data coefficient d[i] is the coefficient of x^(n-k+i), stored at
        // word bit (k - 1 - i).
        for i in (0..self.k).rev() {
            let data_bit = ((data >> (self.k - 1 - i)) & 1) as u8;
            let feedback = data_bit ^ parity[parity_len - 1];
            if feedback != 0 {
                for j in (1..parity_len).rev() {
                    parity[j] = if self.generator[j] != 0 {
                        parity[j - 1] ^ feedback
                    } else {
                        parity[j - 1]
                    };
                }
                parity[0] = (self.generator[0] != 0 && feedback != 0) as u8;
            } else {
                for j in (1..parity_len).rev() {
                    parity[j] = parity[j - 1];
                }
                parity[0] = 0;
            }
        }

        // Parity coefficient j is the coefficient of x^j, stored at word bit (n - 1 - j).
        let mut codeword = data;
        for (j, &p) in parity.iter().enumerate() {
            if p != 0 {
                codeword |= 1 << (self.n - 1 - j);
            }
        }
        codeword
    }

    /// Correct up to two bit errors in a received 31-bit codeword.
    ///
    /// # Returns
    /// * `Some((corrected, errors_fixed))` on success (`errors_fixed` 0..=2)
    /// * `None` when the error pattern is uncorrectable
    pub fn correct(&self, received: u32) -> Option<(u32, u32)> {
        let received = received & 0x7FFF_FFFF;
        let mut word = received;
        let n = self.n as i32;

        // Syndromes S1..S4 in index form. The coefficient of x^j is word
        // bit (n-1-j), i.e. index j+1 of the MSB-first bit view.
        let bits = word.view_bits::<Msb0>();
        let mut s = [-1i32; 5];
        let mut syn_error = false;
        for i in 1..=4usize {
            let mut sum = 0i32;
            for (j, bit) in bits[1..].iter().enumerate() {
                if *bit {
                    sum ^= self.alpha_to[(i * j) % self.n];
                }
            }
            if sum != 0 {
                syn_error = true;
            }
            s[i] = self.index_of[sum as usize];
        }

        if !syn_error {
            return Some((word, 0));
        }
        if s[1] == -1 {
            // S1 zero but another syndrome set: more than t errors
            return None;
        }

        let s3 = (s[1] * 3) % n;
        if s[3] == s3 {
            // Single error at position S1
            word ^= 1 << (n - 1 - s[1]);
        } else {
            // Two errors: closed-form error locator, aux = S1^3 + S3
            let aux = if s[3] != -1 {
                self.alpha_to[s3 as usize] ^ self.alpha_to[s[3] as usize]
            } else {
                self.alpha_to[s3 as usize]
            };

            let mut elp = [-1i32; 3];
            elp[0] = 0;
            elp[1] = (s[2] - self.index_of[aux as usize] + n) % n;
            elp[2] = (s[1] - self.index_of[aux as usize] + n) % n;

            // Chien search over all positions; exactly two roots required
            let mut reg = elp;
            let mut roots = [0usize; 2];
            let mut count = 0;
            for i in 1..=self.n {
                let mut q = 1i32;
                for j in 1..=2usize {
                    if reg[j] != -1 {
                        reg[j] = (reg[j] + j as i32) % n;
                        q ^= self.alpha_to[reg[j] as usize];
                    }
                }
                if q == 0 {
                    if count < 2 {
                        roots[count] = i % self.n;
                    }
                    count += 1;
                }
            }
            if count != 2 {
                return None;
            }
            for &loc in &roots {
                word ^= 1 << (self.n - 1 - loc);
            }
        }

        Some((word, (received ^ word).count_ones()))
    }

    /// Correct the high 31 bits of a phase word in place.
    ///
    /// This is the helper the frame path consumes: bit 31 is ignored, the
    /// corrected codeword replaces the word on success, and the caller is
    /// told whether the word is usable.
    pub fn fix_errors(&self, word: &mut u32, phase_id: char) -> bool {
        match self.correct(*word) {
            Some((corrected, fixed)) => {
                if fixed > 0 {
                    debug!(
                        phase = %phase_id,
                        errors = fixed,
                        "fixed errors at 0x{:08X} (0x{:08X} -> 0x{:08X})",
                        (*word & 0x7FFF_FFFF) ^ corrected,
                        *word & 0x7FFF_FFFF,
                        corrected
                    );
                }
                *word = corrected;
                true
            }
            None => {
                if *word != 0 {
                    trace!(phase = %phase_id, "data corruption, unable to fix errors (0x{:08X})", *word);
                }
                false
            }
        }
    }
}

/// Generate the GF(2^m) log/antilog tables from the primitive polynomial.
fn generate_field(poly: &[u8], m: usize, n: usize) -> (Vec<i32>, Vec<i32>) {
    let mut alpha_to = vec![0i32; n];
    let mut index_of = vec![-1i32; 1 << m];

    let mut mask = 1i32;
    alpha_to[m] = 0;
    for i in 0..m {
        alpha_to[i] = mask;
        index_of[alpha_to[i] as usize] = i as i32;
        if poly[i] != 0 {
            alpha_to[m] ^= mask;
        }
        mask <<= 1;
    }
    index_of[alpha_to[m] as usize] = m as i32;
    mask >>= 1;
    for i in m + 1..n {
        alpha_to[i] = if alpha_to[i - 1] >= mask {
            alpha_to[m] ^ ((alpha_to[i - 1] ^ mask) << 1)
        } else {
            alpha_to[i - 1] << 1
        };
        index_of[alpha_to[i] as usize] = i as i32;
    }
    index_of[0] = -1;

    (alpha_to, index_of)
}

/// Generator polynomial from the cyclotomic cosets of alpha^1 .. alpha^(d-1).
fn generate_polynomial(alpha_to: &[i32], index_of: &[i32], n: usize, max_root: usize) -> Vec<i32> {
    // Collect the roots of g(x): cosets {r, 2r, 4r, ...} mod n for each
    // designed root 1..=2t not already covered.
    let mut seen = vec![false; n];
    let mut zeros: Vec<usize> = Vec::new();
    for root in 1..=max_root {
        if seen[root] {
            continue;
        }
        let mut r = root;
        loop {
            seen[r] = true;
            zeros.push(r);
            r = (r * 2) % n;
            if r == root {
                break;
            }
        }
    }

    // g(x) = product over the roots of (x + alpha^z)
    let redundancy = zeros.len();
    let mut g = vec![0i32; redundancy + 1];
    g[0] = alpha_to[zeros[0]];
    g[1] = 1;
    for i in 2..=redundancy {
        let z = zeros[i - 1] as i32;
        g[i] = 1;
        for j in (1..i).rev() {
            g[j] = if g[j] != 0 {
                g[j - 1] ^ alpha_to[((index_of[g[j] as usize] + z) % n as i32) as usize]
            } else {
                g[j - 1]
            };
        }
        g[0] = alpha_to[((index_of[g[0] as usize] + z) % n as i32) as usize];
    }
    g
}
