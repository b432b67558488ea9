// SPDX-License-Identifier: MIT

//! Hash-seeded random stream
//!
//! The seed is the SHA-256 digest of `"{namespace}:{seed_key}:{question}"`;
//! every draw hashes the seed together with a counter. The same inputs
//! therefore always give the same sequence.

use sha2::{Digest, Sha256};

pub struct SeededRng {
    seed: [u8; 32],
    counter: u64,
}

impl SeededRng {
    pub fn new(namespace: &str, seed_key: &str, question: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(format!("{}:{}:{}", namespace, seed_key, question).as_bytes());
        Self {
            seed: hasher.finalize().into(),
            counter: 0,
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(self.seed);
        hasher.update(self.counter.to_le_bytes());
        self.counter += 1;

        let digest = hasher.finalize();
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(buf)
    }

    /// Uniform float in `[0, 1)`
    pub fn unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform index in `0..n`; `n` must be non-zero
    pub fn below(&mut self, n: usize) -> usize {
        ((self.unit() * n as f64) as usize).min(n.saturating_sub(1))
    }

    /// `k` distinct items, in draw order
    pub fn sample<T: Clone>(&mut self, items: &[T], k: usize) -> Vec<T> {
        let mut pool: Vec<usize> = (0..items.len()).collect();
        let k = k.min(pool.len());
        for i in 0..k {
            let j = i + self.below(pool.len() - i);
            pool.swap(i, j);
        }
        pool[..k].iter().map(|&idx| items[idx].clone()).collect()
    }
}
