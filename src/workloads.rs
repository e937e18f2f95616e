//! Built-in workloads the CLI can profile.
//!
//! Each [`Workload`] turns a [`WorkloadParams`] tuple into a fresh
//! [`WorkloadOp`], which is what the profiler invokes.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::fmt;
use std::hint::black_box;
use std::thread;
use std::time::Duration;

use aes_gcm::Aes256Gcm;
use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::ChaCha20Poly1305;
use chacha20poly1305::aead::{self, Aead, AeadCore, KeyInit};
use chacha20poly1305::consts::U12;
use opprof_core::{Error, Result};
use opprof_profiler::Operation;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Default buffer size in bytes
pub const DEFAULT_BYTES: usize = 4096;

/// Default number of rounds per invocation
pub const DEFAULT_ROUNDS: u32 = 1;

/// Default hold time for the `alloc` workload
pub const DEFAULT_HOLD_MS: u64 = 0;

/// Default Argon2 passes
pub const DEFAULT_T_COST: u32 = 1;

/// Default Argon2 memory in KiB
pub const DEFAULT_M_COST: u32 = 65536;

/// Default Argon2 lanes
pub const DEFAULT_PARALLELISM: u32 = 1;

const ARGON2_SALT: &[u8] = b"opprof-argon2-salt";
const ARGON2_OUTPUT_LEN: usize = 32;

const AEAD_KEY: [u8; 32] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f,
    0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x1b, 0x1c, 0x1d, 0x1e, 0x1f,
];

/// Workload selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Workload {
    /// SHA-256 over a buffer
    Sha256,
    /// ChaCha20-Poly1305 encrypt then decrypt
    #[value(name = "chacha20poly1305")]
    #[serde(rename = "chacha20poly1305")]
    ChaCha20Poly1305,
    /// AES-256-GCM encrypt then decrypt
    #[value(name = "aes256gcm")]
    #[serde(rename = "aes256gcm")]
    Aes256Gcm,
    /// Argon2id hash of a `bytes`-long password
    Argon2,
    /// Allocate, touch and hold a buffer
    Alloc,
}

impl Workload {
    /// Workload name as used on the command line and in plan files
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::ChaCha20Poly1305 => "chacha20poly1305",
            Self::Aes256Gcm => "aes256gcm",
            Self::Argon2 => "argon2",
            Self::Alloc => "alloc",
        }
    }

    /// Build a fresh operation for one parameter tuple.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if `rounds` is zero for a workload that
    /// loops, or if the Argon2 costs are rejected by the hasher.
    pub fn build(self, params: &WorkloadParams) -> Result<WorkloadOp> {
        match self {
            Self::Sha256 => Ok(WorkloadOp::Sha256 {
                input: vec![0x42; params.bytes],
                rounds: params.rounds_checked(self)?,
            }),
            Self::ChaCha20Poly1305 => Ok(WorkloadOp::ChaCha20Poly1305 {
                cipher: ChaCha20Poly1305::new(&AEAD_KEY.into()),
                plaintext: vec![0x42; params.bytes],
                rounds: params.rounds_checked(self)?,
                counter: 0,
            }),
            Self::Aes256Gcm => Ok(WorkloadOp::Aes256Gcm {
                cipher: Aes256Gcm::new(&AEAD_KEY.into()),
                plaintext: vec![0x42; params.bytes],
                rounds: params.rounds_checked(self)?,
                counter: 0,
            }),
            Self::Argon2 => Ok(WorkloadOp::Argon2 {
                hasher: Argon2::new(Algorithm::Argon2id, Version::V0x13, params.argon2_params()?),
                password: vec![0x42; params.bytes],
                rounds: params.rounds_checked(self)?,
            }),
            Self::Alloc => Ok(WorkloadOp::Alloc {
                bytes: params.bytes,
                hold: Duration::from_millis(params.hold_ms),
            }),
        }
    }

    /// Bytes processed by one invocation, for throughput reporting
    #[must_use]
    pub fn bytes_processed(self, params: &WorkloadParams) -> Option<usize> {
        match self {
            Self::Sha256 | Self::ChaCha20Poly1305 | Self::Aes256Gcm => {
                usize::try_from(params.rounds)
                    .ok()
                    .and_then(|rounds| params.bytes.checked_mul(rounds))
            }
            Self::Argon2 | Self::Alloc => None,
        }
    }
}

impl fmt::Display for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One parameter tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadParams {
    /// Buffer size in bytes
    pub bytes: usize,
    /// Repetitions of the core step per invocation
    pub rounds: u32,
    /// Milliseconds the `alloc` workload keeps its buffer
    pub hold_ms: u64,
    /// Argon2 passes over memory
    pub t_cost: u32,
    /// Argon2 memory in KiB
    pub m_cost: u32,
    /// Argon2 lanes
    pub parallelism: u32,
}

impl WorkloadParams {
    fn rounds_checked(&self, workload: Workload) -> Result<u32> {
        if self.rounds == 0 {
            return Err(Error::invalid_config(format!(
                "{workload} needs at least one round"
            )));
        }
        Ok(self.rounds)
    }

    fn argon2_params(&self) -> Result<Params> {
        Params::new(
            self.m_cost,
            self.t_cost,
            self.parallelism,
            Some(ARGON2_OUTPUT_LEN),
        )
        .map_err(|e| {
            Error::invalid_config(format!(
                "argon2 t_cost={} m_cost={} parallelism={}: {e}",
                self.t_cost, self.m_cost, self.parallelism
            ))
        })
    }
}

impl Default for WorkloadParams {
    fn default() -> Self {
        Self {
            bytes: DEFAULT_BYTES,
            rounds: DEFAULT_ROUNDS,
            hold_ms: DEFAULT_HOLD_MS,
            t_cost: DEFAULT_T_COST,
            m_cost: DEFAULT_M_COST,
            parallelism: DEFAULT_PARALLELISM,
        }
    }
}

/// A ready-to-run workload instance
pub enum WorkloadOp {
    Sha256 {
        input: Vec<u8>,
        rounds: u32,
    },
    ChaCha20Poly1305 {
        cipher: ChaCha20Poly1305,
        plaintext: Vec<u8>,
        rounds: u32,
        counter: u64,
    },
    Aes256Gcm {
        cipher: Aes256Gcm,
        plaintext: Vec<u8>,
        rounds: u32,
        counter: u64,
    },
    Argon2 {
        hasher: Argon2<'static>,
        password: Vec<u8>,
        rounds: u32,
    },
    Alloc {
        bytes: usize,
        hold: Duration,
    },
}

impl Operation for WorkloadOp {
    fn invoke(&mut self) -> Result<()> {
        match self {
            Self::Sha256 { input, rounds } => {
                for _ in 0..*rounds {
                    black_box(Sha256::digest(input.as_slice()));
                }
                Ok(())
            }
            Self::ChaCha20Poly1305 {
                cipher,
                plaintext,
                rounds,
                counter,
            } => {
                for _ in 0..*rounds {
                    seal_and_open(cipher, *counter, plaintext)?;
                    *counter = counter.wrapping_add(1);
                }
                Ok(())
            }
            Self::Aes256Gcm {
                cipher,
                plaintext,
                rounds,
                counter,
            } => {
                for _ in 0..*rounds {
                    seal_and_open(cipher, *counter, plaintext)?;
                    *counter = counter.wrapping_add(1);
                }
                Ok(())
            }
            Self::Argon2 {
                hasher,
                password,
                rounds,
            } => {
                let mut hash = [0u8; ARGON2_OUTPUT_LEN];
                for _ in 0..*rounds {
                    hasher
                        .hash_password_into(password, ARGON2_SALT, &mut hash)
                        .map_err(|e| Error::operation(format!("argon2: {e}")))?;
                    black_box(&hash);
                }
                Ok(())
            }
            Self::Alloc { bytes, hold } => {
                let buffer = vec![1u8; *bytes];
                if !hold.is_zero() {
                    thread::sleep(*hold);
                }
                black_box(&buffer);
                Ok(())
            }
        }
    }
}

/// 96-bit nonce with the counter in its low 8 bytes
fn counter_nonce(counter: u64) -> [u8; 12] {
    let mut bytes = [0u8; 12];
    bytes
        .iter_mut()
        .zip(counter.to_le_bytes())
        .for_each(|(dst, src)| *dst = src);
    bytes
}

fn seal_and_open<C>(cipher: &C, counter: u64, plaintext: &[u8]) -> Result<()>
where
    C: Aead + AeadCore<NonceSize = U12>,
{
    let nonce = aead::Nonce::<C>::from(counter_nonce(counter));
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| Error::operation(format!("encrypt: {e}")))?;
    let opened = cipher
        .decrypt(&nonce, ciphertext.as_slice())
        .map_err(|e| Error::operation(format!("decrypt: {e}")))?;

    if opened != plaintext {
        return Err(Error::operation("decrypted text differs from plaintext"));
    }
    black_box(opened);
    Ok(())
}
