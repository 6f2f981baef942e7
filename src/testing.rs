//! Shared fixtures for unit tests.

use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};

use crate::host::{GameStartEvent, HostCallbacks, ScoreBoard};
use crate::submit::payload::EncryptedPayload;

/// Ordered record of host-facing calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Start(GameStartEvent),
    Shown(u64, u64, Duration),
    End(EncryptedPayload),
}

#[derive(Debug, Default)]
pub struct RecordingHost {
    calls: Mutex<Vec<HostCall>>,
}

impl RecordingHost {
    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn start_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, HostCall::Start(_)))
            .count()
    }

    pub fn end_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, HostCall::End(_)))
            .count()
    }

    pub fn last_end(&self) -> Option<EncryptedPayload> {
        self.calls().into_iter().rev().find_map(|c| match c {
            HostCall::End(p) => Some(p),
            _ => None,
        })
    }

    pub fn shown(&self) -> Vec<(u64, u64, Duration)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HostCall::Shown(s, h, e) => Some((s, h, e)),
                _ => None,
            })
            .collect()
    }
}

impl HostCallbacks for RecordingHost {
    fn on_game_start(&self, event: &GameStartEvent) {
        self.calls.lock().unwrap().push(HostCall::Start(event.clone()));
    }

    fn on_game_end(&self, payload: &EncryptedPayload) {
        self.calls.lock().unwrap().push(HostCall::End(payload.clone()));
    }
}

impl ScoreBoard for RecordingHost {
    fn show_score(&self, score: u64, high_score: u64, elapsed: Duration) {
        self.calls
            .lock()
            .unwrap()
            .push(HostCall::Shown(score, high_score, elapsed));
    }
}

pub fn private_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap())
}

pub fn public_key_pem() -> String {
    RsaPublicKey::from(private_key())
        .to_public_key_pem(LineEnding::LF)
        .unwrap()
}

pub fn decrypt(payload: &EncryptedPayload) -> String {
    let bytes = STANDARD.decode(payload.as_str()).unwrap();
    let plain = private_key().decrypt(Pkcs1v15Encrypt, &bytes).unwrap();
    String::from_utf8(plain).unwrap()
}
