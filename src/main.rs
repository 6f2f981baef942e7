//! Arcade Session Demo
//!
//! Runs one launch end to end against logging host callbacks: boot, a short
//! session with a pause, the finish step and the deferred delivery.
//! Without a provisioned key an ephemeral one is generated so the ciphertext
//! can be decrypted and checked at the end.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use arcade_session::{
    boot::{ReadySignal, SceneLayer},
    game::{FrameAction, Suspendable, TimeScore},
    EncryptedPayload, GameResult, GameStartEvent, HostCallbacks, InputEvent, Key, KeySource,
    Orchestrator, ScoreBoard, ScorePayload, SessionContext, SessionParts, TracingHost, FRAME_RATE,
    VERSION,
};

/// Frames played before the pause key, the resume key and the end trigger.
const PAUSE_AT: u32 = 60;
const RESUME_AT: u32 = 90;
const END_AT: u32 = 180;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Arcade Session v{}", VERSION);
    info!("Frame Rate: {} Hz", FRAME_RATE);

    let mut orchestrator = Orchestrator::from_env()?;
    let key_var = orchestrator.config().public_key_var.clone();

    let verifier = if std::env::var(&key_var).is_ok() {
        info!(var = %key_var, "using provisioned public key");
        None
    } else {
        warn!(var = %key_var, "no public key provisioned, generating an ephemeral one");
        let private = RsaPrivateKey::new(&mut rand::thread_rng(), 2048)?;
        let pem = RsaPublicKey::from(&private)
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| anyhow!("encode public key: {e}"))?;
        orchestrator = orchestrator.with_key_source(KeySource::Pem(pem));
        Some(private)
    };

    let host = Arc::new(DemoHost::default());
    let mut orchestrator = orchestrator
        .with_host(host.clone())
        .with_scoreboard(host.clone());

    let result = demo_launch(&mut orchestrator).await?;

    // Verify the host only saw ciphertext of the delivered result
    info!("=== Verifying Submission ===");
    let Some(payload) = host.last_payload() else {
        bail!("onGameEnd was never called");
    };
    match verifier {
        Some(private) => {
            let bytes = STANDARD.decode(payload.as_str())?;
            let plain = private.decrypt(Pkcs1v15Encrypt, &bytes)?;
            let decoded: ScorePayload = serde_json::from_slice(&plain)?;
            if decoded.score == result.score {
                info!(score = decoded.score, "SUBMISSION VERIFIED: ciphertext decrypts to the final score");
            } else {
                bail!("SUBMISSION MISMATCH: decrypted {}, shown {}", decoded.score, result.score);
            }
        }
        None => info!(digest = %payload.digest(), "provisioned key in use, skipping decryption"),
    }

    Ok(())
}

/// Boot, play one session, finish and wait for delivery.
async fn demo_launch(orchestrator: &mut Orchestrator) -> anyhow::Result<GameResult> {
    info!("=== Boot ===");
    let mut ui = DemoLayer::new("ui", Duration::from_millis(120));
    let mut menu = DemoLayer::new("menu", Duration::from_millis(80));
    let report = orchestrator.boot(&mut ui, &mut menu).await?;
    info!(
        ui_ms = report.ui_ready_after.as_millis() as u64,
        menu_ms = report.menu_ready_after.as_millis() as u64,
        "boot complete"
    );

    info!("=== Session ===");
    let parts = SessionParts {
        score: Box::new(TimeScore::new(100)),
        subsystems: vec![Box::new(DemoMusic)],
        ..Default::default()
    };
    let id = orchestrator.start_session(parts)?;
    info!(session = %id, "session started");

    let frame = Duration::from_secs(1) / FRAME_RATE;
    let mut ticker = interval(frame);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut frames = 0u32;
    loop {
        ticker.tick().await;
        frames += 1;

        match frames {
            PAUSE_AT => {
                orchestrator.handle_input(InputEvent::KeyDown(Key::P));
            }
            RESUME_AT => {
                orchestrator.handle_input(InputEvent::KeyDown(Key::Escape));
            }
            END_AT => {
                orchestrator.end_game();
            }
            _ => {}
        }

        let outcome = orchestrator.frame(frame)?;
        if outcome.action == FrameAction::Finish {
            info!(frames, "finish step ran");
            break;
        }
    }

    let result = orchestrator.wait_for_result().await?;
    info!(
        score = result.score,
        high_score = result.high_score,
        new_high_score = result.new_high_score,
        finished_at = %result.finished_at,
        "result delivered"
    );

    orchestrator.exit_to_menu();
    Ok(result)
}

/// Boot layer that reports ready after a delay.
struct DemoLayer {
    name: &'static str,
    delay: Duration,
}

impl DemoLayer {
    fn new(name: &'static str, delay: Duration) -> Self {
        Self { name, delay }
    }
}

impl SceneLayer for DemoLayer {
    fn launch(&mut self, ctx: &SessionContext, created: ReadySignal) {
        info!(
            layer = self.name,
            music_volume = ctx.music_volume(),
            "layer initializing"
        );
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            created.fire();
        });
    }

    fn send_to_back(&mut self) {
        info!(layer = self.name, "sent to back");
    }
}

/// Stand-in for the background music track.
struct DemoMusic;

impl Suspendable for DemoMusic {
    fn label(&self) -> &str {
        "music"
    }

    fn suspend(&mut self) {
        info!("music paused");
    }

    fn resume(&mut self) {
        info!("music playing");
    }
}

/// Logging host that keeps the last ciphertext for verification.
#[derive(Default)]
struct DemoHost {
    inner: TracingHost,
    last_payload: Mutex<Option<EncryptedPayload>>,
}

impl DemoHost {
    fn last_payload(&self) -> Option<EncryptedPayload> {
        self.last_payload.lock().ok().and_then(|p| p.clone())
    }
}

impl HostCallbacks for DemoHost {
    fn on_game_start(&self, event: &GameStartEvent) {
        self.inner.on_game_start(event);
    }

    fn on_game_end(&self, payload: &EncryptedPayload) {
        self.inner.on_game_end(payload);
        if let Ok(mut slot) = self.last_payload.lock() {
            *slot = Some(payload.clone());
        }
    }
}

impl ScoreBoard for DemoHost {
    fn show_score(&self, score: u64, high_score: u64, elapsed: Duration) {
        self.inner.show_score(score, high_score, elapsed);
    }
}
