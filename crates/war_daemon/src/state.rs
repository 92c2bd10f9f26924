use parking_lot::Mutex;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use war_core::{ActorId, EventEnvelope, GameContent, GameState};

pub struct SimState {
    pub game_state: GameState,
    pub content: GameContent,
    pub rng: ChaCha8Rng,
    /// Outstanding delayed-action timer per actor.
    pub timers: HashMap<ActorId, JoinHandle<()>>,
    /// Text sink per connected human.
    pub writers: HashMap<ActorId, mpsc::UnboundedSender<String>>,
    pub started: Instant,
}

impl SimState {
    pub fn new(game_state: GameState, content: GameContent, rng: ChaCha8Rng) -> Self {
        Self {
            game_state,
            content,
            rng,
            timers: HashMap::new(),
            writers: HashMap::new(),
            started: Instant::now(),
        }
    }

    /// Bring the game clock up to wall time. Call before every mutation.
    pub fn stamp(&mut self) {
        let elapsed = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.game_state.meta.now_ms = self.game_state.meta.now_ms.max(elapsed);
    }
}

pub type SharedSim = Arc<Mutex<SimState>>;
pub type EventTx = broadcast::Sender<Vec<EventEnvelope>>;

#[derive(Clone)]
pub struct AppState {
    pub sim: SharedSim,
    pub event_tx: EventTx,
}

impl AppState {
    pub fn new(sim: SimState) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            sim: Arc::new(Mutex::new(sim)),
            event_tx,
        }
    }
}
