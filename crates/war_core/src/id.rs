use rand::Rng;
use uuid::Uuid;

/// Game identifier drawn from the game's own seeded Rng, so replays share it.
pub fn generate_game_id(rng: &mut impl Rng) -> Uuid {
    let bytes: [u8; 16] = rng.gen();
    uuid::Builder::from_random_bytes(bytes).into_uuid()
}
