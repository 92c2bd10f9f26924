//! Line-protocol TCP sessions: enlistment prompts, then one command line per input line.

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{info, warn};
use war_core::{registry, scheduler, ActorId, ActorKind, Outbox, Side};

use crate::delivery::deliver;
use crate::state::AppState;

const ETX: char = '\u{3}';
const INTERRUPT_LINE: &str = "/INTERRUPT";
const BANNER: &str = "*** DECWAR ***\nFederation and Empire are at war. Choose your side, Captain.";

type Writer = mpsc::UnboundedSender<String>;

pub async fn serve_tcp(listener: TcpListener, app: AppState) -> Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        info!(%peer, "connection opened");
        let app = app.clone();
        tokio::spawn(async move {
            if let Err(err) = run_session(stream, app).await {
                warn!(%peer, err = %err, "session ended with error");
            }
            info!(%peer, "connection closed");
        });
    }
}

async fn run_session(stream: TcpStream, app: AppState) -> Result<()> {
    let (rd, mut wr) = stream.into_split();
    let mut lines = BufReader::new(rd).lines();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            let wire = format!("{}\r\n", text.replace('\n', "\r\n"));
            if wr.write_all(wire.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let _ = tx.send(BANNER.to_string());
    let Some(actor) = enlist(&app, &mut lines, &tx).await? else {
        drop(tx);
        let _ = writer.await;
        return Ok(());
    };

    let result = command_loop(&app, actor, &mut lines).await;
    leave(&app, actor);
    drop(tx);
    let _ = writer.await;
    result
}

async fn command_loop<R>(app: &AppState, actor: ActorId, lines: &mut Lines<R>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    while let Some(line) = lines.next_line().await? {
        handle_line(app, actor, &line);
    }
    Ok(())
}

/// Ask for a captain name, side and ship until a ship launches. `None` if the peer hangs up.
async fn enlist<R>(app: &AppState, lines: &mut Lines<R>, tx: &Writer) -> Result<Option<ActorId>>
where
    R: AsyncBufRead + Unpin,
{
    let _ = tx.send("Captain's name:".to_string());
    let Some(name) = lines.next_line().await? else {
        return Ok(None);
    };
    let name = match name.trim() {
        "" => "Captain".to_string(),
        given => given.to_string(),
    };

    loop {
        let _ = tx.send("Side (FEDERATION or EMPIRE, blank for the weaker side):".to_string());
        let Some(answer) = lines.next_line().await? else {
            return Ok(None);
        };
        let weaker = registry::weaker_side(&app.sim.lock().game_state);
        let Some(side) = parse_side(weaker, answer.trim()) else {
            let _ = tx.send("Unknown side.".to_string());
            continue;
        };

        let free = {
            let sim = app.sim.lock();
            registry::free_roster_names(&sim.game_state, &sim.content, side)
        };
        if free.is_empty() {
            let _ = tx.send(format!("Every {side} ship is in service."));
            continue;
        }
        let _ = tx.send(format!("Ship ({}, blank for {}):", free.join(", "), free[0]));
        let Some(answer) = lines.next_line().await? else {
            return Ok(None);
        };
        match enlist_actor(app, &name, side, answer.trim(), tx) {
            Ok(actor) => return Ok(Some(actor)),
            Err(reason) => {
                let _ = tx.send(reason);
            }
        }
    }
}

fn parse_side(default: Side, answer: &str) -> Option<Side> {
    if answer.is_empty() {
        return Some(default);
    }
    let upper = answer.to_ascii_uppercase();
    if "FEDERATION".starts_with(&upper) {
        Some(Side::Federation)
    } else if "EMPIRE".starts_with(&upper) {
        Some(Side::Empire)
    } else {
        None
    }
}

/// Register a human actor and launch their ship. Blank `wanted` takes the first free roster name.
pub fn enlist_actor(
    app: &AppState,
    name: &str,
    side: Side,
    wanted: &str,
    tx: &Writer,
) -> Result<ActorId, String> {
    let mut guard = app.sim.lock();
    let sim = &mut *guard;
    sim.stamp();

    let free = registry::free_roster_names(&sim.game_state, &sim.content, side);
    let ship = if wanted.is_empty() {
        free.first().cloned()
    } else {
        free.iter().find(|n| n.eq_ignore_ascii_case(wanted)).cloned()
    };
    let Some(ship) = ship else {
        return Err(format!("No free {side} ship named {wanted}."));
    };

    let actor = registry::connect_actor(&mut sim.game_state, name, ActorKind::Human);
    let mut out = Outbox::new();
    if let Err(err) = registry::launch_ship(
        &mut sim.game_state,
        &sim.content,
        &mut sim.rng,
        &mut out,
        actor,
        side,
        &ship,
    ) {
        sim.game_state.actors.remove(&actor);
        return Err(err.to_string());
    }
    sim.writers.insert(actor, tx.clone());
    let position = registry::ship(&sim.game_state, actor).map(|s| s.position);
    if let Some(position) = position {
        let _ = tx.send(format!(
            "Welcome aboard the {ship}, Captain {name}. You are in sector {position}."
        ));
    }
    info!(%actor, %ship, %side, "captain enlisted");
    deliver(app, sim, out);
    Ok(actor)
}

fn is_interrupt(line: &str) -> bool {
    line.contains(ETX) || line.trim().eq_ignore_ascii_case(INTERRUPT_LINE)
}

/// One input line from a connected captain.
pub fn handle_line(app: &AppState, actor: ActorId, line: &str) {
    let mut guard = app.sim.lock();
    let sim = &mut *guard;
    sim.stamp();
    let mut out = Outbox::new();
    if is_interrupt(line) {
        scheduler::interrupt(&mut sim.game_state, &mut out, actor);
    } else {
        scheduler::submit_line(
            &mut sim.game_state,
            &sim.content,
            &mut sim.rng,
            &mut out,
            actor,
            line,
        );
    }
    deliver(app, sim, out);
}

/// Session closed: the ship leaves play and any timer is cancelled.
pub fn leave(app: &AppState, actor: ActorId) {
    let mut guard = app.sim.lock();
    let sim = &mut *guard;
    sim.stamp();
    let mut out = Outbox::new();
    registry::disconnect_actor(&mut sim.game_state, &mut out, actor);
    deliver(app, sim, out);
    sim.writers.remove(&actor);
    info!(%actor, "captain left");
}
