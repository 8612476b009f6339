//! Line-delimited JSON bridge between a messaging gateway and the game.
//!
//! Reads `{"sender": .., "text": ..}` objects from stdin, one per line, and
//! writes `{"to": .., "text": .., "image": ..}` replies to stdout.

use clap::Parser;
use pokemon_trainer_bot::render::purge_stale_scenes;
use pokemon_trainer_bot::{
    DisabledRenderer, GameConfig, GameService, ImageSceneRenderer, PokeApiCatalog, SceneRenderer,
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};

#[derive(Parser, Debug)]
#[command(name = "pokemon-trainer-bot")]
#[command(about = "Chat-command Pokémon game over a JSON-lines bridge")]
struct Args {
    /// RON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the directory holding the trainer and gym documents.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    log_level: String,

    /// Send replies without scene images.
    #[arg(long)]
    no_render: bool,
}

#[derive(Deserialize, Debug)]
struct Inbound {
    sender: String,
    text: String,
}

#[derive(Serialize, Debug)]
struct Outbound {
    to: String,
    text: String,
    image: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level.as_str())).init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }

    match purge_stale_scenes(&config.temp_dir, config.scene_max_age()) {
        Ok(0) => {}
        Ok(removed) => log::info!("removed {} stale scenes from {}", removed, config.temp_dir.display()),
        Err(err) => log::warn!("could not clean {}: {}", config.temp_dir.display(), err),
    }

    let catalog = PokeApiCatalog::new(config.pokeapi_base_url.clone(), config.http_timeout())?;
    if args.no_render {
        serve(GameService::new(config, catalog, DisabledRenderer).await?).await
    } else {
        let renderer = ImageSceneRenderer::new(config.temp_dir.clone())?;
        serve(GameService::new(config, catalog, renderer).await?).await
    }
}

async fn serve<R: SceneRenderer + 'static>(service: GameService<PokeApiCatalog, R>) -> Result<(), Box<dyn Error>> {
    let service = Arc::new(service);
    let (outbox, mut replies) = mpsc::unbounded_channel::<Outbound>();

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(reply) = replies.recv().await {
            let mut line = match serde_json::to_string(&reply) {
                Ok(line) => line,
                Err(err) => {
                    log::error!("could not encode reply to {}: {}", reply.to, err);
                    continue;
                }
            };
            line.push('\n');
            if let Err(err) = stdout.write_all(line.as_bytes()).await {
                log::error!("stdout closed: {}", err);
                break;
            }
            if let Err(err) = stdout.flush().await {
                log::warn!("flush failed: {}", err);
            }
        }
    });

    log::info!("ready for messages");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tasks = JoinSet::new();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let inbound: Inbound = match serde_json::from_str(&line) {
            Ok(inbound) => inbound,
            Err(err) => {
                log::warn!("skipping malformed message: {}", err);
                continue;
            }
        };

        let service = Arc::clone(&service);
        let outbox = outbox.clone();
        tasks.spawn(async move {
            for reply in service.handle_message(&inbound.sender, &inbound.text).await {
                let outbound = Outbound {
                    to: inbound.sender.clone(),
                    text: reply.text,
                    image: reply.image.map(|image| image.as_reference()),
                };
                if outbox.send(outbound).is_err() {
                    break;
                }
            }
        });

        while let Some(finished) = tasks.try_join_next() {
            report_task(finished);
        }
    }

    while let Some(finished) = tasks.join_next().await {
        report_task(finished);
    }
    drop(outbox);
    writer.await?;
    log::info!("input closed, shutting down");
    Ok(())
}

fn report_task(finished: Result<(), JoinError>) {
    if let Err(err) = finished {
        log::error!("message task failed: {}", err);
    }
}
