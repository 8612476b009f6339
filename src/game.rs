//! The command dispatcher: turns chat messages into game operations and
//! replies.
//!
//! Every store mutation follows `lock -> mutate -> commit`, trainers before
//! gyms. Catalog fetches happen before a lock is taken and the affected
//! records are checked again once it is held.

use crate::battle::engine::{check_battle_end, start_battle, TurnOutcome};
use crate::battle::runner::{BattleRunner, RunnerReport};
use crate::battle::state::{
    ActionFailureReason, BattleKind, BattleRosters, BattleSide, BattleState, GameState, PlayerAction, PlayerType,
    RosterOwner, SideId, TurnRng,
};
use crate::catalog::CreatureCatalog;
use crate::catch::{attempt_catch, CatchOutcome};
use crate::commands::{
    help_text, parse_battle_command, parse_command, BattleCommand, Command, CommandParseError, ItemCommand,
};
use crate::config::GameConfig;
use crate::errors::{BattleStateError, GameError, GameResult, RenderError, RenderResult, SessionError};
use crate::gym::{find_gym_key, Gym};
use crate::items::{use_potion, use_revive};
use crate::player::Trainer;
use crate::pokemon::PokemonInst;
use crate::progression::{LevelUpNotice, ProgressionResolver};
use crate::render::{ImageRef, SceneRenderer};
use crate::session::BattleRegistry;
use crate::store::{commit_pair, GymBook, JsonStore, TrainerBook};
use rand::seq::IndexedRandom;
use schema::Item;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

pub const GENERIC_ERROR: &str = "An error occurred. Please try again.";
const LOSS_MESSAGE: &str = "You lost the battle... Heal your Pokémon and try again!";
const BUSY_MESSAGE: &str = "Your Pokémon are busy in another battle!";

/// One outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub image: Option<ImageRef>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }

    pub fn with_image(text: impl Into<String>, image: Option<ImageRef>) -> Self {
        Self {
            text: text.into(),
            image,
        }
    }
}

type RngSource = Box<dyn Fn() -> TurnRng + Send + Sync>;

/// Result of setting up a battle, before the session is registered.
struct BattleOpening {
    state: BattleState,
    player_lead: String,
    opponent_lead: String,
    lines: Vec<String>,
}

pub struct GameService<C, R> {
    config: GameConfig,
    catalog: C,
    renderer: R,
    trainers: JsonStore<TrainerBook>,
    gyms: JsonStore<GymBook>,
    battles: BattleRegistry,
    sender_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    progression: ProgressionResolver,
    rng_source: RngSource,
}

impl<C: CreatureCatalog, R: SceneRenderer> GameService<C, R> {
    /// Opens both stores, seeding the gym store from the configured gyms.
    pub async fn new(config: GameConfig, catalog: C, renderer: R) -> GameResult<Self> {
        let trainers = JsonStore::open(config.trainers_path(), TrainerBook::new()).await?;
        let default_gyms: GymBook = config
            .gyms
            .iter()
            .map(|gym| (gym.name.clone(), gym.clone()))
            .collect();
        let gyms = JsonStore::open(config.gyms_path(), default_gyms).await?;

        Ok(Self {
            config,
            catalog,
            renderer,
            trainers,
            gyms,
            battles: BattleRegistry::new(),
            sender_locks: Mutex::new(HashMap::new()),
            progression: ProgressionResolver::new(),
            rng_source: Box::new(TurnRng::new_random),
        })
    }

    /// Replaces the source of random outcomes used for catches and battles.
    pub fn with_rng(mut self, source: impl Fn() -> TurnRng + Send + Sync + 'static) -> Self {
        self.rng_source = Box::new(source);
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn battles(&self) -> &BattleRegistry {
        &self.battles
    }

    /// Handles one inbound message. Never fails: unexpected errors are logged
    /// and answered with a generic retry message.
    pub async fn handle_message(&self, sender: &str, text: &str) -> Vec<Reply> {
        let lock = self.sender_lock(sender);
        let _serialized = lock.lock().await;

        match self.dispatch(sender, text).await {
            Ok(replies) => replies,
            Err(err) => match err.user_message() {
                Some(message) => vec![Reply::text(message)],
                None => {
                    log::error!("command from {} failed: {}", sender, err);
                    vec![Reply::text(GENERIC_ERROR)]
                }
            },
        }
    }

    fn sender_lock(&self, sender: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.sender_locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(sender.to_string()).or_default().clone()
    }

    fn prefix(&self) -> &str {
        &self.config.command_prefix
    }

    async fn dispatch(&self, sender: &str, text: &str) -> GameResult<Vec<Reply>> {
        let prefix = self.prefix();

        if self.battles.is_active(sender) {
            let reply = match parse_battle_command(text, prefix) {
                None => return Ok(Vec::new()),
                Some(Err(err)) => Reply::text(err.message(prefix)),
                Some(Ok(command)) => {
                    log::debug!("{} in battle: {:?}", sender, command);
                    self.battle_command(sender, command).await?
                }
            };
            return Ok(vec![reply]);
        }

        let command = match parse_command(text, prefix) {
            None => return Ok(Vec::new()),
            Some(Err(err)) => return Ok(vec![Reply::text(err.message(prefix))]),
            Some(Ok(command)) => command,
        };
        log::debug!("{}: {:?}", sender, command);

        let reply = match command {
            Command::Start => self.start(sender).await?,
            Command::PokemonInfo(name) => self.pokemon_info(&name).await?,
            Command::Catch { name, ball } => self.catch(sender, &name, ball).await?,
            Command::Team => self.team(sender).await?,
            Command::Gym(None) => self.list_gyms(sender).await?,
            Command::Gym(Some(name)) => self.challenge_gym(sender, &name).await?,
            Command::Item(ItemCommand::List) => self.list_items(sender).await?,
            Command::Item(ItemCommand::Use(item)) => self.use_item(sender, item).await?,
            Command::Evolve(index) => self.evolve(sender, index).await?,
            Command::Battle(opponent) => self.challenge_trainer(sender, &opponent).await?,
            Command::Help => Reply::text(help_text(prefix)),
        };
        Ok(vec![reply])
    }

    fn not_registered(&self) -> GameError {
        GameError::InvalidState(format!("Please start your journey with {}start first", self.prefix()))
    }

    async fn trainer_snapshot(&self, sender: &str) -> GameResult<Trainer> {
        let mut book = self.trainers.read().await?;
        book.remove(sender).ok_or_else(|| self.not_registered())
    }

    fn scene(&self, rendered: RenderResult<ImageRef>) -> Option<ImageRef> {
        match rendered {
            Ok(image) => Some(image),
            Err(RenderError::Disabled) => None,
            Err(err) => {
                log::warn!("scene rendering failed: {}", err);
                None
            }
        }
    }

    fn runner(&self) -> BattleRunner<'_, C> {
        BattleRunner::new(&self.catalog, self.config.rules)
    }

    async fn start(&self, sender: &str) -> GameResult<Reply> {
        let mut trainers = self.trainers.lock().await?;
        if trainers.contains_key(sender) {
            return Ok(Reply::text("You've already started your Pokémon journey!"));
        }

        let name = sender.split('@').next().unwrap_or(sender);
        trainers.insert(
            sender.to_string(),
            Trainer::new(sender, name, self.config.starting_items.clone()),
        );
        trainers.commit().await?;
        log::info!("registered trainer {}", sender);

        let starters: String = self
            .config
            .starters
            .iter()
            .map(|species| format!("{}catch {}\n", self.prefix(), species))
            .collect();
        Ok(Reply::text(format!(
            "Welcome to the world of Pokémon!\n\nChoose your starter Pokémon with:\n{}\nOr catch any Pokémon you encounter!",
            starters
        )))
    }

    async fn pokemon_info(&self, name: &str) -> GameResult<Reply> {
        let pokemon = self
            .catalog
            .get_creature(name)
            .await
            .ok_or_else(|| GameError::NotFound("Pokémon not found! Try another name.".to_string()))?;

        let types: Vec<String> = pokemon.types.iter().map(ToString::to_string).collect();
        let mut caption = format!(
            "*{}*\nType: {}\nLevel: {}\nHP: {}\nAttack: {}\nDefense: {}\nSpeed: {}\nMoves: {}\n",
            pokemon.name.to_uppercase(),
            types.join(", "),
            pokemon.level,
            pokemon.max_hp(),
            pokemon.stats.attack,
            pokemon.stats.defense,
            pokemon.stats.speed,
            pokemon.moves.join(", ")
        );
        if let Some(previous) = &pokemon.evolves_from {
            caption.push_str(&format!("Evolves from: {}\n", previous));
        }

        let image = (!pokemon.image.is_empty()).then(|| ImageRef::Url(pokemon.image.clone()));
        Ok(Reply::with_image(caption, image))
    }

    async fn catch(&self, sender: &str, name: &str, ball: Item) -> GameResult<Reply> {
        self.trainer_snapshot(sender).await?;
        let target = self
            .catalog
            .get_creature(name)
            .await
            .ok_or_else(|| GameError::NotFound("Invalid Pokémon name!".to_string()))?;

        let mut trainers = self.trainers.lock().await?;
        let trainer = trainers.get_mut(sender).ok_or_else(|| self.not_registered())?;
        let mut rng = (self.rng_source)();
        let attempt = attempt_catch(trainer, target.clone(), ball, self.config.team_limit(), &mut rng)
            .map_err(|err| GameError::InvalidState(err.to_string()))?;
        trainers.commit().await?;

        let shown = target.name.to_uppercase();
        let text = match attempt.outcome {
            CatchOutcome::Caught => format!("You caught {}! It's been added to your team.", shown),
            CatchOutcome::CaughtButTeamFull => format!(
                "You caught {}! But your team is full. Use {}team to manage your Pokémon.",
                shown,
                self.prefix()
            ),
            CatchOutcome::BrokeFree => format!("Oh no! {} broke free!", shown),
        };
        let success = attempt.outcome != CatchOutcome::BrokeFree;
        let image = self.scene(self.renderer.render_capture_scene(&target, success));
        Ok(Reply::with_image(text, image))
    }

    async fn team(&self, sender: &str) -> GameResult<Reply> {
        let trainer = self.trainer_snapshot(sender).await?;
        if trainer.team.is_empty() {
            return Ok(Reply::text(format!(
                "Your team is empty! Use {}catch to add Pokémon.",
                self.prefix()
            )));
        }

        let mut text = String::from("*YOUR POKÉMON TEAM*\n\n");
        for (index, pokemon) in trainer.team.iter().enumerate() {
            text.push_str(&format!(
                "{}. {} (Lv. {}) - HP: {}/{}\n",
                index + 1,
                pokemon.name.to_uppercase(),
                pokemon.level,
                pokemon.current_hp(),
                pokemon.max_hp()
            ));
        }
        Ok(Reply::text(text))
    }

    async fn list_gyms(&self, sender: &str) -> GameResult<Reply> {
        let trainer = self.trainer_snapshot(sender).await?;
        let gyms = self.gyms.read().await?;

        let mut text = String::from("*AVAILABLE GYMS*\n\n");
        for gym in gyms.values() {
            let mark = if trainer.has_badge(&gym.name) { "✓" } else { "✗" };
            text.push_str(&format!(
                "{} {} - Leader: {} ({} type)\n",
                mark, gym.name, gym.leader, gym.pokemon_type
            ));
        }
        text.push_str(&format!("\nChallenge a gym with: {}gym <name>", self.prefix()));
        Ok(Reply::text(text))
    }

    fn gym_not_found(&self) -> GameError {
        GameError::NotFound(format!(
            "Gym not found! Use {}gym to see available gyms.",
            self.prefix()
        ))
    }

    /// Rejects changes to a roster that is fighting in an open session.
    fn ensure_roster_free(&self, trainer_id: &str) -> GameResult<()> {
        if self.battles.is_engaged(trainer_id) {
            return Err(GameError::InvalidState(BUSY_MESSAGE.to_string()));
        }
        Ok(())
    }

    /// Rejections shared by every kind of challenge from `trainer`.
    fn ensure_ready_to_battle(&self, trainer: &Trainer) -> GameResult<()> {
        self.ensure_roster_free(&trainer.id)?;
        if trainer.team.is_empty() {
            return Err(GameError::InvalidState(format!(
                "Your team is empty! Use {}catch to add Pokémon.",
                self.prefix()
            )));
        }
        if trainer.conscious_members().is_empty() {
            return Err(GameError::InvalidState(
                "All your Pokémon are fainted! Heal them with potions first.".to_string(),
            ));
        }
        Ok(())
    }

    fn ensure_can_challenge(&self, trainer: &Trainer, gym: &Gym) -> GameResult<()> {
        if trainer.has_badge(&gym.name) {
            return Err(GameError::InvalidState(format!(
                "You've already defeated {}'s {}!",
                gym.name, gym.leader
            )));
        }
        self.ensure_ready_to_battle(trainer)?;
        if self.battles.roster_in_use(&RosterOwner::Gym(gym.name.clone())) {
            return Err(GameError::InvalidState(format!(
                "{} is already battling another trainer! Try again later.",
                gym.leader
            )));
        }
        Ok(())
    }

    /// Picks random species of the gym's type and fetches them at gym level.
    async fn generate_gym_roster(&self, gym: &Gym) -> Vec<PokemonInst> {
        let pool = self.catalog.get_species_pool_by_type(gym.pokemon_type).await;
        let picks: Vec<String> = {
            let mut rng = rand::rng();
            pool.choose_multiple(&mut rng, self.config.gym_team_size)
                .cloned()
                .collect()
        };

        let mut team = Vec::with_capacity(picks.len());
        for species in picks {
            match self.catalog.get_creature(&species).await {
                Some(mut pokemon) => {
                    pokemon.level = self.config.gym_level;
                    team.push(pokemon);
                }
                None => log::warn!("could not fetch {} for {}", species, gym.name),
            }
        }
        log::info!("generated a roster of {} for {}", team.len(), gym.name);
        team
    }

    async fn challenge_gym(&self, sender: &str, query: &str) -> GameResult<Reply> {
        let trainer = self.trainer_snapshot(sender).await?;
        let gym_book = self.gyms.read().await?;
        let key = find_gym_key(gym_book.keys(), query)
            .cloned()
            .ok_or_else(|| self.gym_not_found())?;
        let gym = gym_book.get(&key).ok_or_else(|| self.gym_not_found())?;
        self.ensure_can_challenge(&trainer, gym)?;
        let generated = if gym.needs_roster() {
            self.generate_gym_roster(gym).await
        } else {
            Vec::new()
        };

        let mut trainers = self.trainers.lock().await?;
        let mut gyms = self.gyms.lock().await?;
        let trainer = trainers.get(sender).ok_or_else(|| self.not_registered())?;
        let gym = gyms.get_mut(&key).ok_or_else(|| self.gym_not_found())?;
        self.ensure_can_challenge(trainer, gym)?;

        if gym.needs_roster() {
            if generated.is_empty() {
                return Err(GameError::InvalidState(format!(
                    "{} has no Pokémon ready yet. Try again later!",
                    gym.leader
                )));
            }
            gym.team = generated;
        }
        gym.heal_team();

        let leader = gym.leader.clone();
        let side_a = BattleSide::new(
            trainer.name.clone(),
            RosterOwner::Trainer(sender.to_string()),
            PlayerType::Human,
            trainer.conscious_members(),
        );
        let side_b = BattleSide::new(
            leader.clone(),
            RosterOwner::Gym(gym.name.clone()),
            PlayerType::NPC,
            (0..gym.team.len()).collect(),
        );
        let kind = BattleKind::Gym {
            gym_name: gym.name.clone(),
        };

        let opening = self
            .open_battle(sender, kind, side_a, side_b, &mut trainers, &mut gyms)
            .await?;
        commit_pair(&trainers, &gyms).await?;

        let p = self.prefix();
        let mut text = format!(
            "Gym Battle against {}!\n\nYour {} vs {}\n\nAvailable commands:\n{p}attack <move>\n{p}switch <pokemon number>\n{p}use potion",
            leader, opening.player_lead, opening.opponent_lead
        );
        self.finish_opening(sender, opening, &mut text)?;
        Ok(Reply::text(text))
    }

    async fn challenge_trainer(&self, sender: &str, opponent_id: &str) -> GameResult<Reply> {
        if opponent_id == sender {
            return Err(GameError::InvalidState("You can't battle yourself!".to_string()));
        }

        let mut trainers = self.trainers.lock().await?;
        let mut gyms = self.gyms.lock().await?;
        let challenger = trainers.get(sender).ok_or_else(|| self.not_registered())?;
        let opponent = trainers.get(opponent_id).ok_or_else(|| {
            GameError::NotFound("That trainer hasn't started their Pokémon journey yet!".to_string())
        })?;
        self.ensure_ready_to_battle(challenger)?;
        if self.battles.is_engaged(opponent_id) {
            return Err(GameError::InvalidState(format!("{} is already in a battle!", opponent.name)));
        }
        let opponent_members = opponent.conscious_members();
        if opponent_members.is_empty() {
            return Err(GameError::InvalidState(format!(
                "{} has no Pokémon able to battle!",
                opponent.name
            )));
        }

        let opponent_name = opponent.name.clone();
        let side_a = BattleSide::new(
            challenger.name.clone(),
            RosterOwner::Trainer(sender.to_string()),
            PlayerType::Human,
            challenger.conscious_members(),
        );
        let side_b = BattleSide::new(
            opponent_name.clone(),
            RosterOwner::Trainer(opponent_id.to_string()),
            PlayerType::NPC,
            opponent_members,
        );
        let kind = BattleKind::Trainer {
            opponent_id: opponent_id.to_string(),
        };

        let opening = self
            .open_battle(sender, kind, side_a, side_b, &mut trainers, &mut gyms)
            .await?;
        commit_pair(&trainers, &gyms).await?;

        let p = self.prefix();
        let mut text = format!(
            "Battle started vs {}!\n\nCommands: {p}attack <move>, {p}switch <1-6>, {p}use potion",
            opponent_name
        );
        self.finish_opening(sender, opening, &mut text)?;
        Ok(Reply::text(text))
    }

    /// Starts the battle and plays any NPC turns that come first. A battle
    /// already decided at the start is concluded here.
    async fn open_battle(
        &self,
        sender: &str,
        kind: BattleKind,
        side_a: BattleSide,
        side_b: BattleSide,
        trainers: &mut TrainerBook,
        gyms: &mut GymBook,
    ) -> GameResult<BattleOpening> {
        let mut opponent = std::mem::take(opponent_roster_mut(&kind, trainers, gyms)?);
        let mut rng = (self.rng_source)();
        let battle_id = battle_id(sender);

        let (state, player_lead, opponent_lead, lines) = {
            let trainer = trainers.get_mut(sender).ok_or_else(|| self.not_registered())?;
            let mut rosters = BattleRosters::new(&mut trainer.team, &mut opponent);
            let mut state = start_battle(battle_id, kind, side_a, side_b, &rosters, &mut rng)?;
            let player_lead = lead(rosters.active(&state, SideId::A)?);
            let opponent_lead = lead(rosters.active(&state, SideId::B)?);

            check_battle_end(&mut state, &rosters);
            let report = self.runner().advance_npc_turns(&mut state, &mut rosters, &mut rng).await?;
            (state, player_lead, opponent_lead, report.new_log_lines)
        };
        *opponent_roster_mut(&state.kind, trainers, gyms)? = opponent;

        let mut lines = lines;
        if state.is_finished() {
            lines.extend(self.conclude_battle(sender, &state, trainers, gyms)?);
        }
        Ok(BattleOpening {
            state,
            player_lead,
            opponent_lead,
            lines,
        })
    }

    /// Appends the opening turns and registers the session if the battle goes on.
    fn finish_opening(&self, sender: &str, opening: BattleOpening, text: &mut String) -> GameResult<()> {
        if !opening.lines.is_empty() {
            text.push_str("\n\n");
            text.push_str(&opening.lines.join("\n"));
        }
        if !opening.state.is_finished() {
            self.battles.begin(sender, opening.state)?;
        }
        Ok(())
    }

    /// Applies the result of a finished battle to the stores and returns the
    /// messages announcing it.
    fn conclude_battle(
        &self,
        sender: &str,
        state: &BattleState,
        trainers: &mut TrainerBook,
        gyms: &mut GymBook,
    ) -> GameResult<Vec<String>> {
        if state.winner() != Some(SideId::A) {
            log::info!("{} lost battle {}", sender, state.battle_id);
            return Ok(vec![LOSS_MESSAGE.to_string()]);
        }

        let trainer = trainers.get_mut(sender).ok_or_else(|| self.not_registered())?;
        let mut messages = Vec::new();
        let report = match &state.kind {
            BattleKind::Gym { gym_name } => {
                let gym = gyms.get_mut(gym_name).ok_or_else(|| self.gym_not_found())?;
                let report = self.progression.resolve_gym_victory(trainer, gym);
                messages.push(match &report.badge_awarded {
                    Some(badge) => format!("🏆 You defeated {} and earned the {} Badge! 🏆", gym.leader, badge),
                    None => format!("You defeated {} again!", gym.leader),
                });
                report
            }
            BattleKind::Trainer { .. } => {
                messages.push("You won the battle! Your Pokémon gained experience!".to_string());
                self.progression.resolve_trainer_victory(trainer)
            }
        };
        messages.extend(report.level_ups.iter().map(LevelUpNotice::message));
        Ok(messages)
    }

    async fn battle_command(&self, sender: &str, command: BattleCommand) -> GameResult<Reply> {
        let action = match command {
            BattleCommand::UsePotion => return self.battle_potion(sender).await,
            BattleCommand::Attack(move_name) => PlayerAction::UseMove { move_name },
            BattleCommand::Switch(team_index) => PlayerAction::SwitchPokemon { team_index },
            BattleCommand::Forfeit => PlayerAction::Forfeit,
        };
        let mut state = self
            .battles
            .get(sender)
            .ok_or_else(|| SessionError::NoActiveBattle(sender.to_string()))?;

        let mut trainers = self.trainers.lock().await?;
        let mut gyms = self.gyms.lock().await?;
        let mut opponent = std::mem::take(opponent_roster_mut(&state.kind, &mut trainers, &mut gyms)?);

        let (report, image, status) = {
            let trainer = trainers.get_mut(sender).ok_or_else(|| self.not_registered())?;
            let mut rosters = BattleRosters::new(&mut trainer.team, &mut opponent);
            let mut rng = (self.rng_source)();
            let report = self
                .runner()
                .submit_action(&mut state, &mut rosters, SideId::A, action, &mut rng)
                .await?;
            let image = self.battle_scene(&rosters, &report);
            let status = self.battle_status(&state, &rosters);
            (report, image, status)
        };
        *opponent_roster_mut(&state.kind, &mut trainers, &mut gyms)? = opponent;

        if let Some(TurnOutcome::Failed(reason)) = report.first_outcome() {
            return Ok(Reply::text(self.failure_message(reason)));
        }

        let mut lines = report.new_log_lines;
        if state.is_finished() {
            lines.extend(self.conclude_battle(sender, &state, &mut trainers, &mut gyms)?);
        } else {
            lines.extend(status);
        }
        commit_pair(&trainers, &gyms).await?;

        if state.is_finished() {
            self.battles.end(sender);
        } else {
            self.battles.update(sender, state)?;
        }
        Ok(Reply::with_image(lines.join("\n"), image))
    }

    fn failure_message(&self, reason: &ActionFailureReason) -> String {
        match reason {
            ActionFailureReason::InvalidSwitchTarget
            | ActionFailureReason::SwitchTargetFainted
            | ActionFailureReason::AlreadyActive => "Cannot switch to that Pokémon!".to_string(),
            ActionFailureReason::ReplacementRequired | ActionFailureReason::PokemonFainted => format!(
                "Your Pokémon has fainted! Choose another with {}switch <1-6>",
                self.prefix()
            ),
            ActionFailureReason::BattleOver => "The battle is already over!".to_string(),
        }
    }

    /// Draws the last attack with the creatures that took part in it.
    fn battle_scene(&self, rosters: &BattleRosters, report: &RunnerReport) -> Option<ImageRef> {
        let attack = report.last_attack()?;
        let attacker = rosters.roster(attack.attacker).get(attack.attacker_slot)?;
        let defender = rosters.roster(attack.attacker.opponent()).get(attack.defender_slot)?;
        self.scene(
            self.renderer
                .render_battle_scene(attacker, defender, &attack.move_name, attack.damage),
        )
    }

    /// Both active creatures, plus a prompt when the player must replace theirs.
    fn battle_status(&self, state: &BattleState, rosters: &BattleRosters) -> Option<String> {
        let mine = rosters.active(state, SideId::A).ok()?;
        let theirs = rosters.active(state, SideId::B).ok()?;
        let mut status = format!(
            "\nYour {}\n{}'s {}",
            mine,
            state.side(SideId::B).display_name,
            theirs
        );
        if state.game_state == GameState::AwaitingReplacement(SideId::A) {
            status.push_str(&format!(
                "\n\nYour {} fainted! Choose another with {}switch <1-6>",
                mine.name,
                self.prefix()
            ));
        }
        Some(status)
    }

    /// A potion in battle heals the active creature without using the turn.
    async fn battle_potion(&self, sender: &str) -> GameResult<Reply> {
        let state = self
            .battles
            .get(sender)
            .ok_or_else(|| SessionError::NoActiveBattle(sender.to_string()))?;
        let slot = state
            .side(SideId::A)
            .active_slot()
            .ok_or(BattleStateError::EmptyRoster(SideId::A.index()))?;
        self.apply_potion(sender, slot, true).await
    }

    async fn apply_potion(&self, sender: &str, roster_index: usize, in_battle: bool) -> GameResult<Reply> {
        let mut trainers = self.trainers.lock().await?;
        let trainer = trainers.get_mut(sender).ok_or_else(|| self.not_registered())?;
        if !in_battle {
            self.ensure_roster_free(sender)?;
        }
        let used = use_potion(trainer, roster_index, self.config.potion_heal)
            .map_err(|err| GameError::InvalidState(err.to_string()))?;
        trainers.commit().await?;
        Ok(Reply::text(format!(
            "Used Potion on {}! It recovered {} HP.\nCurrent HP: {}/{}",
            used.name, used.restored, used.hp, used.max_hp
        )))
    }

    async fn list_items(&self, sender: &str) -> GameResult<Reply> {
        let trainer = self.trainer_snapshot(sender).await?;
        let mut text = String::from("*YOUR ITEMS*\n\n");
        for (item, quantity) in &trainer.items {
            text.push_str(&format!("{}: {}\n", item, quantity));
        }
        text.push_str(&format!("\nUse items with: {}item use <item>", self.prefix()));
        Ok(Reply::text(text))
    }

    async fn use_item(&self, sender: &str, item: Item) -> GameResult<Reply> {
        match item {
            Item::Potion => self.apply_potion(sender, 0, false).await,
            Item::Revive => {
                let mut trainers = self.trainers.lock().await?;
                let trainer = trainers.get_mut(sender).ok_or_else(|| self.not_registered())?;
                self.ensure_roster_free(sender)?;
                let used = use_revive(trainer).map_err(|err| GameError::InvalidState(err.to_string()))?;
                trainers.commit().await?;
                Ok(Reply::text(format!(
                    "{} was revived! (HP: {}/{})",
                    used.name, used.hp, used.max_hp
                )))
            }
            Item::Pokeball | Item::Superball => {
                Ok(Reply::text(CommandParseError::UnknownItem.message(self.prefix())))
            }
        }
    }

    async fn evolve(&self, sender: &str, index: usize) -> GameResult<Reply> {
        let invalid_number = || GameError::InvalidState(CommandParseError::InvalidPokemonNumber.message(self.prefix()));

        let trainer = self.trainer_snapshot(sender).await?;
        self.ensure_roster_free(sender)?;
        let before = trainer.team.get(index).cloned().ok_or_else(invalid_number)?;
        if !self.progression.can_evolve(&before) {
            return Ok(Reply::text(format!(
                "{} can't evolve right now! (Needs level 30+)",
                before.name
            )));
        }
        let evolved = self
            .progression
            .evolve_pokemon(&before, &self.catalog)
            .await
            .ok_or_else(|| GameError::InvalidState("Evolution failed!".to_string()))?;

        let mut trainers = self.trainers.lock().await?;
        let trainer = trainers.get_mut(sender).ok_or_else(|| self.not_registered())?;
        self.ensure_roster_free(sender)?;
        let slot = trainer.team.get_mut(index).ok_or_else(invalid_number)?;
        if *slot != before {
            return Err(GameError::InvalidState("Evolution failed!".to_string()));
        }
        *slot = evolved.clone();
        trainers.commit().await?;
        log::info!("{}: {} evolved into {}", sender, before.name, evolved.name);

        let text = format!(
            "Congratulations! {} evolved into {}!",
            before.name.to_uppercase(),
            evolved.name.to_uppercase()
        );
        let image = self.scene(self.renderer.render_evolution_scene(&before, &evolved));
        Ok(Reply::with_image(text, image))
    }
}

/// The roster the opposing side of a battle draws from.
fn opponent_roster_mut<'b>(
    kind: &BattleKind,
    trainers: &'b mut TrainerBook,
    gyms: &'b mut GymBook,
) -> GameResult<&'b mut Vec<PokemonInst>> {
    let roster = match kind {
        BattleKind::Gym { gym_name } => {
            &mut gyms
                .get_mut(gym_name)
                .ok_or_else(|| BattleStateError::InconsistentState(format!("gym {} is missing", gym_name)))?
                .team
        }
        BattleKind::Trainer { opponent_id } => {
            &mut trainers
                .get_mut(opponent_id)
                .ok_or_else(|| BattleStateError::InconsistentState(format!("trainer {} is missing", opponent_id)))?
                .team
        }
    };
    Ok(roster)
}

fn lead(pokemon: &PokemonInst) -> String {
    format!("{} (Lv. {})", pokemon.name, pokemon.level)
}

fn battle_id(sender: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    format!("{}-{}", sender, millis)
}
