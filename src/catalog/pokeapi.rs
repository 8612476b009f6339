use super::{CreatureCatalog, STARTING_LEVEL};
use crate::errors::{CatalogError, CatalogResult};
use crate::pokemon::{PokemonInst, Stats, MAX_MOVES};
use async_trait::async_trait;
use schema::{MoveData, PokemonType, DEFAULT_MOVE_ACCURACY, DEFAULT_MOVE_POWER};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://pokeapi.co/api/v2";
const ARTWORK_FALLBACK: &str =
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/other/official-artwork";
/// Alternate forms (megas, regional variants) are listed with ids above this.
const ALTERNATE_FORM_ID_START: u32 = 10_000;

#[derive(Clone, Debug, Deserialize)]
struct NamedResource {
    name: String,
    #[serde(default)]
    url: String,
}

#[derive(Clone, Debug, Deserialize)]
struct ApiResource {
    url: String,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonResponse {
    id: u32,
    name: String,
    types: Vec<PokemonTypeSlot>,
    stats: Vec<PokemonStatSlot>,
    moves: Vec<PokemonMoveSlot>,
    #[serde(default)]
    sprites: serde_json::Value,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonTypeSlot {
    #[serde(rename = "type")]
    type_info: NamedResource,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonStatSlot {
    base_stat: u16,
    stat: NamedResource,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonMoveSlot {
    #[serde(rename = "move")]
    move_info: NamedResource,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonSpeciesResponse {
    evolution_chain: Option<ApiResource>,
    evolves_from_species: Option<NamedResource>,
}

#[derive(Clone, Debug, Deserialize)]
struct EvolutionChainResponse {
    chain: ChainLink,
}

#[derive(Clone, Debug, Deserialize)]
struct ChainLink {
    species: NamedResource,
    evolves_to: Vec<ChainLink>,
}

#[derive(Clone, Debug, Deserialize)]
struct MoveDetailResponse {
    name: String,
    power: Option<u16>,
    accuracy: Option<u8>,
    #[serde(rename = "type")]
    type_info: NamedResource,
}

#[derive(Clone, Debug, Deserialize)]
struct TypeDetailResponse {
    pokemon: Vec<TypePokemonEntry>,
}

#[derive(Clone, Debug, Deserialize)]
struct TypePokemonEntry {
    pokemon: NamedResource,
}

/// Catalog backed by the public PokeAPI.
#[derive(Debug, Clone)]
pub struct PokeApiCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl PokeApiCatalog {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> CatalogResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &str, kind: &'static str, name: &str) -> CatalogResult<T> {
        log::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound {
                kind,
                name: name.to_string(),
            });
        }
        Ok(response.error_for_status()?.json::<T>().await?)
    }

    pub async fn fetch_creature(&self, id_or_name: &str) -> CatalogResult<PokemonInst> {
        let key = normalize_key(id_or_name);
        if key.is_empty() {
            return Err(CatalogError::NotFound {
                kind: "pokemon",
                name: id_or_name.to_string(),
            });
        }

        let pokemon: PokemonResponse = self
            .fetch_json(&format!("{}/pokemon/{}", self.base_url, key), "pokemon", &key)
            .await?;
        let species: PokemonSpeciesResponse = self
            .fetch_json(
                &format!("{}/pokemon-species/{}", self.base_url, pokemon.id),
                "pokemon-species",
                &key,
            )
            .await?;

        // The chain is optional data; a failed lookup only loses the evolution target.
        let evolves_into = match &species.evolution_chain {
            Some(chain) => match self
                .fetch_json::<EvolutionChainResponse>(&chain.url, "evolution-chain", &pokemon.name)
                .await
            {
                Ok(response) => next_stage(&response.chain, &pokemon.name),
                Err(err) => {
                    log::warn!("evolution chain for {} unavailable: {}", pokemon.name, err);
                    None
                }
            },
            None => None,
        };

        build_creature(pokemon, &species, evolves_into)
    }

    pub async fn fetch_move(&self, name: &str) -> CatalogResult<MoveData> {
        let key = normalize_key(name);
        let detail: MoveDetailResponse = self
            .fetch_json(&format!("{}/move/{}", self.base_url, key), "move", &key)
            .await?;
        Ok(build_move(detail))
    }

    pub async fn fetch_type_pool(&self, pokemon_type: PokemonType) -> CatalogResult<Vec<String>> {
        let detail: TypeDetailResponse = self
            .fetch_json(
                &format!("{}/type/{}", self.base_url, pokemon_type),
                "type",
                &pokemon_type.to_string(),
            )
            .await?;
        Ok(detail
            .pokemon
            .into_iter()
            .filter(|entry| resource_id(&entry.pokemon.url).is_none_or(|id| id < ALTERNATE_FORM_ID_START))
            .map(|entry| entry.pokemon.name)
            .collect())
    }
}

#[async_trait]
impl CreatureCatalog for PokeApiCatalog {
    async fn get_creature(&self, id_or_name: &str) -> Option<PokemonInst> {
        match self.fetch_creature(id_or_name).await {
            Ok(pokemon) => Some(pokemon),
            Err(err) => {
                log::warn!("creature lookup for '{}' failed: {}", id_or_name, err);
                None
            }
        }
    }

    async fn get_move(&self, name: &str) -> MoveData {
        match self.fetch_move(name).await {
            Ok(move_data) => move_data,
            Err(err) => {
                log::warn!("move lookup for '{}' failed, using defaults: {}", name, err);
                MoveData::fallback(name)
            }
        }
    }

    async fn get_species_pool_by_type(&self, pokemon_type: PokemonType) -> Vec<String> {
        match self.fetch_type_pool(pokemon_type).await {
            Ok(pool) => pool,
            Err(err) => {
                log::warn!("type pool for {} unavailable: {}", pokemon_type, err);
                Vec::new()
            }
        }
    }
}

fn normalize_key(id_or_name: &str) -> String {
    id_or_name.trim().to_lowercase()
}

/// Trailing numeric id of a resource URL such as `.../pokemon/95/`.
fn resource_id(url: &str) -> Option<u32> {
    url.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

/// The species that directly follows `name` in an evolution chain.
fn next_stage(chain: &ChainLink, name: &str) -> Option<String> {
    if chain.species.name == name {
        return chain.evolves_to.first().map(|link| link.species.name.clone());
    }
    chain.evolves_to.iter().find_map(|link| next_stage(link, name))
}

fn build_creature(
    pokemon: PokemonResponse,
    species: &PokemonSpeciesResponse,
    evolves_into: Option<String>,
) -> CatalogResult<PokemonInst> {
    let base_stat = |stat_name: &str| {
        pokemon
            .stats
            .iter()
            .find(|slot| slot.stat.name == stat_name)
            .map(|slot| slot.base_stat)
            .ok_or_else(|| CatalogError::MalformedData(format!("{} has no {} stat", pokemon.name, stat_name)))
    };
    let stats = Stats::from_base(
        base_stat("hp")?,
        base_stat("attack")?,
        base_stat("defense")?,
        base_stat("speed")?,
    );

    let types: Vec<PokemonType> = pokemon
        .types
        .iter()
        .filter_map(|slot| PokemonType::from_str(&slot.type_info.name).ok())
        .collect();
    if types.is_empty() {
        return Err(CatalogError::MalformedData(format!("{} has no known type", pokemon.name)));
    }

    let image = pokemon
        .sprites
        .pointer("/other/official-artwork/front_default")
        .and_then(|value| value.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}/{}.png", ARTWORK_FALLBACK, pokemon.id));

    Ok(PokemonInst {
        species_id: pokemon.id,
        name: pokemon.name.clone(),
        level: STARTING_LEVEL,
        experience: 0,
        stats,
        types,
        moves: pokemon
            .moves
            .iter()
            .take(MAX_MOVES)
            .map(|slot| slot.move_info.name.clone())
            .collect(),
        evolves_from: species.evolves_from_species.as_ref().map(|s| s.name.clone()),
        evolves_into,
        image,
    })
}

fn build_move(detail: MoveDetailResponse) -> MoveData {
    MoveData {
        power: detail.power.filter(|&p| p > 0).unwrap_or(DEFAULT_MOVE_POWER),
        move_type: PokemonType::from_str(&detail.type_info.name).unwrap_or_default(),
        accuracy: detail.accuracy.filter(|&a| a > 0).unwrap_or(DEFAULT_MOVE_ACCURACY),
        name: detail.name,
    }
}
