//! Scene images sent alongside battle, catch and evolution replies.

use crate::errors::{RenderError, RenderResult};
use crate::pokemon::PokemonInst;
use image::{Rgba, RgbaImage};
use rand::Rng;
use schema::PokemonType;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const BATTLE_SIZE: (u32, u32) = (800, 400);
const CAPTURE_SIZE: (u32, u32) = (600, 400);
const EVOLUTION_SIZE: (u32, u32) = (800, 400);

const HP_BAR_WIDTH: u32 = 200;
const HP_BAR_HEIGHT: u32 = 16;
const EFFECT_CENTER: (i64, i64) = (600, 250);
const SPARKLES: usize = 5;

const BACKDROP: Rgba<u8> = Rgba([0x2c, 0x3e, 0x50, 0xff]);
const HP_BAR_BACK: Rgba<u8> = Rgba([0x34, 0x34, 0x34, 0xff]);
const HP_HIGH: Rgba<u8> = Rgba([0x2e, 0xcc, 0x71, 0xff]);
const HP_MID: Rgba<u8> = Rgba([0xf3, 0x9c, 0x12, 0xff]);
const HP_LOW: Rgba<u8> = Rgba([0xe7, 0x4c, 0x3c, 0xff]);
const CAPTURE_SUCCESS: Rgba<u8> = Rgba([0x27, 0xae, 0x60, 0xff]);
const CAPTURE_FAILURE: Rgba<u8> = Rgba([0xe7, 0x4c, 0x3c, 0xff]);
const EVOLUTION_FROM: Rgba<u8> = Rgba([0x8e, 0x44, 0xad, 0xff]);
const EVOLUTION_TO: Rgba<u8> = Rgba([0x34, 0x98, 0xdb, 0xff]);
const EFFECT: Rgba<u8> = Rgba([0xff, 0xf1, 0x76, 0xff]);
const SPARKLE: Rgba<u8> = Rgba([0xff, 0xff, 0xff, 0xff]);

/// Where a reply image lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    Url(String),
    File(PathBuf),
}

impl ImageRef {
    pub fn as_reference(&self) -> String {
        match self {
            ImageRef::Url(url) => url.clone(),
            ImageRef::File(path) => path.display().to_string(),
        }
    }
}

/// Produces images for game events. Implementations only read their inputs.
pub trait SceneRenderer: Send + Sync {
    fn render_battle_scene(
        &self,
        attacker: &PokemonInst,
        defender: &PokemonInst,
        move_label: &str,
        damage: u16,
    ) -> RenderResult<ImageRef>;

    fn render_capture_scene(&self, pokemon: &PokemonInst, success: bool) -> RenderResult<ImageRef>;

    fn render_evolution_scene(&self, before: &PokemonInst, after: &PokemonInst) -> RenderResult<ImageRef>;
}

/// Panel colour for a type.
pub fn type_color(pokemon_type: PokemonType) -> Rgba<u8> {
    let hex: u32 = match pokemon_type {
        PokemonType::Normal => 0xA8A878,
        PokemonType::Fire => 0xF08030,
        PokemonType::Water => 0x6890F0,
        PokemonType::Electric => 0xF8D030,
        PokemonType::Grass => 0x78C850,
        PokemonType::Ice => 0x98D8D8,
        PokemonType::Fighting => 0xC03028,
        PokemonType::Poison => 0xA040A0,
        PokemonType::Ground => 0xE0C068,
        PokemonType::Flying => 0xA890F0,
        PokemonType::Psychic => 0xF85888,
        PokemonType::Bug => 0xA8B820,
        PokemonType::Rock => 0xB8A038,
        PokemonType::Ghost => 0x705898,
        PokemonType::Dragon => 0x7038F8,
        PokemonType::Dark => 0x705848,
        PokemonType::Steel => 0xB8B8D0,
        PokemonType::Fairy => 0xEE99AC,
    };
    Rgba([(hex >> 16) as u8, (hex >> 8) as u8, hex as u8, 0xff])
}

pub fn hp_bar_color(ratio: f32) -> Rgba<u8> {
    if ratio > 0.5 {
        HP_HIGH
    } else if ratio > 0.2 {
        HP_MID
    } else {
        HP_LOW
    }
}

/// Radius of the impact disc drawn over the defender.
pub fn effect_radius(damage: u16) -> u32 {
    30 + u32::from(damage) / 3
}

/// Writes PNG scenes into a scratch directory.
#[derive(Debug)]
pub struct ImageSceneRenderer {
    temp_dir: PathBuf,
    sequence: AtomicU64,
}

impl ImageSceneRenderer {
    pub fn new(temp_dir: impl Into<PathBuf>) -> RenderResult<Self> {
        let temp_dir = temp_dir.into();
        std::fs::create_dir_all(&temp_dir).map_err(|source| RenderError::Io {
            path: temp_dir.clone(),
            source,
        })?;
        Ok(Self {
            temp_dir,
            sequence: AtomicU64::new(0),
        })
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    fn save(&self, prefix: &str, canvas: &RgbaImage) -> RenderResult<ImageRef> {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or_default();
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let path = self.temp_dir.join(format!("{prefix}_{millis}_{sequence}.png"));
        canvas.save(&path)?;
        log::debug!("rendered {}", path.display());
        Ok(ImageRef::File(path))
    }
}

impl SceneRenderer for ImageSceneRenderer {
    fn render_battle_scene(
        &self,
        attacker: &PokemonInst,
        defender: &PokemonInst,
        move_label: &str,
        damage: u16,
    ) -> RenderResult<ImageRef> {
        let (width, height) = BATTLE_SIZE;
        let mut canvas = RgbaImage::from_pixel(width, height, BACKDROP);
        let half = width / 2;

        fill_rect(&mut canvas, 0, 0, half, height, type_color(attacker.primary_type()));
        fill_rect(&mut canvas, half, 0, half, height, type_color(defender.primary_type()));
        draw_hp_bar(&mut canvas, 100, 50, attacker);
        draw_hp_bar(&mut canvas, half + 100, 50, defender);
        fill_circle(&mut canvas, EFFECT_CENTER, effect_radius(damage), EFFECT);

        log::debug!("battle scene: {} used {} on {}", attacker.name, move_label, defender.name);
        self.save("battle", &canvas)
    }

    fn render_capture_scene(&self, pokemon: &PokemonInst, success: bool) -> RenderResult<ImageRef> {
        let (width, height) = CAPTURE_SIZE;
        let background = if success { CAPTURE_SUCCESS } else { CAPTURE_FAILURE };
        let mut canvas = RgbaImage::from_pixel(width, height, background);

        let center = (i64::from(width / 2), i64::from(height / 2));
        fill_circle(&mut canvas, center, 60, type_color(pokemon.primary_type()));
        if success {
            let mut rng = rand::rng();
            for _ in 0..SPARKLES {
                let at = (
                    rng.random_range(0..i64::from(width)),
                    rng.random_range(0..i64::from(height)),
                );
                fill_circle(&mut canvas, at, rng.random_range(4..10), SPARKLE);
            }
        }
        self.save("capture", &canvas)
    }

    fn render_evolution_scene(&self, before: &PokemonInst, after: &PokemonInst) -> RenderResult<ImageRef> {
        let (width, height) = EVOLUTION_SIZE;
        let mut canvas = RgbaImage::new(width, height);
        for (x, _, pixel) in canvas.enumerate_pixels_mut() {
            let t = x as f32 / (width - 1) as f32;
            *pixel = blend(EVOLUTION_FROM, EVOLUTION_TO, t);
        }

        let y = i64::from(height / 2);
        fill_circle(&mut canvas, (i64::from(width / 4), y), 70, type_color(before.primary_type()));
        fill_circle(&mut canvas, (i64::from(width * 3 / 4), y), 90, type_color(after.primary_type()));
        self.save("evolve", &canvas)
    }
}

/// A renderer for deployments without image output.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledRenderer;

impl SceneRenderer for DisabledRenderer {
    fn render_battle_scene(&self, _: &PokemonInst, _: &PokemonInst, _: &str, _: u16) -> RenderResult<ImageRef> {
        Err(RenderError::Disabled)
    }

    fn render_capture_scene(&self, _: &PokemonInst, _: bool) -> RenderResult<ImageRef> {
        Err(RenderError::Disabled)
    }

    fn render_evolution_scene(&self, _: &PokemonInst, _: &PokemonInst) -> RenderResult<ImageRef> {
        Err(RenderError::Disabled)
    }
}

/// Deletes rendered scenes older than `max_age`. Returns how many were removed.
pub fn purge_stale_scenes(dir: &Path, max_age: Duration) -> RenderResult<usize> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(source) => {
            return Err(RenderError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let now = SystemTime::now();
    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "png") {
            continue;
        }
        let age = entry
            .metadata()
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());
        if age.is_some_and(|age| age >= max_age) {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(err) => log::warn!("could not remove {}: {}", path.display(), err),
            }
        }
    }
    Ok(removed)
}

fn fill_rect(canvas: &mut RgbaImage, x: u32, y: u32, width: u32, height: u32, color: Rgba<u8>) {
    let x_end = (x + width).min(canvas.width());
    let y_end = (y + height).min(canvas.height());
    for py in y..y_end {
        for px in x..x_end {
            canvas.put_pixel(px, py, color);
        }
    }
}

fn fill_circle(canvas: &mut RgbaImage, center: (i64, i64), radius: u32, color: Rgba<u8>) {
    let r = i64::from(radius);
    let (cx, cy) = center;
    let (w, h) = (i64::from(canvas.width()), i64::from(canvas.height()));
    for y in (cy - r).max(0)..(cy + r + 1).min(h) {
        for x in (cx - r).max(0)..(cx + r + 1).min(w) {
            let (dx, dy) = (x - cx, y - cy);
            if dx * dx + dy * dy <= r * r {
                canvas.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

fn draw_hp_bar(canvas: &mut RgbaImage, x: u32, y: u32, pokemon: &PokemonInst) {
    let ratio = if pokemon.max_hp() == 0 {
        0.0
    } else {
        f32::from(pokemon.current_hp()) / f32::from(pokemon.max_hp())
    };
    fill_rect(canvas, x, y, HP_BAR_WIDTH, HP_BAR_HEIGHT, HP_BAR_BACK);
    let filled = (HP_BAR_WIDTH as f32 * ratio).round() as u32;
    fill_rect(canvas, x, y, filled, HP_BAR_HEIGHT, hp_bar_color(ratio));
}

fn blend(from: Rgba<u8>, to: Rgba<u8>, t: f32) -> Rgba<u8> {
    let channel = |i: usize| (f32::from(from[i]) + (f32::from(to[i]) - f32::from(from[i])) * t).round() as u8;
    Rgba([channel(0), channel(1), channel(2), 0xff])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::tests::common::TestPokemonBuilder;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(1.0, HP_HIGH)]
    #[case(0.51, HP_HIGH)]
    #[case(0.5, HP_MID)]
    #[case(0.21, HP_MID)]
    #[case(0.2, HP_LOW)]
    #[case(0.0, HP_LOW)]
    fn test_hp_bar_color(#[case] ratio: f32, #[case] expected: Rgba<u8>) {
        assert_eq!(hp_bar_color(ratio), expected);
    }

    #[test]
    fn test_type_colors() {
        assert_eq!(type_color(PokemonType::Fire), Rgba([0xf0, 0x80, 0x30, 0xff]));
        assert_eq!(type_color(PokemonType::Fairy), Rgba([0xee, 0x99, 0xac, 0xff]));
        assert_eq!(effect_radius(0), 30);
        assert_eq!(effect_radius(30), 40);
    }

    #[test]
    fn test_scenes_are_written_as_png() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = ImageSceneRenderer::new(dir.path().join("scenes")).unwrap();
        let pikachu = TestPokemonBuilder::new("pikachu", 12)
            .with_types(vec![PokemonType::Electric])
            .with_hp(10)
            .build();
        let onix = TestPokemonBuilder::new("onix", 12)
            .with_types(vec![PokemonType::Rock])
            .build();

        let scenes = [
            renderer.render_battle_scene(&pikachu, &onix, "thunder-shock", 12).unwrap(),
            renderer.render_capture_scene(&onix, true).unwrap(),
            renderer.render_evolution_scene(&pikachu, &onix).unwrap(),
        ];
        let expected_sizes = [BATTLE_SIZE, CAPTURE_SIZE, EVOLUTION_SIZE];
        for (scene, size) in scenes.iter().zip(expected_sizes) {
            let ImageRef::File(path) = scene else {
                panic!("expected a file reference, got {:?}", scene);
            };
            assert_eq!(image::image_dimensions(path).unwrap(), size);
        }

        let ImageRef::File(battle) = &scenes[0] else { unreachable!() };
        let name = battle.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("battle_") && name.ends_with(".png"));
        // Input creatures are untouched.
        assert_eq!(pikachu.current_hp(), 10);
    }

    #[test]
    fn test_disabled_renderer() {
        let pokemon = TestPokemonBuilder::new("eevee", 5).build();
        assert!(matches!(
            DisabledRenderer.render_capture_scene(&pokemon, false),
            Err(RenderError::Disabled)
        ));
    }

    #[test]
    fn test_purge_stale_scenes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("battle_1.png"), b"png").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"keep").unwrap();

        assert_eq!(purge_stale_scenes(dir.path(), Duration::from_secs(3600)).unwrap(), 0);
        assert_eq!(purge_stale_scenes(dir.path(), Duration::ZERO).unwrap(), 1);
        assert!(dir.path().join("notes.txt").exists());
        assert_eq!(purge_stale_scenes(&dir.path().join("missing"), Duration::ZERO).unwrap(), 0);
    }
}
