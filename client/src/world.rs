use std::{fs, io, path::PathBuf};

use bevy::prelude::*;
use kula_engine::{
    ConfigError, ElementId, EngineConfig, GridLevel, KulaWorld, LevelError, PickupKind,
};
use nalgebra as na;
use thiserror::Error;

/// Engine overrides, read relative to the working directory when present.
const CONFIG_PATH: &str = "assets/config.ron";

const DEMO_LEVEL: &str = include_str!("../assets/levels/demo.ron");

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Level(#[from] LevelError),
}

/// Pickups gathered so far.
#[derive(Debug, Default)]
pub struct Score {
    pub coins: u32,
    pub keys: u32,
    pub keys_total: u32,
    pub complete: bool,
}

impl Score {
    /// The goal only opens once every key is collected.
    pub fn goal_open(&self) -> bool {
        self.keys >= self.keys_total
    }
}

/// The running level.
#[derive(Resource)]
pub struct Game {
    pub world: KulaWorld,
    pub level: GridLevel,
    pub radius: f32,
    pub score: Score,
}

impl Game {
    /// Load the level at `level_path`, or the bundled demo.
    pub fn load(level_path: Option<&str>) -> Result<Self, LoadError> {
        let config = match fs::read_to_string(CONFIG_PATH) {
            Ok(text) => EngineConfig::from_ron(&text)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => EngineConfig::default(),
            Err(source) => {
                return Err(LoadError::Io {
                    path: CONFIG_PATH.into(),
                    source,
                });
            }
        };

        let text = match level_path {
            Some(path) => fs::read_to_string(path).map_err(|source| LoadError::Io {
                path: path.into(),
                source,
            })?,
            None => DEMO_LEVEL.to_string(),
        };
        let level = GridLevel::from_ron(&text)?;

        let radius = config.motion.radius;
        let world = KulaWorld::load(&level, config)?;
        let keys_total = level
            .def()
            .pickups
            .iter()
            .filter(|p| p.kind == PickupKind::Key)
            .count() as u32;

        Ok(Self {
            world,
            level,
            radius,
            score: Score {
                keys_total,
                ..Score::default()
            },
        })
    }
}

/// Ties a render entity to its engine element.
#[derive(Component, Debug, Clone, Copy)]
pub struct LevelElement(pub ElementId);

#[derive(Component)]
pub struct MovingBlock;

#[derive(Component)]
pub struct Pickup;

pub(super) fn plugin(app: &mut App) {
    app.add_systems(Startup, setup);
    app.add_systems(Update, (sync_platforms, spin_pickups));
}

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    game: Res<Game>,
) {
    info!("World setup: {}", game.level.name());

    let def = game.level.def();
    let size = def.block_size;
    let cube = meshes.add(Cuboid::from_length(size));
    let stone = materials.add(StandardMaterial {
        base_color: Color::srgb_u8(124, 144, 255),
        perceptual_roughness: 0.8,
        ..default()
    });
    let ferry = materials.add(StandardMaterial {
        base_color: Color::srgb_u8(230, 150, 70),
        perceptual_roughness: 0.8,
        ..default()
    });

    for block in &def.blocks {
        let Some(p) = game.world.element_position(block.id) else {
            continue;
        };
        let mut entity = commands.spawn((
            LevelElement(block.id),
            Mesh3d(cube.clone()),
            Transform::from_translation(to_bevy(&p)),
        ));
        if block.motion.is_fixed() {
            entity.insert(MeshMaterial3d(stone.clone()));
        } else {
            entity.insert((MovingBlock, MeshMaterial3d(ferry.clone())));
        }
    }

    for pickup in &def.pickups {
        let Some(p) = game.world.element_position(pickup.id) else {
            continue;
        };
        let (mesh, color) = match pickup.kind {
            PickupKind::Coin => (
                meshes.add(Cylinder::new(size * 0.2, size * 0.05)),
                Color::srgb(1.0, 0.85, 0.2),
            ),
            PickupKind::Key => (
                meshes.add(Cuboid::new(size * 0.12, size * 0.4, size * 0.12)),
                Color::srgb(0.9, 0.3, 0.9),
            ),
            PickupKind::Goal => (
                meshes.add(Torus::new(size * 0.2, size * 0.3)),
                Color::srgb(0.3, 1.0, 0.4),
            ),
        };
        commands.spawn((
            LevelElement(pickup.id),
            Pickup,
            Mesh3d(mesh),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: color,
                emissive: color.to_linear() * 0.5,
                ..default()
            })),
            Transform::from_translation(to_bevy(&p)),
        ));
    }

    let bounds = game.world.bounds();
    let center = to_bevy(&((bounds.min + bounds.max) * 0.5));
    commands.spawn((
        DirectionalLight {
            shadows_enabled: true,
            ..default()
        },
        Transform::from_translation(center + Vec3::new(4.0, 8.0, 4.0)).looking_at(center, Vec3::Y),
    ));
}

fn sync_platforms(
    game: Res<Game>,
    mut blocks: Query<(&LevelElement, &mut Transform), With<MovingBlock>>,
) {
    for (element, mut transform) in &mut blocks {
        if let Some(p) = game.world.element_position(element.0) {
            transform.translation = to_bevy(&p);
        }
    }
}

fn spin_pickups(mut pickups: Query<&mut Transform, With<Pickup>>, time: Res<Time>) {
    for mut transform in &mut pickups {
        transform.rotate_local_y(1.5 * time.delta_secs());
    }
}

#[inline]
pub fn to_bevy(v: &na::Vector3<f32>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}
