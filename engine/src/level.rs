/*!
Level geometry: the grid data format and the host trait the world loads from.

A level is a set of unit blocks on an integer grid, pickups sitting in empty cells, and a
spawn cell with the up axis the player starts with. On disk it is RON:

```ron
(
    name: "first steps",
    blocks: [
        (id: 1, cell: (0, 0, 0)),
        (id: 2, cell: (1, 0, 0), motion: Linear(offset: (0.0, 0.0, 2.0), period: 4.0)),
    ],
    pickups: [(id: 10, cell: (0, 1, 1), kind: Coin)],
    spawn: (cell: (0, 1, 0), up: PosY),
)
```

Cell `c` has its center at `c * block_size`. Every block face is axis-aligned, which is
what lets the surface probe snap normals to axes.
*/

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    basis::{AxisDirection, Vec3},
    constants::{BLOCK_SIZE, DEFAULT_FALL_LIMIT},
    error::LevelError,
    platform::PlatformMotion,
    shape::ShapeDef,
    simulation::BodyDesc,
    tag::ElementId,
};

/// Integer grid coordinates.
pub type Cell = [i32; 3];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PickupKind {
    Coin,
    Key,
    /// Level exit. Usually only reachable once every key is collected.
    Goal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockDef {
    pub id: ElementId,
    pub cell: Cell,
    #[serde(default)]
    pub motion: PlatformMotion,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PickupDef {
    pub id: ElementId,
    pub cell: Cell,
    pub kind: PickupKind,
}

/// Where the ball starts: an empty cell resting against the block below it (relative to `up`).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnDef {
    pub cell: Cell,
    pub up: AxisDirection,
}

/// Plain level data, as stored on disk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelDef {
    pub name: String,
    #[serde(default = "default_block_size")]
    pub block_size: f32,
    pub blocks: Vec<BlockDef>,
    #[serde(default)]
    pub pickups: Vec<PickupDef>,
    pub spawn: SpawnDef,
    /// How far outside the level bounds the ball may get before it counts as fallen.
    #[serde(default = "default_fall_limit")]
    pub fall_limit: f32,
}

fn default_block_size() -> f32 {
    BLOCK_SIZE
}

fn default_fall_limit() -> f32 {
    DEFAULT_FALL_LIMIT
}

/// What a collider is for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ColliderRole {
    /// Immovable block.
    Solid,
    /// Block moved by a [`PlatformMotion`].
    Platform(PlatformMotion),
    /// Sensor the player can pass through.
    Pickup(PickupKind),
}

/// One collider supplied by a [`LevelGeometryHost`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColliderDef {
    pub id: ElementId,
    pub shape: ShapeDef,
    /// World-space center (home position for platforms).
    pub position: Vec3,
    pub role: ColliderRole,
}

impl ColliderDef {
    /// Body description for the simulation.
    pub fn body_desc(&self) -> BodyDesc {
        match self.role {
            ColliderRole::Solid => BodyDesc::fixed(self.shape, self.position, self.id),
            ColliderRole::Platform(motion) if motion.is_fixed() => {
                BodyDesc::fixed(self.shape, self.position, self.id)
            }
            ColliderRole::Platform(_) => BodyDesc::kinematic(self.shape, self.position, self.id),
            ColliderRole::Pickup(_) => BodyDesc::trigger(self.shape, self.position, self.id),
        }
    }
}

/// Where and how the player enters the level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnPoint {
    /// Point on the supporting face directly below the spawn cell center.
    pub surface: Vec3,
    pub up: AxisDirection,
}

/// Axis-aligned box around all level geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl LevelBounds {
    /// Distance from `p` to the box; zero inside.
    pub fn distance_outside(&self, p: &Vec3) -> f32 {
        let below = self.min - p;
        let above = p - self.max;
        below.sup(&above).sup(&Vec3::zeros()).norm()
    }
}

/// Supplies level geometry to the world. Queried once, at load time.
pub trait LevelGeometryHost {
    /// Every static, kinematic and trigger collider, sorted by id.
    fn colliders(&self) -> Vec<ColliderDef>;
    fn spawn(&self) -> SpawnPoint;
    fn bounds(&self) -> LevelBounds;
    /// See [`LevelDef::fall_limit`].
    fn fall_limit(&self) -> f32;
}

/// A validated [`LevelDef`].
#[derive(Clone, Debug)]
pub struct GridLevel {
    def: LevelDef,
    pickups: BTreeMap<ElementId, PickupKind>,
}

impl GridLevel {
    /// Validate level data.
    ///
    /// Rejects levels without blocks, id 0 (the player's), duplicate ids, two elements in one
    /// cell, a spawn inside a block and invalid platform motion.
    pub fn from_def(mut def: LevelDef) -> Result<Self, LevelError> {
        if def.blocks.is_empty() {
            return Err(LevelError::Empty(def.name));
        }
        if !(def.block_size.is_finite() && def.block_size > 0.0) {
            return Err(LevelError::InvalidBlockSize(def.block_size));
        }

        let mut ids = HashSet::new();
        let mut cells = HashSet::new();
        let elements = def
            .blocks
            .iter()
            .map(|b| (b.id, b.cell))
            .chain(def.pickups.iter().map(|p| (p.id, p.cell)));
        for (id, cell) in elements {
            if id == 0 {
                return Err(LevelError::ReservedId(id));
            }
            if !ids.insert(id) {
                return Err(LevelError::DuplicateId(id));
            }
            if !cells.insert(cell) {
                let [x, y, z] = cell;
                return Err(LevelError::DuplicateCell(x, y, z));
            }
        }

        for block in &def.blocks {
            block.motion.validate().map_err(|period| LevelError::InvalidPlatform {
                id: block.id,
                period,
            })?;
        }

        let spawn = def.spawn.cell;
        let [x, y, z] = spawn;
        if def.blocks.iter().any(|b| b.cell == spawn) {
            return Err(LevelError::SpawnInsideBlock(x, y, z));
        }

        def.blocks.sort_by_key(|b| b.id);
        def.pickups.sort_by_key(|p| p.id);
        let pickups = def.pickups.iter().map(|p| (p.id, p.kind)).collect();

        Ok(Self { def, pickups })
    }

    pub fn from_ron(text: &str) -> Result<Self, LevelError> {
        let def: LevelDef = ron::from_str(text)?;
        Self::from_def(def)
    }

    #[inline]
    pub fn def(&self) -> &LevelDef {
        &self.def
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn pickup_kind(&self, id: ElementId) -> Option<PickupKind> {
        self.pickups.get(&id).copied()
    }

    /// World-space center of `cell`.
    pub fn cell_center(&self, cell: Cell) -> Vec3 {
        Vec3::new(cell[0] as f32, cell[1] as f32, cell[2] as f32) * self.def.block_size
    }
}

impl LevelGeometryHost for GridLevel {
    fn colliders(&self) -> Vec<ColliderDef> {
        let block = ShapeDef::cube(self.def.block_size);
        // Pickups are smaller than their cell so grazing a neighbor does not collect them.
        let pickup = ShapeDef::cube(self.def.block_size * 0.5);

        let mut out: Vec<ColliderDef> = self
            .def
            .blocks
            .iter()
            .map(|b| ColliderDef {
                id: b.id,
                shape: block,
                position: self.cell_center(b.cell),
                role: if b.motion.is_fixed() {
                    ColliderRole::Solid
                } else {
                    ColliderRole::Platform(b.motion)
                },
            })
            .chain(self.def.pickups.iter().map(|p| ColliderDef {
                id: p.id,
                shape: pickup,
                position: self.cell_center(p.cell),
                role: ColliderRole::Pickup(p.kind),
            }))
            .collect();
        out.sort_by_key(|c| c.id);
        out
    }

    fn spawn(&self) -> SpawnPoint {
        let up = self.def.spawn.up;
        SpawnPoint {
            surface: self.cell_center(self.def.spawn.cell)
                - up.to_vector() * (self.def.block_size * 0.5),
            up,
        }
    }

    fn bounds(&self) -> LevelBounds {
        let half = Vec3::repeat(self.def.block_size * 0.5);
        let mut min = Vec3::repeat(f32::INFINITY);
        let mut max = Vec3::repeat(f32::NEG_INFINITY);
        for b in &self.def.blocks {
            let c = self.cell_center(b.cell);
            min = min.inf(&(c - half + motion_low(&b.motion)));
            max = max.sup(&(c + half + motion_high(&b.motion)));
        }
        LevelBounds { min, max }
    }

    fn fall_limit(&self) -> f32 {
        self.def.fall_limit
    }
}

/// Most negative displacement a platform reaches, per axis.
fn motion_low(motion: &PlatformMotion) -> Vec3 {
    match *motion {
        PlatformMotion::Fixed => Vec3::zeros(),
        PlatformMotion::Linear { offset, .. } => Vec3::from(offset).inf(&Vec3::zeros()),
    }
}

/// Most positive displacement a platform reaches, per axis.
fn motion_high(motion: &PlatformMotion) -> Vec3 {
    match *motion {
        PlatformMotion::Fixed => Vec3::zeros(),
        PlatformMotion::Linear { offset, .. } => Vec3::from(offset).sup(&Vec3::zeros()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(id: ElementId, cell: Cell) -> BlockDef {
        BlockDef {
            id,
            cell,
            motion: PlatformMotion::Fixed,
        }
    }

    fn def() -> LevelDef {
        LevelDef {
            name: "test".into(),
            block_size: 1.0,
            blocks: vec![block(3, [1, 0, 0]), block(1, [0, 0, 0]), block(2, [0, 0, 1])],
            pickups: vec![PickupDef {
                id: 10,
                cell: [0, 1, 1],
                kind: PickupKind::Coin,
            }],
            spawn: SpawnDef {
                cell: [0, 1, 0],
                up: AxisDirection::PosY,
            },
            fall_limit: 5.0,
        }
    }

    #[test]
    fn colliders_are_sorted_and_classified() {
        let level = GridLevel::from_def(def()).unwrap();
        let colliders = level.colliders();

        let ids: Vec<_> = colliders.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 10]);
        assert_eq!(colliders[2].position, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(colliders[0].role, ColliderRole::Solid);
        assert_eq!(colliders[3].role, ColliderRole::Pickup(PickupKind::Coin));
        assert_eq!(level.pickup_kind(10), Some(PickupKind::Coin));
        assert_eq!(level.pickup_kind(1), None);
    }

    #[test]
    fn spawn_rests_on_block_below() {
        let level = GridLevel::from_def(def()).unwrap();
        let spawn = level.spawn();
        assert_eq!(spawn.up, AxisDirection::PosY);
        assert!((spawn.surface - Vec3::new(0.0, 0.5, 0.0)).norm() < 1.0e-6);
    }

    #[test]
    fn bounds_cover_blocks_and_platform_travel() {
        let mut d = def();
        d.blocks.push(BlockDef {
            id: 4,
            cell: [2, 0, 0],
            motion: PlatformMotion::Linear {
                offset: [0.0, 0.0, -3.0],
                period: 2.0,
            },
        });
        let bounds = GridLevel::from_def(d).unwrap().bounds();
        assert_eq!(bounds.min, Vec3::new(-0.5, -0.5, -3.5));
        assert_eq!(bounds.max, Vec3::new(2.5, 0.5, 1.5));

        assert_eq!(bounds.distance_outside(&Vec3::zeros()), 0.0);
        assert!((bounds.distance_outside(&Vec3::new(0.0, -4.5, 0.0)) - 4.0).abs() < 1.0e-6);
    }

    #[test]
    fn moving_blocks_become_kinematic_bodies() {
        let motion = PlatformMotion::Linear {
            offset: [1.0, 0.0, 0.0],
            period: 2.0,
        };
        let def = ColliderDef {
            id: 7,
            shape: ShapeDef::cube(1.0),
            position: Vec3::zeros(),
            role: ColliderRole::Platform(motion),
        };
        assert_eq!(def.body_desc().kind, crate::tag::BodyKind::Kinematic);

        let pickup = ColliderDef {
            role: ColliderRole::Pickup(PickupKind::Key),
            ..def
        };
        assert_eq!(pickup.body_desc().group, crate::tag::CollisionGroup::Trigger);
    }

    #[test]
    fn validation_rejects_malformed_levels() {
        let mut d = def();
        d.blocks.clear();
        assert!(matches!(GridLevel::from_def(d), Err(LevelError::Empty(_))));

        let mut d = def();
        d.blocks.push(block(1, [5, 5, 5]));
        assert!(matches!(GridLevel::from_def(d), Err(LevelError::DuplicateId(1))));

        let mut d = def();
        d.pickups[0].id = 3;
        assert!(matches!(GridLevel::from_def(d), Err(LevelError::DuplicateId(3))));

        let mut d = def();
        d.blocks.push(block(9, [0, 0, 0]));
        assert!(matches!(GridLevel::from_def(d), Err(LevelError::DuplicateCell(0, 0, 0))));

        let mut d = def();
        d.spawn.cell = [1, 0, 0];
        assert!(matches!(
            GridLevel::from_def(d),
            Err(LevelError::SpawnInsideBlock(1, 0, 0))
        ));

        let mut d = def();
        d.blocks[0].id = 0;
        assert!(matches!(GridLevel::from_def(d), Err(LevelError::ReservedId(0))));

        let mut d = def();
        d.blocks[0].motion = PlatformMotion::Linear {
            offset: [1.0, 0.0, 0.0],
            period: 0.0,
        };
        assert!(matches!(
            GridLevel::from_def(d),
            Err(LevelError::InvalidPlatform { id: 3, .. })
        ));

        let mut d = def();
        d.block_size = -1.0;
        assert!(matches!(GridLevel::from_def(d), Err(LevelError::InvalidBlockSize(_))));
    }

    #[test]
    fn parses_ron_with_defaults() {
        let level = GridLevel::from_ron(
            r#"(
                name: "ron",
                blocks: [
                    (id: 1, cell: (0, 0, 0)),
                    (id: 2, cell: (1, 0, 0), motion: Linear(offset: (0.0, 0.0, 2.0), period: 4.0)),
                ],
                spawn: (cell: (0, 1, 0), up: PosY),
            )"#,
        )
        .unwrap();

        assert_eq!(level.name(), "ron");
        assert_eq!(level.def().block_size, BLOCK_SIZE);
        assert_eq!(level.fall_limit(), DEFAULT_FALL_LIMIT);
        assert!(level.def().pickups.is_empty());
        assert_eq!(
            level.def().blocks[1].motion,
            PlatformMotion::Linear {
                offset: [0.0, 0.0, 2.0],
                period: 4.0
            }
        );

        assert!(matches!(
            GridLevel::from_ron("(name: \"broken\""),
            Err(LevelError::Parse(_))
        ));
    }
}
