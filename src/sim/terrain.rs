//! Procedural tile terrain, generated lazily in square chunks
//!
//! Tiles are classified from a hash of their *global* tile coordinates, so a
//! chunk is identical every time it is generated and chunk borders are
//! seamless. Only walls block movement.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::camera::Camera;
use crate::tuning::TerrainConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tile {
    Ground,
    Wall,
    Water,
}

impl Tile {
    pub fn blocks_movement(self) -> bool {
        self == Tile::Wall
    }
}

/// Chunk grid coordinate (chunk (0, 0) spans `[0, chunk_size)` on both axes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A square block of tiles stored row-major
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainChunk {
    pub coord: ChunkCoord,
    tiles_per_side: usize,
    tiles: Vec<Tile>,
}

impl TerrainChunk {
    pub fn tiles_per_side(&self) -> usize {
        self.tiles_per_side
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Tile at local indices; out-of-range indices are clamped to the edge
    pub fn tile(&self, tx: usize, ty: usize) -> Tile {
        let last = self.tiles_per_side - 1;
        self.tiles[ty.min(last) * self.tiles_per_side + tx.min(last)]
    }
}

/// Hash noise in `[0, 1)` for a global tile coordinate
///
/// Euclidean remainder keeps negative coordinates inside `[0, 1)` as well.
pub fn tile_noise(gx: i64, gy: i64, config: &TerrainConfig) -> f64 {
    let seed = f64::from(config.seed);
    let x = gx as f64 * config.noise_scale + seed * 1.618_034;
    let y = gy as f64 * config.noise_scale + seed * 0.414_214;
    let value = ((x * 12.9898 + y * 78.233).sin() * 43758.5453).rem_euclid(1.0);
    // rem_euclid can round up to exactly 1.0 for tiny negative inputs
    if value >= 1.0 { 0.0 } else { value }
}

pub fn classify(noise: f64, config: &TerrainConfig) -> Tile {
    if noise < config.water_threshold {
        Tile::Water
    } else if noise > config.wall_threshold {
        Tile::Wall
    } else {
        Tile::Ground
    }
}

/// Generate a chunk from scratch (pure; depends only on config and coord)
pub fn generate_chunk(config: &TerrainConfig, coord: ChunkCoord) -> TerrainChunk {
    let n = config.tiles_per_side();
    let base_x = i64::from(coord.x) * n as i64;
    let base_y = i64::from(coord.y) * n as i64;
    let mut tiles = Vec::with_capacity(n * n);
    for ty in 0..n {
        for tx in 0..n {
            let noise = tile_noise(base_x + tx as i64, base_y + ty as i64, config);
            tiles.push(classify(noise, config));
        }
    }
    TerrainChunk {
        coord,
        tiles_per_side: n,
        tiles,
    }
}

/// Lazily populated chunk cache
#[derive(Debug, Clone)]
pub struct TerrainGrid {
    config: TerrainConfig,
    chunks: BTreeMap<ChunkCoord, TerrainChunk>,
}

impl TerrainGrid {
    pub fn new(config: TerrainConfig) -> Self {
        Self {
            config,
            chunks: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    pub fn chunk_coord_of(&self, point: Vec2) -> ChunkCoord {
        let cs = self.config.chunk_size;
        ChunkCoord::new((point.x / cs).floor() as i32, (point.y / cs).floor() as i32)
    }

    /// Fetch a chunk, generating and caching it on first access
    pub fn chunk(&mut self, coord: ChunkCoord) -> &TerrainChunk {
        let config = &self.config;
        self.chunks
            .entry(coord)
            .or_insert_with(|| generate_chunk(config, coord))
    }

    /// Chunk plus clamped local tile indices containing `point`
    pub fn locate(&self, point: Vec2) -> (ChunkCoord, usize, usize) {
        let coord = self.chunk_coord_of(point);
        let cs = self.config.chunk_size;
        let origin = Vec2::new(coord.x as f32 * cs, coord.y as f32 * cs);
        let last = self.config.tiles_per_side() as i64 - 1;
        let local = (point - origin) / self.config.tile_size;
        let tx = (local.x.floor() as i64).clamp(0, last) as usize;
        let ty = (local.y.floor() as i64).clamp(0, last) as usize;
        (coord, tx, ty)
    }

    /// Tile under a world point; non-finite points read as ground
    pub fn tile_at(&mut self, point: Vec2) -> Tile {
        if !crate::is_finite_point(point) {
            return Tile::Ground;
        }
        let (coord, tx, ty) = self.locate(point);
        self.chunk(coord).tile(tx, ty)
    }

    /// Whether a point lies on a blocking tile
    pub fn check_collision(&mut self, point: Vec2) -> bool {
        self.tile_at(point).blocks_movement()
    }

    /// Ensure and return every chunk intersecting the camera's view
    pub fn visible_chunks(&mut self, camera: &Camera, viewport: Vec2) -> Vec<ChunkCoord> {
        let (lo, hi) = camera.view_rect(viewport);
        let cs = self.config.chunk_size;
        let start_x = (lo.x / cs).floor() as i32;
        let start_y = (lo.y / cs).floor() as i32;
        let end_x = ((hi.x / cs).ceil() as i32 - 1).max(start_x);
        let end_y = ((hi.y / cs).ceil() as i32 - 1).max(start_y);

        let mut visible = Vec::new();
        for y in start_y..=end_y {
            for x in start_x..=end_x {
                let coord = ChunkCoord::new(x, y);
                self.chunk(coord);
                visible.push(coord);
            }
        }
        visible
    }

    /// Drop a cached chunk; it regenerates identically on next access
    pub fn unload(&mut self, coord: ChunkCoord) -> bool {
        self.chunks.remove(&coord).is_some()
    }

    /// Drop every cached chunk outside the inclusive coordinate range
    pub fn retain_within(&mut self, min: ChunkCoord, max: ChunkCoord) {
        self.chunks
            .retain(|c, _| c.x >= min.x && c.x <= max.x && c.y >= min.y && c.y <= max.y);
    }

    pub fn loaded_chunks(&self) -> Vec<ChunkCoord> {
        self.chunks.keys().copied().collect()
    }

    /// Closest walkable tile centre to `point`, searching square rings of
    /// tiles outward; returns `point` unchanged if nothing open is found
    pub fn nearest_open_point(&mut self, point: Vec2, max_rings: i32) -> Vec2 {
        if !self.check_collision(point) {
            return point;
        }
        let ts = self.config.tile_size;
        let center_tile = (point / ts).floor();
        for ring in 1..=max_rings {
            for dy in -ring..=ring {
                for dx in -ring..=ring {
                    if dx.abs() != ring && dy.abs() != ring {
                        continue;
                    }
                    let candidate = (center_tile + Vec2::new(dx as f32, dy as f32) + 0.5) * ts;
                    if !self.check_collision(candidate) {
                        return candidate;
                    }
                }
            }
        }
        log::warn!("No open tile within {} rings of ({}, {})", max_rings, point.x, point.y);
        point
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile_center(grid: &TerrainGrid, coord: ChunkCoord, tx: usize, ty: usize) -> Vec2 {
        let cfg = grid.config();
        Vec2::new(
            coord.x as f32 * cfg.chunk_size + (tx as f32 + 0.5) * cfg.tile_size,
            coord.y as f32 * cfg.chunk_size + (ty as f32 + 0.5) * cfg.tile_size,
        )
    }

    #[test]
    fn test_chunk_regeneration_is_identical() {
        let mut grid = TerrainGrid::new(TerrainConfig::default());
        let coord = ChunkCoord::new(3, -2);
        let first = grid.chunk(coord).clone();
        assert!(grid.unload(coord));
        assert!(!grid.loaded_chunks().contains(&coord));
        let second = grid.chunk(coord).clone();
        assert_eq!(first, second);

        let mut other = TerrainGrid::new(TerrainConfig::default());
        assert_eq!(other.chunk(coord), &first);
    }

    #[test]
    fn test_seed_changes_layout() {
        let a = generate_chunk(&TerrainConfig::default(), ChunkCoord::new(0, 0));
        let b = generate_chunk(
            &TerrainConfig {
                seed: 99,
                ..TerrainConfig::default()
            },
            ChunkCoord::new(0, 0),
        );
        assert_ne!(a.tiles(), b.tiles());
    }

    #[test]
    fn test_noise_in_unit_range_for_negative_coords() {
        let cfg = TerrainConfig::default();
        for gx in -40..40 {
            for gy in [-1000, -3, 0, 7, 1000] {
                let n = tile_noise(gx, gy, &cfg);
                assert!((0.0..1.0).contains(&n), "noise {} out of range", n);
            }
        }
    }

    #[test]
    fn test_tile_mix_is_plausible() {
        let cfg = TerrainConfig::default();
        let mut walls = 0;
        let mut water = 0;
        let mut total = 0;
        for cy in -1..1 {
            for cx in -1..1 {
                let chunk = generate_chunk(&cfg, ChunkCoord::new(cx, cy));
                for tile in chunk.tiles() {
                    total += 1;
                    match tile {
                        Tile::Wall => walls += 1,
                        Tile::Water => water += 1,
                        Tile::Ground => {}
                    }
                }
            }
        }
        let wall_frac = walls as f64 / total as f64;
        let water_frac = water as f64 / total as f64;
        assert!(wall_frac > 0.02 && wall_frac < 0.25, "wall fraction {}", wall_frac);
        assert!(water_frac > 0.02 && water_frac < 0.3, "water fraction {}", water_frac);
    }

    #[test]
    fn test_collision_only_on_walls() {
        let mut grid = TerrainGrid::new(TerrainConfig::default());
        let coord = ChunkCoord::new(0, 0);
        let chunk = grid.chunk(coord).clone();
        let n = chunk.tiles_per_side();
        let mut saw_wall = false;
        for ty in 0..n {
            for tx in 0..n {
                let p = tile_center(&grid, coord, tx, ty);
                let tile = chunk.tile(tx, ty);
                assert_eq!(grid.tile_at(p), tile);
                assert_eq!(grid.check_collision(p), tile == Tile::Wall);
                saw_wall |= tile == Tile::Wall;
            }
        }
        assert!(saw_wall || chunk.tiles().iter().all(|t| *t != Tile::Wall));
    }

    #[test]
    fn test_locate_clamps_boundary_rounding() {
        let grid = TerrainGrid::new(TerrainConfig::default());
        let (coord, tx, ty) = grid.locate(Vec2::new(-1e-5, 0.0));
        assert_eq!(coord, ChunkCoord::new(-1, 0));
        assert!(tx <= 15);
        assert_eq!(ty, 0);
    }

    #[test]
    fn test_non_finite_point_is_ground() {
        let mut grid = TerrainGrid::new(TerrainConfig::default());
        assert_eq!(grid.tile_at(Vec2::new(f32::NAN, 3.0)), Tile::Ground);
        assert!(grid.loaded_chunks().is_empty());
    }

    #[test]
    fn test_visible_chunks_cover_view_exactly() {
        let mut grid = TerrainGrid::new(TerrainConfig::default());
        let camera = Camera::at(Vec2::new(256.0, 256.0));
        assert_eq!(
            grid.visible_chunks(&camera, Vec2::new(512.0, 512.0)),
            vec![ChunkCoord::new(0, 0)]
        );

        let camera = Camera::at(Vec2::ZERO);
        let visible = grid.visible_chunks(&camera, Vec2::new(1024.0, 1024.0));
        assert_eq!(visible.len(), 4);
        assert!(visible.contains(&ChunkCoord::new(-1, -1)));
        assert!(visible.contains(&ChunkCoord::new(0, 0)));

        let mut zoomed = Camera::at(Vec2::new(256.0, 256.0));
        zoomed.zoom = 0.5;
        assert_eq!(grid.visible_chunks(&zoomed, Vec2::new(512.0, 512.0)).len(), 9);
    }

    #[test]
    fn test_retain_within() {
        let mut grid = TerrainGrid::new(TerrainConfig::default());
        for x in -2..=2 {
            grid.chunk(ChunkCoord::new(x, 0));
        }
        grid.retain_within(ChunkCoord::new(-1, -1), ChunkCoord::new(1, 1));
        assert_eq!(grid.loaded_chunks().len(), 3);
    }

    #[test]
    fn test_nearest_open_point_is_walkable() {
        let mut grid = TerrainGrid::new(TerrainConfig::default());
        let coord = ChunkCoord::new(0, 0);
        let chunk = grid.chunk(coord).clone();
        let n = chunk.tiles_per_side();
        for ty in 0..n {
            for tx in 0..n {
                let p = tile_center(&grid, coord, tx, ty);
                let open = grid.nearest_open_point(p, 8);
                assert!(!grid.check_collision(open));
                if chunk.tile(tx, ty) != Tile::Wall {
                    assert_eq!(open, p);
                }
            }
        }
    }
}
