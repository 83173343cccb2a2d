//! Integration tests for the broad-phase AABB tree.

use planar_core::aabb::Aabb;
use planar_core::body::BodyType;
use planar_core::math::Vec2;
use planar_core::shapes::Shape;
use planar_core::tree::AabbTree;
use planar_core::world::{World, WorldSettings};

fn aabb(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Aabb {
    Aabb::new(Vec2::new(min_x, min_y), Vec2::new(max_x, max_y))
}

/// Small deterministic PRNG so the randomized tests are reproducible.
struct XorShift(u32);

impl XorShift {
    fn next_u32(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }

    /// Uniform in [0, 1).
    fn unit(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }

    fn range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.unit()
    }
}

fn random_aabb(rng: &mut XorShift) -> Aabb {
    let cx = rng.range(0.0, 100.0);
    let cy = rng.range(0.0, 100.0);
    let hw = rng.range(0.5, 2.5);
    let hh = rng.range(0.5, 2.5);
    aabb(cx - hw, cy - hh, cx + hw, cy + hh)
}

// =========================================================================
// Empty tree
// =========================================================================

#[test]
fn test_empty_tree() {
    let tree = AabbTree::new();
    assert!(tree.is_empty());
    assert!(tree.query_point(Vec2::ZERO).is_empty());
    assert!(tree.collision_pairs().is_empty());
    assert_eq!(tree.cost(), 0.0);
}

#[test]
fn test_single_leaf_has_no_pairs() {
    let mut tree = AabbTree::new();
    tree.insert(0, aabb(-1.0, -1.0, 1.0, 1.0));
    assert!(tree.collision_pairs().is_empty());
    assert_eq!(tree.query_point(Vec2::ZERO), vec![0]);
    tree.validate();
}

// =========================================================================
// Pair enumeration
// =========================================================================

#[test]
fn test_two_disjoint_boxes_no_pairs() {
    let mut tree = AabbTree::new();
    tree.insert(0, aabb(-1.0, -1.0, 1.0, 1.0));
    tree.insert(1, aabb(9.0, -1.0, 11.0, 1.0));
    assert!(tree.collision_pairs().is_empty());
    assert!(tree.cost() > 0.0);
    tree.validate();
}

#[test]
fn test_two_overlapping_boxes_one_pair() {
    let mut tree = AabbTree::new();
    tree.insert(0, aabb(-1.0, -1.0, 1.0, 1.0));
    tree.insert(1, aabb(0.5, -1.0, 2.5, 1.0));
    let pairs = tree.collision_pairs();
    assert_eq!(pairs.len(), 1);
    let (a, b) = pairs[0];
    assert_eq!((a.min(b), a.max(b)), (0, 1));
}

#[test]
fn test_three_boxes_chain_pairs() {
    // A-B and B-C overlap; A-C do not.
    let mut tree = AabbTree::new();
    tree.insert(0, aabb(-1.0, -1.0, 1.0, 1.0));
    tree.insert(1, aabb(0.5, -1.0, 2.5, 1.0));
    tree.insert(2, aabb(2.0, -1.0, 4.0, 1.0));
    let mut pairs: Vec<(u32, u32)> = tree
        .collision_pairs()
        .into_iter()
        .map(|(a, b)| (a.min(b), a.max(b)))
        .collect();
    pairs.sort();
    assert_eq!(pairs, vec![(0, 1), (1, 2)]);
}

#[test]
fn test_pairs_match_brute_force_and_are_unique() {
    let mut rng = XorShift(0xBEEF);
    let mut tree = AabbTree::new();
    let mut boxes = Vec::new();
    for id in 0..40u32 {
        let b = random_aabb(&mut rng);
        tree.insert(id, b);
        boxes.push(b);
    }
    tree.validate();

    let mut expected = Vec::new();
    for i in 0..boxes.len() {
        for j in (i + 1)..boxes.len() {
            if boxes[i].overlaps(&boxes[j]) {
                expected.push((i as u32, j as u32));
            }
        }
    }

    let mut pairs: Vec<(u32, u32)> = tree
        .collision_pairs()
        .into_iter()
        .map(|(a, b)| (a.min(b), a.max(b)))
        .collect();
    pairs.sort();
    let deduped: std::collections::HashSet<_> = pairs.iter().copied().collect();
    assert_eq!(deduped.len(), pairs.len(), "pair emitted twice");
    expected.sort();
    assert_eq!(pairs, expected);
}

// =========================================================================
// Queries
// =========================================================================

#[test]
fn test_point_query_matches_brute_force() {
    let mut rng = XorShift(0x1234);
    let mut tree = AabbTree::new();
    let mut boxes = Vec::new();
    for id in 0..50u32 {
        let b = random_aabb(&mut rng);
        tree.insert(id, b);
        boxes.push(b);
    }

    for _ in 0..100 {
        let p = Vec2::new(rng.range(-10.0, 110.0), rng.range(-10.0, 110.0));
        let mut got = tree.query_point(p);
        got.sort();
        let mut expected: Vec<u32> = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.contains_point(p))
            .map(|(i, _)| i as u32)
            .collect();
        expected.sort();
        assert_eq!(got, expected, "point query mismatch at {p:?}");
    }
}

#[test]
fn test_region_query_fixes_swapped_bounds() {
    let mut tree = AabbTree::new();
    tree.insert(0, aabb(0.0, 0.0, 1.0, 1.0));
    tree.insert(1, aabb(5.0, 5.0, 6.0, 6.0));
    // min and max deliberately swapped.
    let region = Aabb::new(Vec2::new(2.0, 2.0), Vec2::new(-1.0, -1.0));
    assert_eq!(tree.query_region(region), vec![0]);
}

// =========================================================================
// Structure: insert, remove, invariants
// =========================================================================

#[test]
fn test_invariants_hold_through_random_churn() {
    let mut rng = XorShift(0xCAFE);
    let mut tree = AabbTree::new();
    let mut live = Vec::new();
    for id in 0..60u32 {
        let node = tree.insert(id, random_aabb(&mut rng));
        live.push(node);
        if id % 3 == 0 {
            tree.validate();
        }
    }
    tree.validate();

    // Remove in an interleaved order, checking structure as we go.
    while !live.is_empty() {
        let pick = (rng.next_u32() as usize) % live.len();
        tree.remove(live.swap_remove(pick));
        if live.len() % 7 == 0 {
            tree.validate();
        }
    }
    assert!(tree.is_empty());
    assert_eq!(tree.cost(), 0.0);
}

#[test]
fn test_remove_then_query() {
    let mut tree = AabbTree::new();
    let a = tree.insert(0, aabb(-1.0, -1.0, 1.0, 1.0));
    tree.insert(1, aabb(0.5, -1.0, 2.5, 1.0));
    assert_eq!(tree.collision_pairs().len(), 1);
    tree.remove(a);
    tree.validate();
    assert!(tree.collision_pairs().is_empty());
    assert!(tree.query_point(Vec2::new(-0.9, 0.0)).is_empty());
    assert_eq!(tree.query_point(Vec2::new(2.0, 0.0)), vec![1]);
}

#[test]
fn test_rotations_do_not_hurt_tree_cost() {
    // Summed over several seeds, the rotation pass must not produce a
    // more expensive tree than plain SAH insertion.
    let mut with_total = 0.0f32;
    let mut without_total = 0.0f32;
    for seed in [0x11u32, 0x2222, 0x333333, 0x4B1D, 0xD00D] {
        let mut rng = XorShift(seed);
        let boxes: Vec<Aabb> = (0..120).map(|_| random_aabb(&mut rng)).collect();

        let mut with_rot = AabbTree::new();
        for (id, b) in boxes.iter().enumerate() {
            with_rot.insert(id as u32, *b);
        }
        with_rot.validate();

        let mut without_rot = AabbTree::new();
        without_rot.rotations = false;
        for (id, b) in boxes.iter().enumerate() {
            without_rot.insert(id as u32, *b);
        }
        without_rot.validate();

        with_total += with_rot.cost();
        without_total += without_rot.cost();
    }
    assert!(
        with_total <= without_total,
        "rotations made trees worse: {with_total} > {without_total}"
    );
}

// =========================================================================
// World-level broad phase
// =========================================================================

fn quiet_world() -> World {
    let settings = WorldSettings {
        gravity: Vec2::ZERO,
        ..WorldSettings::default()
    };
    World::new(settings).unwrap()
}

#[test]
fn test_world_scenario_disjoint_and_overlapping() {
    let mut world = quiet_world();
    let unit_box = Shape::Box { half_w: 1.0, half_h: 1.0 };
    let a = world
        .add_body(BodyType::Dynamic, unit_box, Vec2::new(0.0, 0.0), 1.0)
        .unwrap();
    let b = world
        .add_body(BodyType::Dynamic, unit_box, Vec2::new(10.0, 0.0), 1.0)
        .unwrap();
    assert!(world.tree_cost() > 0.0);
    world.step(1.0 / 60.0);
    assert!(world.contacts().is_empty());

    // Move B next to A; one contact pair appears.
    world.body_mut(b).unwrap().position = Vec2::new(1.5, 0.0);
    world.step(1.0 / 60.0);
    assert_eq!(world.contacts().len(), 1);
    let c = &world.contacts()[0];
    let pair = (c.body_a.min(c.body_b), c.body_a.max(c.body_b));
    assert_eq!(pair, (a, b));
}

#[test]
fn test_world_queries_track_moved_body() {
    let mut world = quiet_world();
    let id = world
        .add_body(
            BodyType::Dynamic,
            Shape::Circle { radius: 1.0 },
            Vec2::new(0.0, 0.0),
            1.0,
        )
        .unwrap();
    assert_eq!(world.query_point(Vec2::ZERO), vec![id]);

    world.body_mut(id).unwrap().position = Vec2::new(50.0, 0.0);
    world.step(1.0 / 60.0);
    assert!(world.query_point(Vec2::ZERO).is_empty());
    assert_eq!(world.query_point(Vec2::new(50.0, 0.0)), vec![id]);
    assert_eq!(
        world.query_region(aabb(45.0, -5.0, 55.0, 5.0)),
        vec![id]
    );
}

#[test]
fn test_body_and_leaf_backpointers_agree() {
    let mut world = quiet_world();
    let mut ids = Vec::new();
    for i in 0..12 {
        let id = world
            .add_body(
                BodyType::Dynamic,
                Shape::Circle { radius: 0.4 },
                Vec2::new(i as f32 * 3.0, 0.0),
                1.0,
            )
            .unwrap();
        ids.push(id);
    }
    world.validate_broad_phase();

    world.remove_body(ids[3]);
    world.remove_body(ids[8]);
    world.validate_broad_phase();

    for id in &ids {
        if let Some(body) = world.body_mut(*id) {
            body.linear_velocity = Vec2::new(0.0, 2.0);
        }
    }
    for _ in 0..30 {
        world.step(1.0 / 60.0);
    }
    world.validate_broad_phase();
}

#[test]
fn test_removed_body_leaves_no_trace() {
    let mut world = quiet_world();
    let a = world
        .add_body(
            BodyType::Dynamic,
            Shape::Circle { radius: 1.0 },
            Vec2::new(0.0, 0.0),
            1.0,
        )
        .unwrap();
    let b = world
        .add_body(
            BodyType::Dynamic,
            Shape::Circle { radius: 1.0 },
            Vec2::new(1.0, 0.0),
            1.0,
        )
        .unwrap();
    world.remove_body(a);
    assert!(world.body(a).is_none());
    assert_eq!(world.query_point(Vec2::new(1.0, 0.0)), vec![b]);
    world.step(1.0 / 60.0);
    assert!(world.contacts().is_empty());
}
