use glam::Vec2;
use rapier2d::parry::query::ShapeCastOptions;
use rapier2d::parry::shape::Ball;
use rapier2d::prelude::*;

use crate::api::types::{ColliderId, LayerMask, LineId};
use crate::motion::probe::{Hit, ObstructionQuery, ObstructionWorld};
use crate::ribbon::hull::CollisionHull;

/// A cast reports at most this many shapes.
const MAX_CAST_HITS: usize = 16;

fn to_point(v: Vec2) -> nalgebra::Point2<f32> {
    nalgebra::Point2::new(v.x, v.y)
}

fn groups_for(layers: LayerMask) -> InteractionGroups {
    InteractionGroups::new(Group::from_bits_truncate(layers.0), Group::ALL)
}

fn query_groups(mask: LayerMask) -> InteractionGroups {
    InteractionGroups::new(Group::ALL, Group::from_bits_truncate(mask.0))
}

/// Compound of triangles covering a polygon, or `None` if nothing is left
/// after dropping slivers.
fn compound_shape(triangles: &[[Vec2; 3]]) -> Option<SharedShape> {
    let parts: Vec<(Isometry<f32>, SharedShape)> = triangles
        .iter()
        .map(|t| {
            let shape = SharedShape::triangle(to_point(t[0]), to_point(t[1]), to_point(t[2]));
            (Isometry::identity(), shape)
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(SharedShape::compound(parts))
    }
}

fn fan(polygon: &[Vec2]) -> Vec<[Vec2; 3]> {
    (1..polygon.len().saturating_sub(1))
        .map(|i| [polygon[0], polygon[i], polygon[i + 1]])
        .collect()
}

struct Entry {
    collider: ColliderId,
    handle: ColliderHandle,
    owner: Option<LineId>,
}

/// Obstruction world backed by rapier's query pipeline. Hulls become
/// parentless sensor colliders made of triangle compounds; nothing is ever
/// simulated, only queried.
pub struct RapierObstructions {
    bodies: RigidBodySet,
    colliders: ColliderSet,
    islands: IslandManager,
    query: QueryPipeline,
    entries: Vec<Entry>,
    next_collider: u32,
}

impl RapierObstructions {
    pub fn new() -> Self {
        Self {
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            islands: IslandManager::new(),
            query: QueryPipeline::new(),
            entries: Vec::with_capacity(64),
            next_collider: 1,
        }
    }

    fn alloc_collider(&mut self) -> ColliderId {
        let id = ColliderId(self.next_collider);
        self.next_collider += 1;
        id
    }

    fn insert(&mut self, shape: SharedShape, owner: Option<LineId>, layers: LayerMask) -> ColliderId {
        let collider = ColliderBuilder::new(shape)
            .sensor(true)
            .collision_groups(groups_for(layers))
            .user_data(owner.map_or(0, |l| l.0 as u128 + 1))
            .build();
        let handle = self.colliders.insert(collider);
        let id = self.alloc_collider();
        self.entries.push(Entry {
            collider: id,
            handle,
            owner,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry_of(&self, handle: ColliderHandle) -> Option<&Entry> {
        self.entries.iter().find(|e| e.handle == handle)
    }
}

impl Default for RapierObstructions {
    fn default() -> Self {
        Self::new()
    }
}

impl ObstructionQuery for RapierObstructions {
    fn circle_cast(
        &self,
        origin: Vec2,
        radius: f32,
        direction: Vec2,
        mask: LayerMask,
        max_distance: f32,
    ) -> Vec<Hit> {
        let ball = Ball::new(radius.max(1e-4));
        let pos = Isometry::translation(origin.x, origin.y);
        let vel = nalgebra::Vector2::new(direction.x, direction.y);
        let options = ShapeCastOptions::with_max_time_of_impact(max_distance.max(0.0));
        let groups = query_groups(mask);

        let mut seen: Vec<ColliderHandle> = Vec::new();
        let mut hits = Vec::new();
        for _ in 0..MAX_CAST_HITS {
            let not_seen = |h: ColliderHandle, _: &Collider| !seen.contains(&h);
            let filter = QueryFilter::new().groups(groups).predicate(&not_seen);
            let Some((handle, hit)) = self.query.cast_shape(
                &self.bodies,
                &self.colliders,
                &pos,
                &vel,
                &ball,
                options,
                filter,
            ) else {
                break;
            };
            seen.push(handle);
            if let Some(e) = self.entry_of(handle) {
                hits.push(Hit {
                    collider: e.collider,
                    ancestry: e.owner.into_iter().collect(),
                    distance: hit.time_of_impact,
                });
            }
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}

impl ObstructionWorld for RapierObstructions {
    fn publish(&mut self, owner: LineId, hull: &CollisionHull, layers: LayerMask) -> Option<ColliderId> {
        let Some(shape) = compound_shape(&hull.triangles()) else {
            self.withdraw(owner);
            return None;
        };
        if let Some(e) = self.entries.iter().find(|e| e.owner == Some(owner)) {
            if let Some(c) = self.colliders.get_mut(e.handle) {
                c.set_shape(shape);
                c.set_collision_groups(groups_for(layers));
                return Some(e.collider);
            }
        }
        Some(self.insert(shape, Some(owner), layers))
    }

    fn withdraw(&mut self, owner: LineId) {
        let Some(idx) = self.entries.iter().position(|e| e.owner == Some(owner)) else {
            return;
        };
        let entry = self.entries.remove(idx);
        self.colliders
            .remove(entry.handle, &mut self.islands, &mut self.bodies, false);
    }

    fn insert_obstacle(&mut self, polygon: &[Vec2], layers: LayerMask) -> Option<ColliderId> {
        let shape = compound_shape(&fan(polygon))?;
        Some(self.insert(shape, None, layers))
    }

    fn clear(&mut self) {
        for entry in self.entries.drain(..) {
            self.colliders
                .remove(entry.handle, &mut self.islands, &mut self.bodies, false);
        }
    }

    fn pick(&self, point: Vec2) -> Option<LineId> {
        let mut found: Vec<ColliderHandle> = Vec::new();
        self.query.intersections_with_point(
            &self.bodies,
            &self.colliders,
            &to_point(point),
            QueryFilter::new(),
            |handle| {
                found.push(handle);
                true
            },
        );
        // Later entries were published on top.
        self.entries
            .iter()
            .rev()
            .find(|e| e.owner.is_some() && found.contains(&e.handle))
            .and_then(|e| e.owner)
    }

    fn commit(&mut self) {
        self.query.update(&self.colliders);
    }
}
