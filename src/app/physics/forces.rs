use eframe::egui::{Vec2, vec2};

use super::quadtree::Quad;

const MIN_DISTANCE_SQ: f32 = 1.0;

/// Stand-in direction for coincident points, stable for a given pair of indices.
pub(super) fn jiggle(from: usize, to: usize) -> Vec2 {
    let angle = ((from as f32) * 0.618_034 + (to as f32) * 0.414_214) * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin()) * 1e-3
}

#[derive(Clone, Copy)]
pub(super) struct Link {
    pub(super) source: usize,
    pub(super) target: usize,
    pub(super) distance: f32,
    pub(super) weight: f32,
    pub(super) bias: f32,
}

/// Pulls each linked pair towards its rest distance, split by how connected each end is.
pub(super) fn apply_links(
    links: &[Link],
    strength: f32,
    alpha: f32,
    positions: &[Vec2],
    velocities: &mut [Vec2],
) {
    for link in links {
        let (source, target) = (link.source, link.target);
        let mut delta = (positions[target] + velocities[target])
            - (positions[source] + velocities[source]);
        if delta.length_sq() == 0.0 {
            delta = jiggle(source, target);
        }
        let length = delta.length();
        let pull = delta * ((length - link.distance) / length * alpha * strength);
        velocities[target] -= pull * link.bias;
        velocities[source] += pull * (1.0 - link.bias);
    }
}

/// Many-body charge for body `index`, approximating far cells by their centroid.
pub(super) fn accumulate_charge(
    quad: &Quad,
    index: usize,
    positions: &[Vec2],
    strength: f32,
    theta: f32,
    alpha: f32,
    velocity: &mut Vec2,
) {
    if quad.count == 0 {
        return;
    }

    let point = positions[index];
    if !quad.is_leaf() {
        let offset = quad.centroid - point;
        let distance_sq = offset.length_sq();
        let side = quad.bounds.side_length();
        if !quad.bounds.contains(point) && side * side < distance_sq * theta * theta {
            let charge = strength * quad.count as f32;
            *velocity += offset * (charge * alpha / distance_sq.max(MIN_DISTANCE_SQ));
            return;
        }

        for child in &quad.children {
            accumulate_charge(child, index, positions, strength, theta, alpha, velocity);
        }
        return;
    }

    for &other in &quad.members {
        if other == index {
            continue;
        }
        let mut offset = positions[other] - point;
        if offset.length_sq() == 0.0 {
            offset = jiggle(index, other);
        }
        let distance_sq = offset.length_sq();
        let distance_sq = if distance_sq < MIN_DISTANCE_SQ {
            (MIN_DISTANCE_SQ * distance_sq).sqrt()
        } else {
            distance_sq
        };
        *velocity += offset * (strength * alpha / distance_sq);
    }
}

#[derive(Clone, Copy)]
pub(super) struct CollisionParams {
    pub(super) radius: f32,
    pub(super) strength: f32,
}

/// Separates overlapping bodies by walking both trees at once and skipping distant cells.
///
/// `predicted` holds position plus velocity; corrections are written to `pushes` and
/// applied by the caller so every pair sees the same inputs.
pub(super) fn accumulate_collision_pairs(
    quad_a: &Quad,
    quad_b: &Quad,
    same_quad: bool,
    predicted: &[Vec2],
    params: CollisionParams,
    pushes: &mut [Vec2],
) {
    let reach = params.radius * 2.0;
    if quad_a.bounds.gap_sq(quad_b.bounds) > reach * reach {
        return;
    }

    if quad_a.is_leaf() && quad_b.is_leaf() {
        if same_quad {
            for (offset, &from) in quad_a.members.iter().enumerate() {
                for &to in &quad_a.members[offset + 1..] {
                    separate(from, to, predicted, params, pushes);
                }
            }
        } else {
            for &from in &quad_a.members {
                for &to in &quad_b.members {
                    separate(from, to, predicted, params, pushes);
                }
            }
        }
        return;
    }

    if same_quad {
        for (offset, child_a) in quad_a.children.iter().enumerate() {
            accumulate_collision_pairs(child_a, child_a, true, predicted, params, pushes);
            for child_b in &quad_a.children[offset + 1..] {
                accumulate_collision_pairs(child_a, child_b, false, predicted, params, pushes);
            }
        }
        return;
    }

    let split_a = !quad_a.is_leaf()
        && (quad_b.is_leaf() || quad_a.bounds.half_extent >= quad_b.bounds.half_extent);
    if split_a {
        for child in &quad_a.children {
            accumulate_collision_pairs(child, quad_b, false, predicted, params, pushes);
        }
    } else {
        for child in &quad_b.children {
            accumulate_collision_pairs(quad_a, child, false, predicted, params, pushes);
        }
    }
}

fn separate(from: usize, to: usize, predicted: &[Vec2], params: CollisionParams, pushes: &mut [Vec2]) {
    let min_distance = params.radius * 2.0;
    let mut delta = predicted[from] - predicted[to];
    if delta.length_sq() >= min_distance * min_distance {
        return;
    }
    if delta.length_sq() == 0.0 {
        delta = jiggle(from, to);
    }
    let distance = delta.length();
    let push = delta * ((min_distance - distance) / distance * params.strength * 0.5);
    pushes[from] += push;
    pushes[to] -= push;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stretched_link_pulls_both_ends_inward() {
        let positions = [vec2(0.0, 0.0), vec2(200.0, 0.0)];
        let mut velocities = [Vec2::ZERO; 2];
        let links = [Link {
            source: 0,
            target: 1,
            distance: 80.0,
            weight: 1.0,
            bias: 0.5,
        }];

        apply_links(&links, 1.0, 1.0, &positions, &mut velocities);

        assert!(velocities[0].x > 0.0);
        assert!(velocities[1].x < 0.0);
        assert!((velocities[0].x + velocities[1].x).abs() < 1e-4);
    }

    #[test]
    fn negative_charge_pushes_bodies_apart() {
        let positions = [vec2(-10.0, 0.0), vec2(10.0, 0.0)];
        let quad = Quad::build(&positions).unwrap();
        let mut velocity = Vec2::ZERO;

        accumulate_charge(&quad, 0, &positions, -80.0, 0.9, 1.0, &mut velocity);

        assert!(velocity.x < 0.0);
        assert_eq!(velocity.y, 0.0);
    }

    #[test]
    fn overlapping_bodies_are_separated_symmetrically() {
        let predicted = [vec2(0.0, 0.0), vec2(10.0, 0.0), vec2(500.0, 500.0)];
        let quad = Quad::build(&predicted).unwrap();
        let mut pushes = [Vec2::ZERO; 3];

        accumulate_collision_pairs(
            &quad,
            &quad,
            true,
            &predicted,
            CollisionParams {
                radius: 20.0,
                strength: 0.7,
            },
            &mut pushes,
        );

        assert!(pushes[0].x < 0.0);
        assert!(pushes[1].x > 0.0);
        assert_eq!(pushes[2], Vec2::ZERO);
    }
}
