use crate::engine::Geometry;
use crate::math::{closest_point_on_segment, Vector2, EPSILON};

/// A single contact between two shapes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Point on the surface of shape A, in world coordinates
    pub point_a: Vector2,

    /// Point on the surface of shape B, in world coordinates
    pub point_b: Vector2,

    /// Signed distance between the two points along the normal; negative when penetrating
    pub distance: f64,

    /// Feature id used to match contacts between steps
    pub id: u32,
}

/// Contacts between two shapes sharing one normal
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContactSet {
    /// Collision normal pointing from shape A to shape B
    pub normal: Vector2,

    /// Up to two contact points
    pub points: Vec<Contact>,
}

impl ContactSet {
    /// Returns whether the shapes touch
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the contact set as seen from the other shape
    pub fn flipped(mut self) -> Self {
        self.normal = -self.normal;
        for contact in &mut self.points {
            std::mem::swap(&mut contact.point_a, &mut contact.point_b);
        }
        self
    }
}

/// Computes the contacts between two world-space geometries.
///
/// Segment-segment pairs never collide.
pub fn collide(a: &Geometry, b: &Geometry) -> ContactSet {
    match (a, b) {
        (Geometry::Circle { center: ca, radius: ra }, Geometry::Circle { center: cb, radius: rb }) => {
            circle_to_circle(*ca, *ra, *cb, *rb)
        }
        (Geometry::Circle { center, radius }, Geometry::Segment { a: sa, b: sb, normal, radius: sr }) => {
            circle_to_segment(*center, *radius, *sa, *sb, *normal, *sr)
        }
        (Geometry::Segment { .. }, Geometry::Circle { .. }) => collide(b, a).flipped(),
        (Geometry::Segment { .. }, Geometry::Segment { .. }) => ContactSet::default(),
        _ => match (as_polygon(a), as_polygon(b)) {
            (Some(Polygon::Circle(ca, ra)), Some(Polygon::Circle(cb, rb))) => circle_to_circle(ca, ra, cb, rb),
            (Some(Polygon::Circle(center, radius)), Some(Polygon::Hull(poly))) => circle_to_poly(center, radius, &poly),
            (Some(Polygon::Hull(poly)), Some(Polygon::Circle(center, radius))) => {
                circle_to_poly(center, radius, &poly).flipped()
            }
            (Some(Polygon::Hull(pa)), Some(Polygon::Hull(pb))) => poly_to_poly(&pa, &pb),
            _ => ContactSet::default(),
        },
    }
}

struct Hull<'a> {
    vertices: std::borrow::Cow<'a, [Vector2]>,
    normals: std::borrow::Cow<'a, [Vector2]>,
    radius: f64,
}

enum Polygon<'a> {
    Circle(Vector2, f64),
    Hull(Hull<'a>),
}

/// Views any geometry as a hull; degenerate hulls collapse to circles
fn as_polygon(geometry: &Geometry) -> Option<Polygon<'_>> {
    match geometry {
        Geometry::Circle { center, radius } => Some(Polygon::Circle(*center, *radius)),
        Geometry::Segment { a, b, normal, radius } => {
            if a.distance_squared(b) <= EPSILON * EPSILON {
                return Some(Polygon::Circle(*a, *radius));
            }
            Some(Polygon::Hull(Hull {
                vertices: vec![*a, *b].into(),
                normals: vec![*normal, -*normal].into(),
                radius: *radius,
            }))
        }
        Geometry::Poly { vertices, normals, radius } => match vertices.len() {
            0 => None,
            1 => Some(Polygon::Circle(vertices[0], *radius)),
            _ => Some(Polygon::Hull(Hull {
                vertices: vertices.as_slice().into(),
                normals: normals.as_slice().into(),
                radius: *radius,
            })),
        },
    }
}

fn circle_to_circle(ca: Vector2, ra: f64, cb: Vector2, rb: f64) -> ContactSet {
    let delta = cb - ca;
    let min_dist = ra + rb;
    let dist_sq = delta.length_squared();

    if dist_sq >= min_dist * min_dist {
        return ContactSet::default();
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > 0.0 { delta / dist } else { Vector2::unit_x() };

    ContactSet {
        normal,
        points: vec![Contact {
            point_a: ca + normal * ra,
            point_b: cb - normal * rb,
            distance: dist - min_dist,
            id: 0,
        }],
    }
}

fn circle_to_segment(center: Vector2, rc: f64, a: Vector2, b: Vector2, seg_normal: Vector2, rs: f64) -> ContactSet {
    let closest = closest_point_on_segment(center, a, b);
    let delta = closest - center;
    let min_dist = rc + rs;
    let dist_sq = delta.length_squared();

    if dist_sq >= min_dist * min_dist {
        return ContactSet::default();
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > 0.0 { delta / dist } else { -seg_normal };

    ContactSet {
        normal,
        points: vec![Contact {
            point_a: center + normal * rc,
            point_b: closest - normal * rs,
            distance: dist - min_dist,
            id: 0,
        }],
    }
}

fn circle_to_poly(center: Vector2, rc: f64, poly: &Hull<'_>) -> ContactSet {
    let geometry = Geometry::Poly {
        vertices: poly.vertices.to_vec(),
        normals: poly.normals.to_vec(),
        radius: poly.radius,
    };
    let Some(surface) = geometry.point_query(center) else {
        return ContactSet::default();
    };

    let distance = surface.distance - rc;
    if distance >= 0.0 {
        return ContactSet::default();
    }

    let normal = -surface.gradient;
    ContactSet {
        normal,
        points: vec![Contact {
            point_a: center + normal * rc,
            point_b: surface.point,
            distance,
            id: 0,
        }],
    }
}

/// Smallest separation of `other`'s vertices along each of `hull`'s normals,
/// returning the edge index with the largest such separation
fn max_separation(hull: &Hull<'_>, other: &Hull<'_>) -> (usize, f64) {
    let mut best_index = 0;
    let mut best = f64::NEG_INFINITY;

    for (i, (v, n)) in hull.vertices.iter().zip(hull.normals.iter()).enumerate() {
        let separation = other
            .vertices
            .iter()
            .map(|p| n.dot(&(*p - *v)))
            .fold(f64::INFINITY, f64::min);

        if separation > best {
            best = separation;
            best_index = i;
        }
    }

    (best_index, best)
}

/// Keeps the part of the segment on the negative side of the plane `dot(normal, p) <= offset`
fn clip_segment(points: [(Vector2, u32); 2], normal: Vector2, offset: f64) -> Option<[(Vector2, u32); 2]> {
    let d0 = normal.dot(&points[0].0) - offset;
    let d1 = normal.dot(&points[1].0) - offset;

    let mut out = Vec::with_capacity(2);
    if d0 <= 0.0 {
        out.push(points[0]);
    }
    if d1 <= 0.0 {
        out.push(points[1]);
    }
    if d0 * d1 < 0.0 {
        let t = d0 / (d0 - d1);
        let id = if d0 > 0.0 { points[0].1 } else { points[1].1 };
        out.push((points[0].0.lerp(&points[1].0, t), id));
    }

    match out.as_slice() {
        [first, second, ..] => Some([*first, *second]),
        _ => None,
    }
}

fn poly_to_poly(a: &Hull<'_>, b: &Hull<'_>) -> ContactSet {
    let rsum = a.radius + b.radius;

    let (edge_a, sep_a) = max_separation(a, b);
    if sep_a > rsum {
        return ContactSet::default();
    }
    let (edge_b, sep_b) = max_separation(b, a);
    if sep_b > rsum {
        return ContactSet::default();
    }

    // Prefer A as the reference hull unless B is clearly better
    let flip = sep_b > sep_a + 1e-3;
    let (reference, incident, ref_edge) = if flip { (b, a, edge_b) } else { (a, b, edge_a) };

    let ref_count = reference.vertices.len();
    let v1 = reference.vertices[ref_edge];
    let v2 = reference.vertices[(ref_edge + 1) % ref_count];
    let n = reference.normals[ref_edge];

    let inc_count = incident.vertices.len();
    let mut inc_edge = 0;
    let mut min_dot = f64::INFINITY;
    for (i, inc_n) in incident.normals.iter().enumerate() {
        let d = n.dot(inc_n);
        if d < min_dot {
            min_dot = d;
            inc_edge = i;
        }
    }

    let inc_next = (inc_edge + 1) % inc_count;
    let incident_points = [
        (incident.vertices[inc_edge], inc_edge as u32),
        (incident.vertices[inc_next], inc_next as u32),
    ];

    let tangent = (v2 - v1).normalize();
    let Some(clipped) = clip_segment(incident_points, -tangent, -tangent.dot(&v1)) else {
        return ContactSet::default();
    };
    let Some(clipped) = clip_segment(clipped, tangent, tangent.dot(&v2)) else {
        return ContactSet::default();
    };

    let mut points = Vec::with_capacity(2);
    for (p, inc_id) in clipped {
        let separation = n.dot(&(p - v1));
        let distance = separation - rsum;
        if distance > 0.0 {
            continue;
        }

        let on_reference = p - n * separation + n * reference.radius;
        let on_incident = p - n * incident.radius;
        let id = ((ref_edge as u32) << 16) | (inc_id << 1) | flip as u32;

        let (point_a, point_b) = if flip {
            (on_incident, on_reference)
        } else {
            (on_reference, on_incident)
        };

        points.push(Contact {
            point_a,
            point_b,
            distance,
            id,
        });
    }

    ContactSet {
        normal: if flip { -n } else { n },
        points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(center: Vector2, half: f64) -> Geometry {
        let vertices = vec![
            center + Vector2::new(-half, -half),
            center + Vector2::new(half, -half),
            center + Vector2::new(half, half),
            center + Vector2::new(-half, half),
        ];
        let normals = vec![
            Vector2::new(0.0, -1.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(0.0, 1.0),
            Vector2::new(-1.0, 0.0),
        ];
        Geometry::Poly { vertices, normals, radius: 0.0 }
    }

    #[test]
    fn overlapping_circles_produce_one_contact() {
        let a = Geometry::Circle { center: Vector2::new(0.0, 0.0), radius: 1.0 };
        let b = Geometry::Circle { center: Vector2::new(1.5, 0.0), radius: 1.0 };

        let set = collide(&a, &b);
        assert_eq!(set.points.len(), 1);
        assert_relative_eq!(set.normal, Vector2::new(1.0, 0.0));
        assert_relative_eq!(set.points[0].distance, -0.5);
    }

    #[test]
    fn stacked_squares_produce_two_contacts() {
        let ground = square(Vector2::new(0.0, 0.0), 1.0);
        let top = square(Vector2::new(0.2, 1.9), 1.0);

        let set = collide(&ground, &top);
        assert_eq!(set.points.len(), 2);
        assert_relative_eq!(set.normal, Vector2::new(0.0, 1.0), epsilon = 1e-9);
        for contact in &set.points {
            assert_relative_eq!(contact.distance, -0.1, epsilon = 1e-9);
        }

        let reversed = collide(&top, &ground);
        assert_relative_eq!(reversed.normal, Vector2::new(0.0, -1.0), epsilon = 1e-9);
    }

    #[test]
    fn circle_resting_on_segment_points_down() {
        let circle = Geometry::Circle { center: Vector2::new(0.0, 0.9), radius: 1.0 };
        let segment = Geometry::Segment {
            a: Vector2::new(-5.0, 0.0),
            b: Vector2::new(5.0, 0.0),
            normal: Vector2::new(0.0, -1.0),
            radius: 0.0,
        };

        let set = collide(&circle, &segment);
        assert_relative_eq!(set.normal, Vector2::new(0.0, -1.0));
        assert_relative_eq!(set.points[0].distance, -0.1, epsilon = 1e-9);

        let flipped = collide(&segment, &circle);
        assert_relative_eq!(flipped.normal, Vector2::new(0.0, 1.0));
    }

    #[test]
    fn segments_never_collide() {
        let s = Geometry::Segment {
            a: Vector2::new(-1.0, 0.0),
            b: Vector2::new(1.0, 0.0),
            normal: Vector2::new(0.0, -1.0),
            radius: 1.0,
        };
        assert!(collide(&s, &s).is_empty());
    }

    #[test]
    fn separated_squares_do_not_touch() {
        let a = square(Vector2::new(0.0, 0.0), 1.0);
        let b = square(Vector2::new(2.5, 0.0), 1.0);
        assert!(collide(&a, &b).is_empty());
    }
}
