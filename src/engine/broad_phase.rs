use crate::math::Aabb;

/// Sort-and-sweep broad phase over the x axis.
///
/// Returns index pairs `(i, j)` with `i < j` into `bounds` whose boxes overlap,
/// sorted so the narrow phase visits pairs in a deterministic order.
pub(crate) fn overlapping_pairs(bounds: &[Aabb]) -> Vec<(usize, usize)> {
    let mut order: Vec<usize> = (0..bounds.len()).collect();
    order.sort_by(|&a, &b| bounds[a].min.x.total_cmp(&bounds[b].min.x).then(a.cmp(&b)));

    let mut pairs = Vec::new();
    for (k, &i) in order.iter().enumerate() {
        let aabb_i = &bounds[i];

        for &j in &order[k + 1..] {
            let aabb_j = &bounds[j];
            if aabb_j.min.x > aabb_i.max.x {
                break;
            }

            if aabb_i.intersects(aabb_j) {
                pairs.push((i.min(j), i.max(j)));
            }
        }
    }

    pairs.sort_unstable();
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector2;

    fn square(x: f64, y: f64) -> Aabb {
        Aabb::from_center_half_extents(Vector2::new(x, y), Vector2::new(1.0, 1.0))
    }

    #[test]
    fn finds_only_overlapping_boxes() {
        let bounds = [square(0.0, 0.0), square(10.0, 0.0), square(1.5, 0.5), square(1.0, 10.0)];
        assert_eq!(overlapping_pairs(&bounds), vec![(0, 2)]);
    }
}
