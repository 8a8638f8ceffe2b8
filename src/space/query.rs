use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::engine::{BodyHandle, ShapeFilter, ShapeRef};
use crate::math::Vector2;
use crate::object::ObjectRef;
use crate::space::Space;

/// An object found by a point query
#[derive(Debug, Clone)]
pub struct FoundObject {
    pub object: ObjectRef,

    /// Distance from the query point to the object's surface; negative inside the object
    pub distance: f64,

    /// Closest point on the object's surface
    pub point: Vector2,
}

fn body_of(shape: &ShapeRef) -> BodyHandle {
    shape.borrow().get_body_handle()
}

impl Space {
    /// Maps every registered object's body to the object
    fn body_map(&self) -> HashMap<BodyHandle, ObjectRef> {
        self.objects
            .iter()
            .map(|o| (o.get_body().borrow().get_handle(), Rc::clone(o)))
            .collect()
    }

    /// Finds the object closest to `point` within `max_distance`.
    ///
    /// Hits on bodies that belong to no registered object are not reported.
    pub fn find_near_object(&self, point: Vector2, max_distance: f64, filter: Option<ShapeFilter>) -> Option<FoundObject> {
        let hit = self
            .world
            .point_query_nearest(point, max_distance, filter.unwrap_or(ShapeFilter::ALL))?;

        let objects = self.body_map();
        objects.get(&body_of(&hit.shape)).map(|object| FoundObject {
            object: Rc::clone(object),
            distance: hit.distance,
            point: hit.point,
        })
    }

    /// Finds every object within `max_distance` of `point`, each reported once
    pub fn find_objects(&self, point: Vector2, max_distance: f64, filter: Option<ShapeFilter>) -> Vec<FoundObject> {
        let objects = self.body_map();
        let mut seen = HashSet::new();

        self.world
            .point_query(point, max_distance, filter.unwrap_or(ShapeFilter::ALL))
            .into_iter()
            .filter_map(|hit| {
                let body = body_of(&hit.shape);
                let object = objects.get(&body)?;
                seen.insert(body).then(|| FoundObject {
                    object: Rc::clone(object),
                    distance: hit.distance,
                    point: hit.point,
                })
            })
            .collect()
    }

    /// Returns the other registered objects overlapping any shape of `object`
    pub fn object_query(&self, object: &ObjectRef) -> Vec<ObjectRef> {
        let objects = self.body_map();
        let own_body = object.get_body().borrow().get_handle();
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for shape in object.get_shapes() {
            for info in self.world.shape_query(shape) {
                let body = body_of(&info.shape);
                if body == own_body || !seen.insert(body) {
                    continue;
                }
                if let Some(other) = objects.get(&body) {
                    found.push(Rc::clone(other));
                }
            }
        }

        found
    }
}
