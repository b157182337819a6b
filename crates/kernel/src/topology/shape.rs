use serde::{Deserialize, Serialize};

use super::brep::{EdgeId, EntityStore, FaceId, ShellId, SolidId, VertexId};

/// Orientation of a shape reference.
///
/// Orientation belongs to the reference, not to the underlying geometry:
/// the same face can appear forward in one solid and reversed in another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Forward,
    Reversed,
}

impl Orientation {
    pub fn reversed(self) -> Self {
        match self {
            Orientation::Forward => Orientation::Reversed,
            Orientation::Reversed => Orientation::Forward,
        }
    }
}

/// The entity a shape refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Entity {
    Vertex(VertexId),
    Edge(EdgeId),
    /// An ordered chain of edges.
    Wire(Vec<EdgeId>),
    Face(FaceId),
    Shell(ShellId),
    Solid(SolidId),
    Compound(Vec<Shape>),
}

/// An immutable, orientation-carrying reference into the entity store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub entity: Entity,
    pub orientation: Orientation,
}

impl Shape {
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            orientation: Orientation::Forward,
        }
    }

    pub fn vertex(id: VertexId) -> Self {
        Self::new(Entity::Vertex(id))
    }

    pub fn edge(id: EdgeId) -> Self {
        Self::new(Entity::Edge(id))
    }

    pub fn wire(edges: Vec<EdgeId>) -> Self {
        Self::new(Entity::Wire(edges))
    }

    pub fn face(id: FaceId) -> Self {
        Self::new(Entity::Face(id))
    }

    pub fn solid(id: SolidId) -> Self {
        Self::new(Entity::Solid(id))
    }

    pub fn compound(children: Vec<Shape>) -> Self {
        Self::new(Entity::Compound(children))
    }

    pub fn empty_compound() -> Self {
        Self::compound(Vec::new())
    }

    /// A copy of this shape with flipped orientation.
    pub fn reversed(&self) -> Self {
        Self {
            entity: self.entity.clone(),
            orientation: self.orientation.reversed(),
        }
    }

    /// True for a compound with no non-empty content.
    pub fn is_empty(&self) -> bool {
        match &self.entity {
            Entity::Compound(children) => children.iter().all(Shape::is_empty),
            Entity::Wire(edges) => edges.is_empty(),
            _ => false,
        }
    }

    /// All solids reachable from this shape, compounds flattened.
    pub fn solids(&self) -> Vec<SolidId> {
        let mut out = Vec::new();
        self.collect_solids(&mut out);
        out
    }

    fn collect_solids(&self, out: &mut Vec<SolidId>) {
        match &self.entity {
            Entity::Solid(id) => out.push(*id),
            Entity::Compound(children) => {
                for child in children {
                    child.collect_solids(out);
                }
            }
            _ => {}
        }
    }

    /// All faces reachable from this shape (solids expanded through shells).
    pub fn faces(&self, store: &EntityStore) -> Vec<FaceId> {
        let mut out = Vec::new();
        self.collect_faces(store, &mut out);
        out
    }

    fn collect_faces(&self, store: &EntityStore, out: &mut Vec<FaceId>) {
        match &self.entity {
            Entity::Face(id) => out.push(*id),
            Entity::Shell(id) => out.extend(store.shells[*id].faces.iter().copied()),
            Entity::Solid(id) => out.extend(store.solid_faces(*id)),
            Entity::Compound(children) => {
                for child in children {
                    child.collect_faces(store, out);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::brep::EntityStore;
    use crate::topology::primitives::make_box;

    #[test]
    fn empty_compound_is_empty() {
        assert!(Shape::empty_compound().is_empty());
        assert!(Shape::compound(vec![Shape::empty_compound()]).is_empty());
    }

    #[test]
    fn solid_shape_is_not_empty() {
        let mut store = EntityStore::new();
        let solid = make_box(&mut store, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        let shape = Shape::solid(solid);
        assert!(!shape.is_empty());
        assert_eq!(shape.solids(), vec![solid]);
        assert_eq!(shape.faces(&store).len(), 6);
    }

    #[test]
    fn orientation_flips_on_the_reference_only() {
        let mut store = EntityStore::new();
        let solid = make_box(&mut store, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        let shape = Shape::solid(solid);
        let rev = shape.reversed();
        assert_eq!(rev.orientation, Orientation::Reversed);
        assert_eq!(rev.reversed().orientation, Orientation::Forward);
        // Same underlying entity either way.
        assert_eq!(rev.solids(), shape.solids());
    }

    #[test]
    fn compound_flattens_nested_solids() {
        let mut store = EntityStore::new();
        let a = make_box(&mut store, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        let b = make_box(&mut store, 2.0, 0.0, 0.0, 3.0, 1.0, 1.0);
        let nested = Shape::compound(vec![
            Shape::solid(a),
            Shape::compound(vec![Shape::solid(b)]),
        ]);
        assert_eq!(nested.solids(), vec![a, b]);
    }
}
